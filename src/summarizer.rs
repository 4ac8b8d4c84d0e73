//! Summarization Module
//!
//! Produces the short narrative that is read aloud in the final video. The
//! production backend is a hosted BART model; the lead-sentence backend runs
//! offline and is used when no model endpoint is available.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";

/// BART's encoder window is 1024 tokens; 700 words keeps us safely inside it.
const MAX_INPUT_WORDS: usize = 700;

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence pattern is valid"));

/// Bounds on the summary length, in model tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLength {
    pub min_tokens: u32,
    pub max_tokens: u32,
}

impl Default for SummaryLength {
    fn default() -> Self {
        SummaryLength {
            min_tokens: 100,
            max_tokens: 250,
        }
    }
}

/// Something that can condense a cleaned report into a short summary.
pub trait Summarizer {
    fn summarize(&self, text: &str) -> Result<String>;
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Deserialize)]
struct InferenceSummary {
    summary_text: String,
}

/// Abstractive summarization through the Hugging Face inference API.
pub struct HuggingFaceSummarizer {
    client: Client,
    endpoint: String,
    token: Option<String>,
    length: SummaryLength,
}

impl HuggingFaceSummarizer {
    pub fn new(client: Client, token: Option<String>, length: SummaryLength) -> Self {
        HuggingFaceSummarizer {
            client,
            endpoint: DEFAULT_MODEL_URL.to_string(),
            token,
            length,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Summarizer for HuggingFaceSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let input = truncate_words(text, MAX_INPUT_WORDS);
        if input.is_empty() {
            bail!("Cannot summarize an empty report");
        }
        info!("Requesting summary of {} characters from {}", input.len(), self.endpoint);

        let body = InferenceRequest {
            inputs: &input,
            parameters: InferenceParameters {
                max_length: self.length.max_tokens,
                min_length: self.length.min_tokens,
                do_sample: false,
            },
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let summaries: Vec<InferenceSummary> = request
            .send()
            .context("Summarization request failed")?
            .error_for_status()
            .context("Summarization endpoint returned an error status")?
            .json()
            .context("Summarization response was not valid JSON")?;

        summaries
            .into_iter()
            .next()
            .map(|s| s.summary_text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Summarization endpoint returned no summary"))
    }
}

/// Extractive fallback: keeps leading sentences up to the token budget,
/// counting whitespace-separated words as tokens.
pub struct LeadSummarizer {
    length: SummaryLength,
}

impl LeadSummarizer {
    pub fn new(length: SummaryLength) -> Self {
        LeadSummarizer { length }
    }
}

impl Summarizer for LeadSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let budget = self.length.max_tokens as usize;
        let mut summary: Vec<&str> = Vec::new();
        let mut words = 0;

        for sentence in SENTENCE.find_iter(text) {
            let sentence = sentence.as_str().trim();
            if sentence.is_empty() {
                continue;
            }
            let count = sentence.split_whitespace().count();
            if !summary.is_empty() && words + count > budget {
                break;
            }
            summary.push(sentence);
            words += count;
        }

        if summary.is_empty() {
            bail!("Cannot summarize an empty report");
        }
        debug!("Lead summary kept {} sentences ({} words)", summary.len(), words);
        Ok(summary.join(" "))
    }
}

/// Keeps the first `max_words` words of `text`, joined by single spaces.
fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
