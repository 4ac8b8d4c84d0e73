//! Keyword Extraction Module
//!
//! Picks the short phrases used as image search terms. Strategies are tried in
//! order and the first one that succeeds wins: a phrase ranker first, then a
//! plain longest-words heuristic.

use anyhow::{Result, bail};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Number of keywords requested by the pipeline.
pub const DEFAULT_KEYWORD_COUNT: usize = 10;

/// Words shorter than this (in characters) never make it into the fallback list.
const FALLBACK_MIN_CHARS: usize = 6;

/// Longest phrase the ranker will emit, in words.
const MAX_PHRASE_WORDS: usize = 2;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9'\-]*|[.,;:!?()\[\]]").expect("token pattern is valid")
});

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
        "during", "each", "either", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
        "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me", "might", "more",
        "most", "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
        "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "per", "same",
        "she", "should", "shows", "so", "some", "such", "than", "that", "the", "their",
        "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
        "through", "to", "too", "under", "until", "up", "upon", "very", "via", "was", "we",
        "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
        "with", "within", "without", "would", "you", "your", "yours", "yourself",
    ]
    .into_iter()
    .collect()
});

/// One way of turning a summary into keywords.
pub trait KeywordStrategy {
    fn name(&self) -> &str;
    fn extract(&self, text: &str, count: usize) -> Result<Vec<String>>;
}

/// Ranks 1-2 word phrases by the degree/frequency score of their words.
///
/// Candidates are built from runs of consecutive content words; stop words and
/// punctuation break runs. Ties keep the phrase that appears first.
pub struct PhraseRanker;

impl KeywordStrategy for PhraseRanker {
    fn name(&self) -> &str {
        "phrase ranker"
    }

    fn extract(&self, text: &str, count: usize) -> Result<Vec<String>> {
        let runs = content_runs(text);
        if runs.is_empty() {
            bail!("no candidate phrases in text");
        }

        let mut frequency: HashMap<&str, f64> = HashMap::new();
        let mut degree: HashMap<&str, f64> = HashMap::new();
        for run in &runs {
            for word in run {
                *frequency.entry(word.as_str()).or_default() += 1.0;
                *degree.entry(word.as_str()).or_default() += run.len() as f64;
            }
        }
        let word_score = |word: &str| degree[word] / frequency[word];

        // (phrase, score, first position)
        let mut candidates: Vec<(String, f64, usize)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for run in &runs {
            for start in 0..run.len() {
                for len in 1..=MAX_PHRASE_WORDS.min(run.len() - start) {
                    let words = &run[start..start + len];
                    let phrase = words.join(" ");
                    if seen.insert(phrase.clone()) {
                        let score: f64 = words.iter().map(|w| word_score(w)).sum();
                        let position = candidates.len();
                        candidates.push((phrase, score, position));
                    }
                }
            }
        }

        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
        Ok(candidates
            .into_iter()
            .take(count)
            .map(|(phrase, _, _)| phrase)
            .collect())
    }
}

/// Lowercased runs of content words, split at stop words and punctuation.
fn content_runs(text: &str) -> Vec<Vec<String>> {
    let mut runs = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for token in TOKEN.find_iter(text) {
        let word = token.as_str().to_lowercase();
        let is_content = word.chars().count() > 1
            && word.chars().any(|c| c.is_alphabetic())
            && !STOP_WORDS.contains(word.as_str());
        if is_content {
            current.push(word);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Distinct words longer than five characters, in order of first appearance.
pub struct LongestWords;

impl KeywordStrategy for LongestWords {
    fn name(&self) -> &str {
        "longest words"
    }

    fn extract(&self, text: &str, count: usize) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(text
            .split_whitespace()
            .filter(|word| word.chars().count() >= FALLBACK_MIN_CHARS)
            .filter(|word| seen.insert(*word))
            .take(count)
            .map(str::to_string)
            .collect())
    }
}

/// Ordered list of keyword strategies; the first success wins.
pub struct KeywordExtractor {
    strategies: Vec<Box<dyn KeywordStrategy>>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        KeywordExtractor::new(vec![Box::new(PhraseRanker), Box::new(LongestWords)])
    }
}

impl KeywordExtractor {
    pub fn new(strategies: Vec<Box<dyn KeywordStrategy>>) -> Self {
        KeywordExtractor { strategies }
    }

    /// Runs the strategies in order. Returns an empty list only when every
    /// strategy failed.
    pub fn extract(&self, text: &str, count: usize) -> Vec<String> {
        for strategy in &self.strategies {
            match strategy.extract(text, count) {
                Ok(keywords) => {
                    info!("Extracted {} keywords using the {}.", keywords.len(), strategy.name());
                    debug!("Keywords: {:?}", keywords);
                    return keywords;
                }
                Err(e) => warn!("Keyword extraction with the {} failed: {}", strategy.name(), e),
            }
        }
        Vec::new()
    }
}

/// Extracts up to `count` keywords with the default strategy chain.
pub fn extract_keywords(text: &str, count: usize) -> Vec<String> {
    KeywordExtractor::default().extract(text, count)
}
