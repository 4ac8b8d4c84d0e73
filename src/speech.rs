//! Speech Synthesis Module
//!
//! Turns the summary into narration. Hindi narration is produced by
//! translating the summary first and then synthesizing in Hindi.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use reqwest::blocking::Client;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";
pub const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// The TTS endpoint rejects longer inputs.
const MAX_TTS_CHARS: usize = 100;

/// Narration language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    fn needs_translation(self) -> bool {
        self != Language::default()
    }
}

/// Machine translation into a target language.
pub trait Translator {
    fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// Text to encoded audio bytes.
pub trait SpeechEngine {
    fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;
}

/// The public Google Translate endpoint with source-language detection.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client) -> Self {
        GoogleTranslator {
            client,
            endpoint: TRANSLATE_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, target: Language) -> Result<String> {
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .context("Translation request failed")?
            .error_for_status()
            .context("Translation service returned an error status")?
            .json()
            .context("Translation response was not valid JSON")?;

        translated_text(&body)
    }
}

/// Joins the translated segments of a `translate_a/single` response.
fn translated_text(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Unexpected translation response shape"))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        bail!("Translation service returned no text");
    }
    Ok(text)
}

/// Google Translate's TTS endpoint. Produces MP3.
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(client: Client) -> Self {
        GoogleTts {
            client,
            endpoint: TTS_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl SpeechEngine for GoogleTts {
    fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        let chunks = split_for_tts(text, MAX_TTS_CHARS);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let idx = i.to_string();
            let total = total.to_string();
            let textlen = chunk.chars().count().to_string();
            debug!("Synthesizing chunk {}/{}: {:?}", i + 1, total, chunk);
            let bytes = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language.code()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .context("Speech synthesis request failed")?
                .error_for_status()
                .context("Speech service returned an error status")?
                .bytes()
                .context("Failed to read synthesized audio")?;
            // MP3 frames are self-delimiting, so chunk responses can be appended.
            audio.extend_from_slice(&bytes);
        }
        Ok(audio)
    }
}

/// Splits `text` into chunks of at most `max_chars` characters, breaking on
/// whitespace. A single word longer than the limit is cut.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            chunks.push(head);
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Narrates `text` in `language` and writes the audio to `output`.
///
/// Translation and synthesis are attempted once; any failure is returned.
pub fn text_to_speech(
    translator: &dyn Translator,
    engine: &dyn SpeechEngine,
    text: &str,
    language: Language,
    output: &Path,
) -> Result<PathBuf> {
    if text.trim().is_empty() {
        bail!("Cannot synthesize speech from empty text");
    }

    let narration = if language.needs_translation() {
        info!("Translating summary to '{}'...", language.code());
        translator
            .translate(text, language)
            .with_context(|| format!("Failed to translate summary to '{}'", language.code()))?
    } else {
        text.to_string()
    };

    let audio = engine
        .synthesize(&narration, language)
        .context("Speech synthesis failed")?;
    if audio.is_empty() {
        bail!("Speech synthesis produced no audio");
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create audio parent directory")?;
    }
    fs::write(output, &audio).with_context(|| format!("Failed to write audio to {:?}", output))?;
    info!("Audio summary saved as {:?} ({} bytes)", output, audio.len());
    Ok(output.to_path_buf())
}
