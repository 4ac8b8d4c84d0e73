//! MedReel - Core Library
//!
//! This file contains the pipeline driver: it takes a PDF report through text
//! extraction, cleanup, summarization, keyword extraction, image sourcing,
//! speech synthesis and finally video assembly.

use anyhow::{Context, Result, bail};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod error;
pub mod http;
pub mod image_download;
pub mod image_search;
pub mod keywords;
pub mod placeholder;
pub mod speech;
pub mod summarizer;
pub mod text_cleaner;
pub mod text_extractor;
pub mod video_encoder;
pub mod video_generator;

pub use error::MediaError;
pub use speech::Language;

use image_search::{ResultsPageScraper, SearchChain};
use keywords::KeywordExtractor;
use speech::{SpeechEngine, Translator};
use summarizer::{Summarizer, SummaryLength};
use video_generator::Renderer;

pub const AUDIO_FILE_NAME: &str = "summary.mp3";
pub const VIDEO_FILE_NAME: &str = "output_video.mp4";
pub const REPORT_FILE_NAME: &str = "report.json";

/// Which summarization backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerBackend {
    /// Hosted BART model.
    HuggingFace,
    /// Offline lead-sentence extraction.
    Lead,
}

/// Application configuration structure.
#[derive(Clone)]
pub struct Config {
    pub input_file: PathBuf,
    pub images_dir: PathBuf,
    pub static_dir: PathBuf,
    pub language: Language,
    pub summarizer: SummarizerBackend,
    pub summary_length: SummaryLength,
    pub keyword_count: usize,
    pub images_per_keyword: usize,
    pub timeout: Duration,
    pub api_key: Option<String>,
    pub cse_id: Option<String>,
    pub hf_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_file: PathBuf::new(),
            images_dir: PathBuf::from("images"),
            static_dir: PathBuf::from("static"),
            language: Language::default(),
            summarizer: SummarizerBackend::HuggingFace,
            summary_length: SummaryLength::default(),
            keyword_count: keywords::DEFAULT_KEYWORD_COUNT,
            images_per_keyword: image_search::DEFAULT_IMAGES_PER_KEYWORD,
            timeout: http::DEFAULT_TIMEOUT,
            api_key: None,
            cse_id: None,
            hf_token: None,
        }
    }
}

// Credentials are redacted so the config can be logged.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("input_file", &self.input_file)
            .field("images_dir", &self.images_dir)
            .field("static_dir", &self.static_dir)
            .field("language", &self.language)
            .field("summarizer", &self.summarizer)
            .field("summary_length", &self.summary_length)
            .field("keyword_count", &self.keyword_count)
            .field("images_per_keyword", &self.images_per_keyword)
            .field("timeout", &self.timeout)
            .field("api_key", &redact(&self.api_key))
            .field("cse_id", &redact(&self.cse_id))
            .field("hf_token", &redact(&self.hf_token))
            .finish()
    }
}

impl Config {
    pub fn audio_path(&self) -> PathBuf {
        self.static_dir.join(AUDIO_FILE_NAME)
    }

    pub fn video_path(&self) -> PathBuf {
        self.static_dir.join(VIDEO_FILE_NAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.static_dir.join(REPORT_FILE_NAME)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub summary: String,
    pub language: String,
    pub keywords: Vec<String>,
    pub images: Vec<PathBuf>,
    pub audio: PathBuf,
    pub video: PathBuf,
}

/// The external collaborators of one run.
pub struct Stages {
    pub client: Client,
    pub summarizer: Box<dyn Summarizer>,
    pub keywords: KeywordExtractor,
    pub search: SearchChain,
    pub translator: Box<dyn Translator>,
    pub speech: Box<dyn SpeechEngine>,
    pub renderer: Box<dyn Renderer>,
}

impl Stages {
    /// Wires up the production backends described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::build_client(config.timeout)?;

        let summarizer: Box<dyn Summarizer> = match config.summarizer {
            SummarizerBackend::HuggingFace => Box::new(summarizer::HuggingFaceSummarizer::new(
                client.clone(),
                config.hf_token.clone(),
                config.summary_length,
            )),
            SummarizerBackend::Lead => {
                Box::new(summarizer::LeadSummarizer::new(config.summary_length))
            }
        };

        let search = match (&config.api_key, &config.cse_id) {
            (Some(key), Some(cx)) => SearchChain::standard(client.clone(), key.clone(), cx.clone()),
            _ => {
                warn!("No search API credentials configured; using the results page scraper only.");
                SearchChain::new(vec![Box::new(ResultsPageScraper::new(client.clone()))])
            }
        };

        Ok(Stages {
            summarizer,
            keywords: KeywordExtractor::default(),
            search,
            translator: Box::new(speech::GoogleTranslator::new(client.clone())),
            speech: Box::new(speech::GoogleTts::new(client.clone())),
            renderer: Box::new(video_encoder::FfmpegRenderer),
            client,
        })
    }
}

/// The main function that orchestrates the report-to-video process.
pub fn run(config: Config) -> Result<PipelineOutput> {
    info!("Initializing processing with config: {:?}", config);
    let stages = Stages::from_config(&config)?;
    run_with(&config, &stages)
}

/// Runs the whole pipeline against the given stages.
pub fn run_with(config: &Config, stages: &Stages) -> Result<PipelineOutput> {
    // 1. Extract and clean the report text
    info!("Extracting text from {:?}", config.input_file);
    let report_text = text_extractor::extract_text_from_pdf(&config.input_file)
        .context("Text extraction failed")?;
    let cleaned = text_cleaner::clean_unwanted_text(&report_text);
    if cleaned.is_empty() {
        bail!("No report text left after cleanup of {:?}", config.input_file);
    }
    info!("Cleaned report text: {} characters.", cleaned.len());

    produce_from_text(config, stages, &cleaned)
}

/// Runs every stage after text cleanup: summary, keywords, images, narration
/// and video.
pub fn produce_from_text(config: &Config, stages: &Stages, cleaned: &str) -> Result<PipelineOutput> {
    // 2. Setup working directories
    fs::create_dir_all(&config.static_dir).context("Failed to create static directory")?;
    prepare_images_dir(&config.images_dir)?;

    // 3. Summarize
    let summary = stages
        .summarizer
        .summarize(cleaned)
        .context("Summarization failed")?;
    info!("Summary: {}", summary);

    // 4. Keywords
    let keywords = stages.keywords.extract(&summary, config.keyword_count);

    // 5. Images
    let images = source_images(config, stages, &keywords)?;

    // 6. Narration
    let audio = speech::text_to_speech(
        stages.translator.as_ref(),
        stages.speech.as_ref(),
        &summary,
        config.language,
        &config.audio_path(),
    )
    .context("Speech synthesis failed")?;

    // 7. Video
    let video = video_generator::generate_video(
        stages.renderer.as_ref(),
        &config.images_dir,
        &audio,
        &config.video_path(),
    )?;

    let output = PipelineOutput {
        summary,
        language: config.language.code().to_string(),
        keywords,
        images,
        audio,
        video,
    };
    write_report(&output, &config.report_path())?;
    Ok(output)
}

/// Creates the image working directory and removes images left behind by an
/// earlier failed run.
fn prepare_images_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create image directory")?;
    let leftovers = video_generator::collect_images(dir)?;
    if !leftovers.is_empty() {
        warn!("Removing {} images left over from a previous run.", leftovers.len());
        video_generator::clear_directory(dir)?;
    }
    Ok(())
}

/// Searches and downloads images for every keyword, falling back to
/// placeholders when nothing usable was fetched.
fn source_images(config: &Config, stages: &Stages, keywords: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for keyword in keywords {
        let links = stages.search.search(keyword, config.images_per_keyword);
        if links.is_empty() {
            continue;
        }
        let downloaded = image_download::download_images(&stages.client, &links, &config.images_dir)?;
        paths.extend(downloaded);
    }

    let candidates = video_generator::collect_images(&config.images_dir)?;
    if !candidates
        .iter()
        .any(|path| video_generator::decode_image(path).is_ok())
    {
        if !candidates.is_empty() {
            warn!("None of the {} downloaded files decode; removing them.", candidates.len());
            for path in &candidates {
                fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
            }
            paths.retain(|path| !candidates.contains(path));
        }
        let count = placeholder::placeholder_count(keywords.len());
        warn!("No usable images were downloaded; creating {} placeholders.", count);
        paths.extend(placeholder::create_placeholder_images(
            keywords,
            &config.images_dir,
            count,
        )?);
    }
    info!("Sourced {} images.", paths.len());
    Ok(paths)
}

fn write_report(output: &PipelineOutput, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(output)?)
        .with_context(|| format!("Failed to write run report to {:?}", path))?;
    info!("Run report written to {:?}", path);
    Ok(())
}
