//! MedReel - Main Application Entrypoint
//!
//! This file is responsible for parsing command-line arguments, initializing
//! the application environment (like logging), and dispatching the core
//! processing logic.

use clap::Parser;
use log::{error, info};
use medreel::{Config, Language, SummarizerBackend, run};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// A command-line tool that turns a PDF medical report into a narrated slideshow video summary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input PDF report
    #[arg(short, long)]
    input: PathBuf,

    /// Narration language
    #[arg(short, long, value_enum, default_value_t = LanguageArg::En)]
    language: LanguageArg,

    /// Scratch directory for downloaded images (cleared after a successful run)
    #[arg(long, default_value = "images")]
    images_dir: PathBuf,

    /// Directory for the narration, the video and the run report
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Summarization backend
    #[arg(long, value_enum, default_value_t = SummarizerArg::Huggingface)]
    summarizer: SummarizerArg,

    /// Number of keywords to search images for
    #[arg(short, long, default_value_t = 10)]
    keywords: usize,

    /// Images requested per keyword
    #[arg(long, default_value_t = 3)]
    images_per_keyword: usize,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Image search API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Custom search engine ID
    #[arg(long, env = "GOOGLE_CSE_ID", hide_env_values = true)]
    cse_id: Option<String>,

    /// Inference API token for the hosted summarizer
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Logging verbosity level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LanguageArg {
    En,
    Hi,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SummarizerArg {
    Huggingface,
    Lead,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Info,
    Debug,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = Args::parse();

    // 1. Initialize Logger
    let log_level = match args.log_level {
        LogLevel::Error => "error",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting MedReel...");

    // 2. Validate input path
    if !args.input.exists() {
        error!("Input file does not exist: {:?}", args.input);
        std::process::exit(1);
    }

    // 3. Create a configuration object from arguments
    let config = Config {
        input_file: args.input,
        images_dir: args.images_dir,
        static_dir: args.static_dir,
        language: match args.language {
            LanguageArg::En => Language::En,
            LanguageArg::Hi => Language::Hi,
        },
        summarizer: match args.summarizer {
            SummarizerArg::Huggingface => SummarizerBackend::HuggingFace,
            SummarizerArg::Lead => SummarizerBackend::Lead,
        },
        keyword_count: args.keywords,
        images_per_keyword: args.images_per_keyword,
        timeout: Duration::from_secs(args.timeout_secs),
        api_key: args.api_key,
        cse_id: args.cse_id,
        hf_token: args.hf_token,
        ..Config::default()
    };

    // 4. Run the main application logic
    match run(config) {
        Ok(output) => {
            println!("Summary:\n{}\n", output.summary);
            println!("Keywords: {}", output.keywords.join(", "));
            println!("Audio: {}", output.audio.display());
            println!("Video: {}", output.video.display());
        }
        Err(e) => {
            error!("Application failed: {:#}", e);
            std::process::exit(2);
        }
    }

    info!("Processing completed successfully.");
}
