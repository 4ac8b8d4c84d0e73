//! Shared blocking HTTP client setup.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Several endpoints (scraping, image hosts, TTS) refuse requests without a
/// browser-like user agent.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Per-request timeout used by every network stage.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the client shared by all network stages of one run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}
