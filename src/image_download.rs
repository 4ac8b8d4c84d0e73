//! Image Download Module
//!
//! Fetches search results into the image working directory. Every link is
//! attempted once; failures are logged and skipped.

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extensions kept as-is when inferred from a URL.
const DOWNLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Downloads every link into `dir` and returns the paths written.
///
/// Inline `data:` URLs are skipped without touching the filesystem.
pub fn download_images(client: &Client, links: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create image directory {:?}", dir))?;

    let pb = ProgressBar::new(links.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Downloading images [{bar:40.cyan/blue}] {pos}/{len}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );

    let mut paths = Vec::new();
    for link in links {
        pb.inc(1);
        if is_inline_data(link) {
            info!("Skipping inline image data.");
            continue;
        }
        match download_one(client, link, dir) {
            Ok(path) => {
                info!("Downloaded: {:?}", path);
                paths.push(path);
            }
            Err(e) => warn!("Failed to download image from {}: {:#}", link, e),
        }
    }
    pb.finish_and_clear();

    Ok(paths)
}

fn download_one(client: &Client, link: &str, dir: &Path) -> Result<PathBuf> {
    let bytes = client
        .get(link)
        .send()
        .context("Request failed")?
        .error_for_status()
        .context("Server returned an error status")?
        .bytes()
        .context("Failed to read response body")?;
    // Hosts that block hotlinking answer 200 with an HTML page.
    if image::guess_format(&bytes).is_err() {
        bail!("Response is not an image ({} bytes)", bytes.len());
    }

    let path = dir.join(unique_file_name(link));
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}

fn is_inline_data(link: &str) -> bool {
    link.trim_start().to_ascii_lowercase().starts_with("data:")
}

/// `image_<8 hex chars>.<ext>`; the random part keeps repeated keywords from
/// overwriting each other.
fn unique_file_name(link: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("image_{}.{}", &id[..8], file_extension_for(link))
}

/// Infers a file extension from the last dot-separated segment of a URL,
/// ignoring any query string. Unknown suffixes map to `jpg`.
pub fn file_extension_for(link: &str) -> &'static str {
    let candidate = link.rsplit('.').next().unwrap_or_default();
    let candidate = candidate.split('?').next().unwrap_or_default();
    let candidate: String = candidate.chars().take(4).collect::<String>().to_ascii_lowercase();

    DOWNLOAD_EXTENSIONS
        .iter()
        .find(|ext| **ext == candidate)
        .copied()
        .unwrap_or(DEFAULT_EXTENSION)
}
