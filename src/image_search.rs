//! Image Search Module
//!
//! Finds candidate image links for a keyword. The Custom Search API is tried
//! first; if it fails the public results page is scraped. Callers get an
//! empty list when nothing works and fall back to placeholders.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;

pub const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const RESULTS_PAGE_URL: &str = "https://www.google.com/search";

/// Number of results requested per keyword.
pub const DEFAULT_IMAGES_PER_KEYWORD: usize = 3;

/// The Custom Search API rejects `num` outside 1..=10.
const MAX_API_RESULTS: usize = 10;

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("img pattern is valid")
});

/// A source of image links for a keyword.
pub trait ImageSearch {
    fn name(&self) -> &str;
    fn search(&self, keyword: &str, count: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
}

/// Google Custom Search JSON API in image mode.
pub struct CustomSearchApi {
    client: Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl CustomSearchApi {
    pub fn new(client: Client, api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        CustomSearchApi {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            endpoint: CUSTOM_SEARCH_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl ImageSearch for CustomSearchApi {
    fn name(&self) -> &str {
        "custom search API"
    }

    fn search(&self, keyword: &str, count: usize) -> Result<Vec<String>> {
        let num = count.clamp(1, MAX_API_RESULTS).to_string();
        let response: SearchResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", keyword),
                ("cx", self.engine_id.as_str()),
                ("key", self.api_key.as_str()),
                ("searchType", "image"),
                ("num", num.as_str()),
            ])
            .send()
            .context("Search request failed")?
            .error_for_status()
            .context("Search API returned an error status")?
            .json()
            .context("Search API response was not valid JSON")?;

        Ok(links_from_response(response))
    }
}

fn links_from_response(response: SearchResponse) -> Vec<String> {
    response.items.into_iter().filter_map(|item| item.link).collect()
}

/// Scrapes the public image results page for `<img>` sources.
pub struct ResultsPageScraper {
    client: Client,
    endpoint: String,
}

impl ResultsPageScraper {
    pub fn new(client: Client) -> Self {
        ResultsPageScraper {
            client,
            endpoint: RESULTS_PAGE_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl ImageSearch for ResultsPageScraper {
    fn name(&self) -> &str {
        "results page scraper"
    }

    fn search(&self, keyword: &str, count: usize) -> Result<Vec<String>> {
        let query = format!("{} medical imaging", keyword);
        let html = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("tbm", "isch")])
            .send()
            .context("Results page request failed")?
            .text()
            .context("Results page body could not be read")?;

        Ok(image_sources(&html, count))
    }
}

/// `src` attributes of the `<img>` tags in `html`, skipping the first one
/// (the site logo), at most `count` of them.
pub fn image_sources(html: &str, count: usize) -> Vec<String> {
    IMG_SRC
        .captures_iter(html)
        .skip(1)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|src| !src.is_empty())
        .take(count)
        .collect()
}

/// Ordered search strategies; the first non-empty result wins.
pub struct SearchChain {
    strategies: Vec<Box<dyn ImageSearch>>,
}

impl SearchChain {
    pub fn new(strategies: Vec<Box<dyn ImageSearch>>) -> Self {
        SearchChain { strategies }
    }

    /// API first, scraper second.
    pub fn standard(client: Client, api_key: String, engine_id: String) -> Self {
        SearchChain::new(vec![
            Box::new(CustomSearchApi::new(client.clone(), api_key, engine_id)),
            Box::new(ResultsPageScraper::new(client)),
        ])
    }

    pub fn search(&self, keyword: &str, count: usize) -> Vec<String> {
        for strategy in &self.strategies {
            match strategy.search(keyword, count) {
                Ok(links) if !links.is_empty() => {
                    info!("Found {} images for '{}' via {}.", links.len(), keyword, strategy.name());
                    return links;
                }
                Ok(_) => debug!("{} returned no images for '{}'.", strategy.name(), keyword),
                Err(e) => warn!("{} failed for '{}': {:#}", strategy.name(), keyword, e),
            }
        }
        warn!("No images found for '{}'.", keyword);
        Vec::new()
    }
}
