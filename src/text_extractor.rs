//! Text Extraction Module
//!
//! Pulls the text layer out of a PDF report using the lopdf crate.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use lopdf::Document;
use std::path::Path;

/// Reads every page of the PDF at `path` and concatenates the page text in
/// page-number order.
///
/// A page whose content stream cannot be decoded is skipped with a warning so
/// one broken page does not lose the whole report.
pub fn extract_text_from_pdf(path: &Path) -> Result<String> {
    let mut doc = Document::load(path)
        .with_context(|| format!("Failed to open PDF document {:?}", path))?;

    if doc.is_encrypted() {
        // Many reports are "encrypted" with an empty user password.
        doc.decrypt("")
            .with_context(|| format!("PDF {:?} is encrypted and needs a password", path))?;
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        bail!("PDF {:?} contains no pages", path);
    }

    let mut text = String::new();
    let mut skipped = 0;
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                debug!("Page {} yielded {} characters", page_number, page_text.len());
                text.push_str(&page_text);
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => {
                warn!("Failed to extract text from page {}: {}. Skipping.", page_number, e);
                skipped += 1;
            }
        }
    }

    info!(
        "Extracted {} characters from {} pages of {:?} ({} skipped).",
        text.len(),
        pages.len(),
        path,
        skipped
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error() {
        let err = extract_text_from_pdf(Path::new("does/not/exist.pdf")).unwrap_err();
        assert!(err.to_string().contains("Failed to open PDF document"));
    }

    #[test]
    fn non_pdf_content_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some plain text").unwrap();
        assert!(extract_text_from_pdf(&path).is_err());
    }
}
