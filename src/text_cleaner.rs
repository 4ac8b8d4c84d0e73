//! Text Cleaning Module
//!
//! Strips the boilerplate that surrounds the clinical content of a report:
//! the referral pleasantry, the electronic signature block and the dated
//! review stamp. Each of these markers cuts the report off from that point on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Removal patterns, applied in order. `(?s)` lets `.*` run to the end of
/// the document.
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)Thank you for your kind referral.*",
        r"(?s)-Electronically Signed by:.*",
        r"(?s)On \d{2}/\d{2}/\d{4}.*",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("boilerplate pattern is valid"))
    .collect()
});

static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("blank-line pattern is valid"));

/// Removes known boilerplate and collapses runs of blank lines into a single
/// blank line. Running it on already-cleaned text is a no-op.
pub fn clean_unwanted_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in BOILERPLATE.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    BLANK_RUN
        .replace_all(&cleaned, "\n\n")
        .trim()
        .to_string()
}
