mod common;

use common::write_pdf;
use medreel::text_cleaner::clean_unwanted_text;
use medreel::text_extractor::extract_text_from_pdf;

#[test]
fn pages_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_pdf(&path, &["MRI OF THE CERVICAL SPINE", "Mild disc bulge at C5-C6"]);

    let text = extract_text_from_pdf(&path).unwrap();
    let first = text.find("CERVICAL SPINE").unwrap();
    let second = text.find("disc bulge").unwrap();
    assert!(first < second);
    assert!(text.ends_with('\n'));
}

#[test]
fn signature_page_is_cleaned_away() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_pdf(
        &path,
        &[
            "IMPRESSION: Mild degenerative change.",
            "-Electronically Signed by: Dr. Smith",
        ],
    );

    let cleaned = clean_unwanted_text(&extract_text_from_pdf(&path).unwrap());
    assert!(cleaned.contains("Mild degenerative change."));
    assert!(!cleaned.contains("Signed"));
}
