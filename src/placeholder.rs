//! Placeholder Image Module
//!
//! Generates solid-color title cards when no real image could be sourced, so
//! the media assembler always has something to show.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const PLACEHOLDER_WIDTH: u32 = 1280;
pub const PLACEHOLDER_HEIGHT: u32 = 720;

const MIN_PLACEHOLDERS: usize = 10;
const PLACEHOLDERS_PER_KEYWORD: usize = 3;
const MAX_LABEL_CHARS: usize = 30;
const FALLBACK_LABEL: &str = "MEDICAL IMAGE";

const PALETTE: [[u8; 3]; 6] = [
    [52, 152, 219],
    [46, 204, 113],
    [155, 89, 182],
    [241, 196, 15],
    [231, 76, 60],
    [26, 188, 156],
];
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// Glyph cell: 5x7 pixels plus one column of spacing.
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const CELL_WIDTH: u32 = GLYPH_WIDTH + 1;
const MAX_SCALE: u32 = 12;

/// How many placeholders to generate for a keyword list.
pub fn placeholder_count(keyword_count: usize) -> usize {
    MIN_PLACEHOLDERS.max(keyword_count * PLACEHOLDERS_PER_KEYWORD)
}

/// Writes `count` placeholder JPEGs into `dir`, cycling through `keywords`
/// for the label text.
pub fn create_placeholder_images(
    keywords: &[String],
    dir: &Path,
    count: usize,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create image directory {:?}", dir))?;

    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let label = match keywords {
            [] => FALLBACK_LABEL.to_string(),
            _ => keywords[i % keywords.len()]
                .to_uppercase()
                .chars()
                .take(MAX_LABEL_CHARS)
                .collect(),
        };
        let img = render_card(&label, PALETTE[i % PALETTE.len()]);

        // Zero padding keeps lexicographic order equal to creation order.
        let path = dir.join(format!("placeholder_{:03}.jpg", i));
        img.save(&path)
            .with_context(|| format!("Failed to save placeholder to {:?}", path))?;
        info!("Created placeholder: {:?}", path);
        paths.push(path);
    }
    Ok(paths)
}

/// A solid card with `label` centered in white.
fn render_card(label: &str, background: [u8; 3]) -> RgbImage {
    let mut img = RgbImage::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, Rgb(background));

    let chars: Vec<char> = label.chars().collect();
    if chars.is_empty() {
        return img;
    }
    let text_cells = chars.len() as u32 * CELL_WIDTH;
    let scale = (PLACEHOLDER_WIDTH * 9 / 10 / text_cells).clamp(1, MAX_SCALE);
    let text_width = (text_cells - 1) * scale;
    let origin_x = PLACEHOLDER_WIDTH.saturating_sub(text_width) / 2;
    let origin_y = (PLACEHOLDER_HEIGHT - GLYPH_HEIGHT * scale) / 2;

    for (index, c) in chars.iter().enumerate() {
        let cell_x = origin_x + index as u32 * CELL_WIDTH * scale;
        for (row, bits) in glyph(*c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = cell_x + col * scale;
                let y0 = origin_y + row as u32 * scale;
                fill_block(&mut img, x0, y0, scale);
            }
        }
    }
    img
}

fn fill_block(img: &mut RgbImage, x0: u32, y0: u32, size: u32) {
    for y in y0..(y0 + size).min(img.height()) {
        for x in x0..(x0 + size).min(img.width()) {
            img.put_pixel(x, y, TEXT_COLOR);
        }
    }
}

/// 5x7 bitmap glyphs; bit 4 is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ' ' => [0; 7],
        // Anything else renders as an empty box.
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_at_least_ten_or_three_per_keyword() {
        assert_eq!(placeholder_count(0), 10);
        assert_eq!(placeholder_count(3), 10);
        assert_eq!(placeholder_count(4), 12);
        assert_eq!(placeholder_count(10), 30);
    }

    #[test]
    fn writes_sorted_decodable_cards() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = vec!["disc bulge".to_string(), "spine".to_string()];
        let paths = create_placeholder_images(&keywords, dir.path(), 12).unwrap();
        assert_eq!(paths.len(), 12);

        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(sorted, paths);

        let img = image::open(&paths[0]).unwrap();
        assert_eq!((img.width(), img.height()), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
    }

    #[test]
    fn works_without_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let paths = create_placeholder_images(&[], dir.path(), 3).unwrap();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn card_has_background_and_text() {
        let card = render_card("SPINE", PALETTE[0]);
        assert_eq!(*card.get_pixel(0, 0), Rgb(PALETTE[0]));
        assert!(card.pixels().any(|p| *p == TEXT_COLOR));
    }

    #[test]
    fn long_labels_stay_inside_the_frame() {
        let label = "W".repeat(MAX_LABEL_CHARS);
        let card = render_card(&label, PALETTE[1]);
        assert_eq!(card.dimensions(), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert!(card.pixels().any(|p| *p == TEXT_COLOR));
    }
}
