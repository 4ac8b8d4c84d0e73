//! Error Types
//!
//! Most of the crate reports failures through `anyhow`. The media assembler
//! has a few fatal conditions that callers need to tell apart, so those get a
//! typed error that can be recovered with `downcast_ref`.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions raised while assembling the slideshow video.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The image directory held no file with an accepted extension.
    #[error("No source images found in {dir:?}")]
    NoSourceImages { dir: PathBuf },

    /// Every candidate image failed to decode.
    #[error("No valid images found to create a video ({skipped} files could not be decoded)")]
    NoValidImages { skipped: usize },

    /// The audio track reported a duration that cannot drive the slideshow.
    #[error("Audio file {path:?} has an unusable duration of {duration}s")]
    InvalidAudio { path: PathBuf, duration: f64 },
}
