//! Video Generator Module
//!
//! Assembles the downloaded images and the narration into a slideshow video.
//! Every image gets an equal share of the narration; undecodable images are
//! skipped without re-balancing the share, and the final frame is held until
//! the audio ends.

use crate::error::MediaError;
use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbImage};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions the assembler will try to decode.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;
pub const FRAME_RATE: i32 = 24;

/// One still image shown for a fixed time.
#[derive(Debug)]
pub struct Clip {
    pub source: PathBuf,
    pub frame: RgbImage,
    pub duration: f64,
}

/// The ordered clips plus the audio they are timed against.
#[derive(Debug)]
pub struct Slideshow {
    pub clips: Vec<Clip>,
    pub per_image_duration: f64,
    pub audio_duration: f64,
}

impl Slideshow {
    /// Length of the concatenated clips before the audio forces the total.
    pub fn rendered_duration(&self) -> f64 {
        self.clips.len() as f64 * self.per_image_duration
    }

    /// Frames needed to cover the full audio track at `fps`.
    pub fn frame_count(&self, fps: i32) -> u64 {
        (self.audio_duration * fps as f64).round().max(1.0) as u64
    }

    /// Index of the clip on screen at `seconds`. Past the end of the clips the
    /// last one stays on screen.
    pub fn clip_index_at(&self, seconds: f64) -> usize {
        let last = self.clips.len().saturating_sub(1);
        if self.per_image_duration <= 0.0 || seconds <= 0.0 {
            return 0;
        }
        ((seconds / self.per_image_duration).floor() as usize).min(last)
    }
}

/// Audio probing and encoding, kept behind a trait so the assembly logic can
/// run without a media backend.
pub trait Renderer {
    /// Total duration of the audio track, in seconds.
    fn audio_duration(&self, audio: &Path) -> Result<f64>;

    /// Encodes `slideshow` with `audio` underneath into `output`.
    fn render(&self, slideshow: &Slideshow, audio: &Path, output: &Path) -> Result<()>;
}

/// Lists the accepted image files in `dir`, sorted by file name. A missing
/// directory has no images.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_accepted_extension(path))
        .collect();
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decodes an image, sniffing the format from the content, since downloads
/// only guess their extension from the URL.
pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read {:?}", path))?
        .decode()
        .with_context(|| format!("Failed to decode {:?}", path))
}

/// Decodes an image, converts it to RGB and resizes it to the video frame.
pub fn load_frame(path: &Path) -> Result<RgbImage> {
    let img = decode_image(path)?;
    Ok(image::imageops::resize(
        &img.to_rgb8(),
        FRAME_WIDTH,
        FRAME_HEIGHT,
        FilterType::Lanczos3,
    ))
}

/// Builds the timed clip list for `images` against an audio track of
/// `audio_duration` seconds.
///
/// The per-image share is computed from the number of candidate images and
/// is not recomputed when some of them fail to decode.
pub fn plan_slideshow(images: &[PathBuf], audio_duration: f64) -> Result<Slideshow> {
    let per_image_duration = audio_duration / images.len() as f64;
    info!(
        "Audio duration: {:.2}s, each image: {:.2}s",
        audio_duration, per_image_duration
    );

    let mut clips = Vec::with_capacity(images.len());
    let mut skipped = 0;
    for path in images {
        match load_frame(path) {
            Ok(frame) => {
                info!("Added: {:?}", path.file_name().unwrap_or_default());
                clips.push(Clip {
                    source: path.clone(),
                    frame,
                    duration: per_image_duration,
                });
            }
            Err(e) => {
                warn!("Skipped invalid image {:?}: {:#}", path, e);
                skipped += 1;
            }
        }
    }

    if clips.is_empty() {
        return Err(MediaError::NoValidImages { skipped }.into());
    }
    info!("Successfully processed {} images ({} skipped).", clips.len(), skipped);

    let slideshow = Slideshow {
        clips,
        per_image_duration,
        audio_duration,
    };
    let covered = slideshow.rendered_duration();
    if covered < audio_duration {
        info!(
            "Clips cover {:.2}s of {:.2}s audio; holding the last image.",
            covered, audio_duration
        );
    }
    Ok(slideshow)
}

/// Renders the images in `images_dir` over `audio` into `output`, then
/// deletes the images.
///
/// Fails with [`MediaError::NoSourceImages`] when the directory holds no
/// accepted files and [`MediaError::NoValidImages`] when none decode. The
/// images are only deleted after a successful render.
pub fn generate_video(
    renderer: &dyn Renderer,
    images_dir: &Path,
    audio: &Path,
    output: &Path,
) -> Result<PathBuf> {
    let images = collect_images(images_dir)?;
    if images.is_empty() {
        return Err(MediaError::NoSourceImages {
            dir: images_dir.to_path_buf(),
        }
        .into());
    }
    info!("Found {} images to process...", images.len());

    let audio_duration = renderer
        .audio_duration(audio)
        .with_context(|| format!("Failed to read audio file {:?}", audio))?;
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(MediaError::InvalidAudio {
            path: audio.to_path_buf(),
            duration: audio_duration,
        }
        .into());
    }

    let slideshow = plan_slideshow(&images, audio_duration)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create video parent directory")?;
    }
    info!("Writing video to {:?}...", output);
    renderer
        .render(&slideshow, audio, output)
        .context("Failed to render video")?;
    info!("Video created successfully: {:?}", output);

    clear_directory(images_dir)?;
    Ok(output.to_path_buf())
}

/// Deletes every regular file directly inside `dir`.
pub fn clear_directory(dir: &Path) -> Result<()> {
    info!("Cleaning up image directory {:?}", dir);
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        }
    }
    Ok(())
}
