mod common;

use common::write_png;
use ffmpeg_next as ffmpeg;
use medreel::video_encoder::{FfmpegRenderer, audio_duration};
use medreel::video_generator::{Renderer, collect_images, generate_video};
use std::fs;
use std::path::Path;

// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, mono, no CRC.
const MP3_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC4];
const MP3_FRAME_BYTES: usize = 417;
const MP3_FRAME_SECONDS: f64 = 1152.0 / 44100.0;

/// Writes `frames` silent MP3 frames. Zeroed side info decodes as silence.
fn write_silent_mp3(path: &Path, frames: usize) {
    let mut frame = vec![0u8; MP3_FRAME_BYTES];
    frame[..4].copy_from_slice(&MP3_HEADER);
    let bytes: Vec<u8> = std::iter::repeat(frame).take(frames).flatten().collect();
    fs::write(path, bytes).unwrap();
}

fn stream_counts(path: &Path) -> (usize, usize) {
    ffmpeg::init().unwrap();
    let ictx = ffmpeg::format::input(path).unwrap();
    let count = |medium: ffmpeg::media::Type| {
        ictx.streams()
            .filter(|s| s.parameters().medium() == medium)
            .count()
    };
    (
        count(ffmpeg::media::Type::Video),
        count(ffmpeg::media::Type::Audio),
    )
}

#[test]
fn audio_duration_reads_mp3_length() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("summary.mp3");
    write_silent_mp3(&audio, 77);

    let seconds = audio_duration(&audio).unwrap();
    assert!((seconds - 77.0 * MP3_FRAME_SECONDS).abs() < 0.1, "got {}", seconds);
}

#[test]
fn audio_duration_rejects_non_audio() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.mp3");
    fs::write(&path, b"not audio at all").unwrap();
    assert!(FfmpegRenderer.audio_duration(&path).is_err());
}

#[test]
fn slideshow_is_encoded_with_audio_for_its_duration() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    write_png(&images, "a.png", [200, 30, 30]);
    write_png(&images, "b.png", [30, 200, 30]);
    write_png(&images, "c.png", [30, 30, 200]);
    let audio = dir.path().join("summary.mp3");
    write_silent_mp3(&audio, 77);
    let output = dir.path().join("static").join("output_video.mp4");

    let renderer = FfmpegRenderer;
    let expected = renderer.audio_duration(&audio).unwrap();
    generate_video(&renderer, &images, &audio, &output).unwrap();

    assert_eq!(stream_counts(&output), (1, 1));
    let ictx = ffmpeg::format::input(&output).unwrap();
    let video = ictx.streams().best(ffmpeg::media::Type::Video).unwrap();
    assert_eq!(video.parameters().id(), ffmpeg::codec::Id::H264);
    let seconds = ictx.duration() as f64 / 1_000_000.0;
    assert!((seconds - expected).abs() < 0.15, "video {}s, audio {}s", seconds, expected);

    assert!(collect_images(&images).unwrap().is_empty());
}
