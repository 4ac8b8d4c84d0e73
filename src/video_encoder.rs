//! Video Encoding Module
//!
//! Encodes a planned slideshow to H.264 and muxes the narration into the same
//! MP4 using the ffmpeg-next crate.

use crate::video_generator::{FRAME_RATE, Renderer, Slideshow};
use anyhow::{Context, Result, anyhow};
use ffmpeg::codec::{self, encoder};
use ffmpeg::format::{self, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as ScalingContext, flag::Flags};
use ffmpeg::util::frame::video::Video;
use ffmpeg::{Dictionary, Packet, Rational};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::Path;

const H264_ENCODER: &str = "libx264";
const X264_PRESET: &str = "medium";

/// The production [`Renderer`]: libx264 video at 24 fps with the audio stream
/// copied into the container.
#[derive(Debug, Default)]
pub struct FfmpegRenderer;

impl Renderer for FfmpegRenderer {
    fn audio_duration(&self, audio: &Path) -> Result<f64> {
        audio_duration(audio)
    }

    fn render(&self, slideshow: &Slideshow, audio: &Path, output: &Path) -> Result<()> {
        render_slideshow(slideshow, audio, output)
    }
}

/// Reads the duration of an audio file in seconds.
///
/// Container duration is preferred; the stream duration is the fallback for
/// containers that do not report one.
pub fn audio_duration(path: &Path) -> Result<f64> {
    ffmpeg::init().context("Failed to initialize FFmpeg")?;
    let ictx = format::input(path).context("Failed to open audio file")?;
    let stream = ictx
        .streams()
        .best(Type::Audio)
        .ok_or_else(|| anyhow!("Could not find audio stream in file"))?;

    // Container duration is in AV_TIME_BASE units (microseconds).
    let duration = ictx.duration();
    if duration > 0 {
        return Ok(duration as f64 / 1_000_000.0);
    }

    let stream_duration = stream.duration();
    if stream_duration > 0 {
        return Ok(stream_duration as f64 * f64::from(stream.time_base()));
    }

    Err(anyhow!("Could not determine audio duration from metadata"))
}

/// Owns the H.264 encoder and the converted frame of every clip.
struct SlideEncoder {
    encoder: encoder::Video,
    stream_index: usize,
    stream_time_base: Rational,
    frames: Vec<Video>,
}

impl SlideEncoder {
    fn encoder_time_base() -> Rational {
        Rational::new(1, FRAME_RATE)
    }

    /// Sends frame number `index` (shown at `index / FRAME_RATE` seconds).
    fn encode_frame(
        &mut self,
        slideshow: &Slideshow,
        index: u64,
        octx: &mut format::context::Output,
    ) -> Result<()> {
        let seconds = index as f64 / FRAME_RATE as f64;
        let frame = &mut self.frames[slideshow.clip_index_at(seconds)];
        frame.set_pts(Some(index as i64));
        self.encoder
            .send_frame(frame)
            .context("Failed to send frame to encoder")?;
        self.write_packets(octx)
    }

    fn finish(&mut self, octx: &mut format::context::Output) -> Result<()> {
        self.encoder.send_eof().context("Failed to flush encoder")?;
        self.write_packets(octx)
    }

    fn write_packets(&mut self, octx: &mut format::context::Output) -> Result<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.stream_index);
            encoded.rescale_ts(Self::encoder_time_base(), self.stream_time_base);
            encoded
                .write_interleaved(octx)
                .context("Failed to write video packet")?;
        }
        Ok(())
    }
}

/// Encodes `slideshow` with the audio of `audio_path` into `output`.
///
/// Video frames are interleaved with the audio packets by timestamp. The
/// output is forced to the audio duration: frames past the last clip repeat
/// it, and audio packets starting at or after the end are dropped.
pub fn render_slideshow(slideshow: &Slideshow, audio_path: &Path, output: &Path) -> Result<()> {
    ffmpeg::init().context("Failed to initialize FFmpeg")?;

    let mut ictx = format::input(audio_path).context("Failed to open audio file")?;
    let (audio_index, audio_time_base, audio_parameters) = {
        let stream = ictx
            .streams()
            .best(Type::Audio)
            .context("Could not find audio stream")?;
        (stream.index(), stream.time_base(), stream.parameters())
    };

    let mut octx = format::output(output).context("Failed to create output file")?;
    let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

    // Video stream.
    let codec = encoder::find_by_name(H264_ENCODER)
        .ok_or_else(|| anyhow!("{} encoder not available", H264_ENCODER))?;
    let (video_index, opened) = {
        let mut ost = octx.add_stream(codec).context("Failed to add video stream")?;
        let mut video = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("Failed to create video encoder")?;
        video.set_width(slideshow_width(slideshow));
        video.set_height(slideshow_height(slideshow));
        video.set_format(Pixel::YUV420P);
        video.set_time_base(SlideEncoder::encoder_time_base());
        video.set_frame_rate(Some(Rational::new(FRAME_RATE, 1)));
        if global_header {
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let mut options = Dictionary::new();
        options.set("preset", X264_PRESET);
        let opened = video
            .open_with(options)
            .context("Failed to open H.264 encoder")?;
        ost.set_parameters(&opened);
        ost.set_time_base(SlideEncoder::encoder_time_base());
        (ost.index(), opened)
    };

    // Audio stream, copied as-is.
    let audio_out_index = {
        let mut ost = octx
            .add_stream(encoder::find(codec::Id::None))
            .context("Failed to add audio stream")?;
        ost.set_parameters(audio_parameters);
        // The input container's codec tag may be invalid in MP4.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        ost.index()
    };

    octx.write_header().context("Failed to write container header")?;
    let video_time_base = stream_time_base(&octx, video_index)?;
    let audio_out_time_base = stream_time_base(&octx, audio_out_index)?;

    let mut slides = SlideEncoder {
        encoder: opened,
        stream_index: video_index,
        stream_time_base: video_time_base,
        frames: slideshow
            .clips
            .iter()
            .map(|clip| to_yuv_frame(&clip.frame))
            .collect::<Result<_>>()?,
    };

    let total_frames = slideshow.frame_count(FRAME_RATE);
    info!(
        "Encoding {} frames from {} clips at {} fps.",
        total_frames,
        slideshow.clips.len(),
        FRAME_RATE
    );
    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Encoding frames [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) [{elapsed_precise}<{eta}]")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );

    let mut next_frame = 0u64;
    let mut dropped_audio = 0;
    for (stream, mut packet) in ictx.packets() {
        if stream.index() != audio_index {
            continue;
        }
        let start = packet
            .pts()
            .or(packet.dts())
            .map(|ts| ts as f64 * f64::from(audio_time_base))
            .unwrap_or(0.0);
        if start >= slideshow.audio_duration {
            dropped_audio += 1;
            continue;
        }

        while next_frame < total_frames && next_frame as f64 / FRAME_RATE as f64 <= start {
            slides.encode_frame(slideshow, next_frame, &mut octx)?;
            next_frame += 1;
            pb.inc(1);
        }

        packet.rescale_ts(audio_time_base, audio_out_time_base);
        packet.set_position(-1);
        packet.set_stream(audio_out_index);
        packet
            .write_interleaved(&mut octx)
            .context("Failed to write audio packet")?;
    }

    while next_frame < total_frames {
        slides.encode_frame(slideshow, next_frame, &mut octx)?;
        next_frame += 1;
        pb.inc(1);
    }
    slides.finish(&mut octx)?;
    octx.write_trailer().context("Failed to write container trailer")?;

    pb.finish_with_message(format!("Encoded {} frames", next_frame));
    if dropped_audio > 0 {
        debug!("Dropped {} audio packets past the end of the track.", dropped_audio);
    }
    Ok(())
}

fn stream_time_base(octx: &format::context::Output, index: usize) -> Result<Rational> {
    octx.stream(index)
        .map(|stream| stream.time_base())
        .ok_or_else(|| anyhow!("Output stream {} is missing", index))
}

fn slideshow_width(slideshow: &Slideshow) -> u32 {
    slideshow.clips.first().map(|c| c.frame.width()).unwrap_or(0)
}

fn slideshow_height(slideshow: &Slideshow) -> u32 {
    slideshow.clips.first().map(|c| c.frame.height()).unwrap_or(0)
}

/// Copies an RGB image into an ffmpeg frame (honouring the row stride) and
/// converts it to YUV 4:2:0 for the encoder.
fn to_yuv_frame(image: &RgbImage) -> Result<Video> {
    let (width, height) = image.dimensions();
    let mut rgb_frame = Video::new(Pixel::RGB24, width, height);

    let stride = rgb_frame.stride(0);
    let row_bytes = width as usize * 3;
    if stride < row_bytes {
        return Err(anyhow!("Invalid frame stride"));
    }
    let source = image.as_raw();
    let data = rgb_frame.data_mut(0);
    for y in 0..height as usize {
        let src = &source[y * row_bytes..(y + 1) * row_bytes];
        data[y * stride..y * stride + row_bytes].copy_from_slice(src);
    }

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        width,
        height,
        Pixel::YUV420P,
        width,
        height,
        Flags::BILINEAR,
    )
    .context("Failed to create scaler")?;
    let mut yuv_frame = Video::empty();
    scaler
        .run(&rgb_frame, &mut yuv_frame)
        .context("Scaler failed")?;
    Ok(yuv_frame)
}
