// ============================================================================
// EXPORTER — deterministic phase sampling + encode dispatch
// ============================================================================
//
// Every export starts from phase zero so repeated exports of the same
// parameters are identical.  The contract with the encoders is: exactly N
// frames, in order, at a fixed resolution.

use std::path::Path;

use image::RgbaImage;

use crate::compositor::Compositor;
use crate::io::{self, VideoEncoder};
use crate::params::RenderParameters;
use crate::session::PHASE_RATE;

/// Frames sampled for one animation loop (GIF/APNG).
pub const SEQUENCE_FRAMES: usize = 20;
/// Playback rate of exported frame sequences.
pub const SEQUENCE_FPS: f32 = 20.0;
/// Capture rate of exported videos.
pub const VIDEO_FPS: u32 = 60;
/// Videos run the whole number of loops closest to this duration.
const VIDEO_TARGET_SECS: f64 = 4.0;

/// Output artifact kinds, named after their file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Gif,
    Apng,
    Png,
    Webm,
    Mp4,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Gif => "gif",
            ExportFormat::Apng => "apng",
            ExportFormat::Png => "png",
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4 => "mp4",
        }
    }

    /// Parse a format name or file extension; `png` means a still frame,
    /// `apng` the animated variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gif" => Some(ExportFormat::Gif),
            "apng" => Some(ExportFormat::Apng),
            "png" => Some(ExportFormat::Png),
            "webm" => Some(ExportFormat::Webm),
            "mp4" => Some(ExportFormat::Mp4),
            _ => None,
        }
    }
}

/// One export request.
#[derive(Clone, Copy, Debug)]
pub enum ExportJob {
    /// Single transparent frame at phase zero.
    Still,
    Gif { frames: usize, max_colors: u16 },
    Apng { frames: usize },
    Video { fps: u32 },
}

impl ExportJob {
    pub fn for_format(format: ExportFormat, frames: usize, max_colors: u16) -> Self {
        match format {
            ExportFormat::Png => ExportJob::Still,
            ExportFormat::Gif => ExportJob::Gif { frames, max_colors },
            ExportFormat::Apng => ExportJob::Apng { frames },
            ExportFormat::Webm | ExportFormat::Mp4 => ExportJob::Video { fps: VIDEO_FPS },
        }
    }
}

/// Sample the compositor at `n` evenly spaced phases covering exactly one
/// period (2 phase units), both clocks in lockstep.
pub fn sample_loop_frames(
    compositor: &Compositor,
    image: Option<&RgbaImage>,
    params: &RenderParameters,
    n: usize,
) -> Vec<RgbaImage> {
    let step = 2.0 / n.max(1) as f32;
    (0..n.max(1))
        .map(|i| {
            let phase = i as f32 * step;
            compositor.render(image, params, phase, phase)
        })
        .collect()
}

/// Run one export job to completion.
pub fn run_export(
    compositor: &Compositor,
    image: Option<&RgbaImage>,
    params: &RenderParameters,
    job: ExportJob,
    path: &Path,
) -> Result<(), String> {
    match job {
        ExportJob::Still => {
            let frame = compositor.render(image, params, 0.0, 0.0);
            io::write_png(&frame, path)
        }
        ExportJob::Gif { frames, max_colors } => {
            let sampled = sample_loop_frames(compositor, image, params, frames);
            io::encode_animated_gif(&sampled, SEQUENCE_FPS, max_colors, path)
        }
        ExportJob::Apng { frames } => {
            let sampled = sample_loop_frames(compositor, image, params, frames);
            io::encode_animated_png(&sampled, SEQUENCE_FPS, path)
        }
        ExportJob::Video { fps } => export_video(compositor, image, params, fps, path),
    }
}

/// Continuous capture: drive the render loop at `fps` for the whole number
/// of animation loops closest to the target duration (at least one), piping
/// frames to ffmpeg.
fn export_video(
    compositor: &Compositor,
    image: Option<&RgbaImage>,
    params: &RenderParameters,
    fps: u32,
    path: &Path,
) -> Result<(), String> {
    let mut avg_speed = ((params.image_speed + params.frame_speed) * 0.5) as f64;
    if avg_speed <= 0.0 {
        avg_speed = 1.0;
    }
    let loop_secs = 2.0 / (PHASE_RATE * avg_speed);
    let loops = ((VIDEO_TARGET_SECS / loop_secs).round() as u64).max(1);
    let frame_count = ((loops as f64 * loop_secs) * fps as f64).round().max(1.0) as u64;

    let size = params.output_size;
    let mut encoder = VideoEncoder::new(path, size, size, fps)?;
    for i in 0..frame_count {
        let t = i as f64 / fps as f64;
        let image_phase = (PHASE_RATE * params.image_speed as f64 * t) as f32;
        let frame_phase = (PHASE_RATE * params.frame_speed as f64 * t) as f32;
        encoder.push_frame(&compositor.render(image, params, image_phase, frame_phase))?;
    }
    encoder.finish()
}
