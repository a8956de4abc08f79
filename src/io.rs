// ============================================================================
// IMAGE I/O — decode, still PNG, animated GIF/APNG, ffmpeg video
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use image::RgbaImage;
use image::codecs::png::PngEncoder;

/// Decode any supported raster format to RGBA.
///
/// On failure nothing has been touched, so the caller's prior state is
/// retained — the contract for upload errors.
pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    let img = image::open(path)
        .map_err(|e| format!("could not decode '{}': {}", path.display(), e))?;
    Ok(img.to_rgba8())
}

/// Write a single transparent PNG frame.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("failed to create PNG file: {}", e))?;
    let encoder = PngEncoder::new(BufWriter::new(file));
    #[allow(deprecated)]
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| format!("PNG encode error: {}", e))
}

// ============================================================================
// ANIMATION ENCODING — GIF & APNG
// ============================================================================

/// Encode frames as an infinitely looping animated GIF.
///
/// Each frame gets its own NeuQuant palette with one slot reserved for full
/// transparency; frames dispose to background so transparent regions don't
/// smear across the loop.
pub fn encode_animated_gif(
    frames: &[RgbaImage],
    fps: f32,
    max_colors: u16,
    path: &Path,
) -> Result<(), String> {
    if frames.is_empty() {
        return Err("no frames to encode".to_string());
    }
    if frames[0].width() > u16::MAX as u32 || frames[0].height() > u16::MAX as u32 {
        return Err("image dimensions exceed GIF maximum (65535×65535)".to_string());
    }
    let (w, h) = (frames[0].width() as u16, frames[0].height() as u16);
    let delay_cs = ((100.0 / fps).round() as u16).max(1); // centiseconds

    let file = File::create(path).map_err(|e| format!("failed to create GIF file: {}", e))?;
    let colors = (max_colors as usize).clamp(2, 256);

    let (global_palette, _) = quantize_rgba(&frames[0], colors);
    let mut encoder = gif::Encoder::new(BufWriter::new(file), w, h, &global_palette)
        .map_err(|e| format!("GIF encoder init error: {}", e))?;
    encoder
        .set_repeat(gif::Repeat::Infinite)
        .map_err(|e| format!("GIF set repeat error: {}", e))?;

    for frame_img in frames {
        if frame_img.width() as u16 != w || frame_img.height() as u16 != h {
            return Err("GIF frames must all share dimensions".to_string());
        }
        let (local_palette, local_indexed) = quantize_rgba(frame_img, colors);
        let frame = gif::Frame {
            width: w,
            height: h,
            delay: delay_cs,
            palette: Some(local_palette),
            buffer: std::borrow::Cow::Owned(local_indexed),
            transparent: Some(0),
            dispose: gif::DisposalMethod::Background,
            ..Default::default()
        };
        encoder
            .write_frame(&frame)
            .map_err(|e| format!("GIF frame write error: {}", e))?;
    }

    Ok(())
}

/// Encode frames as an infinitely looping animated PNG (APNG).
pub fn encode_animated_png(frames: &[RgbaImage], fps: f32, path: &Path) -> Result<(), String> {
    if frames.is_empty() {
        return Err("no frames to encode".to_string());
    }

    let width = frames[0].width();
    let height = frames[0].height();
    let delay_num = (1000.0 / fps).round().clamp(1.0, 65535.0) as u16;
    let delay_den = 1000u16;

    let file = File::create(path).map_err(|e| format!("failed to create APNG file: {}", e))?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .set_animated(frames.len() as u32, 0) // 0 = infinite loop
        .map_err(|e| format!("APNG set_animated error: {}", e))?;

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("APNG header write error: {}", e))?;

    for frame_img in frames {
        writer
            .set_frame_delay(delay_num, delay_den)
            .map_err(|e| format!("APNG set frame delay error: {}", e))?;
        writer
            .set_dispose_op(png::DisposeOp::Background)
            .map_err(|e| format!("APNG set dispose op error: {}", e))?;
        writer
            .write_image_data(frame_img.as_raw())
            .map_err(|e| format!("APNG frame write error: {}", e))?;
    }

    writer
        .finish()
        .map_err(|e| format!("APNG finish error: {}", e))
}

/// Quantize an RGBA image to indexed color (palette + indices).
///
/// Index 0 is reserved for fully transparent pixels (alpha < 128); the
/// remaining slots come from NeuQuant trained on the opaque pixels only.
/// The palette is `[R,G,B, R,G,B, ...]` as the gif crate expects.
fn quantize_rgba(image: &RgbaImage, max_colors: usize) -> (Vec<u8>, Vec<u8>) {
    let opaque: Vec<u8> = image
        .pixels()
        .filter(|p| p[3] >= 128)
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();

    let quant_colors = max_colors.saturating_sub(1).max(2);
    let mut palette = vec![0u8, 0, 0]; // slot 0: transparent placeholder

    if opaque.is_empty() {
        let indices = vec![0u8; (image.width() * image.height()) as usize];
        return (palette, indices);
    }

    let nq = color_quant::NeuQuant::new(10, quant_colors, &opaque);
    for i in 0..quant_colors {
        if let Some(color) = nq.lookup(i) {
            palette.push(color[0]);
            palette.push(color[1]);
            palette.push(color[2]);
        } else {
            palette.push(0);
            palette.push(0);
            palette.push(0);
        }
    }

    let mut indices = Vec::with_capacity((image.width() * image.height()) as usize);
    for p in image.pixels() {
        if p[3] < 128 {
            indices.push(0);
        } else {
            let idx = nq.index_of(&[p[0], p[1], p[2], 255]) as u8;
            indices.push(idx.saturating_add(1));
        }
    }

    (palette, indices)
}

// ============================================================================
// VIDEO ENCODING — system ffmpeg subprocess
// ============================================================================
//
// Raw RGBA frames are piped to a spawned `ffmpeg` binary, which avoids any
// native FFmpeg dev header/library requirements.

/// `true` when an `ffmpeg` binary responds on PATH.
pub fn is_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streaming video encoder over an ffmpeg child process.
///
/// Push frames in order, then call [`finish`](Self::finish); dropping the
/// encoder without finishing abandons the child and the output file is
/// undefined.
#[derive(Debug)]
pub struct VideoEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
}

impl VideoEncoder {
    /// Spawn ffmpeg targeting `path`.  The container/codec follows the file
    /// extension: `.mp4` → H.264 yuv420p, anything else → VP9 WebM with an
    /// alpha-capable pixel format.  Dimensions must be even (4:2:0
    /// subsampling).
    pub fn new(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self, String> {
        if width == 0 || height == 0 || fps == 0 {
            return Err("video dimensions and fps must be non-zero".to_string());
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(format!(
                "video output requires even dimensions, got {}×{}",
                width, height
            ));
        }
        if !is_ffmpeg_available() {
            return Err("ffmpeg is required for video export, but was not found on PATH".to_string());
        }

        let mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(["-y", "-loglevel", "error"]);
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgba"]);
        cmd.args(["-s", &format!("{}x{}", width, height)]);
        cmd.args(["-r", &fps.to_string()]);
        cmd.args(["-i", "-"]);
        if mp4 {
            cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", "18"]);
            cmd.args(["-movflags", "+faststart"]);
        } else {
            cmd.args(["-c:v", "libvpx-vp9", "-pix_fmt", "yuva420p", "-b:v", "5M"]);
        }
        cmd.arg(path);

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn ffmpeg: {}", e))?;
        let stdin = child.stdin.take();

        Ok(Self {
            child,
            stdin,
            width,
            height,
        })
    }

    pub fn push_frame(&mut self, frame: &RgbaImage) -> Result<(), String> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame size {}×{} does not match encoder size {}×{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| "encoder already finished".to_string())?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| format!("ffmpeg pipe write error: {}", e))
    }

    /// Close the pipe and wait for ffmpeg to finish the container.
    pub fn finish(mut self) -> Result<(), String> {
        drop(self.stdin.take());
        let output = self
            .child
            .wait_with_output()
            .map_err(|e| format!("failed to wait for ffmpeg: {}", e))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            Err(format!("ffmpeg exited with {}: {}", output.status, tail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn frame(v: u8) -> RgbaImage {
        let mut img = RgbaImage::new(32, 32);
        for y in 8..24 {
            for x in 8..24 {
                img.put_pixel(x, y, Rgba([v, 128, 255 - v, 255]));
            }
        }
        img
    }

    #[test]
    fn animated_gif_roundtrips_frame_count_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.gif");
        let frames: Vec<RgbaImage> = (0..5).map(|i| frame(i * 40)).collect();
        encode_animated_gif(&frames, 20.0, 256, &path).unwrap();

        let file = File::open(&path).unwrap();
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(file).unwrap();
        assert_eq!(decoder.width(), 32);
        assert_eq!(decoder.height(), 32);
        let mut count = 0;
        while decoder.read_next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn gif_preserves_transparent_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.gif");
        encode_animated_gif(&[frame(200)], 20.0, 256, &path).unwrap();

        let file = File::open(&path).unwrap();
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(file).unwrap();
        let decoded = decoder.read_next_frame().unwrap().unwrap();
        // Top-left pixel was transparent going in
        assert_eq!(decoded.buffer[3], 0);
        // A center pixel was opaque
        let center = ((16 * 32 + 16) * 4) as usize;
        assert_eq!(decoded.buffer[center + 3], 255);
    }

    #[test]
    fn apng_writes_an_animated_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.png");
        let frames: Vec<RgbaImage> = (0..4).map(|i| frame(i * 60)).collect();
        encode_animated_png(&frames, 20.0, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        let anim = reader.info().animation_control().expect("acTL chunk");
        assert_eq!(anim.num_frames, 4);
        assert_eq!(anim.num_plays, 0); // infinite
    }

    #[test]
    fn empty_frame_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(encode_animated_gif(&[], 20.0, 256, &dir.path().join("x.gif")).is_err());
        assert!(encode_animated_png(&[], 20.0, &dir.path().join("x.png")).is_err());
    }

    #[test]
    fn video_encoder_rejects_odd_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let err = VideoEncoder::new(&dir.path().join("out.webm"), 33, 32, 60).unwrap_err();
        assert!(err.contains("even dimensions"), "{err}");
    }

    #[test]
    fn decode_failure_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not_an_image.png");
        std::fs::write(&bogus, b"definitely not a png").unwrap();
        let err = load_image(&bogus).unwrap_err();
        assert!(err.contains("not_an_image.png"));
    }
}
