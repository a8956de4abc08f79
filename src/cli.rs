// ============================================================================
// LoadSpin CLI — headless batch rendering via command-line arguments
// ============================================================================
//
// Usage examples:
//   loadspin --input logo.png --output loading.gif
//   loadspin -i logo.png --template classic-spin -o loading.webm
//   loadspin -i *.png --output-dir out/ --format apng --text "Loading..."
//   loadspin -i photo.jpg --crop 40,40,300x300 --frame-style dots -o out.gif
//
// All processing runs synchronously on the current thread; rayon fans out
// per-row pixel work internally.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::compositor::Compositor;
use crate::exporter::{ExportFormat, ExportJob, SEQUENCE_FRAMES};
use crate::ops::crop::CropRect;
use crate::params::{FrameMotion, FrameStyle, ImageMotion, RenderParameters, Template, TextRotateMode};
use crate::session::EditSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// LoadSpin headless loading-animation renderer.
///
/// Turn an image into a looping loading animation — no browser required.
#[derive(Parser, Debug)]
#[command(
    name = "loadspin",
    about = "LoadSpin headless loading-animation renderer",
    long_about = "Key out an image's background, composite it with an animated frame\n\
                  and label, and export a looping GIF/APNG, a still PNG, or a WebM/MP4\n\
                  video (system ffmpeg required for video).\n\n\
                  Example:\n  \
                  loadspin --input logo.png --template classic-spin --output loading.gif\n  \
                  loadspin -i *.png --output-dir out/ --format apng --text \"Loading...\""
)]
pub struct CliArgs {
    /// Input image file(s). Glob patterns accepted (e.g. "*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the input stem and the format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: gif, apng, png (still frame), webm, mp4.
    /// When omitted, inferred from --output's extension, defaulting to gif.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Start from a named preset, then apply any explicit flags on top.
    #[arg(long, value_enum)]
    pub template: Option<Template>,

    #[arg(long, value_enum)]
    pub frame_style: Option<FrameStyle>,

    #[arg(long, value_enum)]
    pub frame_motion: Option<FrameMotion>,

    /// Frame color as #rgb, #rrggbb or #rrggbbaa.
    #[arg(long, value_name = "HEX")]
    pub frame_color: Option<String>,

    /// Frame phase speed multiplier (default 1.0).
    #[arg(long, value_name = "MULT")]
    pub frame_speed: Option<f32>,

    #[arg(long, value_enum)]
    pub image_motion: Option<ImageMotion>,

    /// Image phase speed multiplier (default 1.0).
    #[arg(long, value_name = "MULT")]
    pub image_speed: Option<f32>,

    /// Square output edge in pixels (default 512).
    #[arg(long, value_name = "PX")]
    pub size: Option<u32>,

    /// Image size multiplier (default 1.0).
    #[arg(long, value_name = "MULT")]
    pub scale: Option<f32>,

    /// Label text (empty = no label).
    #[arg(long)]
    pub text: Option<String>,

    /// Label color as #rgb, #rrggbb or #rrggbbaa.
    #[arg(long, value_name = "HEX")]
    pub text_color: Option<String>,

    /// System font family for the label.
    #[arg(long, value_name = "FAMILY")]
    pub text_font: Option<String>,

    /// Font size percentage (default 100).
    #[arg(long, value_name = "PCT")]
    pub text_size: Option<f32>,

    /// Angular spacing multiplier for rotating text (default 1.0).
    #[arg(long, value_name = "MULT")]
    pub text_spacing: Option<f32>,

    #[arg(long, value_enum)]
    pub text_rotate_mode: Option<TextRotateMode>,

    /// Skip background removal entirely.
    #[arg(long)]
    pub keep_background: bool,

    /// Crop the buffers before rendering: X,Y,WxH in source pixels
    /// (after diagonal padding).
    #[arg(long, value_name = "X,Y,WxH")]
    pub crop: Option<String>,

    /// Frames per exported GIF/APNG loop.
    #[arg(long, default_value_t = SEQUENCE_FRAMES, value_name = "N")]
    pub frames: usize,

    /// Max GIF palette size (2-256).
    #[arg(long, default_value_t = 256, value_name = "N")]
    pub gif_colors: u16,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let params = match build_params(&args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let crop_rect = match args.crop.as_deref().map(parse_crop) {
        None => None,
        Some(Ok(rect)) => Some(rect),
        Some(Err(e)) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = parse_format(args.format.as_deref(), args.output.as_deref());
    let job = ExportJob::for_format(format, args.frames.max(1), args.gif_colors);

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    // One compositor (and font lookup) shared across the whole batch
    let compositor = Compositor::for_family(&params.text_font);

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, &compositor, &params, crop_rect, job, &args) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    compositor: &Compositor,
    params: &RenderParameters,
    crop_rect: Option<CropRect>,
    job: ExportJob,
    args: &CliArgs,
) -> Result<(), String> {
    // -- Step 1: Load + matte -------------------------------------------
    let mut session = EditSession::load(input, !args.keep_background)?;

    // -- Step 2: Optional crop ------------------------------------------
    if let Some(rect) = crop_rect {
        if !session.apply_crop_rect(&rect) {
            return Err(format!(
                "crop {}x{} at ({}, {}) is below the {} px minimum or empty",
                rect.w,
                rect.h,
                rect.x,
                rect.y,
                crate::ops::crop::MIN_CROP_SIZE
            ));
        }
    }

    // -- Step 3: Export -------------------------------------------------
    session.export(compositor, params, job, output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Merge defaults, the optional template, and explicit flags into the final
/// parameter set.  Explicit flags win over the template.
fn build_params(args: &CliArgs) -> Result<RenderParameters, String> {
    let mut params = RenderParameters::default();
    if let Some(template) = args.template {
        template.apply(&mut params);
    }

    if let Some(v) = args.frame_style {
        params.frame_style = v;
    }
    if let Some(v) = args.frame_motion {
        params.frame_motion = v;
    }
    if let Some(hex) = &args.frame_color {
        params.frame_color = parse_hex_color(hex)?;
    }
    if let Some(v) = args.frame_speed {
        params.frame_speed = v;
    }
    if let Some(v) = args.image_motion {
        params.image_motion = v;
    }
    if let Some(v) = args.image_speed {
        params.image_speed = v;
    }
    if let Some(v) = args.size {
        params.output_size = v.max(16);
    }
    if let Some(v) = args.scale {
        params.image_scale = v;
    }
    if let Some(v) = &args.text {
        params.text = v.clone();
    }
    if let Some(hex) = &args.text_color {
        params.text_color = parse_hex_color(hex)?;
    }
    if let Some(v) = &args.text_font {
        params.text_font = v.clone();
    }
    if let Some(v) = args.text_size {
        params.text_size = v;
    }
    if let Some(v) = args.text_spacing {
        params.text_spacing = v;
    }
    if let Some(v) = args.text_rotate_mode {
        params.text_rotate_mode = v;
    }

    Ok(params)
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`ExportFormat`] from the `--format` string or infer it from
/// the output file extension.  Defaults to GIF when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> ExportFormat {
    if let Some(f) = format_arg
        && let Some(format) = ExportFormat::from_name(f)
    {
        return format;
    }

    if let Some(out) = output
        && let Some(format) = out
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_name)
    {
        return format;
    }

    ExportFormat::Gif
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_loading` to the stem if it would collide with the input)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_loading.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into straight-alpha RGBA.
fn parse_hex_color(hex: &str) -> Result<[u8; 4], String> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let bad = || format!("invalid hex color '{}'", hex);

    let nibble = |c: u8| -> Result<u8, String> {
        (c as char).to_digit(16).map(|d| d as u8).ok_or_else(bad)
    };

    match digits.len() {
        3 => {
            let b = digits.as_bytes();
            let r = nibble(b[0])?;
            let g = nibble(b[1])?;
            let bl = nibble(b[2])?;
            Ok([r * 17, g * 17, bl * 17, 255])
        }
        6 | 8 => {
            let b = digits.as_bytes();
            let byte = |i: usize| -> Result<u8, String> {
                Ok(nibble(b[i])? * 16 + nibble(b[i + 1])?)
            };
            let a = if digits.len() == 8 { byte(6)? } else { 255 };
            Ok([byte(0)?, byte(2)?, byte(4)?, a])
        }
        _ => Err(bad()),
    }
}

/// Parse `X,Y,WxH` (e.g. `10,20,300x240`) into a crop rectangle.
fn parse_crop(spec: &str) -> Result<CropRect, String> {
    let bad = || format!("invalid crop '{}', expected X,Y,WxH", spec);
    let mut parts = spec.split(',');
    let x = parts.next().and_then(|s| s.trim().parse::<f32>().ok()).ok_or_else(bad)?;
    let y = parts.next().and_then(|s| s.trim().parse::<f32>().ok()).ok_or_else(bad)?;
    let wh = parts.next().ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad());
    }
    let (w, h) = wh.split_once('x').ok_or_else(bad)?;
    let w = w.trim().parse::<f32>().map_err(|_| bad())?;
    let h = h.trim().parse::<f32>().map_err(|_| bad())?;
    Ok(CropRect { x, y, w, h })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_in_all_three_widths() {
        assert_eq!(parse_hex_color("#fff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_hex_color("#6366f1").unwrap(), [0x63, 0x66, 0xf1, 255]);
        assert_eq!(parse_hex_color("f472b680").unwrap(), [0xf4, 0x72, 0xb6, 0x80]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn crop_spec_parses_x_y_wxh() {
        let rect = parse_crop("10,20,300x240").unwrap();
        assert_eq!((rect.x, rect.y, rect.w, rect.h), (10.0, 20.0, 300.0, 240.0));
        assert!(parse_crop("10,20").is_err());
        assert!(parse_crop("10,20,300").is_err());
        assert!(parse_crop("a,b,cxd").is_err());
    }

    #[test]
    fn format_inference_prefers_flag_then_extension_then_gif() {
        let out = PathBuf::from("anim.webm");
        assert_eq!(parse_format(Some("apng"), Some(&out)), ExportFormat::Apng);
        assert_eq!(parse_format(None, Some(&out)), ExportFormat::Webm);
        assert_eq!(parse_format(None, None), ExportFormat::Gif);
        assert_eq!(parse_format(Some("bogus"), None), ExportFormat::Gif);
    }

    #[test]
    fn output_path_avoids_clobbering_the_input() {
        let input = PathBuf::from("art/logo.gif");
        let path = build_output_path(&input, None, None, ExportFormat::Gif).unwrap();
        assert_eq!(path, PathBuf::from("art/logo_loading.gif"));

        let path = build_output_path(&input, None, None, ExportFormat::Apng).unwrap();
        assert_eq!(path, PathBuf::from("art/logo.apng"));
    }

    #[test]
    fn explicit_flags_override_the_template() {
        let args = CliArgs::parse_from([
            "loadspin",
            "-i",
            "x.png",
            "--template",
            "classic-spin",
            "--image-motion",
            "bounce",
        ]);
        let params = build_params(&args).unwrap();
        assert_eq!(params.frame_style, FrameStyle::Ring); // from template
        assert_eq!(params.image_motion, ImageMotion::Bounce); // flag wins
    }
}
