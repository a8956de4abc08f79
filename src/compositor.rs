// ============================================================================
// ANIMATION COMPOSITOR — frame decoration + transformed image + label
// ============================================================================

use std::f32::consts::{PI, TAU};

use ab_glyph::FontArc;
use image::RgbaImage;

use crate::ops::motion;
use crate::ops::raster;
use crate::ops::text;
use crate::params::{DUAL_RING_ACCENT, FrameMotion, FrameStyle, RenderParameters, TextRotateMode};

/// Renders one output frame from the processed buffer, the render
/// parameters, and a phase pair.
///
/// `render` is deterministic: the same inputs produce the same bytes, which
/// the exporter relies on when re-sampling phases.  The image phase and the
/// frame phase are independent so the two motions can run at different
/// speeds.
pub struct Compositor {
    font: Option<FontArc>,
}

impl Compositor {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Resolve `family` from the system fonts, falling back to a list of
    /// common families.  Text drawing is skipped entirely when no font can
    /// be found.
    pub fn for_family(family: &str) -> Self {
        let font = text::load_system_font(family).or_else(text::fallback_font);
        if font.is_none() {
            crate::log_warn!("no usable font for family '{}'; text disabled", family);
        }
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Composite one frame at the given phases.  Draw order: frame
    /// decoration, then the image under its motion transform, then the
    /// fixed label.
    pub fn render(
        &self,
        image: Option<&RgbaImage>,
        params: &RenderParameters,
        image_phase: f32,
        frame_phase: f32,
    ) -> RgbaImage {
        let size = params.output_size.max(1);
        let sizef = size as f32;
        let center = (sizef * 0.5, sizef * 0.5);
        let mut out = RgbaImage::new(size, size);

        self.draw_frame(&mut out, params, frame_phase);

        if let Some(src) = image {
            let m = motion::image_motion(params.image_motion, image_phase, sizef);
            let dest_size = sizef * 0.45 * params.image_scale;
            raster::draw_image_over(&mut out, src, center, dest_size, &m);
        }

        if !params.text.is_empty()
            && params.frame_style != FrameStyle::TextRotate
            && let Some(font) = &self.font
        {
            let font_size = sizef * 0.07 * (params.text_size / 100.0);
            text::draw_label(
                &mut out,
                font,
                &params.text,
                font_size,
                sizef * 0.5,
                sizef * 0.92,
                params.text_color,
                true,
            );
        }

        out
    }

    fn draw_frame(&self, out: &mut RgbaImage, params: &RenderParameters, t: f32) {
        if params.frame_style == FrameStyle::None {
            return;
        }
        if params.frame_style == FrameStyle::TextRotate {
            self.draw_text_ring(out, params, t);
            return;
        }

        let sizef = params.output_size as f32;
        let center = (sizef * 0.5, sizef * 0.5);
        let (rot, scale) = motion::frame_motion(params.frame_motion, t);
        let moving = params.frame_motion != FrameMotion::Static;
        let radius = sizef * 0.35 * scale;
        let line_width = sizef * 0.03 * scale;
        let color = params.frame_color;

        match params.frame_style {
            FrameStyle::Ring => {
                raster::stroke_arc(out, center, radius, rot, PI * 1.5, line_width, color);
            }
            FrameStyle::DualRing => {
                raster::stroke_arc(out, center, radius, rot, PI * 0.5, line_width, color);
                raster::stroke_arc(out, center, radius, rot + PI, PI * 0.5, line_width, color);
                // Inner arc counter-rotates at double rate
                let inner_rot = rot + if moving { -t * 2.0 * TAU } else { 0.0 };
                raster::stroke_arc(
                    out,
                    center,
                    radius * 0.8,
                    inner_rot,
                    PI * 0.5,
                    line_width,
                    DUAL_RING_ACCENT,
                );
            }
            FrameStyle::Dots => {
                // The phase offset stacks on top of the base rotation
                let offset = if moving { t * TAU } else { 0.0 };
                for i in 0..8u32 {
                    let angle = i as f32 / 8.0 * TAU + offset + rot;
                    let pos = (
                        center.0 + angle.cos() * radius,
                        center.1 + angle.sin() * radius,
                    );
                    let mut dot_color = color;
                    dot_color[3] = (dot_color[3] as f32 * i as f32 / 8.0).round() as u8;
                    raster::fill_disc(out, pos, radius * 0.15, dot_color);
                }
            }
            FrameStyle::Dash => {
                let dash = sizef * 0.05 * scale;
                let offset = if moving { -t * 100.0 * scale } else { 0.0 };
                raster::stroke_dashed_circle(
                    out, center, radius, line_width, dash, dash, offset, rot, color,
                );
            }
            FrameStyle::TextRotate | FrameStyle::None => unreachable!(),
        }
    }

    fn draw_text_ring(&self, out: &mut RgbaImage, params: &RenderParameters, t: f32) {
        let Some(font) = &self.font else {
            return;
        };
        let label = if params.text.is_empty() { "LOADING " } else { &params.text };
        let sizef = params.output_size as f32;
        let font_size = sizef * 0.07 * (params.text_size / 100.0);
        text::draw_circular_text(
            out,
            font,
            label,
            font_size,
            (sizef * 0.5, sizef * 0.5),
            sizef * 0.38,
            t * TAU,
            params.text_spacing,
            params.text_rotate_mode == TextRotateMode::Repeat,
            params.frame_color,
        );
    }
}
