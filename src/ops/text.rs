use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::RgbaImage;

use crate::ops::raster::blend_px;

// ============================================================================
// FONT LOOKUP
// ============================================================================

/// Load a font by family name from the system, preferring the bold face
/// (labels render bold).  Returns `None` if the family cannot be resolved.
pub fn load_system_font(family: &str) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight::BOLD;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::Title(family.to_string())], &props)
        .ok()?;
    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Try a handful of families that exist on most systems.
pub fn fallback_font() -> Option<FontArc> {
    ["DejaVu Sans", "Liberation Sans", "Arial", "Helvetica", "Noto Sans"]
        .iter()
        .find_map(|family| load_system_font(family))
}

// ============================================================================
// LAYOUT + RASTERIZATION
// ============================================================================

/// Lay out a single line left-aligned at x = 0 with kerning.
/// Returns the glyphs with their x offsets and the total advance width.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Draw a single line of text horizontally centered at `center_x` with its
/// baseline on `baseline_y`, blended source-over.
///
/// Glyph coverage is accumulated into one buffer with `max` so overlapping
/// outlines don't double-blend; `bold` re-stamps each pixel one to the
/// right, thickening stems.
pub fn draw_label(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    center_x: f32,
    baseline_y: f32,
    color: [u8; 4],
    bold: bool,
) {
    if text.is_empty() || font_size <= 0.0 {
        return;
    }
    let (glyphs, total_width) = layout_line(font, text, font_size);
    let origin_x = center_x - total_width * 0.5;

    // Outline every glyph at its final position
    let outlined: Vec<_> = glyphs
        .iter()
        .filter_map(|&(id, gx)| {
            let glyph = id.with_scale_and_position(font_size, point(origin_x + gx, baseline_y));
            font.outline_glyph(glyph)
        })
        .collect();
    if outlined.is_empty() {
        return;
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for out in &outlined {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let x0 = min_x.floor() as i32;
    let y0 = min_y.floor() as i32;
    let buf_w = (max_x.ceil() as i32 - x0 + 2).max(0) as usize; // +1 for the bold stamp
    let buf_h = (max_y.ceil() as i32 - y0 + 1).max(0) as usize;
    if buf_w == 0 || buf_h == 0 {
        return;
    }

    let mut coverage = vec![0.0f32; buf_w * buf_h];
    for out in &outlined {
        let b = out.px_bounds();
        let gx0 = b.min.x.floor() as i32 - x0;
        let gy0 = b.min.y.floor() as i32 - y0;
        out.draw(|px, py, cov| {
            let ix = gx0 + px as i32;
            let iy = gy0 + py as i32;
            if ix >= 0 && iy >= 0 && (ix as usize) < buf_w && (iy as usize) < buf_h {
                let idx = iy as usize * buf_w + ix as usize;
                coverage[idx] = coverage[idx].max(cov);
                if bold && (ix as usize) + 1 < buf_w {
                    coverage[idx + 1] = coverage[idx + 1].max(cov);
                }
            }
        });
    }

    let (img_w, img_h) = img.dimensions();
    for by in 0..buf_h {
        let iy = y0 + by as i32;
        if iy < 0 || iy >= img_h as i32 {
            continue;
        }
        for bx in 0..buf_w {
            let ix = x0 + bx as i32;
            if ix < 0 || ix >= img_w as i32 {
                continue;
            }
            let cov = coverage[by * buf_w + bx];
            if cov > 0.001 {
                blend_px(&mut img.get_pixel_mut(ix as u32, iy as u32).0, color, cov);
            }
        }
    }
}

// ============================================================================
// CIRCULAR TEXT
// ============================================================================

/// One rasterized glyph at origin (0, 0), ready to be re-stamped.
struct GlyphPatch {
    coverage: Vec<f32>,
    w: usize,
    h: usize,
    /// Patch top-left relative to the glyph origin (baseline at y = 0).
    min_x: f32,
    min_y: f32,
    advance: f32,
}

fn glyph_patch(font: &FontArc, ch: char, font_size: f32) -> Option<GlyphPatch> {
    let id = font.glyph_id(ch);
    let advance = font.as_scaled(font_size).h_advance(id);
    let glyph = id.with_scale_and_position(font_size, point(0.0, 0.0));
    let out = font.outline_glyph(glyph)?;
    let b = out.px_bounds();
    let w = (b.max.x - b.min.x).ceil() as usize + 1;
    let h = (b.max.y - b.min.y).ceil() as usize + 1;
    let mut coverage = vec![0.0f32; w * h];
    out.draw(|px, py, cov| {
        let idx = py as usize * w + px as usize;
        if idx < coverage.len() {
            coverage[idx] = coverage[idx].max(cov);
        }
    });
    Some(GlyphPatch {
        coverage,
        w,
        h,
        min_x: b.min.x,
        min_y: b.min.y,
        advance,
    })
}

/// Place `text` around a circle, each glyph horizontally centered on its
/// circle point with the baseline passing through it, rotated so the glyph
/// reads tangentially.  `ring_rotation` spins the whole ring.
///
/// With `repeat`, the string is tiled until it visually fills the
/// circumference (at least 24 characters, more for large circles relative
/// to the font size).
pub fn draw_circular_text(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    center: (f32, f32),
    radius: f32,
    ring_rotation: f32,
    spacing: f32,
    repeat: bool,
    color: [u8; 4],
) {
    use std::f32::consts::TAU;

    let mut chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || font_size <= 0.0 || radius <= 0.0 {
        return;
    }

    if repeat {
        let target = ((TAU * radius / (font_size * 0.6)).floor() as usize).max(24);
        let repeats = target.div_ceil(chars.len());
        let tile = chars.clone();
        for _ in 1..repeats {
            chars.extend_from_slice(&tile);
        }
    }

    let angle_step = TAU / chars.len() as f32 * spacing;

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            continue;
        }
        let Some(patch) = glyph_patch(font, ch, font_size) else {
            continue;
        };
        let angle = ring_rotation + i as f32 * angle_step;
        let pos = (
            center.0 + radius * angle.sin(),
            center.1 - radius * angle.cos(),
        );
        stamp_patch_rotated(img, &patch, pos, angle, color);
    }
}

/// Blend a glyph patch at `pos`, rotated by `angle`, horizontally centered
/// on its advance width.  Destination pixels are inverse-mapped into the
/// patch and the coverage sampled bilinearly.
fn stamp_patch_rotated(
    img: &mut RgbaImage,
    patch: &GlyphPatch,
    pos: (f32, f32),
    angle: f32,
    color: [u8; 4],
) {
    let (sin_a, cos_a) = angle.sin_cos();
    let local_x0 = patch.min_x - patch.advance * 0.5;
    let local_y0 = patch.min_y;
    let local_x1 = local_x0 + patch.w as f32;
    let local_y1 = local_y0 + patch.h as f32;

    // Bounding box of the rotated patch
    let corners = [
        (local_x0, local_y0),
        (local_x1, local_y0),
        (local_x1, local_y1),
        (local_x0, local_y1),
    ];
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for (lx, ly) in corners {
        let wx = pos.0 + lx * cos_a - ly * sin_a;
        let wy = pos.1 + lx * sin_a + ly * cos_a;
        min_x = min_x.min(wx);
        min_y = min_y.min(wy);
        max_x = max_x.max(wx);
        max_y = max_y.max(wy);
    }

    let (img_w, img_h) = img.dimensions();
    let x0 = ((min_x - 1.0).floor() as i64).clamp(0, img_w as i64) as u32;
    let y0 = ((min_y - 1.0).floor() as i64).clamp(0, img_h as i64) as u32;
    let x1 = ((max_x + 2.0).ceil() as i64).clamp(0, img_w as i64) as u32;
    let y1 = ((max_y + 2.0).ceil() as i64).clamp(0, img_h as i64) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - pos.0;
            let dy = y as f32 + 0.5 - pos.1;
            // Inverse rotation into patch space
            let lx = dx * cos_a + dy * sin_a;
            let ly = -dx * sin_a + dy * cos_a;
            let u = lx - local_x0 - 0.5;
            let v = ly - local_y0 - 0.5;
            let cov = sample_coverage(patch, u, v);
            if cov > 0.001 {
                blend_px(&mut img.get_pixel_mut(x, y).0, color, cov);
            }
        }
    }
}

/// Bilinear sample of a patch's coverage grid; outside reads as zero.
fn sample_coverage(patch: &GlyphPatch, u: f32, v: f32) -> f32 {
    let x0 = u.floor() as i32;
    let y0 = v.floor() as i32;
    if x0 < -1 || y0 < -1 || x0 >= patch.w as i32 || y0 >= patch.h as i32 {
        return 0.0;
    }
    let fx = u - x0 as f32;
    let fy = v - y0 as f32;
    let at = |x: i32, y: i32| -> f32 {
        if x < 0 || y < 0 || x >= patch.w as i32 || y >= patch.h as i32 {
            0.0
        } else {
            patch.coverage[y as usize * patch.w + x as usize]
        }
    };
    let top = at(x0, y0) + (at(x0 + 1, y0) - at(x0, y0)) * fx;
    let bot = at(x0, y0 + 1) + (at(x0 + 1, y0 + 1) - at(x0, y0 + 1)) * fx;
    top + (bot - top) * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    // Font-dependent assertions only run when the system has a usable font;
    // bare containers skip them.

    #[test]
    fn layout_advances_monotonically() {
        let Some(font) = fallback_font() else {
            return;
        };
        let (glyphs, width) = layout_line(&font, "Load", 24.0);
        assert_eq!(glyphs.len(), 4);
        assert!(width > 0.0);
        for pair in glyphs.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn label_lands_centered_above_the_baseline() {
        let Some(font) = fallback_font() else {
            return;
        };
        let mut img = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
        draw_label(&mut img, &font, "HELLO", 32.0, 100.0, 70.0, [255, 255, 255, 255], true);

        let mut min_x = u32::MAX;
        let mut max_x = 0;
        let mut any_below_baseline = false;
        for y in 0..100 {
            for x in 0..200 {
                if img.get_pixel(x, y)[0] > 128 {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    if y > 72 {
                        any_below_baseline = true;
                    }
                }
            }
        }
        assert!(min_x < 100 && max_x > 100, "glyphs straddle the center");
        let left = 100 - min_x;
        let right = max_x - 100;
        assert!((left as i64 - right as i64).unsigned_abs() < 12);
        // No descenders in HELLO
        assert!(!any_below_baseline);
    }

    #[test]
    fn circular_text_rings_the_center() {
        let Some(font) = fallback_font() else {
            return;
        };
        let mut img = RgbaImage::new(256, 256);
        draw_circular_text(
            &mut img,
            &font,
            "LOADING ",
            18.0,
            (128.0, 128.0),
            90.0,
            0.0,
            1.0,
            true,
            [255, 0, 0, 255],
        );

        let mut inked = 0u32;
        let mut near_center = 0u32;
        for y in 0..256 {
            for x in 0..256 {
                if img.get_pixel(x, y)[3] > 0 {
                    inked += 1;
                    let dx = x as f32 - 128.0;
                    let dy = y as f32 - 128.0;
                    if (dx * dx + dy * dy).sqrt() < 60.0 {
                        near_center += 1;
                    }
                }
            }
        }
        assert!(inked > 200, "repeat mode should ink a full ring");
        assert_eq!(near_center, 0, "glyphs stay on the ring");
    }
}
