// ============================================================================
// CPU RASTERIZATION PRIMITIVES — distance-field strokes and affine image draw
// ============================================================================
//
// Coverage comes from signed distance functions smoothed over a one-pixel
// band, blended source-over into the destination.  Whole-canvas passes are
// row-parallel with rayon; rows are disjoint so no synchronization is
// needed.

use std::f32::consts::TAU;

use image::RgbaImage;
use rayon::prelude::*;

use crate::ops::motion::Motion2D;

#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Source-over blend of a straight-alpha color into one RGBA pixel, with
/// the color's alpha additionally scaled by `coverage`.
#[inline]
pub(crate) fn blend_px(dst: &mut [u8], color: [u8; 4], coverage: f32) {
    let cov = coverage.clamp(0.0, 1.0);
    let sa = color[3] as f32 / 255.0 * cov;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let sc = color[c] as f32;
        let dc = dst[c] as f32;
        dst[c] = ((sc * sa + dc * da * (1.0 - sa)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Fill an anti-aliased disc.
pub fn fill_disc(img: &mut RgbaImage, center: (f32, f32), radius: f32, color: [u8; 4]) {
    if radius <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    let x0 = ((center.0 - radius - 1.0).floor() as i64).clamp(0, w as i64) as u32;
    let y0 = ((center.1 - radius - 1.0).floor() as i64).clamp(0, h as i64) as u32;
    let x1 = ((center.0 + radius + 2.0).ceil() as i64).clamp(0, w as i64) as u32;
    let y1 = ((center.1 + radius + 2.0).ceil() as i64).clamp(0, h as i64) as u32;

    for y in y0..y1 {
        let dy = y as f32 + 0.5 - center.1;
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - center.0;
            let d = (dx * dx + dy * dy).sqrt() - radius;
            let cov = smoothstep(0.5, -0.5, d);
            if cov > 0.001 {
                blend_px(&mut img.get_pixel_mut(x, y).0, color, cov);
            }
        }
    }
}

/// Stroke a circular arc with round caps.
///
/// `start_angle` is measured from the +x axis, increasing clockwise in
/// raster coordinates (y down); the arc sweeps `sweep` radians from there.
/// A sweep of ≥ 2π closes the circle and drops the caps.
pub fn stroke_arc(
    img: &mut RgbaImage,
    center: (f32, f32),
    radius: f32,
    start_angle: f32,
    sweep: f32,
    line_width: f32,
    color: [u8; 4],
) {
    if radius <= 0.0 || line_width <= 0.0 || sweep <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    let half_w = line_width * 0.5;
    let reach = radius + half_w + 1.5;
    let x0 = ((center.0 - reach).floor() as i64).clamp(0, w as i64) as usize;
    let y0 = ((center.1 - reach).floor() as i64).clamp(0, h as i64) as usize;
    let x1 = ((center.0 + reach).ceil() as i64).clamp(0, w as i64) as usize;
    let y1 = ((center.1 + reach).ceil() as i64).clamp(0, h as i64) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let full_circle = sweep >= TAU - 1e-3;
    let cap0 = (
        center.0 + start_angle.cos() * radius,
        center.1 + start_angle.sin() * radius,
    );
    let end_angle = start_angle + sweep;
    let cap1 = (
        center.0 + end_angle.cos() * radius,
        center.1 + end_angle.sin() * radius,
    );

    let stride = w as usize * 4;
    let raw: &mut [u8] = img.as_mut();
    raw.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            if y < y0 || y >= y1 {
                return;
            }
            let py = y as f32 + 0.5;
            for x in x0..x1 {
                let px = x as f32 + 0.5;
                let dx = px - center.0;
                let dy = py - center.1;

                let mut d = f32::MAX;
                let in_range = full_circle || {
                    let rel = (dy.atan2(dx) - start_angle).rem_euclid(TAU);
                    rel <= sweep
                };
                if in_range {
                    d = ((dx * dx + dy * dy).sqrt() - radius).abs();
                }
                if !full_circle {
                    let d0 = ((px - cap0.0).powi(2) + (py - cap0.1).powi(2)).sqrt();
                    let d1 = ((px - cap1.0).powi(2) + (py - cap1.1).powi(2)).sqrt();
                    d = d.min(d0).min(d1);
                }

                let cov = smoothstep(0.5, -0.5, d - half_w);
                if cov > 0.001 {
                    let idx = x * 4;
                    blend_px(&mut row[idx..idx + 4], color, cov);
                }
            }
        });
}

/// Stroke a dashed full circle.
///
/// The dash pattern alternates `dash_len` on / `gap_len` off along the
/// circumference, starting at `base_angle` and shifted by `dash_offset`
/// pixels of arc length (negative offsets march the dashes forward).
pub fn stroke_dashed_circle(
    img: &mut RgbaImage,
    center: (f32, f32),
    radius: f32,
    line_width: f32,
    dash_len: f32,
    gap_len: f32,
    dash_offset: f32,
    base_angle: f32,
    color: [u8; 4],
) {
    if radius <= 0.0 || line_width <= 0.0 || dash_len <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    let half_w = line_width * 0.5;
    let reach = radius + half_w + 1.5;
    let x0 = ((center.0 - reach).floor() as i64).clamp(0, w as i64) as usize;
    let y0 = ((center.1 - reach).floor() as i64).clamp(0, h as i64) as usize;
    let x1 = ((center.0 + reach).ceil() as i64).clamp(0, w as i64) as usize;
    let y1 = ((center.1 + reach).ceil() as i64).clamp(0, h as i64) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let pattern = dash_len + gap_len;
    let stride = w as usize * 4;
    let raw: &mut [u8] = img.as_mut();
    raw.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            if y < y0 || y >= y1 {
                return;
            }
            let py = y as f32 + 0.5;
            for x in x0..x1 {
                let px = x as f32 + 0.5;
                let dx = px - center.0;
                let dy = py - center.1;

                let rel = (dy.atan2(dx) - base_angle).rem_euclid(TAU);
                let arc_pos = (rel * radius + dash_offset).rem_euclid(pattern);
                if arc_pos >= dash_len {
                    continue;
                }

                let d = ((dx * dx + dy * dy).sqrt() - radius).abs();
                let cov = smoothstep(0.5, -0.5, d - half_w);
                if cov > 0.001 {
                    let idx = x * 4;
                    blend_px(&mut row[idx..idx + 4], color, cov);
                }
            }
        });
}

/// Draw `src` source-over onto `dst`, centered at `center` + the motion's
/// translation, scaled so its longer edge spans `dest_size` destination
/// pixels, rotated and scaled per the motion.
///
/// Destination pixels are inverse-mapped into the source and sampled
/// bilinearly against a transparent border.
pub fn draw_image_over(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    center: (f32, f32),
    dest_size: f32,
    motion: &Motion2D,
) {
    if dest_size <= 0.0 || src.width() == 0 || src.height() == 0 {
        return;
    }
    if motion.sx.abs() < 1e-6 || motion.sy.abs() < 1e-6 {
        return;
    }

    let (w, _h) = dst.dimensions();
    let (sin_r, cos_r) = motion.rotation.sin_cos();
    let inv_sx = 1.0 / motion.sx;
    let inv_sy = 1.0 / motion.sy;
    let cx = center.0 + motion.dx;
    let cy = center.1 + motion.dy;

    let src_w = src.width() as i32;
    let src_h = src.height() as i32;
    let longest = src_w.max(src_h) as f32;
    // Destination units → source pixels
    let to_src = longest / dest_size;
    let src_cx = src_w as f32 * 0.5;
    let src_cy = src_h as f32 * 0.5;
    let src_stride = src_w as usize * 4;
    let src_raw = src.as_raw();

    let stride = w as usize * 4;
    let raw: &mut [u8] = dst.as_mut();
    raw.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5;
            for x in 0..w as usize {
                let px = x as f32 + 0.5;
                let dx = px - cx;
                let dy = py - cy;

                // Inverse rotation, then inverse scale
                let lx = (dx * cos_r + dy * sin_r) * inv_sx;
                let ly = (-dx * sin_r + dy * cos_r) * inv_sy;
                let sx = lx * to_src + src_cx;
                let sy = ly * to_src + src_cy;

                let x0 = sx.floor() as i32;
                let y0 = sy.floor() as i32;
                if x0 < -1 || y0 < -1 || x0 >= src_w || y0 >= src_h {
                    continue;
                }
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let sample = |sx: i32, sy: i32| -> [f32; 4] {
                    if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
                        [0.0; 4]
                    } else {
                        let idx = sy as usize * src_stride + sx as usize * 4;
                        [
                            src_raw[idx] as f32,
                            src_raw[idx + 1] as f32,
                            src_raw[idx + 2] as f32,
                            src_raw[idx + 3] as f32,
                        ]
                    }
                };

                let tl = sample(x0, y0);
                let tr = sample(x0 + 1, y0);
                let bl = sample(x0, y0 + 1);
                let br = sample(x0 + 1, y0 + 1);

                let mut out = [0.0f32; 4];
                for c in 0..4 {
                    let top = tl[c] + (tr[c] - tl[c]) * fx;
                    let bot = bl[c] + (br[c] - bl[c]) * fx;
                    out[c] = top + (bot - top) * fy;
                }
                if out[3] <= 0.5 {
                    continue;
                }
                let idx = x * 4;
                blend_px(
                    &mut row[idx..idx + 4],
                    [
                        out[0].round().clamp(0.0, 255.0) as u8,
                        out[1].round().clamp(0.0, 255.0) as u8,
                        out[2].round().clamp(0.0, 255.0) as u8,
                        out[3].round().clamp(0.0, 255.0) as u8,
                    ],
                    1.0,
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn disc_covers_center_and_misses_far_corner() {
        let mut img = RgbaImage::new(64, 64);
        fill_disc(&mut img, (32.0, 32.0), 10.0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(32, 32)[3], 255);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn arc_band_sits_at_the_radius() {
        let mut img = RgbaImage::new(100, 100);
        stroke_arc(&mut img, (50.0, 50.0), 30.0, 0.0, TAU, 4.0, [0, 255, 0, 255]);
        // On the circle to the right of center
        assert!(img.get_pixel(80, 50)[3] > 200);
        // Center stays empty
        assert_eq!(img.get_pixel(50, 50)[3], 0);
    }

    #[test]
    fn partial_arc_leaves_the_gap_open() {
        let mut img = RgbaImage::new(100, 100);
        // Sweep clockwise from +x through +y (raster), leaving -y open
        stroke_arc(
            &mut img,
            (50.0, 50.0),
            30.0,
            0.0,
            std::f32::consts::PI,
            4.0,
            [0, 0, 255, 255],
        );
        assert!(img.get_pixel(50, 80)[3] > 200); // middle of the sweep
        assert_eq!(img.get_pixel(50, 20)[3], 0); // in the gap
    }

    #[test]
    fn dashes_alternate_along_the_circumference() {
        let mut img = RgbaImage::new(200, 200);
        let radius = 60.0;
        let dash = radius * TAU / 8.0; // exactly 4 dashes + 4 gaps
        stroke_dashed_circle(
            &mut img,
            (100.0, 100.0),
            radius,
            6.0,
            dash,
            dash,
            0.0,
            0.0,
            [255, 255, 255, 255],
        );
        // Pattern starts "on" at angle 0 (+x)
        assert!(img.get_pixel(160, 100)[3] > 200);
        let mut on = 0;
        let mut off = 0;
        for i in 0..64 {
            let a = i as f32 / 64.0 * TAU;
            let x = (100.0 + a.cos() * radius).round() as u32;
            let y = (100.0 + a.sin() * radius).round() as u32;
            if img.get_pixel(x, y)[3] > 128 {
                on += 1;
            } else {
                off += 1;
            }
        }
        assert!(on > 20 && off > 20, "on={on} off={off}");
    }

    #[test]
    fn identity_draw_centers_the_source() {
        let src = RgbaImage::from_pixel(10, 10, Rgba([9, 8, 7, 255]));
        let mut dst = RgbaImage::new(100, 100);
        draw_image_over(&mut dst, &src, (50.0, 50.0), 40.0, &Motion2D::IDENTITY);
        assert_eq!(dst.get_pixel(50, 50).0, [9, 8, 7, 255]);
        // 40×40 destination footprint: inside at ±19, outside at ±21
        assert_eq!(dst.get_pixel(50, 72)[3], 0);
        assert!(dst.get_pixel(50, 65)[3] > 0);
    }

    #[test]
    fn quarter_turn_moves_an_offset_feature() {
        let mut src = RgbaImage::new(11, 11);
        src.put_pixel(10, 5, Rgba([255, 0, 0, 255])); // right edge, mid height
        let mut dst = RgbaImage::new(110, 110);
        let quarter = Motion2D {
            rotation: std::f32::consts::FRAC_PI_2,
            ..Motion2D::IDENTITY
        };
        draw_image_over(&mut dst, &src, (55.0, 55.0), 110.0, &quarter);
        // The right-edge feature ends up below center after a clockwise
        // quarter turn
        let mut found = false;
        for y in 90..110 {
            for x in 45..65 {
                if dst.get_pixel(x, y)[0] > 128 {
                    found = true;
                }
            }
        }
        assert!(found);
    }
}
