use image::RgbaImage;

/// What a brush stamp does to the processed buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushMode {
    /// Zero the alpha inside the disc.
    #[default]
    Erase,
    /// Copy the original pixels back inside the disc.
    Restore,
}

impl BrushMode {
    pub fn label(&self) -> &'static str {
        match self {
            BrushMode::Erase => "Eraser",
            BrushMode::Restore => "Restore",
        }
    }

    pub fn all() -> &'static [BrushMode] {
        &[BrushMode::Erase, BrushMode::Restore]
    }
}

/// Composite one hard-edged disc at (`cx`, `cy`) in buffer coordinates.
///
/// Pixels at distance ≤ `radius` from the center are affected; everything
/// farther is untouched.  Each stamp is independent — strokes are a series
/// of stamps, not an interpolated line, so fast pointer motion can leave
/// gaps between stamps.
///
/// Both buffers must share dimensions; out-of-bounds parts of the disc are
/// clipped.
pub fn stamp(
    processed: &mut RgbaImage,
    original: &RgbaImage,
    cx: f32,
    cy: f32,
    radius: f32,
    mode: BrushMode,
) {
    debug_assert_eq!(processed.dimensions(), original.dimensions());
    if radius <= 0.0 {
        return;
    }
    let (w, h) = processed.dimensions();

    let x0 = ((cx - radius).floor() as i64).max(0) as u32;
    let y0 = ((cy - radius).floor() as i64).max(0) as u32;
    let x1 = (((cx + radius).ceil() as i64) + 1).clamp(0, w as i64) as u32;
    let y1 = (((cy + radius).ceil() as i64) + 1).clamp(0, h as i64) as u32;

    let r_sq = radius * radius;
    for y in y0..y1 {
        let dy = y as f32 - cy;
        for x in x0..x1 {
            let dx = x as f32 - cx;
            if dx * dx + dy * dy > r_sq {
                continue;
            }
            match mode {
                BrushMode::Erase => {
                    processed.get_pixel_mut(x, y)[3] = 0;
                }
                BrushMode::Restore => {
                    *processed.get_pixel_mut(x, y) = *original.get_pixel(x, y);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opaque(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([50, 60, 70, 255]))
    }

    #[test]
    fn erase_zeroes_alpha_exactly_within_the_disc() {
        let original = opaque(100, 100);
        let mut processed = original.clone();
        stamp(&mut processed, &original, 50.0, 50.0, 10.0, BrushMode::Erase);

        for y in 0..100 {
            for x in 0..100 {
                let dx = x as f32 - 50.0;
                let dy = y as f32 - 50.0;
                let inside = dx * dx + dy * dy <= 100.0;
                let alpha = processed.get_pixel(x, y)[3];
                if inside {
                    assert_eq!(alpha, 0, "pixel ({x},{y}) should be erased");
                } else {
                    assert_eq!(alpha, 255, "pixel ({x},{y}) should be untouched");
                }
            }
        }
    }

    #[test]
    fn restore_recovers_original_color_and_alpha() {
        let original = opaque(40, 40);
        let mut processed = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 0]));
        stamp(&mut processed, &original, 20.0, 20.0, 5.0, BrushMode::Restore);

        assert_eq!(*processed.get_pixel(20, 20), Rgba([50, 60, 70, 255]));
        assert_eq!(*processed.get_pixel(20, 25), Rgba([50, 60, 70, 255]));
        assert_eq!(*processed.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn stamp_clips_at_buffer_edges() {
        let original = opaque(30, 30);
        let mut processed = original.clone();
        stamp(&mut processed, &original, 0.0, 0.0, 8.0, BrushMode::Erase);
        assert_eq!(processed.get_pixel(0, 0)[3], 0);
        assert_eq!(processed.get_pixel(29, 29)[3], 255);
    }

    #[test]
    fn zero_radius_is_a_no_op() {
        let original = opaque(10, 10);
        let mut processed = original.clone();
        stamp(&mut processed, &original, 5.0, 5.0, 0.0, BrushMode::Erase);
        assert_eq!(processed.as_raw(), original.as_raw());
    }
}
