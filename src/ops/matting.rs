use image::RgbaImage;
use rayon::prelude::*;

/// Color-key tolerance.  The effective Euclidean RGB cutoff is twice this.
pub const KEY_THRESHOLD: f32 = 15.0;

/// Derive the processed buffer from the original.
///
/// Always starts from a fresh copy of `original`; when `remove_background`
/// is set, every pixel whose RGB distance to the top-left pixel falls below
/// the cutoff gets its alpha zeroed.  This is a **global** color key, not a
/// flood fill — same-colored regions disconnected from the corner are keyed
/// out too.  Re-applying to its own output changes nothing, since only alpha
/// is written and the key color is read from RGB.
pub fn matte(original: &RgbaImage, remove_background: bool) -> RgbaImage {
    let mut processed = original.clone();
    if remove_background {
        key_out_background(&mut processed);
    }
    processed
}

/// Zero the alpha of every pixel color-close to the top-left reference pixel.
pub fn key_out_background(buffer: &mut RgbaImage) {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    let seed = *buffer.get_pixel(0, 0);
    let seed_rgb = [seed[0] as f32, seed[1] as f32, seed[2] as f32];
    let cutoff = KEY_THRESHOLD * 2.0;
    let cutoff_sq = cutoff * cutoff;

    let stride = w as usize * 4;
    let raw: &mut [u8] = buffer.as_mut();
    raw.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if color_dist_sq(px, &seed_rgb) < cutoff_sq {
                px[3] = 0;
            }
        }
    });
}

/// Squared Euclidean distance in RGB space.
#[inline]
fn color_dist_sq(pixel: &[u8], seed_rgb: &[f32; 3]) -> f32 {
    let dr = pixel[0] as f32 - seed_rgb[0];
    let dg = pixel[1] as f32 - seed_rgb[1];
    let db = pixel[2] as f32 - seed_rgb[2];
    dr * dr + dg * dg + db * db
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// White background with a red square in the middle.
    fn sample() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([240, 240, 240, 255]));
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        img
    }

    #[test]
    fn keys_out_pixels_near_the_reference_color() {
        let processed = matte(&sample(), true);
        assert_eq!(processed.get_pixel(0, 0)[3], 0);
        assert_eq!(processed.get_pixel(19, 19)[3], 0);
        assert_eq!(processed.get_pixel(10, 10)[3], 255);
        // RGB is left intact so the key color stays recoverable
        assert_eq!(processed.get_pixel(0, 0)[0], 240);
    }

    #[test]
    fn keying_is_global_not_connected() {
        // Background-colored pixel fully enclosed by the object
        let mut img = sample();
        img.put_pixel(10, 10, Rgba([240, 240, 240, 255]));
        let processed = matte(&img, true);
        assert_eq!(processed.get_pixel(10, 10)[3], 0);
    }

    #[test]
    fn cutoff_is_strictly_below_twice_threshold() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([100, 100, 100, 255]));
        // Distance exactly 30 (= threshold * 2) stays opaque
        img.put_pixel(1, 0, Rgba([130, 100, 100, 255]));
        let processed = matte(&img, true);
        assert_eq!(processed.get_pixel(1, 0)[3], 255);
        assert_eq!(processed.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn matting_is_idempotent() {
        let once = matte(&sample(), true);
        let twice = matte(&once, true);
        assert_eq!(once.as_raw(), twice.as_raw());
    }

    #[test]
    fn disabled_removal_returns_a_plain_copy() {
        let img = sample();
        let processed = matte(&img, false);
        assert_eq!(processed.as_raw(), img.as_raw());
    }
}
