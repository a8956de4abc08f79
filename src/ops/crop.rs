// ============================================================================
// CROP TOOL — interactive rectangle with handle-based resizing
// ============================================================================

use image::{GenericImage, RgbaImage, imageops};

/// Confirmed crops below this edge length are rejected.
pub const MIN_CROP_SIZE: f32 = 5.0;

/// Pointer-down within this many buffer pixels of a corner grabs its handle.
const HANDLE_RADIUS: f32 = 12.0;

/// Crop rectangle in processed-buffer pixel coordinates.
///
/// Width/height may go negative transiently while a corner is dragged past
/// its opposite edge; the confirm guard catches that along with too-small
/// rects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CropRect {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    fn position(&self, rect: &CropRect) -> (f32, f32) {
        match self {
            Corner::Nw => (rect.x, rect.y),
            Corner::Ne => (rect.x + rect.w, rect.y),
            Corner::Sw => (rect.x, rect.y + rect.h),
            Corner::Se => (rect.x + rect.w, rect.y + rect.h),
        }
    }
}

/// Which gesture the current pointer drag is performing.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CropGesture {
    Idle,
    /// Dragging out a brand-new rectangle from `start`.
    Defining { start: (f32, f32) },
    /// Translating the rectangle; `grab` is the pointer offset from the
    /// rect origin at pointer-down, so the rect doesn't jump.
    Moving { grab: (f32, f32) },
    Resizing(Corner),
}

/// One interactive crop session: the rectangle plus its gesture state.
/// Discarded on cancel, consumed (buffers replaced) on confirm.
pub struct CropSession {
    pub rect: CropRect,
    gesture: CropGesture,
}

impl CropSession {
    /// Start a session with the default rectangle: an 80% inset of the
    /// buffer.
    pub fn begin(buffer_w: u32, buffer_h: u32) -> Self {
        let w = buffer_w as f32;
        let h = buffer_h as f32;
        Self {
            rect: CropRect {
                x: w * 0.1,
                y: h * 0.1,
                w: w * 0.8,
                h: h * 0.8,
            },
            gesture: CropGesture::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture != CropGesture::Idle
    }

    /// Pointer-down in buffer coordinates: a corner handle starts a resize,
    /// the rect interior starts a move, anywhere else starts a new rect.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if let Some(corner) = self.hit_corner(x, y) {
            self.gesture = CropGesture::Resizing(corner);
        } else if self.rect.contains(x, y) {
            self.gesture = CropGesture::Moving {
                grab: (x - self.rect.x, y - self.rect.y),
            };
        } else {
            self.gesture = CropGesture::Defining { start: (x, y) };
            self.rect = CropRect { x, y, w: 0.0, h: 0.0 };
        }
    }

    /// Pointer-move in buffer coordinates; samples are clamped to the
    /// buffer bounds before the gesture update.
    pub fn pointer_move(&mut self, x: f32, y: f32, buffer_w: u32, buffer_h: u32) {
        let x = x.clamp(0.0, buffer_w as f32);
        let y = y.clamp(0.0, buffer_h as f32);

        match self.gesture {
            CropGesture::Idle => {}
            CropGesture::Defining { start } => {
                self.rect = CropRect {
                    x: x.min(start.0),
                    y: y.min(start.1),
                    w: (x - start.0).abs(),
                    h: (y - start.1).abs(),
                };
            }
            CropGesture::Moving { grab } => {
                let max_x = (buffer_w as f32 - self.rect.w).max(0.0);
                let max_y = (buffer_h as f32 - self.rect.h).max(0.0);
                self.rect.x = (x - grab.0).clamp(0.0, max_x);
                self.rect.y = (y - grab.1).clamp(0.0, max_y);
            }
            CropGesture::Resizing(corner) => {
                let rect = &mut self.rect;
                match corner {
                    Corner::Se => {
                        rect.w = x - rect.x;
                        rect.h = y - rect.y;
                    }
                    Corner::Nw => {
                        let dx = x - rect.x;
                        let dy = y - rect.y;
                        rect.x = x;
                        rect.y = y;
                        rect.w -= dx;
                        rect.h -= dy;
                    }
                    Corner::Ne => {
                        rect.w = x - rect.x;
                        let dy = y - rect.y;
                        rect.y = y;
                        rect.h -= dy;
                    }
                    Corner::Sw => {
                        let dx = x - rect.x;
                        rect.x = x;
                        rect.w -= dx;
                        rect.h = y - rect.y;
                    }
                }
            }
        }
    }

    /// Pointer-up ends the drag but keeps the rectangle visible for further
    /// adjustment or confirm/cancel.
    pub fn pointer_up(&mut self) {
        self.gesture = CropGesture::Idle;
    }

    fn hit_corner(&self, x: f32, y: f32) -> Option<Corner> {
        [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se]
            .into_iter()
            .find(|corner| {
                let (cx, cy) = corner.position(&self.rect);
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy <= HANDLE_RADIUS * HANDLE_RADIUS
            })
    }
}

// ============================================================================
// BUFFER EXTRACTION
// ============================================================================

/// Side of the square that fully contains a w×h region under any rotation.
pub fn diagonal_side(w: u32, h: u32) -> u32 {
    let w = w as f64;
    let h = h as f64;
    (w * w + h * h).sqrt().ceil().max(1.0) as u32
}

/// Center `img` inside a transparent square sized to its bounding diagonal,
/// so later rotation never clips.
///
/// The padding carries the source's top-left RGB at zero alpha: invisible,
/// but pixel (0, 0) keeps the color the matting engine keys on.
pub fn pad_to_diagonal(img: &RgbaImage) -> RgbaImage {
    let side = diagonal_side(img.width(), img.height());
    let corner = *img.get_pixel(0, 0);
    let fill = image::Rgba([corner[0], corner[1], corner[2], 0]);
    let mut padded = RgbaImage::from_pixel(side, side, fill);
    let ox = (side - img.width()) / 2;
    let oy = (side - img.height()) / 2;
    // copy_from only fails when the source overflows the target, and the
    // diagonal square always fits the source
    let _ = padded.copy_from(img, ox, oy);
    padded
}

/// Extract the rectangle (rounded to whole pixels, clamped to the buffer)
/// from `src`.  Returns `None` for empty results.
pub fn extract_region(src: &RgbaImage, rect: &CropRect) -> Option<RgbaImage> {
    let x0 = (rect.x.round() as i64).clamp(0, src.width() as i64) as u32;
    let y0 = (rect.y.round() as i64).clamp(0, src.height() as i64) as u32;
    let x1 = ((rect.x + rect.w).round() as i64).clamp(x0 as i64, src.width() as i64) as u32;
    let y1 = ((rect.y + rect.h).round() as i64).clamp(y0 as i64, src.height() as i64) as u32;
    let w = x1 - x0;
    let h = y1 - y0;
    if w == 0 || h == 0 {
        return None;
    }
    Some(imageops::crop_imm(src, x0, y0, w, h).to_image())
}

/// Extract the crop rectangle from both buffers, optionally re-padding each
/// to a diagonal square.  Both results always share dimensions.
pub fn apply_crop(
    original: &RgbaImage,
    processed: &RgbaImage,
    rect: &CropRect,
    pad: bool,
) -> Option<(RgbaImage, RgbaImage)> {
    let cropped_original = extract_region(original, rect)?;
    let cropped_processed = extract_region(processed, rect)?;
    if pad {
        Some((
            pad_to_diagonal(&cropped_original),
            pad_to_diagonal(&cropped_processed),
        ))
    } else {
        Some((cropped_original, cropped_processed))
    }
}
