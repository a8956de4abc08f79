// ============================================================================
// EDIT SESSION — the explicit context object owning all mutable state
// ============================================================================
//
// One session per loaded image: the original/processed buffer pair, undo
// history, brush settings, an optional crop session, the phase clocks and
// the export-in-flight flag.  Everything runs on the caller's (single)
// thread; each operation completes before the next render reads the
// buffers.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::compositor::Compositor;
use crate::exporter::{self, ExportJob};
use crate::history::HistoryManager;
use crate::io;
use crate::ops::brush::{self, BrushMode};
use crate::ops::crop::{self, CropRect, CropSession, MIN_CROP_SIZE};
use crate::ops::matting;
use crate::params::RenderParameters;
use crate::view;

/// Phase units advanced per second at speed multiplier 1.0.
pub const PHASE_RATE: f64 = 0.6;

/// The two independent animation clocks, in phase units (period 2).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseClock {
    pub image_phase: f64,
    pub frame_phase: f64,
}

impl PhaseClock {
    pub fn tick(&mut self, dt: f64, image_speed: f32, frame_speed: f32) {
        self.image_phase += PHASE_RATE * dt * image_speed as f64;
        self.frame_phase += PHASE_RATE * dt * frame_speed as f64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BrushSettings {
    /// Buffer pixels; does not scale with zoom.
    pub radius: f32,
    pub mode: BrushMode,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            radius: 15.0,
            mode: BrushMode::Erase,
        }
    }
}

pub struct EditSession {
    /// Reference image, re-padded on crop.  `Arc` keeps history snapshots
    /// cheap while it is unchanged.
    original: Arc<RgbaImage>,
    /// Working copy: matted, brushed, cropped.  Always the same dimensions
    /// as `original`.
    processed: RgbaImage,
    remove_background: bool,
    pub brush: BrushSettings,
    history: HistoryManager,
    crop: Option<CropSession>,
    stroke_active: bool,
    pub clock: PhaseClock,
    export_in_progress: bool,
}

impl EditSession {
    /// Build a session from a decoded upload.  The upload is centered in a
    /// transparent square sized to its bounding diagonal so rotation never
    /// clips, then matted.
    pub fn from_image(upload: RgbaImage, remove_background: bool) -> Result<Self, String> {
        if upload.width() == 0 || upload.height() == 0 {
            return Err("uploaded image has zero dimensions".to_string());
        }
        let original = Arc::new(crop::pad_to_diagonal(&upload));
        let processed = matting::matte(&original, remove_background);
        Ok(Self {
            original,
            processed,
            remove_background,
            brush: BrushSettings::default(),
            history: HistoryManager::new(),
            crop: None,
            stroke_active: false,
            clock: PhaseClock::default(),
            export_in_progress: false,
        })
    }

    /// Decode `path` and build a session.  On decode failure nothing is
    /// constructed, so the caller's previous session (if any) survives.
    pub fn load(path: &Path, remove_background: bool) -> Result<Self, String> {
        let upload = io::load_image(path)?;
        crate::log_info!(
            "loaded '{}' ({}×{})",
            path.display(),
            upload.width(),
            upload.height()
        );
        Self::from_image(upload, remove_background)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.processed.dimensions()
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    pub fn processed(&self) -> &RgbaImage {
        &self.processed
    }

    pub fn remove_background(&self) -> bool {
        self.remove_background
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn export_in_progress(&self) -> bool {
        self.export_in_progress
    }

    // ------------------------------------------------------------------
    // Matting
    // ------------------------------------------------------------------

    /// Toggle background removal and rebuild the processed buffer.  Brush
    /// edits are derived state and do not survive a re-matte.
    pub fn set_remove_background(&mut self, enabled: bool) {
        if self.remove_background == enabled {
            return;
        }
        self.remove_background = enabled;
        self.rematte();
    }

    /// Recompute `processed` from `original`; cancels any stroke in flight.
    pub fn rematte(&mut self) {
        self.processed = matting::matte(&self.original, self.remove_background);
        self.stroke_active = false;
    }

    // ------------------------------------------------------------------
    // Brush
    // ------------------------------------------------------------------

    /// Start a brush interaction: one history snapshot for the whole drag.
    /// Ignored while a crop session is active.
    pub fn begin_stroke(&mut self) {
        if self.crop.is_some() || self.stroke_active {
            return;
        }
        self.history.snapshot(&self.original, &self.processed);
        self.stroke_active = true;
    }

    /// One pointer sample of an active stroke, in view space.  Returns
    /// `true` when a stamp landed.
    pub fn stroke_sample(
        &mut self,
        pointer: (f32, f32),
        view_origin: (f32, f32),
        view_size: (f32, f32),
    ) -> bool {
        if !self.stroke_active {
            return false;
        }
        let Some((x, y)) = view::view_to_buffer(pointer, view_origin, view_size, self.dimensions())
        else {
            return false;
        };
        self.stamp_at(x, y);
        true
    }

    /// Stamp directly in buffer coordinates.
    pub fn stamp_at(&mut self, x: f32, y: f32) {
        brush::stamp(
            &mut self.processed,
            &self.original,
            x,
            y,
            self.brush.radius,
            self.brush.mode,
        );
    }

    pub fn end_stroke(&mut self) {
        self.stroke_active = false;
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.original, &mut self.processed)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.original, &mut self.processed)
    }

    // ------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------

    /// Enter crop mode with the default 80% rectangle.
    pub fn begin_crop(&mut self) {
        let (w, h) = self.dimensions();
        self.crop = Some(CropSession::begin(w, h));
    }

    pub fn crop(&self) -> Option<&CropSession> {
        self.crop.as_ref()
    }

    pub fn crop_pointer_down(
        &mut self,
        pointer: (f32, f32),
        view_origin: (f32, f32),
        view_size: (f32, f32),
    ) {
        let dims = self.dimensions();
        if let Some(session) = &mut self.crop {
            let (x, y) = view::view_to_buffer_clamped(pointer, view_origin, view_size, dims);
            session.pointer_down(x, y);
        }
    }

    pub fn crop_pointer_move(
        &mut self,
        pointer: (f32, f32),
        view_origin: (f32, f32),
        view_size: (f32, f32),
    ) {
        let dims = self.dimensions();
        if let Some(session) = &mut self.crop {
            let (x, y) = view::view_to_buffer_clamped(pointer, view_origin, view_size, dims);
            session.pointer_move(x, y, dims.0, dims.1);
        }
    }

    pub fn crop_pointer_up(&mut self) {
        if let Some(session) = &mut self.crop {
            session.pointer_up();
        }
    }

    /// Apply the current crop rectangle.  A degenerate rectangle is
    /// rejected and the session stays open for correction; otherwise both
    /// buffers are replaced and crop mode ends.
    pub fn confirm_crop(&mut self) -> bool {
        let Some(session) = &self.crop else {
            return false;
        };
        let rect = session.rect;
        if !self.apply_crop_rect(&rect) {
            return false;
        }
        self.crop = None;
        true
    }

    /// Crop both buffers to `rect` (re-padded to a diagonal square) behind
    /// a history snapshot.  Returns `false` for rectangles under the
    /// minimum size.
    pub fn apply_crop_rect(&mut self, rect: &CropRect) -> bool {
        if rect.w < MIN_CROP_SIZE || rect.h < MIN_CROP_SIZE {
            return false;
        }
        let Some((original, processed)) =
            crop::apply_crop(&self.original, &self.processed, rect, true)
        else {
            return false;
        };
        self.history.snapshot(&self.original, &self.processed);
        self.original = Arc::new(original);
        self.processed = processed;
        true
    }

    /// Leave crop mode without touching the buffers.
    pub fn cancel_crop(&mut self) {
        self.crop = None;
    }

    // ------------------------------------------------------------------
    // Animation + export
    // ------------------------------------------------------------------

    /// Advance the live animation clocks by `dt` seconds.
    pub fn tick(&mut self, dt: f64, params: &RenderParameters) {
        self.clock
            .tick(dt, params.image_speed, params.frame_speed);
    }

    /// Render the live frame at the current clock phases.
    pub fn render_live(&self, compositor: &Compositor, params: &RenderParameters) -> RgbaImage {
        compositor.render(
            Some(&self.processed),
            params,
            self.clock.image_phase as f32,
            self.clock.frame_phase as f32,
        )
    }

    /// Run one export job.  Exports are strictly serialized: a second
    /// request while one is in flight is refused.  The phase clocks reset
    /// to zero so the capture starts at a deterministic phase, and the live
    /// animation resumes from there afterwards.
    pub fn export(
        &mut self,
        compositor: &Compositor,
        params: &RenderParameters,
        job: ExportJob,
        path: &Path,
    ) -> Result<(), String> {
        if self.export_in_progress {
            return Err("an export is already in progress".to_string());
        }
        self.export_in_progress = true;
        self.clock.reset();
        let result = exporter::run_export(compositor, Some(&self.processed), params, job, path);
        self.export_in_progress = false;
        if let Err(e) = &result {
            crate::log_err!("export to '{}' failed: {}", path.display(), e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 60×80 upload: light background, dark square in the middle.
    fn upload() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(60, 80, Rgba([250, 250, 250, 255]));
        for y in 20..60 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgba([20, 40, 60, 255]));
            }
        }
        img
    }

    #[test]
    fn upload_is_padded_to_the_bounding_diagonal() {
        let session = EditSession::from_image(upload(), true).unwrap();
        let side = crop::diagonal_side(60, 80); // 100
        assert_eq!(session.dimensions(), (side, side));
        assert_eq!(session.original().dimensions(), session.processed().dimensions());
        // Padding is transparent in both buffers
        assert_eq!(session.original().get_pixel(0, 0)[3], 0);
        assert_eq!(session.processed().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn matting_keys_the_background_but_keeps_the_subject() {
        let session = EditSession::from_image(upload(), true).unwrap();
        let side = crop::diagonal_side(60, 80);
        let ox = (side - 60) / 2;
        let oy = (side - 80) / 2;
        // Background corner of the upload is keyed out
        assert_eq!(session.processed().get_pixel(ox, oy)[3], 0);
        // Subject center survives
        assert_eq!(session.processed().get_pixel(ox + 30, oy + 40)[3], 255);
        // The original is untouched
        assert_eq!(session.original().get_pixel(ox, oy)[3], 255);
    }

    #[test]
    fn a_whole_stroke_is_one_undo_step() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let before = session.processed().clone();

        session.begin_stroke();
        session.stamp_at(50.0, 50.0);
        session.stamp_at(60.0, 50.0);
        session.stamp_at(70.0, 50.0);
        session.end_stroke();
        assert_ne!(session.processed().as_raw(), before.as_raw());

        assert!(session.undo());
        assert_eq!(session.processed().as_raw(), before.as_raw());
        assert!(!session.can_undo());
    }

    #[test]
    fn restore_brush_brings_back_keyed_pixels() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let side = crop::diagonal_side(60, 80);
        let ox = (side - 60) / 2;
        let oy = (side - 80) / 2;
        let (bx, by) = (ox as f32 + 2.0, oy as f32 + 2.0);

        session.brush.mode = BrushMode::Restore;
        session.begin_stroke();
        session.stamp_at(bx, by);
        session.end_stroke();
        assert_eq!(
            session.processed().get_pixel(bx as u32, by as u32)[3],
            255
        );
    }

    #[test]
    fn stroke_samples_map_through_the_view_box() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let (w, h) = session.dimensions();
        // 2× zoom view at origin (0, 0)
        let view = (w as f32 * 2.0, h as f32 * 2.0);

        session.begin_stroke();
        assert!(session.stroke_sample((100.0, 100.0), (0.0, 0.0), view));
        assert!(!session.stroke_sample((-5.0, 100.0), (0.0, 0.0), view));
        session.end_stroke();
        assert_eq!(session.processed().get_pixel(50, 50)[3], 0);
    }

    #[test]
    fn degenerate_crop_is_rejected_and_session_stays_open() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let dims = session.dimensions();
        session.begin_crop();
        // Shrink the rect below the minimum via direct application
        assert!(!session.apply_crop_rect(&CropRect { x: 0.0, y: 0.0, w: 3.0, h: 3.0 }));
        assert_eq!(session.dimensions(), dims);
        assert!(session.crop().is_some());
        assert!(!session.can_undo());
    }

    #[test]
    fn confirmed_crop_replaces_both_buffers_and_undo_restores_them() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let before_dims = session.dimensions();

        session.begin_crop();
        assert!(session.apply_crop_rect(&CropRect { x: 10.0, y: 10.0, w: 50.0, h: 50.0 }));
        session.cancel_crop();

        let side = crop::diagonal_side(50, 50);
        assert_eq!(session.dimensions(), (side, side));
        assert_eq!(session.original().dimensions(), (side, side));

        assert!(session.undo());
        assert_eq!(session.dimensions(), before_dims);
        assert_eq!(session.original().dimensions(), before_dims);
    }

    #[test]
    fn crop_gesture_flow_confirms_through_pointer_events() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let (w, h) = session.dimensions();
        let view = (w as f32, h as f32); // 1:1 view

        session.begin_crop();
        // Pointer-down above the default rect (and clear of its handles)
        // starts a brand-new rectangle
        session.crop_pointer_down((50.0, 2.0), (0.0, 0.0), view);
        session.crop_pointer_move((95.0, 72.0), (0.0, 0.0), view);
        session.crop_pointer_up();
        assert!(session.confirm_crop());
        assert!(session.crop().is_none());
        let side = crop::diagonal_side(45, 70);
        assert_eq!(session.dimensions(), (side, side));
    }

    #[test]
    fn rematte_discards_brush_edits() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        session.begin_stroke();
        session.stamp_at(50.0, 50.0);
        session.end_stroke();

        session.set_remove_background(false);
        // Processed equals original again
        assert_eq!(session.processed().as_raw(), session.original().as_raw());
        session.set_remove_background(true);
        assert_eq!(session.processed().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn ticking_advances_both_clocks_independently() {
        let mut session = EditSession::from_image(upload(), true).unwrap();
        let params = RenderParameters {
            image_speed: 1.0,
            frame_speed: 2.0,
            ..Default::default()
        };
        session.tick(1.0, &params);
        assert!((session.clock.image_phase - 0.6).abs() < 1e-9);
        assert!((session.clock.frame_phase - 1.2).abs() < 1e-9);
        session.clock.reset();
        assert_eq!(session.clock, PhaseClock::default());
    }
}
