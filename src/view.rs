// ============================================================================
// VIEW → BUFFER COORDINATE MAPPING
// ============================================================================
//
// The editor canvas is displayed at `buffer_size × zoom` CSS pixels, possibly
// with an extra CSS/backing-store ratio on top.  Mapping through the
// element's on-screen bounding box absorbs both factors at once, so the
// functions here take the box instead of the zoom directly.
//
// Convention: brush radius is expressed in buffer pixels and does NOT scale
// with zoom — zooming in makes the brush cover fewer screen pixels' worth of
// image, not more image.  Only the cursor overlay (a display-space circle)
// scales, via [`brush_cursor_diameter`].

/// Map a pointer position in view space to buffer coordinates.
///
/// `view_origin`/`view_size` describe the canvas element's bounding box in
/// the same space as `pointer`.  Returns `None` when the pointer is outside
/// the box or the box is degenerate.
pub fn view_to_buffer(
    pointer: (f32, f32),
    view_origin: (f32, f32),
    view_size: (f32, f32),
    buffer_size: (u32, u32),
) -> Option<(f32, f32)> {
    if view_size.0 <= 0.0 || view_size.1 <= 0.0 {
        return None;
    }
    let u = (pointer.0 - view_origin.0) / view_size.0;
    let v = (pointer.1 - view_origin.1) / view_size.1;
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return None;
    }
    Some((u * buffer_size.0 as f32, v * buffer_size.1 as f32))
}

/// Like [`view_to_buffer`] but clamps out-of-box pointers onto the buffer
/// edge instead of rejecting them.  Crop drags keep tracking the pointer
/// when it leaves the canvas, pinned to [0, w]×[0, h].
pub fn view_to_buffer_clamped(
    pointer: (f32, f32),
    view_origin: (f32, f32),
    view_size: (f32, f32),
    buffer_size: (u32, u32),
) -> (f32, f32) {
    let w = buffer_size.0 as f32;
    let h = buffer_size.1 as f32;
    if view_size.0 <= 0.0 || view_size.1 <= 0.0 {
        return (0.0, 0.0);
    }
    let x = (pointer.0 - view_origin.0) / view_size.0 * w;
    let y = (pointer.1 - view_origin.1) / view_size.1 * h;
    (x.clamp(0.0, w), y.clamp(0.0, h))
}

/// Display-space diameter of the brush cursor overlay for a brush of
/// `diameter` buffer pixels at the given zoom.
pub fn brush_cursor_diameter(diameter: f32, zoom: f32) -> f32 {
    diameter * zoom
}
