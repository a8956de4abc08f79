// ============================================================================
// MOTION FUNCTIONS — closed-form phase → transform mappings
// ============================================================================
//
// All motions are periodic with period 2 in phase units, so sampling phases
// [0, 2) yields one seamless loop.

use std::f32::consts::{PI, TAU};

use crate::params::{FrameMotion, ImageMotion};

/// A 2D similarity transform about the canvas center: translate, then
/// rotate, then scale the drawn image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion2D {
    pub dx: f32,
    pub dy: f32,
    /// Radians, clockwise in raster coordinates.
    pub rotation: f32,
    pub sx: f32,
    pub sy: f32,
}

impl Motion2D {
    pub const IDENTITY: Motion2D = Motion2D {
        dx: 0.0,
        dy: 0.0,
        rotation: 0.0,
        sx: 1.0,
        sy: 1.0,
    };
}

/// Image transform at phase `t` for a canvas of edge `size`.
pub fn image_motion(kind: ImageMotion, t: f32, size: f32) -> Motion2D {
    let mut m = Motion2D::IDENTITY;
    match kind {
        ImageMotion::None => {}
        ImageMotion::Spin => {
            m.rotation = t * TAU;
        }
        ImageMotion::Bounce => {
            m.dy = -(t * PI).sin().abs() * size * 0.1;
        }
        ImageMotion::Pulse => {
            let s = 1.0 + (t * TAU).sin() * 0.15;
            m.sx = s;
            m.sy = s;
        }
        ImageMotion::Float => {
            m.dy = (t * TAU).sin() * size * 0.05;
            m.rotation = (t * PI).sin() * 0.1;
        }
        ImageMotion::Swing => {
            m.rotation = (t * TAU).sin() * 0.5;
        }
        ImageMotion::Walk => {
            // Horizontal sawtooth sweep with a double-step bob
            m.dx = size * 0.6 - (t.rem_euclid(2.0) / 2.0) * size * 1.2;
            m.dy = -(t * PI * 4.0).sin().abs() * size * 0.03;
            m.rotation = (t * PI * 4.0).sin() * 0.1;
        }
    }
    m
}

/// Frame decoration transform at phase `t`: (rotation radians, uniform
/// scale).
pub fn frame_motion(kind: FrameMotion, t: f32) -> (f32, f32) {
    match kind {
        FrameMotion::Static => (0.0, 1.0),
        FrameMotion::Spin => (t * TAU, 1.0),
        FrameMotion::SpinReverse => (-t * TAU, 1.0),
        FrameMotion::Pulse => (0.0, 1.0 + (t * TAU).sin() * 0.1),
    }
}
