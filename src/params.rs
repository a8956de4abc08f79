// ============================================================================
// RENDER PARAMETERS — configuration surface consumed by the compositor
// ============================================================================
//
// All values arrive pre-validated from the presentation layer (or the CLI,
// which parses raw strings like hex colors before they get here).  The core
// never parses user input itself.

use clap::ValueEnum;

/// Decorative frame drawn around (behind) the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum FrameStyle {
    /// Three-quarter ring with round caps.
    #[default]
    Ring,
    /// Two opposed outer arcs plus a counter-rotating inner arc.
    DualRing,
    /// Eight dots on a circle with an alpha ramp.
    Dots,
    /// Dashed full circle with a marching dash offset.
    Dash,
    /// The label text itself, orbiting as the spinner.
    TextRotate,
    /// No frame.
    None,
}

impl FrameStyle {
    pub fn label(&self) -> &'static str {
        match self {
            FrameStyle::Ring => "Ring",
            FrameStyle::DualRing => "Dual ring",
            FrameStyle::Dots => "Dots",
            FrameStyle::Dash => "Dashed ring",
            FrameStyle::TextRotate => "Rotating text",
            FrameStyle::None => "None",
        }
    }

    pub fn all() -> &'static [FrameStyle] {
        &[
            FrameStyle::Ring,
            FrameStyle::DualRing,
            FrameStyle::Dots,
            FrameStyle::Dash,
            FrameStyle::TextRotate,
            FrameStyle::None,
        ]
    }
}

/// Motion applied to the frame decoration as a function of the frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum FrameMotion {
    Static,
    #[default]
    Spin,
    SpinReverse,
    Pulse,
}

impl FrameMotion {
    pub fn label(&self) -> &'static str {
        match self {
            FrameMotion::Static => "Static",
            FrameMotion::Spin => "Spin",
            FrameMotion::SpinReverse => "Reverse spin",
            FrameMotion::Pulse => "Pulse",
        }
    }

    pub fn all() -> &'static [FrameMotion] {
        &[
            FrameMotion::Static,
            FrameMotion::Spin,
            FrameMotion::SpinReverse,
            FrameMotion::Pulse,
        ]
    }
}

/// Motion applied to the uploaded image as a function of the image phase.
///
/// Every variant is a closed-form function of phase with period 2, so an
/// export covering phases [0, 2) loops seamlessly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageMotion {
    None,
    #[default]
    Spin,
    Bounce,
    Pulse,
    Float,
    Swing,
    Walk,
}

impl ImageMotion {
    pub fn label(&self) -> &'static str {
        match self {
            ImageMotion::None => "None",
            ImageMotion::Spin => "Spin",
            ImageMotion::Bounce => "Bounce",
            ImageMotion::Pulse => "Pulse",
            ImageMotion::Float => "Float",
            ImageMotion::Swing => "Swing",
            ImageMotion::Walk => "Walk",
        }
    }

    pub fn all() -> &'static [ImageMotion] {
        &[
            ImageMotion::None,
            ImageMotion::Spin,
            ImageMotion::Bounce,
            ImageMotion::Pulse,
            ImageMotion::Float,
            ImageMotion::Swing,
            ImageMotion::Walk,
        ]
    }
}

/// How the rotating-text spinner fills its circle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum TextRotateMode {
    /// Place the string once around the circle.
    #[default]
    Single,
    /// Repeat the string until the circumference is visually filled.
    Repeat,
}

impl TextRotateMode {
    pub fn label(&self) -> &'static str {
        match self {
            TextRotateMode::Single => "Single",
            TextRotateMode::Repeat => "Repeat",
        }
    }

    pub fn all() -> &'static [TextRotateMode] {
        &[TextRotateMode::Single, TextRotateMode::Repeat]
    }
}

/// Inner-arc accent of the dual-ring frame (fixed, not user configurable).
pub const DUAL_RING_ACCENT: [u8; 4] = [0xf4, 0x72, 0xb6, 0xff];

/// Everything the compositor needs to draw one frame, minus the pixel
/// buffers and the phase pair.
#[derive(Clone, Debug)]
pub struct RenderParameters {
    /// Output canvas edge in pixels (square output).
    pub output_size: u32,
    /// Image size multiplier; 1.0 draws the image at 45% of the canvas edge.
    pub image_scale: f32,
    pub frame_style: FrameStyle,
    pub frame_motion: FrameMotion,
    pub frame_color: [u8; 4],
    /// Frame phase speed multiplier.
    pub frame_speed: f32,
    pub image_motion: ImageMotion,
    /// Image phase speed multiplier.
    pub image_speed: f32,
    /// Label text; empty string draws no label.
    pub text: String,
    pub text_color: [u8; 4],
    /// System font family for the label / rotating text.
    pub text_font: String,
    /// Font size as a percentage of the base size (7% of the canvas edge).
    pub text_size: f32,
    /// Angular spacing multiplier for rotating text.
    pub text_spacing: f32,
    pub text_rotate_mode: TextRotateMode,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            output_size: 512,
            image_scale: 1.0,
            frame_style: FrameStyle::Ring,
            frame_motion: FrameMotion::Spin,
            frame_color: [0x63, 0x66, 0xf1, 0xff],
            frame_speed: 1.0,
            image_motion: ImageMotion::Spin,
            image_speed: 1.0,
            text: String::new(),
            text_color: [0xff, 0xff, 0xff, 0xff],
            text_font: "DejaVu Sans".to_string(),
            text_size: 100.0,
            text_spacing: 1.0,
            text_rotate_mode: TextRotateMode::Single,
        }
    }
}

// ============================================================================
// TEMPLATE PRESETS
// ============================================================================

/// Named parameter presets.  Applying one overwrites the fields it cares
/// about and leaves the rest untouched, so callers can still adjust
/// individual values afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Template {
    ClassicSpin,
    ModernDots,
    Energetic,
    PlayfulWalk,
    TextSpinner,
}

impl Template {
    pub fn label(&self) -> &'static str {
        match self {
            Template::ClassicSpin => "Classic spin",
            Template::ModernDots => "Modern dots",
            Template::Energetic => "Energetic",
            Template::PlayfulWalk => "Playful walk",
            Template::TextSpinner => "Text spinner",
        }
    }

    pub fn all() -> &'static [Template] {
        &[
            Template::ClassicSpin,
            Template::ModernDots,
            Template::Energetic,
            Template::PlayfulWalk,
            Template::TextSpinner,
        ]
    }

    pub fn apply(&self, params: &mut RenderParameters) {
        match self {
            Template::ClassicSpin => {
                params.frame_style = FrameStyle::Ring;
                params.frame_motion = FrameMotion::Spin;
                params.image_motion = ImageMotion::Spin;
            }
            Template::ModernDots => {
                params.frame_style = FrameStyle::Dots;
                params.frame_motion = FrameMotion::Spin;
                params.image_motion = ImageMotion::Pulse;
            }
            Template::Energetic => {
                params.frame_style = FrameStyle::DualRing;
                params.frame_motion = FrameMotion::Spin;
                params.image_motion = ImageMotion::Bounce;
            }
            Template::PlayfulWalk => {
                params.frame_style = FrameStyle::None;
                params.image_motion = ImageMotion::Walk;
                params.text = "Walking...".to_string();
            }
            Template::TextSpinner => {
                params.frame_style = FrameStyle::TextRotate;
                params.image_motion = ImageMotion::None;
                params.text_rotate_mode = TextRotateMode::Repeat;
                params.text = "NOW LOADING... ".to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_overwrites_only_its_fields() {
        let mut params = RenderParameters {
            frame_color: [1, 2, 3, 255],
            text: "keep me".to_string(),
            ..Default::default()
        };
        Template::Energetic.apply(&mut params);
        assert_eq!(params.frame_style, FrameStyle::DualRing);
        assert_eq!(params.image_motion, ImageMotion::Bounce);
        assert_eq!(params.frame_color, [1, 2, 3, 255]);
        assert_eq!(params.text, "keep me");
    }

    #[test]
    fn text_spinner_template_sets_repeat_mode() {
        let mut params = RenderParameters::default();
        Template::TextSpinner.apply(&mut params);
        assert_eq!(params.frame_style, FrameStyle::TextRotate);
        assert_eq!(params.text_rotate_mode, TextRotateMode::Repeat);
        assert!(!params.text.is_empty());
    }
}
