//! LoadSpin — loading-animation studio core.
//!
//! Takes an uploaded raster image, keys out its background, lets the caller
//! retouch the matte with erase/restore brushing and cropping (with bounded
//! undo), and composites the result with an animated decorative frame and
//! label text into a looping animation that can be exported as a still PNG,
//! an animated GIF/APNG, or a video container via ffmpeg.
//!
//! The presentation layer (pointer handling, widgets) is a collaborator: it
//! forwards pointer samples in view space and reads back buffers to display.
//! Everything stateful lives in [`session::EditSession`].

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod cli;
pub mod compositor;
pub mod exporter;
pub mod history;
pub mod io;
pub mod logger;
pub mod ops;
pub mod params;
pub mod session;
pub mod view;

pub use compositor::Compositor;
pub use exporter::{ExportFormat, ExportJob};
pub use params::{FrameMotion, FrameStyle, ImageMotion, RenderParameters, Template, TextRotateMode};
pub use session::EditSession;
