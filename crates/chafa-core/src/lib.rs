//! chafa-core: the rendering engine behind a terminal image viewer.
//!
//! Turns RGBA pixel buffers into terminal output, either as Unicode
//! symbol art (with optional ANSI/indexed color) or as a native graphics
//! protocol payload (Sixel, Kitty, or iTerm2), wrapped for tmux/screen
//! passthrough where needed.

pub mod batch;
pub mod canvas;
pub mod cell;
pub mod color;
pub mod dither;
pub mod error;
pub mod palette;
pub mod preprocess;
pub mod protocols;
pub mod symbols;
pub mod term;

pub use canvas::{Canvas, CanvasConfig};
pub use error::{ChafaError, Result};
