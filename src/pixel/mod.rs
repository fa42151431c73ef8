//! Pixel storage and format descriptors.

pub mod format;
pub mod framebuffer;

pub use format::{lookup, FormatName, PaletteEntry, Palette, PixelFormat};
pub use framebuffer::{Framebuffer, PixelValue};
