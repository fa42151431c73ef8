//! ChromaWave: a runtime-model-selectable driver core for the Waveshare
//! e-paper display family.
//!
//! Layering: a two-tier driver registry + bytecode
//! interpreter resolves a model name to an init/display/sleep sequence; a
//! pixel storage + rendering pipeline turns an RGBA `Canvas` into a packed
//! `Framebuffer`; a hardware lifecycle layer drives that buffer out over a
//! HAL-abstracted SPI+GPIO link. [`Display`] is the facade tying all three
//! together for a caller who just wants to hand it a `Canvas` and get a
//! refreshed panel.

pub mod canvas;
pub mod color;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod hal;
pub mod layer;
pub mod pen;
pub mod pixel;
pub mod registry;
pub mod render;
pub mod surface;

pub use canvas::Canvas;
pub use color::Color;
pub use config::ConfigSettings;
pub use display::{Display, DualBuffer, FastRefresh, GrayscaleMode, PartialRefresh, RegionalRefresh};
pub use error::ChromaError;
pub use hal::{BusyPin, GpioPin, Hal, SpiBus};
pub use layer::Layer;
pub use pen::Pen;
pub use pixel::{Framebuffer, PixelFormat, PixelValue};
pub use registry::{BusyPolarity, Capabilities, ModelConfig, ResetTiming};
pub use render::{DitherStrategy, Renderer};
pub use surface::Surface;
