//! The `Display` facade and capability composition.
//!
//! A model's capability bitmask ([`Capabilities`]) is runtime data — there
//! is no type-level way to know at compile time whether `"epd_2in13_v4"`
//! supports partial refresh. So composition here means: `Display<H>`
//! implements every capability trait unconditionally, and each method
//! checks the bitmask before doing any hardware I/O, returning
//! `UnsupportedFormat` for a model that lacks the bit. A caller who wants a
//! compile-time guarantee instead should match on `Display::capabilities()`
//! once at startup and branch, rather than calling a trait method and
//! handling the error every time.

use crate::config::ConfigSettings;
use crate::device::Device;
use crate::error::ChromaError;
use crate::hal::Hal;
use crate::pixel::{Framebuffer, PixelFormat};
use crate::registry::bytecode::InitMode;
use crate::registry::{Capabilities, ModelConfig};
use crate::canvas::Canvas;
use crate::render::Renderer;

/// A runtime-selected e-paper display bound to one model and one HAL
/// backend.
pub struct Display<H: Hal> {
    device: Device<H>,
    format: &'static PixelFormat,
}

impl<H: Hal> Display<H> {
    /// Resolves `model_name` and binds it to `hal`. Does not touch hardware
    /// yet — the first `show`/`clear`/capability call triggers the model's
    /// full init sequence.
    pub fn open(model_name: &str, hal: H, config: ConfigSettings) -> Result<Self, ChromaError> {
        let device = Device::open_with_hal(model_name, hal, config)?;
        let format = crate::pixel::lookup(device.model().pixel_format, config.palette_lru_capacity);
        Ok(Display { device, format })
    }

    pub fn model(&self) -> &'static ModelConfig {
        self.device.model()
    }

    pub fn model_name(&self) -> &'static str {
        self.device.model().model_name
    }

    pub fn width(&self) -> u16 {
        self.device.model().width
    }

    pub fn height(&self) -> u16 {
        self.device.model().height
    }

    pub fn format(&self) -> &'static PixelFormat {
        self.format
    }

    pub fn capabilities(&self) -> Capabilities {
        self.device.model().capabilities
    }

    /// Renders `canvas` through `renderer` and writes a full-panel refresh.
    /// Ensures the model is in `InitMode::Full` first.
    pub fn show(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError> {
        self.check_format(renderer)?;
        self.device.init(InitMode::Full)?;
        let fb = renderer.render(canvas)?;
        self.device.display(&fb)
    }

    /// Writes an already-rendered framebuffer directly, skipping the
    /// render step — useful when a caller keeps its own `Framebuffer`
    /// across several mostly-unchanged refreshes.
    pub fn show_framebuffer(&mut self, fb: &Framebuffer) -> Result<(), ChromaError> {
        self.check_fb_format(fb)?;
        self.device.init(InitMode::Full)?;
        self.device.display(fb)
    }

    /// Clears the panel to `palette_entry` (e.g. `"white"`).
    pub fn clear(&mut self, palette_entry: &str) -> Result<(), ChromaError> {
        let mut fb = Framebuffer::new(self.width() as u32, self.height() as u32, self.format)?;
        fb.clear(palette_entry.into())?;
        self.device.init(InitMode::Full)?;
        self.device.display(&fb)
    }

    pub fn deep_sleep(&mut self) -> Result<(), ChromaError> {
        self.device.deep_sleep()
    }

    pub fn close(&self) {
        self.device.close();
    }

    pub fn is_open(&self) -> bool {
        self.device.is_open()
    }

    fn check_format(&self, renderer: &Renderer) -> Result<(), ChromaError> {
        if renderer.format().name != self.format.name {
            return Err(ChromaError::FormatMismatch {
                expected: self.format.name.to_string(),
                actual: renderer.format().name.to_string(),
            });
        }
        Ok(())
    }

    fn check_fb_format(&self, fb: &Framebuffer) -> Result<(), ChromaError> {
        if fb.format_name() != self.format.name {
            return Err(ChromaError::FormatMismatch {
                expected: self.format.name.to_string(),
                actual: fb.format_name().to_string(),
            });
        }
        Ok(())
    }
}

/// Partial-refresh capability. Requires `Capabilities::PARTIAL`.
pub trait PartialRefresh {
    fn show_partial(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError>;
}

impl<H: Hal> PartialRefresh for Display<H> {
    fn show_partial(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError> {
        if !self.capabilities().has_partial_refresh() {
            return Err(unsupported("show_partial", self.model_name()));
        }
        self.check_format(renderer)?;
        self.device.init(InitMode::Partial)?;
        let fb = renderer.render(canvas)?;
        self.device.display(&fb)
    }
}

/// Fast-refresh capability. Requires `Capabilities::FAST`.
pub trait FastRefresh {
    fn show_fast(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError>;
}

impl<H: Hal> FastRefresh for Display<H> {
    fn show_fast(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError> {
        if !self.capabilities().has_fast_refresh() {
            return Err(unsupported("show_fast", self.model_name()));
        }
        self.check_format(renderer)?;
        self.device.init(InitMode::Fast)?;
        let fb = renderer.render(canvas)?;
        self.device.display(&fb)
    }
}

/// Grayscale-mode capability. Requires `Capabilities::GRAYSCALE`.
/// No dedicated bytecode sequence exists for this mode in the Tier 1 binary
/// shape (see `registry::bytecode::InitMode::Grayscale`'s doc comment); the
/// generic interpreter falls back to the full init sequence unless a Tier 2
/// `custom_init` exists.
pub trait GrayscaleMode {
    fn init_grayscale(&mut self) -> Result<(), ChromaError>;
}

impl<H: Hal> GrayscaleMode for Display<H> {
    fn init_grayscale(&mut self) -> Result<(), ChromaError> {
        if !self.capabilities().has_grayscale() {
            return Err(unsupported("init_grayscale", self.model_name()));
        }
        self.device.init(InitMode::Grayscale)
    }
}

/// Dual-buffer capability. Requires `Capabilities::DUAL_BUF` and a Tier 2
/// `custom_display_dual` override — the generic interpreter has no
/// model-independent routing for two buffers.
pub trait DualBuffer {
    fn show_dual(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError>;
}

impl<H: Hal> DualBuffer for Display<H> {
    fn show_dual(&mut self, canvas: &Canvas, renderer: &Renderer) -> Result<(), ChromaError> {
        if !self.capabilities().has_dual_buffer() {
            return Err(unsupported("show_dual", self.model_name()));
        }
        self.check_format(renderer)?;
        self.device.init(InitMode::Full)?;
        let (primary, secondary) = renderer.render_dual(canvas)?;
        self.device.display_dual(&primary, &secondary)
    }
}

/// Regional-refresh capability. Requires `Capabilities::REGIONAL` and a
/// Tier 2 `custom_display_region` override. `x`/`width` are auto-aligned to
/// byte boundaries by `Device::display_region`.
pub trait RegionalRefresh {
    fn show_region(
        &mut self,
        fb: &Framebuffer,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), ChromaError>;
}

impl<H: Hal> RegionalRefresh for Display<H> {
    fn show_region(
        &mut self,
        fb: &Framebuffer,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), ChromaError> {
        if !self.capabilities().has_regional_refresh() {
            return Err(unsupported("show_region", self.model_name()));
        }
        self.check_fb_format(fb)?;
        self.device.init(InitMode::Full)?;
        self.device.display_region(fb, x, y, width, height)
    }
}

fn unsupported(operation: &str, model: &str) -> ChromaError {
    ChromaError::UnsupportedFormat {
        operation: operation.to_string(),
        required: format!("a model whose capability bitmask supports {operation}"),
        actual: model.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::hal::mock::{BusEvent, MockHal};
    use crate::surface::Surface;

    fn open(model_name: &str) -> (Display<MockHal>, crate::hal::mock::MockHandle) {
        let hal = MockHal::new();
        let handle = hal.handle();
        handle.set_default_busy_level(false);
        let display = Display::open(model_name, hal, ConfigSettings::default()).unwrap();
        (display, handle)
    }

    #[test]
    fn show_renders_and_writes_a_transcript() {
        let (mut display, handle) = open("epd_2in13_v4");
        let mut canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        canvas.set_pixel(0, 0, Color::BLACK);
        let renderer = Renderer::new(display.format(), crate::render::DitherStrategy::Threshold);
        display.show(&canvas, &renderer).unwrap();
        assert!(!handle.transcript().is_empty());
    }

    #[test]
    fn show_rejects_mismatched_renderer_format() {
        let (mut display, _handle) = open("epd_2in13_v4"); // mono
        let canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        let gray_format = crate::pixel::lookup(crate::pixel::FormatName::Gray4, 256);
        let renderer = Renderer::new(gray_format, crate::render::DitherStrategy::Threshold);
        let result = display.show(&canvas, &renderer);
        assert!(matches!(result, Err(ChromaError::FormatMismatch { .. })));
    }

    #[test]
    fn show_partial_on_unsupported_model_errors() {
        let (mut display, _handle) = open("epd_4in2b_v2"); // no PARTIAL bit
        let canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        let renderer = Renderer::new(display.format(), crate::render::DitherStrategy::Threshold);
        let result = display.show_partial(&canvas, &renderer);
        assert!(matches!(result, Err(ChromaError::UnsupportedFormat { .. })));
    }

    #[test]
    fn show_partial_on_supported_model_succeeds() {
        let (mut display, handle) = open("epd_2in13_v4"); // has PARTIAL
        let canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        let renderer = Renderer::new(display.format(), crate::render::DitherStrategy::Threshold);
        display.show_partial(&canvas, &renderer).unwrap();
        assert!(!handle.transcript().is_empty());
    }

    #[test]
    fn clear_writes_a_solid_buffer() {
        let (mut display, handle) = open("epd_2in13_v4");
        display.clear("white").unwrap();
        assert!(!handle.transcript().is_empty());
    }

    #[test]
    fn close_then_show_is_device_closed() {
        let (mut display, _handle) = open("epd_2in13_v4");
        display.close();
        let canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        let renderer = Renderer::new(display.format(), crate::render::DitherStrategy::Threshold);
        let result = display.show(&canvas, &renderer);
        assert!(matches!(result, Err(ChromaError::DeviceClosed { .. })));
    }

    #[test]
    fn show_dual_on_supported_model_succeeds() {
        let (mut display, handle) = open("epd_4in2b_v2"); // has DUAL_BUF, active-low busy
        handle.set_default_busy_level(true);
        let mut canvas = Canvas::new(display.width() as u32, display.height() as u32, Color::WHITE);
        canvas.set_pixel(0, 0, Color::RED);
        let renderer = Renderer::new(display.format(), crate::render::DitherStrategy::Threshold);
        display.show_dual(&canvas, &renderer).unwrap();

        let transcript = handle.transcript();
        assert!(transcript
            .iter()
            .any(|e| matches!(e, BusEvent::Command(0x10))));
        assert!(transcript
            .iter()
            .any(|e| matches!(e, BusEvent::Command(0x13))));
    }

    #[test]
    fn show_region_on_supported_model_succeeds() {
        let (mut display, handle) = open("epd_7in5_v2"); // has REGIONAL, active-low busy
        handle.set_default_busy_level(true);
        let fmt = display.format();
        let fb = Framebuffer::new(display.width() as u32, display.height() as u32, fmt).unwrap();
        display.show_region(&fb, 8, 10, 80, 20).unwrap();
        assert!(!handle.transcript().is_empty());
    }
}
