//! Canvas → Framebuffer quantization.

pub mod dither;

use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::ChromaError;
use crate::pixel::format::{FormatName, PixelFormat};
use crate::pixel::framebuffer::Framebuffer;
use crate::surface::Surface;

pub use dither::DitherStrategy;

use dither::{clamp_channel, ErrorDiffusionBuffer};

/// Quantizes a `Canvas` into a `Framebuffer` of a fixed target pixel
/// format, using one of three dither strategies.
pub struct Renderer {
    format: &'static PixelFormat,
    dither: DitherStrategy,
    background: Color,
}

impl Renderer {
    /// `background` defaults to white.
    pub fn new(format: &'static PixelFormat, dither: DitherStrategy) -> Self {
        Renderer {
            format,
            dither,
            background: Color::WHITE,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn format(&self) -> &'static PixelFormat {
        self.format
    }

    /// Quantizes `canvas` into a freshly allocated `Framebuffer`.
    pub fn render(&self, canvas: &Canvas) -> Result<Framebuffer, ChromaError> {
        let mut fb = Framebuffer::new(canvas.width(), canvas.height(), self.format)?;
        self.render_into(canvas, &mut fb)?;
        Ok(fb)
    }

    /// Quantizes `canvas` into `into`, reusing its allocation. Fails if
    /// `into`'s dimensions don't match `canvas`'s.
    pub fn render_into(&self, canvas: &Canvas, into: &mut Framebuffer) -> Result<(), ChromaError> {
        if into.width() != canvas.width() || into.height() != canvas.height() {
            return Err(ChromaError::DimensionMismatch {
                expected_w: canvas.width() as u16,
                expected_h: canvas.height() as u16,
                actual_w: into.width() as u16,
                actual_h: into.height() as u16,
            });
        }
        let indices = self.quantize_indices(canvas);
        let w = canvas.width();
        for (i, &idx) in indices.iter().enumerate() {
            let x = i as u32 % w;
            let y = i as u32 / w;
            into.set_index(x, y, idx as u32);
        }
        Ok(())
    }

    /// Splits `canvas` into two mono `Framebuffer`s (black + red/yellow
    /// plane), per the routing table below. Requires this Renderer's
    /// format to be `color4`.
    pub fn render_dual(&self, canvas: &Canvas) -> Result<(Framebuffer, Framebuffer), ChromaError> {
        if self.format.name != FormatName::Color4 {
            return Err(ChromaError::UnsupportedFormat {
                operation: "render_dual".to_string(),
                required: FormatName::Color4.to_string(),
                actual: self.format.name.to_string(),
            });
        }
        let mono = crate::pixel::format::lookup(FormatName::Mono, 256);
        let mut black_fb = Framebuffer::new(canvas.width(), canvas.height(), mono)?;
        let mut red_fb = Framebuffer::new(canvas.width(), canvas.height(), mono)?;

        let indices = self.quantize_indices(canvas);
        let w = canvas.width();
        for (i, &idx) in indices.iter().enumerate() {
            let x = i as u32 % w;
            let y = i as u32 / w;
            let name = self.format.palette.color_at(idx).unwrap().0;
            let (black_bit, red_bit) = dual_buffer_routing(name);
            black_fb.set_index(x, y, black_bit);
            red_fb.set_index(x, y, red_bit);
        }
        Ok((black_fb, red_fb))
    }

    /// Row-major palette indices for every canvas pixel: flatten alpha
    /// against the background, apply the dither strategy's local
    /// transform, then pick
    /// the nearest palette entry. No `Color` objects are created beyond
    /// the small per-pixel locals needed to call `nearest_index`.
    fn quantize_indices(&self, canvas: &Canvas) -> Vec<usize> {
        let (w, h) = (canvas.width() as usize, canvas.height() as usize);
        let bytes = canvas.bytes();
        let palette = &self.format.palette;
        let mut out = vec![0usize; w * h];

        match self.dither {
            DitherStrategy::Threshold => {
                for y in 0..h {
                    for x in 0..w {
                        let off = (y * w + x) * 4;
                        let src = Color::new(bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]);
                        let flat = src.flatten_over(self.background);
                        out[y * w + x] = palette.nearest_index(flat);
                    }
                }
            }
            DitherStrategy::Ordered => {
                for y in 0..h {
                    for x in 0..w {
                        let off = (y * w + x) * 4;
                        let src = Color::new(bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]);
                        let flat = src.flatten_over(self.background);
                        let bias = DitherStrategy::ordered_bias(x as u32, y as u32, palette.len());
                        let biased = Color::rgb(
                            clamp_channel(flat.r as f32 + bias),
                            clamp_channel(flat.g as f32 + bias),
                            clamp_channel(flat.b as f32 + bias),
                        );
                        out[y * w + x] = palette.nearest_index(biased);
                    }
                }
            }
            DitherStrategy::FloydSteinberg => {
                let mut errors = ErrorDiffusionBuffer::new(w);
                for y in 0..h {
                    errors.start_row();
                    for x in 0..w {
                        let off = (y * w + x) * 4;
                        let src = Color::new(bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]);
                        let flat = src.flatten_over(self.background);
                        let biased = errors.biased(x, flat);
                        let quantized_color = Color::rgb(
                            clamp_channel(biased[0]),
                            clamp_channel(biased[1]),
                            clamp_channel(biased[2]),
                        );
                        let idx = palette.nearest_index(quantized_color);
                        let chosen = palette.color_at(idx).unwrap().1;
                        let error = [
                            biased[0] - chosen.r as f32,
                            biased[1] - chosen.g as f32,
                            biased[2] - chosen.b as f32,
                        ];
                        errors.distribute(x, error);
                        out[y * w + x] = idx;
                    }
                }
            }
        }
        out
    }
}

/// Dual-buffer routing table: each mono plane is 1 = "off / white" on the
/// panel, 0 = pigment active.
fn dual_buffer_routing(entry_name: &str) -> (u32, u32) {
    match entry_name {
        "black" => (0, 1),
        "white" => (1, 1),
        "red" => (1, 0),
        "yellow" => (1, 0),
        other => unreachable!("color4 palette has no entry {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::format::lookup;

    fn solid_canvas(color: Color, w: u32, h: u32) -> Canvas {
        Canvas::new(w, h, color)
    }

    #[test]
    fn solid_palette_color_is_dither_invariant() {
        let mono = lookup(FormatName::Mono, 256);
        for &strategy in &[
            DitherStrategy::Threshold,
            DitherStrategy::Ordered,
            DitherStrategy::FloydSteinberg,
        ] {
            let renderer = Renderer::new(mono, strategy);
            let canvas = solid_canvas(Color::BLACK, 8, 8);
            let fb = renderer.render(&canvas).unwrap();
            for y in 0..8 {
                for x in 0..8 {
                    assert_eq!(fb.get_pixel(x, y), Some("black"));
                }
            }
        }
    }

    #[test]
    fn render_into_rejects_mismatched_dims() {
        let mono = lookup(FormatName::Mono, 256);
        let renderer = Renderer::new(mono, DitherStrategy::Threshold);
        let canvas = solid_canvas(Color::WHITE, 4, 4);
        let mut fb = Framebuffer::new(5, 5, mono).unwrap();
        assert!(matches!(
            renderer.render_into(&canvas, &mut fb),
            Err(ChromaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn render_dual_requires_color4() {
        let mono = lookup(FormatName::Mono, 256);
        let renderer = Renderer::new(mono, DitherStrategy::Threshold);
        let canvas = solid_canvas(Color::WHITE, 2, 2);
        assert!(matches!(
            renderer.render_dual(&canvas),
            Err(ChromaError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn render_dual_routes_bits_by_palette_entry() {
        let color4 = lookup(FormatName::Color4, 256);
        let renderer = Renderer::new(color4, DitherStrategy::Threshold);
        let mut canvas = Canvas::new(4, 1, Color::WHITE);
        canvas.set_pixel(0, 0, Color::BLACK);
        canvas.set_pixel(1, 0, Color::WHITE);
        canvas.set_pixel(2, 0, Color::RED);
        canvas.set_pixel(3, 0, Color::YELLOW);

        let (black_fb, red_fb) = renderer.render_dual(&canvas).unwrap();
        // black,white,red,yellow -> black_fb bits 0,1,1,1 ; red_fb bits 1,1,0,0
        assert_eq!(black_fb.get_pixel(0, 0), Some("black"));
        assert_eq!(black_fb.get_pixel(1, 0), Some("white"));
        assert_eq!(black_fb.get_pixel(2, 0), Some("white"));
        assert_eq!(black_fb.get_pixel(3, 0), Some("white"));

        assert_eq!(red_fb.get_pixel(0, 0), Some("white"));
        assert_eq!(red_fb.get_pixel(1, 0), Some("white"));
        assert_eq!(red_fb.get_pixel(2, 0), Some("black"));
        assert_eq!(red_fb.get_pixel(3, 0), Some("black"));
    }

    #[test]
    fn red_over_white_is_nearest_mono_white() {
        let mono = lookup(FormatName::Mono, 256);
        let renderer = Renderer::new(mono, DitherStrategy::Threshold);
        let mut canvas = Canvas::new(1, 1, Color::WHITE);
        canvas.set_pixel(0, 0, Color::new(255, 0, 0, 128));
        let fb = renderer.render(&canvas).unwrap();
        assert_eq!(fb.get_pixel(0, 0), Some("white"));
    }

    #[test]
    fn floyd_steinberg_distributes_error_across_row() {
        let mono = lookup(FormatName::Mono, 256);
        let renderer = Renderer::new(mono, DitherStrategy::FloydSteinberg);
        // A mid-gray gradient row shouldn't panic and should produce both
        // black and white somewhere in a wide enough row.
        let mut canvas = Canvas::new(16, 1, Color::WHITE);
        for x in 0..16u32 {
            let v = (x * 16) as u8;
            canvas.set_pixel(x as i32, 0, Color::rgb(v, v, v));
        }
        let fb = renderer.render(&canvas).unwrap();
        let names: Vec<_> = (0..16).map(|x| fb.get_pixel(x, 0).unwrap()).collect();
        assert!(names.contains(&"black"));
        assert!(names.contains(&"white"));
    }
}
