//! The `Surface` drawing-target protocol.
//!
//! Satisfied by `Canvas`, `Framebuffer`, and `Layer`. An out-of-scope
//! drawing-primitives library consumes only this trait — it never knows
//! which concrete type it is drawing onto.

use crate::color::Color;

/// A value a `Surface` implementor writes and reads at a pixel coordinate.
/// `Canvas`/`Layer`-over-`Canvas` use RGBA; `Framebuffer`/`Layer`-over-
/// `Framebuffer` use a palette entry name.
pub trait PixelValue: Copy {}
impl PixelValue for Color {}

/// Duck-typed drawing target capability set.
///
/// Out-of-bounds writes are always silent no-ops; out-of-bounds reads
/// always return `None`. Implementors must uphold that for every coordinate
/// outside `[0, width) x [0, height)`.
pub trait Surface {
    type Pixel: PixelValue;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn set_pixel(&mut self, x: i32, y: i32, value: Self::Pixel);
    fn get_pixel(&self, x: i32, y: i32) -> Option<Self::Pixel>;

    /// Replace every pixel with `value`. The default walks every
    /// coordinate through `set_pixel`; concrete types are expected to
    /// override with a direct byte-fill where one is cheaper.
    fn clear(&mut self, value: Self::Pixel) {
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                self.set_pixel(x, y, value);
            }
        }
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }
}
