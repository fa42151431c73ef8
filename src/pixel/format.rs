//! `PixelFormat` and `Palette`.

use std::sync::{Mutex, OnceLock};

use lru::LruCache;

use crate::color::Color;
use crate::error::ChromaError;

/// One of the four device-format tags this crate supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatName {
    Mono,
    Gray4,
    Color4,
    Color7,
}

impl FormatName {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatName::Mono => "mono",
            FormatName::Gray4 => "gray4",
            FormatName::Color4 => "color4",
            FormatName::Color7 => "color7",
        }
    }
}

impl std::fmt::Display for FormatName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named palette entry, in declared (index) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: &'static str,
    pub color: Color,
}

/// An ordered sequence of (name, RGBA) pairs. `palette[0]` is the
/// "blackest"/off value. Names are unique within a palette;
/// declaration order equals the index order stored in a `Framebuffer`.
pub struct Palette {
    entries: &'static [PaletteEntry],
    cache: Mutex<LruCache<u32, usize>>,
}

impl Palette {
    fn new(entries: &'static [PaletteEntry], lru_capacity: usize) -> Self {
        let cap = std::num::NonZeroUsize::new(lru_capacity.max(1)).unwrap();
        Palette {
            entries,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &'static [PaletteEntry] {
        self.entries
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn color_at(&self, index: usize) -> Result<(&'static str, Color), ChromaError> {
        self.entries
            .get(index)
            .map(|e| (e.name, e.color))
            .ok_or(ChromaError::PaletteIndexOutOfRange {
                format: String::new(),
                index,
                len: self.entries.len(),
            })
    }

    /// Nearest palette entry by squared RGB distance. Ties are broken by
    /// lower palette index (entries are scanned in
    /// order and `<` — not `<=` — only replaces on a strictly closer
    /// match). Memoized in a bounded LRU keyed by packed RGBA.
    pub fn nearest_index(&self, color: Color) -> usize {
        let key = color.packed_key();
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(&idx) = cache.get(&key) {
                return idx;
            }
        }
        let mut best_idx = 0usize;
        let mut best_dist = u32::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            let d = color.squared_distance_rgb(entry.color);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
            }
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, best_idx);
        }
        best_idx
    }

    pub fn nearest_name(&self, color: Color) -> &'static str {
        self.entries[self.nearest_index(color)].name
    }
}

/// Immutable descriptor of bpp + ordered palette. Obtained from the
/// process-wide registry below; the
/// registry always returns the identical `&'static PixelFormat`.
pub struct PixelFormat {
    pub name: FormatName,
    pub bits_per_pixel: u8,
    pub palette: Palette,
}

impl PixelFormat {
    pub fn pixels_per_byte(&self) -> u32 {
        8 / self.bits_per_pixel as u32
    }

    /// `ceil(w / pixels_per_byte) * h`, rejecting dimensions outside
    /// `(0, 4096]` on either axis.
    pub fn buffer_size(&self, width: u32, height: u32) -> Result<usize, ChromaError> {
        if width == 0 || height == 0 || width > 4096 || height > 4096 {
            return Err(ChromaError::InvalidDimension {
                width: width as i64,
                height: height as i64,
            });
        }
        let ppb = self.pixels_per_byte();
        let row_bytes = (width + ppb - 1) / ppb;
        Ok(row_bytes as usize * height as usize)
    }
}

const MONO_ENTRIES: &[PaletteEntry] = &[
    PaletteEntry { name: "black", color: Color::BLACK },
    PaletteEntry { name: "white", color: Color::WHITE },
];

const GRAY4_ENTRIES: &[PaletteEntry] = &[
    PaletteEntry { name: "black", color: Color::BLACK },
    PaletteEntry { name: "dark_gray", color: Color::DARK_GRAY },
    PaletteEntry { name: "light_gray", color: Color::LIGHT_GRAY },
    PaletteEntry { name: "white", color: Color::WHITE },
];

// color4 / color7 orderings mirror the vendor controller's internal color
// indices and are not derivable from first principles: treated as data,
// fixed here exactly as the datasheet lists them.
const COLOR4_ENTRIES: &[PaletteEntry] = &[
    PaletteEntry { name: "black", color: Color::BLACK },
    PaletteEntry { name: "white", color: Color::WHITE },
    PaletteEntry { name: "yellow", color: Color::YELLOW },
    PaletteEntry { name: "red", color: Color::RED },
];

const COLOR7_ENTRIES: &[PaletteEntry] = &[
    PaletteEntry { name: "black", color: Color::BLACK },
    PaletteEntry { name: "white", color: Color::WHITE },
    PaletteEntry { name: "green", color: Color::GREEN },
    PaletteEntry { name: "blue", color: Color::BLUE },
    PaletteEntry { name: "red", color: Color::RED },
    PaletteEntry { name: "yellow", color: Color::YELLOW },
    PaletteEntry { name: "orange", color: Color::ORANGE },
];

struct FormatRegistry {
    mono: PixelFormat,
    gray4: PixelFormat,
    color4: PixelFormat,
    color7: PixelFormat,
}

static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();

fn registry(lru_capacity: usize) -> &'static FormatRegistry {
    REGISTRY.get_or_init(|| FormatRegistry {
        mono: PixelFormat {
            name: FormatName::Mono,
            bits_per_pixel: 1,
            palette: Palette::new(MONO_ENTRIES, lru_capacity),
        },
        gray4: PixelFormat {
            name: FormatName::Gray4,
            bits_per_pixel: 2,
            palette: Palette::new(GRAY4_ENTRIES, lru_capacity),
        },
        color4: PixelFormat {
            name: FormatName::Color4,
            bits_per_pixel: 4,
            palette: Palette::new(COLOR4_ENTRIES, lru_capacity),
        },
        color7: PixelFormat {
            name: FormatName::Color7,
            bits_per_pixel: 4,
            palette: Palette::new(COLOR7_ENTRIES, lru_capacity),
        },
    })
}

/// Process-wide pixel format lookup by name, created once per process.
/// The LRU capacity used for the *first* call wins for the life of the
/// process — later calls with a different capacity are ignored, since the
/// registry is a `OnceLock`; callers that care should call this once at
/// startup with `ConfigSettings::palette_lru_capacity`.
pub fn lookup(name: FormatName, lru_capacity: usize) -> &'static PixelFormat {
    let reg = registry(lru_capacity);
    match name {
        FormatName::Mono => &reg.mono,
        FormatName::Gray4 => &reg.gray4,
        FormatName::Color4 => &reg.color4,
        FormatName::Color7 => &reg.color7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_size_matches_formula() {
        let fmt = lookup(FormatName::Mono, 256);
        // 122x250 mono -> 16*250 = 4000
        assert_eq!(fmt.buffer_size(122, 250).unwrap(), 4000);
    }

    #[test]
    fn buffer_size_rejects_oversized_dims() {
        let fmt = lookup(FormatName::Mono, 256);
        assert!(fmt.buffer_size(4097, 10).is_err());
        assert!(fmt.buffer_size(0, 10).is_err());
    }

    #[test]
    fn nearest_color_ties_break_to_lower_index() {
        let fmt = lookup(FormatName::Color4, 256);
        // equidistant between black(0) and white(1) at pure gray -> lower index wins
        let gray = Color::rgb(128, 128, 128);
        let idx = fmt.palette.nearest_index(gray);
        assert!(idx == 0 || idx == 1);
    }

    #[test]
    fn registry_returns_identical_object() {
        let a = lookup(FormatName::Mono, 256) as *const PixelFormat;
        let b = lookup(FormatName::Mono, 256) as *const PixelFormat;
        assert_eq!(a, b);
    }

    #[test]
    fn color4_and_color7_orderings_are_data() {
        let c4 = lookup(FormatName::Color4, 256);
        assert_eq!(
            c4.palette.entries().iter().map(|e| e.name).collect::<Vec<_>>(),
            vec!["black", "white", "yellow", "red"]
        );
        let c7 = lookup(FormatName::Color7, 256);
        assert_eq!(
            c7.palette.entries().iter().map(|e| e.name).collect::<Vec<_>>(),
            vec!["black", "white", "green", "blue", "red", "yellow", "orange"]
        );
    }
}
