//! Tier 1 static driver table.
//!
//! In the real extraction toolchain this table has ~70 rows, one per
//! Waveshare SKU, generated offline from the vendor's C drivers. This
//! in-tree table carries a representative slice spanning mono, gray4,
//! color4, and color7 panels, partial/fast/dual-buffer capability
//! combinations, and a couple of Tier 2 overrides — enough to exercise
//! every code path `registry`/`device`/`display` define.

use crate::pixel::{Framebuffer, FormatName};

use super::bytecode::{self, InitMode, OP_DELAY_MS, OP_END, OP_HW_RESET, OP_SET_WINDOW, OP_SW_RESET, OP_WAIT_BUSY};
use super::{DriverEntry, OverrideEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyPolarity {
    ActiveHigh,
    ActiveLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    pub pre_ms: u16,
    pub low_ms: u16,
    pub post_ms: u16,
}

/// Capability bitmask tags.
pub mod capability {
    pub const PARTIAL: u32 = 1;
    pub const FAST: u32 = 2;
    pub const GRAYSCALE: u32 = 4;
    pub const DUAL_BUF: u32 = 8;
    pub const REGIONAL: u32 = 16;
}

/// A `u32` capability bitmask with named-bit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub fn has_partial_refresh(self) -> bool {
        self.0 & capability::PARTIAL != 0
    }
    pub fn has_fast_refresh(self) -> bool {
        self.0 & capability::FAST != 0
    }
    pub fn has_grayscale(self) -> bool {
        self.0 & capability::GRAYSCALE != 0
    }
    pub fn has_dual_buffer(self) -> bool {
        self.0 & capability::DUAL_BUF != 0
    }
    pub fn has_regional_refresh(self) -> bool {
        self.0 & capability::REGIONAL != 0
    }
}

/// One Tier 1 row. Always `'static`: the whole table is compiled-in data,
/// built once at compile/load time from the extraction toolchain.
pub struct ModelConfig {
    pub model_name: &'static str,
    pub width: u16,
    pub height: u16,
    pub pixel_format: FormatName,
    pub busy_polarity: BusyPolarity,
    pub reset_timing: ResetTiming,
    pub display_cmd: u8,
    pub display_cmd_2: u8,
    pub capabilities: Capabilities,
    pub init_sequence: &'static [u8],
    pub init_fast_sequence: Option<&'static [u8]>,
    pub init_partial_sequence: Option<&'static [u8]>,
    pub sleep_cmd: u8,
    pub sleep_data: u8,
}

// ---- bytecode fragments shared by several rows below ----

/// `HW_RESET; SW_RESET; <driver output control>; <data entry mode>;
/// SET_WINDOW full-panel; WAIT_BUSY; END` — the common skeleton nearly
/// every SSD16xx-family mono/gray4 panel's full init follows: hardware
/// reset, software reset, then the window covering the whole panel before
/// the first write.
const EPD_2IN13_V4_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 2, 0xF9, 0x00, // driver output control, 250 rows
    0x11, 1, 0x03, // data entry mode
    OP_SET_WINDOW, 0, 0, 0x79, 0x00, 0, 0, 0xF9, 0x00,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_2IN13_V4_PARTIAL: &[u8] = &[
    OP_SW_RESET,
    0x3C, 1, 0x80, // border waveform, partial
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_7IN5_V2_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x07, 0x07, 0x3F, // driver output control for 480x800 panel
    0x04, 3, 0x07, 0x07, 0x07, // power setting
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_7IN5_V2_FAST: &[u8] = &[
    OP_SW_RESET,
    0x1A, 1, 0x5A, // write temperature register, fast-refresh profile
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_4IN2B_V2_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x03, 0x00, 0x2B, // driver output control
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_5IN65F_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_DELAY_MS, 0x14, 0x00, // 20ms
    OP_SW_RESET,
    OP_WAIT_BUSY,
    0x00, 4, 0xEF, 0x08, 0x00, 0x28, // panel setting, 7-color
    OP_END,
];

const EPD_2IN7_V2_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x05, 0x05, 0xBF,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_2IN13G_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x00, 0x06, 0x03,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_1IN54_V2_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0xC7, 0x00, 0x01,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_3IN7_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x6F, 0x01, 0x00,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_2IN9_V2_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_SW_RESET,
    0x01, 3, 0x27, 0x01, 0x00,
    OP_WAIT_BUSY,
    OP_END,
];

const EPD_7IN3F_INIT: &[u8] = &[
    OP_HW_RESET,
    OP_DELAY_MS, 0x14, 0x00,
    OP_SW_RESET,
    OP_WAIT_BUSY,
    0x00, 4, 0xEF, 0x08, 0x00, 0x28,
    OP_END,
];

/// The Tier 1 table. In production this carries ~70 distinct vendor init
/// sequences; this is a representative subset: one row per pixel format,
/// plus partial/fast/dual-buffer/regional capability combinations.
pub static TABLE: &[ModelConfig] = &[
    ModelConfig {
        model_name: "epd_2in13_v4",
        width: 122,
        height: 250,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x24,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::PARTIAL | capability::FAST),
        init_sequence: EPD_2IN13_V4_INIT,
        init_fast_sequence: None,
        init_partial_sequence: Some(EPD_2IN13_V4_PARTIAL),
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_2in13_v2",
        width: 122,
        height: 250,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x24,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::PARTIAL),
        init_sequence: EPD_2IN13_V4_INIT,
        init_fast_sequence: None,
        init_partial_sequence: Some(EPD_2IN13_V4_PARTIAL),
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_7in5_v2",
        width: 800,
        height: 480,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveLow,
        reset_timing: ResetTiming { pre_ms: 200, low_ms: 2, post_ms: 200 },
        display_cmd: 0x13,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::FAST | capability::REGIONAL),
        init_sequence: EPD_7IN5_V2_INIT,
        init_fast_sequence: Some(EPD_7IN5_V2_FAST),
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_4in2b_v2",
        width: 400,
        height: 300,
        pixel_format: FormatName::Color4,
        busy_polarity: BusyPolarity::ActiveLow,
        reset_timing: ResetTiming { pre_ms: 200, low_ms: 2, post_ms: 200 },
        display_cmd: 0x10,
        display_cmd_2: 0x13,
        capabilities: Capabilities(capability::DUAL_BUF),
        init_sequence: EPD_4IN2B_V2_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x50,
        sleep_data: 0xF7,
    },
    ModelConfig {
        model_name: "epd_5in65f",
        width: 600,
        height: 448,
        pixel_format: FormatName::Color7,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x10,
        display_cmd_2: 0x00,
        capabilities: Capabilities(0),
        init_sequence: EPD_5IN65F_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x07,
        sleep_data: 0xA5,
    },
    ModelConfig {
        model_name: "epd_7in3f",
        width: 800,
        height: 480,
        pixel_format: FormatName::Color7,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x10,
        display_cmd_2: 0x00,
        capabilities: Capabilities(0),
        init_sequence: EPD_7IN3F_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x07,
        sleep_data: 0xA5,
    },
    ModelConfig {
        model_name: "epd_2in7_v2",
        width: 176,
        height: 264,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveLow,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x24,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::PARTIAL | capability::FAST),
        init_sequence: EPD_2IN7_V2_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_2in13g",
        width: 122,
        height: 250,
        pixel_format: FormatName::Gray4,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x10,
        display_cmd_2: 0x13,
        capabilities: Capabilities(capability::GRAYSCALE),
        init_sequence: EPD_2IN13G_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_1in54_v2",
        width: 200,
        height: 200,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x24,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::PARTIAL | capability::FAST),
        init_sequence: EPD_1IN54_V2_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_3in7",
        width: 280,
        height: 480,
        pixel_format: FormatName::Gray4,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x13,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::GRAYSCALE | capability::FAST),
        init_sequence: EPD_3IN7_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
    ModelConfig {
        model_name: "epd_2in9_v2",
        width: 128,
        height: 296,
        pixel_format: FormatName::Mono,
        busy_polarity: BusyPolarity::ActiveHigh,
        reset_timing: ResetTiming { pre_ms: 20, low_ms: 2, post_ms: 20 },
        display_cmd: 0x24,
        display_cmd_2: 0x00,
        capabilities: Capabilities(capability::PARTIAL | capability::FAST | capability::REGIONAL),
        init_sequence: EPD_2IN9_V2_INIT,
        init_fast_sequence: None,
        init_partial_sequence: None,
        sleep_cmd: 0x10,
        sleep_data: 0x01,
    },
];

/// Tier 2 overrides: at most a handful of models in this table need one.
/// `epd_5in65f`'s controller needs its sleep sequence preceded by a
/// dedicated power-off command the generic interpreter doesn't know about
/// (grounded in the `melastmohican-adafruit-feather-thinkink` ACeP
/// power-down idiom), so it gets a `post_display` hook instead of forcing
/// every model through a 7-color-specific generic path. `epd_4in2b_v2` and
/// `epd_7in5_v2` need a dual-buffer / regional write path respectively,
/// neither of which the generic interpreter can express model-independently.
pub static OVERRIDES: &[OverrideEntry] = &[
    OverrideEntry {
        model_name: "epd_5in65f",
        entry: DriverEntry {
            custom_init: None,
            custom_display: None,
            custom_display_dual: None,
            custom_display_region: None,
            pre_display: None,
            post_display: Some(acep_post_display),
        },
    },
    OverrideEntry {
        model_name: "epd_4in2b_v2",
        entry: DriverEntry {
            custom_init: None,
            custom_display: None,
            custom_display_dual: Some(bwr_display_dual),
            custom_display_region: None,
            pre_display: None,
            post_display: None,
        },
    },
    OverrideEntry {
        model_name: "epd_7in5_v2",
        entry: DriverEntry {
            custom_init: None,
            custom_display: None,
            custom_display_dual: None,
            custom_display_region: Some(ssd1683_display_region),
            pre_display: None,
            post_display: None,
        },
    },
];

fn acep_post_display(
    config: &ModelConfig,
    io: &mut dyn crate::device::DeviceIo,
) -> Result<(), crate::error::ChromaError> {
    io.send_command(0x65)?; // ACeP: "power off sequence setting"
    io.send_data(0x00)?;
    io.send_data(0x00)?;
    let _ = config;
    Ok(())
}

/// Black/white/red panels have no single "write buffer" command: the
/// black plane goes out under `display_cmd` (0x10), the red/yellow plane
/// under `display_cmd_2` (0x13). Both must be written before the shared
/// refresh trigger, so this can't be expressed as two generic `display`
/// calls.
fn bwr_display_dual(
    config: &ModelConfig,
    primary: &Framebuffer,
    secondary: &Framebuffer,
    io: &mut dyn crate::device::DeviceIo,
) -> Result<(), crate::error::ChromaError> {
    io.send_command(config.display_cmd)?;
    io.send_data_bulk(primary.bytes())?;
    io.send_command(config.display_cmd_2)?;
    io.send_data_bulk(secondary.bytes())?;
    io.send_command(0x12)?; // display refresh
    io.wait_busy(config.busy_polarity, io.default_busy_timeout_ms())?;
    Ok(())
}

/// Writes just the aligned sub-rectangle of `buffer` to the panel: sets the
/// controller's RAM window/cursor to the region, slices the matching rows
/// out of the full mono buffer (stride is the panel's own row-byte count,
/// not the region's), and triggers a refresh scoped to that window.
fn ssd1683_display_region(
    config: &ModelConfig,
    buffer: &Framebuffer,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    io: &mut dyn crate::device::DeviceIo,
) -> Result<(), crate::error::ChromaError> {
    let full_row_bytes = (config.width as u32 + 7) / 8;
    let region_row_bytes = width / 8;
    let x_byte0 = (x / 8) as usize;
    let bytes = buffer.bytes();
    let mut region = Vec::with_capacity(region_row_bytes as usize * height as usize);
    for row in 0..height {
        let row_start = (y + row) as usize * full_row_bytes as usize + x_byte0;
        region.extend_from_slice(&bytes[row_start..row_start + region_row_bytes as usize]);
    }

    bytecode::send_window(io, x as u16, y as u16, (x + width) as u16, (y + height) as u16)?;
    bytecode::send_cursor(io, x as u16, y as u16)?;
    io.send_command(config.display_cmd)?;
    io.send_data_bulk(&region)?;
    io.send_command(0x22)?; // DISPLAY_UPDATE_CONTROL_2, partial-window mode
    io.send_data(0xFF)?;
    io.send_command(0x20)?; // MASTER_ACTIVATION
    io.wait_busy(config.busy_polarity, io.default_busy_timeout_ms())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_decode_expected_bits() {
        let caps = Capabilities(capability::PARTIAL | capability::FAST);
        assert!(caps.has_partial_refresh());
        assert!(caps.has_fast_refresh());
        assert!(!caps.has_grayscale());
        assert!(!caps.has_dual_buffer());
        assert!(!caps.has_regional_refresh());
    }

    #[test]
    fn model_names_are_unique_and_lowercase() {
        let mut seen = std::collections::HashSet::new();
        for m in TABLE.iter() {
            assert_eq!(m.model_name, m.model_name.to_ascii_lowercase());
            assert!(seen.insert(m.model_name), "duplicate model name {}", m.model_name);
        }
    }

    #[test]
    fn dual_buffer_model_is_color4() {
        let m = TABLE.iter().find(|m| m.model_name == "epd_4in2b_v2").unwrap();
        assert!(m.capabilities.has_dual_buffer());
        assert_eq!(m.pixel_format, FormatName::Color4);
    }
}
