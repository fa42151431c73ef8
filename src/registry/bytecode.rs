//! Init/display bytecode interpreter.
//!
//! The offline extraction toolchain reduces ~70 distinct vendor init
//! sequences to one opcode table; `generic_init`/`generic_display`/
//! `generic_sleep` are the one interpreter that replaces that duplication.
//! Controller command bytes baked into the generic paths below (cursor/
//! window-set, RAM-counter, and refresh-trigger commands) follow the
//! SSD16xx family's command set, the one shared by the large majority of
//! Waveshare's mono/gray4/color4 panels — see DESIGN.md for the grounding
//! and for models needing a different family, which attach a Tier 2
//! `custom_init`/`custom_display` override instead.

use crate::device::DeviceIo;
use crate::error::ChromaError;

use super::models::ModelConfig;

pub const OP_SET_CURSOR: u8 = 0xF9;
pub const OP_SET_WINDOW: u8 = 0xFA;
pub const OP_SW_RESET: u8 = 0xFB;
pub const OP_HW_RESET: u8 = 0xFC;
pub const OP_DELAY_MS: u8 = 0xFD;
pub const OP_END: u8 = 0xFE;
pub const OP_WAIT_BUSY: u8 = 0xFF;

/// SSD16xx-family command bytes used by the generic interpreter (see
/// module doc and DESIGN.md).
mod cmd {
    pub const SW_RESET: u8 = 0x12;
    pub const SET_RAM_X_RANGE: u8 = 0x44;
    pub const SET_RAM_Y_RANGE: u8 = 0x45;
    pub const SET_RAM_X_COUNTER: u8 = 0x4E;
    pub const SET_RAM_Y_COUNTER: u8 = 0x4F;
    pub const DISPLAY_UPDATE_CONTROL_2: u8 = 0x22;
    pub const MASTER_ACTIVATION: u8 = 0x20;
}

/// Which of the Tier 1 sequences to interpret (mirrors `Device`'s
/// `current_init_mode` field); `None` (Device has never been inited) isn't a
/// variant here — callers track that as `Option<InitMode>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    Full,
    Fast,
    Partial,
    /// No dedicated bytecode sequence exists for grayscale in the Tier 1
    /// binary shape (only init/init_fast/init_partial are represented);
    /// the generic interpreter falls back to the full sequence for
    /// grayscale-capable models unless a Tier 2 `custom_init` exists. See
    /// DESIGN.md's resolution of this open question.
    Grayscale,
}

fn sequence_for<'a>(config: &'a ModelConfig, mode: InitMode) -> &'a [u8] {
    match mode {
        InitMode::Full => config.init_sequence,
        InitMode::Fast => config.init_fast_sequence.unwrap_or(config.init_sequence),
        InitMode::Partial => config.init_partial_sequence.unwrap_or(config.init_sequence),
        InitMode::Grayscale => config.init_sequence,
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, ChromaError> {
    let slice = bytes
        .get(offset..offset + 2)
        .ok_or(ChromaError::BadBytecode { opcode: OP_SET_CURSOR })?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

/// Sends the SSD16xx cursor-set command pair.
pub(crate) fn send_cursor(io: &mut dyn DeviceIo, x: u16, y: u16) -> Result<(), ChromaError> {
    io.send_command(cmd::SET_RAM_X_COUNTER)?;
    io.send_data((x / 8) as u8)?;
    io.send_command(cmd::SET_RAM_Y_COUNTER)?;
    io.send_data((y & 0xFF) as u8)?;
    io.send_data((y >> 8) as u8)?;
    Ok(())
}

/// Sends the SSD16xx window-set command triple.
pub(crate) fn send_window(io: &mut dyn DeviceIo, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), ChromaError> {
    io.send_command(cmd::SET_RAM_X_RANGE)?;
    io.send_data((x0 / 8) as u8)?;
    io.send_data((x1 / 8) as u8)?;
    io.send_command(cmd::SET_RAM_Y_RANGE)?;
    io.send_data((y0 & 0xFF) as u8)?;
    io.send_data((y0 >> 8) as u8)?;
    io.send_data((y1 & 0xFF) as u8)?;
    io.send_data((y1 >> 8) as u8)?;
    Ok(())
}

/// Interprets `config`'s bytecode sequence for `mode`.
pub fn generic_init(config: &ModelConfig, mode: InitMode, io: &mut dyn DeviceIo) -> Result<(), ChromaError> {
    interpret(sequence_for(config, mode), config, io)
}

/// The interpreter core, factored out so it can run against an arbitrary
/// byte slice (used by this module's malformed-bytecode test) as well as
/// against a `ModelConfig`'s own declared sequences.
fn interpret(seq: &[u8], config: &ModelConfig, io: &mut dyn DeviceIo) -> Result<(), ChromaError> {
    let mut pc = 0usize;
    while pc < seq.len() {
        let op = seq[pc];
        pc += 1;
        match op {
            OP_SET_CURSOR => {
                let x = read_u16_le(seq, pc)?;
                let y = read_u16_le(seq, pc + 2)?;
                pc += 4;
                send_cursor(io, x, y)?;
            }
            OP_SET_WINDOW => {
                let x0 = read_u16_le(seq, pc)?;
                let y0 = read_u16_le(seq, pc + 2)?;
                let x1 = read_u16_le(seq, pc + 4)?;
                let y1 = read_u16_le(seq, pc + 6)?;
                pc += 8;
                send_window(io, x0, y0, x1, y1)?;
            }
            OP_SW_RESET => {
                io.send_command(cmd::SW_RESET)?;
                io.wait_busy(config.busy_polarity, io.default_busy_timeout_ms())?;
            }
            OP_HW_RESET => {
                io.reset(config.reset_timing)?;
            }
            OP_DELAY_MS => {
                let ms = read_u16_le(seq, pc)?;
                pc += 2;
                io.delay_ms(ms as u32);
            }
            OP_END => return Ok(()),
            OP_WAIT_BUSY => {
                io.wait_busy(config.busy_polarity, io.default_busy_timeout_ms())?;
            }
            implicit if implicit <= 0xF8 => {
                let len = *seq.get(pc).ok_or(ChromaError::BadBytecode { opcode: implicit })? as usize;
                pc += 1;
                let data = seq
                    .get(pc..pc + len)
                    .ok_or(ChromaError::BadBytecode { opcode: implicit })?;
                pc += len;
                io.send_command(implicit)?;
                if !data.is_empty() {
                    io.send_data_bulk(data)?;
                }
            }
            other => return Err(ChromaError::BadBytecode { opcode: other }),
        }
    }
    Ok(())
}

/// `display_cmd` + bulk buffer + optional `display_cmd_2` + refresh trigger.
/// The refresh-trigger sequence (`DISPLAY_UPDATE_CONTROL_2`
/// + `MASTER_ACTIVATION` + `WAIT_BUSY`) is the SSD16xx family's standard
/// "commit RAM to panel" idiom; models whose controller needs something
/// else supply a Tier 2 `custom_display`.
pub fn generic_display(config: &ModelConfig, buffer: &[u8], io: &mut dyn DeviceIo) -> Result<(), ChromaError> {
    io.send_command(config.display_cmd)?;
    io.send_data_bulk(buffer)?;
    if config.display_cmd_2 != 0 {
        // `display_cmd_2`'s single data byte is model-specific (a LUT/mode
        // selector on some controllers, unused on most) and isn't derivable
        // generically; send a fixed 0x00 placeholder here and expect models
        // that need a real value to supply `custom_display` instead.
        io.send_command(config.display_cmd_2)?;
        io.send_data(0x00)?;
    }
    io.send_command(cmd::DISPLAY_UPDATE_CONTROL_2)?;
    io.send_data(0xF7)?;
    io.send_command(cmd::MASTER_ACTIVATION)?;
    io.wait_busy(config.busy_polarity, io.default_busy_timeout_ms())?;
    Ok(())
}

/// `sleep_cmd` + `sleep_data`.
pub fn generic_sleep(config: &ModelConfig, io: &mut dyn DeviceIo) -> Result<(), ChromaError> {
    io.send_command(config.sleep_cmd)?;
    io.send_data(config.sleep_data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockHal;
    use crate::registry;

    #[test]
    fn full_init_sequence_ends_cleanly() {
        let config = registry::lookup("epd_2in13_v4").unwrap();
        let hal = MockHal::new();
        let handle = hal.handle();
        handle.set_default_busy_level(match config.busy_polarity {
            super::super::models::BusyPolarity::ActiveHigh => false,
            super::super::models::BusyPolarity::ActiveLow => true,
        });
        let mut device = crate::device::Device::open_with_hal(
            "epd_2in13_v4",
            hal,
            crate::config::ConfigSettings::default(),
        )
        .unwrap();
        device.init(InitMode::Full).unwrap();
        assert!(!handle.transcript().is_empty());
    }

    #[test]
    fn malformed_sequence_fails_bad_bytecode_not_panic() {
        let config = registry::lookup("epd_2in13_v4").unwrap();
        let hal = MockHal::new();
        let handle = hal.handle();
        handle.set_default_busy_level(true);
        let mut device = crate::device::Device::open_with_hal(
            "epd_2in13_v4",
            hal,
            crate::config::ConfigSettings::default(),
        )
        .unwrap();
        // command 0x01 claims 255 data bytes but none remain.
        let broken: &[u8] = &[0x01, 0xFF];
        let result = device.synchronize(|io| interpret(broken, config, io));
        assert!(matches!(result, Err(ChromaError::BadBytecode { .. })));
    }

    #[test]
    fn end_opcode_stops_interpretation_early() {
        let config = registry::lookup("epd_2in13_v4").unwrap();
        let hal = MockHal::new();
        let handle = hal.handle();
        handle.set_default_busy_level(true);
        let mut device = crate::device::Device::open_with_hal(
            "epd_2in13_v4",
            hal,
            crate::config::ConfigSettings::default(),
        )
        .unwrap();
        // END immediately, followed by a byte that would otherwise fail.
        let seq: &[u8] = &[OP_END, 0xFF];
        device.synchronize(|io| interpret(seq, config, io)).unwrap();
    }
}
