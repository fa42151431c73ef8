//! Process-wide tunables.
//!
//! Mirrors the sibling editor crate's `core-config`: `serde` structs with
//! `#[serde(default)]` fields, loaded with `toml`, unknown keys ignored for
//! forward compatibility. Unlike that precedent there is no two-phase
//! context-apply step here — `ConfigSettings` is flat and fully resolved
//! the moment it is loaded.

use std::path::Path;

use serde::Deserialize;

/// Default timeout for `Device::wait_busy`.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 30_000;
/// Poll tick length for the busy-wait state machine.
pub const DEFAULT_BUSY_POLL_INTERVAL_MS: u32 = 10;
/// Minimum LRU capacity for `Palette::nearest_color`.
pub const DEFAULT_PALETTE_LRU_CAPACITY: usize = 256;
/// Advisory SPI clock, ~10 MHz.
pub const DEFAULT_SPI_HZ_HINT: u32 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSettings {
    pub default_busy_timeout_ms: u32,
    pub busy_poll_interval_ms: u32,
    pub palette_lru_capacity: usize,
    pub spi_hz_hint: u32,
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            default_busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            busy_poll_interval_ms: DEFAULT_BUSY_POLL_INTERVAL_MS,
            palette_lru_capacity: DEFAULT_PALETTE_LRU_CAPACITY,
            spi_hz_hint: DEFAULT_SPI_HZ_HINT,
        }
    }
}

/// On-disk shape of `chromawave.toml`. Every field optional; absent fields
/// fall back to `ConfigSettings::default()`.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    device: RawDeviceConfig,
}

#[derive(Debug, Deserialize, Default)]
struct RawDeviceConfig {
    #[serde(default)]
    default_busy_timeout_ms: Option<u32>,
    #[serde(default)]
    busy_poll_interval_ms: Option<u32>,
    #[serde(default)]
    palette_lru_capacity: Option<usize>,
    #[serde(default)]
    spi_hz_hint: Option<u32>,
}

impl ConfigSettings {
    /// Load settings from `path` (a `chromawave.toml`-shaped file), falling
    /// back to compiled defaults for any absent field. Never fails: a
    /// missing or malformed file logs a warning and yields defaults,
    /// because a config problem must never prevent a display from being
    /// usable.
    pub fn load(path: Option<&Path>) -> ConfigSettings {
        let Some(path) = path else {
            return ConfigSettings::default();
        };
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read chromawave.toml, using defaults");
                return ConfigSettings::default();
            }
        };
        let raw: RawConfig = match toml::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not parse chromawave.toml, using defaults");
                return ConfigSettings::default();
            }
        };
        let defaults = ConfigSettings::default();
        ConfigSettings {
            default_busy_timeout_ms: raw
                .device
                .default_busy_timeout_ms
                .unwrap_or(defaults.default_busy_timeout_ms),
            busy_poll_interval_ms: raw
                .device
                .busy_poll_interval_ms
                .unwrap_or(defaults.busy_poll_interval_ms),
            palette_lru_capacity: raw
                .device
                .palette_lru_capacity
                .unwrap_or(defaults.palette_lru_capacity),
            spi_hz_hint: raw.device.spi_hz_hint.unwrap_or(defaults.spi_hz_hint),
        }
    }

    /// Conventional lookup: `$XDG_CONFIG_HOME/chromawave/chromawave.toml`,
    /// falling back to `dirs::config_dir()`.
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|d| d.join("chromawave").join("chromawave.toml"))
    }
}
