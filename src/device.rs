//! Hardware lifecycle: busy-wait state machine + I/O primitives. `Device<H>`
//! owns one HAL instance behind a mutex held only for the duration of one
//! `synchronize` call — not across the whole object's lifetime — so
//! `wait_busy`'s sleeps never block an unrelated caller waiting on, say,
//! `Device::close`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::ConfigSettings;
use crate::error::ChromaError;
use crate::hal::Hal;
use crate::pixel::Framebuffer;
use crate::registry::bytecode::{self, InitMode};
use crate::registry::models::{BusyPolarity, ModelConfig, ResetTiming};
use crate::registry::{self, DriverEntry};

/// Object-safe facade the bytecode interpreter and Tier 2 driver hooks
/// operate against. `DriverEntry`'s fields are plain `'static fn` pointers
/// and so cannot be generic over `H: Hal`; this trait is the seam that lets
/// both sides stay ignorant of which concrete HAL backend is in use.
pub trait DeviceIo {
    fn model_name(&self) -> &str;
    fn reset(&mut self, timing: ResetTiming) -> Result<(), ChromaError>;
    fn send_command(&mut self, byte: u8) -> Result<(), ChromaError>;
    fn send_data(&mut self, byte: u8) -> Result<(), ChromaError>;
    fn send_data_bulk(&mut self, data: &[u8]) -> Result<(), ChromaError>;
    fn delay_ms(&mut self, ms: u32);
    fn wait_busy(&mut self, polarity: BusyPolarity, timeout_ms: u32) -> Result<(), ChromaError>;
    /// The caller-configured default, since `ModelConfig` carries no timeout
    /// field of its own — it's pure per-model data; the default busy timeout
    /// is a `ConfigSettings`/`Device` concern.
    fn default_busy_timeout_ms(&self) -> u32;
}

struct Inner<H: Hal> {
    hal: H,
    open: bool,
    current_init_mode: Option<InitMode>,
}

/// A runtime-selected driver instance bound to one `ModelConfig` and one HAL
/// backend.
pub struct Device<H: Hal> {
    model: &'static ModelConfig,
    overrides: Option<&'static DriverEntry>,
    config: ConfigSettings,
    cancel: Arc<AtomicBool>,
    inner: Mutex<Inner<H>>,
}

impl<H: Hal> Device<H> {
    /// Resolves `model_name` against the Tier 1/Tier 2 registry and binds it
    /// to `hal`. Fails with `ModelNotFound` (carrying up to 3
    /// Levenshtein-closest suggestions) if the name isn't in the table.
    pub fn open_with_hal(model_name: &str, hal: H, config: ConfigSettings) -> Result<Self, ChromaError> {
        let model = registry::resolve(model_name)?;
        let overrides = registry::overrides(model_name);
        tracing::info!(model = model_name, "device opened");
        Ok(Device {
            model,
            overrides,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(Inner {
                hal,
                open: true,
                current_init_mode: None,
            }),
        })
    }

    pub fn model(&self) -> &'static ModelConfig {
        self.model
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().expect("device mutex poisoned").open
    }

    /// A cloneable flag `wait_busy` polls each tick; settable from another
    /// thread without taking the device mutex, so a caller can cancel a
    /// long busy-wait without blocking behind it.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Idempotent; never fails. Does not power down the panel — pair with
    /// `deep_sleep` first if that matters to the caller.
    pub fn close(&self) {
        self.inner.lock().expect("device mutex poisoned").open = false;
        tracing::info!(model = self.model.model_name, "device closed");
    }

    /// Runs `f` against this device's HAL under the mutex, resetting the
    /// cancellation flag first — cancellation is scoped to one call. Returns
    /// `DeviceClosed` without touching the HAL if `close` was already
    /// called.
    pub fn synchronize<F, R>(&self, f: F) -> Result<R, ChromaError>
    where
        F: FnOnce(&mut dyn DeviceIo) -> Result<R, ChromaError>,
    {
        let mut inner = self.inner.lock().expect("device mutex poisoned");
        if !inner.open {
            return Err(ChromaError::DeviceClosed {
                model: self.model.model_name.to_string(),
            });
        }
        self.cancel.store(false, Ordering::SeqCst);
        let mut ctx = IoCtx {
            hal: &mut inner.hal,
            model_name: self.model.model_name,
            config: self.config,
            cancel: &self.cancel,
        };
        f(&mut ctx)
    }

    /// Runs the model's init sequence for `mode`, preferring a Tier 2
    /// `custom_init` override over the generic bytecode interpreter. A
    /// no-op if `mode` already matches the last successful init (tracked in
    /// `current_init_mode`).
    pub fn init(&mut self, mode: InitMode) -> Result<(), ChromaError> {
        {
            let inner = self.inner.lock().expect("device mutex poisoned");
            if inner.current_init_mode == Some(mode) {
                return Ok(());
            }
        }
        let model = self.model;
        let overrides = self.overrides;
        self.synchronize(|io| match overrides.and_then(|o| o.custom_init) {
            Some(custom) => custom(model, mode, io),
            None => bytecode::generic_init(model, mode, io),
        })?;
        self.inner.lock().expect("device mutex poisoned").current_init_mode = Some(mode);
        tracing::info!(model = model.model_name, mode = ?mode, "device initialized");
        Ok(())
    }

    /// Writes `buffer` and triggers a refresh, preferring `custom_display`
    /// over the generic path, with `pre_display`/`post_display` hooks
    /// bracketing either.
    pub fn display(&mut self, buffer: &Framebuffer) -> Result<(), ChromaError> {
        let model = self.model;
        let overrides = self.overrides;
        self.synchronize(|io| {
            if let Some(pre) = overrides.and_then(|o| o.pre_display) {
                pre(model, io)?;
            }
            match overrides.and_then(|o| o.custom_display) {
                Some(custom) => custom(model, buffer, io)?,
                None => bytecode::generic_display(model, buffer.bytes(), io)?,
            }
            if let Some(post) = overrides.and_then(|o| o.post_display) {
                post(model, io)?;
            }
            Ok(())
        })
    }

    /// Dual-buffer display. Requires a Tier 2 `custom_display_dual`
    /// override — the generic interpreter has no model-independent way to
    /// route two buffers onto one controller's command set, since which
    /// command carries which buffer is itself model-specific.
    pub fn display_dual(&mut self, primary: &Framebuffer, secondary: &Framebuffer) -> Result<(), ChromaError> {
        let model = self.model;
        let overrides = self.overrides;
        let custom = overrides.and_then(|o| o.custom_display_dual).ok_or_else(|| {
            ChromaError::UnsupportedFormat {
                operation: "display_dual".to_string(),
                required: "a model with a custom_display_dual override".to_string(),
                actual: model.model_name.to_string(),
            }
        })?;
        self.synchronize(|io| {
            if let Some(pre) = overrides.and_then(|o| o.pre_display) {
                pre(model, io)?;
            }
            custom(model, primary, secondary, io)?;
            if let Some(post) = overrides.and_then(|o| o.post_display) {
                post(model, io)?;
            }
            Ok(())
        })
    }

    /// Regional refresh. `x` is auto-aligned down to a multiple of 8 and
    /// `width` rounded up to the next multiple of 8, matching the
    /// byte-per-8-pixels granularity of the underlying RAM-counter commands.
    pub fn display_region(
        &mut self,
        buffer: &Framebuffer,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), ChromaError> {
        let model = self.model;
        let overrides = self.overrides;
        let aligned_x = x - (x % 8);
        let aligned_width = ((width + (x - aligned_x) + 7) / 8) * 8;
        let custom = overrides.and_then(|o| o.custom_display_region).ok_or_else(|| {
            ChromaError::UnsupportedFormat {
                operation: "display_region".to_string(),
                required: "a model with a custom_display_region override".to_string(),
                actual: model.model_name.to_string(),
            }
        })?;
        self.synchronize(|io| {
            if let Some(pre) = overrides.and_then(|o| o.pre_display) {
                pre(model, io)?;
            }
            custom(model, buffer, aligned_x, y, aligned_width, height, io)?;
            if let Some(post) = overrides.and_then(|o| o.post_display) {
                post(model, io)?;
            }
            Ok(())
        })
    }

    /// Puts the panel in deep sleep and invalidates the init mode cache, so
    /// the next `display` call re-runs a full init.
    pub fn deep_sleep(&mut self) -> Result<(), ChromaError> {
        let model = self.model;
        self.synchronize(|io| bytecode::generic_sleep(model, io))?;
        self.inner.lock().expect("device mutex poisoned").current_init_mode = None;
        tracing::info!(model = model.model_name, "device put to sleep");
        Ok(())
    }
}

/// `DeviceIo` implementation bound to one `synchronize` call's HAL borrow.
struct IoCtx<'a, H: Hal> {
    hal: &'a mut H,
    model_name: &'static str,
    config: ConfigSettings,
    cancel: &'a AtomicBool,
}

impl<'a, H: Hal> DeviceIo for IoCtx<'a, H> {
    fn model_name(&self) -> &str {
        self.model_name
    }

    /// Active-high reset pulse: high, low for `low_ms`, back high, settle
    /// for `post_ms`. `pre_ms` covers the time the line sits high before the
    /// pulse, matching SSD16xx-family datasheets' recommended reset framing.
    fn reset(&mut self, timing: ResetTiming) -> Result<(), ChromaError> {
        self.hal.reset_pin().set_high();
        self.hal.delay_ms(timing.pre_ms as u32);
        self.hal.reset_pin().set_low();
        self.hal.delay_ms(timing.low_ms as u32);
        self.hal.reset_pin().set_high();
        self.hal.delay_ms(timing.post_ms as u32);
        Ok(())
    }

    fn send_command(&mut self, byte: u8) -> Result<(), ChromaError> {
        tracing::debug!(model = self.model_name, byte = format!("{byte:#04x}"), "command");
        self.hal.bus().write_command(byte)
    }

    fn send_data(&mut self, byte: u8) -> Result<(), ChromaError> {
        self.hal.bus().write_data(byte)
    }

    fn send_data_bulk(&mut self, data: &[u8]) -> Result<(), ChromaError> {
        tracing::trace!(model = self.model_name, len = data.len(), "data bulk");
        self.hal.bus().write_data_bulk(data)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.hal.delay_ms(ms);
    }

    /// Polls `busy_pin` every `busy_poll_interval_ms` until it reports the
    /// non-busy level, `timeout_ms` elapses, or cancellation is requested.
    fn wait_busy(&mut self, polarity: BusyPolarity, timeout_ms: u32) -> Result<(), ChromaError> {
        let busy_level = matches!(polarity, BusyPolarity::ActiveHigh);
        let tick_ms = self.config.busy_poll_interval_ms.max(1);
        let mut waited_ms: u32 = 0;
        loop {
            if self.hal.busy_pin().is_high() != busy_level {
                return Ok(());
            }
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!(model = self.model_name, "busy-wait cancelled");
                return Err(ChromaError::Cancelled {
                    model: self.model_name.to_string(),
                });
            }
            if waited_ms >= timeout_ms {
                tracing::warn!(model = self.model_name, timeout_ms, "busy-wait timed out");
                return Err(ChromaError::BusyTimeout {
                    model: self.model_name.to_string(),
                    timeout_ms,
                });
            }
            self.hal.delay_ms(tick_ms);
            waited_ms = waited_ms.saturating_add(tick_ms);
        }
    }

    fn default_busy_timeout_ms(&self) -> u32 {
        self.config.default_busy_timeout_ms
    }
}
