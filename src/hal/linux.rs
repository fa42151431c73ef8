//! Real backend for Linux single-board computers (feature `linux-hal`),
//! built on `linux-embedded-hal`'s `Spidev` + `CdevPin`.

use embedded_hal::digital::{InputPin, OutputPin};
use linux_embedded_hal::{CdevPin, SpidevDevice};

use super::{BusyPin, GpioPin, Hal, SpiBus};
use crate::error::ChromaError;

pub struct LinuxResetPin {
    pin: CdevPin,
}

impl GpioPin for LinuxResetPin {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
    }
}

pub struct LinuxBusyPin {
    pin: CdevPin,
}

impl BusyPin for LinuxBusyPin {
    fn is_high(&mut self) -> bool {
        self.pin.is_high().unwrap_or(false)
    }
}

pub struct LinuxBus {
    spi: SpidevDevice,
}

impl SpiBus for LinuxBus {
    fn write_command(&mut self, byte: u8) -> Result<(), ChromaError> {
        self.transfer(&[byte])
    }

    fn write_data(&mut self, byte: u8) -> Result<(), ChromaError> {
        self.transfer(&[byte])
    }

    fn write_data_bulk(&mut self, data: &[u8]) -> Result<(), ChromaError> {
        self.transfer(data)
    }
}

impl LinuxBus {
    fn transfer(&mut self, bytes: &[u8]) -> Result<(), ChromaError> {
        embedded_hal::spi::SpiBus::write(&mut self.spi, bytes).map_err(|e| ChromaError::SpiError {
            model: "linux-hal".to_string(),
            reason: e.to_string(),
        })
    }
}

/// The real HAL for the family of Raspberry-Pi-class SBCs this crate
/// targets. The command/data D/C line is a separate GPIO, toggled around each SPI
/// transfer at the call sites in `Device`, not modeled inside `LinuxBus`
/// itself — `LinuxBus` only ever sees raw bytes, matching `SpiBus`'s
/// narrow contract.
pub struct LinuxHal {
    reset: LinuxResetPin,
    busy: LinuxBusyPin,
    bus: LinuxBus,
}

impl LinuxHal {
    /// Opens the SPI device node and the two GPIO lines. `spi_path` is
    /// typically `/dev/spidev0.0`; `reset_line`/`busy_line` are offsets on
    /// `gpio_chip` (typically `/dev/gpiochip0`).
    pub fn open(
        spi_path: &str,
        gpio_chip: &str,
        reset_line: u32,
        busy_line: u32,
    ) -> Result<Self, ChromaError> {
        let spi = SpidevDevice::open(spi_path).map_err(|e| ChromaError::InitError {
            model: "linux-hal".to_string(),
            reason: format!("failed to open {spi_path}: {e}"),
        })?;

        let chip = gpio_cdev::Chip::new(gpio_chip).map_err(|e| ChromaError::InitError {
            model: "linux-hal".to_string(),
            reason: format!("failed to open {gpio_chip}: {e}"),
        })?;
        let reset_pin = open_output_line(chip, reset_line, "chromawave-reset")?;

        let mut chip = gpio_cdev::Chip::new(gpio_chip).map_err(|e| ChromaError::InitError {
            model: "linux-hal".to_string(),
            reason: format!("failed to open {gpio_chip}: {e}"),
        })?;
        let busy_pin = open_input_line(&mut chip, busy_line, "chromawave-busy")?;

        Ok(LinuxHal {
            reset: LinuxResetPin { pin: reset_pin },
            busy: LinuxBusyPin { pin: busy_pin },
            bus: LinuxBus { spi },
        })
    }
}

fn open_output_line(
    mut chip: gpio_cdev::Chip,
    line: u32,
    consumer: &str,
) -> Result<CdevPin, ChromaError> {
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(gpio_cdev::LineRequestFlags::OUTPUT, 0, consumer))
        .map_err(|e| ChromaError::InitError {
            model: "linux-hal".to_string(),
            reason: format!("failed to request gpio line {line}: {e}"),
        })?;
    CdevPin::new(handle).map_err(|e| ChromaError::InitError {
        model: "linux-hal".to_string(),
        reason: format!("failed to wrap gpio line {line}: {e}"),
    })
}

fn open_input_line(
    chip: &mut gpio_cdev::Chip,
    line: u32,
    consumer: &str,
) -> Result<CdevPin, ChromaError> {
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(gpio_cdev::LineRequestFlags::INPUT, 0, consumer))
        .map_err(|e| ChromaError::InitError {
            model: "linux-hal".to_string(),
            reason: format!("failed to request gpio line {line}: {e}"),
        })?;
    CdevPin::new(handle).map_err(|e| ChromaError::InitError {
        model: "linux-hal".to_string(),
        reason: format!("failed to wrap gpio line {line}: {e}"),
    })
}

impl Hal for LinuxHal {
    type Reset = LinuxResetPin;
    type Busy = LinuxBusyPin;
    type Bus = LinuxBus;

    fn reset_pin(&mut self) -> &mut LinuxResetPin {
        &mut self.reset
    }

    fn busy_pin(&mut self) -> &mut LinuxBusyPin {
        &mut self.busy
    }

    fn bus(&mut self) -> &mut LinuxBus {
        &mut self.bus
    }

    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
