//! Hardware-abstraction trait boundary.
//!
//! `Device` is generic over `Hal` so the same busy-wait state machine and
//! bytecode interpreter run unchanged against real silicon or the
//! `mock` recorder.

pub mod mock;
#[cfg(feature = "linux-hal")]
pub mod linux;

/// The reset (RST) output pin.
pub trait GpioPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// The busy/ready input pin. Takes `&mut self`: `embedded-hal` 1.0's
/// `InputPin::is_high` does too, since some backends (e.g. `CdevPin`) need a
/// mutable borrow to read the line.
pub trait BusyPin {
    fn is_high(&mut self) -> bool;
}

/// Command/data framing over SPI: DC low for a command byte, DC high for
/// data; CS asserted for the duration of the byte group.
///
/// Fallible, unlike `GpioPin`/`BusyPin`: SPI transfers are the one HAL
/// surface the error taxonomy gives a dedicated variant to (`SpiError`),
/// since a bus fault mid-transfer is the one hardware failure mode `Device`
/// must be able to report distinctly from a plain busy-timeout.
pub trait SpiBus {
    fn write_command(&mut self, byte: u8) -> Result<(), crate::error::ChromaError>;
    fn write_data(&mut self, byte: u8) -> Result<(), crate::error::ChromaError>;
    fn write_data_bulk(&mut self, data: &[u8]) -> Result<(), crate::error::ChromaError>;
}

/// One display's full set of HAL handles.
pub trait Hal {
    type Reset: GpioPin;
    type Busy: BusyPin;
    type Bus: SpiBus;

    fn reset_pin(&mut self) -> &mut Self::Reset;
    fn busy_pin(&mut self) -> &mut Self::Busy;
    fn bus(&mut self) -> &mut Self::Bus;

    /// Sleeps the calling thread for `ms` milliseconds. A plain blocking
    /// sleep is fine here even though `wait_busy` calls it from inside
    /// `Device::synchronize`'s held mutex: the lock only ever guards one
    /// `Device`'s own state, so blocking here blocks nothing but that
    /// device's next call, not some other thread's unrelated work.
    fn delay_ms(&self, ms: u32);
}
