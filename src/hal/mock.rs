//! Recording fake HAL used by this crate's own test suite and available to
//! downstream crates for hardware-free testing.
//!
//! Not `#[cfg(test)]`-gated: `MockHal` is part of the public API surface.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{BusyPin, GpioPin, Hal, SpiBus};
use crate::error::ChromaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Command(u8),
    Data(u8),
    DataBulk(Vec<u8>),
}

#[derive(Default)]
struct State {
    reset_events: Vec<PinEvent>,
    bus_events: Vec<BusEvent>,
    delay_log: Vec<u32>,
    busy_levels: VecDeque<bool>,
    default_busy_level: bool,
}

pub struct MockResetPin {
    state: Rc<RefCell<State>>,
}

impl GpioPin for MockResetPin {
    fn set_high(&mut self) {
        self.state.borrow_mut().reset_events.push(PinEvent::High);
    }

    fn set_low(&mut self) {
        self.state.borrow_mut().reset_events.push(PinEvent::Low);
    }
}

pub struct MockBusyPin {
    state: Rc<RefCell<State>>,
}

impl BusyPin for MockBusyPin {
    /// Pops the next scripted level; once the queue is drained, returns
    /// the sticky `default_busy_level` forever.
    fn is_high(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        state
            .busy_levels
            .pop_front()
            .unwrap_or(state.default_busy_level)
    }
}

pub struct MockBus {
    state: Rc<RefCell<State>>,
}

impl SpiBus for MockBus {
    fn write_command(&mut self, byte: u8) -> Result<(), ChromaError> {
        self.state.borrow_mut().bus_events.push(BusEvent::Command(byte));
        Ok(())
    }

    fn write_data(&mut self, byte: u8) -> Result<(), ChromaError> {
        self.state.borrow_mut().bus_events.push(BusEvent::Data(byte));
        Ok(())
    }

    fn write_data_bulk(&mut self, data: &[u8]) -> Result<(), ChromaError> {
        self.state
            .borrow_mut()
            .bus_events
            .push(BusEvent::DataBulk(data.to_vec()));
        Ok(())
    }
}

/// A `Vec`-backed fake HAL. Construct with [`MockHal::new`],
/// grab a [`MockHandle`] for post-hoc assertions, then hand the `MockHal`
/// itself to `Device::open_with_hal`.
pub struct MockHal {
    reset: MockResetPin,
    busy: MockBusyPin,
    bus: MockBus,
    state: Rc<RefCell<State>>,
}

impl MockHal {
    pub fn new() -> Self {
        let state = Rc::new(RefCell::new(State::default()));
        MockHal {
            reset: MockResetPin { state: state.clone() },
            busy: MockBusyPin { state: state.clone() },
            bus: MockBus { state: state.clone() },
            state,
        }
    }

    /// A cloned, independently-readable view onto this mock's recorded
    /// state. Take one of these before moving the `MockHal` into a
    /// `Device`.
    pub fn handle(&self) -> MockHandle {
        MockHandle { state: self.state.clone() }
    }
}

impl Default for MockHal {
    fn default() -> Self {
        MockHal::new()
    }
}

impl Hal for MockHal {
    type Reset = MockResetPin;
    type Busy = MockBusyPin;
    type Bus = MockBus;

    fn reset_pin(&mut self) -> &mut MockResetPin {
        &mut self.reset
    }

    fn busy_pin(&mut self) -> &mut MockBusyPin {
        &mut self.busy
    }

    fn bus(&mut self) -> &mut MockBus {
        &mut self.bus
    }

    fn delay_ms(&self, ms: u32) {
        self.state.borrow_mut().delay_log.push(ms);
    }
}

/// Read-only handle into a `MockHal`'s recorded transcript, independent of
/// the `MockHal`'s own lifetime once it has been moved into a `Device`.
#[derive(Clone)]
pub struct MockHandle {
    state: Rc<RefCell<State>>,
}

impl MockHandle {
    pub fn transcript(&self) -> Vec<BusEvent> {
        self.state.borrow().bus_events.clone()
    }

    pub fn reset_transcript(&self) -> Vec<PinEvent> {
        self.state.borrow().reset_events.clone()
    }

    pub fn delay_log(&self) -> Vec<u32> {
        self.state.borrow().delay_log.clone()
    }

    /// Pushes one scripted busy-pin level, consumed on the next `is_high`
    /// poll — drives `wait_busy` through ready/timed_out/cancelled without
    /// real hardware.
    pub fn push_busy_level(&self, high: bool) {
        self.state.borrow_mut().busy_levels.push_back(high);
    }

    pub fn push_busy_levels(&self, levels: impl IntoIterator<Item = bool>) {
        let mut state = self.state.borrow_mut();
        state.busy_levels.extend(levels);
    }

    /// Sets the level returned once the scripted queue is drained.
    pub fn set_default_busy_level(&self, high: bool) {
        self.state.borrow_mut().default_busy_level = high;
    }

    pub fn clear_transcript(&self) {
        let mut state = self.state.borrow_mut();
        state.bus_events.clear();
        state.reset_events.clear();
    }
}
