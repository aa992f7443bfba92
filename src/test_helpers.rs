use core::convert::Infallible;
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    vec::Vec,
};

use embassy_time::{Duration, Instant};
use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType, OutputPin},
};

use crate::{config::StatusSense, traits::Clock};

/// Simulated clock, only moving when the driver delays.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_us: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.now_us.get())
    }

    fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us.max(1));
    }
}

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_us(u64::from(ns).div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.advance_us(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance_us(u64::from(ms) * 1000);
    }
}

impl Clock for MockClock {
    fn now(&mut self) -> Instant {
        Instant::from_micros(self.now_us.get())
    }
}

#[derive(Debug, Default)]
struct SerialState {
    incoming: VecDeque<(u64, u8)>,
    written: Vec<u8>,
}

/// Serial transport replaying a script of incoming bytes, each released at
/// a given simulated time, and recording everything written to it.
#[derive(Debug, Clone)]
pub struct ScriptedSerial {
    clock: MockClock,
    state: Rc<RefCell<SerialState>>,
}

impl ScriptedSerial {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
            state: Rc::new(RefCell::new(SerialState::default())),
        }
    }

    /// Queue bytes that are available immediately.
    pub fn push(&self, bytes: &[u8]) {
        self.push_at(Duration::from_ticks(0), bytes);
    }

    /// Queue bytes that become available once the clock reaches `at`.
    pub fn push_at(&self, at: Duration, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        state
            .incoming
            .extend(bytes.iter().map(|b| (at.as_micros(), *b)));
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.state.borrow().written).into_owned()
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().incoming.len()
    }

    fn ready(&self) -> bool {
        let now = self.clock.now_us.get();
        self.state
            .borrow()
            .incoming
            .front()
            .map_or(false, |(at, _)| *at <= now)
    }
}

impl embedded_io::ErrorType for ScriptedSerial {
    type Error = Infallible;
}

impl embedded_io::Read for ScriptedSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() && self.ready() {
            if let Some((_, b)) = self.state.borrow_mut().incoming.pop_front() {
                buf[n] = b;
                n += 1;
            }
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for ScriptedSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.ready())
    }
}

impl embedded_io::Write for ScriptedSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.state.borrow_mut().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Output pin recording each transition with its simulated timestamp.
#[derive(Debug, Clone)]
pub struct MockPin {
    clock: MockClock,
    transitions: Rc<RefCell<Vec<(Duration, bool)>>>,
}

impl MockPin {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
            transitions: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn transitions(&self) -> Vec<(Duration, bool)> {
        self.transitions.borrow().clone()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.transitions
            .borrow_mut()
            .push((self.clock.elapsed(), false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.transitions
            .borrow_mut()
            .push((self.clock.elapsed(), true));
        Ok(())
    }
}

/// Status sense with a level settable from the test.
#[derive(Debug, Clone, Default)]
pub struct MockStatus {
    level: Rc<Cell<u16>>,
}

impl MockStatus {
    pub fn new(level: u16) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
        }
    }

    pub fn set(&self, level: u16) {
        self.level.set(level);
    }
}

impl StatusSense for MockStatus {
    type Error = Infallible;

    fn sample(&mut self) -> Result<u16, Self::Error> {
        Ok(self.level.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, ReadReady};

    #[test]
    fn scripted_bytes_follow_the_clock() {
        let mut clock = MockClock::new();
        let mut serial = ScriptedSerial::new(&clock);
        serial.push(b"A");
        serial.push_at(Duration::from_millis(5), b"B");

        let mut buf = [0u8; 4];
        assert_eq!(serial.read(&mut buf), Ok(1));
        assert_eq!(serial.read_ready(), Ok(false));

        clock.delay_ms(5);
        assert_eq!(serial.read_ready(), Ok(true));
        assert_eq!(serial.read(&mut buf), Ok(1));
        assert_eq!(buf[0], b'B');
    }
}
