//! Target recognition on the live modem byte stream.
//!
//! Replies are never buffered as a whole. Only the last few bytes are kept
//! in a small ring, which is compared against the expected token and the
//! `ERROR` marker after every byte. Memory use is constant no matter how much
//! output streams past, at the cost of not handling overlapping or
//! backtracking matches. AT replies are append only and the targets are
//! unambiguous suffixes, so this is sufficient.

use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{error::Error, serial::SerialPort, traits::Clock};

/// Literal that short-circuits any wait with [`Error::Modem`].
pub const ERROR_MARKER: &[u8] = b"ERROR";

/// Longest target the window can hold.
pub const MAX_TARGET_LEN: usize = 32;

/// Append-only accumulator for the bytes consumed while waiting.
pub trait Sink {
    fn accept(&mut self, byte: u8) -> Result<(), Error>;
}

impl<const N: usize> Sink for heapless::Vec<u8, N> {
    fn accept(&mut self, byte: u8) -> Result<(), Error> {
        self.push(byte).map_err(|_| Error::BufferFull)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Matched {
    Target,
    Error,
}

/// Ring of the most recently seen bytes, sized to the longer of the target
/// and the `ERROR` marker.
pub(crate) struct MatchWindow<'t> {
    target: &'t [u8],
    buf: [u8; MAX_TARGET_LEN],
    capacity: usize,
    pos: usize,
}

impl<'t> MatchWindow<'t> {
    pub(crate) fn new(target: &'t [u8]) -> Result<Self, Error> {
        if target.len() > MAX_TARGET_LEN {
            return Err(Error::CharacterLimitExceeded);
        }

        Ok(Self {
            target,
            buf: [0; MAX_TARGET_LEN],
            capacity: target.len().max(ERROR_MARKER.len()),
            pos: 0,
        })
    }

    /// Record one byte and test the window. The error marker is checked
    /// first and wins over a coincidental target match.
    pub(crate) fn push(&mut self, byte: u8) -> Option<Matched> {
        self.buf[self.pos % self.capacity] = byte;
        self.pos += 1;

        if self.ends_with(ERROR_MARKER) {
            Some(Matched::Error)
        } else if self.ends_with(self.target) {
            Some(Matched::Target)
        } else {
            None
        }
    }

    fn ends_with(&self, pattern: &[u8]) -> bool {
        let len = pattern.len();
        if len == 0 || self.pos < len {
            return false;
        }

        let start = self.pos - len;
        pattern
            .iter()
            .enumerate()
            .all(|(i, b)| self.buf[(start + i) % self.capacity] == *b)
    }
}

/// One wait for a target token on the transport.
pub(crate) struct StreamMatcher<'t> {
    target: &'t [u8],
    drop_eol: bool,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'t> StreamMatcher<'t> {
    pub(crate) fn new(target: &'t [u8], timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            target,
            drop_eol: false,
            timeout,
            poll_interval,
        }
    }

    /// Discard line endings immediately following a successful match.
    pub(crate) fn drop_eol(self, drop_eol: bool) -> Self {
        Self { drop_eol, ..self }
    }

    /// Consume bytes until the target is seen.
    ///
    /// Every consumed byte goes to `sink`, if any, before it is tested. The
    /// activity timer restarts on every received byte, so only silence longer
    /// than the timeout fails the wait.
    pub(crate) fn run<T, CLK>(
        &self,
        port: &mut SerialPort<T>,
        clock: &mut CLK,
        mut sink: Option<&mut dyn Sink>,
    ) -> Result<(), Error>
    where
        T: Read + Write + ReadReady,
        CLK: Clock,
    {
        let mut window = MatchWindow::new(self.target)?;
        let mut last_activity = clock.now();

        loop {
            if port.available()? {
                if let Some(byte) = port.read_byte()? {
                    last_activity = clock.now();

                    if let Some(sink) = sink.as_deref_mut() {
                        sink.accept(byte)?;
                    }

                    match window.push(byte) {
                        Some(Matched::Error) => {
                            debug!("Modem replied ERROR while waiting for {}", crate::fmt::lossy(self.target));
                            return Err(Error::Modem);
                        }
                        Some(Matched::Target) => {
                            if self.drop_eol {
                                port.drop_eol()?;
                            }
                            return Ok(());
                        }
                        None => continue,
                    }
                }
            }

            if clock.now().saturating_duration_since(last_activity) > self.timeout {
                warn!("Timed out waiting for {}", crate::fmt::lossy(self.target));
                return Err(Error::Timeout);
            }

            clock.delay(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockClock, ScriptedSerial};

    fn setup() -> (MockClock, ScriptedSerial, SerialPort<ScriptedSerial>) {
        let clock = MockClock::new();
        let serial = ScriptedSerial::new(&clock);
        let port = SerialPort::new(serial.clone());
        (clock, serial, port)
    }

    fn matcher(target: &[u8]) -> StreamMatcher<'_> {
        StreamMatcher::new(target, Duration::from_millis(100), Duration::from_millis(1))
    }

    #[test]
    fn window_detects_suffix_across_wraparound() {
        let mut window = MatchWindow::new(b"Call Ready").unwrap();
        let mut result = None;
        for b in b"garbage output before the Call Ready" {
            result = window.push(*b);
        }
        assert_eq!(result, Some(Matched::Target));
    }

    #[test]
    fn window_prefers_error_marker() {
        let mut window = MatchWindow::new(b"ROR").unwrap();
        let results: Vec<_> = b"ERROR".iter().map(|b| window.push(*b)).collect();
        assert_eq!(results[2], None);
        assert_eq!(results[4], Some(Matched::Error));
    }

    #[test]
    fn window_rejects_oversized_target() {
        assert!(MatchWindow::new(&[b'x'; MAX_TARGET_LEN + 1]).is_err());
    }

    #[test]
    fn sink_captures_everything_up_to_target() {
        let (mut clock, serial, mut port) = setup();
        serial.push(b"AT+CSQ\r\r\n+CSQ: 17,0\r\n\r\nOK\r\nNEXT");

        let mut sink: heapless::Vec<u8, 64> = heapless::Vec::new();
        matcher(b"OK")
            .drop_eol(true)
            .run(&mut port, &mut clock, Some(&mut sink))
            .unwrap();

        assert_eq!(sink.as_slice(), b"AT+CSQ\r\r\n+CSQ: 17,0\r\n\r\nOK");
        assert_eq!(port.read_byte().unwrap(), Some(b'N'));
    }

    #[test]
    fn keeps_line_endings_unless_asked() {
        let (mut clock, serial, mut port) = setup();
        serial.push(b"DOWNLOAD\r\n");

        matcher(b"DOWNLOAD")
            .run(&mut port, &mut clock, None)
            .unwrap();

        assert_eq!(port.read_byte().unwrap(), Some(b'\r'));
    }

    #[test]
    fn error_before_target_fails() {
        let (mut clock, serial, mut port) = setup();
        serial.push(b"\r\nERROR\r\n\r\nOK\r\n");

        assert_eq!(
            matcher(b"OK").run(&mut port, &mut clock, None),
            Err(Error::Modem)
        );
    }

    #[test]
    fn silence_times_out() {
        let (mut clock, _serial, mut port) = setup();

        assert_eq!(
            matcher(b"OK").run(&mut port, &mut clock, None),
            Err(Error::Timeout)
        );
        assert!(clock.elapsed() > Duration::from_millis(100));
    }

    #[test]
    fn slow_stream_resets_activity_timer() {
        let (mut clock, serial, mut port) = setup();
        serial.push_at(Duration::from_millis(0), b"\r\n");
        serial.push_at(Duration::from_millis(80), b"O");
        serial.push_at(Duration::from_millis(160), b"K");

        matcher(b"OK").run(&mut port, &mut clock, None).unwrap();
        assert!(clock.elapsed() >= Duration::from_millis(160));
    }

    #[test]
    fn gap_longer_than_timeout_fails() {
        let (mut clock, serial, mut port) = setup();
        serial.push_at(Duration::from_millis(0), b"O");
        serial.push_at(Duration::from_millis(250), b"K");

        assert_eq!(
            matcher(b"OK").run(&mut port, &mut clock, None),
            Err(Error::Timeout)
        );
    }

    #[test]
    fn full_sink_is_reported() {
        let (mut clock, serial, mut port) = setup();
        serial.push(b"0123456789OK");

        let mut sink: heapless::Vec<u8, 4> = heapless::Vec::new();
        assert_eq!(
            matcher(b"OK").run(&mut port, &mut clock, Some(&mut sink)),
            Err(Error::BufferFull)
        );
    }
}
