use embedded_io::{Read, ReadReady, Write};

use crate::error::Error;

/// Byte level view of the serial transport.
///
/// Adds a single byte of lookahead on top of `embedded_io`, so trailing line
/// endings can be inspected and discarded without swallowing the first byte
/// of whatever follows them.
pub(crate) struct SerialPort<T> {
    inner: T,
    peeked: Option<u8>,
}

impl<T> SerialPort<T>
where
    T: Read + Write + ReadReady,
{
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    pub(crate) fn release(self) -> T {
        self.inner
    }

    /// Whether a byte can be read without blocking.
    pub(crate) fn available(&mut self) -> Result<bool, Error> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        self.inner.read_ready().map_err(|_| Error::Transport)
    }

    /// Read one byte, only call after [`available`](Self::available) returned `true`.
    pub(crate) fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        if let Some(b) = self.peeked.take() {
            return Ok(Some(b));
        }

        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf).map_err(|_| Error::Transport)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    pub(crate) fn peek(&mut self) -> Result<Option<u8>, Error> {
        if self.peeked.is_none() && self.available()? {
            self.peeked = self.read_byte()?;
        }
        Ok(self.peeked)
    }

    /// Discard any `\r`/`\n` bytes that are already waiting.
    pub(crate) fn drop_eol(&mut self) -> Result<(), Error> {
        while let Some(b'\r' | b'\n') = self.peek()? {
            self.peeked = None;
        }
        Ok(())
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.inner.write_all(buf).map_err(|_| Error::Transport)
    }

    pub(crate) fn flush(&mut self) -> Result<(), Error> {
        self.inner.flush().map_err(|_| Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockClock, ScriptedSerial};

    #[test]
    fn drop_eol_keeps_next_byte() {
        let clock = MockClock::new();
        let serial = ScriptedSerial::new(&clock);
        serial.push(b"\r\n\r\nX");

        let mut port = SerialPort::new(serial);
        port.drop_eol().unwrap();
        assert!(port.available().unwrap());
        assert_eq!(port.read_byte().unwrap(), Some(b'X'));
        assert!(!port.available().unwrap());
    }

    #[test]
    fn drop_eol_on_empty_input() {
        let clock = MockClock::new();
        let serial = ScriptedSerial::new(&clock);

        let mut port = SerialPort::new(serial.clone());
        port.drop_eol().unwrap();
        port.write_all(b"AT\r\n").unwrap();
        assert_eq!(serial.written(), b"AT\r\n");
    }
}
