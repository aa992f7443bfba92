use atat::AtatCmd;
use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};
use serde::de::DeserializeOwned;

use crate::{
    error::Error,
    matcher::{Sink, StreamMatcher},
    serial::SerialPort,
    traits::Clock,
};

/// Scratch space for one serialized AT command.
pub(crate) const COMMAND_BUF_LEN: usize = 512;

/// Capacity of the buffer collecting a reply for field parsing.
pub(crate) const REPLY_BUF_LEN: usize = 128;

pub(crate) type ReplyBuf = heapless::Vec<u8, REPLY_BUF_LEN>;

/// Sole owner of the serial transport.
///
/// Writes commands and hands over to [`StreamMatcher`] for the reply. A
/// single lock flag makes sure only one logical operation drives the modem
/// at a time; there is no queueing, a second `lock` simply fails.
pub(crate) struct CommandChannel<T, CLK> {
    port: SerialPort<T>,
    clock: CLK,
    locked: bool,
    input_timeout: Duration,
    poll_interval: Duration,
}

impl<T, CLK> CommandChannel<T, CLK> {
    pub(crate) fn lock(&mut self) -> Result<(), Error> {
        if self.locked {
            warn!("Modem is already locked by another operation");
            return Err(Error::LockUnavailable);
        }

        self.locked = true;
        debug!("Locked....");
        Ok(())
    }

    pub(crate) fn unlock(&mut self) {
        if self.locked {
            self.locked = false;
            debug!("Unlocked....");
        }
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }
}

impl<T, CLK> CommandChannel<T, CLK>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
{
    pub(crate) fn new(
        transport: T,
        clock: CLK,
        input_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            port: SerialPort::new(transport),
            clock,
            locked: false,
            input_timeout,
            poll_interval,
        }
    }

    pub(crate) fn release(self) -> (T, CLK) {
        (self.port.release(), self.clock)
    }

    pub(crate) fn input_timeout(&self) -> Duration {
        self.input_timeout
    }

    pub(crate) fn clock(&mut self) -> &mut CLK {
        &mut self.clock
    }

    /// Write `bytes` to the transport verbatim and flush.
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    /// Write `command` verbatim, then wait for `expected` using the input
    /// timeout.
    pub(crate) fn issue_command(
        &mut self,
        command: &[u8],
        expected: &[u8],
        drop_eol: bool,
    ) -> Result<(), Error> {
        trace!("Sending: [{}]", crate::fmt::lossy(command).trim_end());
        self.write_raw(command)?;
        self.wait_for(expected, drop_eol, self.input_timeout, None)
    }

    /// Serialize and write an AT command without waiting for a reply.
    pub(crate) fn write_command<A: AtatCmd>(&mut self, cmd: &A) -> Result<(), Error> {
        let mut buf = [0u8; COMMAND_BUF_LEN];
        let len = cmd.write(&mut buf);
        trace!("Sending: [{}]", crate::fmt::lossy(&buf[..len]).trim_end());
        self.write_raw(&buf[..len])
    }

    /// Send an AT command and wait for its final `OK`.
    pub(crate) fn send<A: AtatCmd>(&mut self, cmd: &A) -> Result<(), Error> {
        self.write_command(cmd)?;
        self.wait_for(b"OK", true, self.input_timeout, None)
    }

    /// Send an AT command, collect the reply up to the final `OK` and parse
    /// the last line starting with `prefix` as the command's response.
    pub(crate) fn query<A>(&mut self, cmd: &A, prefix: &[u8]) -> Result<A::Response, Error>
    where
        A: AtatCmd,
        A::Response: DeserializeOwned,
    {
        let mut reply = ReplyBuf::new();
        self.write_command(cmd)?;
        self.wait_for(b"OK", true, self.input_timeout, Some(&mut reply))?;
        parse_line(&reply, prefix)
    }

    pub(crate) fn wait_for(
        &mut self,
        target: &[u8],
        drop_eol: bool,
        timeout: Duration,
        sink: Option<&mut dyn Sink>,
    ) -> Result<(), Error> {
        StreamMatcher::new(target, timeout, self.poll_interval)
            .drop_eol(drop_eol)
            .run(&mut self.port, &mut self.clock, sink)
    }

    /// Poll for a single byte until it arrives or `timeout` of silence has
    /// elapsed.
    pub(crate) fn read_byte_timeout(&mut self, timeout: Duration) -> Result<u8, Error> {
        let start = self.clock.now();

        loop {
            if self.port.available()? {
                if let Some(byte) = self.port.read_byte()? {
                    return Ok(byte);
                }
            }

            if self.clock.now().saturating_duration_since(start) > timeout {
                return Err(Error::Timeout);
            }

            self.clock.delay(self.poll_interval);
        }
    }
}

/// Parse the last line in `reply` that starts with `prefix`.
pub(crate) fn parse_line<R: DeserializeOwned>(reply: &[u8], prefix: &[u8]) -> Result<R, Error> {
    let start = reply
        .windows(prefix.len())
        .rposition(|w| w == prefix)
        .ok_or(Error::Parse)?;

    let line = &reply[start..];
    let end = line
        .iter()
        .position(|b| *b == b'\r' || *b == b'\n')
        .unwrap_or(line.len());

    atat::serde_at::from_slice(&line[..end]).map_err(|_| {
        error!("Malformed reply: {}", crate::fmt::lossy(&line[..end]));
        Error::Parse
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{network_service::GetSignalQuality, psn::GetGPRSAttached, AT},
        command::{network_service::responses::SignalQuality, psn::types::GPRSAttachedState},
        test_helpers::{MockClock, ScriptedSerial},
    };

    fn setup() -> (ScriptedSerial, CommandChannel<ScriptedSerial, MockClock>) {
        let clock = MockClock::new();
        let serial = ScriptedSerial::new(&clock);
        let channel = CommandChannel::new(
            serial.clone(),
            clock,
            Duration::from_millis(500),
            Duration::from_millis(10),
        );
        (serial, channel)
    }

    #[test]
    fn second_lock_fails_until_unlocked() {
        let (_serial, mut channel) = setup();

        assert_eq!(channel.lock(), Ok(()));
        assert_eq!(channel.lock(), Err(Error::LockUnavailable));
        channel.unlock();
        assert_eq!(channel.lock(), Ok(()));
    }

    #[test]
    fn unlock_without_lock_is_harmless() {
        let (_serial, mut channel) = setup();
        channel.unlock();
        assert!(!channel.is_locked());
    }

    #[test]
    fn issue_command_writes_verbatim() {
        let (serial, mut channel) = setup();
        serial.push(b"AT\r\r\nOK\r\n");

        channel.issue_command(b"AT\r\n", b"OK", true).unwrap();
        assert_eq!(serial.written(), b"AT\r\n");
        assert_eq!(serial.pending(), 0);
    }

    #[test]
    fn send_reports_modem_error() {
        let (serial, mut channel) = setup();
        serial.push(b"\r\nERROR\r\n");

        assert_eq!(channel.send(&AT), Err(Error::Modem));
    }

    #[test]
    fn query_parses_signal_quality() {
        let (serial, mut channel) = setup();
        serial.push(b"AT+CSQ\r\r\n+CSQ: 17,0\r\n\r\nOK\r\n");

        let csq = channel.query(&GetSignalQuality, b"+CSQ").unwrap();
        assert_eq!(csq, SignalQuality { rssi: 17, ber: 0 });
        assert_eq!(serial.written_str(), "AT+CSQ\r\n");
    }

    #[test]
    fn query_parses_attach_state() {
        let (serial, mut channel) = setup();
        serial.push(b"\r\n+CGATT: 1\r\n\r\nOK\r\n");

        let attached = channel.query(&GetGPRSAttached, b"+CGATT").unwrap();
        assert_eq!(attached.state, GPRSAttachedState::Attached);
    }

    #[test]
    fn query_without_response_line_is_parse_error() {
        let (serial, mut channel) = setup();
        serial.push(b"\r\nOK\r\n");

        assert_eq!(
            channel.query(&GetSignalQuality, b"+CSQ").map(|_| ()),
            Err(Error::Parse)
        );
    }

    #[test]
    fn read_byte_times_out() {
        let (serial, mut channel) = setup();
        serial.push_at(Duration::from_millis(1000), b"x");

        assert_eq!(
            channel.read_byte_timeout(Duration::from_millis(100)),
            Err(Error::Timeout)
        );
    }
}
