use core::cell::{Cell, RefCell, RefMut};

use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    channel::CommandChannel,
    command::{
        http::MAX_HTTP_PARAM_LEN,
        network_service::{responses::SignalQuality, GetSignalQuality},
    },
    config::{Config, NoPin, StatusSense},
    connection::ConnectionSettings,
    error::{Error, ErrorCode},
    http::HttpSession,
    modules::Module,
    traits::Clock,
};

/// Driver for one physical SIM900 modem.
///
/// All methods take `&self`; the serial transport, the clock and the pins
/// live behind interior mutability so an [`HttpSession`] can borrow the
/// modem while the caller still holds on to it.
pub struct Sim900<T, CLK, PWR = NoPin, STAT = NoPin> {
    pub(crate) channel: RefCell<CommandChannel<T, CLK>>,
    pub(crate) pwr_pin: RefCell<Option<PWR>>,
    pub(crate) status: RefCell<Option<STAT>>,
    pub(crate) module: Module,
    pub(crate) powerup_threshold: u16,
    pub(crate) http_data_window_ms: u32,
    pub(crate) retries: u8,
    pub(crate) retry_delay: Duration,
    last_error: Cell<ErrorCode>,
}

impl<T, CLK, PWR, STAT> Sim900<T, CLK, PWR, STAT>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
    PWR: OutputPin,
    STAT: StatusSense,
{
    pub fn new(transport: T, clock: CLK, config: Config<PWR, STAT>) -> Self {
        let Config {
            pwr_pin,
            status,
            module,
            input_timeout,
            poll_interval,
            powerup_threshold,
            http_data_window_ms,
            retries,
            retry_delay,
        } = config;

        Self {
            channel: RefCell::new(CommandChannel::new(
                transport,
                clock,
                input_timeout,
                poll_interval,
            )),
            pwr_pin: RefCell::new(pwr_pin),
            status: RefCell::new(status),
            module,
            powerup_threshold,
            http_data_window_ms,
            retries,
            retry_delay,
            last_error: Cell::new(ErrorCode::NoError),
        }
    }

    /// Give back the transport and the clock.
    pub fn release(self) -> (T, CLK) {
        self.channel.into_inner().release()
    }

    pub fn module(&self) -> Module {
        self.module
    }

    /// Code of the failure reported by the most recent public operation,
    /// [`ErrorCode::NoError`] if it succeeded.
    pub fn last_error(&self) -> ErrorCode {
        self.last_error.get()
    }

    /// Run a public operation, keeping the last-error slot in sync with its
    /// result.
    pub(crate) fn track<R>(&self, f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
        self.last_error.set(ErrorCode::NoError);
        let res = f();
        if let Err(e) = &res {
            self.last_error.set(e.code());
        }
        res
    }

    pub(crate) fn channel(&self) -> Result<RefMut<'_, CommandChannel<T, CLK>>, Error> {
        self.channel
            .try_borrow_mut()
            .map_err(|_| Error::LockUnavailable)
    }

    /// Run `f` with the channel lock held, releasing it on every exit path.
    pub(crate) fn locked<R>(
        &self,
        f: impl FnOnce(&mut CommandChannel<T, CLK>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut channel = self.channel()?;
        channel.lock()?;
        let res = f(&mut *channel);
        channel.unlock();
        res
    }

    /// Acquire the modem for exclusive use.
    ///
    /// Fails with [`Error::LockUnavailable`] while another operation or an
    /// [`HttpSession`] holds it. There is no waiting.
    pub fn lock(&self) -> Result<(), Error> {
        self.track(|| self.channel()?.lock())
    }

    pub fn unlock(&self) {
        if let Ok(mut channel) = self.channel() {
            channel.unlock();
        }
    }

    pub fn is_locked(&self) -> bool {
        self.channel().map_or(true, |channel| channel.is_locked())
    }

    /// Write `command` verbatim and wait for `expected`.
    ///
    /// Takes the lock for the duration of the exchange, so it fails with
    /// [`Error::LockUnavailable`] while an [`HttpSession`] is alive.
    pub fn issue_command(&self, command: &[u8], expected: &str, drop_eol: bool) -> Result<(), Error> {
        self.track(|| {
            self.locked(|ch| ch.issue_command(command, expected.as_bytes(), drop_eol))
        })
    }

    /// Received signal strength and bit error rate, `AT+CSQ`.
    pub fn signal_quality(&self) -> Result<SignalQuality, Error> {
        self.track(|| self.locked(|ch| ch.query(&GetSignalQuality, b"+CSQ")))
    }

    /// Poll the signal quality up to `iterations` times, `wait` apart, until
    /// the module reports a known signal strength.
    pub fn wait_for_signal(&self, iterations: u32, wait: Duration) -> Result<SignalQuality, Error> {
        self.track(|| {
            self.locked(|ch| {
                for i in 0..iterations {
                    let quality = ch.query(&GetSignalQuality, b"+CSQ")?;
                    if quality.is_known() {
                        info!("Signal found, rssi: {}", quality.rssi);
                        return Ok(quality);
                    }

                    trace!("No signal yet ({}/{})", i + 1, iterations);
                    if i + 1 < iterations {
                        ch.clock().delay(wait);
                    }
                }

                warn!("No signal after {} attempts", iterations);
                Err(Error::Timeout)
            })
        })
    }

    /// Configure the bearer profile and hand out an HTTP session for `url`.
    ///
    /// The settings and the URL are validated before any byte is written.
    /// On success the returned session holds the modem lock until it is
    /// terminated or dropped.
    pub fn create_http_connection<'a>(
        &'a self,
        settings: &ConnectionSettings<'_>,
        url: &'a str,
    ) -> Result<HttpSession<'a, T, CLK, PWR, STAT>, Error> {
        self.track(|| {
            settings.validate()?;
            if url.len() > MAX_HTTP_PARAM_LEN {
                return Err(Error::CharacterLimitExceeded);
            }

            let mut channel = self.channel()?;
            channel.lock()?;

            if let Err(e) = settings.apply(&mut *channel) {
                error!("Failed to configure bearer {}: {:?}", settings.cid, e);
                channel.unlock();
                return Err(e);
            }

            drop(channel);
            Ok(HttpSession::new(self, settings.cid, url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::bearer::types::ConnectionType,
        test_helpers::{MockClock, ScriptedSerial},
    };

    fn setup() -> (MockClock, ScriptedSerial, Sim900<ScriptedSerial, MockClock>) {
        let clock = MockClock::new();
        let serial = ScriptedSerial::new(&clock);
        let config = Config::new().input_timeout(Duration::from_millis(500));
        let sim = Sim900::new(serial.clone(), clock.clone(), config);
        (clock, serial, sim)
    }

    #[test]
    fn signal_quality_round_trip() {
        let (_clock, serial, sim) = setup();
        serial.push(b"AT+CSQ\r\r\n+CSQ: 20,0\r\n\r\nOK\r\n");

        assert_eq!(sim.signal_quality(), Ok(SignalQuality { rssi: 20, ber: 0 }));
        assert_eq!(sim.last_error(), ErrorCode::NoError);
        assert!(!sim.is_locked());
    }

    #[test]
    fn failure_sets_last_error_and_releases_lock() {
        let (_clock, serial, sim) = setup();
        serial.push(b"\r\nERROR\r\n");

        assert_eq!(sim.signal_quality(), Err(Error::Modem));
        assert_eq!(sim.last_error(), ErrorCode::ModemError);
        assert!(!sim.is_locked());

        serial.push(b"\r\n+CSQ: 5,0\r\n\r\nOK\r\n");
        assert!(sim.signal_quality().is_ok());
        assert_eq!(sim.last_error(), ErrorCode::NoError);
    }

    #[test]
    fn signal_quality_while_locked() {
        let (_clock, serial, sim) = setup();

        sim.lock().unwrap();
        assert_eq!(sim.signal_quality(), Err(Error::LockUnavailable));
        assert_eq!(sim.last_error(), ErrorCode::LockUnavailable);
        assert!(serial.written().is_empty());

        sim.unlock();
        serial.push(b"\r\n+CSQ: 5,0\r\n\r\nOK\r\n");
        assert!(sim.signal_quality().is_ok());
    }

    #[test]
    fn wait_for_signal_polls_until_known() {
        let (clock, serial, sim) = setup();
        serial.push(b"\r\n+CSQ: 99,99\r\n\r\nOK\r\n");
        serial.push_at(
            Duration::from_millis(900),
            b"\r\n+CSQ: 99,99\r\n\r\nOK\r\n\r\n+CSQ: 12,0\r\n\r\nOK\r\n",
        );

        let quality = sim
            .wait_for_signal(5, Duration::from_millis(1000))
            .unwrap();
        assert_eq!(quality.rssi, 12);
        assert_eq!(serial.written_str(), "AT+CSQ\r\n".repeat(3));
        assert!(clock.elapsed() >= Duration::from_millis(2000));
    }

    #[test]
    fn wait_for_signal_gives_up() {
        let (_clock, serial, sim) = setup();
        serial.push(b"\r\n+CSQ: 99,99\r\n\r\nOK\r\n\r\n+CSQ: 99,99\r\n\r\nOK\r\n");

        assert_eq!(
            sim.wait_for_signal(2, Duration::from_millis(100)),
            Err(Error::Timeout)
        );
        assert_eq!(sim.last_error(), ErrorCode::Timeout);
    }

    #[test]
    fn issue_command_is_verbatim() {
        let (_clock, serial, sim) = setup();
        serial.push(b"AT+CREG?\r\r\n+CREG: 0,1\r\n\r\nOK\r\n");

        sim.issue_command(b"AT+CREG?\r\n", "OK", true).unwrap();
        assert_eq!(serial.written(), b"AT+CREG?\r\n");
        assert!(!sim.is_locked());
    }

    #[test]
    fn issue_command_during_session_is_refused() {
        let (_clock, serial, sim) = setup();
        serial.push(b"\r\nOK\r\n");

        let settings = ConnectionSettings::new(1, ConnectionType::Gprs);
        let session = sim
            .create_http_connection(&settings, "http://example.com")
            .unwrap();
        let before = serial.written().len();

        assert_eq!(
            sim.issue_command(b"AT+HTTPTERM\r\n", "OK", true),
            Err(Error::LockUnavailable)
        );
        assert_eq!(sim.last_error(), ErrorCode::LockUnavailable);
        assert_eq!(serial.written().len(), before);
        assert!(sim.is_locked());

        drop(session);
        serial.push(b"\r\nOK\r\n");
        assert_eq!(sim.issue_command(b"AT\r\n", "OK", true), Ok(()));
    }

    #[test]
    fn invalid_cid_writes_nothing() {
        let (_clock, serial, sim) = setup();
        let settings = ConnectionSettings::gprs(7, "internet");

        assert_eq!(
            sim.create_http_connection(&settings, "http://example.com")
                .err(),
            Some(Error::InvalidCid)
        );
        assert_eq!(sim.last_error(), ErrorCode::InvalidCid);
        assert!(serial.written().is_empty());
        assert!(!sim.is_locked());
    }

    #[test]
    fn oversized_url_writes_nothing() {
        let (_clock, serial, sim) = setup();
        let settings = ConnectionSettings::gprs(1, "internet");
        let url = "x".repeat(MAX_HTTP_PARAM_LEN + 1);

        assert_eq!(
            sim.create_http_connection(&settings, &url).err(),
            Some(Error::CharacterLimitExceeded)
        );
        assert!(serial.written().is_empty());
    }

    #[test]
    fn bearer_profile_is_written() {
        let (_clock, serial, sim) = setup();
        serial.push(b"\r\nOK\r\n\r\nOK\r\n\r\nOK\r\n\r\nOK\r\n");

        let settings = ConnectionSettings::new(1, ConnectionType::Gprs)
            .apn("internet")
            .credentials("guest", "secret");
        let session = sim
            .create_http_connection(&settings, "http://example.com")
            .unwrap();

        assert_eq!(
            serial.written_str(),
            "AT+SAPBR=3,1,\"CONTYPE\",\"GPRS\"\r\n\
             AT+SAPBR=3,1,\"APN\",\"internet\"\r\n\
             AT+SAPBR=3,1,\"USER\",\"guest\"\r\n\
             AT+SAPBR=3,1,\"PWD\",\"secret\"\r\n"
        );
        assert!(sim.is_locked());
        drop(session);
        assert!(!sim.is_locked());
    }

    #[test]
    fn bearer_failure_releases_lock() {
        let (_clock, serial, sim) = setup();
        serial.push(b"\r\nOK\r\n\r\nERROR\r\n");

        let settings = ConnectionSettings::gprs(1, "bad apn");
        assert_eq!(
            sim.create_http_connection(&settings, "http://example.com")
                .err(),
            Some(Error::Modem)
        );
        assert!(!sim.is_locked());
    }
}
