use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::{error::Error, modules::Module};

/// Upper bound accepted by AT+HTTPDATA for the upload window.
pub const MAX_HTTP_DATA_WINDOW_MS: u32 = 120_000;

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Source of the modem power-status level.
///
/// The SIM900 shield exposes its STATUS line on an analog input; the driver
/// samples it and compares the level against
/// [`Config::powerup_threshold`].
pub trait StatusSense {
    type Error: core::fmt::Debug;

    fn sample(&mut self) -> Result<u16, Self::Error>;
}

impl StatusSense for NoPin {
    type Error = core::convert::Infallible;

    fn sample(&mut self) -> Result<u16, Self::Error> {
        Ok(u16::MAX)
    }
}

/// Adapts a digital input to [`StatusSense`], reporting full scale when high.
pub struct DigitalStatus<P: InputPin>(pub P);

impl<P: InputPin> StatusSense for DigitalStatus<P> {
    type Error = P::Error;

    fn sample(&mut self) -> Result<u16, Self::Error> {
        if self.0.is_high()? {
            Ok(u16::MAX)
        } else {
            Ok(0)
        }
    }
}

#[derive(Debug)]
pub struct Config<PWR, STAT> {
    pub(crate) pwr_pin: Option<PWR>,
    pub(crate) status: Option<STAT>,
    pub(crate) module: Module,
    pub(crate) input_timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) powerup_threshold: u16,
    pub(crate) http_data_window_ms: u32,
    pub(crate) retries: u8,
    pub(crate) retry_delay: Duration,
}

impl Default for Config<NoPin, NoPin> {
    fn default() -> Self {
        Self::new()
    }
}

impl<PWR, STAT> Config<PWR, STAT>
where
    PWR: OutputPin,
    STAT: StatusSense,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            pwr_pin: None,
            status: None,
            module: Module::default(),
            input_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(10),
            powerup_threshold: 100,
            http_data_window_ms: 100_000,
            retries: 5,
            retry_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_pwr(self, pwr_pin: PWR) -> Self {
        Self {
            pwr_pin: Some(pwr_pin),
            ..self
        }
    }

    pub fn with_status(self, status: STAT) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    pub fn with_module(self, module: Module) -> Self {
        Self { module, ..self }
    }

    /// Maximum silence tolerated while waiting for a modem reply.
    pub fn input_timeout(self, input_timeout: Duration) -> Self {
        Self {
            input_timeout,
            ..self
        }
    }

    /// Delay between two polls of an idle transport.
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    pub fn powerup_threshold(self, powerup_threshold: u16) -> Self {
        Self {
            powerup_threshold,
            ..self
        }
    }

    /// Time the modem waits for the announced upload body, in milliseconds.
    pub fn http_data_window(self, window_ms: u32) -> Result<Self, Error> {
        if window_ms > MAX_HTTP_DATA_WINDOW_MS {
            return Err(Error::InvalidHttpTimeout);
        }

        Ok(Self {
            http_data_window_ms: window_ms,
            ..self
        })
    }

    /// Attempts and spacing used for bearer and HTTP context bring-up and
    /// teardown.
    pub fn retries(self, retries: u8, retry_delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            retry_delay,
            ..self
        }
    }

    pub fn module(&self) -> Module {
        self.module
    }
}
