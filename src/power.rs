use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    channel::CommandChannel,
    client::Sim900,
    command::AT,
    config::StatusSense,
    error::Error,
    modules::ModuleParams,
    traits::Clock,
};

/// How long the AT probe waits for an answer.
const ALIVE_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Off,
    On,
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl<T, CLK, PWR, STAT> Sim900<T, CLK, PWR, STAT>
where
    T: Read + Write + ReadReady,
    CLK: Clock,
    PWR: OutputPin,
    STAT: StatusSense,
{
    /// Check that the cellular module is alive.
    ///
    /// Pokes the module with "AT" and waits up to one second for an answer.
    /// An `ERROR` reply still counts as alive.
    pub fn is_alive(&self) -> Result<bool, Error> {
        self.track(|| self.locked(|ch| Self::probe(ch)))
    }

    /// Current power state, from the status sense if one is configured,
    /// otherwise from an AT probe.
    ///
    /// Sampling the status sense does not need the modem, so it works while
    /// an [`HttpSession`](crate::HttpSession) holds the lock.
    pub fn power_state(&self) -> Result<PowerState, Error> {
        self.track(|| match self.sample_status()? {
            Some(on) => Ok(PowerState::from(on)),
            None => self.locked(|ch| Self::probe(ch).map(PowerState::from)),
        })
    }

    pub fn is_powered_up(&self) -> Result<bool, Error> {
        Ok(self.power_state()? == PowerState::On)
    }

    /// Pulse the power key: low, high, low, with the module specific
    /// timings. Toggles the power state whatever it currently is.
    pub fn power_toggle(&self) -> Result<(), Error> {
        self.track(|| self.locked(|ch| self.pulse_power_key(ch)))
    }

    /// Switch the module on and wait for its boot announcement.
    ///
    /// Returns `Ok(false)` without touching the power key when the module
    /// is already on.
    pub fn power_up(&self) -> Result<bool, Error> {
        self.track(|| self.switch_power(PowerState::On))
    }

    /// Switch the module off and wait for its shutdown announcement.
    ///
    /// Returns `Ok(false)` without touching the power key when the module
    /// is already off.
    pub fn power_down(&self) -> Result<bool, Error> {
        self.track(|| self.switch_power(PowerState::Off))
    }

    fn switch_power(&self, target: PowerState) -> Result<bool, Error> {
        self.locked(|ch| {
            if self.sense_power(ch)? == target {
                debug!("Module already {:?}", target);
                return Ok(false);
            }

            let announcement = match target {
                PowerState::On => self.module.boot_announcement(),
                PowerState::Off => self.module.shutdown_announcement(),
            };

            info!("Powering module {:?}", target);
            self.pulse_power_key(ch)?;

            let timeout = ch.input_timeout();
            ch.wait_for(announcement.as_bytes(), true, timeout, None)?;
            Ok(true)
        })
    }

    fn sense_power(&self, ch: &mut CommandChannel<T, CLK>) -> Result<PowerState, Error> {
        let on = match self.sample_status()? {
            Some(on) => on,
            None => Self::probe(ch)?,
        };
        Ok(PowerState::from(on))
    }

    /// Compare the status level against the threshold, `None` without a
    /// status sense.
    fn sample_status(&self) -> Result<Option<bool>, Error> {
        let mut sense = self.status.try_borrow_mut().map_err(|_| Error::IoPin)?;
        let Some(status) = sense.as_mut() else {
            return Ok(None);
        };

        let level = status.sample().map_err(|_| {
            error!("Failed to sample power status");
            Error::IoPin
        })?;
        trace!("Power status level: {}", level);
        Ok(Some(level > self.powerup_threshold))
    }

    fn pulse_power_key(&self, ch: &mut CommandChannel<T, CLK>) -> Result<(), Error> {
        let mut pwr_pin = self.pwr_pin.try_borrow_mut().map_err(|_| Error::IoPin)?;
        let pin = pwr_pin.as_mut().ok_or(Error::Unsupported)?;
        let clock = ch.clock();

        pin.set_low().map_err(|_| Error::IoPin)?;
        clock.delay(self.module.power_key_setup_time());
        pin.set_high().map_err(|_| Error::IoPin)?;
        clock.delay(self.module.power_key_pulse_time());
        pin.set_low().map_err(|_| Error::IoPin)?;
        clock.delay(self.module.power_key_settle_time());
        Ok(())
    }

    fn probe(ch: &mut CommandChannel<T, CLK>) -> Result<bool, Error> {
        ch.write_command(&AT)?;
        match ch.wait_for(b"OK", true, ALIVE_PROBE_TIMEOUT, None) {
            Ok(()) | Err(Error::Modem) => Ok(true),
            Err(Error::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
