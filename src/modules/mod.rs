#[cfg(any(feature = "any-module", feature = "sim800"))]
pub mod sim800;
#[cfg(any(feature = "any-module", feature = "sim900"))]
pub mod sim900;

use embassy_time::Duration;

pub trait ModuleParams: Copy {
    /// Largest body accepted by AT+HTTPDATA, in bytes
    fn max_post_data(&self) -> u32 {
        318_976
    }

    /// Initial low time of the power key before the pulse
    fn power_key_setup_time(&self) -> Duration {
        Duration::from_millis(1000)
    }

    /// The time for which the power key must be held high to toggle power
    fn power_key_pulse_time(&self) -> Duration {
        Duration::from_millis(2000)
    }

    /// Settling time after releasing the power key
    fn power_key_settle_time(&self) -> Duration {
        Duration::from_millis(3000)
    }

    /// Unsolicited line printed by the module once it is ready after boot
    fn boot_announcement(&self) -> &'static str {
        "Call Ready"
    }

    /// Unsolicited line printed by the module on an orderly power down
    fn shutdown_announcement(&self) -> &'static str {
        "NORMAL POWER DOWN"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Module {
    #[cfg(any(feature = "any-module", feature = "sim800"))]
    Sim800(sim800::Sim800),
    #[cfg(any(feature = "any-module", feature = "sim900"))]
    Sim900(sim900::Sim900),
    Generic(Generic),
}

impl Default for Module {
    fn default() -> Self {
        #[cfg(any(feature = "any-module", feature = "sim900"))]
        return Self::Sim900(sim900::Sim900);
        #[cfg(not(any(feature = "any-module", feature = "sim900")))]
        return Self::Generic(Generic);
    }
}

macro_rules! inner {
    ($self: ident, $fn: ident) => {
        match $self {
            #[cfg(any(feature = "any-module", feature = "sim800"))]
            Self::Sim800(inner) => inner.$fn(),
            #[cfg(any(feature = "any-module", feature = "sim900"))]
            Self::Sim900(inner) => inner.$fn(),
            Self::Generic(inner) => inner.$fn(),
        }
    };
}

impl ModuleParams for Module {
    fn max_post_data(&self) -> u32 {
        inner!(self, max_post_data)
    }

    fn power_key_setup_time(&self) -> Duration {
        inner!(self, power_key_setup_time)
    }

    fn power_key_pulse_time(&self) -> Duration {
        inner!(self, power_key_pulse_time)
    }

    fn power_key_settle_time(&self) -> Duration {
        inner!(self, power_key_settle_time)
    }

    fn boot_announcement(&self) -> &'static str {
        inner!(self, boot_announcement)
    }

    fn shutdown_announcement(&self) -> &'static str {
        inner!(self, shutdown_announcement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Generic;

impl ModuleParams for Generic {}
