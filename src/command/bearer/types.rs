use crate::error::Error;
use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BearerCommandType {
    Close = 0,
    Open = 1,
    Query = 2,
    SetParameter = 3,
    GetParameter = 4,
}

/// Parameter tags of `AT+SAPBR=3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BearerParam {
    ConnectionType,
    Apn,
    User,
    Password,
    PhoneNumber,
    Rate,
}

impl BearerParam {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ConnectionType => "CONTYPE",
            Self::Apn => "APN",
            Self::User => "USER",
            Self::Password => "PWD",
            Self::PhoneNumber => "PHONENUM",
            Self::Rate => "RATE",
        }
    }
}

/// Bearer connection type, `CONTYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionType {
    Gprs,
    Csd,
}

impl ConnectionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gprs => "GPRS",
            Self::Csd => "CSD",
        }
    }
}

impl core::str::FromStr for ConnectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GPRS" => Ok(Self::Gprs),
            "CSD" => Ok(Self::Csd),
            _ => Err(Error::InvalidConnectionType),
        }
    }
}

/// CSD connection rate, `RATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionRate {
    Bps2400,
    Bps4800,
    Bps9600,
    Bps14400,
}

impl ConnectionRate {
    /// Parameter value sent to the module
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bps2400 => "0",
            Self::Bps4800 => "1",
            Self::Bps9600 => "2",
            Self::Bps14400 => "3",
        }
    }

    pub const fn bps(self) -> u32 {
        match self {
            Self::Bps2400 => 2400,
            Self::Bps4800 => 4800,
            Self::Bps9600 => 9600,
            Self::Bps14400 => 14400,
        }
    }
}

impl TryFrom<u32> for ConnectionRate {
    type Error = Error;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        match bps {
            2400 => Ok(Self::Bps2400),
            4800 => Ok(Self::Bps4800),
            9600 => Ok(Self::Bps9600),
            14400 => Ok(Self::Bps14400),
            _ => Err(Error::InvalidConnectionRate),
        }
    }
}

impl core::str::FromStr for ConnectionRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map_err(|_| Error::InvalidConnectionRate)
            .and_then(Self::try_from)
    }
}
