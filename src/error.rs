/// Failure kinds reported by the driver.
///
/// Every fallible operation returns one of these directly. The numeric
/// [`ErrorCode`] of the most recent failure is additionally kept by
/// [`Sim900::last_error`](crate::Sim900::last_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // Resource contention
    LockUnavailable,

    // Protocol level
    Modem,
    Timeout,
    Parse,
    BufferFull,

    // Sequencing
    DataNotReady,
    ReadLimitExceeded,
    WriteLimitExceeded,
    InvalidState,

    // Validation, raised before any modem I/O
    MaxPostSizeExceeded,
    InvalidCid,
    CharacterLimitExceeded,
    InvalidConnectionType,
    InvalidConnectionRate,
    InvalidHttpTimeout,

    // Collaborators
    Transport,
    IoPin,
    Unsupported,
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LockUnavailable => ErrorCode::LockUnavailable,
            Self::Modem => ErrorCode::ModemError,
            Self::Timeout => ErrorCode::Timeout,
            Self::Parse => ErrorCode::Parse,
            Self::BufferFull => ErrorCode::BufferFull,
            Self::DataNotReady => ErrorCode::DataNotReady,
            Self::ReadLimitExceeded => ErrorCode::ReadLimitExceeded,
            Self::WriteLimitExceeded => ErrorCode::WriteLimitExceeded,
            Self::InvalidState => ErrorCode::InvalidState,
            Self::MaxPostSizeExceeded => ErrorCode::MaxPostSizeExceeded,
            Self::InvalidCid => ErrorCode::InvalidCid,
            Self::CharacterLimitExceeded => ErrorCode::CharacterLimitExceeded,
            Self::InvalidConnectionType => ErrorCode::InvalidConnectionType,
            Self::InvalidConnectionRate => ErrorCode::InvalidConnectionRate,
            Self::InvalidHttpTimeout => ErrorCode::InvalidHttpTimeout,
            Self::Transport => ErrorCode::Transport,
            Self::IoPin => ErrorCode::IoPin,
            Self::Unsupported => ErrorCode::Unsupported,
        }
    }

    pub const fn message(&self) -> &'static str {
        self.code().message()
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;

        match self {
            Self::Timeout => ErrorKind::TimedOut,
            Self::Parse => ErrorKind::InvalidData,
            Self::WriteLimitExceeded
            | Self::ReadLimitExceeded
            | Self::MaxPostSizeExceeded
            | Self::CharacterLimitExceeded => ErrorKind::InvalidInput,
            Self::Unsupported => ErrorKind::Unsupported,
            _ => ErrorKind::Other,
        }
    }
}

/// Stable numeric error codes.
///
/// `NoError` is the reset value of the last-error slot at the start of every
/// public operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum ErrorCode {
    #[default]
    NoError = 0,
    LockUnavailable = -1,
    ModemError = -10,
    Timeout = -20,
    DataNotReady = -30,
    MaxPostSizeExceeded = -40,
    ReadLimitExceeded = -41,
    WriteLimitExceeded = -42,
    InvalidCid = -50,
    CharacterLimitExceeded = -51,
    InvalidConnectionType = -52,
    InvalidConnectionRate = -53,
    InvalidHttpTimeout = -54,
    InvalidState = -55,
    Parse = -60,
    BufferFull = -61,
    Transport = -70,
    IoPin = -71,
    Unsupported = -72,
}

impl ErrorCode {
    pub const fn value(self) -> i8 {
        self as i8
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::NoError => "No Error",
            Self::LockUnavailable => "Only one connection at a time can use the modem.",
            Self::ModemError => "Modem Error",
            Self::Timeout => "Timed out waiting for modem response.",
            Self::DataNotReady => "init_retrieve needs to be called before data can be read.",
            Self::MaxPostSizeExceeded => "The maximum post data size was exceeded.",
            Self::ReadLimitExceeded => "The read limit was exceeded.",
            Self::WriteLimitExceeded => "The declared content length was exceeded.",
            Self::InvalidCid => "Invalid Bearer profile Identifier",
            Self::CharacterLimitExceeded => "The Maximum character limit was exceeded",
            Self::InvalidConnectionType => "The specified connection type is not valid.",
            Self::InvalidConnectionRate => "The specified connection rate is not valid.",
            Self::InvalidHttpTimeout => "The HTTP Timeout value must be between 0 and 1000.",
            Self::InvalidState => "The HTTP session is not in a state that allows this operation.",
            Self::Parse => "The modem response could not be parsed.",
            Self::BufferFull => "The response buffer is full.",
            Self::Transport => "The serial transport reported an error.",
            Self::IoPin => "A power or status pin reported an error.",
            Self::Unsupported => "The operation is not supported with the current configuration.",
        }
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        e.code()
    }
}
