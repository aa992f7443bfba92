use crate::error::Error;

/// Byte budget for a request body announced with AT+HTTPDATA.
///
/// The module expects exactly the announced number of bytes; anything
/// beyond it would be taken as the start of the next command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundedWriter {
    limit: u32,
    count: u32,
}

impl BoundedWriter {
    pub fn new(limit: u32) -> Self {
        Self { limit, count: 0 }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.count
    }

    /// Number of bytes out of `len` that still fit, failing once the budget
    /// is used up.
    pub fn admit(&self, len: usize) -> Result<usize, Error> {
        match self.remaining() {
            0 if len > 0 => Err(Error::WriteLimitExceeded),
            remaining => Ok(len.min(remaining as usize)),
        }
    }

    pub(crate) fn advance(&mut self, n: usize) {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        self.count = self.count.saturating_add(n).min(self.limit);
    }
}

/// Byte budget for a response body reported by +HTTPACTION.
///
/// Reads are refused until retrieval has been armed with AT+HTTPREAD.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundedReader {
    limit: u32,
    count: u32,
    ready: bool,
}

impl BoundedReader {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            count: 0,
            ready: false,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Bytes left in the body, zero until retrieval is armed.
    pub fn remaining(&self) -> u32 {
        if self.ready {
            self.limit - self.count
        } else {
            0
        }
    }

    /// Whether one more byte may be read.
    pub fn admit(&self) -> Result<(), Error> {
        if !self.ready {
            Err(Error::DataNotReady)
        } else if self.count >= self.limit {
            Err(Error::ReadLimitExceeded)
        } else {
            Ok(())
        }
    }

    pub(crate) fn arm(&mut self) {
        self.count = 0;
        self.ready = true;
    }

    pub(crate) fn advance(&mut self) {
        if self.count < self.limit {
            self.count += 1;
        }
    }
}
