use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

/// Monotonic time source used for every timeout and fixed delay in the
/// driver.
///
/// All waiting is done by busy polling, so an implementation only needs to
/// report the current time and be able to block for a while. Tests inject a
/// simulated clock whose delays advance `now()` instead of sleeping.
pub trait Clock: DelayNs {
    fn now(&mut self) -> Instant;

    fn delay(&mut self, duration: Duration) {
        let us = duration.as_micros();
        self.delay_us(u32::try_from(us).unwrap_or(u32::MAX));
    }
}
