#![cfg_attr(not(test), no_std)]

//! # SIM900
//!
//! Driver for SIMCom SIM900 (and SIM800) cellular modems, controlled over a
//! serial link with AT commands, with a small HTTP client on top of the
//! module's built-in HTTP stack. It can be used both on `no_std` and `std`
//! platforms.
//!
//! All waiting is done by busy polling the transport against a deadline.
//! The serial transport is any [`embedded_io`] `Read + Write + ReadReady`,
//! time comes from an injected [`Clock`].
//!
//! ### Clock trait
//!
//! Here is an example how a clock would look like for a `std` platform:
//!
//! ```
//! use sim900::{embassy_time, Clock};
//!
//! pub struct SysClock {
//!     start: std::time::Instant,
//! }
//!
//! impl embedded_hal::delay::DelayNs for SysClock {
//!     fn delay_ns(&mut self, ns: u32) {
//!         std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
//!     }
//! }
//!
//! impl Clock for SysClock {
//!     fn now(&mut self) -> embassy_time::Instant {
//!         embassy_time::Instant::from_micros(self.start.elapsed().as_micros() as u64)
//!     }
//! }
//! ```
//!
//! ### Driver usage
//!
//! ```ignore
//! let sim = Sim900::new(serial, clock, Config::new().with_pwr(pwr_pin));
//! sim.power_up()?;
//!
//! let settings = ConnectionSettings::gprs(1, "internet");
//! let mut http = sim.create_http_connection(&settings, "http://example.com/post")?;
//! http.init(120)?;
//! http.post_init(13)?;
//! http.write_all(b"hello=world12")?;
//! let result = http.post()?;
//! http.init_retrieve()?;
//! let mut body = [0u8; 64];
//! let n = http.read(&mut body[..result.length as usize])?;
//! http.terminate();
//! ```

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod channel;
mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
mod matcher;
pub mod modules;
mod power;
mod serial;
mod traits;

#[cfg(test)]
mod test_helpers;

pub use client::Sim900;
pub use config::{Config, DigitalStatus, NoPin, StatusSense};
pub use connection::ConnectionSettings;
pub use error::{Error, ErrorCode};
pub use http::HttpSession;
pub use power::PowerState;
pub use traits::Clock;

// Re-export atat and embassy-time
pub use atat;
pub use embassy_time;
