//! ### 7 - GPRS Commands

pub mod responses;
pub mod types;
use atat::atat_derive::AtatCmd;
use responses::GPRSAttached;

/// 7.2.1 Read GPRS attach or detach +CGATT
///
/// Reports whether the MT is currently attached to the GPRS service.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGATT?", GPRSAttached)]
pub struct GetGPRSAttached;
