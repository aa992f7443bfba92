//! Responses for GPRS Commands
use super::types::GPRSAttachedState;
use atat::atat_derive::AtatResp;

/// 7.2.1 GPRS attach or detach +CGATT
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GPRSAttached {
    #[at_arg(position = 0)]
    pub state: GPRSAttachedState,
}
