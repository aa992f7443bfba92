//! ### 9.2 Bearer configuration for IP based applications
//!
//! A bearer profile (identified by its CID, 0-5) describes the packet-data
//! (GPRS) or circuit-switched (CSD) connection used by the built-in
//! application stacks such as HTTP. Every parameter is set individually with
//! `AT+SAPBR=3`, after which the bearer can be opened and closed.

pub mod types;
use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::BearerCommandType;

/// Longest value accepted for a single bearer parameter
pub const MAX_BEARER_VALUE_LEN: usize = 50;

/// 9.2.1 Set bearer parameter +SAPBR=3
#[derive(Clone, AtatCmd)]
#[at_cmd("+SAPBR", NoResponse)]
pub struct SetBearerParameter<'a> {
    #[at_arg(position = 0)]
    pub cmd_type: BearerCommandType,
    #[at_arg(position = 1)]
    pub cid: u8,
    #[at_arg(position = 2, len = 8)]
    pub tag: &'a str,
    #[at_arg(position = 3, len = 50)]
    pub value: &'a str,
}

/// 9.2.1 Open or close bearer +SAPBR=1 / +SAPBR=0
#[derive(Clone, AtatCmd)]
#[at_cmd("+SAPBR", NoResponse)]
pub struct SetBearerState {
    #[at_arg(position = 0)]
    pub cmd_type: BearerCommandType,
    #[at_arg(position = 1)]
    pub cid: u8,
}
