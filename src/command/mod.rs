//! AT Commands for the SIMCom SIM900 family\
//! Following the SIM900 AT Commands Manual and the SIM900 IP Application Note

pub mod bearer;
pub mod http;
pub mod network_service;
pub mod psn;

use atat::atat_derive::{AtatCmd, AtatResp};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse)]
pub struct AT;
