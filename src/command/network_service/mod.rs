//! ### 3.2 Network service Commands

pub mod responses;
use atat::atat_derive::AtatCmd;
use responses::SignalQuality;

/// 3.2.32 Signal quality report +CSQ
///
/// Returns received signal strength indication <rssi> and channel bit error
/// rate <ber>.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CSQ", SignalQuality)]
pub struct GetSignalQuality;
