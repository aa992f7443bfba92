//! Responses for HTTP Application Commands
use atat::atat_derive::AtatResp;

/// 9.3.5 Result of +HTTPACTION
///
/// A response without a Content-Length header is reported with
/// `length == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpActionResult {
    #[at_arg(position = 0)]
    pub cid: u8,
    #[at_arg(position = 1)]
    pub status: u16,
    #[at_arg(position = 2)]
    pub length: u32,
}
