//! ### 9.3 HTTP Application Commands
//!
//! The HTTP service runs on top of an open bearer. A request is prepared by
//! initializing the context (`+HTTPINIT`), setting parameters
//! (`+HTTPPARA`), optionally uploading a body (`+HTTPDATA`), and is then
//! triggered with `+HTTPACTION`. The response body is kept by the module and
//! can be read back in ranges with `+HTTPREAD`.

pub mod responses;
pub mod types;
use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::HttpMethod;

/// Longest value accepted for an HTTP parameter, including URLs
pub const MAX_HTTP_PARAM_LEN: usize = 256;

/// 9.3.1 Initialize HTTP service +HTTPINIT
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPINIT", NoResponse)]
pub struct HttpInit;

/// 9.3.2 Terminate HTTP service +HTTPTERM
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPTERM", NoResponse)]
pub struct HttpTerm;

/// 9.3.3 Set HTTP parameters value +HTTPPARA
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPPARA", NoResponse)]
pub struct SetHttpParameter<'a> {
    #[at_arg(position = 0, len = 16)]
    pub tag: &'a str,
    #[at_arg(position = 1, len = 256)]
    pub value: &'a str,
}

/// 9.3.3 Set HTTP parameters value +HTTPPARA, numeric value
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPPARA", NoResponse)]
pub struct SetHttpParameterNumber<'a> {
    #[at_arg(position = 0, len = 16)]
    pub tag: &'a str,
    #[at_arg(position = 1)]
    pub value: u32,
}

/// 9.3.4 Input HTTP data +HTTPDATA
///
/// The module answers with `DOWNLOAD` and then expects exactly `size` bytes
/// within `time` milliseconds.
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPDATA", NoResponse)]
pub struct SetHttpData {
    #[at_arg(position = 0)]
    pub size: u32,
    #[at_arg(position = 1)]
    pub time: u32,
}

/// 9.3.5 HTTP method action +HTTPACTION
///
/// `OK` is returned immediately; the result arrives later as an unsolicited
/// `+HTTPACTION: <method>,<status>,<datalen>` line.
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPACTION", NoResponse)]
pub struct HttpAction {
    #[at_arg(position = 0)]
    pub method: HttpMethod,
}

/// 9.3.6 Read the HTTP server response +HTTPREAD
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPREAD", NoResponse)]
pub struct HttpRead {
    #[at_arg(position = 0)]
    pub start: u32,
    #[at_arg(position = 1)]
    pub size: u32,
}
