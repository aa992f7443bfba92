use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpMethod {
    Get = 0,
    Post = 1,
    Head = 2,
}

/// Parameter tags of `AT+HTTPPARA`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpParam {
    /// Bearer profile identifier
    Cid,
    Url,
    /// User agent, "SIMCOM_MODULE" by default
    UserAgent,
    /// Content-Type of the request body
    Content,
    /// Extra request header lines
    UserData,
    /// Follow redirects, 0 or 1
    Redirect,
    /// Session timeout in seconds, 30 to 1000
    Timeout,
}

impl HttpParam {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Cid => "CID",
            Self::Url => "URL",
            Self::UserAgent => "UA",
            Self::Content => "CONTENT",
            Self::UserData => "USERDATA",
            Self::Redirect => "REDIR",
            Self::Timeout => "TIMEOUT",
        }
    }
}
