//! Responses for Network service Commands
use atat::atat_derive::AtatResp;

/// Value of <rssi> when the signal strength is not known or not detectable.
pub const RSSI_UNKNOWN: u8 = 99;

/// 3.2.32 Signal quality report +CSQ
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalQuality {
    /// 0 (-115 dBm or less) to 31 (-52 dBm or greater), 99 if unknown
    #[at_arg(position = 0)]
    pub rssi: u8,
    /// RXQUAL values, 99 if unknown
    #[at_arg(position = 1)]
    pub ber: u8,
}

impl SignalQuality {
    pub fn is_known(&self) -> bool {
        self.rssi != RSSI_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_signal_quality() {
        assert_eq!(
            atat::serde_at::from_slice(b"+CSQ: 20,0"),
            Ok(SignalQuality { rssi: 20, ber: 0 })
        );
        assert_eq!(
            atat::serde_at::from_slice(b"+CSQ: 99,99\r\n"),
            Ok(SignalQuality { rssi: 99, ber: 99 })
        );
    }
}
