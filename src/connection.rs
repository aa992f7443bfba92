//! Bearer profile settings used to open an HTTP connection.

use embedded_io::{Read, ReadReady, Write};

use crate::{
    channel::CommandChannel,
    command::bearer::{
        types::{BearerCommandType, BearerParam, ConnectionRate, ConnectionType},
        SetBearerParameter, MAX_BEARER_VALUE_LEN,
    },
    error::Error,
    traits::Clock,
};

/// Highest bearer profile identifier accepted by AT+SAPBR.
pub const MAX_CID: u8 = 5;

/// Settings of one bearer profile.
///
/// Only the connection type is mandatory; every other parameter keeps the
/// value stored in the module when left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionSettings<'a> {
    pub cid: u8,
    pub connection_type: ConnectionType,
    pub apn: Option<&'a str>,
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub rate: Option<ConnectionRate>,
}

impl<'a> ConnectionSettings<'a> {
    pub fn new(cid: u8, connection_type: ConnectionType) -> Self {
        Self {
            cid,
            connection_type,
            apn: None,
            user: None,
            password: None,
            phone_number: None,
            rate: None,
        }
    }

    /// GPRS profile for the given access point.
    pub fn gprs(cid: u8, apn: &'a str) -> Self {
        Self::new(cid, ConnectionType::Gprs).apn(apn)
    }

    pub fn apn(self, apn: &'a str) -> Self {
        Self {
            apn: Some(apn),
            ..self
        }
    }

    pub fn credentials(self, user: &'a str, password: &'a str) -> Self {
        Self {
            user: Some(user),
            password: Some(password),
            ..self
        }
    }

    /// Number dialed for a CSD connection
    pub fn phone_number(self, phone_number: &'a str) -> Self {
        Self {
            phone_number: Some(phone_number),
            ..self
        }
    }

    pub fn rate(self, rate: ConnectionRate) -> Self {
        Self {
            rate: Some(rate),
            ..self
        }
    }

    /// Check every field at once, without touching the modem.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cid > MAX_CID {
            return Err(Error::InvalidCid);
        }

        let too_long = [self.apn, self.user, self.password, self.phone_number]
            .iter()
            .flatten()
            .any(|value| value.len() > MAX_BEARER_VALUE_LEN);

        if too_long {
            return Err(Error::CharacterLimitExceeded);
        }

        Ok(())
    }

    fn params(&self) -> impl Iterator<Item = (BearerParam, &'a str)> {
        [
            (BearerParam::ConnectionType, Some(self.connection_type.as_str())),
            (BearerParam::Apn, self.apn),
            (BearerParam::User, self.user),
            (BearerParam::Password, self.password),
            (BearerParam::PhoneNumber, self.phone_number),
            (BearerParam::Rate, self.rate.map(ConnectionRate::as_str)),
        ]
        .into_iter()
        .filter_map(|(param, value)| value.map(|v| (param, v)))
    }

    /// Write the profile to the module with one AT+SAPBR=3 per set field.
    pub(crate) fn apply<T, CLK>(&self, channel: &mut CommandChannel<T, CLK>) -> Result<(), Error>
    where
        T: Read + Write + ReadReady,
        CLK: Clock,
    {
        for (param, value) in self.params() {
            debug!("Setting bearer {} parameter {}", self.cid, param.tag());
            channel.send(&SetBearerParameter {
                cmd_type: BearerCommandType::SetParameter,
                cid: self.cid,
                tag: param.tag(),
                value,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_out_of_range() {
        assert_eq!(
            ConnectionSettings::gprs(7, "internet").validate(),
            Err(Error::InvalidCid)
        );
        assert_eq!(ConnectionSettings::gprs(5, "internet").validate(), Ok(()));
    }

    #[test]
    fn long_strings_are_rejected() {
        let long = "x".repeat(MAX_BEARER_VALUE_LEN + 1);
        assert_eq!(
            ConnectionSettings::gprs(1, "internet")
                .credentials("user", &long)
                .validate(),
            Err(Error::CharacterLimitExceeded)
        );

        let max = "x".repeat(MAX_BEARER_VALUE_LEN);
        assert_eq!(ConnectionSettings::gprs(1, &max).validate(), Ok(()));
    }

    #[test]
    fn only_set_fields_are_sent() {
        let settings = ConnectionSettings::new(2, ConnectionType::Csd)
            .phone_number("+4512345678")
            .rate(ConnectionRate::Bps9600);

        let params: Vec<_> = settings.params().collect();
        assert_eq!(
            params,
            [
                (BearerParam::ConnectionType, "CSD"),
                (BearerParam::PhoneNumber, "+4512345678"),
                (BearerParam::Rate, "2"),
            ]
        );
    }
}
