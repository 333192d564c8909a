//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use slirc_casefold::casefold_identity;
use thiserror::Error;

use super::{Config, MIN_NICKLEN};

/// Length of the random token substituted into the guest template.
const GUEST_TOKEN_LEN: usize = 13;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("limits.nicklen must be at least {min}, got {nicklen}")]
    NickLenTooShort { nicklen: usize, min: usize },
    #[error("guest_nickname_format must contain '*', got '{0}'")]
    GuestFormatMissingToken(String),
    #[error("guest_nickname_format does not produce a valid nickname: '{0}'")]
    GuestFormatInvalid(String),
    #[error("guest nicknames would be {len} characters, longer than limits.nicklen ({nicklen})")]
    GuestFormatTooLong { len: usize, nicklen: usize },
    #[error("reserved_nicks entry is not a valid nickname: '{0}'")]
    ReservedNickInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let nicklen = config.limits.nicklen;
    if nicklen < MIN_NICKLEN {
        errors.push(ValidationError::NickLenTooShort {
            nicklen,
            min: MIN_NICKLEN,
        });
    }

    let reservation = &config.accounts.nick_reservation;
    let format = &reservation.guest_nickname_format;
    if !format.contains('*') {
        errors.push(ValidationError::GuestFormatMissingToken(format.clone()));
    } else {
        let sample = reservation.guest_nick(&"a".repeat(GUEST_TOKEN_LEN));
        if casefold_identity(&sample).is_err() {
            errors.push(ValidationError::GuestFormatInvalid(format.clone()));
        }
        let len = sample.chars().count();
        if nicklen > 0 && len > nicklen {
            errors.push(ValidationError::GuestFormatTooLong { len, nicklen });
        }
    }

    for nick in &reservation.reserved_nicks {
        if casefold_identity(nick).is_err() {
            errors.push(ValidationError::ReservedNickInvalid(nick.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = Config::default();
        config.server.name.clear();
        config.limits.nicklen = 0;
        config.accounts.nick_reservation.reserved_nicks = vec!["#bad".to_string()];

        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::MissingServerName));
        assert!(matches!(
            errors[1],
            ValidationError::NickLenTooShort { nicklen: 0, min: MIN_NICKLEN }
        ));
        assert!(matches!(errors[2], ValidationError::ReservedNickInvalid(_)));
    }

    #[test]
    fn guest_format_checks() {
        let mut config = Config::default();
        config.accounts.nick_reservation.guest_nickname_format = "Guest".to_string();
        assert!(matches!(
            validate(&config).unwrap_err()[0],
            ValidationError::GuestFormatMissingToken(_)
        ));

        config.accounts.nick_reservation.guest_nickname_format = "-*".to_string();
        assert!(matches!(
            validate(&config).unwrap_err()[0],
            ValidationError::GuestFormatInvalid(_)
        ));

        config.accounts.nick_reservation.guest_nickname_format = "Guest-*".to_string();
        config.limits.nicklen = 12;
        assert!(matches!(
            validate(&config).unwrap_err()[0],
            ValidationError::GuestFormatTooLong { len: 19, nicklen: 12 }
        ));
    }

    #[test]
    fn nicklen_must_fit_a_derived_nick() {
        let mut config = Config::default();
        config.accounts.nick_reservation.guest_nickname_format = "G*".to_string();
        config.limits.nicklen = MIN_NICKLEN - 1;
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[0],
            ValidationError::NickLenTooShort { nicklen: 9, min: 10 }
        ));

        config.limits.nicklen = 14;
        assert!(validate(&config).is_ok());
    }
}
