use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a phone number failed validation. Each code carries a message
/// for the current API and one matching the wording of the legacy v2
/// API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneErrorCode {
    // this catches numbers with the right length but wrong digits,
    // for example UK numbers cannot start "06" as that hasn't been
    // assigned to a purpose by ofcom
    InvalidNumber,
    TooLong,
    TooShort,
    NotAUkMobile,
    UnknownCharacter,
    UnsupportedCountryCode,
}

impl PhoneErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidNumber => {
                "Number is not valid \u{2013} double check the phone number you entered"
            }
            Self::TooLong => "Mobile number is too long",
            Self::TooShort => "Mobile number is too short",
            Self::NotAUkMobile => {
                "This does not look like a UK mobile number \u{2013} double check the mobile number you entered"
            }
            Self::UnknownCharacter => {
                "Mobile numbers can only include: 0 1 2 3 4 5 6 7 8 9 ( ) + -"
            }
            Self::UnsupportedCountryCode => {
                "Country code not found - double check the mobile number you entered"
            }
        }
    }

    pub fn legacy_v2_message(self) -> &'static str {
        match self {
            Self::InvalidNumber => {
                "Number is not valid \u{2013} double check the phone number you entered"
            }
            Self::TooLong => "Too many digits",
            Self::TooShort => "Not enough digits",
            Self::NotAUkMobile => "Not a UK mobile number",
            Self::UnknownCharacter => "Must not contain letters or symbols",
            Self::UnsupportedCountryCode => "Not a valid country prefix",
        }
    }
}

/// A recipient (email address, phone number or postal address) that
/// can't be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientError {
    InvalidEmail,
    InvalidPhone(PhoneErrorCode),
    InvalidAddress,
}

impl RecipientError {
    /// The message the v2 API returns for this error.
    pub fn v2_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Not a valid email address",
            Self::InvalidPhone(code) => code.legacy_v2_message(),
            Self::InvalidAddress => "Not a valid postal address",
        }
    }
}

impl fmt::Display for RecipientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "Not a valid email address"),
            Self::InvalidPhone(code) => write!(f, "{}", code.message()),
            Self::InvalidAddress => write!(f, "Not a valid postal address"),
        }
    }
}

impl std::error::Error for RecipientError {}

/// Errors from constructing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateError {
    WrongTemplateType { expected: String, actual: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongTemplateType { expected, actual } => {
                write!(
                    f,
                    "Cannot initialise a {expected} renderer with {actual} template_type"
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// A letter QR code holding more data than scans reliably at print
/// quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCodeTooLong {
    pub num_bytes: usize,
    pub max_bytes: usize,
    pub data: String,
}

impl fmt::Display for QrCodeTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Too much data for QR code (num_bytes={}, max_bytes={})",
            self.num_bytes, self.max_bytes
        )
    }
}

impl std::error::Error for QrCodeTooLong {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_error_messages_differ_between_apis() {
        assert_eq!(PhoneErrorCode::TooLong.message(), "Mobile number is too long");
        assert_eq!(PhoneErrorCode::TooLong.legacy_v2_message(), "Too many digits");
    }

    #[test]
    fn test_recipient_error_display() {
        assert_eq!(
            RecipientError::InvalidEmail.to_string(),
            "Not a valid email address"
        );
        assert_eq!(
            RecipientError::InvalidPhone(PhoneErrorCode::UnknownCharacter).to_string(),
            "Mobile numbers can only include: 0 1 2 3 4 5 6 7 8 9 ( ) + -"
        );
    }
}
