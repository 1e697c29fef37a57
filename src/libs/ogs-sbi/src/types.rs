//! SBI Types and Constants
//!
//! Service names, NF types and the application error causes carried in
//! ProblemDetails by the UDM services.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SBI Service Types used by the UDM and its peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbiServiceType {
    NnrfOauth2,
    NudmSdm,
    NudmUecm,
    NudmEe,
    NudrDr,
}

impl SbiServiceType {
    /// Convert service type to service name string
    pub fn to_name(&self) -> &'static str {
        match self {
            Self::NnrfOauth2 => "nnrf-oauth2",
            Self::NudmSdm => "nudm-sdm",
            Self::NudmUecm => "nudm-uecm",
            Self::NudmEe => "nudm-ee",
            Self::NudrDr => "nudr-dr",
        }
    }

    /// Convert service name string to service type
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nnrf-oauth2" => Some(Self::NnrfOauth2),
            "nudm-sdm" => Some(Self::NudmSdm),
            "nudm-uecm" => Some(Self::NudmUecm),
            "nudm-ee" => Some(Self::NudmEe),
            "nudr-dr" => Some(Self::NudrDr),
            _ => None,
        }
    }
}

impl fmt::Display for SbiServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_name())
    }
}

/// NF Type enumeration - matches OpenAPI_nf_type_e
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfType {
    Nrf,
    Udm,
    Amf,
    Smf,
    Ausf,
    Nef,
    Pcf,
    Smsf,
    Udr,
}

impl NfType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Nrf => "NRF",
            Self::Udm => "UDM",
            Self::Amf => "AMF",
            Self::Smf => "SMF",
            Self::Ausf => "AUSF",
            Self::Nef => "NEF",
            Self::Pcf => "PCF",
            Self::Smsf => "SMSF",
            Self::Udr => "UDR",
        }
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// URI Scheme - matches OpenAPI_uri_scheme_e
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UriScheme {
    #[default]
    Http,
    Https,
}

impl UriScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application error causes (TS 29.500 / TS 29.503) carried in ProblemDetails.cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbiAppError {
    Unspecified,
    UserNotFound,
    SubscriptionNotFound,
    ContextNotFound,
    MandatoryIeIncorrect,
    UnspecifiedNfFailure,
    InvalidGuami,
    ModificationNotAllowed,
    DeregistrationNotificationError,
    SystemFailure,
}

impl SbiAppError {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            Self::ContextNotFound => "CONTEXT_NOT_FOUND",
            Self::MandatoryIeIncorrect => "MANDATORY_IE_INCORRECT",
            Self::UnspecifiedNfFailure => "UNSPECIFIED_NF_FAILURE",
            Self::InvalidGuami => "INVALID_GUAMI",
            Self::ModificationNotAllowed => "MODIFICATION_NOT_ALLOWED",
            Self::DeregistrationNotificationError => "DEREGISTRATION_NOTIFICATION_ERROR",
            Self::SystemFailure => "SYSTEM_FAILURE",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "UNSPECIFIED" => Some(Self::Unspecified),
            "USER_NOT_FOUND" => Some(Self::UserNotFound),
            "SUBSCRIPTION_NOT_FOUND" => Some(Self::SubscriptionNotFound),
            "CONTEXT_NOT_FOUND" => Some(Self::ContextNotFound),
            "MANDATORY_IE_INCORRECT" => Some(Self::MandatoryIeIncorrect),
            "UNSPECIFIED_NF_FAILURE" => Some(Self::UnspecifiedNfFailure),
            "INVALID_GUAMI" => Some(Self::InvalidGuami),
            "MODIFICATION_NOT_ALLOWED" => Some(Self::ModificationNotAllowed),
            "DEREGISTRATION_NOTIFICATION_ERROR" => Some(Self::DeregistrationNotificationError),
            "SYSTEM_FAILURE" => Some(Self::SystemFailure),
            _ => None,
        }
    }
}

impl fmt::Display for SbiAppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_conversion() {
        assert_eq!(SbiServiceType::NudmUecm.to_name(), "nudm-uecm");
        assert_eq!(SbiServiceType::from_name("nudm-ee"), Some(SbiServiceType::NudmEe));
        assert_eq!(SbiServiceType::from_name("invalid"), None);
    }

    #[test]
    fn test_nf_type_serde() {
        let json = serde_json::to_string(&NfType::Smsf).unwrap();
        assert_eq!(json, "\"SMSF\"");
        assert_eq!(NfType::Udm.to_string(), "UDM");
    }

    #[test]
    fn test_uri_scheme() {
        assert_eq!(UriScheme::Http.as_str(), "http");
        assert_eq!(UriScheme::Https.default_port(), 443);
    }

    #[test]
    fn test_app_error_conversion() {
        assert_eq!(SbiAppError::UserNotFound.to_str(), "USER_NOT_FOUND");
        assert_eq!(
            SbiAppError::from_str("DEREGISTRATION_NOTIFICATION_ERROR"),
            Some(SbiAppError::DeregistrationNotificationError)
        );
        assert_eq!(SbiAppError::from_str("NOPE"), None);
    }
}
