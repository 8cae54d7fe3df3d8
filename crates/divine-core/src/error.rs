//! Error taxonomy for the dashboard core.
//!
//! `ValidationError` is raised before any remote call; `GatewayError` wraps every
//! failure of the external AI service (parse failures included).

use thiserror::Error;

/// Rejected before any call is made. Surfaces as a no-op / disabled control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    #[error("a file is required")]
    MissingFile,

    #[error("{feature} already has a submission in flight")]
    Busy { feature: &'static str },
}

/// Failure of the external AI service, caught at the gateway boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no API key configured (set GEMINI_API_KEY or gateway.api_key)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Structured result did not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    #[error("no media in response: {0}")]
    NoMedia(String),

    #[error("media job still running after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl GatewayError {
    pub fn is_parse(&self) -> bool {
        matches!(self, GatewayError::Parse(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_errors_become_parse_errors() {
        let err: GatewayError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(err.is_parse());
    }

    #[test]
    fn validation_messages_name_the_field() {
        let e = ValidationError::EmptyInput { field: "prompt" };
        assert_eq!(e.to_string(), "prompt must not be empty");
    }
}
