//! Error types for Crosspost
//!
//! Provider failures are expressed as [`ErrorRecord`]s: one kind from a small
//! taxonomy, the HTTP status that produced it, a technical message for logs and
//! a pre-written message that is safe to show to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::messages;
use crate::provider::Provider;

pub type Result<T> = std::result::Result<T, CrosspostError>;

#[derive(Error, Debug)]
pub enum CrosspostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ErrorRecord),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP client error: {0}")]
    Transport(#[from] crate::transport::TransportError),
}

impl CrosspostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosspostError::InvalidInput(_) => 3,
            CrosspostError::Provider(record) if record.kind == ErrorKind::AuthRequired => 2,
            CrosspostError::Provider(_) => 1,
            CrosspostError::Config(_) => 1,
            CrosspostError::Transport(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failure kinds shared by every provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Credential missing, expired or rejected by the provider
    AuthRequired,
    /// Payload violates a client-side rule; nothing was sent
    ValidationError,
    /// Media exceeds the provider's size limit; nothing was sent
    ImageSizeError,
    /// Media type is not accepted by the provider; nothing was sent
    ImageFormatError,
    MediaUploadError,
    /// HTTP 429
    RateLimitError,
    /// Any other non-2xx response
    ApiError,
    /// No HTTP response was received
    NetworkError,
}

impl ErrorKind {
    /// Error code for this kind; provider API errors are named after the provider
    pub fn code(&self, provider: Provider) -> String {
        match self {
            ErrorKind::ApiError => format!("{}ApiError", provider.display_name()),
            other => other.as_str().to_string(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthRequired => "AuthRequired",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ImageSizeError => "ImageSizeError",
            ErrorKind::ImageFormatError => "ImageFormatError",
            ErrorKind::MediaUploadError => "MediaUploadError",
            ErrorKind::RateLimitError => "RateLimitError",
            ErrorKind::ApiError => "ApiError",
            ErrorKind::NetworkError => "NetworkError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a two-step media upload that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    /// Registering the upload with the provider
    Register,
    /// Sending the bytes to the provider-issued upload URL
    Transfer,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPhase::Register => write!(f, "register"),
            UploadPhase::Transfer => write!(f, "transfer"),
        }
    }
}

/// A classified provider failure
///
/// Constructed where the failure is detected inside a client and converted to a
/// [`crate::ProviderResult`] at the orchestrator boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub provider: Provider,
    pub kind: ErrorKind,
    /// HTTP status; 400 for client-side validation, 0 when no response arrived
    pub http_status: u16,
    pub technical_message: String,
    pub user_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_phase: Option<UploadPhase>,
}

impl ErrorRecord {
    /// Create a record whose user message is the provider's text for `kind`
    pub fn new(
        provider: Provider,
        kind: ErrorKind,
        http_status: u16,
        technical_message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            kind,
            http_status,
            technical_message: technical_message.into(),
            user_message: messages::kind_message(provider, kind).to_string(),
            upload_phase: None,
        }
    }

    /// Create a record whose user message is looked up from the technical message
    ///
    /// Unrecognized technical messages resolve to the provider's default text.
    pub fn friendly(
        provider: Provider,
        kind: ErrorKind,
        http_status: u16,
        technical_message: impl Into<String>,
    ) -> Self {
        let technical_message = technical_message.into();
        let user_message = messages::friendly_message(provider, &technical_message).to_string();
        Self {
            provider,
            kind,
            http_status,
            technical_message,
            user_message,
            upload_phase: None,
        }
    }

    /// Client-side validation failure (HTTP 400, nothing sent)
    pub fn validation(provider: Provider, technical_message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::ValidationError, 400, technical_message)
    }

    /// Missing or unusable credential
    pub fn auth_required(provider: Provider, technical_message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::AuthRequired, 401, technical_message)
    }

    /// Transport failure with no HTTP response
    ///
    /// `summary` is the canonical transport message used for the user-message
    /// lookup; `detail` only ends up in the technical message.
    pub fn network(provider: Provider, summary: &str, detail: &str) -> Self {
        let mut record = Self::friendly(provider, ErrorKind::NetworkError, 0, summary);
        if !detail.is_empty() {
            record.technical_message = format!("{}: {}", summary, detail);
        }
        record
    }

    /// Replace the technical message, keeping the user message already chosen
    pub fn with_technical(mut self, technical_message: impl Into<String>) -> Self {
        self.technical_message = technical_message.into();
        self
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = user_message.into();
        self
    }

    pub fn with_phase(mut self, phase: UploadPhase) -> Self {
        self.upload_phase = Some(phase);
        self
    }

    /// Error code, e.g. `AuthRequired` or `LinkedInApiError`
    pub fn code(&self) -> String {
        self.kind.code(self.provider)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (HTTP {}): {}",
            self.provider.display_name(),
            self.code(),
            self.http_status,
            self.technical_message
        )?;
        if let Some(phase) = self.upload_phase {
            write!(f, " [{} phase]", phase)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = CrosspostError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let record = ErrorRecord::auth_required(Provider::LinkedIn, "Invalid access token");
        let error = CrosspostError::Provider(record);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_provider_errors() {
        for kind in [
            ErrorKind::ValidationError,
            ErrorKind::ImageSizeError,
            ErrorKind::ImageFormatError,
            ErrorKind::MediaUploadError,
            ErrorKind::RateLimitError,
            ErrorKind::ApiError,
            ErrorKind::NetworkError,
        ] {
            let error = CrosspostError::Provider(ErrorRecord::new(Provider::WordPress, kind, 500, "x"));
            assert_eq!(error.exit_code(), 1, "{:?} should exit with code 1", kind);
        }
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = CrosspostError::Config(ConfigError::MissingField("linkedin.token_file".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_api_error_code_is_named_after_provider() {
        assert_eq!(ErrorKind::ApiError.code(Provider::Facebook), "FacebookApiError");
        assert_eq!(ErrorKind::ApiError.code(Provider::LinkedIn), "LinkedInApiError");
        assert_eq!(ErrorKind::ApiError.code(Provider::WordPress), "WordPressApiError");
        assert_eq!(ErrorKind::RateLimitError.code(Provider::LinkedIn), "RateLimitError");
    }

    #[test]
    fn test_new_uses_kind_message() {
        let record = ErrorRecord::new(Provider::LinkedIn, ErrorKind::ImageFormatError, 400, "bad");
        assert_eq!(
            record.user_message,
            "This image format isn't supported by LinkedIn"
        );
        assert_eq!(record.technical_message, "bad");
        assert_eq!(record.upload_phase, None);
    }

    #[test]
    fn test_unrecognized_technical_message_uses_default() {
        for provider in Provider::ALL {
            let record = ErrorRecord::friendly(
                provider,
                ErrorKind::NetworkError,
                0,
                "socket exploded in an unusual way",
            );
            assert_eq!(record.user_message, messages::default_message(provider));
            assert!(!record.user_message.is_empty());
        }
    }

    #[test]
    fn test_network_record_keeps_detail_in_technical_message() {
        let record = ErrorRecord::network(Provider::LinkedIn, "Failed to fetch", "dns error");
        assert_eq!(record.kind, ErrorKind::NetworkError);
        assert_eq!(record.http_status, 0);
        assert_eq!(record.technical_message, "Failed to fetch: dns error");
        assert_eq!(
            record.user_message,
            "We can't reach LinkedIn right now. Check your internet connection!"
        );
    }

    #[test]
    fn test_display_includes_code_and_phase() {
        let record = ErrorRecord::new(Provider::LinkedIn, ErrorKind::MediaUploadError, 500, "Failed to upload image")
            .with_phase(UploadPhase::Transfer);
        let message = record.to_string();
        assert!(message.contains("LinkedIn"));
        assert!(message.contains("MediaUploadError"));
        assert!(message.contains("HTTP 500"));
        assert!(message.contains("transfer phase"));
    }

    #[test]
    fn test_error_conversion_from_record() {
        let record = ErrorRecord::validation(Provider::Facebook, "Facebook page id is required");
        let error: CrosspostError = record.into();
        match error {
            CrosspostError::Provider(record) => assert_eq!(record.kind, ErrorKind::ValidationError),
            _ => panic!("Expected CrosspostError::Provider"),
        }
    }

    #[test]
    fn test_error_message_formatting_invalid_input() {
        let error = CrosspostError::InvalidInput("No providers selected".to_string());
        assert_eq!(error.to_string(), "Invalid input: No providers selected");
    }

    #[test]
    fn test_record_serializes_code_fields() {
        let record = ErrorRecord::auth_required(Provider::WordPress, "Invalid access token");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["provider"], "wordpress");
        assert_eq!(json["kind"], "AuthRequired");
        assert_eq!(json["http_status"], 401);
        assert!(json.get("upload_phase").is_none());
    }
}
