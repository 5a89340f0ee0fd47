//! Provider identities and their capability profiles
//!
//! A [`ProviderProfile`] carries everything that differs between providers at
//! the HTTP level: base URL, how the token is attached, extra headers, how
//! statuses map to error kinds, and the client-side validation limits. The
//! generic [`crate::client::ApiClient`] is parameterized by one of these.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, ErrorRecord};
use crate::types::{ImageMimeType, MediaFile, PostPayload};

/// Supported publishing providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Facebook,
    LinkedIn,
    WordPress,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Facebook, Provider::LinkedIn, Provider::WordPress];

    /// Lowercase identifier used in config files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Facebook => "facebook",
            Provider::LinkedIn => "linkedin",
            Provider::WordPress => "wordpress",
        }
    }

    /// Name as shown to users and used in error codes
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Facebook => "Facebook",
            Provider::LinkedIn => "LinkedIn",
            Provider::WordPress => "WordPress",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" | "fb" => Ok(Provider::Facebook),
            "linkedin" => Ok(Provider::LinkedIn),
            "wordpress" | "wordpress.com" | "wp" => Ok(Provider::WordPress),
            _ => Err(format!(
                "Unknown provider: '{}'. Valid options: facebook, linkedin, wordpress",
                s
            )),
        }
    }
}

/// How the access token travels with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    BearerHeader,
    /// Token in the named query parameter
    QueryParameter(&'static str),
}

/// Client-side media and post limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLimits {
    pub max_size: u64,
    pub allowed_types: &'static [ImageMimeType],
    pub max_per_post: usize,
}

const DEFAULT_STATUS_KINDS: &[(u16, ErrorKind)] = &[
    (401, ErrorKind::AuthRequired),
    (429, ErrorKind::RateLimitError),
];

/// Per-provider configuration for the generic API client
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub base_url: String,
    pub auth: AuthScheme,
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// Status codes with a dedicated kind; everything else non-2xx is an API error
    pub status_kinds: &'static [(u16, ErrorKind)],
    /// Provider error codes in the response body that mean the token is unusable
    pub auth_error_codes: &'static [i64],
    pub media: MediaLimits,
}

impl ProviderProfile {
    pub fn facebook() -> Self {
        Self {
            provider: Provider::Facebook,
            base_url: "https://graph.facebook.com/v19.0".to_string(),
            auth: AuthScheme::QueryParameter("access_token"),
            extra_headers: &[],
            status_kinds: DEFAULT_STATUS_KINDS,
            // Graph API reports expired or invalid OAuth tokens as HTTP 400 with these codes
            auth_error_codes: &[102, 190],
            media: MediaLimits {
                max_size: 4 * 1024 * 1024,
                allowed_types: &[
                    ImageMimeType::Jpeg,
                    ImageMimeType::Png,
                    ImageMimeType::Gif,
                    ImageMimeType::Bmp,
                    ImageMimeType::Tiff,
                ],
                max_per_post: 1,
            },
        }
    }

    pub fn linkedin() -> Self {
        Self {
            provider: Provider::LinkedIn,
            base_url: "https://api.linkedin.com/v2".to_string(),
            auth: AuthScheme::BearerHeader,
            extra_headers: &[("X-Restli-Protocol-Version", "2.0.0")],
            status_kinds: DEFAULT_STATUS_KINDS,
            auth_error_codes: &[],
            media: MediaLimits {
                max_size: 8 * 1024 * 1024,
                allowed_types: &[ImageMimeType::Jpeg, ImageMimeType::Png, ImageMimeType::Gif],
                max_per_post: 5,
            },
        }
    }

    pub fn wordpress() -> Self {
        Self {
            provider: Provider::WordPress,
            base_url: "https://public-api.wordpress.com/rest/v1.1".to_string(),
            auth: AuthScheme::BearerHeader,
            extra_headers: &[],
            status_kinds: DEFAULT_STATUS_KINDS,
            auth_error_codes: &[],
            media: MediaLimits {
                max_size: 10 * 1024 * 1024,
                allowed_types: &[
                    ImageMimeType::Jpeg,
                    ImageMimeType::Png,
                    ImageMimeType::Gif,
                    ImageMimeType::WebP,
                ],
                max_per_post: 20,
            },
        }
    }

    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Facebook => Self::facebook(),
            Provider::LinkedIn => Self::linkedin(),
            Provider::WordPress => Self::wordpress(),
        }
    }

    /// Point the profile at a different API root (trailing slashes are dropped)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Absolute URL for an API path such as `/me/accounts`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Error kind for a non-2xx status
    pub fn classify_status(&self, status: u16) -> ErrorKind {
        self.status_kinds
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::ApiError)
    }

    /// Check size then type of a media file against the provider limits
    pub fn validate_media(&self, file: &MediaFile) -> Result<(), ErrorRecord> {
        if file.size() > self.media.max_size {
            return Err(ErrorRecord::friendly(
                self.provider,
                ErrorKind::ImageSizeError,
                400,
                "Image too large",
            )
            .with_technical(format!(
                "Image exceeds maximum size ({} bytes, limit {} bytes)",
                file.size(),
                self.media.max_size
            )));
        }

        let accepted = ImageMimeType::from_mime_str(&file.mime_type)
            .map(|mime| self.media.allowed_types.contains(&mime))
            .unwrap_or(false);
        if !accepted {
            return Err(ErrorRecord::friendly(
                self.provider,
                ErrorKind::ImageFormatError,
                400,
                "Invalid image format",
            )
            .with_technical(format!("Invalid image format: {}", file.mime_type)));
        }

        Ok(())
    }

    /// Business rules every post must satisfy before anything is sent
    pub fn validate_payload(&self, payload: &PostPayload) -> Result<(), ErrorRecord> {
        if payload.is_empty() {
            return Err(ErrorRecord::validation(
                self.provider,
                "Post must contain either text or media",
            ));
        }

        if payload.media.len() > self.media.max_per_post {
            return Err(ErrorRecord::friendly(
                self.provider,
                ErrorKind::ValidationError,
                400,
                "Too many images",
            )
            .with_technical(format!(
                "Too many images in post ({}, limit {})",
                payload.media.len(),
                self.media.max_per_post
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaRef;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("facebook".parse::<Provider>().unwrap(), Provider::Facebook);
        assert_eq!("FB".parse::<Provider>().unwrap(), Provider::Facebook);
        assert_eq!("LinkedIn".parse::<Provider>().unwrap(), Provider::LinkedIn);
        assert_eq!("wp".parse::<Provider>().unwrap(), Provider::WordPress);
        let err = "myspace".parse::<Provider>().unwrap_err();
        assert!(err.contains("Unknown provider: 'myspace'"));
    }

    #[test]
    fn test_provider_display_and_serde() {
        assert_eq!(Provider::LinkedIn.to_string(), "linkedin");
        assert_eq!(Provider::WordPress.display_name(), "WordPress");
        assert_eq!(serde_json::to_value(Provider::WordPress).unwrap(), "wordpress");
    }

    #[test]
    fn test_classify_status() {
        for provider in Provider::ALL {
            let profile = ProviderProfile::for_provider(provider);
            assert_eq!(profile.classify_status(401), ErrorKind::AuthRequired);
            assert_eq!(profile.classify_status(429), ErrorKind::RateLimitError);
            assert_eq!(profile.classify_status(400), ErrorKind::ApiError);
            assert_eq!(profile.classify_status(403), ErrorKind::ApiError);
            assert_eq!(profile.classify_status(503), ErrorKind::ApiError);
        }
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let profile = ProviderProfile::wordpress().with_base_url("http://localhost:8080/rest/v1.1/");
        assert_eq!(profile.endpoint("/me"), "http://localhost:8080/rest/v1.1/me");
    }

    #[test]
    fn test_auth_schemes() {
        assert_eq!(ProviderProfile::facebook().auth, AuthScheme::QueryParameter("access_token"));
        assert_eq!(ProviderProfile::linkedin().auth, AuthScheme::BearerHeader);
        assert_eq!(ProviderProfile::wordpress().auth, AuthScheme::BearerHeader);
    }

    #[test]
    fn test_validate_media_size_limits() {
        let linkedin = ProviderProfile::linkedin();
        let at_limit = MediaFile::new("a.jpg", "image/jpeg", vec![0; 8 * 1024 * 1024]);
        assert!(linkedin.validate_media(&at_limit).is_ok());

        let over = MediaFile::new("a.jpg", "image/jpeg", vec![0; 8 * 1024 * 1024 + 1]);
        let err = linkedin.validate_media(&over).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ImageSizeError);
        assert_eq!(err.http_status, 400);
        assert!(err.user_message.contains("under 8MB"));

        let wordpress = ProviderProfile::wordpress();
        assert!(wordpress.validate_media(&over).is_ok());
        let over_wp = MediaFile::new("a.jpg", "image/jpeg", vec![0; 10 * 1024 * 1024 + 1]);
        assert_eq!(
            wordpress.validate_media(&over_wp).unwrap_err().kind,
            ErrorKind::ImageSizeError
        );
    }

    #[test]
    fn test_validate_media_formats() {
        let webp = MediaFile::new("a.webp", "image/webp", vec![1, 2, 3]);
        let err = ProviderProfile::linkedin().validate_media(&webp).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ImageFormatError);
        assert!(err.technical_message.contains("image/webp"));

        assert!(ProviderProfile::wordpress().validate_media(&webp).is_ok());

        let pdf = MediaFile::new("a.pdf", "application/pdf", vec![1]);
        for provider in Provider::ALL {
            let err = ProviderProfile::for_provider(provider).validate_media(&pdf).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ImageFormatError);
        }
    }

    #[test]
    fn test_size_is_checked_before_format() {
        let big_pdf = MediaFile::new("a.pdf", "application/pdf", vec![0; 9 * 1024 * 1024]);
        let err = ProviderProfile::linkedin().validate_media(&big_pdf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ImageSizeError);
    }

    #[test]
    fn test_validate_payload_empty() {
        for provider in Provider::ALL {
            let err = ProviderProfile::for_provider(provider)
                .validate_payload(&PostPayload::new(""))
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::ValidationError);
            assert_eq!(err.http_status, 400);
        }
    }

    #[test]
    fn test_validate_payload_media_count() {
        let mut payload = PostPayload::new("lots of pictures");
        for i in 0..6 {
            payload = payload.with_media(MediaRef::Asset(format!("urn:li:digitalmediaAsset:{}", i)));
        }
        let err = ProviderProfile::linkedin().validate_payload(&payload).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert!(err.user_message.contains("up to 5 images"));

        assert!(ProviderProfile::wordpress().validate_payload(&payload).is_ok());
    }
}
