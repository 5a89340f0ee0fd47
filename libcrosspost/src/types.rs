//! Core types for Crosspost

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Media Types
// ============================================================================

/// Image MIME types known to at least one provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

impl ImageMimeType {
    /// Parse MIME type from a MIME string (e.g., "image/jpeg")
    pub fn from_mime_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            "image/bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Get the MIME type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw media to upload, with size and MIME type known before sending
///
/// The bytes are reference counted so payloads can be handed to several
/// providers without copying the file.
#[derive(Clone)]
pub struct MediaFile {
    pub file_name: String,
    /// MIME type as declared by the caller; checked against provider limits
    pub mime_type: String,
    data: Arc<[u8]>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: Arc::from(data),
        }
    }

    /// Read a file from disk, detecting the MIME type from its extension
    ///
    /// Unknown extensions are tagged `application/octet-stream` and will be
    /// rejected by provider validation rather than here.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMimeType::from_extension)
            .map(|mime| mime.as_str())
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, mime_type, data))
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the bytes, for request bodies
    pub fn data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Media attached to a post
#[derive(Debug, Clone)]
pub enum MediaRef {
    /// Bytes that still need to be uploaded
    Upload(MediaFile),
    /// A handle from an earlier upload: LinkedIn asset URN, Facebook photo id
    /// or public image URL, WordPress media id or URL
    Asset(String),
}

/// Handle returned by a successful media upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ============================================================================
// Post Types
// ============================================================================

/// Audience of a post (LinkedIn member network visibility)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    LoggedIn,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Connections => "CONNECTIONS",
            Visibility::LoggedIn => "LOGGED_IN",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "public" => Ok(Visibility::Public),
            "connections" => Ok(Visibility::Connections),
            "logged_in" => Ok(Visibility::LoggedIn),
            _ => Err(format!(
                "Invalid visibility: '{}'. Valid options: public, connections, logged-in",
                s
            )),
        }
    }
}

/// Provider-specific publishing target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetContainer {
    FacebookPage {
        page_id: String,
    },
    #[serde(rename = "wordpress_site")]
    WordPressSite {
        site_id: u64,
        /// Parent page for hierarchical pages
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<u64>,
    },
}

/// One logical post, before it is turned into provider requests
#[derive(Debug, Clone, Default)]
pub struct PostPayload {
    pub text: String,
    /// Post title (WordPress only)
    pub title: Option<String>,
    pub media: Vec<MediaRef>,
    pub visibility: Option<Visibility>,
    pub target: Option<TargetContainer>,
}

impl PostPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_target(mut self, target: TargetContainer) -> Self {
        self.target = Some(target);
        self
    }

    /// True when there is neither text nor media
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.media.is_empty()
    }
}

/// A post the provider accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A publishing target offered for selection (Facebook Page, WordPress site or page)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Account the credential belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
