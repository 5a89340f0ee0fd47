//! Provider clients and the publishing trait they share
//!
//! Each client wraps one [`ApiClient`] and is scoped to a single credential
//! for a single request. The only state a client keeps is its own cache
//! (user id, Page tokens), which is why the operations take `&mut self`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcrosspost::providers::{build_publisher, Publisher};
//! use libcrosspost::transport::ReqwestTransport;
//! use libcrosspost::{AccessCredential, PostPayload, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::new("crosspost/0.1")?);
//! let mut linkedin = build_publisher(Provider::LinkedIn, AccessCredential::new("token"), transport);
//! let post = linkedin.publish(&PostPayload::new("Hello, LinkedIn!")).await?;
//! println!("Posted: {:?}", post.id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::credentials::AccessCredential;
use crate::error::{ErrorKind, ErrorRecord};
use crate::provider::{Provider, ProviderProfile};
use crate::transport::HttpTransport;
use crate::types::{Container, Identity, PostPayload, PublishedPost};

pub mod facebook;
pub mod linkedin;
pub mod wordpress;

pub use facebook::FacebookClient;
pub use linkedin::LinkedInClient;
pub use wordpress::WordPressClient;

/// Uniform publishing interface over the provider clients
///
/// Every operation returns its success value or exactly one [`ErrorRecord`].
#[async_trait]
pub trait Publisher: Send + Sync {
    fn provider(&self) -> Provider;

    /// Account behind the credential; caches the provider user id
    async fn identity(&mut self) -> Result<Identity, ErrorRecord>;

    /// Publishing targets available to the account
    async fn containers(&mut self) -> Result<Vec<Container>, ErrorRecord>;

    /// Full publish path: identity if needed, media uploads, then the post
    async fn publish(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord>;
}

/// Reclassify a failed upload request
///
/// Auth, rate-limit and network failures keep their kind; any other API
/// failure is reported as `MediaUploadError`.
pub(crate) fn upload_failure(record: ErrorRecord) -> ErrorRecord {
    match record.kind {
        ErrorKind::ApiError => {
            let technical = record.technical_message.clone();
            ErrorRecord::new(record.provider, ErrorKind::MediaUploadError, record.http_status, technical)
        }
        _ => record,
    }
}

pub(crate) fn is_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

/// Build the client for `provider` against its production API
pub fn build_publisher(
    provider: Provider,
    credential: AccessCredential,
    transport: Arc<dyn HttpTransport>,
) -> Box<dyn Publisher> {
    build_publisher_with_profile(ProviderProfile::for_provider(provider), credential, transport)
}

/// Build the client for the profile's provider, e.g. with a different base URL
pub fn build_publisher_with_profile(
    profile: ProviderProfile,
    credential: AccessCredential,
    transport: Arc<dyn HttpTransport>,
) -> Box<dyn Publisher> {
    let provider = profile.provider;
    let api = ApiClient::new(profile, credential, transport);
    match provider {
        Provider::Facebook => Box::new(FacebookClient::from_api(api)),
        Provider::LinkedIn => Box::new(LinkedInClient::from_api(api)),
        Provider::WordPress => Box::new(WordPressClient::from_api(api)),
    }
}
