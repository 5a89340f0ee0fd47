//! Crosspost - publish one post to Facebook Pages, LinkedIn and WordPress.com
//!
//! This library provides a uniform publishing contract over the three
//! providers: client-side validation before any request, a shared error
//! taxonomy with user-facing messages, and a best-effort fan-out that reports
//! success or failure per provider.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod messages;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod transport;
pub mod types;

// Mock transport and publisher are available for all builds (not just tests) to support integration tests
pub mod mock;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{AccessCredential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{CrosspostError, ErrorKind, ErrorRecord, Result};
pub use orchestrator::{ProviderResult, PublishOrchestrator, PublishReport};
pub use provider::{Provider, ProviderProfile};
pub use providers::{build_publisher, Publisher};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    Container, Identity, MediaFile, MediaHandle, MediaRef, PostPayload, PublishedPost,
    TargetContainer, Visibility,
};
