//! Access credentials and where they come from
//!
//! OAuth and account linking happen outside this crate. A [`CredentialStore`]
//! hands out one [`AccessCredential`] per provider for the duration of a
//! request; clients never persist or share them.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::ErrorRecord;
use crate::provider::Provider;

/// Bearer token plus the provider-assigned user id, when already known
pub struct AccessCredential {
    token: SecretString,
    user_id: Option<String>,
}

impl AccessCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// True when no token is present at all
    pub fn is_empty(&self) -> bool {
        self.token.expose_secret().trim().is_empty()
    }
}

impl Clone for AccessCredential {
    fn clone(&self) -> Self {
        Self {
            token: SecretString::from(self.token.expose_secret().to_string()),
            user_id: self.user_id.clone(),
        }
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Source of per-provider credentials for the current user
pub trait CredentialStore: Send + Sync {
    /// Credential for `provider`, or `AuthRequired` when none is available
    fn credential(&self, provider: Provider) -> Result<AccessCredential, ErrorRecord>;
}

/// Reads tokens from the files named in the configuration
pub struct FileCredentialStore {
    token_files: HashMap<Provider, String>,
    user_ids: HashMap<Provider, String>,
}

impl FileCredentialStore {
    pub fn from_config(config: &Config) -> Self {
        let mut token_files = HashMap::new();
        let mut user_ids = HashMap::new();

        if let Some(facebook) = &config.facebook {
            token_files.insert(Provider::Facebook, facebook.token_file.clone());
        }
        if let Some(linkedin) = &config.linkedin {
            token_files.insert(Provider::LinkedIn, linkedin.token_file.clone());
            if let Some(user_id) = &linkedin.user_id {
                user_ids.insert(Provider::LinkedIn, user_id.clone());
            }
        }
        if let Some(wordpress) = &config.wordpress {
            token_files.insert(Provider::WordPress, wordpress.token_file.clone());
        }

        Self {
            token_files,
            user_ids,
        }
    }

    fn token_path(&self, provider: Provider) -> Result<PathBuf, ErrorRecord> {
        let raw = self.token_files.get(&provider).ok_or_else(|| {
            ErrorRecord::auth_required(
                provider,
                format!("No token file configured for {}", provider),
            )
        })?;

        let expanded = shellexpand::full(raw).map_err(|e| {
            ErrorRecord::auth_required(
                provider,
                format!("Failed to expand token file path: {}", e),
            )
        })?;

        Ok(PathBuf::from(expanded.as_ref()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn credential(&self, provider: Provider) -> Result<AccessCredential, ErrorRecord> {
        let path = self.token_path(provider)?;

        let token = std::fs::read_to_string(&path)
            .map_err(|e| {
                ErrorRecord::auth_required(
                    provider,
                    format!(
                        "Failed to read {} token file {}: {}",
                        provider.display_name(),
                        path.display(),
                        e
                    ),
                )
            })?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(ErrorRecord::auth_required(
                provider,
                format!("{} token file is empty", provider.display_name()),
            ));
        }

        let credential = AccessCredential::new(token);
        Ok(match self.user_ids.get(&provider) {
            Some(user_id) => credential.with_user_id(user_id.clone()),
            None => credential,
        })
    }
}

/// In-memory credentials, for embedding callers that already resolved tokens
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    credentials: HashMap<Provider, AccessCredential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: Provider, credential: AccessCredential) {
        self.credentials.insert(provider, credential);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn credential(&self, provider: Provider) -> Result<AccessCredential, ErrorRecord> {
        self.credentials.get(&provider).cloned().ok_or_else(|| {
            ErrorRecord::auth_required(provider, format!("No credential linked for {}", provider))
        })
    }
}
