//! Multi-provider publishing
//!
//! The orchestrator runs every selected provider's publish path concurrently
//! and collects one [`ProviderResult`] per provider. A failing provider never
//! affects another, and nothing is rolled back when some providers fail.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::error::{CrosspostError, ErrorRecord, Result, UploadPhase};
use crate::provider::Provider;
use crate::providers::{build_publisher, Publisher};
use crate::transport::HttpTransport;
use crate::types::{PostPayload, PublishedPost, TargetContainer};

/// Outcome of publishing to a single provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderResult {
    pub provider: Provider,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PublishedPost>,
    /// e.g. `AuthRequired`, `LinkedInApiError`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_phase: Option<UploadPhase>,
}

impl ProviderResult {
    pub fn succeeded(provider: Provider, post: PublishedPost) -> Self {
        Self {
            provider,
            success: true,
            data: Some(post),
            error_code: None,
            http_status: None,
            user_message: None,
            technical_message: None,
            upload_phase: None,
        }
    }

    pub fn failed(record: ErrorRecord) -> Self {
        Self {
            provider: record.provider,
            success: false,
            data: None,
            error_code: Some(record.code()),
            http_status: Some(record.http_status),
            user_message: Some(record.user_message),
            technical_message: Some(record.technical_message),
            upload_phase: record.upload_phase,
        }
    }
}

/// Aggregated outcome of one publish call
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub results: BTreeMap<Provider, ProviderResult>,
}

impl PublishReport {
    pub fn get(&self, provider: Provider) -> Option<&ProviderResult> {
        self.results.get(&provider)
    }

    /// At least one provider accepted the post
    pub fn overall_success(&self) -> bool {
        self.results.values().any(|r| r.success)
    }

    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty() && self.results.values().all(|r| r.success)
    }

    pub fn failures(&self) -> Vec<&ProviderResult> {
        self.results.values().filter(|r| !r.success).collect()
    }
}

struct Selection {
    publisher: Box<dyn Publisher>,
    target: Option<TargetContainer>,
}

/// Fans one post out to the selected providers
#[derive(Default)]
pub struct PublishOrchestrator {
    selected: Vec<Selection>,
    /// Providers selected but not usable (e.g. no credential); reported as failures
    unavailable: Vec<ErrorRecord>,
}

impl PublishOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a provider client, optionally with its publishing target
    pub fn add(&mut self, publisher: Box<dyn Publisher>, target: Option<TargetContainer>) {
        self.selected.push(Selection { publisher, target });
    }

    /// Select a provider that cannot publish; it is reported with `record`
    pub fn add_unavailable(&mut self, record: ErrorRecord) {
        self.unavailable.push(record);
    }

    /// Select a provider using a credential from `store`
    ///
    /// A missing credential does not fail the selection: the provider is
    /// reported as `AuthRequired` without any request being made.
    pub fn add_provider(
        &mut self,
        provider: Provider,
        store: &dyn CredentialStore,
        transport: Arc<dyn HttpTransport>,
        target: Option<TargetContainer>,
    ) {
        match store.credential(provider) {
            Ok(credential) => self.add(build_publisher(provider, credential, transport), target),
            Err(record) => {
                warn!(provider = %provider, "No usable credential: {}", record.technical_message);
                self.add_unavailable(record);
            }
        }
    }

    /// Selected providers in selection order
    pub fn providers(&self) -> Vec<Provider> {
        self.selected
            .iter()
            .map(|s| s.publisher.provider())
            .chain(self.unavailable.iter().map(|r| r.provider))
            .collect()
    }

    fn check_selection(&self) -> Result<()> {
        let providers = self.providers();
        if providers.is_empty() {
            return Err(CrosspostError::InvalidInput("No providers selected".to_string()));
        }

        let mut seen = BTreeSet::new();
        for provider in providers {
            if !seen.insert(provider) {
                return Err(CrosspostError::InvalidInput(format!(
                    "Provider selected more than once: {}",
                    provider
                )));
            }
        }
        Ok(())
    }

    /// Publish `payload` to every selected provider concurrently
    ///
    /// Only a misconfigured selection is an error; provider failures are
    /// reported inside the [`PublishReport`].
    pub async fn publish(&mut self, payload: &PostPayload) -> Result<PublishReport> {
        self.check_selection()?;

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(report = %id, providers = ?self.providers(), "Publishing post");

        let futures: Vec<_> = self
            .selected
            .iter_mut()
            .map(|selection| {
                let payload = match &selection.target {
                    Some(target) => payload.clone().with_target(target.clone()),
                    None => payload.clone(),
                };
                async move {
                    let provider = selection.publisher.provider();
                    match selection.publisher.publish(&payload).await {
                        Ok(post) => {
                            info!(provider = %provider, post_id = ?post.id, "Published");
                            ProviderResult::succeeded(provider, post)
                        }
                        Err(record) => {
                            warn!(provider = %provider, code = %record.code(), "Failed to publish: {}", record);
                            ProviderResult::failed(record)
                        }
                    }
                }
            })
            .collect();

        let mut results: BTreeMap<Provider, ProviderResult> = self
            .unavailable
            .iter()
            .cloned()
            .map(|record| (record.provider, ProviderResult::failed(record)))
            .collect();
        for result in join_all(futures).await {
            results.insert(result.provider, result);
        }

        Ok(PublishReport {
            id,
            started_at,
            results,
        })
    }
}
