//! LinkedIn member posts via the v2 REST API
//!
//! Images go through a two-step flow: the upload is registered, which yields
//! an asset URN and a one-off upload URL, then the bytes are sent to that URL.
//! [`RegisteredUpload`] and [`UploadedAsset`] make the order explicit: only
//! an uploaded asset can be attached to a post.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::Publisher;
use crate::client::ApiClient;
use crate::credentials::AccessCredential;
use crate::error::{ErrorKind, ErrorRecord, UploadPhase};
use crate::provider::{Provider, ProviderProfile};
use crate::transport::{HttpTransport, Method};
use crate::types::{
    Container, Identity, MediaFile, MediaHandle, MediaRef, PostPayload, PublishedPost, Visibility,
};

const IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct RegisterUploadResponse {
    value: RegisterUploadValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUploadValue {
    upload_mechanism: UploadMechanism,
    asset: String,
}

#[derive(Deserialize)]
struct UploadMechanism {
    #[serde(rename = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")]
    http_request: UploadHttpRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadHttpRequest {
    upload_url: String,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: Option<String>,
}

/// An upload LinkedIn has registered but not yet received bytes for
#[derive(Debug)]
pub struct RegisteredUpload {
    pub asset: String,
    upload_url: String,
}

/// An asset whose bytes LinkedIn accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub asset: String,
}

impl RegisteredUpload {
    /// Send the file to the registered upload URL
    ///
    /// Every failure here, including transport failures, is a
    /// `MediaUploadError` in the transfer phase.
    pub async fn transfer(self, api: &ApiClient, file: &MediaFile) -> Result<UploadedAsset, ErrorRecord> {
        let request = api
            .request_url(Method::Post, &self.upload_url)
            .binary(file.mime_type.clone(), file.data());

        let response = api
            .send_raw(request)
            .await
            .map_err(|e| transfer_failed(e.http_status, &e.technical_message))?;
        if !response.is_success() {
            return Err(transfer_failed(
                response.status,
                &format!("upload URL answered HTTP {}", response.status),
            ));
        }

        debug!(asset = %self.asset, bytes = file.size(), "LinkedIn image transferred");
        Ok(UploadedAsset { asset: self.asset })
    }
}

fn transfer_failed(status: u16, detail: &str) -> ErrorRecord {
    ErrorRecord::new(
        Provider::LinkedIn,
        ErrorKind::MediaUploadError,
        status,
        format!("Failed to upload image: {}", detail),
    )
    .with_phase(UploadPhase::Transfer)
}

/// Body for `/ugcPosts`; `media` holds asset URNs
fn ugc_post_body(author: &str, text: &str, media: &[String], visibility: Visibility) -> Value {
    let category = if media.is_empty() { "NONE" } else { "IMAGE" };
    let mut share = json!({
        "shareCommentary": { "text": text },
        "shareMediaCategory": category,
    });
    if !media.is_empty() {
        share["media"] = media
            .iter()
            .map(|urn| json!({ "status": "READY", "media": urn }))
            .collect();
    }

    json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": { "com.linkedin.ugc.ShareContent": share },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": visibility.as_str() },
    })
}

pub struct LinkedInClient {
    api: ApiClient,
    user_id: Option<String>,
    identity: Option<Identity>,
}

impl LinkedInClient {
    pub fn new(credential: AccessCredential, transport: Arc<dyn HttpTransport>) -> Self {
        Self::from_api(ApiClient::new(ProviderProfile::linkedin(), credential, transport))
    }

    pub fn from_api(api: ApiClient) -> Self {
        let user_id = api.credential().user_id().map(str::to_string);
        Self {
            api,
            user_id,
            identity: None,
        }
    }

    pub async fn get_identity(&mut self) -> Result<Identity, ErrorRecord> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        self.api.ensure_credential()?;

        let info: UserInfo = self
            .api
            .send_json(self.api.request(Method::Get, "/userinfo"))
            .await?;
        let identity = Identity {
            id: info.sub,
            name: info.name,
            email: info.email,
        };
        self.user_id = Some(identity.id.clone());
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Member id, from the credential or an identity lookup
    pub async fn user_id(&mut self) -> Result<String, ErrorRecord> {
        match &self.user_id {
            Some(id) => Ok(id.clone()),
            None => Ok(self.get_identity().await?.id),
        }
    }

    async fn author_urn(&mut self) -> Result<String, ErrorRecord> {
        Ok(format!("urn:li:person:{}", self.user_id().await?))
    }

    /// LinkedIn has no container listing; the member's own feed is the only target
    pub async fn list_containers(&mut self) -> Result<Vec<Container>, ErrorRecord> {
        let identity = self.get_identity().await?;
        Ok(vec![Container {
            id: format!("urn:li:person:{}", identity.id),
            name: identity.name.unwrap_or_else(|| "LinkedIn feed".to_string()),
            url: None,
        }])
    }

    pub async fn register_upload(&mut self) -> Result<RegisteredUpload, ErrorRecord> {
        let owner = self.author_urn().await?;
        let body = json!({
            "registerUploadRequest": {
                "recipes": [IMAGE_RECIPE],
                "owner": owner,
                "serviceRelationships": [{
                    "relationshipType": "OWNER",
                    "identifier": "urn:li:userGeneratedContent"
                }]
            }
        });
        let request = self
            .api
            .request(Method::Post, "/assets")
            .query("action", "registerUpload")
            .json(body);

        let registered: RegisterUploadResponse = self
            .api
            .send_json(request)
            .await
            .map_err(|e| e.with_phase(UploadPhase::Register))?;

        debug!(asset = %registered.value.asset, "LinkedIn upload registered");
        Ok(RegisteredUpload {
            asset: registered.value.asset,
            upload_url: registered.value.upload_mechanism.http_request.upload_url,
        })
    }

    async fn upload_validated(&mut self, file: &MediaFile) -> Result<UploadedAsset, ErrorRecord> {
        let registered = self.register_upload().await?;
        registered.transfer(&self.api, file).await
    }

    /// Register and transfer one image; returns the asset URN
    pub async fn upload_media(&mut self, file: &MediaFile) -> Result<MediaHandle, ErrorRecord> {
        self.api.profile().validate_media(file)?;
        self.api.ensure_credential()?;

        let uploaded = self.upload_validated(file).await?;
        Ok(MediaHandle {
            id: uploaded.asset,
            url: None,
        })
    }

    pub async fn create_post(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord> {
        let profile = self.api.profile();
        profile.validate_payload(payload)?;
        for media in &payload.media {
            if let MediaRef::Upload(file) = media {
                profile.validate_media(file)?;
            }
        }
        self.api.ensure_credential()?;

        let author = self.author_urn().await?;

        let mut assets = Vec::with_capacity(payload.media.len());
        for media in &payload.media {
            match media {
                MediaRef::Upload(file) => assets.push(self.upload_validated(file).await?.asset),
                MediaRef::Asset(urn) => assets.push(urn.clone()),
            }
        }

        let body = ugc_post_body(
            &author,
            &payload.text,
            &assets,
            payload.visibility.unwrap_or_default(),
        );
        let response = self
            .api
            .send(self.api.request(Method::Post, "/ugcPosts").json(body))
            .await?;

        let created: Option<CreatedPost> = self.api.parse_json(&response).unwrap_or(None);
        let id = created
            .and_then(|post| post.id)
            .or_else(|| response.header("x-restli-id").map(str::to_string));
        info!(post_id = ?id, images = assets.len(), "Published to LinkedIn");

        Ok(PublishedPost {
            url: id
                .as_ref()
                .map(|id| format!("https://www.linkedin.com/feed/update/{}", id)),
            id,
        })
    }
}

#[async_trait]
impl Publisher for LinkedInClient {
    fn provider(&self) -> Provider {
        Provider::LinkedIn
    }

    async fn identity(&mut self) -> Result<Identity, ErrorRecord> {
        self.get_identity().await
    }

    async fn containers(&mut self) -> Result<Vec<Container>, ErrorRecord> {
        self.list_containers().await
    }

    async fn publish(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord> {
        self.create_post(payload).await
    }
}
