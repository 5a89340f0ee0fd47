//! Facebook Pages via the Graph API
//!
//! Posts are made as the Page, using the Page access token from the
//! `/me/accounts` listing of the user credential. The token travels as the
//! `access_token` query parameter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{is_url, upload_failure, Publisher};
use crate::client::ApiClient;
use crate::credentials::AccessCredential;
use crate::error::{ErrorKind, ErrorRecord};
use crate::provider::{Provider, ProviderProfile};
use crate::transport::{FormPart, HttpTransport, Method};
use crate::types::{
    Container, Identity, MediaFile, MediaHandle, MediaRef, PostPayload, PublishedPost,
    TargetContainer,
};

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Listing<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct PageEntry {
    id: String,
    name: String,
    access_token: Option<String>,
    link: Option<String>,
}

#[derive(Deserialize)]
struct CreatedObject {
    id: Option<String>,
    post_id: Option<String>,
}

/// A Page the user manages
struct ManagedPage {
    id: String,
    name: String,
    link: Option<String>,
    token: Option<SecretString>,
}

impl From<PageEntry> for ManagedPage {
    fn from(entry: PageEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            link: entry.link,
            token: entry.access_token.map(SecretString::from),
        }
    }
}

impl ManagedPage {
    fn to_container(&self) -> Container {
        Container {
            id: self.id.clone(),
            name: self.name.clone(),
            url: Some(
                self.link
                    .clone()
                    .unwrap_or_else(|| format!("https://www.facebook.com/{}", self.id)),
            ),
        }
    }
}

pub struct FacebookClient {
    api: ApiClient,
    identity: Option<Identity>,
    pages: Option<Vec<ManagedPage>>,
}

impl FacebookClient {
    pub fn new(credential: AccessCredential, transport: Arc<dyn HttpTransport>) -> Self {
        Self::from_api(ApiClient::new(ProviderProfile::facebook(), credential, transport))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self {
            api,
            identity: None,
            pages: None,
        }
    }

    pub async fn get_identity(&mut self) -> Result<Identity, ErrorRecord> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        self.api.ensure_credential()?;

        let request = self.api.request(Method::Get, "/me").query("fields", "id,name");
        let user: UserResponse = self.api.send_json(request).await?;
        let identity = Identity {
            id: user.id,
            name: user.name,
            email: None,
        };
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Pages the user manages (refreshes the Page token cache)
    pub async fn list_containers(&mut self) -> Result<Vec<Container>, ErrorRecord> {
        self.api.ensure_credential()?;

        let request = self
            .api
            .request(Method::Get, "/me/accounts")
            .query("fields", "id,name,access_token,link");
        let listing: Listing<PageEntry> = self.api.send_json(request).await?;
        let pages: Vec<ManagedPage> = listing.data.into_iter().map(ManagedPage::from).collect();

        debug!("Facebook credential manages {} page(s)", pages.len());
        let containers = pages.iter().map(ManagedPage::to_container).collect();
        self.pages = Some(pages);
        Ok(containers)
    }

    /// Token to act as `page_id`
    ///
    /// Pages missing from the listing, or listed without a token, fall back to
    /// the user credential.
    async fn page_token(&mut self, page_id: &str) -> Result<String, ErrorRecord> {
        if self.pages.is_none() {
            self.list_containers().await?;
        }

        let listed = self
            .pages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|page| page.id == page_id)
            .and_then(|page| page.token.as_ref());

        match listed {
            Some(token) => Ok(token.expose_secret().to_string()),
            None => {
                debug!(page_id, "No Page token listed, using the user credential");
                Ok(self.api.credential().token().to_string())
            }
        }
    }

    /// Upload an unpublished photo to the Page, for attaching to a later post
    pub async fn upload_media(&mut self, page_id: &str, file: &MediaFile) -> Result<MediaHandle, ErrorRecord> {
        self.api.profile().validate_media(file)?;
        self.api.ensure_credential()?;

        let token = self.page_token(page_id).await?;
        let request = self
            .api
            .request_with_token(Method::Post, &format!("/{}/photos", page_id), &token)
            .multipart(vec![
                source_part(file),
                FormPart::Text {
                    name: "published".to_string(),
                    value: "false".to_string(),
                },
            ]);

        let created: CreatedObject = self.api.send_json(request).await.map_err(upload_failure)?;
        let id = created.id.ok_or_else(|| {
            ErrorRecord::new(
                Provider::Facebook,
                ErrorKind::MediaUploadError,
                200,
                "Photo upload response did not include an id",
            )
        })?;
        Ok(MediaHandle { id, url: None })
    }

    /// Publish to the Page named by the payload's target
    ///
    /// A photo post goes to `/{page}/photos`; an unpublished photo id is
    /// attached to a `/{page}/feed` post; text-only posts go to the feed.
    pub async fn create_post(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord> {
        let profile = self.api.profile();
        profile.validate_payload(payload)?;
        for media in &payload.media {
            if let MediaRef::Upload(file) = media {
                profile.validate_media(file)?;
            }
        }

        let page_id = match &payload.target {
            Some(TargetContainer::FacebookPage { page_id }) if !page_id.trim().is_empty() => {
                page_id.clone()
            }
            _ => {
                return Err(ErrorRecord::validation(
                    Provider::Facebook,
                    "A Facebook Page must be selected",
                ))
            }
        };
        self.api.ensure_credential()?;

        let token = self.page_token(&page_id).await?;
        let request = match payload.media.first() {
            None => self
                .api
                .request_with_token(Method::Post, &format!("/{}/feed", page_id), &token)
                .json(message_body(&payload.text)),
            Some(MediaRef::Asset(url)) if is_url(url) => {
                let mut body = message_body(&payload.text);
                body["url"] = json!(url);
                self.api
                    .request_with_token(Method::Post, &format!("/{}/photos", page_id), &token)
                    .json(body)
            }
            Some(MediaRef::Asset(photo_id)) => {
                let mut body = message_body(&payload.text);
                body["attached_media"] = json!([{ "media_fbid": photo_id }]);
                self.api
                    .request_with_token(Method::Post, &format!("/{}/feed", page_id), &token)
                    .json(body)
            }
            Some(MediaRef::Upload(file)) => {
                let mut parts = vec![source_part(file)];
                if !payload.text.trim().is_empty() {
                    parts.push(FormPart::Text {
                        name: "message".to_string(),
                        value: payload.text.clone(),
                    });
                }
                self.api
                    .request_with_token(Method::Post, &format!("/{}/photos", page_id), &token)
                    .multipart(parts)
            }
        };

        let created: CreatedObject = self.api.send_json(request).await?;
        let id = created.post_id.or(created.id);
        info!(page_id = %page_id, post_id = ?id, "Published to Facebook Page");

        Ok(PublishedPost {
            url: id.as_ref().map(|id| format!("https://www.facebook.com/{}", id)),
            id,
        })
    }
}

fn message_body(text: &str) -> Value {
    let mut body = Map::new();
    if !text.trim().is_empty() {
        body.insert("message".to_string(), json!(text));
    }
    Value::Object(body)
}

fn source_part(file: &MediaFile) -> FormPart {
    FormPart::File {
        name: "source".to_string(),
        file_name: file.file_name.clone(),
        content_type: file.mime_type.clone(),
        data: file.data(),
    }
}

#[async_trait]
impl Publisher for FacebookClient {
    fn provider(&self) -> Provider {
        Provider::Facebook
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
