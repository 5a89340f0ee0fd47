//! WordPress.com sites via the public REST API (v1.1)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
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

/// Title used when the payload has none
pub const DEFAULT_TITLE: &str = "New Post";

#[derive(Deserialize)]
struct MeResponse {
    #[serde(rename = "ID")]
    id: u64,
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct SitesResponse {
    #[serde(default)]
    sites: Vec<SiteEntry>,
}

#[derive(Deserialize)]
struct SiteEntry {
    #[serde(rename = "ID")]
    id: u64,
    name: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<PostEntry>,
}

#[derive(Deserialize)]
struct PostEntry {
    #[serde(rename = "ID")]
    id: u64,
    title: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Deserialize)]
struct MediaResponse {
    #[serde(default)]
    media: Vec<PostEntry>,
}

/// Media prepared for a post body
#[derive(Debug, Default, PartialEq, Eq)]
struct PreparedMedia {
    ids: Vec<u64>,
    urls: Vec<String>,
}

pub struct WordPressClient {
    api: ApiClient,
    identity: Option<Identity>,
}

impl WordPressClient {
    pub fn new(credential: AccessCredential, transport: Arc<dyn HttpTransport>) -> Self {
        Self::from_api(ApiClient::new(ProviderProfile::wordpress(), credential, transport))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self {
            api,
            identity: None,
        }
    }

    pub async fn get_identity(&mut self) -> Result<Identity, ErrorRecord> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        self.api.ensure_credential()?;

        let me: MeResponse = self.api.send_json(self.api.request(Method::Get, "/me")).await?;
        let identity = Identity {
            id: me.id.to_string(),
            name: me.display_name,
            email: me.email,
        };
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Sites the user can publish to
    pub async fn list_containers(&mut self) -> Result<Vec<Container>, ErrorRecord> {
        self.api.ensure_credential()?;

        let response: SitesResponse = self
            .api
            .send_json(self.api.request(Method::Get, "/me/sites"))
            .await?;
        Ok(response
            .sites
            .into_iter()
            .map(|site| Container {
                id: site.id.to_string(),
                name: site.name.unwrap_or_else(|| format!("Site {}", site.id)),
                url: site.url,
            })
            .collect())
    }

    /// Published pages of a site, candidates for `parent_id`
    pub async fn list_pages(&mut self, site_id: u64) -> Result<Vec<Container>, ErrorRecord> {
        self.api.ensure_credential()?;

        let request = self
            .api
            .request(Method::Get, &format!("/sites/{}/posts", site_id))
            .query("type", "page")
            .query("status", "publish");
        let response: PostsResponse = self.api.send_json(request).await?;
        Ok(response
            .posts
            .into_iter()
            .map(|page| Container {
                id: page.id.to_string(),
                name: page.title.unwrap_or_default(),
                url: page.url,
            })
            .collect())
    }

    /// Upload one file to the site's media library
    pub async fn upload_media(
        &mut self,
        site_id: u64,
        file: &MediaFile,
        title: Option<&str>,
    ) -> Result<MediaHandle, ErrorRecord> {
        self.api.profile().validate_media(file)?;
        self.api.ensure_credential()?;
        self.upload_validated(site_id, file, title).await
    }

    async fn upload_validated(
        &self,
        site_id: u64,
        file: &MediaFile,
        title: Option<&str>,
    ) -> Result<MediaHandle, ErrorRecord> {
        let mut parts = vec![FormPart::File {
            name: "media[]".to_string(),
            file_name: file.file_name.clone(),
            content_type: file.mime_type.clone(),
            data: file.data(),
        }];
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            parts.push(FormPart::Text {
                name: "attrs[0][title]".to_string(),
                value: title.to_string(),
            });
        }

        let request = self
            .api
            .request(Method::Post, &format!("/sites/{}/media/new", site_id))
            .multipart(parts);
        let response: MediaResponse = self.api.send_json(request).await.map_err(upload_failure)?;

        let uploaded = response.media.into_iter().next().ok_or_else(|| {
            ErrorRecord::new(
                Provider::WordPress,
                ErrorKind::MediaUploadError,
                200,
                "Media upload response did not include the uploaded file",
            )
        })?;
        debug!(site_id, media_id = uploaded.id, "WordPress media uploaded");

        Ok(MediaHandle {
            id: uploaded.id.to_string(),
            url: uploaded.url,
        })
    }

    /// Upload pending files and sort existing handles into ids and URLs
    async fn prepare_media(&self, site_id: u64, payload: &PostPayload) -> Result<PreparedMedia, ErrorRecord> {
        let mut prepared = PreparedMedia::default();
        for media in &payload.media {
            match media {
                MediaRef::Upload(file) => {
                    let handle = self
                        .upload_validated(site_id, file, Some(&file.file_name))
                        .await?;
                    if let Ok(id) = handle.id.parse() {
                        prepared.ids.push(id);
                    }
                    prepared.urls.extend(handle.url);
                }
                MediaRef::Asset(asset) if is_url(asset) => prepared.urls.push(asset.clone()),
                MediaRef::Asset(asset) => {
                    if let Ok(id) = asset.parse() {
                        prepared.ids.push(id);
                    }
                }
            }
        }
        Ok(prepared)
    }

    fn validate(&self, payload: &PostPayload) -> Result<(), ErrorRecord> {
        let profile = self.api.profile();
        profile.validate_payload(payload)?;
        for media in &payload.media {
            match media {
                MediaRef::Upload(file) => profile.validate_media(file)?,
                MediaRef::Asset(asset) if is_url(asset) || asset.parse::<u64>().is_ok() => {}
                MediaRef::Asset(asset) => {
                    return Err(ErrorRecord::validation(
                        Provider::WordPress,
                        format!("Not a WordPress media id or URL: {}", asset),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Publish a post (or a child page when the target has a parent)
    pub async fn create_post(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord> {
        self.validate(payload)?;
        let (site_id, parent_id) = match &payload.target {
            Some(TargetContainer::WordPressSite { site_id, parent_id }) => (*site_id, *parent_id),
            _ => {
                return Err(ErrorRecord::validation(
                    Provider::WordPress,
                    "A WordPress site must be selected",
                ))
            }
        };
        self.api.ensure_credential()?;

        let media = self.prepare_media(site_id, payload).await?;
        let title = payload
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE);

        let mut body = json!({
            "title": title,
            "content": render_content(&payload.text, &media.urls),
            "status": "publish",
        });
        if let Some(parent_id) = parent_id {
            body["parent_id"] = json!(parent_id);
        }
        if let Some(featured) = media.ids.first() {
            body["featured_media"] = json!(featured);
        }

        let request = self
            .api
            .request(Method::Post, &format!("/sites/{}/posts/new", site_id))
            .json(body);
        let created: PostEntry = self.api.send_json(request).await?;
        info!(site_id, post_id = created.id, "Published to WordPress");

        Ok(PublishedPost {
            id: Some(created.id.to_string()),
            url: created.url,
        })
    }

    /// Replace the content (and title, when given) of an existing post
    pub async fn update_post(
        &mut self,
        site_id: u64,
        post_id: u64,
        payload: &PostPayload,
    ) -> Result<PublishedPost, ErrorRecord> {
        self.validate(payload)?;
        self.api.ensure_credential()?;

        let media = self.prepare_media(site_id, payload).await?;
        let mut body = json!({ "content": render_content(&payload.text, &media.urls) });
        if let Some(title) = payload.title.as_deref().filter(|t| !t.trim().is_empty()) {
            body["title"] = json!(title);
        }
        if let Some(featured) = media.ids.first() {
            body["featured_media"] = json!(featured);
        }

        let request = self
            .api
            .request(Method::Post, &format!("/sites/{}/posts/{}", site_id, post_id))
            .json(body);
        let updated: PostEntry = self.api.send_json(request).await?;

        Ok(PublishedPost {
            id: Some(updated.id.to_string()),
            url: updated.url,
        })
    }

    /// Move a post to the trash
    pub async fn delete_post(&mut self, site_id: u64, post_id: u64) -> Result<(), ErrorRecord> {
        self.api.ensure_credential()?;

        let request = self
            .api
            .request(Method::Post, &format!("/sites/{}/posts/{}/delete", site_id, post_id));
        self.api.send(request).await?;
        info!(site_id, post_id, "Deleted WordPress post");
        Ok(())
    }
}

/// Post HTML: the text followed by one `<img>` per media URL
fn render_content(text: &str, image_urls: &[String]) -> String {
    let mut content = text.to_string();
    for url in image_urls {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&format!("<img src=\"{}\" alt=\"\" />", url.replace('"', "&quot;")));
    }
    content
}

#[async_trait]
impl Publisher for WordPressClient {
    fn provider(&self) -> Provider {
        Provider::WordPress
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
