//! Generic provider API client
//!
//! One client type serves all providers. The [`ProviderProfile`] decides where
//! requests go, how the token is attached and how failed responses are
//! classified; the provider modules only build requests and read responses.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::credentials::AccessCredential;
use crate::error::{ErrorKind, ErrorRecord};
use crate::provider::{AuthScheme, Provider, ProviderProfile};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

pub struct ApiClient {
    profile: ProviderProfile,
    credential: AccessCredential,
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    pub fn new(
        profile: ProviderProfile,
        credential: AccessCredential,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            profile,
            credential,
            transport,
        }
    }

    pub fn provider(&self) -> Provider {
        self.profile.provider
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn credential(&self) -> &AccessCredential {
        &self.credential
    }

    /// Fail with `AuthRequired` when there is no token to send
    pub fn ensure_credential(&self) -> Result<(), ErrorRecord> {
        if self.credential.is_empty() {
            return Err(ErrorRecord::auth_required(
                self.provider(),
                format!("No {} access token provided", self.provider().display_name()),
            ));
        }
        Ok(())
    }

    /// Request against an API path, authorized with the credential's token
    pub fn request(&self, method: Method, path: &str) -> HttpRequest {
        self.request_with_token(method, path, self.credential.token())
    }

    /// Request against an API path, authorized with another token
    /// (Facebook Page tokens)
    pub fn request_with_token(&self, method: Method, path: &str, token: &str) -> HttpRequest {
        let request = HttpRequest::new(method, self.profile.endpoint(path));
        self.authorize(request, token)
    }

    /// Request against an absolute URL handed out by the provider
    pub fn request_url(&self, method: Method, url: &str) -> HttpRequest {
        self.authorize(HttpRequest::new(method, url), self.credential.token())
    }

    fn authorize(&self, request: HttpRequest, token: &str) -> HttpRequest {
        let request = match self.profile.auth {
            AuthScheme::BearerHeader => request.header("Authorization", format!("Bearer {}", token)),
            AuthScheme::QueryParameter(name) => request.query(name, token),
        };
        self.profile
            .extra_headers
            .iter()
            .fold(request, |request, (name, value)| request.header(*name, *value))
    }

    /// Send and classify: `Ok` only for 2xx responses
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ErrorRecord> {
        debug!(
            provider = %self.provider(),
            method = %request.method,
            url = %request.url,
            "Sending request"
        );

        let response = self.send_raw(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(self.error_for_response(&response))
        }
    }

    /// Send without looking at the status; only transport failures are errors
    pub async fn send_raw(&self, request: HttpRequest) -> Result<HttpResponse, ErrorRecord> {
        self.transport.send(request).await.map_err(|e| {
            debug!(provider = %self.provider(), error = %e, "Transport failure");
            ErrorRecord::network(self.provider(), &e.summary, &e.detail)
        })
    }

    /// Send and deserialize the body of a 2xx response
    ///
    /// An empty body deserializes from JSON `null`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ErrorRecord> {
        let response = self.send(request).await?;
        self.parse_json(&response)
    }

    pub fn parse_json<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T, ErrorRecord> {
        let value = if response.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&response.body).map_err(|e| self.unexpected(response, e))?
        };
        serde_json::from_value(value).map_err(|e| self.unexpected(response, e))
    }

    fn unexpected(&self, response: &HttpResponse, error: serde_json::Error) -> ErrorRecord {
        ErrorRecord::friendly(
            self.provider(),
            ErrorKind::ApiError,
            response.status,
            format!(
                "Unexpected {} response: {}",
                self.provider().display_name(),
                error
            ),
        )
    }

    /// Classify a non-2xx response
    pub fn error_for_response(&self, response: &HttpResponse) -> ErrorRecord {
        let provider = self.provider();
        let body = response.json_value();
        let technical = body
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| format!("{} API error", provider.display_name()));

        let body_code = body
            .as_ref()
            .and_then(|b| b.pointer("/error/code"))
            .and_then(Value::as_i64);
        let kind = match body_code {
            Some(code) if self.profile.auth_error_codes.contains(&code) => ErrorKind::AuthRequired,
            _ => self.profile.classify_status(response.status),
        };

        debug!(
            provider = %provider,
            status = response.status,
            kind = %kind,
            "Request failed: {}",
            technical
        );

        match kind {
            ErrorKind::AuthRequired => {
                ErrorRecord::friendly(provider, kind, response.status, "Invalid access token")
                    .with_technical(technical)
            }
            ErrorKind::RateLimitError => {
                ErrorRecord::friendly(provider, kind, response.status, "Rate limit exceeded")
                    .with_technical(technical)
            }
            _ => ErrorRecord::friendly(provider, kind, response.status, technical),
        }
    }
}

/// Human-readable message from the error shapes the three APIs use
fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.pointer("/error/message"),
        body.get("error_description"),
        body.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str())
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn client(profile: ProviderProfile, transport: &Arc<MockTransport>) -> ApiClient {
        ApiClient::new(profile, AccessCredential::new("tok-123"), transport.clone())
    }

    #[test]
    fn test_bearer_auth_and_extra_headers() {
        let transport = Arc::new(MockTransport::new());
        let api = client(ProviderProfile::linkedin(), &transport);

        let request = api.request(Method::Get, "/userinfo");
        assert_eq!(request.url, "https://api.linkedin.com/v2/userinfo");
        assert_eq!(request.header_value("authorization"), Some("Bearer tok-123"));
        assert_eq!(request.header_value("X-Restli-Protocol-Version"), Some("2.0.0"));
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_query_parameter_auth() {
        let transport = Arc::new(MockTransport::new());
        let api = client(ProviderProfile::facebook(), &transport);

        let request = api.request_with_token(Method::Post, "/42/feed", "page-token");
        assert_eq!(request.query_value("access_token"), Some("page-token"));
        assert!(request.header_value("Authorization").is_none());
    }

    #[test]
    fn test_ensure_credential() {
        let transport = Arc::new(MockTransport::new());
        let api = ApiClient::new(ProviderProfile::wordpress(), AccessCredential::new(""), transport.clone());
        let err = api.ensure_credential().unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthRequired);
        assert_eq!(err.http_status, 401);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_401_is_auth_required() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(401, json!({"message": "Invalid access token"}));
        let api = client(ProviderProfile::linkedin(), &transport);

        let err = api.send(api.request(Method::Get, "/userinfo")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthRequired);
        assert_eq!(err.http_status, 401);
        assert_eq!(err.user_message, "Your LinkedIn login has expired. Please sign in again!");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let transport = Arc::new(MockTransport::new());
        transport.push_empty(429);
        let api = client(ProviderProfile::wordpress(), &transport);

        let err = api.send(api.request(Method::Get, "/me")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimitError);
        assert_eq!(err.code(), "RateLimitError");
        assert_eq!(err.user_message, "Too many requests. Please try again later.");
    }

    #[tokio::test]
    async fn test_other_status_is_provider_api_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(422, json!({"message": "Duplicate post"}));
        transport.push_response(HttpResponse::new(502, "<html>bad gateway</html>"));
        let api = client(ProviderProfile::linkedin(), &transport);

        let err = api.send(api.request(Method::Post, "/ugcPosts")).await.unwrap_err();
        assert_eq!(err.code(), "LinkedInApiError");
        assert_eq!(err.http_status, 422);
        assert_eq!(err.technical_message, "Duplicate post");
        assert_eq!(err.user_message, crate::messages::default_message(Provider::LinkedIn));

        let err = api.send(api.request(Method::Post, "/ugcPosts")).await.unwrap_err();
        assert_eq!(err.http_status, 502);
        assert_eq!(err.technical_message, "LinkedIn API error");
    }

    #[tokio::test]
    async fn test_graph_auth_error_code() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            400,
            json!({"error": {"message": "Error validating access token", "type": "OAuthException", "code": 190}}),
        );
        let api = client(ProviderProfile::facebook(), &transport);

        let err = api.send(api.request(Method::Get, "/me")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthRequired);
        assert_eq!(err.technical_message, "Error validating access token");
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_failure(crate::transport::CONNECT_FAILED, "connection refused");
        let api = client(ProviderProfile::facebook(), &transport);

        let err = api.send(api.request(Method::Get, "/me")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.http_status, 0);
        assert_eq!(
            err.user_message,
            "We can't reach Facebook right now. Check your internet connection."
        );
    }

    #[tokio::test]
    async fn test_send_json_empty_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_empty(204);
        transport.push_response(HttpResponse::new(200, "not json"));
        let api = client(ProviderProfile::wordpress(), &transport);

        let value: Option<Value> = api.send_json(api.request(Method::Get, "/me")).await.unwrap();
        assert!(value.is_none());

        let err = api
            .send_json::<Value>(api.request(Method::Get, "/me"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WordPressApiError");
        assert!(err.technical_message.starts_with("Unexpected WordPress response"));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&json!({"message": "a"})).as_deref(), Some("a"));
        assert_eq!(error_message(&json!({"error": {"message": "b"}})).as_deref(), Some("b"));
        assert_eq!(
            error_message(&json!({"error": "unauthorized", "error_description": "c"})).as_deref(),
            Some("c")
        );
        assert_eq!(error_message(&json!({"error": "d"})).as_deref(), Some("d"));
        assert_eq!(error_message(&json!({"status": 500})), None);
    }
}
