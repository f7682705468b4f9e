//! HTTP client for the document backend.

use keyvault_core::constants::USER_ID_HEADER;
use keyvault_core::{DocumentStore, Paste, PasteDocument, StoreError, StoreErrorCode};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct CreatedPaste {
    id: String,
}

/// Build `{server}/{segments...}` with each segment percent-encoded.
pub(crate) fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    let mut path = url
        .path_segments_mut()
        .map_err(|_| "Server URL cannot be used as an API base".to_string())?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

/// Trim trailing slashes and pin plain-http `localhost` to `127.0.0.1`.
pub(crate) fn normalize_server(server: String) -> String {
    if let Ok(mut url) = reqwest::Url::parse(&server) {
        let should_normalize_localhost =
            url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
        if should_normalize_localhost && url.set_host(Some("127.0.0.1")).is_err() {
            return server;
        }
        let mut normalized = url.to_string();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        return normalized;
    }
    server
}

/// Decode a backend error body into a code and message.
///
/// Falls back to a status-derived code when the body is not the usual
/// `{"code", "message"}` shape.
pub(crate) fn error_parts_for_response(status: reqwest::StatusCode, body: &str) -> (String, String) {
    let fallback_code = match status {
        reqwest::StatusCode::SERVICE_UNAVAILABLE
        | reqwest::StatusCode::BAD_GATEWAY
        | reqwest::StatusCode::GATEWAY_TIMEOUT => StoreErrorCode::Unavailable,
        reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::UNAUTHORIZED => {
            StoreErrorCode::PermissionDenied
        }
        reqwest::StatusCode::NOT_FOUND => StoreErrorCode::NotFound,
        reqwest::StatusCode::PAYLOAD_TOO_LARGE => StoreErrorCode::PayloadTooLarge,
        status if status.is_client_error() => StoreErrorCode::InvalidArgument,
        _ => StoreErrorCode::Internal,
    };
    let fallback_message = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (fallback_code.as_str().to_string(), fallback_message());
    };
    let code = value
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_code.as_str().to_string());
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(fallback_message);
    (code, message)
}

/// Classify a transport failure. Connection, timeout, and request errors
/// are connectivity losses.
pub(crate) fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        return StoreError::unavailable(format!("network error: {}", err));
    }
    StoreError::new(StoreErrorCode::Unknown, err.to_string())
}

async fn response_error(res: reqwest::Response) -> StoreError {
    let status = res.status();
    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    let (code, message) = error_parts_for_response(status, &body);
    StoreError::new(StoreErrorCode::from_code(&code), message)
}

/// [`DocumentStore`] backed by the KeyVault HTTP API.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    server: String,
    user_id: Option<String>,
}

impl HttpStore {
    /// Client for `server`, acting as `user_id` when signed in.
    pub fn new(client: reqwest::Client, server: String, user_id: Option<String>) -> Self {
        Self {
            client,
            server,
            user_id,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        api_url(&self.server, segments)
            .map_err(|message| StoreError::new(StoreErrorCode::InvalidArgument, message))
    }

    fn with_caller(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.user_id {
            Some(uid) => request.header(USER_ID_HEADER, uid),
            None => request,
        }
    }
}

impl DocumentStore for HttpStore {
    async fn insert(&self, document: PasteDocument) -> Result<String, StoreError> {
        let url = self.url(&["v1", "pastes"])?;
        let res = self
            .with_caller(self.client.post(url))
            .json(&document)
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(response_error(res).await);
        }
        let created: CreatedPaste = res.json().await.map_err(transport_error)?;
        Ok(created.id)
    }

    async fn get(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let url = self.url(&["v1", "pastes", id])?;
        let res = self
            .with_caller(self.client.get(url))
            .send()
            .await
            .map_err(transport_error)?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(response_error(res).await);
        }
        Ok(Some(res.json().await.map_err(transport_error)?))
    }

    async fn increment_views(&self, id: &str) -> Result<(), StoreError> {
        let url = self.url(&["v1", "pastes", id, "views"])?;
        let res = self
            .with_caller(self.client.post(url))
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(response_error(res).await);
        }
        Ok(())
    }

    async fn query_by_author(&self, author_id: &str) -> Result<Vec<Paste>, StoreError> {
        let url = self.url(&["v1", "pastes"])?;
        let res = self
            .with_caller(self.client.get(url))
            .query(&[("author_id", author_id)])
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(response_error(res).await);
        }
        res.json().await.map_err(transport_error)
    }

    async fn enable_network(&self) -> Result<(), StoreError> {
        let url = self.url(&["health"])?;
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(response_error(res).await);
        }
        tracing::debug!("Backend reachable again");
        Ok(())
    }
}
