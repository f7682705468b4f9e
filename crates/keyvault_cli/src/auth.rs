//! Server-backed identity provider with a local session file.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use keyvault_core::identity::{IdentityProvider, ProviderError, POPUP_CLOSED_CODE};
use keyvault_core::Identity;
use serde_json::json;

use crate::remote::{api_url, error_parts_for_response};

const NETWORK_FAILED_CODE: &str = "auth/network-request-failed";
const INTERNAL_ERROR_CODE: &str = "auth/internal-error";

/// Signs in against the backend's identity endpoint.
///
/// The display name comes from `--name` or an interactive prompt; the
/// resulting identity is kept in `session_file` until sign-out.
pub struct ServerIdentityProvider {
    client: reqwest::Client,
    server: String,
    origin: String,
    session_file: PathBuf,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl ServerIdentityProvider {
    pub fn new(
        client: reqwest::Client,
        server: String,
        origin: String,
        session_file: PathBuf,
    ) -> Self {
        Self {
            client,
            server,
            origin,
            session_file,
            display_name: None,
            photo_url: None,
        }
    }

    /// Use `name` instead of prompting.
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    pub fn with_photo_url(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = photo_url;
        self
    }

    async fn display_name(&self) -> Result<String, ProviderError> {
        let answer = match &self.display_name {
            Some(name) => Some(name.clone()),
            None => tokio::task::spawn_blocking(prompt_display_name)
                .await
                .map_err(|err| ProviderError::new(INTERNAL_ERROR_CODE, err.to_string()))?,
        };
        answer
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProviderError::new(POPUP_CLOSED_CODE, "Sign-in was dismissed"))
    }
}

fn prompt_display_name() -> Option<String> {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "Display name: ");
    let _ = stderr.flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

/// Read a saved identity; unreadable or malformed files count as signed out.
pub(crate) async fn read_session(path: &Path) -> Option<Identity> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&raw) {
        Ok(identity) => Some(identity),
        Err(err) => {
            tracing::warn!("Ignoring malformed session file {}: {}", path.display(), err);
            None
        }
    }
}

pub(crate) async fn write_session(path: &Path, identity: &Identity) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let encoded = serde_json::to_vec_pretty(identity)?;
    tokio::fs::write(path, encoded).await
}

pub(crate) async fn remove_session(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn network_error(err: reqwest::Error) -> ProviderError {
    ProviderError::new(NETWORK_FAILED_CODE, err.to_string())
}

impl IdentityProvider for ServerIdentityProvider {
    async fn sign_in(&self) -> Result<Identity, ProviderError> {
        let display_name = self.display_name().await?;
        let url = api_url(&self.server, &["v1", "auth", "sign-in"])
            .map_err(|message| ProviderError::new(INTERNAL_ERROR_CODE, message))?;
        let res = self
            .client
            .post(url)
            .json(&json!({
                "origin": self.origin,
                "display_name": display_name,
                "photo_url": self.photo_url,
            }))
            .send()
            .await
            .map_err(network_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let (code, message) = error_parts_for_response(status, &body);
            return Err(ProviderError::new(code, message));
        }

        let identity: Identity = res.json().await.map_err(network_error)?;
        write_session(&self.session_file, &identity)
            .await
            .map_err(|err| {
                ProviderError::new(
                    INTERNAL_ERROR_CODE,
                    format!("failed to save session: {}", err),
                )
            })?;
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        remove_session(&self.session_file).await.map_err(|err| {
            ProviderError::new(
                INTERNAL_ERROR_CODE,
                format!("failed to remove session: {}", err),
            )
        })?;
        let url = api_url(&self.server, &["v1", "auth", "sign-out"])
            .map_err(|message| ProviderError::new(INTERNAL_ERROR_CODE, message))?;
        self.client
            .post(url)
            .send()
            .await
            .map_err(network_error)?;
        Ok(())
    }

    async fn current_user(&self) -> Option<Identity> {
        read_session(&self.session_file).await
    }
}
