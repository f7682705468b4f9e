//! Configuration loading from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_PASTE_SIZE, DEFAULT_PORT, DEFAULT_READ_TIMEOUT, DEFAULT_RETRIES,
    DEFAULT_RETRY_DELAY, DEFAULT_SERVER_URL, DEFAULT_WRITE_TIMEOUT,
};
use crate::paste_store::StoreSettings;
use crate::resilience::RetryPolicy;

/// Origins trusted for sign-in when `AUTHORIZED_ORIGINS` is unset.
pub const DEFAULT_AUTHORIZED_ORIGINS: [&str; 2] = ["http://localhost:38517", "http://127.0.0.1:38517"];

/// Runtime configuration for the backend service.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub max_paste_size: usize,
    pub authorized_origins: Vec<String>,
    pub allow_public_access: bool,
    /// Raw `BIND` override; validated by the server at startup.
    pub bind: Option<String>,
}

/// Runtime configuration for the command-line client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    /// Origin presented to the identity provider on sign-in.
    pub origin: String,
    pub session_file: PathBuf,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde<F>(path: String, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir(lookup) {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn resolve_home_dir<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(home) = non_blank(lookup, "HOME") {
        return Some(PathBuf::from(home));
    }

    // Windows
    if let Some(profile) = non_blank(lookup, "USERPROFILE") {
        return Some(PathBuf::from(profile));
    }
    if let (Some(drive), Some(path)) = (
        non_blank(lookup, "HOMEDRIVE"),
        non_blank(lookup, "HOMEPATH"),
    ) {
        return Some(PathBuf::from(format!("{}{}", drive, path)));
    }

    std::env::current_dir().ok()
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parsed<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|value| value.trim().parse().ok())
}

fn millis<F>(lookup: &F, name: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    parsed::<u64, F>(lookup, name)
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match non_blank(&lookup, "DB_PATH") {
            Some(path) => expand_tilde(path, &lookup),
            None => {
                let home = resolve_home_dir(&lookup).unwrap_or_else(|| PathBuf::from("."));
                let cache_dir = home.join(".cache").join("keyvault");
                cache_dir.join("db").to_string_lossy().to_string()
            }
        };
        let authorized_origins = lookup("AUTHORIZED_ORIGINS")
            .map(|value| parse_origin_list(&value))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_AUTHORIZED_ORIGINS
                    .iter()
                    .map(|origin| origin.to_string())
                    .collect()
            });

        Self {
            db_path,
            port: parsed(&lookup, "PORT").unwrap_or(DEFAULT_PORT),
            max_paste_size: parsed(&lookup, "MAX_PASTE_SIZE").unwrap_or(DEFAULT_MAX_PASTE_SIZE),
            authorized_origins,
            allow_public_access: lookup("ALLOW_PUBLIC_ACCESS")
                .and_then(|value| parse_env_flag(&value))
                .unwrap_or(false),
            bind: non_blank(&lookup, "BIND"),
        }
    }

    /// Whether sign-in requests from `origin` are trusted.
    pub fn is_authorized_origin(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/');
        self.authorized_origins
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(origin))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    /// Load client configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /// Build client configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let session_file = match non_blank(&lookup, "KEYVAULT_SESSION_FILE") {
            Some(path) => PathBuf::from(expand_tilde(path, &lookup)),
            None => resolve_home_dir(&lookup)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("keyvault")
                .join("session.json"),
        };

        Self {
            server_url: non_blank(&lookup, "KEYVAULT_SERVER")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            origin: non_blank(&lookup, "KEYVAULT_ORIGIN")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            session_file,
            write_timeout: millis(&lookup, "KEYVAULT_WRITE_TIMEOUT_MS", DEFAULT_WRITE_TIMEOUT),
            read_timeout: millis(&lookup, "KEYVAULT_READ_TIMEOUT_MS", DEFAULT_READ_TIMEOUT),
            retries: parsed(&lookup, "KEYVAULT_RETRIES").unwrap_or(DEFAULT_RETRIES),
            retry_delay: millis(&lookup, "KEYVAULT_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY),
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            write_timeout: self.write_timeout,
            read_timeout: self.read_timeout,
            retry: RetryPolicy {
                retries: self.retries,
                delay: self.retry_delay,
            },
        }
    }
}
