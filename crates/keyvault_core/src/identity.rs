//! Identity provider seam and the session it drives.
//!
//! Session states: `Anonymous -> login -> Authenticated -> logout -> Anonymous`.
//! A failed login leaves the session anonymous and surfaces an
//! [`IdentityError`].

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::IdentityError;
use crate::models::identity::Identity;

/// Provider code for sign-in attempted from an origin it does not trust.
pub const UNAUTHORIZED_DOMAIN_CODE: &str = "auth/unauthorized-domain";
/// Provider code for a sign-in prompt dismissed by the user.
pub const POPUP_CLOSED_CODE: &str = "auth/popup-closed-by-user";
/// Provider code for a sign-in prompt superseded by another one.
pub const CANCELLED_POPUP_CODE: &str = "auth/cancelled-popup-request";

/// Raw failure reported by an identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Interactive third-party sign-in.
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive sign-in flow.
    fn sign_in(&self) -> impl Future<Output = Result<Identity, ProviderError>> + Send;

    /// End the provider session. Must be safe to call when signed out.
    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// User the provider still considers signed in, if any.
    fn current_user(&self) -> impl Future<Output = Option<Identity>> + Send;
}

/// Current session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Bucket a provider error into the three failure kinds callers act on.
///
/// # Arguments
/// - `err`: Provider failure.
/// - `origin`: Origin the sign-in was attempted from.
pub fn classify_provider_error(err: &ProviderError, origin: &str) -> IdentityError {
    match err.code.as_str() {
        UNAUTHORIZED_DOMAIN_CODE => IdentityError::UnauthorizedOrigin {
            origin: origin.to_string(),
        },
        POPUP_CLOSED_CODE | CANCELLED_POPUP_CODE => IdentityError::Cancelled,
        _ => IdentityError::LoginFailed(err.message.clone()),
    }
}

/// Wraps an [`IdentityProvider`] and tracks the resulting [`Session`].
pub struct IdentityAdapter<P> {
    provider: P,
    origin: String,
    session: Session,
}

impl<P: IdentityProvider> IdentityAdapter<P> {
    /// Create an anonymous adapter for sign-ins from `origin`.
    pub fn new(provider: P, origin: impl Into<String>) -> Self {
        Self {
            provider,
            origin: origin.into(),
            session: Session::Anonymous,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Adopt whatever user the provider already has signed in.
    pub async fn restore(&mut self) -> &Session {
        self.session = match self.provider.current_user().await {
            Some(identity) => Session::Authenticated(identity),
            None => Session::Anonymous,
        };
        &self.session
    }

    /// Run sign-in and move to `Authenticated` on success.
    ///
    /// # Returns
    /// The signed-in identity.
    ///
    /// # Errors
    /// Returns [`IdentityError::UnauthorizedOrigin`] naming this adapter's
    /// origin, [`IdentityError::Cancelled`], or [`IdentityError::LoginFailed`].
    /// The session is anonymous afterwards.
    pub async fn login(&mut self) -> Result<Identity, IdentityError> {
        match self.provider.sign_in().await {
            Ok(identity) => {
                info!(user_id = %identity.id, "Signed in");
                self.session = Session::Authenticated(identity.clone());
                Ok(identity)
            }
            Err(err) => {
                warn!("Login failed: {}", err);
                self.session = Session::Anonymous;
                Err(classify_provider_error(&err, &self.origin))
            }
        }
    }

    /// Sign out. Idempotent; provider failures are logged only.
    pub async fn logout(&mut self) {
        if let Err(err) = self.provider.sign_out().await {
            warn!("Sign-out reported an error: {}", err);
        }
        self.session = Session::Anonymous;
    }
}
