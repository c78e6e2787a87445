//! Identity provider seam.
//!
//! The console never authenticates users itself. An [`IdentityProvider`]
//! yields the current operator identity and a bearer credential whose
//! decoded claims say whether the operator is an administrator.
//!
//! # Implementations
//!
//! - [`FirebaseIdentity`] - Identity Toolkit REST API (email/password)
//! - [`UnconfiguredIdentity`] - used when no API key is set; nobody can sign in

mod firebase;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use preco_real_core::{Email, UserId};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;

pub use firebase::FirebaseIdentity;

/// Errors reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No provider key is configured.
    #[error("Provedor de identidade não configurado.")]
    NotConfigured,

    /// The provider rejected the credentials or the request.
    #[error("Falha na autenticação: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Falha ao contatar o provedor de identidade: {0}")]
    Transport(String),

    /// The ID token could not be decoded.
    #[error("Token de identidade inválido: {0}")]
    MalformedToken(String),

    /// No operator is signed in.
    #[error("Nenhum usuário autenticado.")]
    NoUser,

    /// The session did not reflect the change in time.
    #[error("Tempo esgotado aguardando a sessão.")]
    Timeout,
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A signed-in operator as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: Option<String>,
}

/// Custom claims carried by the ID token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Claims {
    /// True only when the token carries `"admin": true`.
    pub admin: bool,
    /// Every claim, as decoded.
    pub raw: Map<String, Value>,
}

impl Claims {
    /// Build claims from a decoded JWT payload.
    #[must_use]
    pub fn from_payload(raw: Map<String, Value>) -> Self {
        let admin = matches!(raw.get("admin"), Some(Value::Bool(true)));
        Self { admin, raw }
    }
}

/// Result of fetching a token for an identity.
#[derive(Clone)]
pub struct IdToken {
    pub credential: SecretString,
    pub claims: Claims,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdToken")
            .field("credential", &"[REDACTED]")
            .field("claims", &self.claims)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of operator identities and bearer credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to identity changes.
    ///
    /// The receiver's current value is the present state, so the first
    /// notification is available immediately.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Fetch the bearer credential and claims for `identity`.
    async fn token(&self, identity: &Identity) -> Result<IdToken, IdentityError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Identity, IdentityError>;

    /// Create an account and sign it in.
    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError>;

    /// Sign the current operator out.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Provider used when no identity key is configured.
///
/// Always reports "no identity" and refuses to sign anyone in.
pub struct UnconfiguredIdentity {
    current: watch::Sender<Option<Identity>>,
}

impl UnconfiguredIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: watch::Sender::new(None),
        }
    }
}

impl Default for UnconfiguredIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for UnconfiguredIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn token(&self, _identity: &Identity) -> Result<IdToken, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_in(
        &self,
        _email: &Email,
        _password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn register(
        &self,
        _email: &Email,
        _password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
