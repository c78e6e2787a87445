//! Identity Toolkit REST client.
//!
//! Email/password sign-in against `accounts:signInWithPassword` and
//! `accounts:signUp`, with ID-token refresh through the Secure Token API.
//! Tokens are cached in memory and refreshed when they are about to expire.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use preco_real_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, watch};
use tracing::instrument;
use url::Url;

use super::{Claims, IdToken, Identity, IdentityError, IdentityProvider};
use crate::config::IdentityConfig;

/// Refresh when fewer than this many seconds remain.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Identity provider backed by the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseIdentity {
    inner: Arc<FirebaseInner>,
}

struct FirebaseInner {
    client: reqwest::Client,
    api_key: SecretString,
    identity_toolkit_url: Url,
    secure_token_url: Url,
    current: watch::Sender<Option<Identity>>,
    /// In-memory token cache
    token: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    uid: UserId,
    id_token: SecretString,
    refresh_token: SecretString,
    expires_at: DateTime<Utc>,
    claims: Claims,
}

impl CachedToken {
    fn expires_within(&self, seconds: i64) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(seconds)
    }

    fn to_id_token(&self) -> IdToken {
        IdToken {
            credential: self.id_token.clone(),
            claims: self.claims.clone(),
            expires_at: Some(self.expires_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    /// Create a provider with no operator signed in.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NotConfigured`] when no API key is set.
    pub fn new(client: reqwest::Client, config: &IdentityConfig) -> Result<Self, IdentityError> {
        let api_key = config.api_key.clone().ok_or(IdentityError::NotConfigured)?;

        Ok(Self {
            inner: Arc::new(FirebaseInner {
                client,
                api_key,
                identity_toolkit_url: config.identity_toolkit_url.clone(),
                secure_token_url: config.secure_token_url.clone(),
                current: watch::Sender::new(None),
                token: RwLock::new(None),
            }),
        })
    }

    fn endpoint(&self, base: &Url, path: &str) -> Result<Url, IdentityError> {
        let mut url = Url::parse(&format!("{}/{path}", base.as_str().trim_end_matches('/')))
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn password_flow(
        &self,
        action: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let url = self.endpoint(&self.inner.identity_toolkit_url, &format!("accounts:{action}"))?;
        let response = self
            .inner
            .client
            .post(url)
            .json(&PasswordRequest {
                email: email.as_str(),
                password: password.expose_secret(),
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: PasswordResponse = response.json().await?;
        let uid = UserId::new(body.local_id);
        let cached = cache_entry(
            uid.clone(),
            body.id_token,
            body.refresh_token,
            body.expires_in.as_deref(),
        )?;
        *self.inner.token.write().await = Some(cached);

        let identity = Identity {
            uid,
            email: body.email.or_else(|| Some(email.to_string())),
        };
        self.inner.current.send_replace(Some(identity.clone()));
        tracing::info!(uid = %identity.uid, "operator signed in");
        Ok(identity)
    }

    #[instrument(skip(self, refresh_token), fields(uid = %uid))]
    async fn refresh(
        &self,
        uid: &UserId,
        refresh_token: &SecretString,
    ) -> Result<CachedToken, IdentityError> {
        let url = self.endpoint(&self.inner.secure_token_url, "token")?;
        let response = self
            .inner
            .client
            .post(url)
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: RefreshResponse = response.json().await?;
        if body.user_id != uid.as_str() {
            return Err(IdentityError::MalformedToken(
                "refreshed token belongs to another user".to_string(),
            ));
        }
        let cached = cache_entry(
            uid.clone(),
            body.id_token,
            body.refresh_token,
            body.expires_in.as_deref(),
        )?;
        *self.inner.token.write().await = Some(cached.clone());
        tracing::debug!("ID token refreshed");
        Ok(cached)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.current.subscribe()
    }

    async fn token(&self, identity: &Identity) -> Result<IdToken, IdentityError> {
        let cached = self.inner.token.read().await.clone();
        let Some(cached) = cached.filter(|t| t.uid == identity.uid) else {
            return Err(IdentityError::NoUser);
        };

        if !cached.expires_within(REFRESH_MARGIN_SECS) {
            return Ok(cached.to_id_token());
        }

        let refreshed = self.refresh(&cached.uid, &cached.refresh_token).await?;
        Ok(refreshed.to_id_token())
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.password_flow("signInWithPassword", email, password)
            .await
    }

    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.password_flow("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        *self.inner.token.write().await = None;
        self.inner.current.send_replace(None);
        tracing::info!("operator signed out");
        Ok(())
    }
}

/// Build a cache entry, taking expiry from the token's `exp` claim when present.
fn cache_entry(
    uid: UserId,
    id_token: String,
    refresh_token: String,
    expires_in: Option<&str>,
) -> Result<CachedToken, IdentityError> {
    let payload = decode_jwt_payload(&id_token)?;
    let expires_at = payload
        .get("exp")
        .and_then(Value::as_i64)
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .or_else(|| {
            expires_in
                .and_then(|s| s.parse::<i64>().ok())
                .map(|secs| Utc::now() + Duration::seconds(secs))
        })
        .unwrap_or_else(|| Utc::now() + Duration::hours(1));

    Ok(CachedToken {
        uid,
        id_token: SecretString::from(id_token),
        refresh_token: SecretString::from(refresh_token),
        expires_at,
        claims: Claims::from_payload(payload),
    })
}

/// Decode the payload segment of a JWT without verifying its signature.
///
/// The console only reads claims for display gating; every backend
/// verifies the token itself.
pub(crate) fn decode_jwt_payload(token: &str) -> Result<Map<String, Value>, IdentityError> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| IdentityError::MalformedToken("missing payload segment".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| IdentityError::MalformedToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| IdentityError::MalformedToken(e.to_string()))
}

async fn rejection(response: reqwest::Response) -> IdentityError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {status}"));
    if status.is_client_error() {
        IdentityError::Rejected(message)
    } else {
        IdentityError::Transport(message)
    }
}
