//! Shared fixtures for the console's integration tests.
//!
//! Every backend is a `wiremock` server, so the suites run without network
//! access or credentials:
//!
//! ```bash
//! cargo test -p preco-real-integration-tests
//! ```
//!
//! # Suites
//!
//! - `intake_polling` - orchestrator and intake view against a fake agents service
//! - `session_gate` - Identity Toolkit sign-in through the gate
//! - `route_guard` - guarded routes through the full router
//! - `intake_upload` - photo uploads through the router to the agents service

use std::future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use preco_real_admin::config::{AdminConfig, IdentityConfig, Service};
use preco_real_admin::identity::{Claims, IdToken, Identity, IdentityError, IdentityProvider};
use preco_real_admin::intake::{AgentsClient, TaskOrchestrator};
use preco_real_admin::services::ServiceClient;
use preco_real_core::{Email, UserId};
use secrecy::SecretString;
use serde_json::{Map, Value};
use tokio::sync::watch;
use url::Url;
use wiremock::MockServer;

/// An unsigned JWT carrying `payload`.
#[must_use]
pub fn jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

/// Identity Toolkit settings pointing at `server`.
///
/// # Panics
///
/// If the mock server URI is not a URL.
#[must_use]
pub fn identity_config(server: &MockServer) -> IdentityConfig {
    IdentityConfig {
        api_key: Some(SecretString::from("integration-key")),
        identity_toolkit_url: Url::parse(&format!("{}/v1", server.uri()))
            .unwrap_or_else(|e| panic!("mock uri: {e}")),
        secure_token_url: Url::parse(&format!("{}/st", server.uri()))
            .unwrap_or_else(|e| panic!("mock uri: {e}")),
    }
}

/// Console configuration built from `vars`; everything else is unset.
///
/// # Panics
///
/// If a value does not parse.
#[must_use]
pub fn config_with(vars: &[(&str, String)]) -> AdminConfig {
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    AdminConfig::from_lookup(&|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap_or_else(|e| panic!("config: {e}"))
}

/// Orchestrator over a fake agents service.
///
/// # Panics
///
/// If the mock server URI is not a URL.
#[must_use]
pub fn orchestrator(server: &MockServer, poll_interval: Duration) -> TaskOrchestrator {
    let base = Url::parse(&server.uri()).unwrap_or_else(|e| panic!("mock uri: {e}"));
    let client = ServiceClient::new(reqwest::Client::new(), Service::Agents, base);
    TaskOrchestrator::new(Arc::new(AgentsClient::new(client)), poll_interval)
}

/// How a [`StaticIdentity`] answers token requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBehaviour {
    /// Token whose claims carry `admin`.
    Grant { admin: bool },
    /// Never answers, so the gate stays unresolved.
    Hang,
}

/// Provider with a fixed operator, for router-level tests.
pub struct StaticIdentity {
    current: watch::Sender<Option<Identity>>,
    tokens: TokenBehaviour,
}

impl StaticIdentity {
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            current: watch::Sender::new(None),
            tokens: TokenBehaviour::Grant { admin: false },
        }
    }

    #[must_use]
    pub fn signed_in(uid: &str, tokens: TokenBehaviour) -> Self {
        Self {
            current: watch::Sender::new(Some(Identity {
                uid: UserId::new(uid),
                email: Some(format!("{uid}@precoreal.app")),
            })),
            tokens,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn token(&self, identity: &Identity) -> Result<IdToken, IdentityError> {
        match self.tokens {
            TokenBehaviour::Hang => future::pending().await,
            TokenBehaviour::Grant { admin } => {
                let mut raw = Map::new();
                raw.insert("admin".to_string(), Value::Bool(admin));
                Ok(IdToken {
                    credential: SecretString::from(format!("token-{}", identity.uid)),
                    claims: Claims::from_payload(raw),
                    expires_at: None,
                })
            }
        }
    }

    async fn sign_in(
        &self,
        _email: &Email,
        _password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        Err(IdentityError::Rejected("INVALID_LOGIN_CREDENTIALS".to_string()))
    }

    async fn register(
        &self,
        _email: &Email,
        _password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        Err(IdentityError::Rejected("OPERATION_NOT_ALLOWED".to_string()))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.current.send_replace(None);
        Ok(())
    }
}
