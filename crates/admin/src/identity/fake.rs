//! Scriptable provider for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use preco_real_core::{Email, UserId};
use secrecy::SecretString;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{Claims, IdToken, Identity, IdentityError, IdentityProvider};

/// Provider whose users, claims and failures are set by the test.
pub struct FakeIdentity {
    current: watch::Sender<Option<Identity>>,
    admins: Mutex<HashMap<String, bool>>,
    token_delay: Mutex<Duration>,
    fail_tokens: Mutex<bool>,
    fail_sign_out: Mutex<bool>,
    pub token_calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            current: watch::Sender::new(None),
            admins: Mutex::new(HashMap::new()),
            token_delay: Mutex::new(Duration::ZERO),
            fail_tokens: Mutex::new(false),
            fail_sign_out: Mutex::new(false),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn identity(uid: &str) -> Identity {
        Identity {
            uid: UserId::new(uid),
            email: Some(format!("{uid}@precoreal.app")),
        }
    }

    /// Register a user and whether its token carries `admin: true`.
    pub fn with_user(self, uid: &str, admin: bool) -> Self {
        self.admins
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(uid.to_string(), admin);
        self
    }

    pub fn with_token_delay(self, delay: Duration) -> Self {
        *self
            .token_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = delay;
        self
    }

    pub fn fail_tokens(&self, fail: bool) {
        *self
            .fail_tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = fail;
    }

    pub fn fail_sign_out(&self, fail: bool) {
        *self
            .fail_sign_out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = fail;
    }

    /// Push an identity notification as if the provider's state changed.
    pub fn notify(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn token(&self, identity: &Identity) -> Result<IdToken, IdentityError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self
            .token_delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self
            .fail_tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
        {
            return Err(IdentityError::Transport("token endpoint down".to_string()));
        }
        let admin = self
            .admins
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(identity.uid.as_str())
            .copied()
            .ok_or(IdentityError::NoUser)?;

        let mut raw = Map::new();
        raw.insert("admin".to_string(), Value::Bool(admin));
        Ok(IdToken {
            credential: SecretString::from(format!("token-{}", identity.uid)),
            claims: Claims::from_payload(raw),
            expires_at: None,
        })
    }

    async fn sign_in(
        &self,
        email: &Email,
        _password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let uid = email
            .as_str()
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        let known = self
            .admins
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(&uid);
        if !known {
            return Err(IdentityError::Rejected("EMAIL_NOT_FOUND".to_string()));
        }
        let identity = Self::identity(&uid);
        self.notify(Some(identity.clone()));
        Ok(identity)
    }

    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let uid = email
            .as_str()
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        self.admins
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(uid)
            .or_insert(false);
        self.sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if *self
            .fail_sign_out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
        {
            return Err(IdentityError::Transport("network unreachable".to_string()));
        }
        self.notify(None);
        Ok(())
    }
}
