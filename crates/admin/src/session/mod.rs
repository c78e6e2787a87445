//! Process-wide operator session.
//!
//! A [`Session`] is an immutable snapshot published by the [`SessionGate`].
//! The access level is never stored; it is derived from the snapshot on
//! every read.

mod gate;
pub mod guard;

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use crate::identity::{Claims, Identity};

pub use gate::SessionGate;
pub use guard::{GuardDecision, GuardWatch};

/// Who is using the console, as far as the gate knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// The first identity notification has not been processed yet.
    Unresolved,
    Anonymous,
    AuthenticatedUser,
    AuthenticatedAdmin,
}

/// Snapshot of the operator session.
#[derive(Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
    claims: Option<Claims>,
    credential: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
    resolved: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("claims", &self.claims)
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl Session {
    /// The state before the provider has said anything.
    #[must_use]
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Resolved with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            resolved: true,
            ..Self::default()
        }
    }

    /// Resolved identity whose claims could not be retrieved.
    #[must_use]
    pub fn without_claims(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            resolved: true,
            ..Self::default()
        }
    }

    /// Resolved identity with its token.
    #[must_use]
    pub fn authenticated(
        identity: Identity,
        claims: Claims,
        credential: SecretString,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            identity: Some(identity),
            claims: Some(claims),
            credential: Some(credential),
            expires_at,
            resolved: true,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    #[must_use]
    pub const fn credential(&self) -> Option<&SecretString> {
        self.credential.as_ref()
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True until the first notification has been fully processed.
    #[must_use]
    pub const fn loading(&self) -> bool {
        !self.resolved
    }

    /// Claims were retrieved and carry `admin: true`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.claims.as_ref().is_some_and(|c| c.admin)
    }

    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        match (&self.identity, self.resolved) {
            (_, false) => AccessLevel::Unresolved,
            (None, true) => AccessLevel::Anonymous,
            (Some(_), true) if self.is_admin() => AccessLevel::AuthenticatedAdmin,
            (Some(_), true) => AccessLevel::AuthenticatedUser,
        }
    }
}

/// What the console reports about the session over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub access: AccessLevel,
    pub loading: bool,
    pub is_admin: bool,
    pub identity: Option<Identity>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            access: session.access_level(),
            loading: session.loading(),
            is_admin: session.is_admin(),
            identity: session.identity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use preco_real_core::UserId;
    use serde_json::{Map, Value};

    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: UserId::new("u1"),
            email: None,
        }
    }

    fn claims(admin: bool) -> Claims {
        let mut raw = Map::new();
        raw.insert("admin".into(), Value::Bool(admin));
        Claims::from_payload(raw)
    }

    #[test]
    fn test_access_level_derivation() {
        assert_eq!(Session::unresolved().access_level(), AccessLevel::Unresolved);
        assert_eq!(Session::anonymous().access_level(), AccessLevel::Anonymous);
        assert_eq!(
            Session::without_claims(identity()).access_level(),
            AccessLevel::AuthenticatedUser
        );
        assert_eq!(
            Session::authenticated(identity(), claims(false), SecretString::from("t"), None)
                .access_level(),
            AccessLevel::AuthenticatedUser
        );
        assert_eq!(
            Session::authenticated(identity(), claims(true), SecretString::from("t"), None)
                .access_level(),
            AccessLevel::AuthenticatedAdmin
        );
    }

    #[test]
    fn test_loading_only_before_resolution() {
        assert!(Session::unresolved().loading());
        assert!(!Session::anonymous().loading());
        assert!(!Session::unresolved().is_admin());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let session =
            Session::authenticated(identity(), claims(true), SecretString::from("tok-123"), None);
        let debug_output = format!("{session:?}");
        assert!(!debug_output.contains("tok-123"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
