//! Route guard for protected views.
//!
//! The decision is a pure function of a [`Session`] snapshot. It is taken on
//! every request, and [`GuardWatch`] re-takes it whenever the snapshot
//! changes so long-lived views can react to sign-out or demotion.

use serde::Serialize;
use tokio::sync::watch;

use super::{AccessLevel, Session};

/// Shown while the first identity notification is being resolved.
pub const CHECKING_MESSAGE: &str = "Verificando permissões...";

/// Public entry point non-admins are sent to.
pub const ENTRY_POINT: &str = "/";

/// What a protected view must do for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Render the neutral checking state. Never navigate.
    Checking,
    /// Navigate to the public entry point.
    Redirect,
    /// Render protected content.
    Render,
}

/// Decide for one snapshot.
#[must_use]
pub fn evaluate(session: &Session) -> GuardDecision {
    match session.access_level() {
        AccessLevel::Unresolved => GuardDecision::Checking,
        AccessLevel::Anonymous | AccessLevel::AuthenticatedUser => GuardDecision::Redirect,
        AccessLevel::AuthenticatedAdmin => GuardDecision::Render,
    }
}

/// Guard decisions that follow the session.
pub struct GuardWatch {
    rx: watch::Receiver<Session>,
}

impl GuardWatch {
    #[must_use]
    pub fn new(rx: watch::Receiver<Session>) -> Self {
        Self { rx }
    }

    /// Decision for the latest snapshot.
    #[must_use]
    pub fn current(&self) -> GuardDecision {
        evaluate(&self.rx.borrow())
    }

    /// Wait for the next snapshot and decide for it.
    ///
    /// Returns `None` once the gate has shut down.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.rx.changed().await.ok()?;
        Some(evaluate(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use preco_real_core::UserId;
    use secrecy::SecretString;
    use serde_json::{Map, Value};

    use super::*;
    use crate::identity::{Claims, Identity};

    fn signed_in(admin: bool) -> Session {
        let mut raw = Map::new();
        raw.insert("admin".into(), Value::Bool(admin));
        Session::authenticated(
            Identity {
                uid: UserId::new("op"),
                email: None,
            },
            Claims::from_payload(raw),
            SecretString::from("t"),
            None,
        )
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(&Session::unresolved()), GuardDecision::Checking);
        assert_eq!(evaluate(&Session::anonymous()), GuardDecision::Redirect);
        assert_eq!(evaluate(&signed_in(false)), GuardDecision::Redirect);
        assert_eq!(evaluate(&signed_in(true)), GuardDecision::Render);
    }

    #[tokio::test]
    async fn test_watch_follows_demotion() {
        let (tx, rx) = watch::channel(signed_in(true));
        let mut guard = GuardWatch::new(rx);
        assert_eq!(guard.current(), GuardDecision::Render);

        tx.send_replace(Session::anonymous());
        assert_eq!(guard.changed().await, Some(GuardDecision::Redirect));

        drop(tx);
        assert_eq!(guard.changed().await, None);
    }
}
