use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use preco_real_core::Email;
use secrecy::SecretString;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{AccessLevel, Session};
use crate::config::SignOutPolicy;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::{Identity, IdentityError, IdentityProvider};

/// How long sign-in and sign-out wait for the gate to publish the change.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Re-fetch the token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Shortest wait between two token refreshes.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Owner of the process-wide [`Session`].
///
/// Holds the single subscription to the identity provider. Every
/// notification is resolved into a complete snapshot (identity, claims,
/// credential) before it is published, so readers never see one operator's
/// identity paired with another's claims.
#[derive(Clone)]
pub struct SessionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    provider: Arc<dyn IdentityProvider>,
    session: Arc<watch::Sender<Session>>,
    force_local: Arc<Notify>,
    shutdown: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for GateInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl SessionGate {
    /// Subscribe to `provider` and start resolving notifications.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let session = Arc::new(watch::Sender::new(Session::unresolved()));
        let force_local = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let listener = tokio::spawn(listen(
            Arc::clone(&provider),
            Arc::clone(&session),
            Arc::clone(&force_local),
            shutdown.clone(),
        ));

        Self {
            inner: Arc::new(GateInner {
                provider,
                session,
                force_local,
                shutdown,
                listener: Mutex::new(Some(listener)),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.session.borrow().identity().cloned()
    }

    /// Bearer credential for outbound requests, read at call time.
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.inner.session.borrow().credential().cloned()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.session.borrow().is_admin()
    }

    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.inner.session.borrow().access_level()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.session.borrow().loading()
    }

    /// Wait until the first notification has been processed.
    pub async fn wait_resolved(&self) -> Session {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading()).await {
            Ok(session) => session.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Sign in and wait until the gate has resolved the new identity.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`IdentityError::Timeout`] when the
    /// provider never notifies.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, IdentityError> {
        let identity = self.inner.provider.sign_in(email, password).await?;
        self.settle(|s| s.identity().is_some_and(|i| i.uid == identity.uid))
            .await
    }

    /// Create an account, then behave like [`SessionGate::sign_in`].
    ///
    /// # Errors
    ///
    /// Same as [`SessionGate::sign_in`].
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, IdentityError> {
        let identity = self.inner.provider.register(email, password).await?;
        self.settle(|s| s.identity().is_some_and(|i| i.uid == identity.uid))
            .await
    }

    /// Sign the operator out.
    ///
    /// A provider failure is logged and returned. With
    /// [`SignOutPolicy::ForceLocal`] the local session is cleared anyway.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`IdentityError::Timeout`].
    #[instrument(skip(self))]
    pub async fn sign_out(&self, policy: SignOutPolicy) -> Result<(), IdentityError> {
        match self.inner.provider.sign_out().await {
            Ok(()) => {
                self.settle(|s| s.identity().is_none()).await?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, ?policy, "identity provider sign-out failed");
                if policy == SignOutPolicy::ForceLocal {
                    self.inner.force_local.notify_one();
                    self.settle(|s| s.identity().is_none()).await?;
                }
                Err(e)
            }
        }
    }

    /// Stop listening to the provider and wait for the listener to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handle = self.inner.listener.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "session listener ended abnormally");
            }
        }
        tracing::info!("session gate stopped");
    }

    async fn settle(
        &self,
        mut done: impl FnMut(&Session) -> bool,
    ) -> Result<Session, IdentityError> {
        let mut rx = self.subscribe();
        match tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(|s| !s.loading() && done(s))).await
        {
            Ok(Ok(session)) => Ok(session.clone()),
            Ok(Err(_)) | Err(_) => Err(IdentityError::Timeout),
        }
    }
}

/// Resolve notifications into snapshots until shut down.
async fn listen(
    provider: Arc<dyn IdentityProvider>,
    session: Arc<watch::Sender<Session>>,
    force_local: Arc<Notify>,
    shutdown: CancellationToken,
) {
    let mut notifications = provider.subscribe();
    let mut identity = notifications.borrow_and_update().clone();

    loop {
        let resolved = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            resolved = resolve(provider.as_ref(), identity.clone()) => resolved,
        };

        let refresh_in = refresh_delay(&resolved);
        publish(&session, resolved);

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            () = force_local.notified() => {
                tracing::info!("clearing local session");
                identity = None;
            }
            changed = notifications.changed() => {
                if changed.is_err() {
                    tracing::warn!("identity provider closed its subscription");
                    return;
                }
                identity = notifications.borrow_and_update().clone();
            }
            () = sleep_for(refresh_in) => {
                tracing::debug!("refreshing session token");
            }
        }
    }
}

async fn resolve(provider: &dyn IdentityProvider, identity: Option<Identity>) -> Session {
    let Some(identity) = identity else {
        return Session::anonymous();
    };

    match provider.token(&identity).await {
        Ok(token) => {
            Session::authenticated(identity, token.claims, token.credential, token.expires_at)
        }
        Err(e) => {
            tracing::warn!(uid = %identity.uid, error = %e, "failed to retrieve claims");
            Session::without_claims(identity)
        }
    }
}

fn publish(sender: &watch::Sender<Session>, session: Session) {
    match session.identity() {
        Some(identity) => set_sentry_user(identity.uid.as_str(), identity.email.as_deref()),
        None => clear_sentry_user(),
    }
    let access = session.access_level();
    let previous = sender.send_replace(session);
    if previous.access_level() != access {
        tracing::info!(?access, "session resolved");
    }
}

fn refresh_delay(session: &Session) -> Option<Duration> {
    let expires_at = session.expires_at()?;
    let remaining = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Some(refresh_after(remaining))
}

/// Refresh `TOKEN_REFRESH_MARGIN` before expiry. Tokens living shorter than
/// the margin are refreshed at half their lifetime, never sooner than
/// `MIN_REFRESH_DELAY`.
fn refresh_after(remaining: Duration) -> Duration {
    match remaining.checked_sub(TOKEN_REFRESH_MARGIN) {
        Some(delay) if !delay.is_zero() => delay,
        _ => (remaining / 2).max(MIN_REFRESH_DELAY),
    }
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::identity::fake::FakeIdentity;

    fn email(uid: &str) -> Email {
        Email::parse(&format!("{uid}@precoreal.app")).expect("email")
    }

    #[test]
    fn test_refresh_after_margin_and_floor() {
        assert_eq!(refresh_after(Duration::from_secs(3600)), Duration::from_secs(3300));
        assert_eq!(refresh_after(Duration::from_secs(120)), Duration::from_secs(60));
        assert_eq!(refresh_after(Duration::from_secs(300)), Duration::from_secs(150));
        assert_eq!(refresh_after(Duration::from_secs(4)), MIN_REFRESH_DELAY);
        assert_eq!(refresh_after(Duration::ZERO), MIN_REFRESH_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flips_once_after_claims_resolve() {
        let provider = Arc::new(
            FakeIdentity::new()
                .with_user("ana", true)
                .with_token_delay(Duration::from_millis(500)),
        );
        provider.notify(Some(FakeIdentity::identity("ana")));
        let gate = SessionGate::start(provider.clone());
        let mut rx = gate.subscribe();

        assert!(gate.loading());
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Claims still in flight
        assert!(gate.loading());
        assert_eq!(gate.access_level(), AccessLevel::Unresolved);

        rx.changed().await.expect("published");
        let session = rx.borrow_and_update().clone();
        assert!(!session.loading());
        assert!(session.is_admin());
        assert_eq!(provider.token_calls.load(Ordering::SeqCst), 1);

        // Later notifications never bring loading back
        provider.notify(None);
        rx.changed().await.expect("published");
        assert!(!rx.borrow().loading());
        assert_eq!(gate.access_level(), AccessLevel::Anonymous);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_user_notification_resolves() {
        let gate = SessionGate::start(Arc::new(FakeIdentity::new()));
        let session = gate.wait_resolved().await;
        assert_eq!(session.access_level(), AccessLevel::Anonymous);
        assert!(gate.credential().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_claims_failure_is_not_admin() {
        let provider = Arc::new(FakeIdentity::new().with_user("bia", true));
        provider.fail_tokens(true);
        provider.notify(Some(FakeIdentity::identity("bia")));
        let gate = SessionGate::start(provider);

        let session = gate.wait_resolved().await;
        assert_eq!(session.access_level(), AccessLevel::AuthenticatedUser);
        assert!(!gate.is_admin());
        assert!(gate.credential().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_never_pairs_old_claims() {
        let provider = Arc::new(
            FakeIdentity::new()
                .with_user("admin", true)
                .with_user("guest", false)
                .with_token_delay(Duration::from_millis(200)),
        );
        provider.notify(Some(FakeIdentity::identity("admin")));
        let gate = SessionGate::start(provider.clone());
        let mut rx = gate.subscribe();
        gate.wait_resolved().await;
        rx.borrow_and_update();

        provider.notify(Some(FakeIdentity::identity("guest")));
        rx.changed().await.expect("published");
        let session = rx.borrow_and_update().clone();
        assert_eq!(
            session.identity().map(|i| i.uid.as_str()),
            Some("guest")
        );
        assert!(!session.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_waits_for_resolution() {
        let provider = Arc::new(
            FakeIdentity::new()
                .with_user("ana", true)
                .with_token_delay(Duration::from_millis(300)),
        );
        let gate = SessionGate::start(provider);
        gate.wait_resolved().await;

        let session = gate
            .sign_in(&email("ana"), &SecretString::from("pw"))
            .await
            .expect("signed in");
        assert!(session.is_admin());
        assert!(gate.credential().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_keep_on_failure_keeps_session() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let gate = SessionGate::start(provider.clone());
        gate.sign_in(&email("ana"), &SecretString::from("pw"))
            .await
            .expect("signed in");

        provider.fail_sign_out(true);
        let result = gate.sign_out(SignOutPolicy::KeepOnFailure).await;
        assert!(result.is_err());
        assert!(gate.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_force_local_clears_session() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let gate = SessionGate::start(provider.clone());
        gate.sign_in(&email("ana"), &SecretString::from("pw"))
            .await
            .expect("signed in");

        provider.fail_sign_out(true);
        let result = gate.sign_out(SignOutPolicy::ForceLocal).await;
        assert!(result.is_err());
        assert_eq!(gate.access_level(), AccessLevel::Anonymous);
        assert!(gate.credential().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_success() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let gate = SessionGate::start(provider);
        gate.sign_in(&email("ana"), &SecretString::from("pw"))
            .await
            .expect("signed in");

        gate.sign_out(SignOutPolicy::KeepOnFailure)
            .await
            .expect("signed out");
        assert_eq!(gate.access_level(), AccessLevel::Anonymous);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_listener() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let gate = SessionGate::start(provider.clone());
        gate.wait_resolved().await;
        gate.shutdown().await;

        provider.notify(Some(FakeIdentity::identity("ana")));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gate.access_level(), AccessLevel::Anonymous);
        assert_eq!(provider.token_calls.load(Ordering::SeqCst), 0);
    }
}
