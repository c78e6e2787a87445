//! Public entry point and sign-in/sign-out.

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use preco_real_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ConsoleError;
use crate::session::SessionView;
use crate::session::guard::ENTRY_POINT;
use crate::state::AppState;

/// Shown when a non-admin signs in.
pub const NOT_ADMIN_MESSAGE: &str = "Você não tem permissão para acessar este painel.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(ENTRY_POINT, get(entry_point))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    fn parse(self) -> Result<(Email, SecretString), ConsoleError> {
        let email =
            Email::parse(&self.email).map_err(|e| ConsoleError::Validation(e.to_string()))?;
        if self.password.is_empty() {
            return Err(ConsoleError::Validation("Informe a senha.".to_string()));
        }
        Ok((email, SecretString::from(self.password)))
    }
}

/// Who is signed in, as far as the gate knows.
///
/// GET /
async fn entry_point(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView::from(&state.gate().snapshot()))
}

/// POST /auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionView>, ConsoleError> {
    let (email, password) = credentials.parse()?;
    let session = state.gate().sign_in(&email, &password).await?;
    require_admin(&state, SessionView::from(&session)).await
}

/// POST /auth/register
#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionView>, ConsoleError> {
    let (email, password) = credentials.parse()?;
    let session = state.gate().register(&email, &password).await?;
    require_admin(&state, SessionView::from(&session)).await
}

/// Non-admins are signed straight back out.
async fn require_admin(
    state: &AppState,
    view: SessionView,
) -> Result<Json<SessionView>, ConsoleError> {
    if view.is_admin {
        tracing::info!(uid = ?view.identity.as_ref().map(|i| i.uid.as_str()), "admin signed in");
        return Ok(Json(view));
    }

    tracing::warn!("non-admin sign-in refused");
    if let Err(e) = state.gate().sign_out(state.config().sign_out_policy).await {
        tracing::warn!(error = %e, "failed to sign out non-admin");
    }
    Err(ConsoleError::Identity(NOT_ADMIN_MESSAGE.to_string()))
}

/// Sign out and go back to the entry point.
///
/// POST /auth/logout
#[instrument(skip_all)]
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.unmount_intake_view();

    if let Err(e) = state.gate().sign_out(state.config().sign_out_policy).await {
        tracing::warn!(error = %e, "sign-out failed");
    }

    Redirect::to(ENTRY_POINT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;
    use crate::identity::fake::FakeIdentity;
    use crate::session::SessionGate;

    async fn signed_in_state(provider: &Arc<FakeIdentity>) -> AppState {
        let gate = SessionGate::start(provider.clone());
        gate.wait_resolved().await;
        gate.sign_in(
            &Email::parse("ana@precoreal.app").unwrap(),
            &SecretString::from("s3nha"),
        )
        .await
        .unwrap();
        let config = AdminConfig::from_lookup(&|_| None).unwrap();
        AppState::new(config, gate, reqwest::Client::new())
    }

    async fn post_logout(state: &AppState) -> axum::response::Response {
        crate::app(state.clone())
            .oneshot(Request::post("/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_logout_redirects_to_entry_point() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let state = signed_in_state(&provider).await;

        let response = post_logout(&state).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), ENTRY_POINT);
        assert!(state.gate().current_identity().is_none());
    }

    #[tokio::test]
    async fn test_logout_still_redirects_when_provider_fails() {
        let provider = Arc::new(FakeIdentity::new().with_user("ana", true));
        let state = signed_in_state(&provider).await;
        provider.fail_sign_out(true);

        let response = post_logout(&state).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), ENTRY_POINT);
        // Keep-on-failure leaves the session in place
        assert!(state.gate().is_admin());
    }
}
