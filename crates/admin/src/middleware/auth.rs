//! Admin guard extractor.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde_json::json;

use crate::identity::Identity;
use crate::session::guard::{self, CHECKING_MESSAGE, ENTRY_POINT, GuardDecision};
use crate::state::AppState;

/// The operator a protected handler runs for.
#[derive(Clone)]
pub struct AdminContext {
    pub identity: Identity,
    /// Credential as of request time.
    pub credential: SecretString,
}

impl std::fmt::Debug for AdminContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminContext")
            .field("identity", &self.identity)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

/// Extractor that requires a resolved administrator session.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Olá, {}", admin.identity.uid)
/// }
/// ```
pub struct RequireAdmin(pub AdminContext);

/// Why a protected view was not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// Session not resolved yet. No navigation.
    Checking,
    /// Anonymous or non-admin.
    Redirect,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Checking => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "1")],
                Json(json!({ "status": CHECKING_MESSAGE })),
            )
                .into_response(),
            Self::Redirect => Redirect::to(ENTRY_POINT).into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.gate().snapshot();

        match guard::evaluate(&session) {
            GuardDecision::Checking => Err(GuardRejection::Checking),
            GuardDecision::Redirect => Err(GuardRejection::Redirect),
            GuardDecision::Render => {
                // Render implies identity and credential
                let (Some(identity), Some(credential)) =
                    (session.identity(), session.credential())
                else {
                    return Err(GuardRejection::Redirect);
                };
                Ok(Self(AdminContext {
                    identity: identity.clone(),
                    credential: credential.clone(),
                }))
            }
        }
    }
}
