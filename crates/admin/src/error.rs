//! Unified error handling for the console.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::Service;
use crate::identity::IdentityError;

/// Errors surfaced by console operations.
///
/// Every variant carries an operator-facing message. Values are `Clone` so
/// the intake form can keep the last failure in its published state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// A service URL or identity key is not configured.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// Non-2xx response (with status) or network failure (without).
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// A local file could not be read or encoded.
    #[error("Falha ao ler a imagem: {0}")]
    Read(String),

    /// The task reported success but carried no result.
    #[error("A tarefa foi concluída, mas não retornou resultado.")]
    EmptyResult,

    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The background task ended in FAILURE.
    #[error("{0}")]
    TaskFailed(String),

    /// Identity provider rejected the operation.
    #[error("{0}")]
    Identity(String),

    /// A newer submission replaced this one.
    #[error("Envio substituído por uma nova solicitação.")]
    Superseded,
}

impl ConsoleError {
    /// `ConfigurationMissing` for an unset service URL.
    #[must_use]
    pub fn missing_service(service: Service) -> Self {
        Self::ConfigurationMissing(format!("URL da API de {} não configurada.", service.label()))
    }

    /// `Transport` for a non-2xx response, preferring the backend's message.
    #[must_use]
    pub fn http(status: u16, message: Option<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.unwrap_or_else(|| format!("HTTP error! status: {status}")),
        }
    }

    /// HTTP status of a `Transport` error, if the server answered at all.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigurationMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transport { .. } | Self::EmptyResult | Self::TaskFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Read(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Identity(_) => StatusCode::UNAUTHORIZED,
            Self::Superseded => StatusCode::CONFLICT,
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<IdentityError> for ConsoleError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotConfigured => Self::ConfigurationMissing(err.to_string()),
            other => Self::Identity(other.to_string()),
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Upstream failures are worth a Sentry event; operator mistakes are not
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                upstream_status = ?self.http_status(),
                sentry_event_id = %event_id,
                "Console request error"
            );
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Set the Sentry user context for the signed-in operator.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_prefers_backend_message() {
        let err = ConsoleError::http(404, Some("Sugestão não encontrada.".into()));
        assert_eq!(err.to_string(), "Sugestão não encontrada.");
        assert_eq!(err.http_status(), Some(404));

        let err = ConsoleError::http(500, None);
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn test_status_codes() {
        fn get_status(err: ConsoleError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(ConsoleError::missing_service(Service::Agents)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(ConsoleError::http(500, None)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(ConsoleError::Validation("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(ConsoleError::Read("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ConsoleError::Identity("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(ConsoleError::Superseded), StatusCode::CONFLICT);
    }

    #[test]
    fn test_identity_not_configured_maps_to_configuration_missing() {
        let err: ConsoleError = IdentityError::NotConfigured.into();
        assert!(matches!(err, ConsoleError::ConfigurationMissing(_)));

        let err: ConsoleError = IdentityError::Rejected("INVALID_PASSWORD".into()).into();
        assert!(matches!(err, ConsoleError::Identity(_)));
    }
}
