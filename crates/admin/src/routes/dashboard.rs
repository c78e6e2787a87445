//! Metrics dashboard.

use axum::{Json, Router, extract::State, routing::get};
use preco_real_core::catalog::DashboardSummary;
use tracing::instrument;

use crate::error::ConsoleError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub const METRICS_FAILED_MESSAGE: &str = "Falha ao buscar uma ou mais métricas.";

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/dashboard", get(dashboard))
}

/// Usage, price and general metrics, fetched together.
///
/// GET /admin/dashboard
#[instrument(skip_all)]
async fn dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ConsoleError> {
    let monitoring = state.services().monitoring()?;
    let credential = &admin.credential;

    let (usage, prices, general) = tokio::try_join!(
        monitoring.usage(credential),
        monitoring.prices(credential),
        monitoring.general(credential),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to fetch dashboard metrics");
        ConsoleError::Transport {
            status: e.http_status(),
            message: METRICS_FAILED_MESSAGE.to_string(),
        }
    })?;

    Ok(Json(DashboardSummary::derive(usage, prices, &general)))
}
