//! Price monitoring and service health. Neither requires a session.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use preco_real_core::{PricePoint, ProductId};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::ConsoleError;
use crate::state::AppState;

pub const MISSING_PRODUCT_ID_MESSAGE: &str = "Informe o ID do produto.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/monitoring/prices", get(price_history))
        .route("/healthcheck", get(healthcheck))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    #[serde(default)]
    pub product_id: Option<String>,
}

/// GET /monitoring/prices?product_id=
#[instrument(skip(state))]
async fn price_history(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<Vec<PricePoint>>, ConsoleError> {
    let product_id = query
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ProductId::from)
        .ok_or_else(|| ConsoleError::Validation(MISSING_PRODUCT_ID_MESSAGE.to_string()))?;

    let monitoring = state.services().monitoring()?;
    let credential = state.gate().credential();
    Ok(Json(
        monitoring
            .price_history(&product_id, credential.as_ref())
            .await?,
    ))
}

/// GET /healthcheck
#[instrument(skip_all)]
async fn healthcheck(State(state): State<AppState>) -> Result<Json<Value>, ConsoleError> {
    let health = state.services().health()?;
    Ok(Json(health.status().await?))
}
