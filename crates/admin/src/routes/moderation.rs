//! Pending products and AI suggestions awaiting review.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use preco_real_core::{Product, ProductId, Suggestion, SuggestionId};
use tracing::instrument;

use crate::error::ConsoleError;
use crate::middleware::RequireAdmin;
use crate::services::Ack;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/pending-products", get(pending_products))
        .route("/admin/pending-products/{id}/approve", post(approve_product))
        .route("/admin/pending-products/{id}/reject", post(reject_product))
        .route("/admin/suggestions", get(suggestions))
        .route("/admin/suggestions/{id}/reject", put(reject_suggestion))
}

/// GET /admin/pending-products
#[instrument(skip_all)]
async fn pending_products(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ConsoleError> {
    let products = state.services().products()?;
    Ok(Json(products.pending(&admin.credential).await?))
}

/// POST /admin/pending-products/{id}/approve
#[instrument(skip(admin, state))]
async fn approve_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Ack>, ConsoleError> {
    let products = state.services().products()?;
    let ack = products.approve(&id, &admin.credential).await?;
    tracing::info!(product_id = %id, "product approved");
    Ok(Json(ack))
}

/// POST /admin/pending-products/{id}/reject
#[instrument(skip(admin, state))]
async fn reject_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Ack>, ConsoleError> {
    let products = state.services().products()?;
    let ack = products.reject(&id, &admin.credential).await?;
    tracing::info!(product_id = %id, "product rejected");
    Ok(Json(ack))
}

/// GET /admin/suggestions
#[instrument(skip_all)]
async fn suggestions(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Suggestion>>, ConsoleError> {
    let suggestions = state.services().suggestions()?;
    Ok(Json(suggestions.list(&admin.credential).await?))
}

/// PUT /admin/suggestions/{id}/reject
#[instrument(skip(admin, state))]
async fn reject_suggestion(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<SuggestionId>,
) -> Result<Json<Ack>, ConsoleError> {
    let suggestions = state.services().suggestions()?;
    Ok(Json(suggestions.reject(&id, &admin.credential).await?))
}
