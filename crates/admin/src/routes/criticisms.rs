//! Criticism queue and resolution.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use preco_real_core::{Criticism, NewProduct, Product, ProductId};
use tracing::instrument;

use crate::error::ConsoleError;
use crate::middleware::RequireAdmin;
use crate::services::Ack;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/criticas", get(queue))
        .route(
            "/admin/criticas/products/{id}",
            get(criticized_product).put(resolve),
        )
}

/// GET /admin/criticas
#[instrument(skip_all)]
async fn queue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Criticism>>, ConsoleError> {
    let criticisms = state.services().criticisms()?;
    Ok(Json(criticisms.list(&admin.credential).await?))
}

/// The product a criticism points at.
///
/// GET /admin/criticas/products/{id}
#[instrument(skip(admin, state))]
async fn criticized_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ConsoleError> {
    let products = state.services().products()?;
    Ok(Json(products.get(&id, &admin.credential).await?))
}

/// Save the corrected product.
///
/// PUT /admin/criticas/products/{id}
#[instrument(skip(admin, state, product))]
async fn resolve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(product): Json<NewProduct>,
) -> Result<Json<Ack>, ConsoleError> {
    let products = state.services().products()?;
    let ack = products.update(&id, &product, &admin.credential).await?;
    tracing::info!(product_id = %id, "criticized product updated");
    Ok(Json(ack))
}
