//! Store showcase ("vitrine"): what each store offers, and assigning
//! canonical products to stores.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use preco_real_core::catalog::Showcase;
use preco_real_core::{Price, ProductId, StoreAssignment, StoreId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ConsoleError;
use crate::middleware::RequireAdmin;
use crate::services::Ack;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/vitrine", get(showcase))
        .route("/admin/vitrine/assign", post(assign))
}

#[derive(Debug, Deserialize)]
pub struct ShowcaseQuery {
    pub store_id: Option<StoreId>,
}

/// GET /admin/vitrine?store_id=
#[instrument(skip(admin, state))]
async fn showcase(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ShowcaseQuery>,
) -> Result<Json<Showcase>, ConsoleError> {
    let stores = state.services().stores()?;
    let products = state.services().products()?;

    let (stores, products) = tokio::try_join!(
        stores.list(&admin.credential),
        products.list(&admin.credential),
    )?;

    Ok(Json(Showcase::build(
        stores,
        products,
        query.store_id.as_ref(),
    )))
}

#[derive(Debug, Deserialize)]
pub struct AssignForm {
    pub canonical_product_id: ProductId,
    pub store_id: StoreId,
    /// As typed by the operator, e.g. "4,99"
    pub price: String,
}

/// POST /admin/vitrine/assign
#[instrument(skip(admin, state))]
async fn assign(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<AssignForm>,
) -> Result<(StatusCode, Json<Ack>), ConsoleError> {
    let price = Price::parse(&form.price).map_err(|e| ConsoleError::Validation(e.to_string()))?;
    let assignment = StoreAssignment {
        canonical_product_id: form.canonical_product_id,
        store_id: form.store_id,
        price,
    };

    let products = state.services().products()?;
    let ack = products
        .from_canonical(&assignment, &admin.credential)
        .await?;
    tracing::info!(
        product_id = %assignment.canonical_product_id,
        store_id = %assignment.store_id,
        price = %assignment.price,
        "product assigned to store"
    );
    Ok((StatusCode::CREATED, Json(ack)))
}
