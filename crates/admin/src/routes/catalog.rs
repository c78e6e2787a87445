//! Canonical catalog: listing, CRUD and AI-driven intake.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use preco_real_core::catalog::{ProductFilter, categories};
use preco_real_core::{NewProduct, Product, ProductId};
use serde::Serialize;
use tracing::instrument;

use crate::config::IntakeConfig;
use crate::error::ConsoleError;
use crate::intake::{ImageSource, IntakeFields, IntakeState};
use crate::middleware::RequireAdmin;
use crate::services::Ack;
use crate::state::AppState;

/// Catalog routes. The photo upload route accepts bodies up to
/// `intake.max_image_bytes`.
pub fn router(intake: &IntakeConfig) -> Router<AppState> {
    Router::new()
        .route("/admin/canonicos", get(list).post(create))
        .route(
            "/admin/canonicos/{id}",
            get(show).put(update).delete(remove),
        )
        .route(
            "/admin/canonicos/intake",
            get(intake_state).post(submit_intake).delete(close_intake),
        )
        .route(
            "/admin/canonicos/intake/image",
            post(submit_intake_image).layer(DefaultBodyLimit::max(intake.max_image_bytes)),
        )
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    /// Every category present before filtering
    pub categories: Vec<String>,
    pub filter: ProductFilter,
}

/// GET /admin/canonicos?search=&category=
#[instrument(skip(admin, state))]
async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<CatalogPage>, ConsoleError> {
    let products = state.services().products()?;
    let canonical: Vec<Product> = products
        .list(&admin.credential)
        .await?
        .into_iter()
        .filter(Product::is_canonical)
        .collect();

    Ok(Json(CatalogPage {
        categories: categories(&canonical),
        products: filter.apply(&canonical).into_iter().cloned().collect(),
        filter,
    }))
}

/// GET /admin/canonicos/{id}
#[instrument(skip(admin, state))]
async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ConsoleError> {
    let products = state.services().products()?;
    Ok(Json(products.get(&id, &admin.credential).await?))
}

/// POST /admin/canonicos
#[instrument(skip_all)]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Ack>), ConsoleError> {
    validate(&product)?;
    let products = state.services().products()?;
    let ack = products.create(&product, &admin.credential).await?;
    tracing::info!(name = %product.name, "canonical product created");
    Ok((StatusCode::CREATED, Json(ack)))
}

/// PUT /admin/canonicos/{id}
#[instrument(skip(admin, state, product))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(product): Json<NewProduct>,
) -> Result<Json<Ack>, ConsoleError> {
    validate(&product)?;
    let products = state.services().products()?;
    Ok(Json(products.update(&id, &product, &admin.credential).await?))
}

/// DELETE /admin/canonicos/{id}
#[instrument(skip(admin, state))]
async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ConsoleError> {
    let products = state.services().products()?;
    products.delete(&id, &admin.credential).await?;
    tracing::info!(product_id = %id, "canonical product deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(product: &NewProduct) -> Result<(), ConsoleError> {
    if product.name.trim().is_empty() {
        return Err(ConsoleError::Validation(
            "O nome do produto é obrigatório.".to_string(),
        ));
    }
    Ok(())
}

/// GET /admin/canonicos/intake
async fn intake_state(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<IntakeState> {
    Json(
        state
            .mounted_intake_view()
            .map(|view| view.state())
            .unwrap_or_default(),
    )
}

/// Start an intake from text or category.
///
/// POST /admin/canonicos/intake
#[instrument(skip_all)]
async fn submit_intake(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(fields): Json<IntakeFields>,
) -> Result<(StatusCode, Json<IntakeState>), ConsoleError> {
    let view = state.intake_view();
    view.submit(&fields)?;
    Ok((StatusCode::ACCEPTED, Json(view.state())))
}

/// Name used when the upload carries none.
const UPLOAD_FILE_NAME: &str = "imagem.jpg";

/// Start an intake from an uploaded photo (`file` field).
///
/// POST /admin/canonicos/intake/image
#[instrument(skip_all)]
async fn submit_intake_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IntakeState>), ConsoleError> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ConsoleError::Read(e.body_text()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or(UPLOAD_FILE_NAME).to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ConsoleError::Read(e.body_text()))?;
            image = Some(ImageSource::Bytes {
                file_name,
                bytes: bytes.to_vec(),
            });
        }
    }

    let mut fields = IntakeFields::new();
    if let Some(image) = image {
        fields.set_image(image);
    }

    let view = state.intake_view();
    view.submit(&fields)?;
    Ok((StatusCode::ACCEPTED, Json(view.state())))
}

/// Unmount the intake view, cancelling any polling.
///
/// DELETE /admin/canonicos/intake
async fn close_intake(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> StatusCode {
    state.unmount_intake_view();
    StatusCode::NO_CONTENT
}
