//! Preço Real operations console library.
//!
//! The console holds one operator session per process. Administrators
//! review AI suggestions, moderate submitted products, curate the canonical
//! catalog, assign products to stores and watch usage and price metrics.
//!
//! # Layout
//!
//! - [`session`] - Session Gate and route guard
//! - [`identity`] - identity provider seam (Firebase REST)
//! - [`intake`] - catalog intake: submit, poll, form state
//! - [`services`] - REST clients for the backend services
//! - [`routes`] - JSON views

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod identity;
pub mod intake;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

use axum::{Router, routing::get};

use crate::state::AppState;

/// The console's router with state applied, without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes(&state.config().intake))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
