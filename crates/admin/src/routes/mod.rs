//! HTTP route handlers for the console.
//!
//! Every view answers JSON. Protected views take
//! [`RequireAdmin`](crate::middleware::RequireAdmin) and redirect to `/`
//! when the session is not an administrator's.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                                   - Session view (public entry point)
//! POST   /auth/login                         - Sign in (admins only)
//! POST   /auth/register                      - Create account
//! POST   /auth/logout                        - Sign out, redirect to /
//!
//! GET    /admin/dashboard                    - Metrics summary
//! GET    /admin/pending-products             - Products awaiting review
//! POST   /admin/pending-products/{id}/approve
//! POST   /admin/pending-products/{id}/reject
//! GET    /admin/suggestions                  - AI suggestions
//! PUT    /admin/suggestions/{id}/reject
//!
//! GET    /admin/canonicos                    - Canonical catalog (?search=&category=)
//! POST   /admin/canonicos
//! GET    /admin/canonicos/{id}
//! PUT    /admin/canonicos/{id}
//! DELETE /admin/canonicos/{id}
//! GET    /admin/canonicos/intake             - Intake form state
//! POST   /admin/canonicos/intake             - Submit text or category
//! POST   /admin/canonicos/intake/image       - Submit photo (multipart `file`)
//! DELETE /admin/canonicos/intake             - Unmount intake view
//!
//! GET    /admin/vitrine                      - Store showcase (?store_id=)
//! POST   /admin/vitrine/assign               - Offer canonical product in a store
//!
//! GET    /admin/criticas                     - Criticism queue
//! GET    /admin/criticas/products/{id}
//! PUT    /admin/criticas/products/{id}
//!
//! GET    /monitoring/prices                  - Price history (?product_id=)
//! GET    /healthcheck                        - Backend health document
//! ```

pub mod catalog;
pub mod criticisms;
pub mod dashboard;
pub mod moderation;
pub mod monitoring;
pub mod session;
pub mod showcase;

use axum::Router;

use crate::config::IntakeConfig;
use crate::state::AppState;

/// Build the console router.
pub fn routes(intake: &IntakeConfig) -> Router<AppState> {
    Router::new()
        .merge(session::router())
        .merge(dashboard::router())
        .merge(moderation::router())
        .merge(catalog::router(intake))
        .merge(showcase::router())
        .merge(criticisms::router())
        .merge(monitoring::router())
}
