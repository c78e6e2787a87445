//! HTTP middleware and extractors for the console.
//!
//! Every protected view takes a [`RequireAdmin`] argument; the guard runs on
//! each request against the gate's current snapshot.

pub mod auth;

pub use auth::{AdminContext, GuardRejection, RequireAdmin};
