//! Preço Real Core - Shared catalog types.
//!
//! This crate provides the types used across the Preço Real operations console:
//! - `admin` - Operations console (session gate, catalog intake, CRUD views)
//! - `cli` - Terminal front-end for catalog intake and health probes
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no timers. This keeps it lightweight and trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses and wire records
//! - [`catalog`] - Derived view state (filters, showcase partition, dashboard)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use types::*;
