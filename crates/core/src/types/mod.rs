//! Core types for the Preço Real console.
//!
//! Type-safe wrappers for identifiers and prices, plus the JSON records
//! exchanged with the catalog, store, agents and monitoring services.

pub mod email;
pub mod id;
pub mod metrics;
pub mod price;
pub mod product;
pub mod status;
pub mod task;

pub use email::{Email, EmailError};
pub use id::*;
pub use metrics::{DailyCount, GeneralMetrics, PriceMetrics, PricePoint, PriceTrendPoint, UsageMetrics};
pub use price::{Price, PriceError};
pub use product::{
    Criticism, NewProduct, Product, ProductRecord, Store, StoreAssignment, Suggestion,
};
pub use status::*;
pub use task::{IntakePayload, TaskStatusResponse, TaskTicket};
