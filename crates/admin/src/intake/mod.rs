//! AI-driven catalog intake.
//!
//! An operator describes a product by text, by category or with a photo.
//! The agents service turns that into a background task; the
//! [`TaskOrchestrator`] submits it and polls until it finishes, and the
//! [`IntakeView`] turns the updates into form state.

pub mod client;
pub mod form;
pub mod orchestrator;
pub mod request;

pub use client::{AgentsClient, SubmitOutcome, TaskBackend};
pub use form::{IntakeState, IntakeView};
pub use orchestrator::{TaskHandle, TaskOrchestrator, TaskUpdate};
pub use request::{ImageFile, ImageSource, IngestionRequest, IntakeBody, IntakeFields};
