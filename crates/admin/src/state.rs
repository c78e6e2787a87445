//! Application state shared across handlers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::AdminConfig;
use crate::intake::{AgentsClient, IntakeView, TaskOrchestrator};
use crate::services::Services;
use crate::session::SessionGate;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the one operator session of this
/// process and the currently mounted intake view, if any.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    gate: SessionGate,
    services: Services,
    orchestrator: Option<TaskOrchestrator>,
    intake: Mutex<Option<IntakeView>>,
}

impl AppState {
    /// Build the state around a started gate.
    ///
    /// The orchestrator is only created when the agents service is
    /// configured.
    #[must_use]
    pub fn new(config: AdminConfig, gate: SessionGate, http: reqwest::Client) -> Self {
        let services = Services::new(http, config.services.clone());
        let orchestrator = services.agents().ok().map(|client| {
            TaskOrchestrator::new(
                Arc::new(AgentsClient::new(client)),
                config.intake.poll_interval,
            )
        });
        if orchestrator.is_none() {
            tracing::warn!("AI_API_URL not set, catalog intake disabled");
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                gate,
                services,
                orchestrator,
                intake: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn gate(&self) -> &SessionGate {
        &self.inner.gate
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    #[must_use]
    pub fn orchestrator(&self) -> Option<&TaskOrchestrator> {
        self.inner.orchestrator.as_ref()
    }

    /// The mounted intake view, mounting a fresh one if there is none or
    /// the previous one was torn down.
    #[must_use]
    pub fn intake_view(&self) -> IntakeView {
        let mut slot = self
            .inner
            .intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(view) if !view.is_torn_down() => view.clone(),
            _ => {
                let view = IntakeView::mount(self.inner.orchestrator.clone(), self.inner.gate.clone());
                *slot = Some(view.clone());
                view
            }
        }
    }

    /// The mounted intake view without mounting one.
    #[must_use]
    pub fn mounted_intake_view(&self) -> Option<IntakeView> {
        self.inner
            .intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tear down and forget the mounted intake view.
    pub fn unmount_intake_view(&self) {
        let view = self
            .inner
            .intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(view) = view {
            view.teardown();
        }
    }
}
