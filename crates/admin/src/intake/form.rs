//! Catalog intake view.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──task id──▶ Polling ──▶ Succeeded
//!  │                   │                      │
//!  └── invalid ──▶ Failed ◀──── error ────────┘
//! ```
//!
//! A terminal state is left only by a new submission. After
//! [`IntakeView::teardown`] no further state is recorded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use preco_real_core::{ProductRecord, TaskId};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::orchestrator::{TaskHandle, TaskOrchestrator, TaskUpdate};
use super::request::IntakeFields;
use crate::config::Service;
use crate::error::ConsoleError;
use crate::session::{GuardDecision, GuardWatch, SessionGate};

pub const MISSING_TOKEN_MESSAGE: &str = "token ausente";
pub const TORN_DOWN_MESSAGE: &str = "A tela de ingestão foi encerrada.";

/// Observable state of the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IntakeState {
    #[default]
    Idle,
    Submitting,
    Polling {
        task_id: TaskId,
    },
    Succeeded {
        result: Value,
        /// Present when the result has the product record shape.
        product: Option<ProductRecord>,
    },
    Failed {
        #[serde(serialize_with = "error_message")]
        error: ConsoleError,
    },
}

impl IntakeState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

fn error_message<S: Serializer>(error: &ConsoleError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// One mounted intake form.
#[derive(Clone)]
pub struct IntakeView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    orchestrator: Option<TaskOrchestrator>,
    gate: SessionGate,
    state: watch::Sender<IntakeState>,
    teardown: CancellationToken,
    generation: AtomicU64,
    driver: Mutex<Option<CancellationToken>>,
}

impl IntakeView {
    /// Mount the view.
    ///
    /// The view tears itself down as soon as the guard stops rendering it
    /// (sign-out or loss of the admin claim). `orchestrator` is `None` when
    /// the agents service is not configured.
    #[must_use]
    pub fn mount(orchestrator: Option<TaskOrchestrator>, gate: SessionGate) -> Self {
        let guard = GuardWatch::new(gate.subscribe());
        let view = Self {
            inner: Arc::new(ViewInner {
                orchestrator,
                gate,
                state: watch::Sender::new(IntakeState::Idle),
                teardown: CancellationToken::new(),
                generation: AtomicU64::new(0),
                driver: Mutex::new(None),
            }),
        };

        tokio::spawn(follow_guard(
            guard,
            view.inner.teardown.clone(),
            Arc::downgrade(&view.inner),
        ));
        view
    }

    #[must_use]
    pub fn state(&self) -> IntakeState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IntakeState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner.teardown.is_cancelled()
    }

    /// Start a submission from the form's inputs.
    ///
    /// Validation and configuration failures are recorded as
    /// [`IntakeState::Failed`] without any network call, and also returned.
    ///
    /// # Errors
    ///
    /// `Validation` for missing or ambiguous input, a missing credential or
    /// a torn-down view; `ConfigurationMissing` when the agents service URL
    /// is unset.
    pub fn submit(&self, fields: &IntakeFields) -> Result<(), ConsoleError> {
        if self.is_torn_down() {
            return Err(ConsoleError::Validation(TORN_DOWN_MESSAGE.to_string()));
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let driver = self.inner.teardown.child_token();
        let previous = self
            .inner
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(driver.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let prepared = fields.to_request().and_then(|request| {
            let credential = self
                .inner
                .gate
                .credential()
                .ok_or_else(|| ConsoleError::Validation(MISSING_TOKEN_MESSAGE.to_string()))?;
            let orchestrator = self
                .inner
                .orchestrator
                .clone()
                .ok_or_else(|| ConsoleError::missing_service(Service::Agents))?;
            Ok((request, credential, orchestrator))
        });

        let (request, credential, orchestrator) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::warn!(error = %error, "intake submission rejected");
                self.inner.apply(
                    generation,
                    IntakeState::Failed {
                        error: error.clone(),
                    },
                );
                return Err(error);
            }
        };

        self.inner.apply(generation, IntakeState::Submitting);
        let handle = orchestrator.submit(request, credential);
        tokio::spawn(drive(Arc::clone(&self.inner), generation, driver, handle));
        Ok(())
    }

    /// Unmount the view: cancel polling and freeze the state.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl ViewInner {
    /// Record `next` unless the view was torn down or resubmitted.
    ///
    /// The check runs under the state lock, so it cannot race `teardown`.
    fn apply(&self, generation: u64, next: IntakeState) -> bool {
        self.state.send_if_modified(|state| {
            if self.teardown.is_cancelled()
                || self.generation.load(Ordering::SeqCst) != generation
            {
                return false;
            }
            *state = next;
            true
        })
    }

    fn teardown(&self) {
        let mut first = false;
        self.state.send_if_modified(|_| {
            first = !self.teardown.is_cancelled();
            self.teardown.cancel();
            false
        });
        if let Some(orchestrator) = &self.orchestrator {
            orchestrator.cancel_active();
        }
        if first {
            tracing::info!("intake view torn down");
        }
    }
}

/// Forward orchestrator updates into the view's state.
async fn drive(
    view: Arc<ViewInner>,
    generation: u64,
    driver: CancellationToken,
    mut handle: TaskHandle,
) {
    loop {
        let update = tokio::select! {
            biased;
            () = driver.cancelled() => {
                handle.cancel();
                return;
            }
            update = handle.next() => update,
        };
        let Some(update) = update else { return };

        let next = match update {
            TaskUpdate::Pending { task_id } => IntakeState::Polling { task_id },
            TaskUpdate::Succeeded { result, .. } => IntakeState::Succeeded {
                product: ProductRecord::from_result(&result),
                result,
            },
            TaskUpdate::Failed {
                error: ConsoleError::Superseded,
                ..
            } => return,
            TaskUpdate::Failed { error, .. } => IntakeState::Failed { error },
        };
        view.apply(generation, next);
    }
}

/// Tear the view down once the guard no longer renders it.
async fn follow_guard(mut guard: GuardWatch, teardown: CancellationToken, view: Weak<ViewInner>) {
    loop {
        let decision = tokio::select! {
            () = teardown.cancelled() => return,
            decision = guard.changed() => decision,
        };
        match decision {
            Some(GuardDecision::Render | GuardDecision::Checking) => {}
            Some(GuardDecision::Redirect) | None => {
                if let Some(view) = view.upgrade() {
                    tracing::info!("session no longer admin, unmounting intake view");
                    view.teardown();
                }
                return;
            }
        }
    }
}
