//! Submit-and-poll driver for catalog intake tasks.
//!
//! One submission is active per orchestrator. Submitting again supersedes
//! the previous one: its loop is cancelled and has finished before the new
//! submission touches the network, so two loops never poll concurrently.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use preco_real_core::{TaskId, TaskStatus};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::client::{SubmitOutcome, TaskBackend};
use super::request::IngestionRequest;
use crate::error::ConsoleError;

/// Message used when a failed task carries no error of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "A tarefa de ingestão falhou.";

/// Progress of one submission as seen by its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    /// Queued or still running.
    Pending { task_id: TaskId },
    /// Terminal. `task_id` is `None` for synchronous answers.
    Succeeded {
        task_id: Option<TaskId>,
        result: Value,
    },
    /// Terminal.
    Failed {
        task_id: Option<TaskId>,
        error: ConsoleError,
    },
}

impl TaskUpdate {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Caller's end of a submission.
///
/// Yields pending updates, then exactly one terminal update, then `None`.
/// A cancelled submission yields no terminal update. Dropping the handle
/// cancels the submission.
pub struct TaskHandle {
    updates: mpsc::UnboundedReceiver<TaskUpdate>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl TaskHandle {
    /// Next update, or `None` once the submission has ended.
    pub async fn next(&mut self) -> Option<TaskUpdate> {
        self.updates.recv().await
    }

    /// Stop the submission. No request is issued and no update is
    /// delivered afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the handle and return the terminal update, if any.
    pub async fn wait(mut self) -> Option<TaskUpdate> {
        let mut last = None;
        while let Some(update) = self.next().await {
            if update.is_terminal() {
                last = Some(update);
            }
        }
        last
    }
}

/// Drives catalog intake submissions against a [`TaskBackend`].
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    backend: Arc<dyn TaskBackend>,
    poll_interval: Duration,
    active: Mutex<Option<ActiveSubmission>>,
}

struct ActiveSubmission {
    cancel: CancellationToken,
    superseded: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TaskOrchestrator {
    #[must_use]
    pub fn new(backend: Arc<dyn TaskBackend>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                backend,
                poll_interval,
                active: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Start a submission, superseding the active one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: IngestionRequest, credential: SecretString) -> TaskHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let superseded = Arc::new(AtomicBool::new(false));

        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = active.take().map(|prev| {
            prev.superseded.store(true, Ordering::SeqCst);
            prev.cancel.cancel();
            prev.task
        });

        let submission = Submission {
            backend: Arc::clone(&self.inner.backend),
            poll_interval: self.inner.poll_interval,
            credential,
            cancel: cancel.clone(),
            superseded: Arc::clone(&superseded),
            updates: tx,
        };

        tracing::info!(kind = request.kind(), "submitting catalog intake");
        let task = tokio::spawn(async move {
            if let Some(previous) = previous
                && let Err(e) = previous.await
            {
                tracing::warn!(error = %e, "superseded intake submission ended abnormally");
            }
            submission.run(request).await;
        });

        *active = Some(ActiveSubmission {
            cancel: cancel.clone(),
            superseded,
            task,
        });

        TaskHandle {
            updates: rx,
            cancel: cancel.clone(),
            _cancel_on_drop: cancel.drop_guard(),
        }
    }

    /// Cancel the active submission, if any.
    pub fn cancel_active(&self) {
        let active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(active) = active {
            active.cancel.cancel();
        }
    }
}

/// One submission's state, owned by its task.
struct Submission {
    backend: Arc<dyn TaskBackend>,
    poll_interval: Duration,
    credential: SecretString,
    cancel: CancellationToken,
    superseded: Arc<AtomicBool>,
    updates: mpsc::UnboundedSender<TaskUpdate>,
}

impl Submission {
    async fn run(self, request: IngestionRequest) {
        let mut task_id = None;
        let terminal = self.drive(request, &mut task_id).await;

        if self.cancel.is_cancelled() {
            if self.superseded.load(Ordering::SeqCst) {
                tracing::info!(task_id = ?task_id, "intake submission superseded");
                let _ = self.updates.send(TaskUpdate::Failed {
                    task_id,
                    error: ConsoleError::Superseded,
                });
            } else {
                tracing::debug!(task_id = ?task_id, "intake submission cancelled");
            }
            return;
        }

        if let Some(update) = terminal {
            match &update {
                TaskUpdate::Failed { error, .. } => {
                    tracing::warn!(task_id = ?task_id, error = %error, "catalog intake failed");
                }
                _ => tracing::info!(task_id = ?task_id, "catalog intake completed"),
            }
            self.emit(update);
        }
    }

    /// Run to a terminal update. `None` means cancelled.
    async fn drive(
        &self,
        request: IngestionRequest,
        task_id: &mut Option<TaskId>,
    ) -> Option<TaskUpdate> {
        let failed = |task_id: Option<TaskId>, error| Some(TaskUpdate::Failed { task_id, error });

        let body = match cancellable(&self.cancel, request.into_body()).await? {
            Ok(body) => body,
            Err(error) => return failed(None, error),
        };

        let submitted =
            cancellable(&self.cancel, self.backend.submit(&body, &self.credential)).await?;
        let ticket = match submitted {
            Ok(SubmitOutcome::Queued(ticket)) => ticket,
            Ok(SubmitOutcome::Completed(result)) => {
                return Some(TaskUpdate::Succeeded {
                    task_id: None,
                    result,
                });
            }
            Err(error) => return failed(None, error),
        };

        let id = ticket.task_id;
        *task_id = Some(id.clone());
        tracing::info!(task_id = %id, "catalog intake queued");
        self.emit(TaskUpdate::Pending {
            task_id: id.clone(),
        });

        loop {
            cancellable(&self.cancel, tokio::time::sleep(self.poll_interval)).await?;

            let polled =
                cancellable(&self.cancel, self.backend.status(&id, &self.credential)).await?;
            let response = match polled {
                Ok(response) => response,
                Err(error) => return failed(Some(id), error),
            };

            match response.status {
                TaskStatus::Pending => {
                    tracing::debug!(task_id = %id, "intake task still pending");
                    self.emit(TaskUpdate::Pending {
                        task_id: id.clone(),
                    });
                }
                TaskStatus::Success => {
                    return match response.result {
                        Some(result) => Some(TaskUpdate::Succeeded {
                            task_id: Some(id),
                            result,
                        }),
                        None => failed(Some(id), ConsoleError::EmptyResult),
                    };
                }
                TaskStatus::Failure => {
                    let message = response
                        .error
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                    return failed(Some(id), ConsoleError::TaskFailed(message));
                }
            }
        }
    }

    fn emit(&self, update: TaskUpdate) {
        if self.cancel.is_cancelled() {
            return;
        }
        // The caller may have stopped listening
        let _ = self.updates.send(update);
    }
}

/// Race `fut` against `cancel`, preferring cancellation.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
