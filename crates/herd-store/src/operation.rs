//! Observable lifecycle of one remote call.
//!
//! ```text
//! NotStarted --begin--> InProgress --succeed--> Success
//!                                  \--fail----> Failure(message)
//! any state except InProgress --reset--> NotStarted
//! ```
//!
//! An [`Operation`] performs no I/O itself. The repository drives it and any
//! number of observers watch it through a `tokio::sync::watch` channel.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    #[default]
    NotStarted,
    InProgress,
    Success,
    /// Carries a message fit for display.
    Failure(String),
}

impl OperationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            OperationStatus::NotStarted => "NotStarted",
            OperationStatus::InProgress => "InProgress",
            OperationStatus::Success => "Success",
            OperationStatus::Failure(_) => "Failure",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, OperationStatus::Success | OperationStatus::Failure(_))
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            OperationStatus::Failure(message) => Some(message),
            _ => None,
        }
    }
}

/// Cloning yields another handle onto the same state.
#[derive(Debug, Clone)]
pub struct Operation {
    state: Arc<watch::Sender<OperationStatus>>,
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OperationStatus::NotStarted);
        Self { state: Arc::new(tx) }
    }

    pub fn status(&self) -> OperationStatus {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.state.subscribe()
    }

    pub fn begin(&self) -> Result<()> {
        self.transition(OperationStatus::InProgress, |s| {
            matches!(s, OperationStatus::NotStarted)
        })
    }

    pub fn succeed(&self) -> Result<()> {
        self.transition(OperationStatus::Success, |s| {
            matches!(s, OperationStatus::InProgress)
        })
    }

    pub fn fail(&self, message: impl Into<String>) -> Result<()> {
        self.transition(OperationStatus::Failure(message.into()), |s| {
            matches!(s, OperationStatus::InProgress)
        })
    }

    /// Return to `NotStarted` so the owner can try again. An operation that
    /// is still in flight cannot be reset.
    pub fn reset(&self) -> Result<()> {
        self.transition(OperationStatus::NotStarted, |s| {
            !matches!(s, OperationStatus::InProgress)
        })
    }

    /// Drive this operation through one remote call.
    ///
    /// The call's error is returned unchanged; the operation records its
    /// [`StoreError::user_message`].
    pub async fn track<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin()?;
        match call.await {
            Ok(value) => {
                self.succeed()?;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote call failed");
                self.fail(e.user_message())?;
                Err(e)
            }
        }
    }

    /// Wait for `Success` or `Failure`.
    pub async fn finished(&self) -> OperationStatus {
        let mut rx = self.subscribe();
        let status = match rx.wait_for(OperationStatus::is_finished).await {
            Ok(status) => status.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.status(),
        };
        status
    }

    fn transition(
        &self,
        to: OperationStatus,
        allowed: impl Fn(&OperationStatus) -> bool,
    ) -> Result<()> {
        let mut rejected_from = None;
        let to_name = to.name();
        self.state.send_if_modified(|current| {
            if allowed(current) {
                debug!(from = current.name(), to = to_name, "operation transition");
                *current = to;
                true
            } else {
                rejected_from = Some(current.name());
                false
            }
        });

        match rejected_from {
            Some(from) => Err(StoreError::InvalidTransition { from, to: to_name }),
            None => Ok(()),
        }
    }
}
