use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Failure signalled by an event source.
///
/// Cheap to clone so a subject can hand the same failure to every observer.
#[derive(Clone)]
pub struct SourceError {
    message: String,
    cause: Option<Rc<dyn StdError>>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn from_error(err: impl StdError + 'static) -> Self {
        Self {
            message: err.to_string(),
            cause: Some(Rc::new(err)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceError")
            .field("message", &self.message)
            .field("has_cause", &self.cause.is_some())
            .finish()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for SourceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref()
    }
}

/// Why a one-shot [`When`](crate::subscriptions::When) wait did not produce a value.
#[derive(Clone, Debug, Error)]
pub enum WaitError {
    #[error("no event source to wait on")]
    NoSource,
    #[error("event source failed before producing a value: {0}")]
    Failed(#[source] SourceError),
    #[error("event source completed without producing a value")]
    Completed,
    #[error("wait cancelled before the source produced a value")]
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("clock speed is zero; set an interval before starting")]
    ZeroInterval,
    #[error("clock speed can only change while the scheduler is stopped")]
    Running,
}
