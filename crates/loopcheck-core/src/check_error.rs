use thiserror::Error;

/// Fatal failures that abort a verification run.
///
/// Timeouts and premature socket closes are not errors; they are reported as
/// [`crate::Observation`] outcomes so a completed run can still exit cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("no connection matched {criteria}")]
    NotFound { criteria: String },
    #[error("probe delivery failed: {reason}")]
    Delivery { reason: String },
    #[error("registry scan failed: {reason}")]
    Registry { reason: String },
    #[error("transport failure: {reason}")]
    Transport { reason: String },
}

impl CheckError {
    pub fn delivery(reason: impl Into<String>) -> Self {
        Self::Delivery {
            reason: reason.into(),
        }
    }

    pub fn registry(reason: impl Into<String>) -> Self {
        Self::Registry {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}
