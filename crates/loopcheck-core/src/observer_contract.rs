use async_trait::async_trait;

use crate::check_error::CheckError;
use crate::probe::ProbeMessage;

/// Terminal outcome of one observation, folded into the run report.
///
/// `TimedOut` and `ConnectionLost` are distinguished for diagnostics only —
/// "nobody answered" versus "the wire broke" — and neither is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Answered {
        /// Session identity for transcript-derived evidence; `None` for the
        /// stream strategy, which correlates by tag instead.
        session: Option<String>,
        text: String,
    },
    TimedOut,
    ConnectionLost,
}

/// One way of detecting and extracting a probe's correlated answer within a
/// bounded time budget.
///
/// `prepare` runs immediately before dispatch (socket connect, or transcript
/// baseline snapshot) so no evidence can slip past between the probe hitting
/// the wire and observation starting. `shutdown` releases any held
/// connection and must be safe to call on every exit path.
#[async_trait]
pub trait ResponseObserver: Send {
    async fn prepare(&mut self) -> Result<(), CheckError>;

    async fn observe(&mut self, probe: &ProbeMessage) -> Result<Observation, CheckError>;

    async fn shutdown(&mut self);
}
