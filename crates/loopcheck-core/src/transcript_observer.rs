use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::check_error::CheckError;
use crate::observer_contract::{Observation, ResponseObserver};
use crate::probe::ProbeMessage;
use crate::transcript_record::{newest_assistant_answer, TranscriptRecord};

/// Per-session answer-entry count, as sampled from the remote record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswerCount {
    pub session: String,
    pub answers: usize,
}

/// Narrow capability over the remote append-only per-session records: list
/// sessions with their answer counts, and fetch one session's entries.
#[async_trait]
pub trait TranscriptSource: Send {
    async fn session_counts(&mut self) -> Result<Vec<SessionAnswerCount>, CheckError>;

    async fn fetch_records(&mut self, session: &str)
        -> Result<Vec<TranscriptRecord>, CheckError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptObserveConfig {
    /// Overall time budget for the observation.
    pub budget: Duration,
    /// Fixed sleep between poll ticks.
    pub poll_interval: Duration,
    /// Grace period after growth is detected, letting an in-progress append
    /// complete before extraction.
    pub settle_delay: Duration,
    /// How often to print a waiting line between unproductive polls.
    pub progress_every: Duration,
}

impl Default for TranscriptObserveConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            progress_every: Duration::from_secs(10),
        }
    }
}

/// Detects the probe's answer by watching per-session answer counts grow past
/// a pre-dispatch baseline.
///
/// Known correctness gap, inherent to the record format: extraction reads the
/// triggering session's newest-overall answer rather than strictly the delta
/// since baseline, so two concurrently in-flight probes to one session can be
/// misattributed. Single-probe-in-flight discipline is assumed.
pub struct TranscriptObserver {
    source: Box<dyn TranscriptSource>,
    config: TranscriptObserveConfig,
    baseline: HashMap<String, usize>,
}

impl TranscriptObserver {
    pub fn new(source: Box<dyn TranscriptSource>, config: TranscriptObserveConfig) -> Self {
        Self {
            source,
            config,
            baseline: HashMap::new(),
        }
    }

    fn grown_session(&self, counts: &[SessionAnswerCount]) -> Option<String> {
        counts
            .iter()
            .find(|count| {
                let baseline = self.baseline.get(&count.session).copied().unwrap_or(0);
                count.answers > baseline
            })
            .map(|count| count.session.clone())
    }
}

#[async_trait]
impl ResponseObserver for TranscriptObserver {
    /// Captures the attribution baseline. Must run immediately before
    /// dispatch: any later count increase is attributed to the probe.
    async fn prepare(&mut self) -> Result<(), CheckError> {
        let counts = self.source.session_counts().await?;
        self.baseline = counts
            .into_iter()
            .map(|count| (count.session, count.answers))
            .collect();
        Ok(())
    }

    async fn observe(&mut self, _probe: &ProbeMessage) -> Result<Observation, CheckError> {
        let started = Instant::now();
        let mut last_progress = Duration::ZERO;

        loop {
            let counts = self.source.session_counts().await?;
            if let Some(session) = self.grown_session(&counts) {
                tokio::time::sleep(self.config.settle_delay).await;
                let records = self.source.fetch_records(&session).await?;
                match newest_assistant_answer(&records) {
                    Some(text) => {
                        return Ok(Observation::Answered {
                            session: Some(session),
                            text,
                        });
                    }
                    None => {
                        // Growth we cannot attribute to an assistant answer;
                        // ignore it rather than misreport, and keep polling.
                        tracing::debug!(
                            "session {session} grew without an extractable answer entry"
                        );
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.budget {
                return Ok(Observation::TimedOut);
            }
            if elapsed - last_progress >= self.config.progress_every {
                println!("  ... waiting ({}s)", elapsed.as_secs());
                last_progress = elapsed;
            }
            let nap = (self.config.budget - elapsed).min(self.config.poll_interval);
            tokio::time::sleep(nap).await;
        }
    }

    async fn shutdown(&mut self) {}
}
