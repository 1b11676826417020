use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::check_error::CheckError;
use crate::observer_contract::{Observation, ResponseObserver};
use crate::probe::ProbeMessage;
use crate::ws_protocol::EvidenceAccumulator;

/// One read from the duplex socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Text(String),
    /// Orderly close from the remote side.
    Closed,
}

/// Live duplex socket opened as the test identity, reduced to text frames.
/// Non-text traffic (transport pings, binary) is the transport's problem and
/// never reaches the observer.
#[async_trait]
pub trait FrameTransport: Send {
    async fn connect(&mut self) -> Result<(), CheckError>;

    async fn next_text(&mut self) -> Result<FrameEvent, CheckError>;

    async fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamObserveConfig {
    /// Overall time budget for the observation.
    pub budget: Duration,
    /// Upper bound for one socket read, so the loop can re-check the overall
    /// deadline and report progress. Never extends the deadline.
    pub read_slice: Duration,
    /// How often to print a waiting line while no frames arrive.
    pub progress_every: Duration,
}

impl Default for StreamObserveConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(60),
            read_slice: Duration::from_secs(5),
            progress_every: Duration::from_secs(10),
        }
    }
}

/// Observes the live socket for frames correlated to the active probe and
/// assembles the streamed answer.
pub struct StreamObserver {
    transport: Box<dyn FrameTransport>,
    config: StreamObserveConfig,
}

impl StreamObserver {
    pub fn new(transport: Box<dyn FrameTransport>, config: StreamObserveConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl ResponseObserver for StreamObserver {
    async fn prepare(&mut self) -> Result<(), CheckError> {
        self.transport.connect().await
    }

    async fn observe(&mut self, probe: &ProbeMessage) -> Result<Observation, CheckError> {
        let started = Instant::now();
        let mut evidence = EvidenceAccumulator::new(&probe.message_id);
        let mut last_progress = Duration::ZERO;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.config.budget {
                return Ok(Observation::TimedOut);
            }
            let slice = (self.config.budget - elapsed).min(self.config.read_slice);

            match tokio::time::timeout(slice, self.transport.next_text()).await {
                Err(_elapsed_slice) => {
                    let waited = started.elapsed();
                    if waited - last_progress >= self.config.progress_every {
                        println!("  ... waiting ({}s)", waited.as_secs());
                        last_progress = waited;
                    }
                }
                Ok(Ok(FrameEvent::Text(raw))) => {
                    if evidence.accept_raw(&raw) {
                        return Ok(Observation::Answered {
                            session: None,
                            text: evidence.answer(),
                        });
                    }
                }
                Ok(Ok(FrameEvent::Closed)) => {
                    return Ok(Observation::ConnectionLost);
                }
                Ok(Err(error)) => {
                    tracing::debug!("socket read failed before terminal frame: {error}");
                    return Ok(Observation::ConnectionLost);
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.transport.close().await;
    }
}
