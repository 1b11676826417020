//! Response correlation and observation engine for end-to-end channel checks.
//!
//! A probe message with a fresh correlation identity is delivered through the
//! administrative push path, and one of two interchangeable observers waits
//! for the matching answer within a bounded budget: a live duplex-socket
//! stream, or polling of a remote append-only transcript. Collaborators
//! (registry, push channel, socket, transcript source) sit behind traits so
//! the engine is testable against in-memory fakes.

pub mod check_error;
pub mod connection_directory;
pub mod observer_contract;
pub mod orchestrator;
pub mod probe;
pub mod stream_observer;
pub mod transcript_observer;
pub mod transcript_record;
pub mod ws_protocol;

pub use check_error::CheckError;
pub use connection_directory::{
    ConnectionDirectory, ConnectionRecord, ConnectionRegistry, ResolveCriteria,
};
pub use observer_contract::{Observation, ResponseObserver};
pub use orchestrator::{ChannelCheck, CheckConfig, CheckReport};
pub use probe::{dispatch_probe, ProbeMessage, PushChannel, PROBE_ACTION};
pub use stream_observer::{FrameEvent, FrameTransport, StreamObserveConfig, StreamObserver};
pub use transcript_observer::{
    SessionAnswerCount, TranscriptObserveConfig, TranscriptObserver, TranscriptSource,
};
pub use transcript_record::{
    count_assistant_answers, newest_assistant_answer, parse_transcript_records, TranscriptRecord,
};
pub use ws_protocol::{
    classify_frame, parse_inbound_frame, EvidenceAccumulator, FrameDisposition, InboundFrame,
};
