use serde::Deserialize;

pub const FRAME_ACTION_RESPONSE: &str = "response";
pub const FRAME_ACTION_HEARTBEAT: &str = "ping";
pub const FRAME_TYPE_DONE: &str = "done";

/// One inbound JSON text frame from the duplex socket. Absent fields
/// deserialize to empty strings; the channel is shared, so frames for other
/// consumers routinely carry only a subset of these.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub action: String,
    #[serde(default, rename = "type")]
    pub frame_type: String,
    #[serde(default, rename = "replyTo")]
    pub reply_to: String,
    #[serde(default)]
    pub text: String,
}

/// Parses one raw text frame. Garbled frames are expected noise on a shared
/// channel and are skipped silently (debug-logged), never surfaced.
pub fn parse_inbound_frame(raw: &str) -> Option<InboundFrame> {
    match serde_json::from_str::<InboundFrame>(raw) {
        Ok(frame) => Some(frame),
        Err(error) => {
            tracing::debug!("skipping malformed frame: {error}");
            None
        }
    }
}

/// How one frame relates to the probe currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Channel heartbeat, ignored.
    Heartbeat,
    /// Response frame correlated to another in-flight probe, ignored.
    Foreign,
    /// Matching non-terminal fragment.
    Fragment { text: String },
    /// Matching frame carrying the terminal marker.
    Terminal { text: String },
    /// Anything else on the shared channel; logged for diagnosis, ignored.
    Unexpected,
}

pub fn classify_frame(frame: &InboundFrame, message_id: &str) -> FrameDisposition {
    if frame.action == FRAME_ACTION_HEARTBEAT {
        return FrameDisposition::Heartbeat;
    }
    if frame.action != FRAME_ACTION_RESPONSE {
        return FrameDisposition::Unexpected;
    }
    if frame.reply_to != message_id {
        return FrameDisposition::Foreign;
    }
    if frame.frame_type == FRAME_TYPE_DONE {
        FrameDisposition::Terminal {
            text: frame.text.clone(),
        }
    } else {
        FrameDisposition::Fragment {
            text: frame.text.clone(),
        }
    }
}

/// Ordered accumulation of answer fragments for one correlation identity.
///
/// Frames whose `replyTo` differs from the active probe never contribute
/// text, so concurrent probes on the shared channel cannot corrupt this
/// run's evidence.
#[derive(Debug)]
pub struct EvidenceAccumulator {
    message_id: String,
    chunks: Vec<String>,
}

impl EvidenceAccumulator {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            chunks: Vec::new(),
        }
    }

    /// Feeds one raw frame; returns true once the terminal marker arrived.
    pub fn accept_raw(&mut self, raw: &str) -> bool {
        let Some(frame) = parse_inbound_frame(raw) else {
            return false;
        };
        self.accept(&frame)
    }

    pub fn accept(&mut self, frame: &InboundFrame) -> bool {
        match classify_frame(frame, &self.message_id) {
            FrameDisposition::Fragment { text } => {
                if !text.is_empty() {
                    self.chunks.push(text);
                }
                false
            }
            FrameDisposition::Terminal { text } => {
                if !text.is_empty() {
                    self.chunks.push(text);
                }
                true
            }
            FrameDisposition::Heartbeat | FrameDisposition::Foreign => false,
            FrameDisposition::Unexpected => {
                tracing::debug!(
                    "ignoring unexpected frame: action={} type={} replyTo={}",
                    frame.action,
                    frame.frame_type,
                    frame.reply_to
                );
                false
            }
        }
    }

    pub fn has_evidence(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// Concatenation of matching fragment texts in arrival order.
    pub fn answer(&self) -> String {
        self.chunks.concat()
    }
}
