use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::check_error::CheckError;

pub const PROBE_ACTION: &str = "message";

/// The outbound test stimulus, constructed immediately before dispatch and
/// immutable afterwards. `message_id` is the correlation identity: generated
/// here, never by the channel, unique across the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeMessage {
    pub action: String,
    pub user_id: String,
    pub text: String,
    pub message_id: String,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

impl ProbeMessage {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            action: PROBE_ACTION.to_string(),
            user_id: user_id.into(),
            text: text.into(),
            message_id: Uuid::new_v4().to_string(),
            timestamp_ms: current_unix_timestamp_ms(),
        }
    }

    /// UTF-8 JSON wire form consumed by the administrative push channel.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, CheckError> {
        serde_json::to_vec(self).map_err(|error| {
            CheckError::delivery(format!("failed to serialize probe message: {error}"))
        })
    }
}

fn current_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

/// Administrative push channel addressed by connection handle.
///
/// Exactly one delivery attempt per probe: a stale target will not resolve
/// again mid-run, so a rejected send is fatal for the run, never retried.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<(), CheckError>;
}

pub async fn dispatch_probe(
    push: &dyn PushChannel,
    connection_id: &str,
    probe: &ProbeMessage,
) -> Result<(), CheckError> {
    let payload = probe.to_wire_bytes()?;
    push.push(connection_id, &payload).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{dispatch_probe, ProbeMessage, PushChannel, PROBE_ACTION};
    use crate::check_error::CheckError;

    #[test]
    fn unit_probe_correlation_identity_is_unique_across_run_lifetime() {
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            let probe = ProbeMessage::new("test-user", "2+2?");
            assert!(seen.insert(probe.message_id.clone()), "duplicate message id");
        }
    }

    #[test]
    fn unit_probe_wire_shape_uses_channel_field_names() {
        let probe = ProbeMessage::new("test-user", "Hello! What is 2 + 2?");
        let wire = probe.to_wire_bytes().expect("serialize");
        let value: Value = serde_json::from_slice(&wire).expect("json");
        assert_eq!(value["action"], PROBE_ACTION);
        assert_eq!(value["userId"], "test-user");
        assert_eq!(value["text"], "Hello! What is 2 + 2?");
        assert_eq!(value["messageId"], probe.message_id.as_str());
        assert!(value["timestamp"].is_u64());
    }

    struct RecordingPush {
        deliveries: Mutex<Vec<(String, Vec<u8>)>>,
        reject: bool,
    }

    #[async_trait]
    impl PushChannel for RecordingPush {
        async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<(), CheckError> {
            if self.reject {
                return Err(CheckError::delivery("push channel returned status 410"));
            }
            self.deliveries
                .lock()
                .expect("lock")
                .push((connection_id.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn functional_dispatch_delivers_serialized_probe_to_target() {
        let push = RecordingPush {
            deliveries: Mutex::new(Vec::new()),
            reject: false,
        };
        let probe = ProbeMessage::new("test-user", "2+2?");
        dispatch_probe(&push, "c1", &probe).await.expect("dispatch");

        let deliveries = push.deliveries.lock().expect("lock");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "c1");
        let value: Value = serde_json::from_slice(&deliveries[0].1).expect("json");
        assert_eq!(value["messageId"], probe.message_id.as_str());
    }

    #[tokio::test]
    async fn regression_dispatch_rejection_is_fatal_and_not_retried() {
        let push = RecordingPush {
            deliveries: Mutex::new(Vec::new()),
            reject: true,
        };
        let probe = ProbeMessage::new("test-user", "2+2?");
        let error = dispatch_probe(&push, "stale", &probe)
            .await
            .expect_err("stale target must fail");
        assert!(matches!(error, CheckError::Delivery { .. }));
        assert!(push.deliveries.lock().expect("lock").is_empty());
    }
}
