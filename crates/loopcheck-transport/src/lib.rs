//! Live collaborator implementations behind the loopcheck-core seams:
//! registry scan and administrative push over HTTP, the duplex socket frame
//! transport, and transcript sampling over an ssh subprocess.

pub mod push_channel_client;
pub mod registry_scan_client;
pub mod ssh_transcript_source;
pub mod ws_frame_source;

pub use push_channel_client::{PushChannelClient, PushChannelConfig};
pub use registry_scan_client::{parse_scan_items, RegistryScanClient, RegistryScanConfig};
pub use ssh_transcript_source::{
    parse_session_counts, SshTranscriptConfig, SshTranscriptSource,
};
pub use ws_frame_source::{build_connect_request, WsConnectConfig, WsFrameTransport};
