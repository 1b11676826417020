use clap::{ArgAction, Parser, ValueEnum};

use loopcheck_core::ResolveCriteria;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ObserveStrategy {
    /// Read the answer off a live duplex socket opened as the test user.
    #[default]
    Stream,
    /// Poll the remote per-session transcripts for a new answer entry.
    Transcript,
}

#[derive(Debug, Parser)]
#[command(
    name = "loopcheck",
    about = "End-to-end verification client for the bot messaging channel",
    version
)]
pub struct Cli {
    #[arg(
        long,
        short = 'm',
        default_value = "Hello! What is 2 + 2?",
        help = "Probe message sent to the bot"
    )]
    pub message: String,

    #[arg(
        long,
        short = 't',
        default_value_t = 60,
        value_parser = parse_positive_u64,
        help = "Seconds to wait for the bot's answer"
    )]
    pub timeout: u64,

    #[arg(
        long = "connection-id",
        help = "Target bot's connectionId from the registry"
    )]
    pub connection_id: Option<String>,

    #[arg(
        long = "user-id",
        help = "Target bot's userId from the registry; stable across reconnects"
    )]
    pub user_id: Option<String>,

    #[arg(long = "device-id", help = "Target bot's deviceId from the registry")]
    pub device_id: Option<String>,

    #[arg(long = "source-ip", help = "Target bot's source IP from the registry")]
    pub source_ip: Option<String>,

    #[arg(
        long,
        short = 'l',
        action = ArgAction::SetTrue,
        help = "List all active connections and exit"
    )]
    pub list: bool,

    #[arg(
        long,
        value_enum,
        default_value_t = ObserveStrategy::Stream,
        help = "How to observe the bot's answer"
    )]
    pub observe: ObserveStrategy,

    #[arg(
        long = "ws-endpoint",
        env = "LOOPCHECK_WS_ENDPOINT",
        help = "Duplex socket endpoint, e.g. wss://channel.example.com"
    )]
    pub ws_endpoint: Option<String>,

    #[arg(
        long = "push-endpoint",
        env = "LOOPCHECK_PUSH_ENDPOINT",
        help = "Administrative push endpoint addressed by connectionId"
    )]
    pub push_endpoint: Option<String>,

    #[arg(
        long = "registry-endpoint",
        env = "LOOPCHECK_REGISTRY_ENDPOINT",
        help = "Scan endpoint of the connection registry"
    )]
    pub registry_endpoint: Option<String>,

    #[arg(
        long = "registry-table",
        env = "LOOPCHECK_REGISTRY_TABLE",
        default_value = "bot-connections",
        help = "Registry table holding active connection records"
    )]
    pub registry_table: String,

    #[arg(
        long = "api-key",
        env = "LOOPCHECK_API_KEY",
        default_value = "",
        hide_env_values = true,
        help = "Bearer credential for the channel endpoints"
    )]
    pub api_key: String,

    #[arg(
        long = "test-user-id",
        env = "LOOPCHECK_TEST_USER_ID",
        default_value = "test-user",
        help = "Identity the probe is sent as and the test socket connects as"
    )]
    pub test_user_id: String,

    #[arg(
        long = "test-device-id",
        help = "Device identity for the test connection; a fresh UUID per run when omitted"
    )]
    pub test_device_id: Option<String>,

    #[arg(
        long = "ssh-destination",
        env = "LOOPCHECK_SSH_DESTINATION",
        help = "user@host reaching the bot's transcript files (transcript strategy)"
    )]
    pub ssh_destination: Option<String>,

    #[arg(
        long = "transcript-dir",
        env = "LOOPCHECK_TRANSCRIPT_DIR",
        default_value = "/home/bot/.sessions",
        help = "Remote directory of per-session transcript files"
    )]
    pub transcript_dir: String,

    #[arg(
        long = "poll-interval-ms",
        default_value_t = 2_000,
        value_parser = parse_positive_u64,
        help = "Sleep between transcript polls"
    )]
    pub poll_interval_ms: u64,

    #[arg(
        long = "settle-delay-ms",
        default_value_t = 2_000,
        help = "Grace period after transcript growth before extraction"
    )]
    pub settle_delay_ms: u64,

    #[arg(
        long = "request-timeout-ms",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for registry, push, and ssh calls"
    )]
    pub request_timeout_ms: u64,
}

impl Cli {
    /// Exactly one selection criterion; explicit handles win over identity
    /// filters, and no flag at all means "most recent connection".
    pub fn resolve_criteria(&self) -> ResolveCriteria {
        if let Some(id) = &self.connection_id {
            return ResolveCriteria::ConnectionId(id.clone());
        }
        if let Some(id) = &self.user_id {
            return ResolveCriteria::UserId(id.clone());
        }
        if let Some(id) = &self.device_id {
            return ResolveCriteria::DeviceId(id.clone());
        }
        if let Some(ip) = &self.source_ip {
            return ResolveCriteria::SourceIp(ip.clone());
        }
        ResolveCriteria::Newest
    }
}
