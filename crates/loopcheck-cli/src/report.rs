use loopcheck_core::{CheckReport, ConnectionRecord, Observation};

pub fn heavy_rule() -> String {
    "=".repeat(60)
}

pub fn light_rule() -> String {
    "-".repeat(60)
}

/// Indexed listing of the directory, newest first.
pub fn render_connection_list(records: &[ConnectionRecord]) -> String {
    if records.is_empty() {
        return "  (no connections)".to_string();
    }
    let mut lines = Vec::new();
    for (index, record) in records.iter().enumerate() {
        lines.push(format!("  [{index}] connectionId: {}", record.connection_id));
        lines.push(format!(
            "      userId:       {}",
            record.user_id.as_deref().unwrap_or("(not set)")
        ));
        lines.push(format!("      deviceId:     {}", record.device_id));
        lines.push(format!("      sourceIp:     {}", record.source_ip));
        lines.push(format!("      connectedAt:  {}", record.connected_at));
        if index < records.len() - 1 {
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

/// Final outcome block of a completed run. Timeout and a broken wire are
/// worded apart so operators can tell "nobody answered" from "the
/// connection dropped".
pub fn render_outcome(report: &CheckReport, timeout_secs: u64) -> String {
    match &report.observation {
        Observation::Answered { session, text } => {
            let mut out = String::new();
            out.push_str("\nBot response");
            if let Some(session) = session {
                out.push_str(&format!(" (session {session})"));
            }
            out.push_str(":\n");
            out.push_str(text);
            out
        }
        Observation::TimedOut => format!(
            "\n[Result] No response within {timeout_secs}s.\n  \
             The bot may not be running or may not have processed the message.\n  \
             Check the bot's logs and its session transcripts for messageId {}.",
            report.probe.message_id
        ),
        Observation::ConnectionLost => format!(
            "\n[Result] Connection closed before a complete answer arrived.\n  \
             The wire broke mid-observation; this is not a timeout.\n  \
             Check the channel endpoint health, then re-run with messageId {} in hand.",
            report.probe.message_id
        ),
    }
}
