use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use loopcheck_core::{
    parse_transcript_records, CheckError, SessionAnswerCount, TranscriptRecord, TranscriptSource,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTranscriptConfig {
    /// `user@host` destination for the remote shell.
    pub destination: String,
    /// Remote directory holding one newline-delimited JSON file per session.
    pub transcript_dir: String,
    /// Extra arguments placed before the destination, e.g. `-i key.pem`.
    pub ssh_args: Vec<String>,
    pub command_timeout_ms: u64,
}

/// Samples the remote per-session transcripts over an `ssh` subprocess.
///
/// Answer counts come from a single `grep -c` over the session files, one
/// matching line per assistant record; the core observer only ever compares
/// counts against its baseline, so the count command is the whole listing
/// contract.
pub struct SshTranscriptSource {
    config: SshTranscriptConfig,
}

impl SshTranscriptSource {
    pub fn new(config: SshTranscriptConfig) -> Result<Self, CheckError> {
        if config.destination.trim().is_empty() {
            return Err(CheckError::transport("ssh destination is empty"));
        }
        if config.transcript_dir.trim().is_empty() {
            return Err(CheckError::transport("transcript directory is empty"));
        }
        Ok(Self { config })
    }

    fn list_command(&self) -> String {
        // `|| true` keeps the exit status clean when no file matches yet.
        format!(
            r#"grep -Hc '"role":"assistant"' {}/*.jsonl || true"#,
            self.config.transcript_dir.trim_end_matches('/')
        )
    }

    fn fetch_command(&self, session: &str) -> Result<String, CheckError> {
        validate_session_name(session)?;
        Ok(format!(
            "cat {}/{session}.jsonl",
            self.config.transcript_dir.trim_end_matches('/')
        ))
    }

    async fn run_remote(&self, command: &str) -> Result<String, CheckError> {
        let mut ssh = Command::new("ssh");
        ssh.kill_on_drop(true);
        ssh.args(&self.config.ssh_args);
        ssh.arg(&self.config.destination);
        ssh.arg(command);
        ssh.stdin(Stdio::null());
        ssh.stdout(Stdio::piped());
        ssh.stderr(Stdio::piped());

        let child = ssh
            .spawn()
            .map_err(|error| CheckError::transport(format!("failed to spawn ssh: {error}")))?;
        let output = tokio::time::timeout(
            Duration::from_millis(self.config.command_timeout_ms.max(1)),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            CheckError::transport(format!(
                "ssh command timed out after {}ms",
                self.config.command_timeout_ms
            ))
        })?
        .map_err(|error| CheckError::transport(format!("ssh process failed: {error}")))?;

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CheckError::transport(format!(
                "ssh exited with status {status}: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl TranscriptSource for SshTranscriptSource {
    async fn session_counts(&mut self) -> Result<Vec<SessionAnswerCount>, CheckError> {
        let stdout = self.run_remote(&self.list_command()).await?;
        Ok(parse_session_counts(&stdout))
    }

    async fn fetch_records(
        &mut self,
        session: &str,
    ) -> Result<Vec<TranscriptRecord>, CheckError> {
        let command = self.fetch_command(session)?;
        let stdout = self.run_remote(&command).await?;
        Ok(parse_transcript_records(&stdout))
    }
}

/// Parses `path:count` lines from `grep -Hc`, keyed by session file stem.
/// Unparseable lines are skipped silently.
pub fn parse_session_counts(stdout: &str) -> Vec<SessionAnswerCount> {
    stdout
        .lines()
        .filter_map(|line| {
            let (path, count) = line.rsplit_once(':')?;
            let answers = count.trim().parse::<usize>().ok()?;
            let session = session_stem(path)?;
            Some(SessionAnswerCount {
                session: session.to_string(),
                answers,
            })
        })
        .collect()
}

fn session_stem(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next()?;
    file.strip_suffix(".jsonl")
}

/// Session names come back from the listing, but they still travel into a
/// remote shell command; restrict them to a filename-safe alphabet.
fn validate_session_name(session: &str) -> Result<(), CheckError> {
    let safe = !session.is_empty()
        && session
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !session.contains("..");
    if safe {
        Ok(())
    } else {
        Err(CheckError::transport(format!(
            "refusing unsafe session name '{session}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_session_counts, validate_session_name, SshTranscriptConfig, SshTranscriptSource,
    };

    fn source() -> SshTranscriptSource {
        SshTranscriptSource::new(SshTranscriptConfig {
            destination: "ec2-user@bot-host".to_string(),
            transcript_dir: "/home/bot/.sessions/".to_string(),
            ssh_args: vec!["-o".to_string(), "BatchMode=yes".to_string()],
            command_timeout_ms: 10_000,
        })
        .expect("source")
    }

    #[test]
    fn unit_list_command_greps_all_session_files() {
        assert_eq!(
            source().list_command(),
            r#"grep -Hc '"role":"assistant"' /home/bot/.sessions/*.jsonl || true"#
        );
    }

    #[test]
    fn unit_fetch_command_targets_one_session_file() {
        assert_eq!(
            source().fetch_command("sessionA").expect("command"),
            "cat /home/bot/.sessions/sessionA.jsonl"
        );
    }

    #[test]
    fn unit_parse_session_counts_reads_grep_hc_lines() {
        let stdout = "/home/bot/.sessions/sessionA.jsonl:3\n/home/bot/.sessions/default.jsonl:0\n";
        let counts = parse_session_counts(stdout);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].session, "sessionA");
        assert_eq!(counts[0].answers, 3);
        assert_eq!(counts[1].session, "default");
        assert_eq!(counts[1].answers, 0);
    }

    #[test]
    fn regression_parse_session_counts_skips_noise_lines() {
        let stdout = concat!(
            "grep: /home/bot/.sessions/*.jsonl: No such file or directory\n",
            "/home/bot/.sessions/sessionA.jsonl:2\n",
            "not-a-count-line\n",
            "/home/bot/.sessions/other.txt:5\n",
        );
        let counts = parse_session_counts(stdout);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].session, "sessionA");
    }

    #[test]
    fn regression_session_names_are_restricted_to_filename_alphabet() {
        assert!(validate_session_name("sessionA").is_ok());
        assert!(validate_session_name("a-b_c.1").is_ok());
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("a;rm -rf /").is_err());
        assert!(validate_session_name("../etc/passwd").is_err());
        assert!(validate_session_name("has space").is_err());
    }

    #[test]
    fn unit_new_rejects_blank_destination_or_directory() {
        assert!(SshTranscriptSource::new(SshTranscriptConfig {
            destination: String::new(),
            transcript_dir: "/sessions".to_string(),
            ssh_args: Vec::new(),
            command_timeout_ms: 1,
        })
        .is_err());
        assert!(SshTranscriptSource::new(SshTranscriptConfig {
            destination: "user@host".to_string(),
            transcript_dir: " ".to_string(),
            ssh_args: Vec::new(),
            command_timeout_ms: 1,
        })
        .is_err());
    }
}
