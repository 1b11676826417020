use std::sync::Arc;
use std::time::Duration;

use crate::check_error::CheckError;
use crate::connection_directory::{ConnectionDirectory, ConnectionRecord, ResolveCriteria};
use crate::observer_contract::{Observation, ResponseObserver};
use crate::probe::{dispatch_probe, ProbeMessage, PushChannel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Payload of the probe message.
    pub probe_text: String,
    /// Sender identity carried by the probe and used by the test connection.
    pub probe_user_id: String,
    /// Overall observation budget; enforced by the observer, echoed here in
    /// the run narrative.
    pub budget: Duration,
}

/// Everything the run produced, for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub target: ConnectionRecord,
    pub probe: ProbeMessage,
    pub observation: Observation,
}

/// Sequences one verification run: directory lookup, observer preparation,
/// probe dispatch, observation, report.
///
/// A completed run is a success irrespective of the observation outcome;
/// only lookup, dispatch, and collaborator failures abort.
pub struct ChannelCheck {
    directory: ConnectionDirectory,
    push: Arc<dyn PushChannel>,
    observer: Box<dyn ResponseObserver>,
    config: CheckConfig,
}

impl ChannelCheck {
    pub fn new(
        directory: ConnectionDirectory,
        push: Arc<dyn PushChannel>,
        observer: Box<dyn ResponseObserver>,
        config: CheckConfig,
    ) -> Self {
        Self {
            directory,
            push,
            observer,
            config,
        }
    }

    pub async fn run(&mut self, criteria: &ResolveCriteria) -> Result<CheckReport, CheckError> {
        println!("\n[1] Looking up bot connection ({criteria})...");
        let target = self.directory.resolve(criteria).await?;
        print_target(&target);

        println!("\n[2] Preparing response observation...");
        self.observer.prepare().await?;

        // The observer holds its connection/baseline from here on, so any
        // later bail-out must release it.
        let probe = ProbeMessage::new(&self.config.probe_user_id, &self.config.probe_text);
        println!("\n[3] Sending probe to bot...");
        println!("  messageId: {}", probe.message_id);
        println!("  text:      {}", probe.text);
        if let Err(error) = dispatch_probe(self.push.as_ref(), &target.connection_id, &probe).await
        {
            self.observer.shutdown().await;
            return Err(error);
        }
        println!("  Sent.");

        println!(
            "\n[4] Waiting for bot response (timeout {}s)...",
            self.config.budget.as_secs()
        );
        let observation = self.observer.observe(&probe).await;
        self.observer.shutdown().await;
        let observation = observation?;

        Ok(CheckReport {
            target,
            probe,
            observation,
        })
    }
}

fn print_target(target: &ConnectionRecord) {
    println!("  connectionId: {}", target.connection_id);
    println!(
        "  userId:       {}",
        target.user_id.as_deref().unwrap_or("(not set)")
    );
    println!("  deviceId:     {}", target.device_id);
    println!("  sourceIp:     {}", target.source_ip);
    println!("  connectedAt:  {}", target.connected_at);
}
