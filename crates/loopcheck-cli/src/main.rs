mod cli_args;
mod report;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use loopcheck_core::{
    ChannelCheck, CheckConfig, ConnectionDirectory, ResponseObserver, StreamObserveConfig,
    StreamObserver, TranscriptObserveConfig, TranscriptObserver,
};
use loopcheck_transport::{
    PushChannelClient, PushChannelConfig, RegistryScanClient, RegistryScanConfig,
    SshTranscriptConfig, SshTranscriptSource, WsConnectConfig, WsFrameTransport,
};

use crate::cli_args::{Cli, ObserveStrategy};
use crate::report::{heavy_rule, light_rule, render_connection_list, render_outcome};

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if cli.list {
        run_list(&cli).await
    } else {
        run_check(&cli).await
    }
}

async fn run_list(cli: &Cli) -> Result<()> {
    println!("{}", heavy_rule());
    println!("Active Channel Connections");
    println!("{}", heavy_rule());
    println!();

    let directory = build_directory(cli)?;
    let records = directory.list().await?;
    println!("{}", render_connection_list(&records));
    println!();
    println!("Total: {} connection(s)", records.len());
    Ok(())
}

async fn run_check(cli: &Cli) -> Result<()> {
    println!("{}", heavy_rule());
    println!("Channel E2E Check");
    println!("{}", heavy_rule());

    let directory = build_directory(cli)?;
    let push = Arc::new(build_push(cli)?);
    let observer = build_observer(cli)?;
    let config = CheckConfig {
        probe_text: cli.message.clone(),
        probe_user_id: cli.test_user_id.clone(),
        budget: Duration::from_secs(cli.timeout),
    };

    let mut check = ChannelCheck::new(directory, push, observer, config);
    let report = check.run(&cli.resolve_criteria()).await?;

    println!("{}", light_rule());
    println!("{}", render_outcome(&report, cli.timeout));
    println!();
    println!("{}", heavy_rule());
    println!("Check complete.");
    Ok(())
}

fn build_directory(cli: &Cli) -> Result<ConnectionDirectory> {
    let endpoint = cli
        .registry_endpoint
        .clone()
        .context("--registry-endpoint (or LOOPCHECK_REGISTRY_ENDPOINT) is required")?;
    let registry = RegistryScanClient::new(RegistryScanConfig {
        endpoint,
        table: cli.registry_table.clone(),
        api_key: cli.api_key.clone(),
        request_timeout_ms: cli.request_timeout_ms,
    })?;
    Ok(ConnectionDirectory::new(Arc::new(registry)))
}

fn build_push(cli: &Cli) -> Result<PushChannelClient> {
    let endpoint = cli
        .push_endpoint
        .clone()
        .context("--push-endpoint (or LOOPCHECK_PUSH_ENDPOINT) is required")?;
    Ok(PushChannelClient::new(PushChannelConfig {
        endpoint,
        api_key: cli.api_key.clone(),
        request_timeout_ms: cli.request_timeout_ms,
    })?)
}

fn build_observer(cli: &Cli) -> Result<Box<dyn ResponseObserver>> {
    match cli.observe {
        ObserveStrategy::Stream => {
            let endpoint = cli
                .ws_endpoint
                .clone()
                .context("--ws-endpoint (or LOOPCHECK_WS_ENDPOINT) is required for --observe stream")?;
            let device_id = cli
                .test_device_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let transport = WsFrameTransport::new(WsConnectConfig {
                endpoint,
                user_id: cli.test_user_id.clone(),
                device_id,
                api_key: cli.api_key.clone(),
            });
            let config = StreamObserveConfig {
                budget: Duration::from_secs(cli.timeout),
                ..StreamObserveConfig::default()
            };
            Ok(Box::new(StreamObserver::new(Box::new(transport), config)))
        }
        ObserveStrategy::Transcript => {
            let destination = cli.ssh_destination.clone().context(
                "--ssh-destination (or LOOPCHECK_SSH_DESTINATION) is required for --observe transcript",
            )?;
            let source = SshTranscriptSource::new(SshTranscriptConfig {
                destination,
                transcript_dir: cli.transcript_dir.clone(),
                ssh_args: Vec::new(),
                command_timeout_ms: cli.request_timeout_ms,
            })?;
            let config = TranscriptObserveConfig {
                budget: Duration::from_secs(cli.timeout),
                poll_interval: Duration::from_millis(cli.poll_interval_ms),
                settle_delay: Duration::from_millis(cli.settle_delay_ms),
                ..TranscriptObserveConfig::default()
            };
            Ok(Box::new(TranscriptObserver::new(Box::new(source), config)))
        }
    }
}
