use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::mpsc;

use dlq_client::api::ApiClient;
use dlq_client::cli::Args;
use dlq_client::client::{Intent, QueueClient};
use dlq_client::config::ClientConfig;
use dlq_client::dispatch::CommandDispatcher;
use dlq_client::repl;
use dlq_client::term::TerminalSurface;
use dlq_client::transport::SocketTransport;

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Reads stdin on a plain thread; blocking reads would stall runtime shutdown.
fn spawn_input(intents: mpsc::UnboundedSender<Intent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut reader = repl::LineReader::new();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let intent = match reader.feed(&line) {
                Ok(Some(intent)) => intent,
                Ok(None) => continue,
                Err(message) => Intent::Invalid(message),
            };
            if intents.send(intent).is_err() {
                return;
            }
        }
        if let Some(intent) = reader.finish() {
            let _ = intents.send(intent);
        }
        let _ = intents.send(Intent::Quit);
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ClientConfig::from_args(&args)?;
    let api = ApiClient::new(&config).context("Failed to build HTTP client")?;

    info!("Connecting to {}", config.socket_url);
    let (outbound, events, transport) =
        SocketTransport::new(config.socket_url.clone(), config.backoff).spawn();

    let (intent_tx, intents) = mpsc::unbounded_channel();
    spawn_input(intent_tx);

    let client = QueueClient::new(
        TerminalSurface::new(),
        CommandDispatcher::new(outbound),
        config.translations.clone(),
    );
    // the client owns the only command sender; once it is dropped the
    // transport closes the socket and exits
    client.run(events, intents, api).await;

    match tokio::time::timeout(Duration::from_secs(2), transport).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Transport task failed: {}", e),
        Err(_) => warn!("Transport did not shut down in time"),
    }

    Ok(())
}
