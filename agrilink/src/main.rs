// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

use agrilink::config;
use agrilink::engine::Effect;
use agrilink::message::InputModality;
use agrilink::session::{Conversation, QueryOutcome};
use agrilink::transport::ReqwestTransport;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agrilink", about = "Farm assistant client for the multi-agent orchestrator")]
struct Cli {
    /// Path to the agrilink.yaml config file
    #[arg(long, default_value = "agrilink.yaml", env = "AGRILINK_CONFIG")]
    config: PathBuf,

    /// Orchestrator streaming endpoint; overrides the config file
    #[arg(long, env = "AGRILINK_ENDPOINT")]
    endpoint: Option<String>,

    /// Fail the query if no frame arrives for this long
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// How the query was captured
    #[arg(long, value_enum, default_value_t = Modality::Text)]
    modality: Modality,

    /// Print the whole conversation as JSON instead of the answer text
    #[arg(long)]
    json: bool,

    /// The question to ask
    query: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Modality {
    Text,
    Voice,
    Image,
}

impl From<Modality> for InputModality {
    fn from(m: Modality) -> Self {
        match m {
            Modality::Text => InputModality::Text,
            Modality::Voice => InputModality::Voice,
            Modality::Image => InputModality::Image,
        }
    }
}

const EXIT_FINALIZED: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_CONNECTION: i32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(EXIT_FAILED);
        }
    };

    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        endpoint = %config.endpoint,
        config_hash = %config.config_hash,
        "config loaded"
    );

    let transport = match ReqwestTransport::from_config(&config) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!("failed to build HTTP client: {e}");
            std::process::exit(EXIT_CONNECTION);
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(effect) = rx.recv().await {
            if let Effect::StatusLine(line) = effect {
                eprintln!("... {line}");
            }
        }
    });

    let mut conversation = Conversation::from_config(transport, &config).with_observer(tx);

    let outcome = match conversation.submit(&cli.query, cli.modality.into()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("query rejected: {e}");
            std::process::exit(EXIT_FAILED);
        }
    };

    let output = match render(&conversation, &outcome, cli.json) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("failed to render conversation: {e}");
            std::process::exit(EXIT_FAILED);
        }
    };

    // Closes the observer channel so the printer drains and exits.
    drop(conversation);
    let _ = printer.await;

    println!("{output}");
    std::process::exit(exit_code(&outcome));
}

/// Config file if present, otherwise defaults around `--endpoint`.
/// Command-line values override the file.
fn load(cli: &Cli) -> Result<config::Config, config::ConfigError> {
    let mut config = if cli.config.exists() {
        config::load_config(&config::FileSource {
            path: cli.config.clone(),
        })?
    } else if let Some(endpoint) = &cli.endpoint {
        config::Config::for_endpoint(endpoint.clone())
    } else {
        return Err(config::ConfigError::Validation(format!(
            "config file {} not found and no --endpoint given",
            cli.config.display()
        )));
    };

    if let Some(endpoint) = &cli.endpoint {
        config::validate_endpoint(endpoint)?;
        config.endpoint = endpoint.clone();
    }
    if let Some(ms) = cli.idle_timeout_ms {
        if ms == 0 {
            return Err(config::ConfigError::Validation(
                "idle timeout must be greater than 0".into(),
            ));
        }
        config.request.idle_timeout_ms = Some(ms);
    }
    Ok(config)
}

/// The answer text, or every message as JSON.
fn render(
    conversation: &Conversation,
    outcome: &QueryOutcome,
    json: bool,
) -> Result<String, serde_json::Error> {
    if json {
        let messages: Vec<_> = conversation.messages().iter().collect();
        return serde_json::to_string_pretty(&messages);
    }
    Ok(conversation
        .messages()
        .get(outcome.message_id())
        .map(|m| m.content.clone())
        .unwrap_or_default())
}

fn exit_code(outcome: &QueryOutcome) -> i32 {
    match outcome {
        QueryOutcome::Finalized { message_id } => {
            tracing::info!(%message_id, "query finalized");
            EXIT_FINALIZED
        }
        QueryOutcome::Failed { reason, .. } => {
            tracing::warn!(%reason, "query failed");
            EXIT_FAILED
        }
        QueryOutcome::ConnectionError { error, .. } => {
            tracing::error!(%error, "connection error");
            EXIT_CONNECTION
        }
    }
}
