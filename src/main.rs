#![allow(missing_docs)]

//! khata — a WhatsApp finance assistant.
//!
//! Single Rust binary. Receives WhatsApp messages through a webhook,
//! classifies them with a language-model oracle, records ledger entries
//! or answers report questions, and replies over the Cloud API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use khata::config::{config_dir, load_config, Secrets};
use khata::logging;
use khata::messaging::whatsapp::WhatsAppClient;
use khata::pipeline::Pipeline;
use khata::providers::gemini::GeminiProvider;
use khata::store::PgStore;
use khata::webhook::{self, WebhookState};

#[derive(Parser)]
#[command(name = "khata", version, about = "WhatsApp finance assistant")]
struct Cli {
    /// Path to khata.toml. Defaults to ./khata.toml, then ~/.khata/khata.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server.
    Start,
    /// Validate configuration and secrets, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Command::Start => start(&config_path).await,
        Command::CheckConfig => check_config(&config_path),
    }
}

async fn start(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    let logs_dir = config_dir()?.join("logs");
    let _logging_guard = logging::init_production(&logs_dir)?;
    info!(config = %config_path.display(), "khata starting");

    let secrets = Secrets::from_env(&config)?;

    let store = PgStore::connect(&config.database, &secrets.database_url)
        .await
        .context("failed to connect to database")?;
    store
        .migrate()
        .await
        .context("failed to apply schema migration")?;

    let oracle = GeminiProvider::new(&config.oracle, secrets.oracle_api_key);
    let messenger = WhatsAppClient::new(&config.whatsapp, secrets.whatsapp_token);

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(store),
        Arc::new(oracle),
        Arc::new(messenger),
    ));

    let state = Arc::new(WebhookState {
        pipeline,
        verify_token: secrets.verify_token,
    });
    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "webhook server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn check_config(config_path: &Path) -> Result<()> {
    logging::init_cli();

    let config = load_config(config_path)?;
    let _secrets = Secrets::from_env(&config)?;

    println!("configuration ok: {}", config_path.display());
    Ok(())
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_owned());
    }
    let local = PathBuf::from("khata.toml");
    if local.exists() {
        return Ok(local);
    }
    Ok(config_dir()?.join("khata.toml"))
}
