//! # InfoKing Binary
//!
//! The entry point that assembles the application from configuration and
//! compile-time features, then drives it from the terminal.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use ik_app::Orchestrator;
use ik_auth_simple::SimpleAuthProvider;
use ik_config::{Backend, Settings};
use ik_core::{GenerativeModel, RealtimeSource, StoreAdapter};
use ik_genai::{GeminiClient, IdeaGenerator, UnconfiguredModel};
use ik_store_local::{LocalKv, LocalStore};
use ik_sync::{RealtimeBridge, Reconciler, SessionGate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use ik_db_sqlite::SqliteStore;

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// The configured backend, as both a store and a change feed.
async fn build_store(
    settings: &Settings,
    kv: Arc<LocalKv>,
) -> anyhow::Result<(Arc<dyn StoreAdapter>, Arc<dyn RealtimeSource>)> {
    match settings.backend {
        Backend::Local => {
            let store = Arc::new(LocalStore::new(kv));
            let feed: Arc<dyn RealtimeSource> = store.clone();
            let store: Arc<dyn StoreAdapter> = store;
            Ok((store, feed))
        }
        #[cfg(feature = "db-sqlite")]
        Backend::Sqlite => {
            let store = Arc::new(
                SqliteStore::new(&settings.database_url)
                    .await
                    .with_context(|| format!("could not open {}", settings.database_url))?,
            );
            let feed: Arc<dyn RealtimeSource> = store.clone();
            let store: Arc<dyn StoreAdapter> = store;
            Ok((store, feed))
        }
        #[cfg(not(feature = "db-sqlite"))]
        Backend::Sqlite => anyhow::bail!("this build has no SQLite support (feature `db-sqlite`)"),
    }
}

fn build_model(settings: &Settings) -> anyhow::Result<Arc<dyn GenerativeModel>> {
    match &settings.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(
                key.clone(),
                settings.text_model.clone(),
                settings.image_model.clone(),
            )?;
            Ok(Arc::new(client))
        }
        None => {
            warn!("No Gemini API key configured; AI features are disabled");
            Ok(Arc::new(UnconfiguredModel))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(&settings)?;

    // 1. Local key/value documents (sessions always live here)
    let kv = Arc::new(
        LocalKv::open(&settings.data_dir)
            .await
            .with_context(|| format!("could not open {}", settings.data_dir.display()))?,
    );

    // 2. Persistence and realtime
    let (store, feed) = build_store(&settings, kv.clone()).await?;
    let reconciler = Arc::new(Reconciler::new(store));

    // 3. Identity
    let auth = Arc::new(SimpleAuthProvider::new(kv, settings.auth_providers.clone()));
    let session = Arc::new(SessionGate::new(auth, reconciler.clone()));

    // 4. Generation
    let generator = IdeaGenerator::new(build_model(&settings)?);

    // 5. Realtime; channels open with the forum and showcase views
    let bridge = RealtimeBridge::new(reconciler.clone(), feed);

    let app = Orchestrator::new(reconciler, session, generator).with_realtime(bridge);
    let report = app.start().await;
    info!(backend = ?settings.backend, complete = report.is_complete(), "🚀 InfoKing ready");

    println!("{}\n", cli::HELP);
    cli::render(&app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match cli::parse(&line) {
            Ok(command) => {
                if !cli::execute(&app, command).await {
                    break;
                }
                cli::render(&app);
            }
            Err(usage) => println!("{usage}"),
        }
    }

    info!("Bye");
    Ok(())
}
