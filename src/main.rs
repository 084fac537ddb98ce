use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use medquiz::store::FileStore;
use medquiz::{router, App, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("medquiz=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::parse();

    let store = FileStore::open(&settings.store)
        .with_context(|| format!("opening local store {}", settings.store.display()))?;
    let app = App::new(Arc::new(store), &settings.provider, settings.bcrypt_cost)
        .await
        .context("building provider client")?;

    let listener = tokio::net::TcpListener::bind(settings.address)
        .await
        .with_context(|| format!("binding {}", settings.address))?;
    info!(address = %settings.address, provider = %settings.provider.base_url, "medquiz listening");

    axum::serve(listener, router(Arc::new(app)))
        .await
        .context("serving HTTP")?;
    Ok(())
}
