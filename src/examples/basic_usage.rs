//! Basic Usage Example
//!
//! Creates a database, saves a document, reads it back, deletes it and
//! finally drops the database. Talks to CouchDB on 127.0.0.1:5984 unless a
//! `couchlite.json` config is present.
//!
//! Run with: cargo run --example basic_usage

use couchlite_rs::{Client, ClientConfig, Document};
use serde_json::json;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("couchlite_rs=debug,basic_usage=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .try_init()?;

    Ok(())
}

async fn run(db: &Client) -> couchlite_rs::Result<()> {
    tracing::info!("Creating db");
    db.create_db().await?;

    tracing::info!("Saving doc");
    let saved = db
        .save_doc(&Document::try_from(json!({"name": "Test document"}))?)
        .await?;

    tracing::info!("Retrieving doc {}", saved.id);
    let doc = db.get_doc(&saved.id).await?;

    tracing::info!("Got doc with name: {}", doc.get("name").unwrap_or(&json!(null)));
    tracing::info!("Removing doc {}", saved.id);
    db.delete_doc(&doc).await?;

    tracing::info!("Deleting the db");
    db.delete_db().await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = ClientConfig::load("couchlite.json").unwrap_or_else(|_| {
        tracing::info!("No couchlite.json found, using defaults");
        ClientConfig::default()
    });
    tracing::info!("Using database {} at {}", config.database, config.base_url());

    let db = Client::from_config(&config)?;
    if let Err(e) = run(&db).await {
        match e.reason() {
            Some(reason) => tracing::error!("Error: {}", reason),
            None => tracing::error!("Error: {}", e),
        }
    }

    Ok(())
}
