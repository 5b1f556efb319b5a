//! Check that the configured MongoDB instance is reachable and writable.

use anyhow::{Context, Result};
use mongodb::bson::doc;

use academy_server::config::Config;
use academy_server::db::{DataStore, DocumentBackend, MongoBackend};

const SCRATCH_COLLECTION: &str = "connection_check";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = Config::from_env()?;
    println!("MongoDB connection diagnostic");
    println!("URI: {}", config.database.uri);
    println!("Database: {}", config.database.name);

    let backend = match MongoBackend::connect(&config.database.uri, &config.database.name).await {
        Ok(backend) => backend,
        Err(e) => {
            println!("Connection error: {}", e);
            println!("Possible causes:");
            println!("1. MongoDB is not running");
            println!("2. Incorrect connection URI");
            println!("3. Network or firewall problems");
            std::process::exit(1);
        }
    };

    let test_id = backend
        .insert_one(SCRATCH_COLLECTION, doc! { "message": "Connection test" })
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to insert test document")?;
    println!("Connection successful");
    println!("Test document inserted. ID: {}", test_id);

    backend
        .drop_collection(SCRATCH_COLLECTION)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to drop scratch collection")?;

    println!("\nTesting data store operations...");
    let store = DataStore::connect(&config.database).await?;
    let id = store
        .save_contact_message("Test", "test@example.com", "1234567890", "Diagnostic message")
        .await?;
    println!("Test contact message saved. ID: {}", id);

    Ok(())
}
