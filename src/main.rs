//! Muster - party, role and permission registry for disaster management

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muster::{
    config::{Args, Enums},
    db::schemas::{PartyDoc, PermissionDoc, RoleDoc, PARTY_COLLECTION, PERMISSION_COLLECTION, ROLE_COLLECTION},
    db::MongoClient,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("muster={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let enums = match Enums::from_args(&args) {
        Ok(enums) => enums,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Print startup banner
    info!("======================================");
    info!("  Muster - disaster management registry");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("API prefix: /v{}", args.api_version);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Party types: {}", enums.party_types.join(", "));
    info!("Role types: {}", enums.role_types.join(", "));
    info!("Disaster phases: {}", enums.disaster_phases.join(", "));
    info!("======================================");

    // Connect to MongoDB
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Prepare collections so unique indexes exist before the first write
    mongo
        .collection::<PermissionDoc>(PERMISSION_COLLECTION)
        .await?;
    mongo.collection::<RoleDoc>(ROLE_COLLECTION).await?;
    mongo.collection::<PartyDoc>(PARTY_COLLECTION).await?;
    info!("Collections prepared with schema indexes");

    // Run the server
    let state = Arc::new(server::AppState::new(args, enums, mongo));
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
