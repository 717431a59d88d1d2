//! Seed the database with sample permissions, roles and parties.
//!
//! Clears the three collections, then creates five permissions, ten roles
//! (every other role granted a slice of the permissions) and twenty parties
//! (every other party granted a slice of the roles and phases).

use bson::doc;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muster::{
    actions::RestActions,
    config::{Args, Enums},
    db::schemas::{
        PartyDoc, PermissionDoc, RoleDoc, PARTY_COLLECTION, PERMISSION_COLLECTION, ROLE_COLLECTION,
    },
    db::MongoClient,
    server::AppState,
    types::Result,
};

const PERMISSION_COUNT: usize = 5;
const ROLE_COUNT: usize = 10;
const PARTY_COUNT: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muster=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let enums = Enums::from_args(&args)?;
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(args, enums, mongo));
    if let Err(e) = seed(&state).await {
        error!("Seeding failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn seed(state: &AppState) -> Result<()> {
    let permissions: RestActions<PermissionDoc> =
        RestActions::for_collection(&state.mongo, PERMISSION_COLLECTION).await?;
    let roles: RestActions<RoleDoc> =
        RestActions::for_collection(&state.mongo, ROLE_COLLECTION).await?;
    let parties: RestActions<PartyDoc> =
        RestActions::for_collection(&state.mongo, PARTY_COLLECTION).await?;

    // Start from a clean slate
    let cleared = clear(state).await?;
    info!("Cleared {} existing records", cleared);

    let ctx = state.validate_ctx();

    // Permissions first, so roles can reference them
    let mut permission_ids = Vec::new();
    for i in 0..PERMISSION_COUNT {
        let created = permissions
            .post(bson::to_document(&PermissionDoc::sample(i))?, &ctx)
            .await?;
        if let Some(id) = created["_id"].as_str() {
            permission_ids.push(id.to_string());
        }
    }
    info!("Seeded {} permissions", permission_ids.len());

    // Roles, every other one granted a slice of the permissions
    let mut role_ids = Vec::new();
    for i in 0..ROLE_COUNT {
        let mut role = RoleDoc::sample(i);
        if i % 2 == 0 && i > 0 {
            let take = (i / 3 + 1).min(permission_ids.len());
            role.permissions = Some(permission_ids[..take].to_vec());
        }
        let created = roles.post(bson::to_document(&role)?, &ctx).await?;
        if let Some(id) = created["_id"].as_str() {
            role_ids.push(id.to_string());
        }
    }
    info!("Seeded {} roles", role_ids.len());

    // Parties, every other one granted a slice of the roles and phases
    let mut party_count = 0;
    for i in 0..PARTY_COUNT {
        let mut party = PartyDoc::sample(i);
        if i % 2 == 0 && i > 0 {
            let roles_take = (i / 3 + 1).min(role_ids.len());
            party.roles = Some(role_ids[..roles_take].to_vec());

            let phases_take = (i / 8 + 1).min(state.enums.disaster_phases.len());
            party.phases = state.enums.disaster_phases[..phases_take].to_vec();
        }
        parties.post(bson::to_document(&party)?, &ctx).await?;
        party_count += 1;
    }
    info!("Seeded {} parties", party_count);

    Ok(())
}

async fn clear(state: &AppState) -> Result<u64> {
    let mut cleared = 0;

    let parties = state
        .mongo
        .collection::<PartyDoc>(PARTY_COLLECTION)
        .await?;
    cleared += parties.delete_many(doc! {}).await?;

    let roles = state.mongo.collection::<RoleDoc>(ROLE_COLLECTION).await?;
    cleared += roles.delete_many(doc! {}).await?;

    let permissions = state
        .mongo
        .collection::<PermissionDoc>(PERMISSION_COLLECTION)
        .await?;
    cleared += permissions.delete_many(doc! {}).await?;

    Ok(cleared)
}
