//! Health check endpoint
//!
//! Liveness probe: returns 200 whenever the service is running, with a flag
//! for database connectivity.

use bson::doc;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, FullBody};
use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime: u64,
    pub node_id: String,
    pub database: DatabaseHealth,
}

/// Database connectivity details
#[derive(Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub name: String,
}

/// GET /health
pub async fn health_check(state: Arc<AppState>) -> Response<FullBody> {
    let connected = state
        .mongo
        .inner()
        .database(state.mongo.db_name())
        .run_command(doc! { "ping": 1 })
        .await
        .is_ok();

    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            node_id: state.args.node_id.to_string(),
            database: DatabaseHealth {
                connected,
                name: state.mongo.db_name().to_string(),
            },
        },
    )
}
