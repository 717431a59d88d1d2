//! Role endpoints
//!
//! ## Endpoints
//!
//! - `GET    /v{N}/roles` - List roles with pagination, search, filter
//! - `POST   /v{N}/roles` - Create a new role
//! - `GET    /v{N}/roles/{id}` - Get an existing role
//! - `PATCH  /v{N}/roles/{id}` - Patch an existing role
//! - `PUT    /v{N}/roles/{id}` - Put an existing role
//! - `DELETE /v{N}/roles/{id}` - Delete an existing role

use bson::{doc, oid::ObjectId};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::actions::{to_wire, ListQuery, RestActions};
use crate::db::schemas::{PermissionDoc, RoleDoc, PERMISSION_COLLECTION, ROLE_COLLECTION};
use crate::db::MongoClient;
use crate::routes::parties::reference_ids;
use crate::routes::{error_response, json_response, read_body, FullBody};
use crate::server::AppState;
use crate::types::{MusterError, Result};

/// Query-string keys accepted as equality filters
const FILTER_KEYS: &[&str] = &["type"];

/// Main handler for /roles routes. `subpath` is the remainder after the
/// collection segment: "" or "/{id}".
pub async fn handle_roles_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    subpath: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let id = subpath.trim_start_matches('/');

    let result = match (method, id) {
        (Method::GET, "") => list_roles(req, &state).await,
        (Method::POST, "") => create_role(req, &state).await,
        (Method::GET, id) if !id.is_empty() && !id.contains('/') => get_role(req, &state, id).await,
        (Method::PATCH, id) if !id.is_empty() && !id.contains('/') => patch_role(req, &state, id).await,
        (Method::PUT, id) if !id.is_empty() && !id.contains('/') => put_role(req, &state, id).await,
        (Method::DELETE, id) if !id.is_empty() && !id.contains('/') => delete_role(&state, id).await,
        _ => Err(MusterError::NotFound),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

async fn role_actions(state: &AppState) -> Result<RestActions<RoleDoc>> {
    RestActions::for_collection(&state.mongo, ROLE_COLLECTION).await
}

/// GET /roles
async fn list_roles(req: Request<Incoming>, state: &AppState) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), FILTER_KEYS);
    let actions = role_actions(state).await?;

    let mut envelope = actions.list(&query).await?;
    populate_permissions(&state.mongo, &mut envelope.data).await?;

    Ok(json_response(StatusCode::OK, &envelope))
}

/// POST /roles
async fn create_role(req: Request<Incoming>, state: &AppState) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = role_actions(state).await?;
    let created = actions.post(body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::CREATED, &created))
}

/// GET /roles/{id}
async fn get_role(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), &[]);
    let actions = role_actions(state).await?;

    if let Some(projection) = query.projection() {
        let found = actions.get_with_projection(id, projection).await?;
        return Ok(json_response(StatusCode::OK, &found));
    }

    let found = actions.get_by_id(id).await?;
    let mut values = vec![to_wire(&found)?];
    populate_permissions(&state.mongo, &mut values).await?;

    Ok(json_response(StatusCode::OK, &values[0]))
}

/// PATCH /roles/{id}
async fn patch_role(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = role_actions(state).await?;
    let patched = actions.patch(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &patched))
}

/// PUT /roles/{id}
async fn put_role(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = role_actions(state).await?;
    let updated = actions.put(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &updated))
}

/// DELETE /roles/{id}
async fn delete_role(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let actions = role_actions(state).await?;
    let removed = actions.delete(id).await?;

    Ok(json_response(StatusCode::OK, &removed))
}

/// Expand permission ids into permission documents, one level deep
pub async fn populate_permissions(db: &MongoClient, roles: &mut [Value]) -> Result<()> {
    let mut ids: Vec<ObjectId> = Vec::new();
    for role in roles.iter() {
        for id in reference_ids(role, "permissions") {
            if let Ok(oid) = ObjectId::parse_str(&id) {
                if !ids.contains(&oid) {
                    ids.push(oid);
                }
            }
        }
    }
    if ids.is_empty() {
        return Ok(());
    }

    let collection = db.collection::<PermissionDoc>(PERMISSION_COLLECTION).await?;
    let permissions = collection
        .find_many(doc! { "_id": { "$in": ids } }, FindOptions::default())
        .await?;

    let mut by_id: HashMap<String, Value> = HashMap::new();
    for permission in &permissions {
        if let Some(id) = permission._id {
            by_id.insert(id.to_hex(), to_wire(permission)?);
        }
    }

    for role in roles.iter_mut() {
        let ids = reference_ids(role, "permissions");
        if ids.is_empty() {
            continue;
        }
        let expanded: Vec<Value> = ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        role["permissions"] = Value::Array(expanded);
    }

    Ok(())
}
