//! Permission endpoints
//!
//! ## Endpoints
//!
//! - `GET    /v{N}/permissions` - List permissions with pagination, search, filter
//! - `POST   /v{N}/permissions` - Create a new permission
//! - `GET    /v{N}/permissions/{id}` - Get an existing permission
//! - `PATCH  /v{N}/permissions/{id}` - Patch an existing permission
//! - `PUT    /v{N}/permissions/{id}` - Put an existing permission
//! - `DELETE /v{N}/permissions/{id}` - Delete an existing permission

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::actions::{to_wire, ListQuery, RestActions};
use crate::db::schemas::{PermissionDoc, PERMISSION_COLLECTION};
use crate::routes::{error_response, json_response, read_body, FullBody};
use crate::server::AppState;
use crate::types::{MusterError, Result};

/// Query-string keys accepted as equality filters
const FILTER_KEYS: &[&str] = &["resource", "action"];

/// Main handler for /permissions routes. `subpath` is the remainder after
/// the collection segment: "" or "/{id}".
pub async fn handle_permissions_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    subpath: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let id = subpath.trim_start_matches('/');

    let result = match (method, id) {
        (Method::GET, "") => list_permissions(req, &state).await,
        (Method::POST, "") => create_permission(req, &state).await,
        (Method::GET, id) if !id.is_empty() && !id.contains('/') => get_permission(req, &state, id).await,
        (Method::PATCH, id) if !id.is_empty() && !id.contains('/') => patch_permission(req, &state, id).await,
        (Method::PUT, id) if !id.is_empty() && !id.contains('/') => put_permission(req, &state, id).await,
        (Method::DELETE, id) if !id.is_empty() && !id.contains('/') => delete_permission(&state, id).await,
        _ => Err(MusterError::NotFound),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

async fn permission_actions(state: &AppState) -> Result<RestActions<PermissionDoc>> {
    RestActions::for_collection(&state.mongo, PERMISSION_COLLECTION).await
}

/// GET /permissions
async fn list_permissions(req: Request<Incoming>, state: &AppState) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), FILTER_KEYS);
    let actions = permission_actions(state).await?;
    let envelope = actions.list(&query).await?;

    Ok(json_response(StatusCode::OK, &envelope))
}

/// POST /permissions
async fn create_permission(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = permission_actions(state).await?;
    let created = actions.post(body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::CREATED, &created))
}

/// GET /permissions/{id}
async fn get_permission(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), &[]);
    let actions = permission_actions(state).await?;

    if let Some(projection) = query.projection() {
        let found = actions.get_with_projection(id, projection).await?;
        return Ok(json_response(StatusCode::OK, &found));
    }

    let found = actions.get_by_id(id).await?;
    Ok(json_response(StatusCode::OK, &to_wire(&found)?))
}

/// PATCH /permissions/{id}
async fn patch_permission(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = permission_actions(state).await?;
    let patched = actions.patch(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &patched))
}

/// PUT /permissions/{id}
async fn put_permission(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = permission_actions(state).await?;
    let updated = actions.put(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &updated))
}

/// DELETE /permissions/{id}
async fn delete_permission(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let actions = permission_actions(state).await?;
    let removed = actions.delete(id).await?;

    Ok(json_response(StatusCode::OK, &removed))
}
