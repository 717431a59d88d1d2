//! Party endpoints
//!
//! ## Endpoints
//!
//! - `GET    /v{N}/parties` - List parties with pagination, search, filter
//! - `POST   /v{N}/parties` - Create a new party
//! - `GET    /v{N}/parties/{id}` - Get an existing party
//! - `PATCH  /v{N}/parties/{id}` - Patch an existing party
//! - `PUT    /v{N}/parties/{id}` - Put an existing party
//! - `DELETE /v{N}/parties/{id}` - Delete an existing party
//! - `GET    /v{N}/parties/{party}/parties` - List direct child parties

use bson::{doc, oid::ObjectId};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::actions::{to_wire, ListQuery, RestActions};
use crate::db::schemas::{PartyDoc, RoleDoc, PARTY_COLLECTION, ROLE_COLLECTION};
use crate::db::MongoClient;
use crate::routes::{error_response, json_response, read_body, FullBody};
use crate::server::AppState;
use crate::types::{MusterError, Result};

/// Query-string keys accepted as equality filters
const FILTER_KEYS: &[&str] = &["type", "ownership", "locale", "phases", "party"];

/// Main handler for /parties routes. `subpath` is the remainder after the
/// collection segment: "", "/{id}" or "/{party}/parties".
pub async fn handle_parties_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    subpath: &str,
) -> Response<FullBody> {
    let method = req.method().clone();

    let result = match (method, subpath) {
        (Method::GET, "") | (Method::GET, "/") => list_parties(req, &state, None).await,

        (Method::POST, "") | (Method::POST, "/") => create_party(req, &state).await,

        // GET /parties/{party}/parties - children of a parent party
        (Method::GET, p) if p.strip_suffix("/parties").is_some_and(is_single_segment) => {
            let parent = p
                .trim_start_matches('/')
                .trim_end_matches("/parties")
                .trim_end_matches('/');
            list_parties(req, &state, Some(parent.to_string())).await
        }

        (Method::GET, p) if is_single_segment(p) => {
            get_party(req, &state, p.trim_start_matches('/')).await
        }

        (Method::PATCH, p) if is_single_segment(p) => {
            patch_party(req, &state, p.trim_start_matches('/')).await
        }

        (Method::PUT, p) if is_single_segment(p) => {
            put_party(req, &state, p.trim_start_matches('/')).await
        }

        (Method::DELETE, p) if is_single_segment(p) => {
            delete_party(&state, p.trim_start_matches('/')).await
        }

        _ => Err(MusterError::NotFound),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

/// True for "/{segment}" with a non-empty segment
fn is_single_segment(path: &str) -> bool {
    match path.strip_prefix('/') {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

async fn party_actions(state: &AppState) -> Result<RestActions<PartyDoc>> {
    RestActions::for_collection(&state.mongo, PARTY_COLLECTION).await
}

/// GET /parties and GET /parties/{party}/parties
async fn list_parties(
    req: Request<Incoming>,
    state: &AppState,
    parent: Option<String>,
) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), FILTER_KEYS);
    let actions = party_actions(state).await?;

    let extra = match parent {
        Some(parent) => doc! { "party": parent },
        None => doc! {},
    };

    let mut envelope = actions.list_filtered(&query, extra).await?;
    populate_roles(&state.mongo, &mut envelope.data).await?;

    Ok(json_response(StatusCode::OK, &envelope))
}

/// POST /parties
async fn create_party(req: Request<Incoming>, state: &AppState) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = party_actions(state).await?;
    let created = actions.post(body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::CREATED, &created))
}

/// GET /parties/{id}
async fn get_party(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let query = ListQuery::from_query_string(req.uri().query(), &[]);
    let actions = party_actions(state).await?;

    if let Some(projection) = query.projection() {
        let found = actions.get_with_projection(id, projection).await?;
        return Ok(json_response(StatusCode::OK, &found));
    }

    let found = actions.get_by_id(id).await?;
    let mut values = vec![to_wire(&found)?];
    populate_roles(&state.mongo, &mut values).await?;

    Ok(json_response(StatusCode::OK, &values[0]))
}

/// PATCH /parties/{id}
async fn patch_party(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = party_actions(state).await?;
    let patched = actions.patch(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &patched))
}

/// PUT /parties/{id}
async fn put_party(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<FullBody>> {
    let body = read_body(req).await?;
    let actions = party_actions(state).await?;
    let updated = actions.put(id, body, &state.validate_ctx()).await?;

    Ok(json_response(StatusCode::OK, &updated))
}

/// DELETE /parties/{id}
async fn delete_party(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let actions = party_actions(state).await?;
    let removed = actions.delete(id).await?;

    Ok(json_response(StatusCode::OK, &removed))
}

/// Expand role ids into role documents, one level deep. The expanded roles
/// keep their own permission ids unexpanded.
pub async fn populate_roles(db: &MongoClient, parties: &mut [Value]) -> Result<()> {
    let mut ids: Vec<ObjectId> = Vec::new();
    for party in parties.iter() {
        for id in reference_ids(party, "roles") {
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

    let collection = db.collection::<RoleDoc>(ROLE_COLLECTION).await?;
    let roles = collection
        .find_many(doc! { "_id": { "$in": ids } }, FindOptions::default())
        .await?;

    let mut by_id: HashMap<String, Value> = HashMap::new();
    for role in &roles {
        if let Some(id) = role._id {
            by_id.insert(id.to_hex(), to_wire(role)?);
        }
    }

    for party in parties.iter_mut() {
        let ids = reference_ids(party, "roles");
        if ids.is_empty() {
            continue;
        }
        let expanded: Vec<Value> = ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        party["roles"] = Value::Array(expanded);
    }

    Ok(())
}

/// Collect the string ids stored under an array reference field
pub fn reference_ids(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment() {
        assert!(is_single_segment("/5b5d92da476363251e13e0f4"));
        assert!(!is_single_segment("/"));
        assert!(!is_single_segment(""));
        assert!(!is_single_segment("/abc/parties"));
    }

    #[test]
    fn test_children_path_shape() {
        let p = "/5b5d92da476363251e13e0f4/parties";
        assert!(p.strip_suffix("/parties").is_some_and(is_single_segment));

        // a bare id is not a children listing
        assert!(!"/5b5d92da476363251e13e0f4"
            .strip_suffix("/parties")
            .is_some_and(is_single_segment));
    }

    #[test]
    fn test_reference_ids() {
        let value = serde_json::json!({ "roles": ["a", "b"] });
        assert_eq!(reference_ids(&value, "roles"), vec!["a", "b"]);
        assert!(reference_ids(&value, "permissions").is_empty());
    }
}
