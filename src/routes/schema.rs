//! Schema introspection endpoint
//!
//! `GET /v{N}/schema` returns a JSON-schema-style description of the three
//! record shapes, with enum fields mirroring the configured value sets.

use hyper::{Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Enums;
use crate::routes::{json_response, FullBody};
use crate::server::AppState;

/// GET /v{N}/schema
pub fn handle_schema_request(state: Arc<AppState>) -> Response<FullBody> {
    json_response(StatusCode::OK, &json!({ "definitions": definitions(&state.enums) }))
}

/// JSON-schema-style definitions of the record shapes
pub fn definitions(enums: &Enums) -> Value {
    json!({
        "Party": {
            "title": "Party",
            "type": "object",
            "properties": {
                "_id": { "type": "string" },
                "party": { "type": "string" },
                "type": { "type": "string", "enum": &enums.party_types, "default": &enums.default_party_type },
                "ownership": { "type": "string", "enum": &enums.party_ownerships, "default": &enums.default_party_ownership },
                "phases": { "type": "array", "items": { "type": "string", "enum": &enums.disaster_phases } },
                "name": { "type": "string" },
                "avatar": { "type": "string" },
                "phone": { "type": "string" },
                "landline": { "type": "string" },
                "fax": { "type": "string" },
                "email": { "type": "string", "format": "email" },
                "website": { "type": "string" },
                "about": { "type": "string" },
                "physicalAddress": { "type": "string" },
                "postalAddress": { "type": "string" },
                "locale": { "type": "string", "enum": &enums.locales, "default": &enums.default_locale },
                "location": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["Point"] },
                        "coordinates": { "type": "array", "items": { "type": "number" } }
                    }
                },
                "roles": { "type": "array", "items": { "type": "string" } },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": ["name", "phone", "email"]
        },
        "Role": {
            "title": "Role",
            "type": "object",
            "properties": {
                "_id": { "type": "string" },
                "type": { "type": "string", "enum": &enums.role_types, "default": &enums.default_role_type },
                "name": { "type": "string" },
                "description": { "type": "string" },
                "permissions": { "type": "array", "items": { "type": "string" } },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": ["name"]
        },
        "Permission": {
            "title": "Permission",
            "type": "object",
            "properties": {
                "_id": { "type": "string" },
                "resource": { "type": "string" },
                "action": { "type": "string" },
                "description": { "type": "string" },
                "wildcard": { "type": "string" },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": ["resource", "action"]
        }
    })
}
