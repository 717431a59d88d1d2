//! HTTP routes for Muster

pub mod health;
pub mod info;
pub mod parties;
pub mod permissions;
pub mod roles;
pub mod schema;

use bson::Document;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::types::{MusterError, Result};

pub use health::health_check;
pub use info::package_info;
pub use parties::handle_parties_request;
pub use permissions::handle_permissions_request;
pub use roles::handle_roles_request;
pub use schema::handle_schema_request;

pub type FullBody = Full<Bytes>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Serialize a value as a JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Map an error onto its JSON response
pub fn error_response(error: &MusterError) -> Response<FullBody> {
    let details = match error {
        MusterError::Validation { field, reason } => Some(serde_json::json!({
            field.clone(): reason.clone()
        })),
        _ => None,
    };

    json_response(
        error.status_code(),
        &ErrorResponse {
            error: error.to_string(),
            code: error.code(),
            details,
        },
    )
}

/// Collect and parse a JSON request body into a BSON document
pub async fn read_body(req: Request<Incoming>) -> Result<Document> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| MusterError::BadRequest(format!("Invalid body: {}", e)))?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|e| MusterError::BadRequest(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_not_found_message() {
        let response = error_response(&MusterError::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = error_response(&MusterError::validation("phone", "is required"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = error_response(&MusterError::Conflict("duplicate".into()));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
