//! End-to-end tests of the HTTP surface.
//!
//! These require a running MongoDB instance (MONGODB_URI, defaulting to
//! mongodb://localhost:27017) and are therefore ignored by default:
//!
//! ```text
//! cargo test --test http_api -- --ignored
//! ```

use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;

use muster::{
    config::{Args, Enums},
    db::MongoClient,
    server::{self, AppState},
};

/// Start the service against a fresh database, returning its base url
async fn spawn_app(db_name: &str) -> String {
    let args = Args::parse_from([
        "muster",
        "--listen",
        "127.0.0.1:0",
        "--mongodb-db",
        db_name,
    ]);
    let enums = Enums::from_args(&args).expect("enum configuration");

    let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
        .expect("mongodb connection");
    mongo
        .inner()
        .database(mongo.db_name())
        .drop()
        .await
        .expect("drop test database");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let state = Arc::new(AppState::new(args, enums, mongo));
    tokio::spawn(server::serve(listener, state));

    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn party_fixture(name: &str, i: u32) -> Value {
    json!({
        "name": name,
        "phone": format!("(943) 902-6{:03}", i),
        "email": format!("{}.{}@example.com", name.to_lowercase(), i),
    })
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn party_crud_lifecycle() {
    let base = spawn_app("muster_test_lifecycle").await;
    let client = client();

    // POST applies configured defaults and normalizes the email
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&json!({
            "name": "Bedfordshire",
            "phone": "(943) 902-6124",
            "email": "Arely.Kuvalis@GMAIL.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let created: Value = response.json().await.unwrap();
    let id = created["_id"].as_str().expect("generated id").to_string();
    assert_eq!(created["type"], "Other");
    assert_eq!(created["ownership"], "Other");
    assert_eq!(created["locale"], "en");
    assert_eq!(created["email"], "arely.kuvalis@gmail.com");
    assert!(created["createdAt"].is_string());
    assert!(created["updatedAt"].is_string());

    // the identifier is stable across a subsequent GET
    let response = client
        .get(format!("{}/v1/parties/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let found: Value = response.json().await.unwrap();
    assert_eq!(found["_id"], id.as_str());
    assert_eq!(found["name"], "Bedfordshire");

    // PATCH merges and re-validates
    let response = client
        .patch(format!("{}/v1/parties/{}", base, id))
        .json(&json!({ "name": "Berkshire" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["name"], "Berkshire");
    assert_eq!(patched["email"], "arely.kuvalis@gmail.com");

    // PUT replaces wholesale
    let response = client
        .put(format!("{}/v1/parties/{}", base, id))
        .json(&json!({
            "name": "Cumbria",
            "phone": "(943) 902-6124",
            "email": "arely.kuvalis@gmail.com",
            "type": "Agency",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["_id"], id.as_str());
    assert_eq!(updated["name"], "Cumbria");
    assert_eq!(updated["type"], "Agency");

    // DELETE returns the removed record
    let response = client
        .delete(format!("{}/v1/parties/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let removed: Value = response.json().await.unwrap();
    assert_eq!(removed["_id"], id.as_str());

    // round-trip deletion: the record is gone
    let response = client
        .get(format!("{}/v1/parties/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not Found");

    // a second delete is also not found
    let response = client
        .delete(format!("{}/v1/parties/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn party_list_envelope() {
    let base = spawn_app("muster_test_envelope").await;
    let client = client();

    for (i, name) in ["Essex", "Kent", "Dorset"].iter().enumerate() {
        let response = client
            .post(format!("{}/v1/parties", base))
            .json(&party_fixture(name, i as u32))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let response = client
        .get(format!("{}/v1/parties?limit=2", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let envelope: Value = response.json().await.unwrap();
    for field in [
        "data",
        "total",
        "size",
        "limit",
        "skip",
        "page",
        "pages",
        "lastModified",
    ] {
        assert!(envelope.get(field).is_some(), "missing {}", field);
    }

    // total counts every match regardless of limit
    assert_eq!(envelope["total"], 3);
    assert_eq!(envelope["size"], 2);
    assert_eq!(envelope["limit"], 2);
    assert_eq!(envelope["pages"], 2);
    assert_eq!(envelope["data"].as_array().unwrap().len(), 2);

    // second page holds the remainder
    let response = client
        .get(format!("{}/v1/parties?limit=2&page=2", base))
        .send()
        .await
        .unwrap();
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["size"], 1);
    assert_eq!(envelope["page"], 2);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn party_updates_on_missing_id_return_not_found() {
    let base = spawn_app("muster_test_missing").await;
    let client = client();
    let missing = "5b5d92da476363251e13e0f4";

    for request in [
        client
            .patch(format!("{}/v1/parties/{}", base, missing))
            .json(&json!({ "name": "Ghost" })),
        client
            .put(format!("{}/v1/parties/{}", base, missing))
            .json(&party_fixture("Ghost", 1)),
    ] {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Not Found");
    }
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn permission_wildcard_is_derived() {
    let base = spawn_app("muster_test_wildcard").await;
    let client = client();

    let response = client
        .post(format!("{}/v1/permissions", base))
        .json(&json!({ "resource": "parties", "action": "Create" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let created: Value = response.json().await.unwrap();
    assert_eq!(created["resource"], "Party");
    assert_eq!(created["action"], "create");
    assert_eq!(created["description"], "Party create");
    assert_eq!(created["wildcard"], "Party:create");

    // the (resource, action, wildcard) triple is unique
    let response = client
        .post(format!("{}/v1/permissions", base))
        .json(&json!({ "resource": "Party", "action": "create" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn role_checks_permission_references() {
    let base = spawn_app("muster_test_role_refs").await;
    let client = client();

    // a reference to a non-existent permission fails the write
    let response = client
        .post(format!("{}/v1/roles", base))
        .json(&json!({
            "name": "Ward Officer",
            "permissions": ["5b5d92da476363251e13e0f4"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "REFERENCE_ERROR");

    // with an existing permission the role persists and reads populated
    let response = client
        .post(format!("{}/v1/permissions", base))
        .json(&json!({ "resource": "Party", "action": "create" }))
        .send()
        .await
        .unwrap();
    let permission: Value = response.json().await.unwrap();
    let permission_id = permission["_id"].as_str().unwrap();

    let response = client
        .post(format!("{}/v1/roles", base))
        .json(&json!({
            "name": "Ward Officer",
            "permissions": [permission_id],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let role: Value = response.json().await.unwrap();
    assert_eq!(role["type"], "Other");
    let role_id = role["_id"].as_str().unwrap();

    let response = client
        .get(format!("{}/v1/roles/{}", base, role_id))
        .send()
        .await
        .unwrap();
    let found: Value = response.json().await.unwrap();
    assert_eq!(found["permissions"][0]["wildcard"], "Party:create");

    // a duplicate role name conflicts
    let response = client
        .post(format!("{}/v1/roles", base))
        .json(&json!({ "name": "Ward Officer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn party_children_listing() {
    let base = spawn_app("muster_test_children").await;
    let client = client();

    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&party_fixture("Lancashire", 1))
        .send()
        .await
        .unwrap();
    let parent: Value = response.json().await.unwrap();
    let parent_id = parent["_id"].as_str().unwrap();

    let mut child = party_fixture("Merseyside", 2);
    child["party"] = json!(parent_id);
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&child)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let child: Value = response.json().await.unwrap();

    let response = client
        .get(format!("{}/v1/parties/{}/parties", base, parent_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["total"], 1);
    assert_eq!(envelope["data"][0]["_id"], child["_id"]);
    assert_eq!(envelope["data"][0]["party"], parent_id);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn party_validation_failures() {
    let base = spawn_app("muster_test_validation").await;
    let client = client();

    // phone is required
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&json!({ "name": "Norfolk", "email": "norfolk@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["phone"], "is required");

    // email must be well-formed
    let mut fixture = party_fixture("Norfolk", 3);
    fixture["email"] = json!("not-an-email");
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&fixture)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // enum membership is enforced
    let mut fixture = party_fixture("Norfolk", 4);
    fixture["type"] = json!("Unheard Of");
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&fixture)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // duplicate compound key conflicts
    let fixture = party_fixture("Norfolk", 5);
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&fixture)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&fixture)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn schema_and_root_endpoints() {
    let base = spawn_app("muster_test_meta").await;
    let client = client();

    let response = client.get(format!("{}/v1/schema", base)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let schema: Value = response.json().await.unwrap();
    for record in ["Party", "Role", "Permission"] {
        assert!(schema["definitions"].get(record).is_some(), "missing {}", record);
    }
    let types = schema["definitions"]["Party"]["properties"]["type"]["enum"]
        .as_array()
        .unwrap();
    assert!(types.iter().any(|t| t == "Agency"));

    let response = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let info: Value = response.json().await.unwrap();
    assert_eq!(info["name"], "muster");
    assert!(info["version"].is_string());

    // unknown routes yield a JSON error body
    let response = client.get(format!("{}/v1/unknown", base)).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn get_honors_field_selection() {
    let base = spawn_app("muster_test_select").await;
    let client = client();

    let response = client
        .post(format!("{}/v1/parties", base))
        .json(&party_fixture("Surrey", 1))
        .send()
        .await
        .unwrap();
    let created: Value = response.json().await.unwrap();
    let id = created["_id"].as_str().unwrap();

    let response = client
        .get(format!("{}/v1/parties/{}?select=name,email", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let found: Value = response.json().await.unwrap();
    assert_eq!(found["name"], "Surrey");
    assert!(found.get("phone").is_none());
}
