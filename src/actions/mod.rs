//! Generic REST actions over a typed MongoDB collection.
//!
//! Implements `post`, `get_by_id`, `list`, `patch`, `put` and `delete` once;
//! record types specialize behavior only through the [`Validate`] hook,
//! which normalizes fields, applies configured defaults and checks
//! referential integrity before any write. Uniqueness is left to the
//! storage layer's unique indexes.

mod query;

pub use query::{ListQuery, DEFAULT_LIMIT, MAX_LIMIT};

use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::FindOptions;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::config::Enums;
use crate::db::mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata, Searchable};
use crate::types::{MusterError, Result};

/// Context handed to validation hooks: the store (for referential checks)
/// and the configured enumerated value sets.
pub struct ValidateCtx<'a> {
    pub db: &'a MongoClient,
    pub enums: &'a Enums,
}

impl ValidateCtx<'_> {
    /// Check that every id references an existing document in `collection`.
    /// Fails with a referential error naming the missing ids.
    pub async fn ensure_exists(
        &self,
        collection: &str,
        field: &str,
        ids: &[String],
    ) -> Result<()> {
        let mut seen = Vec::new();
        let mut missing = Vec::new();

        for id in ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(id.clone());

            match ObjectId::parse_str(id) {
                Ok(oid) => {
                    let count = self
                        .db
                        .inner()
                        .database(self.db.db_name())
                        .collection::<Document>(collection)
                        .count_documents(doc! { "_id": oid })
                        .await
                        .map_err(|e| MusterError::Database(format!("Count failed: {}", e)))?;
                    if count == 0 {
                        missing.push(id.clone());
                    }
                }
                Err(_) => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MusterError::Reference(format!(
                "{} {}",
                field,
                missing.join(", ")
            )))
        }
    }
}

/// Per-record-type validation and normalization hook, run before every write
#[async_trait::async_trait]
pub trait Validate {
    async fn pre_validate(&mut self, ctx: &ValidateCtx<'_>) -> Result<()>;
}

/// Paginated list response envelope
#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub data: Vec<Value>,
    pub total: u64,
    pub size: u64,
    pub limit: u32,
    pub skip: u64,
    pub page: u32,
    pub pages: u32,
    #[serde(rename = "lastModified", serialize_with = "serialize_optional")]
    pub last_modified: Option<String>,
}

// lastModified is part of the envelope contract even when null
fn serialize_optional<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(v),
        None => serializer.serialize_none(),
    }
}

/// Generic REST actions for one record type
pub struct RestActions<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    collection: MongoCollection<T>,
}

impl<T> RestActions<T>
where
    T: Serialize
        + DeserializeOwned
        + Unpin
        + Send
        + Sync
        + IntoIndexes
        + MutMetadata
        + Searchable
        + Validate,
{
    pub fn new(collection: MongoCollection<T>) -> Self {
        Self { collection }
    }

    /// Open the named collection (applying schema indexes) and wrap it
    pub async fn for_collection(db: &MongoClient, name: &str) -> Result<Self> {
        Ok(Self::new(db.collection::<T>(name).await?))
    }

    /// Create one record from a request body: validate, persist, return the
    /// stored record with its generated id and timestamps.
    pub async fn post(&self, mut body: Document, ctx: &ValidateCtx<'_>) -> Result<Value> {
        strip_immutable(&mut body);

        let mut item: T = bson::from_document(body)
            .map_err(|e| MusterError::BadRequest(format!("Malformed body: {}", e)))?;
        item.pre_validate(ctx).await?;

        let id = self.collection.insert_one(item).await?;
        let stored = self
            .collection
            .find_by_id(id)
            .await?
            .ok_or(MusterError::NotFound)?;

        to_wire(&stored)
    }

    /// List records matching the query, wrapped in the pagination envelope.
    pub async fn list(&self, query: &ListQuery) -> Result<ListEnvelope> {
        self.list_filtered(query, Document::new()).await
    }

    /// List records matching the query merged with a caller-provided filter
    /// (used by the children listing).
    pub async fn list_filtered(
        &self,
        query: &ListQuery,
        extra_filter: Document,
    ) -> Result<ListEnvelope> {
        let mut filter = query.filter_document(T::searchable_fields());
        for (key, value) in extra_filter {
            filter.insert(key, value);
        }

        let total = self.collection.count(filter.clone()).await?;

        let options = FindOptions::builder()
            .sort(query.sort_document())
            .skip(query.skip)
            .limit(query.limit as i64)
            .build();
        let items = self.collection.find_many(filter.clone(), options).await?;

        let last_modified = self
            .collection
            .last_modified(filter)
            .await?
            .map(format_datetime);

        let data = items.iter().map(to_wire).collect::<Result<Vec<_>>>()?;

        Ok(ListEnvelope {
            total,
            size: data.len() as u64,
            limit: query.limit,
            skip: query.skip,
            page: query.page,
            pages: pages_for(total, query.limit),
            last_modified,
            data,
        })
    }

    /// Fetch one record by identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        let oid = parse_id(id)?;
        self.collection
            .find_by_id(oid)
            .await?
            .ok_or(MusterError::NotFound)
    }

    /// Fetch one record by identifier with a field projection.
    pub async fn get_with_projection(&self, id: &str, projection: Document) -> Result<Value> {
        let oid = parse_id(id)?;
        let mut doc = self
            .collection
            .find_raw_by_id(oid, Some(projection))
            .await?
            .ok_or(MusterError::NotFound)?;

        hoist_metadata(&mut doc);
        Ok(bson_to_json(Bson::Document(doc)))
    }

    /// Partially update one record: merge the patch over the stored
    /// document, re-validate, replace.
    pub async fn patch(
        &self,
        id: &str,
        mut patch: Document,
        ctx: &ValidateCtx<'_>,
    ) -> Result<Value> {
        let oid = parse_id(id)?;
        let existing = self
            .collection
            .find_by_id(oid)
            .await?
            .ok_or(MusterError::NotFound)?;

        strip_immutable(&mut patch);

        let mut merged_doc = bson::to_document(&existing)?;
        for (key, value) in patch {
            merged_doc.insert(key, value);
        }

        let mut merged: T = bson::from_document(merged_doc)
            .map_err(|e| MusterError::BadRequest(format!("Malformed body: {}", e)))?;
        merged.pre_validate(ctx).await?;

        let stored = self
            .collection
            .replace_by_id(oid, merged)
            .await?
            .ok_or(MusterError::NotFound)?;

        to_wire(&stored)
    }

    /// Fully replace one record, preserving its id and creation timestamp,
    /// then re-validate.
    pub async fn put(&self, id: &str, mut body: Document, ctx: &ValidateCtx<'_>) -> Result<Value> {
        let oid = parse_id(id)?;
        let existing = self
            .collection
            .find_by_id(oid)
            .await?
            .ok_or(MusterError::NotFound)?;
        let existing_doc = bson::to_document(&existing)?;

        strip_immutable(&mut body);
        body.insert("_id", oid);
        if let Ok(metadata) = existing_doc.get_document("metadata") {
            body.insert("metadata", metadata.clone());
        }

        let mut replacement: T = bson::from_document(body)
            .map_err(|e| MusterError::BadRequest(format!("Malformed body: {}", e)))?;
        replacement.pre_validate(ctx).await?;

        let stored = self
            .collection
            .replace_by_id(oid, replacement)
            .await?
            .ok_or(MusterError::NotFound)?;

        to_wire(&stored)
    }

    /// Remove one record, returning the removed record. Removing an id that
    /// no longer exists is a not-found error.
    pub async fn delete(&self, id: &str) -> Result<Value> {
        let oid = parse_id(id)?;
        let removed = self
            .collection
            .delete_by_id(oid)
            .await?
            .ok_or(MusterError::NotFound)?;

        to_wire(&removed)
    }
}

/// Parse a path identifier into an ObjectId
fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| MusterError::BadRequest(format!("Invalid id '{}'", id)))
}

/// Total number of pages for a result set
pub fn pages_for(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64) as u32
}

/// Drop fields clients must not set directly
fn strip_immutable(doc: &mut Document) {
    doc.remove("_id");
    doc.remove("metadata");
    doc.remove("createdAt");
    doc.remove("updatedAt");
}

/// Serialize a record for the wire: metadata timestamps are hoisted to
/// top-level `createdAt`/`updatedAt` and BSON scalars become plain JSON.
pub fn to_wire<T: Serialize>(item: &T) -> Result<Value> {
    let mut doc = bson::to_document(item)?;
    hoist_metadata(&mut doc);
    Ok(bson_to_json(Bson::Document(doc)))
}

fn hoist_metadata(doc: &mut Document) {
    if let Some(Bson::Document(metadata)) = doc.remove("metadata") {
        if let Some(created) = metadata.get("created_at") {
            doc.insert("createdAt", created.clone());
        }
        if let Some(updated) = metadata.get("updated_at") {
            doc.insert("updatedAt", updated.clone());
        }
    }
}

/// ISO 8601 with millisecond precision, the format clients expect on
/// `createdAt`/`updatedAt`/`lastModified`
fn format_datetime(dt: bson::DateTime) -> String {
    dt.to_chrono()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Convert BSON into plain JSON: ObjectIds become hex strings and datetimes
/// become RFC 3339 strings instead of extended-JSON objects.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(format_datetime(dt)),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Metadata, PartyDoc};

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(20, 10), 2);
        assert_eq!(pages_for(21, 10), 3);
        assert_eq!(pages_for(0, 10), 0);
        assert_eq!(pages_for(5, 10), 1);
    }

    #[test]
    fn test_strip_immutable() {
        let mut doc = doc! {
            "_id": "abc",
            "name": "Kent",
            "createdAt": "2018-07-29",
            "metadata": { "created_at": "x" }
        };
        strip_immutable(&mut doc);
        assert_eq!(doc, doc! { "name": "Kent" });
    }

    #[test]
    fn test_bson_to_json_scalars() {
        let oid = ObjectId::new();
        assert_eq!(
            bson_to_json(Bson::ObjectId(oid)),
            Value::String(oid.to_hex())
        );
        assert_eq!(bson_to_json(Bson::Int64(7)), Value::from(7));

        let json = bson_to_json(Bson::DateTime(bson::DateTime::from_millis(0)));
        assert_eq!(json, Value::String("1970-01-01T00:00:00.000Z".to_string()));
    }

    #[test]
    fn test_to_wire_hoists_metadata() {
        let mut party = PartyDoc::new("Kent", "(943) 902-6124", "kent@example.com");
        party._id = Some(ObjectId::new());
        party.metadata = Metadata::new();

        let json = to_wire(&party).unwrap();
        assert!(json.get("metadata").is_none());
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());
        assert!(json["_id"].is_string());
        assert_eq!(json["name"], "Kent");
    }
}
