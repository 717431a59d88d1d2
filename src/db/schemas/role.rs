//! Role document schema
//!
//! A named, typed bundle of permissions assignable to parties.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::actions::{Validate, ValidateCtx};
use crate::db::mongo::{IntoIndexes, MutMetadata, Searchable};
use crate::db::schemas::{Metadata, PERMISSION_COLLECTION};
use crate::types::{MusterError, Result};

/// Collection name for roles
pub const ROLE_COLLECTION: &str = "roles";

/// Role document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RoleDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Category of the role (one of the configured role types)
    #[serde(rename = "type", default)]
    pub role_type: String,

    /// Unique human readable name of the role
    #[serde(default)]
    pub name: String,

    /// Summary of what the role is for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Permission ids granted by this role; when present, every id must
    /// reference an existing permission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl RoleDoc {
    /// Create a new role document
    pub fn new(name: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            role_type: String::new(),
            name: name.to_string(),
            description: String::new(),
            permissions: None,
        }
    }

    /// Deterministic sample role for seeding
    pub fn sample(i: usize) -> Self {
        const NAMES: &[&str] = &[
            "Administrator",
            "Ward Officer",
            "Region Officer",
            "Dispatcher",
            "Responder",
            "Analyst",
            "Coordinator",
            "Observer",
            "Planner",
            "Supervisor",
        ];

        let mut role = Self::new(NAMES[i % NAMES.len()]);
        role.role_type = if i % 2 == 0 { "System" } else { "Assignable" }.to_string();
        role.description = format!("{} duties", role.name);
        role
    }
}

#[async_trait::async_trait]
impl Validate for RoleDoc {
    async fn pre_validate(&mut self, ctx: &ValidateCtx<'_>) -> Result<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(MusterError::validation("name", "is required"));
        }

        self.role_type = self.role_type.trim().to_string();
        if self.role_type.is_empty() {
            self.role_type = ctx.enums.default_role_type.clone();
        }
        if !ctx.enums.role_types.iter().any(|t| t == &self.role_type) {
            return Err(MusterError::validation(
                "type",
                &format!("'{}' is not an allowed role type", self.role_type),
            ));
        }

        self.description = self.description.trim().to_string();

        if let Some(ref permissions) = self.permissions {
            if permissions.is_empty() {
                return Err(MusterError::validation(
                    "permissions",
                    "must not be empty when present",
                ));
            }
            ctx.ensure_exists(PERMISSION_COLLECTION, "permissions", permissions)
                .await?;
        }

        Ok(())
    }
}

impl IntoIndexes for RoleDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Role names are globally unique
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("name_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "type": 1 },
                Some(IndexOptions::builder().name("type_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for RoleDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Searchable for RoleDoc {
    fn searchable_fields() -> &'static [&'static str] {
        &["name", "description"]
    }
}
