//! Permission document schema
//!
//! An atomic grant of an action on a resource, identified by a derived
//! wildcard key (`Party:create`). Permissions are referenced by roles.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::actions::{Validate, ValidateCtx};
use crate::db::mongo::{IntoIndexes, MutMetadata, Searchable};
use crate::db::schemas::Metadata;
use crate::types::{MusterError, Result};
use crate::validation::classify;

/// Collection name for permissions
pub const PERMISSION_COLLECTION: &str = "permissions";

/// Permission document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PermissionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Resource constrained by the permission (classified form, e.g. `Party`)
    #[serde(default)]
    pub resource: String,

    /// Action granted on the resource (lower-cased, e.g. `create`)
    #[serde(default)]
    pub action: String,

    /// Summary of what the permission is for
    #[serde(default)]
    pub description: String,

    /// Unique access-control token, derived as `resource:action` when absent
    #[serde(default)]
    pub wildcard: String,
}

impl PermissionDoc {
    /// Create a new permission document
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            resource: resource.to_string(),
            action: action.to_string(),
            description: String::new(),
            wildcard: String::new(),
        }
    }

    /// Normalize attributes: classify resource, lower-case action, derive
    /// description and wildcard when empty.
    pub fn normalize(&mut self) {
        self.resource = self.resource.trim().to_string();
        if !self.resource.is_empty() {
            self.resource = classify(&self.resource);
        }

        self.action = self.action.trim().to_lowercase();

        self.description = self.description.trim().to_string();
        if self.description.is_empty() && !self.resource.is_empty() && !self.action.is_empty() {
            self.description = format!("{} {}", self.resource, self.action);
        }

        self.wildcard = self.wildcard.trim().to_string();
        if self.wildcard.is_empty() && !self.resource.is_empty() && !self.action.is_empty() {
            self.wildcard = format!("{}:{}", self.resource, self.action);
        }
    }

    /// Deterministic sample permission for seeding
    pub fn sample(i: usize) -> Self {
        const RESOURCES: &[&str] = &[
            "Party", "Role", "Permission", "Activity", "Task", "Plan", "Alert", "Incident",
        ];
        const ACTIONS: &[&str] = &["create", "view", "edit", "delete", "share", "export"];

        let resource = RESOURCES[i % RESOURCES.len()];
        let action = ACTIONS[(i / RESOURCES.len()) % ACTIONS.len()];
        Self::new(resource, action)
    }
}

#[async_trait::async_trait]
impl Validate for PermissionDoc {
    async fn pre_validate(&mut self, _ctx: &ValidateCtx<'_>) -> Result<()> {
        self.normalize();

        if self.resource.is_empty() {
            return Err(MusterError::validation("resource", "is required"));
        }
        if self.action.is_empty() {
            return Err(MusterError::validation("action", "is required"));
        }

        Ok(())
    }
}

impl IntoIndexes for PermissionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique compound index to force unique permission definition
            (
                doc! { "resource": 1, "action": 1, "wildcard": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("resource_action_wildcard_unique".to_string())
                        .build(),
                ),
            ),
            // Wildcard is a system-wide unique identifier
            (
                doc! { "wildcard": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("wildcard_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PermissionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Searchable for PermissionDoc {
    fn searchable_fields() -> &'static [&'static str] {
        &["resource", "action", "description", "wildcard"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_classifies_and_derives() {
        let mut permission = PermissionDoc::new("parties", "Create");
        permission.normalize();

        assert_eq!(permission.resource, "Party");
        assert_eq!(permission.action, "create");
        assert_eq!(permission.description, "Party create");
        assert_eq!(permission.wildcard, "Party:create");
    }

    #[test]
    fn test_normalize_keeps_explicit_values() {
        let mut permission = PermissionDoc::new("Role", "delete");
        permission.description = "Remove a role".to_string();
        permission.wildcard = "role:remove".to_string();
        permission.normalize();

        assert_eq!(permission.description, "Remove a role");
        assert_eq!(permission.wildcard, "role:remove");
    }

    #[test]
    fn test_samples_have_unique_wildcards() {
        let mut wildcards = std::collections::HashSet::new();
        for i in 0..24 {
            let mut permission = PermissionDoc::sample(i);
            permission.normalize();
            assert!(wildcards.insert(permission.wildcard.clone()));
        }
    }
}
