//! Party document schema
//!
//! An entity (e.g. municipal) responsible in disaster management. It may be
//! a self managed entity or a division within another party in case there
//! is hierarchy.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actions::{Validate, ValidateCtx};
use crate::db::mongo::{IntoIndexes, MutMetadata, Searchable};
use crate::db::schemas::{Metadata, ROLE_COLLECTION};
use crate::types::{MusterError, Result};
use crate::validation::{is_valid_email, is_valid_mobile};

/// Collection name for parties
pub const PARTY_COLLECTION: &str = "parties";

/// GeoJSON point (longitude, latitude pair)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "default_point_kind")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

fn default_point_kind() -> String {
    "Point".to_string()
}

impl GeoPoint {
    /// Create a point from a longitude, latitude pair
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: default_point_kind(),
            coordinates: vec![longitude, latitude],
        }
    }

    /// Random point for sample data
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self::new(rng.gen_range(-180.0..180.0), rng.gen_range(-90.0..90.0))
    }
}

/// Party document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PartyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Id of the parent party this party belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,

    /// Category of the party (one of the configured party types)
    #[serde(rename = "type", default)]
    pub party_type: String,

    /// Form of possession of the party (one of the configured ownerships)
    #[serde(default)]
    pub ownership: String,

    /// Participatory phases of the party in disaster management
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<String>,

    /// Human readable name of the party
    #[serde(default)]
    pub name: String,

    /// Image (logo or face) of the party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Primary mobile phone number used to contact the party
    #[serde(default)]
    pub phone: String,

    /// Primary main-line (or fixed-line) phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landline: Option<String>,

    /// Primary fax number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,

    /// Primary email address used to contact the party
    #[serde(default)]
    pub email: String,

    /// Primary website url of the party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Brief summary about the party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,

    /// Primary physical address of the party office
    #[serde(rename = "physicalAddress", skip_serializing_if = "Option::is_none")]
    pub physical_address: Option<String>,

    /// Primary postal address of the party office
    #[serde(rename = "postalAddress", skip_serializing_if = "Option::is_none")]
    pub postal_address: Option<String>,

    /// Language, region and variant preferences of the party
    #[serde(default)]
    pub locale: String,

    /// Geo-location coordinates of the party main office
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    /// Role ids assigned to the party; every id must reference an
    /// existing role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl PartyDoc {
    /// Create a new party document with the required contact fields
    pub fn new(name: &str, phone: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    /// Party longitude, or 0 when no location is set
    pub fn longitude(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|point| point.coordinates.first().copied())
            .unwrap_or(0.0)
    }

    /// Party latitude, or 0 when no location is set
    pub fn latitude(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|point| point.coordinates.get(1).copied())
            .unwrap_or(0.0)
    }

    /// Sample party for seeding
    pub fn sample(i: usize) -> Self {
        const NAMES: &[&str] = &[
            "Bedfordshire",
            "Berkshire",
            "Cambridgeshire",
            "Cheshire",
            "Cornwall",
            "Cumbria",
            "Derbyshire",
            "Devon",
            "Dorset",
            "Durham",
            "Essex",
            "Hampshire",
            "Kent",
            "Lancashire",
            "Merseyside",
            "Norfolk",
            "Oxfordshire",
            "Somerset",
            "Surrey",
            "Wiltshire",
        ];

        let mut rng = rand::thread_rng();
        let name = NAMES[i % NAMES.len()];

        let mut party = Self::new(
            name,
            &format!(
                "({:03}) {:03}-{:04}",
                rng.gen_range(200..999),
                rng.gen_range(200..999),
                rng.gen_range(0..9999)
            ),
            &format!("{}.{}@example.com", name.to_lowercase(), i),
        );
        party.about = Some(format!("{} disaster management office", name));
        party.physical_address = Some(format!("{} Bobbie Station", rng.gen_range(100..999)));
        party.postal_address = Some(format!("{} Ondricka Row", rng.gen_range(10000..99999)));
        party.website = Some(format!("https://{}.example.com", name.to_lowercase()));
        party.location = Some(GeoPoint::random());
        party
    }
}

#[async_trait::async_trait]
impl Validate for PartyDoc {
    async fn pre_validate(&mut self, ctx: &ValidateCtx<'_>) -> Result<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(MusterError::validation("name", "is required"));
        }

        self.phone = self.phone.trim().to_string();
        if self.phone.is_empty() {
            return Err(MusterError::validation("phone", "is required"));
        }
        if !is_valid_mobile(&self.phone) {
            return Err(MusterError::validation(
                "phone",
                "is not a valid mobile number",
            ));
        }

        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() {
            return Err(MusterError::validation("email", "is required"));
        }
        if !is_valid_email(&self.email) {
            return Err(MusterError::validation(
                "email",
                "is not a valid email address",
            ));
        }

        self.party_type = self.party_type.trim().to_string();
        if self.party_type.is_empty() {
            self.party_type = ctx.enums.default_party_type.clone();
        }
        if !ctx.enums.party_types.iter().any(|t| t == &self.party_type) {
            return Err(MusterError::validation(
                "type",
                &format!("'{}' is not an allowed party type", self.party_type),
            ));
        }

        self.ownership = self.ownership.trim().to_string();
        if self.ownership.is_empty() {
            self.ownership = ctx.enums.default_party_ownership.clone();
        }
        if !ctx
            .enums
            .party_ownerships
            .iter()
            .any(|o| o == &self.ownership)
        {
            return Err(MusterError::validation(
                "ownership",
                &format!("'{}' is not an allowed ownership", self.ownership),
            ));
        }

        self.locale = self.locale.trim().to_string();
        if self.locale.is_empty() {
            self.locale = ctx.enums.default_locale.clone();
        }
        if !ctx.enums.locales.iter().any(|l| l == &self.locale) {
            return Err(MusterError::validation(
                "locale",
                &format!("'{}' is not an allowed locale", self.locale),
            ));
        }

        for phase in &self.phases {
            if !ctx.enums.disaster_phases.iter().any(|p| p == phase) {
                return Err(MusterError::validation(
                    "phases",
                    &format!("'{}' is not an allowed disaster phase", phase),
                ));
            }
        }

        if let Some(ref mut website) = self.website {
            *website = website.trim().to_lowercase();
        }

        if let Some(ref location) = self.location {
            if location.kind != "Point" {
                return Err(MusterError::validation("location", "must be a GeoJSON Point"));
            }
            if location.coordinates.len() != 2 {
                return Err(MusterError::validation(
                    "location",
                    "must hold a longitude, latitude pair",
                ));
            }
            let (longitude, latitude) = (location.coordinates[0], location.coordinates[1]);
            if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
                return Err(MusterError::validation(
                    "location",
                    "coordinates are out of range",
                ));
            }
        }

        if let Some(ref parent) = self.party {
            if let Some(id) = self._id {
                if *parent == id.to_hex() {
                    return Err(MusterError::validation(
                        "party",
                        "must not reference the party itself",
                    ));
                }
            }
            ctx.ensure_exists(PARTY_COLLECTION, "party", std::slice::from_ref(parent))
                .await?;
        }

        if let Some(ref roles) = self.roles {
            ctx.ensure_exists(ROLE_COLLECTION, "roles", roles).await?;
        }

        Ok(())
    }
}

impl IntoIndexes for PartyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Fix unique indexes on email, phone and name in case they are
            // used in more than one party
            (
                doc! { "type": 1, "name": 1, "phone": 1, "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("type_name_phone_email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(IndexOptions::builder().name("name_index".to_string()).build()),
            ),
            (
                doc! { "party": 1 },
                Some(IndexOptions::builder().name("party_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for PartyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Searchable for PartyDoc {
    fn searchable_fields() -> &'static [&'static str] {
        &[
            "name",
            "phone",
            "email",
            "website",
            "about",
            "physicalAddress",
            "postalAddress",
        ]
    }
}
