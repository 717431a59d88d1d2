//! Configuration for Muster
//!
//! CLI arguments and environment variable handling using clap. Enumerated
//! value sets are read once at startup into [`Enums`] and passed explicitly
//! to the modules that need them.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::types::{MusterError, Result};

/// Muster - party, role and permission registry for disaster management
#[derive(Parser, Debug, Clone)]
#[command(name = "muster")]
#[command(about = "Party, role and permission registry for disaster management")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "muster")]
    pub mongodb_db: String,

    /// API version used as the path prefix (/v{N})
    #[arg(long, env = "API_VERSION", default_value = "1")]
    pub api_version: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Comma-separated party categories
    #[arg(
        long,
        env = "PARTY_TYPES",
        default_value = "Focal Person,Agency,Committee,Team,Other"
    )]
    pub party_types: String,

    /// Default party category when none is provided
    #[arg(long, env = "DEFAULT_PARTY_TYPE", default_value = "Other")]
    pub default_party_type: String,

    /// Comma-separated party ownership forms
    #[arg(
        long,
        env = "PARTY_OWNERSHIPS",
        default_value = "Government,Private,NGO,Company,Individual,Other"
    )]
    pub party_ownerships: String,

    /// Default party ownership when none is provided
    #[arg(long, env = "DEFAULT_PARTY_OWNERSHIP", default_value = "Other")]
    pub default_party_ownership: String,

    /// Comma-separated disaster-management participatory phases
    #[arg(
        long,
        env = "DISASTER_PHASES",
        default_value = "Mitigation,Preparedness,Response,Recovery"
    )]
    pub disaster_phases: String,

    /// Comma-separated role categories
    #[arg(long, env = "ROLE_TYPES", default_value = "System,Assignable,Other")]
    pub role_types: String,

    /// Default role category when none is provided
    #[arg(long, env = "DEFAULT_ROLE_TYPE", default_value = "Other")]
    pub default_role_type: String,

    /// Comma-separated supported locales
    #[arg(long, env = "LOCALES", default_value = "en,sw")]
    pub locales: String,

    /// Default locale when none is provided
    #[arg(long, env = "DEFAULT_LOCALE", default_value = "en")]
    pub default_locale: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_version == 0 {
            return Err(MusterError::Config(
                "API_VERSION must be greater than zero".to_string(),
            ));
        }
        // Enum lists get their own validation on load
        Enums::from_args(self).map(|_| ())
    }
}

/// Enumerated value sets consumed by validation and schema introspection.
///
/// Loaded once at startup from [`Args`]; handlers receive it through the
/// shared application state instead of reading the environment ad hoc.
#[derive(Debug, Clone)]
pub struct Enums {
    pub party_types: Vec<String>,
    pub default_party_type: String,
    pub party_ownerships: Vec<String>,
    pub default_party_ownership: String,
    pub disaster_phases: Vec<String>,
    pub role_types: Vec<String>,
    pub default_role_type: String,
    pub locales: Vec<String>,
    pub default_locale: String,
}

impl Enums {
    /// Build and validate the enum sets from parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let party_types = parse_list("PARTY_TYPES", &args.party_types)?;
        let party_ownerships = parse_list("PARTY_OWNERSHIPS", &args.party_ownerships)?;
        let disaster_phases = parse_list("DISASTER_PHASES", &args.disaster_phases)?;
        let role_types = parse_list("ROLE_TYPES", &args.role_types)?;
        let locales = parse_list("LOCALES", &args.locales)?;

        ensure_member("DEFAULT_PARTY_TYPE", &args.default_party_type, &party_types)?;
        ensure_member(
            "DEFAULT_PARTY_OWNERSHIP",
            &args.default_party_ownership,
            &party_ownerships,
        )?;
        ensure_member("DEFAULT_ROLE_TYPE", &args.default_role_type, &role_types)?;
        ensure_member("DEFAULT_LOCALE", &args.default_locale, &locales)?;

        Ok(Self {
            party_types,
            default_party_type: args.default_party_type.clone(),
            party_ownerships,
            default_party_ownership: args.default_party_ownership.clone(),
            disaster_phases,
            role_types,
            default_role_type: args.default_role_type.clone(),
            locales,
            default_locale: args.default_locale.clone(),
        })
    }
}

/// Split a comma-separated allow-list, trimming entries and dropping
/// duplicates while preserving order. An empty list is a configuration error.
fn parse_list(name: &str, raw: &str) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if !values.iter().any(|v| v == entry) {
            values.push(entry.to_string());
        }
    }

    if values.is_empty() {
        return Err(MusterError::Config(format!(
            "{} must list at least one value",
            name
        )));
    }

    Ok(values)
}

fn ensure_member(name: &str, value: &str, list: &[String]) -> Result<()> {
    if list.iter().any(|v| v == value) {
        Ok(())
    } else {
        Err(MusterError::Config(format!(
            "{} '{}' is not in its configured list",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args::parse_from(["muster"])
    }

    #[test]
    fn test_defaults_load() {
        let enums = Enums::from_args(&args()).unwrap();
        assert_eq!(enums.default_party_type, "Other");
        assert_eq!(enums.default_party_ownership, "Other");
        assert_eq!(enums.default_locale, "en");
        assert!(enums.party_types.contains(&"Agency".to_string()));
        assert_eq!(
            enums.disaster_phases,
            vec!["Mitigation", "Preparedness", "Response", "Recovery"]
        );
    }

    #[test]
    fn test_list_parsing_trims_and_dedupes() {
        let values = parse_list("ROLE_TYPES", " System , Assignable,System ,,Other").unwrap();
        assert_eq!(values, vec!["System", "Assignable", "Other"]);
    }

    #[test]
    fn test_empty_list_rejected() {
        let mut args = args();
        args.disaster_phases = " , ,".to_string();
        assert!(Enums::from_args(&args).is_err());
    }

    #[test]
    fn test_default_must_be_member() {
        let mut args = args();
        args.default_role_type = "Supreme".to_string();
        let err = Enums::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("DEFAULT_ROLE_TYPE"));
    }

    #[test]
    fn test_args_validate() {
        assert!(args().validate().is_ok());
    }
}
