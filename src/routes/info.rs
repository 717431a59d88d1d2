//! Root endpoint exposing package metadata

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, FullBody};

/// Package metadata served at `/`
#[derive(Debug, Serialize)]
pub struct PackageInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub license: &'static str,
    pub homepage: &'static str,
    pub repository: &'static str,
    pub commit: &'static str,
}

impl PackageInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            version: env!("CARGO_PKG_VERSION"),
            license: env!("CARGO_PKG_LICENSE"),
            homepage: env!("CARGO_PKG_HOMEPAGE"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        }
    }
}

/// GET /
pub fn package_info() -> Response<FullBody> {
    json_response(StatusCode::OK, &PackageInfo::current())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_info_fields() {
        let info = PackageInfo::current();
        assert_eq!(info.name, "muster");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
