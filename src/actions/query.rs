//! List query options parsed from a request's query string.

use bson::{doc, Document};

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: u32 = 10;

/// Hard ceiling on page size
pub const MAX_LIMIT: u32 = 100;

/// Pagination, sorting, search and filter options for list endpoints,
/// plus the `select` projection honored by single-record reads.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub skip: u64,
    pub sort: Option<String>,
    pub q: Option<String>,
    pub select: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    /// Parse options from a raw query string. Only keys named in
    /// `filter_keys` are accepted as equality filters, either plain
    /// (`type=Agency`) or bracketed (`filter[type]=Agency`).
    pub fn from_query_string(query: Option<&str>, filter_keys: &[&str]) -> Self {
        let mut page: u32 = 1;
        let mut limit: u32 = DEFAULT_LIMIT;
        let mut explicit_skip: Option<u64> = None;
        let mut params = Self::default();

        if let Some(q) = query {
            for pair in q.split('&') {
                if let Some((key, value)) = pair.split_once('=') {
                    let value = urlencoding::decode(value).unwrap_or_default().to_string();
                    let key = key.trim();

                    match key {
                        "page" => page = value.parse().unwrap_or(1).max(1),
                        "limit" => {
                            limit = value.parse().unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
                        }
                        "skip" => explicit_skip = value.parse().ok(),
                        "sort" => params.sort = Some(value),
                        "q" => params.q = Some(value),
                        "select" => params.select = Some(value),
                        _ => {
                            let filter_key = key
                                .strip_prefix("filter[")
                                .and_then(|k| k.strip_suffix(']'))
                                .unwrap_or(key);
                            if filter_keys.contains(&filter_key) {
                                params.filters.push((filter_key.to_string(), value));
                            }
                        }
                    }
                }
            }
        }

        // skip wins over page when both are given
        let skip = match explicit_skip {
            Some(skip) => {
                page = (skip / limit as u64) as u32 + 1;
                skip
            }
            None => (page as u64 - 1) * limit as u64,
        };

        params.page = page;
        params.limit = limit;
        params.skip = skip;
        params
    }

    /// Build the MongoDB filter document: equality filters plus a
    /// case-insensitive regex search over the schema's searchable fields.
    pub fn filter_document(&self, searchable: &[&str]) -> Document {
        let mut filter = Document::new();

        for (key, value) in &self.filters {
            filter.insert(key.as_str(), value.as_str());
        }

        if let Some(ref q) = self.q {
            if !q.is_empty() && !searchable.is_empty() {
                let clauses: Vec<Document> = searchable
                    .iter()
                    .map(|field| doc! { *field: { "$regex": q.clone(), "$options": "i" } })
                    .collect();
                filter.insert("$or", clauses);
            }
        }

        filter
    }

    /// Build the sort document; defaults to most recently updated first.
    pub fn sort_document(&self) -> Document {
        match self.sort.as_deref() {
            Some(raw) if !raw.is_empty() => {
                let (field, direction) = match raw.strip_prefix('-') {
                    Some(field) => (field, -1),
                    None => (raw, 1),
                };
                doc! { map_sort_field(field): direction }
            }
            _ => doc! { "metadata.updated_at": -1 },
        }
    }

    /// Build the field projection for the `select` option, if any.
    pub fn projection(&self) -> Option<Document> {
        let select = self.select.as_deref()?;
        let mut projection = Document::new();
        for field in select.split(',') {
            let field = field.trim();
            if !field.is_empty() {
                projection.insert(map_sort_field(field), 1);
            }
        }
        (!projection.is_empty()).then_some(projection)
    }
}

/// Map wire-level timestamp names onto their stored location.
fn map_sort_field(field: &str) -> &str {
    match field {
        "createdAt" => "metadata.created_at",
        "updatedAt" => "metadata.updated_at",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = ListQuery::from_query_string(None, &[]);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.skip, 0);
        assert!(query.q.is_none());
    }

    #[test]
    fn test_page_derives_skip() {
        let query = ListQuery::from_query_string(Some("page=3&limit=20"), &[]);
        assert_eq!(query.skip, 40);
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn test_skip_derives_page() {
        let query = ListQuery::from_query_string(Some("skip=25&limit=10"), &[]);
        assert_eq!(query.page, 3);
        assert_eq!(query.skip, 25);
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = ListQuery::from_query_string(Some("limit=1000"), &[]);
        assert_eq!(query.limit, MAX_LIMIT);
    }

    #[test]
    fn test_filters_respect_allow_list() {
        let query = ListQuery::from_query_string(
            Some("type=Agency&filter[ownership]=Government&bogus=1"),
            &["type", "ownership"],
        );
        assert_eq!(
            query.filters,
            vec![
                ("type".to_string(), "Agency".to_string()),
                ("ownership".to_string(), "Government".to_string())
            ]
        );

        let filter = query.filter_document(&[]);
        assert_eq!(filter.get_str("type").unwrap(), "Agency");
        assert_eq!(filter.get_str("ownership").unwrap(), "Government");
    }

    #[test]
    fn test_search_builds_or_clauses() {
        let query = ListQuery::from_query_string(Some("q=Bedford"), &[]);
        let filter = query.filter_document(&["name", "email"]);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn test_sort_direction() {
        let query = ListQuery::from_query_string(Some("sort=-name"), &[]);
        assert_eq!(query.sort_document(), doc! { "name": -1 });

        let query = ListQuery::from_query_string(Some("sort=updatedAt"), &[]);
        assert_eq!(query.sort_document(), doc! { "metadata.updated_at": 1 });
    }

    #[test]
    fn test_select_projection() {
        let query = ListQuery::from_query_string(Some("select=name,email"), &[]);
        assert_eq!(query.projection(), Some(doc! { "name": 1, "email": 1 }));
    }

    #[test]
    fn test_urlencoded_values() {
        let query = ListQuery::from_query_string(Some("type=Focal%20Person"), &["type"]);
        assert_eq!(
            query.filters,
            vec![("type".to_string(), "Focal Person".to_string())]
        );
    }
}
