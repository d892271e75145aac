use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UrlRecord {
    pub short_id: String,
    pub target_url: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub access_count: i64,
}

/// Body of `POST /urls` and `PATCH /urls/{id}`
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HostnameCount {
    pub hostname: String,
    pub count: i64,
}

/// Host portion of a target URL as used by the stats aggregation.
///
/// A leading `http://` or `https://` is stripped (case-sensitive), then
/// everything from the first `/` is dropped. The SQL backends compute the
/// same expression in their queries.
pub fn hostname_of(target_url: &str) -> &str {
    let rest = target_url
        .strip_prefix("http://")
        .or_else(|| target_url.strip_prefix("https://"))
        .unwrap_or(target_url);

    match rest.find('/') {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}
