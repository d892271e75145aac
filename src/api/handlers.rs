use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{HostnameCount, UrlRecord, UrlRequest};
use crate::service::UrlService;

pub const SUCCEED: &str = "succeed";
pub const FAILED: &str = "failed";

pub struct AppState {
    pub service: Arc<UrlService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub status: String,
    pub message: String,
}

impl FailureResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: FAILED.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub message: String,
}

/// A URL record as rendered by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct UrlEntity {
    pub id: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    pub access_count: i64,
}

impl From<UrlRecord> for UrlEntity {
    fn from(record: UrlRecord) -> Self {
        Self {
            id: record.short_id,
            url: record.target_url,
            created_at: rfc3339(record.created_at),
            updated_at: rfc3339(record.updated_at),
            access_count: record.access_count,
        }
    }
}

fn rfc3339(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllUrlResponse {
    pub status: String,
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetUrlResponse {
    pub status: String,
    pub url: UrlEntity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlResponse {
    pub status: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUrlResponse {
    pub status: String,
    pub updated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub status: String,
    pub stats: Vec<HostnameCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlStatsResponse {
    pub status: String,
    pub id: String,
    pub url: String,
    pub access_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub hostname: Option<String>,
}

/// Decode a JSON body whatever its Content-Type, reporting malformed input
/// as a validation error
fn json_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::Validation(e.to_string()))
}

/// List all shortened URLs
pub async fn list_urls(State(state): State<Arc<AppState>>) -> AppResult<Json<AllUrlResponse>> {
    let urls = state.service.find_all().await?;
    Ok(Json(AllUrlResponse {
        status: SUCCEED.to_string(),
        urls: urls.into_iter().map(UrlEntity::from).collect(),
    }))
}

/// Create a new shortened URL
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<CreateUrlResponse>)> {
    let request: UrlRequest = json_body(&body)?;
    let record = state.service.create(&request.url).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateUrlResponse {
            status: SUCCEED.to_string(),
            id: record.short_id,
        }),
    ))
}

/// Get a shortened URL by id
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<GetUrlResponse>> {
    let record = state.service.find_by_id(&id).await?;
    Ok(Json(GetUrlResponse {
        status: SUCCEED.to_string(),
        url: record.into(),
    }))
}

/// Point an existing id at a new target
pub async fn update_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<UpdateUrlResponse>> {
    let request: UrlRequest = json_body(&body)?;
    let changed = state.service.update(&id, &request.url).await?;

    Ok(Json(UpdateUrlResponse {
        status: SUCCEED.to_string(),
        updated: changed > 0,
    }))
}

/// Delete a shortened URL
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    state.service.delete(&id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            status: SUCCEED.to_string(),
            message: "deleted successfully".to_string(),
        }),
    ))
}

/// Record counts grouped by target hostname
pub async fn hostname_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<Json<StatsResponse>> {
    let Query(query) =
        query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    // An empty `hostname=` means no filter
    let hostname = query.hostname.as_deref().filter(|h| !h.is_empty());
    let stats = state.service.stats_by_hostname(hostname).await?;

    Ok(Json(StatsResponse {
        status: SUCCEED.to_string(),
        stats,
    }))
}

/// Access count of a single id
pub async fn url_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<UrlStatsResponse>> {
    let record = state.service.find_by_id(&id).await?;

    Ok(Json(UrlStatsResponse {
        status: SUCCEED.to_string(),
        id: record.short_id,
        url: record.target_url,
        access_count: record.access_count,
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        status: SUCCEED.to_string(),
        message: "OK".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_renders_rfc3339_timestamps() {
        let entity = UrlEntity::from(UrlRecord {
            short_id: "abc".to_string(),
            target_url: "https://example.com".to_string(),
            created_at: 0,
            updated_at: 86_400,
            access_count: 3,
        });
        assert_eq!(entity.id, "abc");
        assert_eq!(entity.created_at, "1970-01-01T00:00:00+00:00");
        assert_eq!(entity.updated_at, "1970-01-02T00:00:00+00:00");
        assert_eq!(entity.access_count, 3);
    }
}
