//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::analysis::{EvictionDistribution, TracingObserver};
use crate::cache::{entry_size, BoundedCache, EvictionObserver};
use crate::config::{CacheConfig, Config};
use crate::error::{ApiError, ApiResult, Result};
use crate::models::{
    DeleteResponse, DistributionQuery, GetResponse, HealthResponse, HistoryQuery,
    HistoryResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes itself, so the state only holds an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache
    pub cache: Arc<BoundedCache>,
    /// TTL applied when a request carries none
    pub default_ttl: Option<u64>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: BoundedCache) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl: None,
        }
    }

    /// Builds the cache described by `config`, logging removals through tracing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = build_cache(&config.cache)?;
        Ok(Self {
            cache: Arc::new(cache),
            default_ttl: config.default_ttl(),
        })
    }
}

fn build_cache(config: &CacheConfig) -> Result<BoundedCache> {
    let observers: Vec<Arc<dyn EvictionObserver>> = vec![Arc::new(TracingObserver)];
    BoundedCache::with_observers(config.clone(), observers)
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> ApiResult<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.or(state.default_ttl);
    let size = entry_size(&req.key, req.value.as_bytes());
    state.cache.set_with_ttl(req.key.clone(), req.value, ttl)?;

    Ok(Json(SetResponse::new(req.key, size)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<GetResponse>> {
    let entry = state
        .cache
        .get_entry(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, &entry.value, entry.ttl_remaining_ms())))
}

/// Handler for DELETE /del/:key
///
/// Idempotent: deleting an absent key succeeds with `deleted: false`.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key);
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(stats, state.cache.policy_kind()))
}

/// Handler for GET /evictions
///
/// Returns the most recent `limit` records, oldest first.
pub async fn evictions_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let history = state.cache.history();
    let skip = query
        .limit
        .map_or(0, |limit| history.len().saturating_sub(limit));

    Json(HistoryResponse {
        total: history.len(),
        records: history[skip..].to_vec(),
    })
}

/// Handler for GET /evictions/distribution
pub async fn distribution_handler(
    State(state): State<AppState>,
    Query(query): Query<DistributionQuery>,
) -> Json<EvictionDistribution> {
    let history = state.cache.history();
    Json(EvictionDistribution::from_records(
        &history,
        query.prefix(),
        query.bucket_width(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicyKind;

    fn test_state(budget: u64) -> AppState {
        AppState::new(BoundedCache::new(CacheConfig::new(budget, EvictionPolicyKind::Lru)).unwrap())
    }

    fn set_request(key: &str, value: &str) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state(1024);

        let result = set_handler(State(state.clone()), Json(set_request("test_key", "test_value"))).await;
        assert_eq!(result.unwrap().size, 18);

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "test_value");
        assert_eq!(response.ttl_remaining_ms, None);
    }

    #[tokio::test]
    async fn test_set_reports_charged_size() {
        let state = test_state(1024);

        // multi-byte characters are charged by their UTF-8 length
        let result = set_handler(State(state.clone()), Json(set_request("clé", "värde")))
            .await
            .unwrap();
        assert_eq!(result.size, 10);
        assert_eq!(state.cache.stats().used_bytes, result.size);
    }

    #[tokio::test]
    async fn test_get_reports_ttl_remaining() {
        let state = test_state(1024);
        let mut req = set_request("ttl_key", "v");
        req.ttl = Some(30);
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let response = get_handler(State(state), Path("ttl_key".to_string()))
            .await
            .unwrap();
        let remaining = response.ttl_remaining_ms.unwrap();
        assert!(remaining > 20_000 && remaining <= 30_000);
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state(1024);

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let state = test_state(1024);
        set_handler(State(state.clone()), Json(set_request("to_delete", "value")))
            .await
            .unwrap();

        let first = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        let second = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;

        assert!(first.deleted);
        assert!(!second.deleted);
        assert!(get_handler(State(state), Path("to_delete".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn test_set_too_large() {
        let state = test_state(8);

        let result = set_handler(State(state), Json(set_request("key", "too long"))).await;
        assert!(matches!(result, Err(ApiError::ValueTooLarge(_))));
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state(1024);

        let result = set_handler(State(state), Json(set_request("", "value"))).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_default_ttl_applied() {
        let mut state = test_state(1024);
        state.default_ttl = Some(60);

        set_handler(State(state.clone()), Json(set_request("k", "v")))
            .await
            .unwrap();
        assert!(state.cache.contains("k"));
    }

    #[tokio::test]
    async fn test_stats_and_evictions_handlers() {
        let state = test_state(20);
        for key in ["a", "b", "c"] {
            set_handler(State(state.clone()), Json(set_request(key, "123456789")))
                .await
                .unwrap();
        }

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.eviction_count, 1);
        assert_eq!(stats.eviction_policy, "lru");

        let history = evictions_handler(
            State(state.clone()),
            Query(HistoryQuery { limit: Some(5) }),
        )
        .await;
        assert_eq!(history.total, 1);
        assert_eq!(history.records[0].key, "a");
    }

    #[tokio::test]
    async fn test_evictions_limit_keeps_latest() {
        let state = test_state(10);
        for key in ["a", "b", "c", "d"] {
            set_handler(State(state.clone()), Json(set_request(key, "123456789")))
                .await
                .unwrap();
        }

        let history =
            evictions_handler(State(state), Query(HistoryQuery { limit: Some(2) })).await;
        assert_eq!(history.total, 3);
        let keys: Vec<_> = history.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_from_config_uses_policy_and_ttl() {
        let mut config = Config::default();
        config.cache.eviction_policy = EvictionPolicyKind::Random;
        config.default_ttl = 30;

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.cache.policy_kind(), EvictionPolicyKind::Random);
        assert_eq!(state.default_ttl, Some(30));
    }
}
