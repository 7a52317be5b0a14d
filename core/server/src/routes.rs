//! Router and request handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::debug;

use fleetsync_common::ProviderId;
use fleetsync_providers::ConnectionStatus;
use fleetsync_store::Provider;
use fleetsync_sync::{ConnectionTest, NewProvider, ProviderUpdate, ReconcileSummary};

use crate::error::ApiResult;
use crate::state::AppState;

/// Success envelope: `{success, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    cascade: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Removed {
    trailers_removed: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/providers", post(create_provider))
        .route(
            "/providers/{id}",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route("/providers/{id}/sync", post(sync_provider))
        .route("/providers/{id}/test", post(test_provider))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn provider_id(raw: String) -> ApiResult<ProviderId> {
    Ok(ProviderId::new(raw)?)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn create_provider(
    State(state): State<AppState>,
    payload: Result<Json<NewProvider>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Provider>>)> {
    let Json(input) = payload?;
    let provider = state.service.register(input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(provider)))
}

async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Provider>>> {
    let id = provider_id(id)?;
    Ok(ApiResponse::ok(state.service.provider(&id).await?))
}

async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProviderUpdate>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Provider>>> {
    let id = provider_id(id)?;
    let Json(update) = payload?;

    let provider = state.service.update(&id, update).await?;
    state.status_cache.invalidate(&id);
    Ok(ApiResponse::ok(provider))
}

async fn delete_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Removed>>> {
    let id = provider_id(id)?;
    let Query(params) = params?;

    let trailers_removed = state.service.remove(&id, params.cascade).await?;
    state.status_cache.invalidate(&id);
    Ok(ApiResponse::ok(Removed { trailers_removed }))
}

async fn sync_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ReconcileSummary>>> {
    let id = provider_id(id)?;

    // The provider's status changes either way.
    let result = state.service.sync(&id).await;
    state.status_cache.invalidate(&id);

    Ok(ApiResponse::ok(result?))
}

async fn test_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ConnectionTest>>> {
    let id = provider_id(id)?;

    let test = match state.status_cache.get(&id) {
        Some(cached) => {
            debug!(provider = %id, "Connection test served from cache");
            cached
        }
        None => {
            let test = state.service.test(&id).await?;
            // Only successes are cached; a failing connection is re-checked on every call.
            if test.status == ConnectionStatus::Connected {
                state.status_cache.insert(id, test.clone());
            }
            test
        }
    };

    Ok(Json(ApiResponse {
        success: test.status == ConnectionStatus::Connected,
        data: test,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use mockito::Matcher;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use fleetsync_crypto::{CredentialVault, MasterKey};
    use fleetsync_providers::{HttpSettings, ProviderEndpoints, ProviderFactory};
    use fleetsync_store::{MemoryStore, Store, TrailerStore};
    use fleetsync_sync::{SyncOrchestrator, SyncService};

    fn app(base_url: &str) -> (AppState, Router) {
        let endpoints = ProviderEndpoints {
            spireon: base_url.to_string(),
            skybitz: base_url.to_string(),
            samsara: base_url.to_string(),
        };
        let factory = ProviderFactory::new(&HttpSettings::default(), endpoints).unwrap();
        let vault = CredentialVault::new(MasterKey::from_bytes([3u8; 32]));
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

        let service = SyncService::new(store, SyncOrchestrator::new(vault, factory));
        let state = AppState::new(service, Duration::from_secs(60));
        (state.clone(), router(state))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_samsara(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/providers",
            Some(json!({
                "companyId": "c1",
                "tenantId": "t1",
                "type": "samsara",
                "name": "Yard trackers",
                "credentials": {"apiToken": "secret-token"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn mock_samsara(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
        let trailers = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": [{"id": "s1", "name": "Trailer 12"}, {"id": "s2", "name": "Trailer 13"}]}"#)
            .create_async()
            .await;
        let stats = server
            .mock("GET", "/fleet/trailers/stats")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;
        (trailers, stats)
    }

    #[tokio::test]
    async fn test_health() {
        let (_, app) = app("http://127.0.0.1:1");
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_and_get_never_expose_credentials() {
        let (_, app) = app("http://127.0.0.1:1");
        let id = create_samsara(&app).await;

        let (status, body) = send(&app, "GET", &format!("/providers/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["type"], "samsara");
        assert_eq!(body["data"]["status"], "untested");
        assert!(body["data"].get("credentialsEncrypted").is_none());
        assert!(!body.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (_, app) = app("http://127.0.0.1:1");

        let (status, body) = send(
            &app,
            "POST",
            "/providers",
            Some(json!({
                "companyId": "c1", "tenantId": "t1", "type": "spireon",
                "name": "Spireon", "credentials": {"apiKey": "k"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

        let (status, _) = send(
            &app,
            "POST",
            "/providers",
            Some(json!({
                "companyId": "c1", "tenantId": "t1", "type": "geotab",
                "name": "Other", "credentials": {}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/providers")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sync_returns_counts_and_records_status() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_samsara(&mut server).await;
        let (_, app) = app(&server.url());
        let id = create_samsara(&app).await;

        let (status, body) = send(&app, "POST", &format!("/providers/{}/sync", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["createdCount"], 2);
        assert_eq!(body["data"]["updatedCount"], 0);
        assert_eq!(body["data"]["failedCount"], 0);

        let (status, body) = send(&app, "POST", &format!("/providers/{}/sync", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["createdCount"], 0);
        assert_eq!(body["data"]["updatedCount"], 2);

        let (_, body) = send(&app, "GET", &format!("/providers/{}", id), None).await;
        assert_eq!(body["data"]["status"], "connected");
        assert_eq!(body["data"]["lastTrailerCount"], 2);
    }

    #[tokio::test]
    async fn test_sync_vendor_failure_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;
        let (_, app) = app(&server.url());
        let id = create_samsara(&app).await;

        let (status, body) = send(&app, "POST", &format!("/providers/{}/sync", id), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");

        let (_, body) = send(&app, "GET", &format!("/providers/{}", id), None).await;
        assert_eq!(body["data"]["status"], "error");
        assert!(body["data"]["lastError"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        let (_, app) = app("http://127.0.0.1:1");
        let (status, body) = send(&app, "POST", "/providers/missing/sync", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_connection_test_is_cached_until_update() {
        let mut server = mockito::Server::new_async().await;
        let trailers = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": [{"id": "s1"}, {"id": "s2"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let (state, app) = app(&server.url());
        let id = create_samsara(&app).await;

        let uri = format!("/providers/{}/test", id);
        let (status, body) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "connected");
        assert_eq!(body["data"]["trailerCount"], 2);

        send(&app, "POST", &uri, None).await;
        trailers.assert_async().await;
        assert_eq!(state.status_cache.len(), 1);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/providers/{}", id),
            Some(json!({"name": "Renamed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Renamed");
        assert!(state.status_cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_connection_test_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let trailers = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let (state, app) = app(&server.url());
        let id = create_samsara(&app).await;

        let uri = format!("/providers/{}/test", id);
        for _ in 0..2 {
            let (status, body) = send(&app, "POST", &uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], false);
            assert_eq!(body["data"]["status"], "error");
        }

        trailers.assert_async().await;
        assert!(state.status_cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_cascade() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_samsara(&mut server).await;
        let (state, app) = app(&server.url());
        let id = create_samsara(&app).await;
        send(&app, "POST", &format!("/providers/{}/sync", id), None).await;

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/providers/{}?cascade=true", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["trailersRemoved"], 2);

        let provider_id = ProviderId::new(id.clone()).unwrap();
        assert!(state.service.store().list_by_provider(&provider_id).await.unwrap().is_empty());

        let (status, _) = send(&app, "GET", &format!("/providers/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
