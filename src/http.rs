//! HTTP 接口（feature = "web"）
//!
//! GET /health；POST /api/chat {"message": "..."} 返回 OrchestratorResponse。
//! 除 /health 外的路由经过准入控制中间件：按客户端 IP 限流，响应附带 X-RateLimit-* 头，超限返回 429。
//! 客户端 IP 默认取对端地址；仅当 rate_limit.trust_forwarded_for 开启时采用 X-Forwarded-For 首项。

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{Orchestrator, OrchestratorResponse, RunContext};
use crate::ratelimit::{AdmissionController, Decision};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub admission: Arc<AdmissionController>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/chat", post(api_chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<OrchestratorResponse>, (StatusCode, Json<serde_json::Value>)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"error": "message is required"}))));
    }

    let ctx = RunContext::with_timeout(state.orchestrator.request_timeout());
    state
        .orchestrator
        .process_message(&ctx, message)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::GATEWAY_TIMEOUT, Json(json!({"error": e.to_string()}))))
}

/// 客户端标识：信任代理时取 X-Forwarded-For 第一项，否则对端 IP
fn client_identity(req: &Request, trust_forwarded_for: bool) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| trust_forwarded_for && !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    for (name, value) in decision.headers() {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            headers.insert(name, value);
        }
    }
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let identity = client_identity(&req, state.admission.trusts_forwarded_for());
    let decision = state.admission.admit(&identity, chrono::Utc::now()).await;

    let mut response = match decision.rejection() {
        Some(rejection) => (StatusCode::TOO_MANY_REQUESTS, Json(rejection)).into_response(),
        None => next.run(req).await,
    };
    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::OrchestratorBuilder;
    use crate::store::InMemoryStore;
    use axum::body::{to_bytes, Body};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(limit: u64, trust_forwarded_for: bool) -> Router {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator = OrchestratorBuilder::new(AppConfig::default())
            .with_store(store.clone())
            .build();
        let admission = AdmissionController::new(store, limit, Duration::from_secs(60), "ratelimit:")
            .with_trust_forwarded_for(trust_forwarded_for);
        router(AppState {
            orchestrator: Arc::new(orchestrator),
            admission: Arc::new(admission),
        })
    }

    fn app(limit: u64) -> Router {
        app_with(limit, true)
    }

    fn chat(message: &str, ip: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({"message": message}).to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let resp = app(0)
            .oneshot(axum::http::Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("x-ratelimit-limit").is_none());
        assert_eq!(body_json(resp).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_chat_returns_orchestrator_response_with_headers() {
        let resp = app(100).oneshot(chat("Find laptops under $1000", "10.1.1.1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-ratelimit-limit"], "100");
        assert_eq!(resp.headers()["x-ratelimit-remaining"], "99");
        assert!(resp.headers().contains_key("x-ratelimit-reset"));

        let body = body_json(resp).await;
        assert_eq!(body["search_results"]["query"], "laptops");
        assert!(body["message"].as_str().unwrap().contains("laptops"));
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let resp = app(100).oneshot(chat("   ", "10.1.1.1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_over_limit_is_rejected_per_client() {
        let app = app(1);
        let first = app.clone().oneshot(chat("Find laptops", "10.2.2.2")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(chat("Find laptops", "10.2.2.2")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
        let body = body_json(second).await;
        assert_eq!(body["error"], "Rate limit exceeded");
        assert!(body["retry_after"].as_u64().unwrap() > 0);

        let other = app.oneshot(chat("Find laptops", "10.3.3.3, 172.16.0.1")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_for_ignored_unless_trusted() {
        let app = app_with(1, false);
        let first = app.clone().oneshot(chat("Find laptops", "10.4.4.4")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // 伪造的 X-Forwarded-For 不会换来新的额度
        let spoofed = app.oneshot(chat("Find laptops", "10.5.5.5")).await.unwrap();
        assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_client_identity_prefers_peer_address() {
        let mut req = chat("hi", "203.0.113.7, 10.0.0.1");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 5000))));
        assert_eq!(client_identity(&req, false), "192.168.1.20");
        assert_eq!(client_identity(&req, true), "203.0.113.7");
    }
}
