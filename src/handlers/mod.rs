// Handlers HTTP: API REST, health checks e webhook do WhatsApp
pub mod companies;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod processes;
pub mod sync;
pub mod whatsapp;

pub use companies::*;
pub use dashboard::*;
pub use export::*;
pub use health::*;
pub use processes::*;
pub use sync::*;
pub use whatsapp::*;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use acessorias_processos::middleware as app_middleware;
use acessorias_processos::AppState;

/// Rotas da aplicação; sync manual e exportação exigem X-Admin-Key
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))

        // API de consulta
        .route("/api/v1/processes", get(list_processes))
        .route("/api/v1/processes/:id", get(get_process))
        .route("/api/v1/companies", get(list_companies))
        .route("/api/v1/companies/:id/processes", get(company_processes))
        .route("/api/v1/dashboard/metrics", get(get_dashboard_metrics))
        .route("/api/v1/sync/status", get(sync_status))
        .route("/api/v1/sync/history", get(sync_history))

        // Webhook do WhatsApp (validação própria)
        .route(
            "/webhook/whatsapp",
            get(verify_whatsapp_webhook).post(handle_whatsapp_webhook),
        )
        .with_state(state.clone());

    // ✅ Rotas administrativas protegidas com API key
    let admin_routes = Router::new()
        .route("/api/v1/sync/manual", post(manual_sync))
        .route("/api/v1/export", post(export_spreadsheets))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_admin_key,
        ))
        .with_state(state);

    public_routes.merge(admin_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acessorias::{AcessoriasClient, ClientOptions};
    use acessorias_processos::config::Settings;
    use acessorias_processos::services::Store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _dir: tempfile::TempDir,
    }

    async fn app_with(base_url: String, configure: impl FnOnce(&mut Settings)) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.cache.dir = dir.path().join("cache").display().to_string();
        settings.export.output_dir = dir.path().join("exports").display().to_string();
        settings.sync.batch_delay_ms = 0;
        configure(&mut settings);

        let client = AcessoriasClient::with_options(
            "test-token",
            ClientOptions {
                base_url,
                max_requests_per_minute: 0,
                retry_cooldown: Duration::ZERO,
                page_delay: Duration::ZERO,
                ..Default::default()
            },
        )
        .unwrap();
        let store = Store::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(settings, store, client));

        TestApp {
            router: router(state),
            _dir: dir,
        }
    }

    async fn app() -> TestApp {
        app_with("http://127.0.0.1:9".to_string(), |_| {}).await
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_process_count() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["processes"], 0);
    }

    #[tokio::test]
    async fn test_ready_fails_when_source_unreachable() {
        let app = app().await;
        let (status, _) = send(&app, get_request("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ready_with_empty_listing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/processes/ListAll/");
            then.status(204);
        });
        let app = app_with(server.base_url(), |_| {}).await;

        let (status, body) = send(&app, get_request("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["ready"], true);
        assert_eq!(body["dependencies"]["acessorias"]["status"], "connected");
    }

    #[tokio::test]
    async fn test_sync_status_never_run() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/api/v1/sync/status")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "NEVER_RUN");
    }

    #[tokio::test]
    async fn test_process_not_found_and_bad_competence() {
        let app = app().await;

        let (status, _) = send(&app, get_request("/api/v1/processes/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get_request("/api/v1/processes?competence=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, get_request("/api/v1/processes?competence=2025-10&limit=9999")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["limit"], 500);
    }

    #[tokio::test]
    async fn test_dashboard_metrics_cached_on_second_call() {
        let app = app().await;

        let (status, body) = send(&app, get_request("/api/v1/dashboard/metrics?competence=10/2025")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["from_cache"], false);

        let (_, body) = send(&app, get_request("/api/v1/dashboard/metrics?competence=10/2025")).await;
        let body = json_of(&body);
        assert_eq!(body["from_cache"], true);
        assert_eq!(body["metrics"]["competence"], "10/2025");
    }

    #[tokio::test]
    async fn test_admin_routes_require_key() {
        let app = app_with("http://127.0.0.1:9".to_string(), |s| {
            s.server.admin_api_key = Some("chave-admin".to_string());
        })
        .await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/export")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/export")
            .header("X-Admin-Key", "chave-admin")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["count"], 0);
    }

    #[tokio::test]
    async fn test_manual_sync_records_run() {
        let server = MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(GET).path("/processes/ListAll/");
            then.status(200).json_body(json!([]));
        });
        let app = app_with(server.base_url(), |_| {}).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/sync/manual?kind=full&competence=10/2025")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let report = json_of(&body);
        assert_eq!(report["kind"], "FULL");
        assert_eq!(report["status"], "COMPLETED");
        assert_eq!(report["total_processes"], 0);
        assert!(listing.hits() > 0);

        let (_, body) = send(&app, get_request("/api/v1/sync/history")).await;
        assert_eq!(json_of(&body)["count"], 1);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/sync/manual?kind=parcial")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_whatsapp_verify_handshake() {
        let app = app().await;

        let uri = "/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=acessorias_verify&hub.challenge=42";
        let (status, body) = send(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"42");

        let uri = "/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=errado&hub.challenge=42";
        let (status, _) = send(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    fn whatsapp_payload(from: &str, text: &str) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {"messages": [
                {"from": from, "type": "text", "text": {"body": text}}
            ]}}]}]
        })
    }

    #[tokio::test]
    async fn test_whatsapp_message_gets_reply() {
        let app = app_with("http://127.0.0.1:9".to_string(), |s| {
            s.whatsapp.authorized_managers = vec!["5511999990000".to_string()];
        })
        .await;

        let body = serde_json::to_vec(&json!({
            "entry": [{"changes": [{"value": {"messages": [
                {"from": "5511999990000", "type": "text", "text": {"body": "0"}},
                {"from": "5511888880000", "type": "text", "text": {"body": "1"}}
            ]}}]}]
        }))
        .unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["ignored"], 1);
        assert_eq!(body["replies"].as_array().unwrap().len(), 1);
        assert_eq!(body["replies"][0]["to"], "5511999990000");
        assert!(body["replies"][0]["message"].as_str().unwrap().contains("10/2025"));
    }

    #[tokio::test]
    async fn test_whatsapp_signature_is_checked_when_secret_configured() {
        let app = app_with("http://127.0.0.1:9".to_string(), |s| {
            s.whatsapp.app_secret = Some("segredo".to_string());
        })
        .await;

        let body = serde_json::to_vec(&whatsapp_payload("5511999990000", "1")).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header("X-Hub-Signature-256", "sha256=00")
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
