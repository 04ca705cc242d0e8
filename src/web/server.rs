use std::sync::Arc;
use tokio::sync::RwLock;
use actix_web::{web, App, HttpServer, middleware};
use log::info;

use crate::core::business_intelligence::BusinessIntelligence;
use crate::core::orchestrator::Orchestrator;
use crate::web::handlers;

/// Shared application state for web handlers
pub struct AppState {
    pub orchestrator: Arc<RwLock<Orchestrator>>,
    pub bi: BusinessIntelligence,
}

/// Register the dashboard API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // System APIs
            .route("/health", web::get().to(handlers::system::get_health))
            .route("/components", web::get().to(handlers::system::get_components))
            .route("/metrics", web::get().to(handlers::system::get_metrics))
            .route("/components/{id}/metrics", web::get().to(handlers::system::get_component_metrics))

            // Dashboard APIs
            .route("/kpis", web::get().to(handlers::dashboard::get_kpis))
            .route("/report", web::get().to(handlers::dashboard::get_daily_report))

            // Query APIs
            .route("/query", web::post().to(handlers::query::post_query))
            .route("/tasks/{component}", web::post().to(handlers::query::post_task))
    );
}

/// Start the dashboard web server on localhost
pub async fn start_web_server(state: AppState, port: u16) -> std::io::Result<()> {
    info!("Starting web server on http://127.0.0.1:{}", port);

    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::core::config::Settings;

    async fn state(tmp: &TempDir, ready: bool) -> web::Data<AppState> {
        let settings = Settings::with_root(tmp.path());
        let bi = BusinessIntelligence::new(&settings);
        let mut orchestrator = Orchestrator::new(settings);
        if ready {
            orchestrator.initialize_system().await.unwrap();
        }
        web::Data::new(AppState {
            orchestrator: Arc::new(RwLock::new(orchestrator)),
            bi,
        })
    }

    #[actix_web::test]
    async fn health_reports_orchestrator_state() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["orchestrator_state"], "ready");
        assert_eq!(body["active_components"], 3);
    }

    #[actix_web::test]
    async fn components_are_listed_sorted() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::get().uri("/api/components").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["cv_tester", "rag_engine", "reasoner"]);
        assert_eq!(body["data"][2]["status"], "Running");
    }

    #[actix_web::test]
    async fn query_endpoint_routes_by_type() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::post()
            .uri("/api/query")
            .set_json(json!({"query": "Why is there a crack in the sidewall?"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["method"], "Manufacturing Reasoner");
        assert_eq!(body["data"]["confidence"], 0.9);

        let req = test::TestRequest::post()
            .uri("/api/query")
            .set_json(json!({"query": "supplier links", "query_type": "traditional_rag"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["method"], "Demonstration Mode");
    }

    #[actix_web::test]
    async fn kpis_missing_until_tests_run() {
        let tmp = TempDir::new().unwrap();
        let data = state(&tmp, true).await;
        let app = test::init_service(
            App::new().app_data(data.clone()).configure(configure)
        ).await;

        let req = test::TestRequest::get().uri("/api/kpis").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        data.orchestrator.read().await.run_cv_tests().await.unwrap();

        let req = test::TestRequest::get().uri("/api/kpis").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["quality_metrics"]["total_tests"], 50);

        let req = test::TestRequest::get().uri("/api/report").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["executive_summary"]["quality_score"], 90.5);
    }

    #[actix_web::test]
    async fn tasks_for_unknown_components_fail() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::post()
            .uri("/api/tasks/nope")
            .set_json(json!({"description": "analyze", "parameters": {}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn metrics_summarize_components() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::get().uri("/api/metrics").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["component_highlights"].as_object().unwrap().len(), 3);

        let req = test::TestRequest::get().uri("/api/components/reasoner/metrics?limit=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/api/components/nope/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn task_queries_pass_input_validation() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        let req = test::TestRequest::post()
            .uri("/api/tasks/reasoner")
            .set_json(json!({"description": "analyze", "parameters": {"query": "'; DROP TABLE users; -- defect"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error_code"], "INVALID_INPUT");

        let log = std::fs::read_to_string(tmp.path().join("data/logs/security.json")).unwrap();
        assert!(log.contains("potential_injection"));
    }

    #[actix_web::test]
    async fn harness_tasks_reject_bad_iteration_counts() {
        let tmp = TempDir::new().unwrap();
        let app = test::init_service(
            App::new().app_data(state(&tmp, true).await).configure(configure)
        ).await;

        for iterations in [json!(0), json!(100_000_000u64), json!("many")] {
            let req = test::TestRequest::post()
                .uri("/api/tasks/cv_tester")
                .set_json(json!({"description": "benchmark", "parameters": {"iterations": iterations}}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        assert!(!tmp.path().join("data/reports/cv_test_report.json").exists());

        let req = test::TestRequest::get().uri("/api/report").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
