use actix_web::{web, HttpResponse, Responder};

use crate::web::server::AppState;
use crate::web::models::{ComponentInfoResponse, ErrorResponse, GenericResponse, HealthResponse, HistoryQuery};

/// Get the overall system status
pub async fn get_health(data: web::Data<AppState>) -> impl Responder {
    let orchestrator = data.orchestrator.read().await;
    let status = orchestrator.get_status();

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        orchestrator_state: status.state.as_str().to_string(),
        active_components: status.active_components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        errors: status.errors.clone(),
    })
}

/// Get information about all components
pub async fn get_components(data: web::Data<AppState>) -> impl Responder {
    let orchestrator = data.orchestrator.read().await;

    let mut components = Vec::new();
    for instance in orchestrator.get_all_instances().values() {
        let component = instance.read().await;
        components.push(ComponentInfoResponse {
            id: component.id().to_string(),
            component_type: component.component_type().to_string(),
            status: component.status().to_string(),
            info: component.get_info(),
        });
    }
    components.sort_by(|a, b| a.id.cmp(&b.id));

    HttpResponse::Ok().json(GenericResponse::ok(components))
}

/// Collect fresh metrics and return the system summary
pub async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let metrics = {
        let orchestrator = data.orchestrator.read().await;
        orchestrator.collect_metrics().await;
        orchestrator.metrics()
    };

    HttpResponse::Ok().json(GenericResponse::ok(metrics.get_system_summary().await))
}

/// Metric history for one component
pub async fn get_component_metrics(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let component_id = path.into_inner();
    let metrics = data.orchestrator.read().await.metrics();

    if metrics.get_latest_component_metrics(&component_id).await.is_none() {
        return HttpResponse::NotFound().json(ErrorResponse::new(
            format!("No metrics for component: {}", component_id),
            "NOT_FOUND",
        ));
    }

    HttpResponse::Ok().json(GenericResponse::ok(
        metrics.get_component_history(&component_id, query.limit).await,
    ))
}
