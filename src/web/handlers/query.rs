use actix_web::{web, HttpResponse, Responder};
use log::{info, error};

use crate::core::component::{ComponentError, ComponentTask};
use crate::core::security::DEFAULT_MAX_INPUT_LENGTH;
use crate::web::server::AppState;
use crate::web::models::{ErrorResponse, GenericResponse, QueryRequest, TaskRequest};

/// Route a query through the orchestrator
pub async fn post_query(
    data: web::Data<AppState>,
    request: web::Json<QueryRequest>,
) -> impl Responder {
    let mut orchestrator = data.orchestrator.write().await;
    let outcome = orchestrator.process_query(&request.query, request.query_type).await;
    info!("Query answered via {} ({:?})", outcome.method, outcome.status);

    HttpResponse::Ok().json(GenericResponse::ok(outcome))
}

/// Submit a raw task to one component
pub async fn post_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<TaskRequest>,
) -> impl Responder {
    let component_id = path.into_inner();
    let mut orchestrator = data.orchestrator.write().await;

    if !orchestrator.security().validate_input(&request.description, DEFAULT_MAX_INPUT_LENGTH) {
        return HttpResponse::BadRequest().json(ErrorResponse::new("Invalid input detected", "INVALID_INPUT"));
    }

    let task = ComponentTask::new(&request.description, request.parameters.clone());
    match orchestrator.submit_task(&component_id, task).await {
        Ok(result) => HttpResponse::Ok().json(GenericResponse::ok(result)),
        Err(ComponentError::ValidationError(msg)) => {
            HttpResponse::BadRequest().json(ErrorResponse::new(msg, "INVALID_INPUT"))
        }
        Err(e) => {
            error!("Task for {} failed: {}", component_id, e);
            HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string(), "TASK_FAILED"))
        }
    }
}
