use actix_web::{web, HttpResponse, Responder};
use log::error;

use crate::web::server::AppState;
use crate::web::models::{ErrorResponse, GenericResponse};

/// KPIs from the latest test report
pub async fn get_kpis(data: web::Data<AppState>) -> impl Responder {
    match data.bi.kpi_dashboard() {
        Ok(kpis) => HttpResponse::Ok().json(GenericResponse::ok(kpis)),
        Err(e) => HttpResponse::NotFound().json(ErrorResponse::new(e.to_string(), "NO_TEST_DATA")),
    }
}

/// Build, save and return today's report
pub async fn get_daily_report(data: web::Data<AppState>) -> impl Responder {
    match data.bi.generate_daily_report() {
        Ok((report, _)) => HttpResponse::Ok().json(GenericResponse::ok(report)),
        Err(e) => {
            error!("Failed to generate daily report: {}", e);
            HttpResponse::NotFound().json(ErrorResponse::new(e.to_string(), "REPORT_UNAVAILABLE"))
        }
    }
}
