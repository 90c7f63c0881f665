//! handlers/media_worker_handler.rs
//! Control del scheduler del worker de media (start / stop / status / run).

use actix_web::{web, HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::worker_config::WorkerConfig;
use crate::models::worker_model::{RunBatchRequest, StartWorkerRequest};
use crate::services::scheduler_service::MediaWorkerScheduler;

/// Body vacío -> defaults; body presente pero inválido -> error.
fn parse_optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> serde_json::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
}

fn invalid_body(e: serde_json::Error) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "error": "Body JSON inválido",
        "details": e.to_string()
    }))
}

/// POST /api/media-worker
pub async fn start_worker_endpoint(
    scheduler: web::Data<MediaWorkerScheduler>,
    config: web::Data<WorkerConfig>,
    body: web::Bytes,
) -> HttpResponse {
    let req: StartWorkerRequest = match parse_optional_body(&body) {
        Ok(req) => req,
        Err(e) => return invalid_body(e),
    };
    let interval = req.interval_minutes.unwrap_or(config.interval_minutes);
    let batch_size = req.batch_size.unwrap_or(config.batch_size);

    if !interval.is_finite() || interval <= 0.0 || batch_size <= 0 {
        return HttpResponse::BadRequest().json(json!({
            "error": "Parámetros inválidos",
            "details": "intervalMinutes y batchSize deben ser > 0"
        }));
    }

    match scheduler.start(interval, batch_size).await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => {
            log::error!("(start_worker_endpoint) {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "No se pudo iniciar el worker",
                "details": format!("{:?}", e)
            }))
        }
    }
}

/// DELETE /api/media-worker
pub async fn stop_worker_endpoint(scheduler: web::Data<MediaWorkerScheduler>) -> HttpResponse {
    HttpResponse::Ok().json(scheduler.stop().await)
}

/// GET /api/media-worker
pub async fn worker_status_endpoint(scheduler: web::Data<MediaWorkerScheduler>) -> HttpResponse {
    HttpResponse::Ok().json(scheduler.status().await)
}

/// GET /api/media-worker/health
pub async fn worker_health_endpoint(scheduler: web::Data<MediaWorkerScheduler>) -> HttpResponse {
    let health = scheduler.health().await;
    if health.healthy {
        HttpResponse::Ok().json(health)
    } else {
        HttpResponse::ServiceUnavailable().json(health)
    }
}

/// POST /api/media-worker/run
/// Ejecuta un batch una sola vez (sin scheduler).
pub async fn run_batch_endpoint(
    scheduler: web::Data<MediaWorkerScheduler>,
    config: web::Data<WorkerConfig>,
    body: web::Bytes,
) -> HttpResponse {
    let req: RunBatchRequest = match parse_optional_body(&body) {
        Ok(req) => req,
        Err(e) => return invalid_body(e),
    };
    let batch_size = req.batch_size.unwrap_or(config.batch_size);
    if batch_size <= 0 {
        return HttpResponse::BadRequest().json(json!({
            "error": "Parámetros inválidos",
            "details": "batchSize debe ser > 0"
        }));
    }

    match scheduler.worker().process_pending_batch(batch_size).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            log::error!("(run_batch_endpoint) {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error",
                "details": format!("{:?}", e)
            }))
        }
    }
}
