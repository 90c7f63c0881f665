//! models/worker_model.rs
//! Requests/responses del endpoint de control del worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ad_media_model::MediaStatusCounts;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkerRequest {
    #[serde(alias = "interval_minutes")]
    pub interval_minutes: Option<f64>,
    #[serde(alias = "batch_size")]
    pub batch_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBatchRequest {
    #[serde(alias = "batch_size")]
    pub batch_size: Option<i64>,
}

/// Resumen de una ejecución del batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requeued: u64,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Registros que otro worker reclamó antes que nosotros
    pub skipped_claims: usize,
}

/// Resultado de pedir un batch: o corrió, o se saltó porque ya había uno en curso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum BatchOutcome {
    Completed(BatchReport),
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatusResponse {
    pub running: bool,
    pub already_running: bool,
    pub busy: bool,
    pub interval_minutes: Option<f64>,
    pub batch_size: Option<i64>,
    pub runs: u64,
    pub last_report: Option<BatchReport>,
    pub last_error: Option<String>,
    pub counts: Option<MediaStatusCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealthResponse {
    pub healthy: bool,
    pub running: bool,
    pub message: Option<String>,
}
