//! services/scheduler_service.rs
//! Scheduler periódico del worker de media. Se construye una sola vez en main
//! y se comparte con los handlers vía `web::Data`.

use anyhow::{anyhow, Result};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{watch, Mutex, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    models::worker_model::{BatchOutcome, BatchReport, WorkerHealthResponse, WorkerStatusResponse},
    services::media_worker_service::MediaWorkerService,
};

#[derive(Clone)]
pub struct MediaWorkerScheduler {
    worker: MediaWorkerService,
    state: Arc<Mutex<SchedulerState>>,
    stats: Arc<RwLock<RunStats>>,
}

#[derive(Default)]
struct SchedulerState {
    task: Option<RunningTask>,
    /// Tasks detenidos que pueden estar terminando un batch
    draining: Vec<JoinHandle<()>>,
}

struct RunningTask {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
    interval_minutes: f64,
    batch_size: i64,
}

#[derive(Default)]
struct RunStats {
    runs: u64,
    last_report: Option<BatchReport>,
    last_error: Option<String>,
}

impl MediaWorkerScheduler {
    pub fn new(worker: MediaWorkerService) -> Self {
        Self {
            worker,
            state: Arc::new(Mutex::new(SchedulerState::default())),
            stats: Arc::new(RwLock::new(RunStats::default())),
        }
    }

    pub fn worker(&self) -> &MediaWorkerService {
        &self.worker
    }

    /// Arranca el loop: un tick inmediato y luego cada `interval_minutes`.
    /// Si ya está corriendo no crea otro timer.
    pub async fn start(&self, interval_minutes: f64, batch_size: i64) -> Result<WorkerStatusResponse> {
        if !interval_minutes.is_finite() || interval_minutes <= 0.0 {
            return Err(anyhow!(
                "intervalMinutes debe ser un número > 0 (recibido {})",
                interval_minutes
            ));
        }
        if batch_size <= 0 {
            return Err(anyhow!("batchSize debe ser > 0 (recibido {})", batch_size));
        }

        let mut state = self.state.lock().await;
        state.draining.retain(|h| !h.is_finished());

        let already_running = match &state.task {
            Some(task) if !task.handle.is_finished() => true,
            Some(_) => {
                log::warn!("(start) El task anterior había terminado inesperadamente, se reemplaza");
                false
            }
            None => false,
        };
        if already_running {
            log::info!("(start) El scheduler ya estaba corriendo");
            drop(state);
            let mut status = self.status().await;
            status.already_running = true;
            return Ok(status);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let period = Duration::try_from_secs_f64(interval_minutes * 60.0)
            .map_err(|_| anyhow!("intervalMinutes fuera de rango: {}", interval_minutes))?
            .max(Duration::from_millis(1));
        let handle = tokio::spawn(run_loop(
            self.worker.clone(),
            self.stats.clone(),
            period,
            batch_size,
            stop_rx,
        ));

        log::info!(
            "(start) Scheduler iniciado: cada {} min, batch_size={}",
            interval_minutes,
            batch_size
        );
        state.task = Some(RunningTask {
            handle,
            stop_tx,
            interval_minutes,
            batch_size,
        });
        drop(state);

        Ok(self.status().await)
    }

    /// Detiene los ticks futuros. Un batch en curso no se interrumpe.
    pub async fn stop(&self) -> WorkerStatusResponse {
        let mut state = self.state.lock().await;
        if let Some(task) = state.task.take() {
            let _ = task.stop_tx.send(true);
            state.draining.push(task.handle);
            log::info!("(stop) Scheduler detenido");
        } else {
            log::info!("(stop) El scheduler no estaba corriendo");
        }
        drop(state);
        self.status().await
    }

    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        state
            .task
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn status(&self) -> WorkerStatusResponse {
        let (running, interval_minutes, batch_size) = {
            let state = self.state.lock().await;
            match &state.task {
                Some(t) => (
                    !t.handle.is_finished(),
                    Some(t.interval_minutes),
                    Some(t.batch_size),
                ),
                None => (false, None, None),
            }
        };

        let counts = match self.worker.ad_service().count_by_status().await {
            Ok(c) => Some(c),
            Err(e) => {
                log::error!("(status) No se pudo contar ad_media: {:?}", e);
                None
            }
        };

        let stats = self.stats.read().await;
        WorkerStatusResponse {
            running,
            already_running: false,
            busy: self.worker.is_busy(),
            interval_minutes,
            batch_size,
            runs: stats.runs,
            last_report: stats.last_report.clone(),
            last_error: stats.last_error.clone(),
            counts,
        }
    }

    /// No sano si el estado dice "corriendo" pero el task supervisado ya terminó.
    pub async fn health(&self) -> WorkerHealthResponse {
        let state = self.state.lock().await;
        match &state.task {
            Some(t) if t.handle.is_finished() => WorkerHealthResponse {
                healthy: false,
                running: false,
                message: Some("El task del scheduler terminó inesperadamente".to_string()),
            },
            Some(_) => WorkerHealthResponse {
                healthy: true,
                running: true,
                message: None,
            },
            None => WorkerHealthResponse {
                healthy: true,
                running: false,
                message: None,
            },
        }
    }

    /// Mata el task sin pasar por `stop`, dejando el estado en "corriendo".
    #[cfg(test)]
    pub(crate) async fn abort_task(&self) {
        let state = self.state.lock().await;
        if let Some(task) = &state.task {
            task.handle.abort();
            while !task.handle.is_finished() {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Para el scheduler y espera a que termine el batch en curso.
    pub async fn shutdown(&self) {
        let handles = {
            let mut state = self.state.lock().await;
            let mut handles: Vec<JoinHandle<()>> = state.draining.drain(..).collect();
            if let Some(task) = state.task.take() {
                let _ = task.stop_tx.send(true);
                handles.push(task.handle);
            }
            handles
        };

        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("(shutdown) El task del scheduler terminó con error: {:?}", e);
            }
        }
        log::info!("(shutdown) Scheduler apagado");
    }
}

async fn run_loop(
    worker: MediaWorkerService,
    stats: Arc<RwLock<RunStats>>,
    period: Duration,
    batch_size: i64,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // Solo se escucha la señal de stop mientras se espera el tick
        tokio::select! {
            _ = ticker.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }
        if *stop_rx.borrow() {
            break;
        }

        let result = worker.run_scheduled_tick(batch_size).await;

        let mut stats = stats.write().await;
        match result {
            Ok(BatchOutcome::Completed(report)) => {
                stats.runs += 1;
                stats.last_report = Some(report);
                stats.last_error = None;
            }
            Ok(BatchOutcome::Skipped) => {}
            Err(e) => {
                log::error!("(run_loop) Error en el batch: {:?}", e);
                stats.runs += 1;
                stats.last_error = Some(format!("{:#}", e));
            }
        }
    }
    log::info!("(run_loop) Loop del scheduler finalizado");
}
