//! services/media_worker_service.rs
//! Worker de media pendiente: toma registros 'pending', descarga la media remota,
//! la sube al object store y deja el registro en 'success' o 'failed'.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    models::{
        ad_media_model::AdMediaRecord,
        worker_model::{BatchOutcome, BatchReport},
    },
    services::{
        ad_media_service::AdMediaService,
        media_fetch_service::MediaFetcher,
        storage_service::{ObjectStore, StoredObject},
    },
};

const IMAGES_FOLDER: &str = "images";
const VIDEOS_FOLDER: &str = "videos";

#[derive(Clone)]
pub struct MediaWorkerService {
    ad_service: AdMediaService,
    fetcher: MediaFetcher,
    store: Arc<dyn ObjectStore>,
    max_retries: i64,
    auto_requeue: bool,
    busy: Arc<AtomicBool>,
}

enum RecordResult {
    Success,
    Failed,
    NotClaimed,
}

impl MediaWorkerService {
    pub fn new(
        ad_service: AdMediaService,
        fetcher: MediaFetcher,
        store: Arc<dyn ObjectStore>,
        max_retries: i64,
        auto_requeue: bool,
    ) -> Self {
        Self {
            ad_service,
            fetcher,
            store,
            max_retries,
            auto_requeue,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ad_service(&self) -> &AdMediaService {
        &self.ad_service
    }

    /// Hay un batch corriendo en este proceso
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Lo que corre el scheduler en cada tick: reencola fallidos bajo el techo
    /// de reintentos (si está habilitado) y procesa un batch.
    pub async fn run_scheduled_tick(&self, batch_size: i64) -> Result<BatchOutcome> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            log::warn!("(run_scheduled_tick) Ya hay un batch en curso, se salta este tick");
            return Ok(BatchOutcome::Skipped);
        };

        let requeued = if self.auto_requeue {
            let n = self.ad_service.requeue_failed(self.max_retries).await?;
            if n > 0 {
                log::info!("(run_scheduled_tick) {} registros failed devueltos a pending", n);
            }
            n
        } else {
            0
        };

        let mut report = self.run_batch(batch_size).await?;
        report.requeued = requeued;
        Ok(BatchOutcome::Completed(report))
    }

    /// Procesa hasta `batch_size` registros pendientes. Si ya hay otro batch en
    /// curso en este proceso, no hace nada y devuelve `Skipped`.
    pub async fn process_pending_batch(&self, batch_size: i64) -> Result<BatchOutcome> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            log::warn!("(process_pending_batch) Ya hay un batch en curso, se omite");
            return Ok(BatchOutcome::Skipped);
        };
        Ok(BatchOutcome::Completed(self.run_batch(batch_size).await?))
    }

    async fn run_batch(&self, batch_size: i64) -> Result<BatchReport> {
        if batch_size <= 0 {
            return Err(anyhow!("batch_size debe ser > 0 (recibido {})", batch_size));
        }
        let started_at = Utc::now();

        let pending = self.ad_service.list_pending(batch_size).await?;
        log::info!(
            "(process_pending_batch) {} registros pendientes (batch_size={})",
            pending.len(),
            batch_size
        );

        let mut report = BatchReport {
            started_at,
            finished_at: started_at,
            requeued: 0,
            selected: pending.len(),
            succeeded: 0,
            failed: 0,
            skipped_claims: 0,
        };

        for record in pending {
            // Un registro que falla no corta el batch
            match self.process_record(&record).await {
                Ok(RecordResult::Success) => report.succeeded += 1,
                Ok(RecordResult::Failed) => report.failed += 1,
                Ok(RecordResult::NotClaimed) => report.skipped_claims += 1,
                Err(e) => {
                    log::error!(
                        "(process_pending_batch) Error de base de datos con ad {}: {:?}",
                        record.id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report.finished_at = Utc::now();
        log::info!(
            "(process_pending_batch) Batch terminado: selected={} success={} failed={} skipped={} en {}ms",
            report.selected,
            report.succeeded,
            report.failed,
            report.skipped_claims,
            (report.finished_at - report.started_at).num_milliseconds()
        );
        Ok(report)
    }

    async fn process_record(&self, record: &AdMediaRecord) -> Result<RecordResult> {
        // 1) pending -> processing (re-lee el estado en la misma escritura)
        if !self.ad_service.claim_for_processing(&record.id).await? {
            log::info!(
                "(process_record) ad {} ya no está pending, otro worker lo tomó",
                record.id
            );
            return Ok(RecordResult::NotClaimed);
        }

        // 2) Descargar y subir cada media presente
        let mut uploaded: Vec<StoredObject> = Vec::new();
        let outcome = self.transfer_all(record, &mut uploaded).await;

        // 3) Guardar resultado
        let error = match outcome {
            Ok((image, video)) => {
                match self
                    .ad_service
                    .mark_success(
                        &record.id,
                        image.as_ref().map(|o| o.public_url.as_str()),
                        video.as_ref().map(|o| o.public_url.as_str()),
                    )
                    .await
                {
                    Ok(()) => {
                        log::info!("(process_record) ad {} -> success", record.id);
                        return Ok(RecordResult::Success);
                    }
                    Err(e) => format!("Error guardando resultado: {:#}", e),
                }
            }
            Err(msg) => msg,
        };

        // Los archivos ya subidos quedarían huérfanos: se borran
        self.cleanup_uploaded(&uploaded).await;

        log::warn!("(process_record) ad {} -> failed: {}", record.id, error);
        self.ad_service.mark_failed(&record.id, &error).await?;
        Ok(RecordResult::Failed)
    }

    async fn transfer_all(
        &self,
        record: &AdMediaRecord,
        uploaded: &mut Vec<StoredObject>,
    ) -> Result<(Option<StoredObject>, Option<StoredObject>), String> {
        if record.remote_image_url.is_none() && record.remote_video_url.is_none() {
            return Err("El registro no tiene URL de imagen ni de video".to_string());
        }

        let mut image = None;
        if let Some(url) = &record.remote_image_url {
            let obj = self.transfer_one(url, IMAGES_FOLDER).await?;
            uploaded.push(obj.clone());
            image = Some(obj);
        }

        let mut video = None;
        if let Some(url) = &record.remote_video_url {
            let obj = self.transfer_one(url, VIDEOS_FOLDER).await?;
            uploaded.push(obj.clone());
            video = Some(obj);
        }

        Ok((image, video))
    }

    async fn transfer_one(&self, url: &str, folder: &str) -> Result<StoredObject, String> {
        let media = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| e.to_string())?;

        log::info!(
            "(transfer_one) Descargado {} ({} bytes, {})",
            url,
            media.data.len(),
            media.content_type
        );

        self.store
            .upload(folder, &media.content_type, &media.extension, media.data)
            .await
            .map_err(|e| format!("Error subiendo a storage: {:#}", e))
    }

    async fn cleanup_uploaded(&self, uploaded: &[StoredObject]) {
        for obj in uploaded {
            if let Err(e) = self.store.delete(&obj.key).await {
                log::error!("(cleanup_uploaded) No se pudo borrar {}: {:?}", obj.key, e);
            }
        }
    }
}

/// Marca el worker como ocupado mientras vive; lo libera al salir de scope.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
