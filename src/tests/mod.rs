//! tests/mod.rs
//! Helpers compartidos por las pruebas: DB en memoria, storage temporal, worker.

mod handler_tests;

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

use crate::models::ad_media_model::CreateAdMediaRequest;
use crate::services::ad_media_service::AdMediaService;
use crate::services::media_fetch_service::MediaFetcher;
use crate::services::media_worker_service::MediaWorkerService;
use crate::services::storage_service::{LocalObjectStore, ObjectStore};

pub struct TestEnv {
    pub ad_service: AdMediaService,
    pub store: LocalObjectStore,
    // Mantiene vivo el directorio temporal
    pub storage_dir: TempDir,
}

/// Una sola conexión: con varias, cada una vería su propia DB en memoria.
pub async fn test_pool() -> Pool<Sqlite> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("No se pudo abrir SQLite en memoria")
}

pub async fn test_env() -> TestEnv {
    let ad_service = AdMediaService::new(test_pool().await);
    ad_service
        .run_migrations()
        .await
        .expect("Fallaron migraciones");

    let storage_dir = tempfile::tempdir().expect("No se pudo crear tempdir");
    let store = LocalObjectStore::new(storage_dir.path(), "http://localhost:5022/media")
        .await
        .expect("No se pudo crear LocalObjectStore");

    TestEnv {
        ad_service,
        store,
        storage_dir,
    }
}

pub fn test_fetcher() -> MediaFetcher {
    MediaFetcher::new(Duration::from_secs(5), 1024 * 1024).expect("No se pudo crear MediaFetcher")
}

impl TestEnv {
    pub fn worker(&self, max_retries: i64, auto_requeue: bool) -> MediaWorkerService {
        self.worker_with_store(Arc::new(self.store.clone()), max_retries, auto_requeue)
    }

    pub fn worker_with_store(
        &self,
        store: Arc<dyn ObjectStore>,
        max_retries: i64,
        auto_requeue: bool,
    ) -> MediaWorkerService {
        MediaWorkerService::new(
            self.ad_service.clone(),
            test_fetcher(),
            store,
            max_retries,
            auto_requeue,
        )
    }

    pub async fn create_image_ad(&self, url: &str) -> String {
        self.create_ad(Some(url), None).await
    }

    pub async fn create_ad(&self, image: Option<&str>, video: Option<&str>) -> String {
        self.ad_service
            .create_ad(CreateAdMediaRequest {
                remote_image_url: image.map(str::to_string),
                remote_video_url: video.map(str::to_string),
            })
            .await
            .expect("No se pudo crear anuncio")
            .id
    }

    /// Archivos guardados en una carpeta del storage
    pub fn stored_files(&self, folder: &str) -> usize {
        std::fs::read_dir(self.storage_dir.path().join(folder))
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

/// Bytes mínimos de un JPEG (solo interesa que no esté vacío)
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
pub const MP4_BYTES: &[u8] = &[0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70, 0x6D, 0x70, 0x34];
