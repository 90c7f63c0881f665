use std::{str::FromStr, sync::Arc};

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite};

use crate::config::worker_config::WorkerConfig;
use crate::logger::init_logger;
use crate::services::ad_media_service::AdMediaService;
use crate::services::media_fetch_service::MediaFetcher;
use crate::services::media_worker_service::MediaWorkerService;
use crate::services::scheduler_service::MediaWorkerScheduler;
use crate::services::storage_service::LocalObjectStore;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(database_url: &str) -> anyhow::Result<Pool<Sqlite>> {
    // Carpeta "data" para el .db por defecto
    std::fs::create_dir_all("data").context("No se pudo crear directorio 'data'")?;

    log::info!("Conectando a SQLite en {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .context("DATABASE_URL inválida")?
        .create_if_missing(true);
    let db_pool = Pool::<Sqlite>::connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite.")?;

    Ok(db_pool)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = WorkerConfig::from_env();
    log::info!("Configuración: {:?}", config);

    // DB + migraciones
    let db_pool = setup_database(&config.database_url).await?;
    let ad_service = AdMediaService::new(db_pool.clone());
    ad_service.run_migrations().await?;

    let recovered = ad_service.recover_stuck_processing().await?;
    if recovered > 0 {
        log::warn!(
            "{} registros quedaron en 'processing' de una ejecución anterior; vuelven a 'pending'",
            recovered
        );
    }

    // Object store local + fetcher
    let store = LocalObjectStore::new(&config.storage_dir, config.public_base_url.clone()).await?;
    let fetcher = MediaFetcher::new(config.fetch_timeout(), config.max_download_bytes)?;

    let worker = MediaWorkerService::new(
        ad_service.clone(),
        fetcher,
        Arc::new(store.clone()),
        config.max_retries,
        config.auto_requeue,
    );
    let scheduler = MediaWorkerScheduler::new(worker);

    if config.autostart {
        scheduler
            .start(config.interval_minutes, config.batch_size)
            .await?;
        log::info!("Worker de media iniciado automáticamente");
    }

    let bind = (config.server_host.clone(), config.server_port);
    let media_dir = store.base_path().to_path_buf();
    let server_scheduler = scheduler.clone();
    let server_config = config.clone();

    log::info!("Levantando servidor en {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ad_service.clone()))
            .app_data(web::Data::new(server_scheduler.clone()))
            .app_data(web::Data::new(server_config.clone()))
            .configure(app::init_app)
            .service(actix_files::Files::new("/media", media_dir.clone()))
    })
    .workers(1)
    .bind(bind)?
    .run()
    .await?;

    // El servidor terminó (SIGINT/SIGTERM): esperar el batch en curso
    if scheduler.is_running().await {
        log::info!("Deteniendo worker de media...");
    }
    scheduler.shutdown().await;
    Ok(())
}
