//! config/worker_config.rs
//! Configuración del worker de media (batch, intervalo, storage, servidor).
//! Los valores salen de variables de entorno (.env) con defaults razonables.

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,

    pub batch_size: i64,        // registros por batch
    pub interval_minutes: f64,  // cada cuánto corre el scheduler
    pub fetch_timeout_secs: u64,
    pub max_download_bytes: usize,
    pub max_retries: i64,       // techo de reintentos automáticos
    pub auto_requeue: bool,     // devolver 'failed' a 'pending' en cada tick
    pub autostart: bool,        // arrancar el scheduler al levantar el proceso

    pub storage_dir: String,
    pub public_base_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            database_url: "sqlite:data/ad_media.db?mode=rwc".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 5022,
            batch_size: 5,
            interval_minutes: 2.0,
            fetch_timeout_secs: 30,
            max_download_bytes: 100 * 1024 * 1024,
            max_retries: 3,
            auto_requeue: true,
            autostart: false,
            storage_dir: "./files/media".to_string(),
            public_base_url: "http://localhost:5022/media".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Lee la configuración del entorno. Lo que no esté definido (o no parsee)
    /// queda con el valor por defecto.
    pub fn from_env() -> Self {
        let d = WorkerConfig::default();
        WorkerConfig {
            database_url: env::var("DATABASE_URL").unwrap_or(d.database_url),
            server_host: env::var("SERVER_HOST").unwrap_or(d.server_host),
            server_port: env_or("SERVER_PORT", d.server_port),
            batch_size: env_or("MEDIA_WORKER_BATCH_SIZE", d.batch_size),
            interval_minutes: env_or("MEDIA_WORKER_INTERVAL_MINUTES", d.interval_minutes),
            fetch_timeout_secs: env_or("MEDIA_WORKER_FETCH_TIMEOUT_SECS", d.fetch_timeout_secs),
            max_download_bytes: env_or("MEDIA_WORKER_MAX_DOWNLOAD_BYTES", d.max_download_bytes),
            max_retries: env_or("MEDIA_WORKER_MAX_RETRIES", d.max_retries),
            auto_requeue: env_or("MEDIA_WORKER_AUTO_REQUEUE", d.auto_requeue),
            autostart: env_or("MEDIA_WORKER_AUTOSTART", d.autostart),
            storage_dir: env::var("MEDIA_STORAGE_DIR").unwrap_or(d.storage_dir),
            public_base_url: env::var("MEDIA_PUBLIC_BASE_URL").unwrap_or(d.public_base_url),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Valor inválido para {}='{}', usando default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
