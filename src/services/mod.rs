//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod ad_media_service;
pub mod media_fetch_service;
pub mod media_worker_service;
pub mod scheduler_service;
pub mod storage_service;
