//! handlers/mod.rs
//! Módulo que agrupa los handlers HTTP (worker de media y anuncios).
pub mod ad_media_handler;
pub mod media_worker_handler;
