//! config/mod.rs
//! Configuración global del servicio.

pub mod worker_config;
