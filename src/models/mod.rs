//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod ad_media_model;
pub mod worker_model;
