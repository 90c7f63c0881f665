//! logger.rs
//! Configuración del logger usando env_logger.

use log::LevelFilter;

/// Filtro por defecto si no hay RUST_LOG
pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn init_logger() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    build_logger(&filters).init();
}

/// sqlx loguea cada query en info: se baja a warn salvo que RUST_LOG diga
/// otra cosa para "sqlx". Lo mismo con las conexiones de reqwest/hyper.
pub fn build_logger(filters: &str) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_module("sqlx", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_filters(filters)
        .format_timestamp_secs();
    builder
}
