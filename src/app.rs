//! app.rs
use crate::handlers::{ad_media_handler, media_worker_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/media-worker")
                    .route(
                        "",
                        web::post().to(media_worker_handler::start_worker_endpoint),
                    )
                    .route(
                        "",
                        web::delete().to(media_worker_handler::stop_worker_endpoint),
                    )
                    .route(
                        "",
                        web::get().to(media_worker_handler::worker_status_endpoint),
                    )
                    .route(
                        "/run",
                        web::post().to(media_worker_handler::run_batch_endpoint),
                    )
                    .route(
                        "/health",
                        web::get().to(media_worker_handler::worker_health_endpoint),
                    ),
            )
            .service(
                web::scope("/ads")
                    .route("", web::post().to(ad_media_handler::create_ad_endpoint))
                    .route("", web::get().to(ad_media_handler::list_ads_endpoint))
                    .route("/{id}", web::get().to(ad_media_handler::get_ad_endpoint))
                    .route(
                        "/{id}/retry",
                        web::post().to(ad_media_handler::retry_ad_endpoint),
                    ),
            ),
    );
}
