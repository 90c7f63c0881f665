//! handlers/ad_media_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::ad_media_model::{CreateAdMediaRequest, MediaStatus};
use crate::services::ad_media_service::{page_offset, AdMediaService};

#[derive(Deserialize)]
pub struct ListAdsQuery {
    page: Option<u64>,
    page_size: Option<u64>,
    status: Option<MediaStatus>,
}

/// POST /api/ads
pub async fn create_ad_endpoint(
    ad_service: web::Data<AdMediaService>,
    body: web::Json<CreateAdMediaRequest>,
) -> HttpResponse {
    match ad_service.create_ad(body.into_inner()).await {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "error": "Anuncio inválido",
            "details": format!("{:#}", e)
        })),
    }
}

/// GET /api/ads
pub async fn list_ads_endpoint(
    ad_service: web::Data<AdMediaService>,
    query: web::Query<ListAdsQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10).clamp(1, 100);
    if page_offset(page, page_size).is_none() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Parámetros inválidos",
            "details": format!("page={} fuera de rango", page)
        }));
    }

    match ad_service.list_ads(query.status, page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/ads/{id}
pub async fn get_ad_endpoint(
    ad_service: web::Data<AdMediaService>,
    path: web::Path<String>,
) -> HttpResponse {
    let ad_id = path.into_inner();

    match ad_service.get_ad(&ad_id).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => HttpResponse::NotFound().json(json!({
            "error": "Anuncio no encontrado",
            "details": format!("{:?}", e)
        })),
    }
}

/// POST /api/ads/{id}/retry
/// Reintento manual: vuelve a 'pending' un registro 'failed'.
pub async fn retry_ad_endpoint(
    ad_service: web::Data<AdMediaService>,
    path: web::Path<String>,
) -> HttpResponse {
    let ad_id = path.into_inner();

    match ad_service.requeue_ad(&ad_id).await {
        Ok(true) => HttpResponse::Ok().json(json!({
            "id": ad_id,
            "message": "Anuncio reencolado"
        })),
        Ok(false) => HttpResponse::Conflict().json(json!({
            "error": "Solo se pueden reintentar anuncios en estado 'failed'",
            "id": ad_id
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}
