//! services/ad_media_service.rs
//! Acceso a la tabla `ad_media`: es el "status store" del worker.

use anyhow::{anyhow, Context, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::ad_media_model::{
    now_rfc3339, AdMediaRecord, AdMediaRow, CreateAdMediaRequest, CreateAdMediaResponse,
    ListAdMediaResponse, MediaStatus, MediaStatusCounts,
};

const SELECT_COLUMNS: &str = r#"
    id, remote_image_url, remote_video_url, local_image_url, local_video_url,
    media_status, media_retry_count, media_error, media_downloaded_at,
    created_at, updated_at
"#;

#[derive(Clone, Debug)]
pub struct AdMediaService {
    db_pool: Pool<Sqlite>,
}

impl AdMediaService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        AdMediaService { db_pool }
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Fallo al correr migraciones de ad_media")?;
        Ok(())
    }

    /// Registra un anuncio en estado "pending".
    pub async fn create_ad(&self, req: CreateAdMediaRequest) -> Result<CreateAdMediaResponse> {
        let image = normalize_url(req.remote_image_url)?;
        let video = normalize_url(req.remote_video_url)?;
        if image.is_none() && video.is_none() {
            return Err(anyhow!(
                "Se requiere remoteImageUrl o remoteVideoUrl"
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO ad_media (
                id, remote_image_url, remote_video_url,
                media_status, media_retry_count, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(&image)
        .bind(&video)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar ad_media")?;

        Ok(CreateAdMediaResponse {
            id,
            message: "Anuncio registrado, media pendiente".to_string(),
        })
    }

    pub async fn get_ad(&self, id: &str) -> Result<AdMediaRecord> {
        let row: AdMediaRow =
            sqlx::query_as(&format!("SELECT {} FROM ad_media WHERE id = ?1", SELECT_COLUMNS))
                .bind(id)
                .fetch_one(&self.db_pool)
                .await
                .context("No se encontró anuncio con ese id")?;
        row.try_into()
    }

    /// Lista anuncios con paginación (opcionalmente filtrando por estado).
    pub async fn list_ads(
        &self,
        status: Option<MediaStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<ListAdMediaResponse> {
        let page = page.max(1);
        let offset = page_offset(page, page_size)
            .ok_or_else(|| anyhow!("Página fuera de rango: page={} page_size={}", page, page_size))?;
        let status_str = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ad_media WHERE (?1 IS NULL OR media_status = ?1)",
        )
        .bind(status_str)
        .fetch_one(&self.db_pool)
        .await?;

        let rows: Vec<AdMediaRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM ad_media
            WHERE (?1 IS NULL OR media_status = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
            SELECT_COLUMNS
        ))
        .bind(status_str)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let items = rows
            .into_iter()
            .map(AdMediaRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListAdMediaResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Hasta `limit` registros pendientes, los más viejos primero.
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<AdMediaRecord>> {
        let rows: Vec<AdMediaRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM ad_media
            WHERE media_status = 'pending'
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al listar ad_media pendientes")?;

        rows.into_iter().map(AdMediaRecord::try_from).collect()
    }

    /// pending -> processing. Devuelve false si otro worker ya lo tomó.
    pub async fn claim_for_processing(&self, id: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'processing',
                updated_at = ?2
            WHERE id = ?1 AND media_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar ad_media como processing")?;

        Ok(res.rows_affected() == 1)
    }

    pub async fn mark_success(
        &self,
        id: &str,
        local_image_url: Option<&str>,
        local_video_url: Option<&str>,
    ) -> Result<()> {
        let now = now_rfc3339();
        let res = sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'success',
                local_image_url = COALESCE(?2, local_image_url),
                local_video_url = COALESCE(?3, local_video_url),
                media_error = NULL,
                media_downloaded_at = ?4,
                updated_at = ?4
            WHERE id = ?1 AND media_status = 'processing'
            "#,
        )
        .bind(id)
        .bind(local_image_url)
        .bind(local_video_url)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar ad_media como success")?;

        if res.rows_affected() != 1 {
            return Err(anyhow!("ad_media {} ya no está en processing", id));
        }
        Ok(())
    }

    /// processing -> failed, guardando el error e incrementando el contador.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'failed',
                media_error = ?2,
                media_retry_count = media_retry_count + 1,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar ad_media como failed")?;
        Ok(())
    }

    /// Devuelve a 'pending' los 'failed' que todavía no llegaron al techo de reintentos.
    pub async fn requeue_failed(&self, max_retries: i64) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'pending',
                updated_at = ?2
            WHERE media_status = 'failed' AND media_retry_count < ?1
            "#,
        )
        .bind(max_retries)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al reencolar ad_media fallidos")?;
        Ok(res.rows_affected())
    }

    /// Reintento manual de un registro 'failed' (ignora el techo).
    pub async fn requeue_ad(&self, id: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'pending',
                updated_at = ?2
            WHERE id = ?1 AND media_status = 'failed'
            "#,
        )
        .bind(id)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al reencolar ad_media")?;
        Ok(res.rows_affected() == 1)
    }

    /// Al arrancar: lo que quedó en 'processing' (proceso caído a mitad de batch) vuelve a 'pending'.
    pub async fn recover_stuck_processing(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE ad_media
            SET media_status = 'pending',
                updated_at = ?1
            WHERE media_status = 'processing'
            "#,
        )
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al recuperar ad_media en processing")?;
        Ok(res.rows_affected())
    }

    pub async fn count_by_status(&self) -> Result<MediaStatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT media_status, COUNT(*) FROM ad_media GROUP BY media_status",
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al contar ad_media por estado")?;

        let mut counts = MediaStatusCounts::default();
        for (status, n) in rows {
            match status.parse::<MediaStatus>() {
                Ok(MediaStatus::Pending) => counts.pending = n,
                Ok(MediaStatus::Processing) => counts.processing = n,
                Ok(MediaStatus::Success) => counts.success = n,
                Ok(MediaStatus::Failed) => counts.failed = n,
                Err(e) => log::warn!("(count_by_status) {}", e),
            }
        }
        Ok(counts)
    }
}

/// OFFSET de SQL para la página pedida; None si no entra en un i64.
pub fn page_offset(page: u64, page_size: u64) -> Option<i64> {
    page.max(1)
        .checked_sub(1)?
        .checked_mul(page_size)
        .and_then(|o| i64::try_from(o).ok())
}

/// Vacíos cuentan como ausentes; lo demás tiene que ser http(s) absoluto.
fn normalize_url(url: Option<String>) -> Result<Option<String>> {
    let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let parsed = reqwest::Url::parse(&url).with_context(|| format!("URL inválida: {}", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(Some(url)),
        other => Err(anyhow!("Esquema no soportado '{}' en {}", other, url)),
    }
}
