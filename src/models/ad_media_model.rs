//! models/ad_media_model.rs
//! Registro de anuncio + estado de la descarga de su media.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Processing => "processing",
            MediaStatus::Success => "success",
            MediaStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MediaStatus::Pending),
            "processing" => Ok(MediaStatus::Processing),
            "success" => Ok(MediaStatus::Success),
            "failed" => Ok(MediaStatus::Failed),
            other => Err(anyhow::anyhow!("media_status desconocido: {}", other)),
        }
    }
}

/// Fila tal cual sale de SQLite (fechas como texto RFC 3339).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdMediaRow {
    pub id: String,
    pub remote_image_url: Option<String>,
    pub remote_video_url: Option<String>,
    pub local_image_url: Option<String>,
    pub local_video_url: Option<String>,
    pub media_status: String,
    pub media_retry_count: i64,
    pub media_error: Option<String>,
    pub media_downloaded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdMediaRecord {
    pub id: String,
    pub remote_image_url: Option<String>,
    pub remote_video_url: Option<String>,
    pub local_image_url: Option<String>,
    pub local_video_url: Option<String>,
    pub media_status: MediaStatus,
    pub media_retry_count: i64,
    pub media_error: Option<String>,
    pub media_downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AdMediaRow> for AdMediaRecord {
    type Error = anyhow::Error;

    fn try_from(row: AdMediaRow) -> Result<Self, Self::Error> {
        let downloaded_at = match row.media_downloaded_at {
            Some(ts) => Some(ts.parse::<DateTime<Utc>>()?),
            None => None,
        };
        Ok(AdMediaRecord {
            id: row.id,
            remote_image_url: row.remote_image_url,
            remote_video_url: row.remote_video_url,
            local_image_url: row.local_image_url,
            local_video_url: row.local_video_url,
            media_status: row.media_status.parse()?,
            media_retry_count: row.media_retry_count,
            media_error: row.media_error,
            media_downloaded_at: downloaded_at,
            created_at: row.created_at.parse()?,
            updated_at: row.updated_at.parse()?,
        })
    }
}

/// Request para registrar un anuncio cuya media hay que descargar
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdMediaRequest {
    #[serde(alias = "remote_image_url")]
    pub remote_image_url: Option<String>,
    #[serde(alias = "remote_video_url")]
    pub remote_video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAdMediaResponse {
    pub id: String,
    pub message: String,
}

/// Para listar anuncios con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListAdMediaResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<AdMediaRecord>,
}

/// Conteo de registros por estado
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaStatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub success: i64,
    pub failed: i64,
}

/// Timestamp en texto con precisión fija, así el orden lexicográfico
/// en SQLite coincide con el cronológico.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
