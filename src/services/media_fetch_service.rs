//! services/media_fetch_service.rs
//! Descarga de imágenes/videos remotos (CDNs de anuncios) por HTTP.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

/// Algunos CDNs rechazan clientes sin User-Agent de navegador
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum MediaFetchError {
    #[error("Error de red descargando {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timeout descargando {0}")]
    Timeout(String),

    #[error("HTTP {status} descargando {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Content-Type no es media: {0}")]
    InvalidContentType(String),

    #[error("Respuesta vacía (0 bytes)")]
    EmptyPayload,

    #[error("Archivo demasiado grande: más de {0} bytes")]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub data: Bytes,
    pub content_type: String,
    pub extension: String,
}

#[derive(Clone, Debug)]
pub struct MediaFetcher {
    http_client: Client,
    max_bytes: usize,
}

impl MediaFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            max_bytes,
        })
    }

    /// GET a la URL, validando status, content-type, tamaño y que no venga vacío.
    pub async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaFetchError> {
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MediaFetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(normalize_content_type)
            .unwrap_or_default();
        if !is_media_content_type(&content_type) {
            let shown = if content_type.is_empty() {
                "(sin content-type)".to_string()
            } else {
                content_type
            };
            return Err(MediaFetchError::InvalidContentType(shown));
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes as u64 {
                return Err(MediaFetchError::TooLarge(self.max_bytes));
            }
        }

        let mut buf = BytesMut::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| request_error(url, e))?;
            if buf.len() + chunk.len() > self.max_bytes {
                return Err(MediaFetchError::TooLarge(self.max_bytes));
            }
            buf.extend_from_slice(&chunk);
        }

        if buf.is_empty() {
            return Err(MediaFetchError::EmptyPayload);
        }

        let extension = extension_for(&content_type, url);
        Ok(FetchedMedia {
            data: buf.freeze(),
            content_type,
            extension,
        })
    }
}

fn request_error(url: &str, e: reqwest::Error) -> MediaFetchError {
    if e.is_timeout() {
        MediaFetchError::Timeout(url.to_string())
    } else {
        MediaFetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// "Image/JPEG; charset=binary" -> "image/jpeg"
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_media_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type.starts_with("video/")
}

/// Extensión a partir del content-type; si no se reconoce, la del path de la URL; si no, "bin".
pub fn extension_for(content_type: &str, url: &str) -> String {
    let known = match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/svg+xml" => Some("svg"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.last()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            let valid = !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then_some(ext)
        })
        .unwrap_or_else(|| "bin".to_string())
}
