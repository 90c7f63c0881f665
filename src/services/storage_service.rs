//! services/storage_service.rs
//! Object store donde se re-hospeda la media descargada.
//! `LocalObjectStore` escribe en disco y el servidor lo expone en /media.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Sube los bytes a `{folder}/{timestamp}_{random}.{ext}` y devuelve la URL pública.
    async fn upload(
        &self,
        folder: &str,
        content_type: &str,
        extension: &str,
        data: Bytes,
    ) -> Result<StoredObject>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// `{folder}/{timestamp_millis}_{random}.{ext}`
pub fn generate_object_key(folder: &str, extension: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}.{}",
        folder.trim_matches('/'),
        Utc::now().timestamp_millis(),
        &random[..8],
        extension
    )
}

#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub async fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .with_context(|| format!("No se pudo crear directorio de storage {:?}", base_path))?;
        Ok(Self {
            base_path,
            base_url: base_url.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.is_empty() {
            return Err(anyhow!("Key de storage inválida: {}", key));
        }
        Ok(self.base_path.join(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        folder: &str,
        _content_type: &str,
        extension: &str,
        data: Bytes,
    ) -> Result<StoredObject> {
        let key = generate_object_key(folder, extension);
        let path = self.key_to_path(&key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("No se pudo crear {:?}", path))?;
        file.write_all(&data)
            .await
            .with_context(|| format!("No se pudo escribir {:?}", path))?;
        file.sync_all().await?;

        log::info!(
            "(upload) Guardado {} ({} bytes) en {:?}",
            key,
            data.len(),
            path
        );

        Ok(StoredObject {
            public_url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("No se pudo borrar {:?}", path)),
        }
    }
}
