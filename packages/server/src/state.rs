use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::{BlobStore, PathAllocator};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::documents::{DocumentService, MetadataStore, RemoteFetcher, SeaOrmMetadataStore};
use crate::health::HealthReporter;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub documents: Arc<DocumentService>,
    pub health: Arc<HealthReporter>,
}

impl AppState {
    /// Wire the repository on disk and the metadata store into the services.
    pub async fn build(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let storage = &config.storage;
        let blobs: Arc<dyn BlobStore> = Arc::new(
            FilesystemBlobStore::new(storage.repository_path.clone(), storage.max_upload_size)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open repository at {}",
                        storage.repository_path.display()
                    )
                })?,
        );
        let metadata: Arc<dyn MetadataStore> = Arc::new(SeaOrmMetadataStore::new(db));
        let fetcher = RemoteFetcher::new(Duration::from_secs(storage.fetch_timeout_secs))
            .context("Failed to build HTTP client")?;

        let documents = DocumentService::new(
            PathAllocator::new(storage.repository_path.clone()),
            blobs,
            metadata.clone(),
            fetcher,
        );
        let health = HealthReporter::new(
            config.health.clone(),
            storage.repository_path.clone(),
            metadata,
        );

        Ok(Self {
            config,
            documents: Arc::new(documents),
            health: Arc::new(health),
        })
    }
}
