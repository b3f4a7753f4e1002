use clap::Parser;
use content_backend::build_router;
use content_backend::config::{ServerConfig, StorageKind};
use content_backend::index::lifecycle::{IndexLifecycleManager, RotationOutcome};
use content_backend::search::elastic::ElasticSearchEngine;
use content_backend::storage::facade::{ComposedStorage, StorageFacade};
use content_backend::storage::fs::{FsBlobStore, FsDocumentStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    tracing::info!("Starting content backend with {:?} storage", config.storage);

    // 1. Storage tier:
    let storage: Arc<dyn StorageFacade> = match config.storage {
        StorageKind::Memory => Arc::new(ComposedStorage::in_memory()),
        StorageKind::Distributed => {
            tracing::info!(
                "Data directory {}, search engine {}",
                config.data_dir.display(),
                config.elastic_url
            );
            Arc::new(ComposedStorage::new(
                Arc::new(FsDocumentStore::new(config.data_dir.join("documents"))),
                Arc::new(FsBlobStore::new(config.data_dir.join("blobs"))),
                Arc::new(ElasticSearchEngine::new(&config.elastic_url)),
            ))
        }
    };

    // 2. Make sure writes have a generation to land in:
    match IndexLifecycleManager::new(storage.clone())
        .ensure_active()
        .await?
    {
        Some(RotationOutcome::Rotated { generation, .. }) => {
            tracing::info!("Bootstrapped index generation {}", generation.name)
        }
        Some(RotationOutcome::AlreadyRunning) => {
            tracing::warn!("Another process is building the first index generation")
        }
        None => tracing::info!("Active index generation found"),
    }

    // 3. HTTP router:
    let app = build_router(
        storage,
        config.ingest_settings(),
        config.max_upload_bytes(),
    );

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
