use crate::models::{Collaboration, CollaborationStatus, DirectorySnapshot, Membership, Partner};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading the partner directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Failed to read directory file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid directory file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Read-only source of partner/collaboration/membership snapshots
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, DirectoryError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// PostgreSQL-backed directory
///
/// Only reads; the tables are owned by the record-editing application.
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    async fn fetch_partners(&self) -> Result<Vec<Partner>, DirectoryError> {
        let query = r#"
            SELECT id, name, latitude, longitude, is_visible, collaboration_status, website
            FROM partners
            ORDER BY created_at, id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Partner, DirectoryError> {
                // Missing coordinates become NaN so the visibility filter drops them
                let latitude: Option<f64> = row.try_get("latitude")?;
                let longitude: Option<f64> = row.try_get("longitude")?;

                Ok(Partner {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    latitude: latitude.unwrap_or(f64::NAN),
                    longitude: longitude.unwrap_or(f64::NAN),
                    is_visible: row.try_get::<Option<bool>, _>("is_visible")?.unwrap_or(true),
                    collaboration_status: row.try_get("collaboration_status")?,
                    website: row.try_get("website")?,
                })
            })
            .collect()
    }

    async fn fetch_collaborations(&self) -> Result<Vec<Collaboration>, DirectoryError> {
        let query = r#"
            SELECT id, name, status, color, link
            FROM collaborations
            ORDER BY created_at, id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut collaborations = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            let status: CollaborationStatus = match status.parse() {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("Skipping collaboration {}: {}", id, e);
                    continue;
                }
            };

            collaborations.push(Collaboration {
                id,
                name: row.try_get("name")?,
                status,
                color: row.try_get("color")?,
                link: row.try_get("link")?,
            });
        }

        Ok(collaborations)
    }

    async fn fetch_memberships(&self) -> Result<Vec<Membership>, DirectoryError> {
        let query = r#"
            SELECT collaboration_id, partner_id
            FROM collaboration_members
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Membership, DirectoryError> {
                Ok(Membership {
                    collaboration_id: row.try_get("collaboration_id")?,
                    partner_id: row.try_get("partner_id")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DirectorySource for PostgresDirectory {
    async fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, DirectoryError> {
        let partners = self.fetch_partners().await?;
        let collaborations = self.fetch_collaborations().await?;
        let memberships = self.fetch_memberships().await?;

        tracing::debug!(
            "Loaded directory: {} partners, {} collaborations, {} memberships",
            partners.len(),
            collaborations.len(),
            memberships.len()
        );

        Ok(Arc::new(DirectorySnapshot {
            partners,
            collaborations,
            memberships,
        }))
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

/// Directory held in memory, typically loaded from a TOML file
pub struct StaticDirectory {
    snapshot: Arc<DirectorySnapshot>,
}

impl StaticDirectory {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, DirectoryError> {
        let snapshot: DirectorySnapshot = toml::from_str(contents)?;
        Ok(Self::new(snapshot))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let directory = Self::from_toml_str(&contents)?;
        tracing::info!(
            "Loaded static directory from {} ({} partners)",
            path.display(),
            directory.snapshot.partners.len()
        );
        Ok(directory)
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, DirectoryError> {
        Ok(self.snapshot.clone())
    }
}

/// Caches another source's snapshot for a fixed TTL
pub struct CachedDirectory {
    inner: Arc<dyn DirectorySource>,
    cache: moka::future::Cache<(), Arc<DirectorySnapshot>>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn DirectorySource>, ttl: Duration) -> Self {
        let cache = moka::future::CacheBuilder::new(1).time_to_live(ttl).build();
        Self { inner, cache }
    }

    /// Drop the cached snapshot so the next read hits the source
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[async_trait]
impl DirectorySource for CachedDirectory {
    async fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, DirectoryError> {
        if let Some(snapshot) = self.cache.get(&()).await {
            tracing::trace!("Directory cache hit");
            return Ok(snapshot);
        }

        let snapshot = self.inner.snapshot().await?;
        self.cache.insert((), snapshot.clone()).await;

        tracing::trace!("Directory cache refreshed");
        Ok(snapshot)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}
