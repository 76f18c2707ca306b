//! Aggregated health report over the host, the metadata database and the
//! document repository.

pub mod system;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::DocumentStatus;
use serde::Serialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use self::system::{DiskUsage, MemoryUsage, ProcessUsage};
use crate::config::HealthConfig;
use crate::documents::MetadataStore;

const PROBE_PREFIX: &str = ".health_probe-";

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Unhealthy,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SystemCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessUsage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_documents: Option<u64>,
    /// Row counts keyed by status name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_status: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RepositoryCheck {
    pub status: CheckStatus,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskUsage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentsCheck {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_documents: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub system: SystemCheck,
    pub database: DatabaseCheck,
    pub repository: RepositoryCheck,
    pub documents: DocumentsCheck,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

impl HealthChecks {
    /// Database or repository failure makes the service unhealthy. Anything
    /// else short of healthy only degrades it.
    pub fn overall(&self) -> HealthStatus {
        if self.database.status == CheckStatus::Unhealthy
            || self.repository.status == CheckStatus::Unhealthy
        {
            return HealthStatus::Unhealthy;
        }
        let statuses = [
            self.system.status,
            self.database.status,
            self.repository.status,
            self.documents.status,
        ];
        if statuses.iter().all(|s| *s == CheckStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}

pub struct HealthReporter {
    config: HealthConfig,
    repository: PathBuf,
    metadata: Arc<dyn MetadataStore>,
}

impl HealthReporter {
    pub fn new(
        config: HealthConfig,
        repository: PathBuf,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config,
            repository,
            metadata,
        }
    }

    #[instrument(skip(self))]
    pub async fn report(&self) -> HealthReport {
        let (system, database, repository, documents) = tokio::join!(
            self.check_system(),
            self.check_database(),
            self.check_repository(),
            self.check_documents(),
        );

        let checks = HealthChecks {
            system,
            database,
            repository,
            documents,
        };
        let status = checks.overall();
        if status != HealthStatus::Healthy {
            warn!(?status, "Health check not healthy");
        }

        HealthReport {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_system(&self) -> SystemCheck {
        let sample = Duration::from_millis(self.config.cpu_sample_ms);
        let snapshot = match tokio::task::spawn_blocking(move || system::sample_host(sample)).await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return SystemCheck {
                    status: CheckStatus::Unhealthy,
                    message: None,
                    error: Some(format!("System probe failed: {e}")),
                    cpu_percent: None,
                    memory: None,
                    disk: None,
                    process: None,
                };
            }
        };

        let threshold = self.config.warning_threshold_percent;
        let mut warnings = Vec::new();
        if f64::from(snapshot.cpu_percent) > threshold {
            warnings.push(format!("CPU usage at {:.1}%", snapshot.cpu_percent));
        }
        if snapshot.memory.percent > threshold {
            warnings.push(format!("Memory usage at {}%", snapshot.memory.percent));
        }
        if let Some(disk) = &snapshot.root_disk
            && disk.percent > threshold
        {
            warnings.push(format!("Disk usage at {}%", disk.percent));
        }

        let (status, message) = warning_status(warnings);
        SystemCheck {
            status,
            message,
            error: None,
            cpu_percent: Some(snapshot.cpu_percent),
            memory: Some(snapshot.memory),
            disk: snapshot.root_disk,
            process: snapshot.process,
        }
    }

    async fn check_database(&self) -> DatabaseCheck {
        let result = async {
            self.metadata.ping().await?;
            let total = self.metadata.count(None).await?;
            let mut by_status = BTreeMap::new();
            for &status in DocumentStatus::ALL {
                let count = self.metadata.count(Some(status)).await?;
                by_status.insert(status.as_str().to_string(), count);
            }
            Ok::<_, sea_orm::DbErr>((total, by_status))
        }
        .await;

        match result {
            Ok((total, by_status)) => DatabaseCheck {
                status: CheckStatus::Healthy,
                error: None,
                total_documents: Some(total),
                by_status: Some(by_status),
            },
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                DatabaseCheck {
                    status: CheckStatus::Unhealthy,
                    error: Some(e.to_string()),
                    total_documents: None,
                    by_status: None,
                }
            }
        }
    }

    async fn check_repository(&self) -> RepositoryCheck {
        let path = self.repository.display().to_string();

        if let Err(e) = probe_writable(&self.repository).await {
            warn!(path = %path, error = %e, "Repository is not writable");
            return RepositoryCheck {
                status: CheckStatus::Unhealthy,
                path,
                message: None,
                error: Some(format!("Repository is not writable: {e}")),
                disk: None,
            };
        }

        let repository = self.repository.clone();
        let disk = tokio::task::spawn_blocking(move || system::disk_for_path(&repository))
            .await
            .ok()
            .flatten();

        let mut warnings = Vec::new();
        if let Some(disk) = &disk {
            if disk.percent > self.config.warning_threshold_percent {
                warnings.push(format!("Repository volume at {}%", disk.percent));
            }
            if disk.free_bytes < self.config.min_free_bytes {
                warnings.push(format!("Only {} bytes free", disk.free_bytes));
            }
        }

        let (status, message) = warning_status(warnings);
        RepositoryCheck {
            status,
            path,
            message,
            error: None,
            disk,
        }
    }

    async fn check_documents(&self) -> DocumentsCheck {
        match self.metadata.count(Some(DocumentStatus::Error)).await {
            Ok(0) => DocumentsCheck {
                status: CheckStatus::Healthy,
                message: None,
                error: None,
                error_documents: Some(0),
            },
            Ok(count) => DocumentsCheck {
                status: CheckStatus::Warning,
                message: Some(format!("{count} documents in error state")),
                error: None,
                error_documents: Some(count),
            },
            Err(e) => DocumentsCheck {
                status: CheckStatus::Unhealthy,
                message: None,
                error: Some(e.to_string()),
                error_documents: None,
            },
        }
    }
}

fn warning_status(warnings: Vec<String>) -> (CheckStatus, Option<String>) {
    if warnings.is_empty() {
        (CheckStatus::Healthy, None)
    } else {
        (CheckStatus::Warning, Some(warnings.join("; ")))
    }
}

/// Create the repository if needed, then write and remove a probe file.
///
/// Each call uses its own file so overlapping checks never remove each
/// other's file.
async fn probe_writable(repository: &std::path::Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(repository).await?;
    let probe = repository.join(format!("{PROBE_PREFIX}{}", Uuid::new_v4()));
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await
}
