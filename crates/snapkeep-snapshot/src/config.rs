//! Settings for wiring a manager and scheduler from a config file.
//!
//! ```json
//! {
//!   "store": { "backend": "json", "dir": ".snapkeep" },
//!   "schedule": { "interval_ms": 5000, "name": { "style": "counter", "prefix": "auto" } },
//!   "log": { "level": "debug" }
//! }
//! ```
//!
//! Closures (conditions, custom name suppliers, listeners) cannot come from a
//! file; they are added to the resulting [`SchedulerConfig`] in code.

use crate::capture::{SharedTarget, Snapshotable};
use crate::error::{SnapshotError, SnapshotResult};
use crate::manager::SnapshotManager;
use crate::scheduler::{NameSupplier, SchedulerConfig};
use serde::{Deserialize, Serialize};
use snapkeep_storage::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore};
use snapkeep_util::{LogConfig, NameCounter, SnapshotName, DEFAULT_PREFIX};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapkeepSettings {
    pub store: StoreSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSettings>,
    pub log: LogConfig,
}

impl SnapkeepSettings {
    /// Parse settings from JSON text.
    pub fn from_json_str(content: &str) -> SnapshotResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SnapshotError::configuration(format!("invalid settings: {e}")))
    }

    /// Load settings from a JSON file.
    pub async fn load(path: &Path) -> SnapshotResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SnapshotError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Install the global tracing subscriber described by `log`.
    ///
    /// Returns `false` if one was already installed.
    pub fn init_logging(&self) -> bool {
        snapkeep_util::log::init(&self.log)
    }

    /// Build a manager for `target` backed by the configured store.
    pub async fn manager<T: Snapshotable>(
        &self,
        target: SharedTarget<T>,
    ) -> SnapshotResult<SnapshotManager<T>> {
        Ok(SnapshotManager::with_boxed_store(target, self.store.open().await?))
    }
}

/// Which store backs the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreSettings {
    #[default]
    Memory,
    /// One JSON file per snapshot under `dir`.
    Json { dir: PathBuf },
}

impl StoreSettings {
    /// Open the configured backend, creating its directory if needed.
    pub async fn open(&self) -> SnapshotResult<Box<dyn SnapshotStore>> {
        Ok(match self {
            Self::Memory => Box::new(MemorySnapshotStore::new()),
            Self::Json { dir } => Box::new(JsonSnapshotStore::open(dir).await?),
        })
    }
}

/// Scheduler options that can be expressed in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Tick period in milliseconds. Required.
    pub interval_ms: Option<u64>,
    pub name: NameStrategy,
}

impl ScheduleSettings {
    /// Convert into a validated scheduler config.
    pub fn into_config<T>(self) -> SnapshotResult<SchedulerConfig<T>> {
        let config = SchedulerConfig {
            interval: self.interval_ms.map(Duration::from_millis),
            name_supplier: self.name.supplier(),
            ..SchedulerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// How scheduled snapshots are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum NameStrategy {
    /// `prefix-1`, `prefix-2`, ...
    Counter {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// `prefix-20261018T101530.123Z`
    Timestamp {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// `prefix_01hqxyz...`
    Ulid {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
}

impl Default for NameStrategy {
    fn default() -> Self {
        Self::Ulid {
            prefix: default_prefix(),
        }
    }
}

impl NameStrategy {
    /// A fresh supplier. Counter suppliers start at 1 each time this is called.
    pub fn supplier(&self) -> NameSupplier {
        match self {
            Self::Counter { prefix } => {
                let counter = NameCounter::new(prefix.clone());
                Arc::new(move || counter.next_name())
            }
            Self::Timestamp { prefix } => {
                let prefix = prefix.clone();
                Arc::new(move || SnapshotName::timestamp(&prefix))
            }
            Self::Ulid { prefix } => {
                let prefix = prefix.clone();
                Arc::new(move || SnapshotName::ulid(&prefix))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep_util::LogLevel;
    use std::sync::RwLock;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    impl Snapshotable for Counter {}

    #[test]
    fn test_defaults() {
        let settings = SnapkeepSettings::from_json_str("{}").unwrap();
        assert_eq!(settings.store, StoreSettings::Memory);
        assert!(settings.schedule.is_none());
        assert_eq!(settings.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_settings_parse() {
        let settings = SnapkeepSettings::from_json_str(
            r#"{
                "store": { "backend": "json", "dir": "/tmp/snaps" },
                "schedule": { "interval_ms": 250, "name": { "style": "counter", "prefix": "auto" } },
                "log": { "level": "debug", "print": true }
            }"#,
        )
        .unwrap();

        assert_eq!(
            settings.store,
            StoreSettings::Json {
                dir: PathBuf::from("/tmp/snaps")
            }
        );
        let schedule = settings.schedule.unwrap();
        assert_eq!(schedule.interval_ms, Some(250));
        assert_eq!(
            schedule.name,
            NameStrategy::Counter {
                prefix: "auto".to_string()
            }
        );
        assert_eq!(settings.log.level, LogLevel::Debug);
        assert!(settings.log.print);
    }

    #[test]
    fn test_invalid_settings() {
        let err = SnapkeepSettings::from_json_str(r#"{ "store": { "backend": "s3" } }"#)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration(_)));
    }

    #[test]
    fn test_name_prefix_defaults() {
        let strategy: NameStrategy = serde_json::from_str(r#"{ "style": "timestamp" }"#).unwrap();
        assert_eq!(
            strategy,
            NameStrategy::Timestamp {
                prefix: "snap".to_string()
            }
        );
    }

    #[test]
    fn test_counter_supplier() {
        let supplier = NameStrategy::Counter {
            prefix: "snap".to_string(),
        }
        .supplier();
        assert_eq!(supplier(), "snap-1");
        assert_eq!(supplier(), "snap-2");
    }

    #[test]
    fn test_ulid_supplier_is_default() {
        let supplier = NameStrategy::default().supplier();
        let (first, second) = (supplier(), supplier());
        assert!(first.starts_with("snap_"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_schedule_requires_interval() {
        let err = ScheduleSettings::default()
            .into_config::<Counter>()
            .err()
            .unwrap();
        assert!(matches!(err, SnapshotError::Configuration(_)));

        let err = ScheduleSettings {
            interval_ms: Some(0),
            ..Default::default()
        }
        .into_config::<Counter>()
        .err()
        .unwrap();
        assert!(matches!(err, SnapshotError::Configuration(_)));
    }

    #[test]
    fn test_schedule_into_config() {
        let config = ScheduleSettings {
            interval_ms: Some(40),
            name: NameStrategy::Counter {
                prefix: "tick".to_string(),
            },
        }
        .into_config::<Counter>()
        .unwrap();

        assert_eq!(config.interval, Some(Duration::from_millis(40)));
        assert_eq!((config.name_supplier)(), "tick-1");
        assert!((config.condition)());
    }

    #[tokio::test]
    async fn test_load_and_build_json_manager() {
        let dir = TempDir::new().unwrap();
        let store_dir = dir.path().join("snaps");
        let settings_path = dir.path().join("snapkeep.json");
        std::fs::write(
            &settings_path,
            format!(
                r#"{{ "store": {{ "backend": "json", "dir": {} }} }}"#,
                serde_json::to_string(&store_dir).unwrap()
            ),
        )
        .unwrap();

        let settings = SnapkeepSettings::load(&settings_path).await.unwrap();
        let target = Arc::new(RwLock::new(Counter { hits: 3 }));
        let manager = settings.manager(target).await.unwrap();

        manager.save("persisted").await.unwrap();
        assert!(store_dir.join("snapshots/persisted.json").exists());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SnapkeepSettings::load(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Configuration(_)));
    }
}
