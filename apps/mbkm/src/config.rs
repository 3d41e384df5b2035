//! # Configuration
//!
//! TOML configuration of the server, storage, cache and catalog tables.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! database = "mbkm.db"
//! backend = "redb"          # or "memory"
//! uploads_dir = "storage/uploads"
//!
//! [cache]
//! ttl_secs = 300
//!
//! [catalog]
//! unknown_location = "Lainnya"
//!
//! [catalog.activity_types]
//! bootcamp = "Bootcamp"
//!
//! [catalog.study_programs]
//! 11 = "Teknik Informatika"
//!
//! [catalog.locations]
//! "DINAS KOMINFO KENDARI" = "Kendari"
//! ```
//!
//! A missing file means built-in defaults. Catalog entries are layered on
//! top of the built-in tables.

use mbkm_core::primitives::{CACHE_TTL_SECS, MAX_CACHE_TTL_SECS};
use mbkm_core::{Catalog, Dashboard, MbkmError, MemoryStore, RedbStore, StorageBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "mbkm.toml";

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Redb,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Redb => "redb",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = MbkmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            "redb" => Ok(BackendKind::Redb),
            other => Err(MbkmError::InvalidInput(format!(
                "unknown backend '{}'. Use: memory, redb",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub backend: BackendKind,
    /// Directory holding uploaded payment proofs and reports.
    pub uploads_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("mbkm.db"),
            backend: BackendKind::Redb,
            uploads_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached read models. Zero disables caching.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: CACHE_TTL_SECS,
        }
    }
}

/// Catalog overrides. Keys of `study_programs` are numeric ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub activity_types: BTreeMap<String, String>,
    pub study_programs: BTreeMap<String, String>,
    pub locations: BTreeMap<String, String>,
    pub unknown_study_program: Option<String>,
    pub unknown_location: Option<String>,
}

impl CatalogConfig {
    /// Layer the overrides on top of the built-in catalog.
    pub fn build(&self) -> Result<Catalog, MbkmError> {
        let mut catalog = Catalog::new();
        for (code, name) in &self.activity_types {
            catalog = catalog.with_activity_type(code, name.clone());
        }
        for (id, name) in &self.study_programs {
            let id: u32 = id.trim().parse().map_err(|_| {
                MbkmError::InvalidInput(format!("study program id '{}' is not a number", id))
            })?;
            catalog = catalog.with_study_program(id, name.clone());
        }
        for (placement, location) in &self.locations {
            catalog = catalog.with_location(placement, location.clone());
        }
        if let Some(name) = &self.unknown_study_program {
            catalog = catalog.with_unknown_study_program(name.clone());
        }
        if let Some(name) = &self.unknown_location {
            catalog = catalog.with_unknown_location(name.clone());
        }
        Ok(catalog)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Parse a configuration document.
    pub fn parse(text: &str) -> Result<Self, MbkmError> {
        let config: Self =
            toml::from_str(text).map_err(|e| MbkmError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the dashboard cannot run with.
    pub fn validate(&self) -> Result<(), MbkmError> {
        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(MbkmError::InvalidInput(format!(
                "cache ttl_secs {} exceeds maximum allowed {}",
                self.cache.ttl_secs, MAX_CACHE_TTL_SECS
            )));
        }
        Ok(())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, MbkmError> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(MbkmError::IoError(format!(
                    "Cannot read config metadata: {}",
                    e
                )));
            }
        };

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(MbkmError::InvalidInput(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| MbkmError::IoError(format!("Read config: {}", e)))?;
        let config = Self::parse(&text)?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Open the dashboard described by this configuration.
    pub fn open_dashboard(&self) -> Result<Dashboard, MbkmError> {
        let backend = match self.storage.backend {
            BackendKind::Memory => StorageBackend::InMemory(MemoryStore::new()),
            BackendKind::Redb => StorageBackend::Persistent(RedbStore::open(&self.storage.database)?),
        };
        Ok(Dashboard::with_backend(backend)
            .with_catalog(self.catalog.build()?)
            .with_cache_ttl(self.cache_ttl()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
