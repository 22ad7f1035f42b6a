//! Configuration for the category service and its storage backend

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Which `TreeStore` implementation to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoreBackend {
    /// In-process map, lost on exit
    Memory,
    /// Embedded SurrealDB (RocksDB) at `path`; requires the `surrealdb` feature
    Surreal { path: PathBuf },
}

/// Runtime configuration of the hierarchy engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Page size used by listings when the caller gives none
    pub default_page_size: usize,

    /// Upper bound applied to caller supplied page sizes
    pub max_page_size: usize,

    /// Hold a per-tenant lock around create/update/move/reorder/delete
    pub serialize_structural_mutations: bool,

    /// Fallback `tracing` filter when `RUST_LOG` is not set
    pub log_filter: String,

    pub backend: StoreBackend,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            serialize_structural_mutations: true,
            log_filter: "info".to_string(),
            backend: StoreBackend::Memory,
        }
    }
}

/// Parse an environment variable, ignoring it (with a warning) when malformed
fn env_override<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

impl CatalogConfig {
    /// Defaults overlaid with `CATALOG_*` environment variables, validated.
    ///
    /// - `CATALOG_DEFAULT_PAGE_SIZE`, `CATALOG_MAX_PAGE_SIZE`: integers
    /// - `CATALOG_SERIALIZE_MUTATIONS`: `true` / `false`
    /// - `CATALOG_LOG`: tracing filter directive
    /// - `CATALOG_SURREAL_PATH`: selects the SurrealDB backend at this path
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(size) = env_override("CATALOG_DEFAULT_PAGE_SIZE") {
            config.default_page_size = size;
        }
        if let Some(size) = env_override("CATALOG_MAX_PAGE_SIZE") {
            config.max_page_size = size;
        }
        if let Some(serialize) = env_override("CATALOG_SERIALIZE_MUTATIONS") {
            config.serialize_structural_mutations = serialize;
        }
        config.log_filter = Self::log_filter_from_env();
        if let Ok(path) = std::env::var("CATALOG_SURREAL_PATH") {
            config.backend = StoreBackend::Surreal {
                path: PathBuf::from(path),
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// `CATALOG_LOG` if set and non-empty, otherwise the default filter.
    ///
    /// Lets a binary install its subscriber before [`Self::from_env`] runs, so
    /// warnings about malformed values are not lost.
    pub fn log_filter_from_env() -> String {
        std::env::var("CATALOG_LOG")
            .ok()
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| Self::default().log_filter)
    }

    /// Effective page size for a caller supplied `limit`
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.default_page_size,
            Some(limit) => limit.min(self.max_page_size),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_page_size == 0 {
            return Err("default_page_size must be greater than 0".to_string());
        }

        if self.max_page_size == 0 {
            return Err("max_page_size must be greater than 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            return Err(format!(
                "default_page_size ({}) cannot exceed max_page_size ({})",
                self.default_page_size, self.max_page_size
            ));
        }

        if let StoreBackend::Surreal { path } = &self.backend {
            if path.as_os_str().is_empty() {
                return Err("surreal backend path cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
