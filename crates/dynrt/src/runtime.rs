// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The runtime facade.
//!
//! A [`Runtime`] owns a registry, the descriptor and conformance caches, the
//! name memo and the live configuration. The four operations are
//! implemented next to their subsystems:
//!
//! - [`Runtime::resolve_type`] in [`crate::resolver`]
//! - [`Runtime::allocate`] in [`crate::alloc`]
//! - [`Runtime::conformance`] in [`crate::conformance`]
//! - [`Runtime::equal`] in [`crate::equality`]
//!
//! Every method takes `&self`; a runtime is shared freely across threads.
//! [`Runtime::global`] provides a lazily-built process-wide instance for
//! callers that cannot thread one through (the C ABI).

use crate::config::RuntimeConfig;
use crate::conformance::ConformanceCache;
use crate::metadata::{LookupStats, MetadataCache};
use crate::registry::{HashMapTypeRegistry, RegistryBuilder, TypeRegistry};
use crate::resolver::NameMemo;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, OnceLock};

static GLOBAL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Cache sizes and hit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Interned descriptors.
    pub types: usize,
    /// Memoized conformance answers (positive and negative).
    pub conformances: usize,
    /// Entries in the name memo.
    pub names: usize,
    pub metadata_lookups: LookupStats,
    pub conformance_lookups: LookupStats,
    pub name_lookups: LookupStats,
}

/// Type-metadata runtime over a registry `R`.
pub struct Runtime<R: TypeRegistry = HashMapTypeRegistry> {
    pub(crate) registry: Arc<R>,
    pub(crate) metadata: MetadataCache,
    pub(crate) conformances: ConformanceCache,
    pub(crate) names: NameMemo,
    config: ArcSwap<RuntimeConfig>,
}

impl<R: TypeRegistry> Runtime<R> {
    /// Runtime with default configuration.
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_config(registry, RuntimeConfig::default())
    }

    pub fn with_config(registry: Arc<R>, config: RuntimeConfig) -> Self {
        log::debug!("[runtime] created with {:?}", config);
        Self {
            registry,
            metadata: MetadataCache::new(),
            conformances: ConformanceCache::default(),
            names: NameMemo::new(config.name_cache_capacity),
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<RuntimeConfig> {
        self.config.load_full()
    }

    /// Replace the configuration. The name memo is rebuilt with the new
    /// capacity; interned descriptors and conformances are kept.
    pub fn update_config(&self, config: RuntimeConfig) {
        log::debug!("[runtime] config updated: {:?}", config);
        self.names.reset(config.name_cache_capacity);
        self.config.store(Arc::new(config));
    }

    /// Descriptor store, for inspection.
    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    #[must_use]
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            types: self.metadata.len(),
            conformances: self.conformances.len(),
            names: self.names.len(),
            metadata_lookups: self.metadata.stats(),
            conformance_lookups: self.conformances.stats(),
            name_lookups: self.names.stats(),
        }
    }
}

impl Runtime<HashMapTypeRegistry> {
    /// Runtime over the standard prelude.
    pub fn standard(config: RuntimeConfig) -> crate::Result<Self> {
        let registry = RegistryBuilder::new().with_standard_types().build()?;
        Ok(Self::with_config(Arc::new(registry), config))
    }

    /// Build a runtime from a YAML registry manifest.
    #[cfg(feature = "loaders")]
    pub fn from_manifest<P: AsRef<std::path::Path>>(
        path: P,
        config: RuntimeConfig,
    ) -> crate::Result<Self> {
        use crate::registry::loaders::YamlLoader;

        let manifest = YamlLoader::load_from_file(path)?;
        let registry = YamlLoader::build_registry(&manifest)?;
        Ok(Self::with_config(Arc::new(registry), config))
    }

    /// The process-wide runtime.
    ///
    /// Unless [`install_global`](Self::install_global) ran first, this is a
    /// standard-prelude runtime configured from the environment.
    pub fn global() -> &'static Self {
        GLOBAL_RUNTIME.get_or_init(|| {
            let config = RuntimeConfig::from_env();
            Self::standard(config.clone()).unwrap_or_else(|err| {
                log::error!("[runtime] standard registry rejected: {}", err);
                Self::with_config(Arc::new(HashMapTypeRegistry::new()), config)
            })
        })
    }

    /// Make `runtime` the process-wide runtime. Fails (returning it) when
    /// one is already in place.
    pub fn install_global(runtime: Self) -> Result<&'static Self, Self> {
        GLOBAL_RUNTIME.set(runtime)?;
        log::debug!("[runtime] global runtime installed");
        Ok(Self::global())
    }
}

impl<R: TypeRegistry> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_runtime() {
        let rt = Runtime::standard(RuntimeConfig::default()).expect("standard");
        assert!(rt.registry().len() > 10);
        assert!(rt.resolve_str("Int").is_some());
        let stats = rt.stats();
        assert_eq!(stats.types, 1);
        assert_eq!(stats.names, 1);
    }

    #[test]
    fn test_update_config() {
        let rt = Runtime::standard(RuntimeConfig::default()).expect("standard");
        rt.resolve_str("Int");
        rt.update_config(RuntimeConfig::default().with_zero_fill(true).with_name_cache_capacity(0));
        assert!(rt.config().zero_fill);
        assert_eq!(rt.stats().names, 0);
        rt.resolve_str("Int");
        assert_eq!(rt.stats().names, 0);
        assert_eq!(rt.stats().types, 1);
    }

    #[test]
    fn test_runtime_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Runtime>();
    }
}
