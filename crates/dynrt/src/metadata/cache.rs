// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Uniquing cache for resolved descriptors.
//!
//! Every (declaration, argument list) pair and every tuple element list maps
//! to exactly one [`TypeHandle`]. Descriptors are computed outside the map
//! and inserted with `entry().or_insert_with`, so concurrent resolvers racing
//! on the same key all observe the first winner. Entries are never evicted:
//! raw descriptor pointers handed across the C ABI stay valid for the life
//! of the cache.

use super::descriptor::{nesting_height, TupleElement, TypeDescriptor, TypeHandle, TypeKind};
use super::layout::LayoutBuilder;
use super::{Layout, MetadataId};
use crate::registry::NominalDecl;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NominalKey {
    decl: String,
    args: Vec<MetadataId>,
}

impl NominalKey {
    fn new(decl: &str, args: &[TypeHandle]) -> Self {
        Self {
            decl: decl.to_string(),
            args: args.iter().map(|a| a.id()).collect(),
        }
    }
}

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
}

impl LookupStats {
    /// Fraction of lookups served from cache (0.0 when unused).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Atomic hit/miss counters shared by the runtime caches.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LookupStats {
        LookupStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Concurrent descriptor store keyed by structural identity.
#[derive(Debug)]
pub struct MetadataCache {
    next_id: AtomicU32,
    nominals: DashMap<NominalKey, TypeHandle>,
    tuples: DashMap<Vec<MetadataId>, TypeHandle>,
    stats: StatsCounter,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            nominals: DashMap::new(),
            tuples: DashMap::new(),
            stats: StatsCounter::default(),
        }
    }

    fn allocate_id(&self) -> MetadataId {
        MetadataId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Previously interned instantiation of `decl` with `args`.
    pub fn lookup_nominal(&self, decl: &str, args: &[TypeHandle]) -> Option<TypeHandle> {
        let key = NominalKey::new(decl, args);
        match self.nominals.get(&key) {
            Some(hit) => {
                self.stats.hit();
                Some(hit.value().clone())
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    /// Intern a nominal instantiation, keeping any earlier entry for the key.
    pub(crate) fn intern_nominal(
        &self,
        decl: &Arc<NominalDecl>,
        args: Vec<TypeHandle>,
        name: String,
        kind: TypeKind,
        layout: Layout,
    ) -> TypeHandle {
        let key = NominalKey::new(decl.name(), &args);
        let entry = self.nominals.entry(key).or_insert_with(|| {
            let id = self.allocate_id();
            log::debug!("[metadata] interned {} as #{}", name, id.0);
            let height = nesting_height(&kind, &args);
            TypeHandle::new(TypeDescriptor {
                id,
                name: name.into(),
                decl: Some(Arc::clone(decl)),
                generic_args: args,
                kind,
                layout,
                height,
            })
        });
        entry.value().clone()
    }

    /// Tuple of `elements`, laid out sequentially. `None` on layout overflow.
    pub fn tuple(&self, elements: &[TypeHandle]) -> Option<TypeHandle> {
        let key: Vec<MetadataId> = elements.iter().map(|e| e.id()).collect();
        if let Some(hit) = self.tuples.get(&key) {
            self.stats.hit();
            return Some(hit.value().clone());
        }
        self.stats.miss();

        let mut builder = LayoutBuilder::new();
        let mut stored = Vec::with_capacity(elements.len());
        for element in elements {
            let offset = builder.push(element.layout())?;
            stored.push(TupleElement {
                ty: element.clone(),
                offset,
            });
        }
        let layout = builder.finish()?;
        let name = format!(
            "({})",
            elements
                .iter()
                .map(|e| e.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let kind = TypeKind::Tuple { elements: stored };
        let height = nesting_height(&kind, &[]);

        let entry = self.tuples.entry(key).or_insert_with(|| {
            let id = self.allocate_id();
            log::debug!("[metadata] interned {} as #{}", name, id.0);
            TypeHandle::new(TypeDescriptor {
                id,
                name: name.into(),
                decl: None,
                generic_args: Vec::new(),
                kind,
                layout,
                height,
            })
        });
        Some(entry.value().clone())
    }

    /// Number of interned descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nominals.len() + self.tuples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> LookupStats {
        self.stats.snapshot()
    }
}
