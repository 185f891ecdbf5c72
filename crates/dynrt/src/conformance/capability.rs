// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capability (protocol) descriptors.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Name of the well-known equality capability.
pub const EQUATABLE: &str = "Equatable";

#[derive(Debug)]
pub struct CapabilityInfo {
    name: String,
    inherits: Vec<String>,
    bases: Vec<String>,
}

/// Identifies a capability by name.
///
/// Two descriptors are equal when their names are; the registry holds the
/// authoritative copy carrying the refinement closure.
#[derive(Clone)]
pub struct CapabilityDescriptor(Arc<CapabilityInfo>);

impl CapabilityDescriptor {
    /// Descriptor with direct refinements only. Queries resolve the name
    /// against the registry, so this is enough to ask about a capability.
    pub fn new(name: impl Into<String>, inherits: Vec<String>) -> Self {
        Self(Arc::new(CapabilityInfo {
            name: name.into(),
            bases: inherits.clone(),
            inherits,
        }))
    }

    pub(crate) fn with_bases(name: String, inherits: Vec<String>, bases: Vec<String>) -> Self {
        Self(Arc::new(CapabilityInfo {
            name,
            inherits,
            bases,
        }))
    }

    /// The process-wide equality capability.
    pub fn equatable() -> &'static CapabilityDescriptor {
        static EQUATABLE_DESCRIPTOR: OnceLock<CapabilityDescriptor> = OnceLock::new();
        EQUATABLE_DESCRIPTOR.get_or_init(|| Self::new(EQUATABLE, Vec::new()))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Directly refined capabilities.
    pub fn inherits(&self) -> &[String] {
        &self.0.inherits
    }

    /// Transitive refinement closure.
    pub fn bases(&self) -> &[String] {
        &self.0.bases
    }

    pub fn refines(&self, base: &str) -> bool {
        self.0.bases.iter().any(|b| b == base)
    }

    /// True for `Equatable` and every capability refining it.
    pub fn implies_equality(&self) -> bool {
        self.name() == EQUATABLE || self.refines(EQUATABLE)
    }

    pub fn as_ptr(&self) -> *const CapabilityInfo {
        Arc::as_ptr(&self.0)
    }

    /// Rebuild a descriptor from [`CapabilityDescriptor::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `as_ptr` on a descriptor that is still alive.
    pub unsafe fn from_ptr(ptr: *const CapabilityInfo) -> Self {
        // SAFETY: caller guarantees ptr came from Arc::as_ptr on a live Arc.
        unsafe {
            Arc::increment_strong_count(ptr);
            Self(Arc::from_raw(ptr))
        }
    }
}

impl PartialEq for CapabilityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for CapabilityDescriptor {}

impl Hash for CapabilityDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.0.name)
    }
}

impl fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
