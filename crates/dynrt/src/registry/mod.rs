// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type and capability registry.
//!
//! The registry is the read-only source of truth the runtime resolves
//! against: nominal declarations (with their conformance records) and
//! capability descriptors. It is assembled once with [`RegistryBuilder`],
//! validated, and never mutated afterwards.
//!
//! # Example
//!
//! ```rust
//! use dynrt::registry::{RegistryBuilder, TypeDecl, TypeRegistry};
//!
//! let registry = RegistryBuilder::new()
//!     .with_standard_types()
//!     .declare(
//!         TypeDecl::structure("Point")
//!             .field("x", "Int")
//!             .field("y", "Int")
//!             .conforms("Equatable"),
//!     )
//!     .build()
//!     .unwrap();
//! assert!(registry.lookup("Point").is_some());
//! ```

mod builder;
mod decl;
pub mod loaders;
mod standard;

pub use builder::RegistryBuilder;
pub use decl::{
    CaseDecl, ConformanceDecl, DeclBody, FieldDecl, GenericRequirement, GenericSignature,
    NominalDecl, TypeDecl, WitnessSource,
};
pub use standard::HASHABLE;

use crate::conformance::CapabilityDescriptor;
use crate::mangling::{GenericParam, MangleError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read-only view of declarations and capabilities.
pub trait TypeRegistry: Send + Sync {
    /// Declaration by qualified name (`Outer.Inner`).
    fn lookup(&self, name: &str) -> Option<&Arc<NominalDecl>>;

    /// Capability by name, carrying its refinement closure.
    fn capability(&self, name: &str) -> Option<&CapabilityDescriptor>;
}

/// [`HashMap`]-backed [`TypeRegistry`] produced by [`RegistryBuilder`].
#[derive(Debug, Default)]
pub struct HashMapTypeRegistry {
    types: HashMap<String, Arc<NominalDecl>>,
    capabilities: HashMap<String, CapabilityDescriptor>,
}

impl HashMapTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn capability_names(&self) -> impl Iterator<Item = &str> {
        self.capabilities.keys().map(String::as_str)
    }
}

impl TypeRegistry for HashMapTypeRegistry {
    fn lookup(&self, name: &str) -> Option<&Arc<NominalDecl>> {
        self.types.get(name)
    }

    fn capability(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.capabilities.get(name)
    }
}

/// Registry validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateType(String),
    DuplicateCapability(String),
    /// Not a dotted sequence of identifiers.
    InvalidName(String),
    UnknownParent {
        decl: String,
        parent: String,
    },
    UnknownCapability {
        decl: String,
        capability: String,
    },
    CyclicRefinement(String),
    InvalidMember {
        decl: String,
        member: String,
        reason: &'static str,
    },
    InvalidTypeName {
        decl: String,
        text: String,
        source: MangleError,
    },
    ParamOutOfRange {
        decl: String,
        param: GenericParam,
    },
    InvalidRequirement {
        decl: String,
        text: String,
    },
    DuplicateConformance {
        decl: String,
        capability: String,
    },
    /// Witness kind cannot serve the capability (e.g. a marker for Equatable).
    IncompatibleWitness {
        decl: String,
        capability: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateType(name) => write!(f, "Type '{}' declared twice", name),
            RegistryError::DuplicateCapability(name) => {
                write!(f, "Capability '{}' declared twice", name)
            }
            RegistryError::InvalidName(name) => write!(f, "Invalid declaration name '{}'", name),
            RegistryError::UnknownParent { decl, parent } => {
                write!(f, "Type '{}': unknown parent '{}'", decl, parent)
            }
            RegistryError::UnknownCapability { decl, capability } => {
                write!(f, "'{}': unknown capability '{}'", decl, capability)
            }
            RegistryError::CyclicRefinement(name) => {
                write!(f, "Capability '{}' refines itself", name)
            }
            RegistryError::InvalidMember {
                decl,
                member,
                reason,
            } => write!(f, "Type '{}': member '{}' {}", decl, member, reason),
            RegistryError::InvalidTypeName { decl, text, source } => {
                write!(f, "Type '{}': cannot decode '{}': {}", decl, text, source)
            }
            RegistryError::ParamOutOfRange { decl, param } => {
                write!(f, "Type '{}': parameter {} out of range", decl, param)
            }
            RegistryError::InvalidRequirement { decl, text } => {
                write!(f, "Type '{}': invalid requirement '{}'", decl, text)
            }
            RegistryError::DuplicateConformance { decl, capability } => {
                write!(f, "Type '{}' conforms to '{}' twice", decl, capability)
            }
            RegistryError::IncompatibleWitness { decl, capability } => {
                write!(f, "Type '{}': witness cannot serve '{}'", decl, capability)
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::InvalidTypeName { source, .. } => Some(source),
            _ => None,
        }
    }
}
