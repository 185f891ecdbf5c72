// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dynrt - dynamic type metadata runtime
//!
//! Resolves encoded type names to uniqued descriptors, allocates instances
//! of those types, answers capability conformance queries, and dispatches
//! equality through conformance tables.
//!
//! ## Quick Start
//!
//! ```rust
//! use dynrt::{CapabilityDescriptor, Runtime, RuntimeConfig};
//!
//! fn main() -> dynrt::Result<()> {
//!     let rt = Runtime::standard(RuntimeConfig::default())?;
//!     let int = rt.require_type("Int")?;
//!
//!     let table = rt
//!         .conformance(&int, CapabilityDescriptor::equatable())
//!         .expect("Int is Equatable");
//!
//!     let mut a = rt.allocate(&int, int.size(), int.alignment_mask())?;
//!     let mut b = rt.allocate(&int, int.size(), int.alignment_mask())?;
//!     a.write(42isize);
//!     b.write(42isize);
//!
//!     // SAFETY: both instances hold an initialized Int.
//!     assert!(unsafe { rt.equal(&a, &b, &int, &table) });
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                  Runtime (facade, config)                     |
//! |  resolve_type | allocate | conformance | equal                |
//! +---------------------------------------------------------------+
//! |  resolver: name grammar -> scope lookup -> instantiation     |
//! |  conformance: records, conditional requirements, witnesses   |
//! +---------------------------------------------------------------+
//! |  metadata: uniqued descriptors, layouts   | name memo (LRU)   |
//! +---------------------------------------------------------------+
//! |  registry: declarations + capabilities (builder, YAML)       |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`mangling`] - type name grammar
//! - [`registry`] - declarations, capabilities, manifests
//! - [`metadata`] - descriptors and the uniquing cache
//! - [`resolver`] - scopes and name resolution
//! - [`alloc`] - instance storage
//! - [`conformance`] - capability lookup and witnesses
//! - [`equality`] - equality dispatch

/// Instance allocation with caller-chosen size and alignment.
pub mod alloc;
/// Runtime configuration (defaults, environment, YAML).
pub mod config;
/// Capability conformance lookup and witness tables.
pub mod conformance;
/// Equality dispatch through conformance tables.
pub mod equality;
/// Crate-level error type.
pub mod error;
/// Encoded type name grammar.
pub mod mangling;
/// Type descriptors, layouts and the uniquing cache.
pub mod metadata;
/// Declarations and capabilities the runtime resolves against.
pub mod registry;
/// Scoped type name resolution.
pub mod resolver;
/// The runtime facade.
pub mod runtime;

pub use alloc::{AllocError, Instance};
pub use config::RuntimeConfig;
pub use conformance::{CapabilityDescriptor, ConformanceTable, EquatableWitness, Witness};
pub use equality::{equal_raw, EqualityError, EqualityStrategy};
pub use error::{Error, Result};
pub use metadata::{Layout, TypeDescriptor, TypeHandle, TypeKind};
pub use registry::{HashMapTypeRegistry, RegistryBuilder, TypeDecl, TypeRegistry};
pub use resolver::{ContextDescriptor, GenericEnvironment, ResolveScope};
pub use runtime::{Runtime, RuntimeStats};

/// dynrt version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
