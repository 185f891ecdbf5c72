// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry manifests loaded at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use dynrt::registry::loaders::YamlLoader;
//!
//! let manifest = YamlLoader::load_from_file("types.yaml")?;
//! let registry = YamlLoader::build_registry(&manifest)?;
//! ```

#[cfg(feature = "loaders")]
pub mod yaml;

#[cfg(feature = "loaders")]
pub use yaml::{
    YamlCapability, YamlCase, YamlConformance, YamlField, YamlLoader, YamlManifest,
    YamlRequirement, YamlType,
};
