// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML registry manifest loader.
//!
//! # Example YAML
//!
//! ```yaml
//! # types.yaml
//! standard_types: true
//!
//! capabilities:
//!   - name: Comparable
//!     inherits: [Equatable]
//!
//! types:
//!   - name: Point
//!     kind: struct
//!     fields:
//!       - { name: x, type: Int }
//!       - { name: y, type: Int }
//!     conformances:
//!       - capability: Equatable
//!
//!   - name: Handle
//!     kind: scalar
//!     size: 8
//!     conformances:
//!       - { capability: Hashable, witness: bitwise }
//!
//!   - name: Either
//!     kind: enum
//!     params: 2
//!     cases:
//!       - { name: left, payload: "$x" }
//!       - { name: right, payload: "$q_" }
//!     conformances:
//!       - capability: Equatable
//!         where:
//!           - { param: "$x", capability: Equatable }
//!           - { param: "$q_", capability: Equatable }
//! ```

use crate::conformance::Witness;
use crate::error::{Error, Result};
use crate::metadata::Layout;
use crate::registry::{HashMapTypeRegistry, RegistryBuilder, TypeDecl, WitnessSource};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// YAML registry manifest loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlManifest {
    /// Start from the standard prelude.
    pub standard_types: bool,

    /// Capabilities beyond `Equatable` (and `Hashable` with the prelude).
    pub capabilities: Vec<YamlCapability>,

    /// Nominal type declarations.
    pub types: Vec<YamlType>,
}

#[derive(Debug, Deserialize)]
pub struct YamlCapability {
    pub name: String,
    #[serde(default)]
    pub inherits: Vec<String>,
}

/// One nominal declaration.
#[derive(Debug, Deserialize)]
pub struct YamlType {
    /// Qualified name (`Outer.Inner`).
    pub name: String,

    /// scalar, reference, struct or enum
    pub kind: String,

    /// Generic parameters introduced by this level.
    #[serde(default)]
    pub params: usize,

    /// Scalar size in bytes
    #[serde(default)]
    pub size: Option<usize>,

    /// Scalar alignment (defaults to natural alignment)
    #[serde(default)]
    pub alignment: Option<usize>,

    #[serde(default)]
    pub fields: Vec<YamlField>,

    #[serde(default)]
    pub cases: Vec<YamlCase>,

    #[serde(default)]
    pub conformances: Vec<YamlConformance>,
}

#[derive(Debug, Deserialize)]
pub struct YamlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct YamlCase {
    pub name: String,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YamlConformance {
    pub capability: String,

    /// derived, bitwise, float or marker
    #[serde(default = "default_witness")]
    pub witness: String,

    #[serde(default, rename = "where")]
    pub requirements: Vec<YamlRequirement>,
}

fn default_witness() -> String {
    "derived".to_string()
}

#[derive(Debug, Deserialize)]
pub struct YamlRequirement {
    pub param: String,
    pub capability: String,
}

impl YamlLoader {
    /// Load a manifest from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<YamlManifest> {
        let path = path.as_ref();
        log::debug!("[loader] reading manifest {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse YAML content.
    pub fn parse_yaml(content: &str) -> Result<YamlManifest> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Manifest(format!("Failed to parse YAML: {}", e)))
    }

    /// Add the manifest's capabilities and types to `builder`.
    pub fn apply(manifest: &YamlManifest, mut builder: RegistryBuilder) -> Result<RegistryBuilder> {
        if manifest.standard_types {
            builder = builder.with_standard_types();
        }
        for capability in &manifest.capabilities {
            let inherits: Vec<&str> = capability.inherits.iter().map(String::as_str).collect();
            builder = builder.capability(capability.name.clone(), &inherits);
        }
        for ty in &manifest.types {
            builder = builder.declare(Self::type_decl(ty)?);
        }
        Ok(builder)
    }

    /// Validate the manifest into a registry.
    pub fn build_registry(manifest: &YamlManifest) -> Result<HashMapTypeRegistry> {
        let builder = Self::apply(manifest, RegistryBuilder::new())?;
        Ok(builder.build()?)
    }

    /// Convert one YAML declaration.
    pub fn type_decl(ty: &YamlType) -> Result<TypeDecl> {
        let mut decl = match ty.kind.to_lowercase().as_str() {
            "scalar" => {
                let size = ty.size.ok_or_else(|| {
                    Error::Manifest(format!("Scalar '{}' needs a size", ty.name))
                })?;
                let layout = match ty.alignment {
                    Some(alignment) => Layout::new(size, alignment),
                    None => Layout::scalar(size),
                }
                .ok_or_else(|| Error::Manifest(format!("Invalid layout for '{}'", ty.name)))?;
                TypeDecl::scalar(ty.name.clone(), layout)
            }
            "reference" => TypeDecl::reference(ty.name.clone()),
            "struct" => TypeDecl::structure(ty.name.clone()),
            "enum" => TypeDecl::enumeration(ty.name.clone()),
            other => {
                return Err(Error::Manifest(format!(
                    "Invalid kind '{}' for '{}'",
                    other, ty.name
                )))
            }
        }
        .generic(ty.params);

        for field in &ty.fields {
            decl = decl.field(field.name.clone(), field.ty.clone());
        }
        for case in &ty.cases {
            decl = match &case.payload {
                Some(payload) => decl.case_with(case.name.clone(), payload.clone()),
                None => decl.case(case.name.clone()),
            };
        }

        for conformance in &ty.conformances {
            let witness = match conformance.witness.to_lowercase().as_str() {
                "derived" => WitnessSource::Derived,
                "bitwise" => WitnessSource::Provided(Witness::bitwise()),
                "float" => WitnessSource::Provided(Witness::float()),
                "marker" => WitnessSource::Provided(Witness::Marker),
                other => {
                    return Err(Error::Manifest(format!(
                        "Invalid witness '{}' for '{}'",
                        other, ty.name
                    )))
                }
            };
            let requirements: Vec<(&str, &str)> = conformance
                .requirements
                .iter()
                .map(|r| (r.param.as_str(), r.capability.as_str()))
                .collect();
            decl = decl.conformance(conformance.capability.clone(), &requirements, witness);
        }
        Ok(decl)
    }
}
