// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Manifest and configuration files on disk.

use dynrt::config::ConfigError;
use dynrt::registry::loaders::YamlLoader;
use dynrt::{CapabilityDescriptor, Error, ResolveScope, Runtime, RuntimeConfig, TypeRegistry};
use std::io::Write;
use tempfile::NamedTempFile;

const MANIFEST: &str = r#"
standard_types: true

capabilities:
  - name: Comparable
    inherits: [Equatable]

types:
  - name: Handle
    kind: scalar
    size: 8
    conformances:
      - { capability: Hashable, witness: bitwise }
      - { capability: Comparable, witness: bitwise }

  - name: Either
    kind: enum
    params: 2
    cases:
      - { name: left, payload: "$x" }
      - { name: right, payload: "$q_" }
    conformances:
      - capability: Equatable
        where:
          - { param: "$x", capability: Equatable }
          - { param: "$q_", capability: Equatable }

  - name: Either.Pair
    kind: struct
    fields:
      - { name: first, type: "$x" }
      - { name: second, type: "$q_" }
    conformances:
      - capability: Comparable

  - name: Opaque
    kind: reference
"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write");
    file.flush().expect("flush");
    file
}

#[test]
fn test_runtime_from_manifest() {
    let file = write_temp(MANIFEST);
    let rt = Runtime::from_manifest(file.path(), RuntimeConfig::default()).expect("runtime");

    let handle = rt.resolve_str("Handle").expect("Handle");
    assert_eq!(handle.size(), 8);
    assert_eq!(handle.alignment_mask(), 7);
    assert!(rt
        .conformance(&handle, CapabilityDescriptor::equatable())
        .is_some());

    let either = rt.resolve_str("Either<Int, Handle>").expect("Either");
    assert!(rt
        .conformance(&either, CapabilityDescriptor::equatable())
        .is_some());
    let with_opaque = rt.resolve_str("Either<Int, Opaque>").expect("Either");
    assert!(rt
        .conformance(&with_opaque, CapabilityDescriptor::equatable())
        .is_none());

    let int = rt.resolve_str("Int").expect("Int");
    let context = rt.context("Either").expect("Either context");
    let pair = rt
        .resolve_type(b"Pair", ResolveScope::Context(&context), &[int.clone(), int])
        .expect("member type");
    assert_eq!(pair.name(), "Either<Int, Int>.Pair");

    let comparable = rt
        .registry()
        .capability("Comparable")
        .expect("Comparable")
        .clone();
    // Derived Comparable needs Comparable fields; Int is only Hashable.
    assert!(rt.conformance(&pair, &comparable).is_none());
    assert!(rt
        .conformance(&pair, CapabilityDescriptor::equatable())
        .is_some());

    let handle_pair = rt
        .resolve_type(
            b"Pair",
            ResolveScope::Context(&context),
            &[handle.clone(), handle],
        )
        .expect("member type");
    assert_eq!(handle_pair.name(), "Either<Handle, Handle>.Pair");
    let table = rt
        .conformance(&handle_pair, &comparable)
        .expect("Pair of Handles is Comparable");
    assert!(table.equality_witness().is_some());
}

#[test]
fn test_manifest_errors() {
    assert!(matches!(
        YamlLoader::load_from_file("/nonexistent/dynrt/types.yaml"),
        Err(Error::Io(_))
    ));

    // Member types are resolved lazily; an unknown one only fails resolution.
    let dangling = write_temp(
        "types:\n  - { name: Broken, kind: struct, fields: [{ name: a, type: Missing }] }\n",
    );
    let rt = Runtime::from_manifest(dangling.path(), RuntimeConfig::default()).expect("builds");
    assert!(rt.resolve_str("Broken").is_none());

    let malformed = write_temp(
        "types:\n  - { name: Broken, kind: struct, fields: [{ name: a, type: \"Pair<\" }] }\n",
    );
    let manifest = YamlLoader::load_from_file(malformed.path()).expect("parses");
    assert!(matches!(
        YamlLoader::build_registry(&manifest),
        Err(Error::Registry(_))
    ));

    let cyclic = write_temp(
        "capabilities:\n  - { name: A, inherits: [B] }\n  - { name: B, inherits: [A] }\n",
    );
    let manifest = YamlLoader::load_from_file(cyclic.path()).expect("parses");
    assert!(matches!(
        YamlLoader::build_registry(&manifest),
        Err(Error::Registry(_))
    ));
}

#[test]
fn test_runtime_config_file() {
    let file = write_temp("name_cache_capacity: 8\nzero_fill: true\n");
    let config = RuntimeConfig::from_yaml_file(file.path()).expect("config");
    assert_eq!(config.name_cache_capacity, 8);
    assert!(config.zero_fill);

    let rt = Runtime::standard(config).expect("runtime");
    let int = rt.resolve_str("Int").expect("Int");
    let instance = rt.allocate_for(&int).expect("instance");
    // SAFETY: zero_fill is configured.
    assert!(unsafe { instance.as_bytes() }.iter().all(|b| *b == 0));

    assert!(matches!(
        RuntimeConfig::from_yaml_file("/nonexistent/dynrt.yaml"),
        Err(ConfigError::FileNotFound(_))
    ));
}
