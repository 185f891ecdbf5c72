// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard prelude: fixed-width integers, floats, pointers, `Optional`.

use super::{RegistryBuilder, TypeDecl};
use crate::conformance::{Witness, EQUATABLE};
use crate::metadata::Layout;

pub const HASHABLE: &str = "Hashable";

fn bitwise_scalar(name: &str, layout: Layout) -> TypeDecl {
    TypeDecl::scalar(name, layout).conforms_with(HASHABLE, Witness::bitwise())
}

pub(crate) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    let mut builder = builder.capability(HASHABLE, &[EQUATABLE]);

    let bitwise = [
        ("Bool", Layout::of::<bool>()),
        ("Int", Layout::of::<isize>()),
        ("Int8", Layout::of::<i8>()),
        ("Int16", Layout::of::<i16>()),
        ("Int32", Layout::of::<i32>()),
        ("Int64", Layout::of::<i64>()),
        ("UInt", Layout::of::<usize>()),
        ("UInt8", Layout::of::<u8>()),
        ("UInt16", Layout::of::<u16>()),
        ("UInt32", Layout::of::<u32>()),
        ("UInt64", Layout::of::<u64>()),
        ("RawPointer", Layout::POINTER),
        ("Character", Layout::of::<char>()),
    ];
    for (name, layout) in bitwise {
        builder = builder.declare(bitwise_scalar(name, layout));
    }

    for (name, layout) in [("Float", Layout::of::<f32>()), ("Double", Layout::of::<f64>())] {
        builder = builder
            .declare(TypeDecl::scalar(name, layout).conforms_with(HASHABLE, Witness::float()));
    }

    builder.declare(
        TypeDecl::enumeration("Optional")
            .generic(1)
            .case("none")
            .case_with("some", "$x")
            .conforms_where(EQUATABLE, &[("$x", EQUATABLE)])
            .conforms_where(HASHABLE, &[("$x", HASHABLE)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DeclBody, TypeRegistry};

    #[test]
    fn test_prelude_contents() {
        let registry = RegistryBuilder::new()
            .with_standard_types()
            .build()
            .expect("standard registry");
        let names = ["Bool", "Int", "Int8", "UInt64", "Float", "Double", "RawPointer", "Optional"];
        for name in names {
            assert!(registry.lookup(name).is_some(), "{name} missing");
        }
        let int = registry.lookup("Int").expect("Int");
        assert!(matches!(int.body(), DeclBody::Scalar(l) if l.size == 8 || l.size == 4));
        assert!(int.conformance(EQUATABLE).is_some());
        assert!(registry.capability(HASHABLE).expect("Hashable").refines(EQUATABLE));
        assert_eq!(registry.lookup("Optional").expect("Optional").own_params(), 1);
    }
}
