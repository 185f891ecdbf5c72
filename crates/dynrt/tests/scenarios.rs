// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::similar_names)] // Test variable naming
#![allow(clippy::float_cmp)] // Test assertions with constants

//! End-to-end runtime scenarios: resolve, allocate, query, compare.

use dynrt::equality::EqualityError;
use dynrt::metadata::TypeKind;
use dynrt::registry::HASHABLE;
use dynrt::{
    CapabilityDescriptor, EqualityStrategy, GenericEnvironment, Instance, ResolveScope, Runtime,
    RuntimeConfig, TypeDecl, TypeHandle, TypeRegistry,
};
use std::sync::Arc;

/// Four-byte tag compared ASCII case-insensitively.
#[derive(Debug, Clone, Copy)]
struct Tag([u8; 4]);

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

fn runtime(config: RuntimeConfig) -> Runtime {
    let registry = dynrt::RegistryBuilder::new()
        .with_standard_types()
        .capability("Describable", &[])
        .value_type::<Tag>("Tag")
        .declare(TypeDecl::reference("Handle").conforms("Describable"))
        .declare(
            TypeDecl::structure("Point")
                .field("x", "Int32")
                .field("y", "Int32")
                .conforms(HASHABLE),
        )
        .declare(
            TypeDecl::structure("Box")
                .generic(1)
                .field("value", "$x")
                .conforms_where("Equatable", &[("$x", "Equatable")]),
        )
        .declare(
            TypeDecl::structure("Pair")
                .generic(2)
                .field("first", "$x")
                .field("second", "$q_"),
        )
        .declare(
            TypeDecl::structure("Holder")
                .field("boxed", "Box<Int>")
                .conforms(HASHABLE),
        )
        .declare(
            TypeDecl::enumeration("Slot")
                .case("empty")
                .case_with("filled", "Box<Int>")
                .conforms(HASHABLE),
        )
        .build()
        .expect("registry");
    Runtime::with_config(Arc::new(registry), config)
}

fn zeroed() -> Runtime {
    runtime(RuntimeConfig::default().with_zero_fill(true))
}

fn instance_of(rt: &Runtime, ty: &TypeHandle) -> Instance {
    rt.allocate(ty, ty.size(), ty.alignment_mask())
        .expect("allocation")
}

#[test]
fn test_int_equality_round() {
    let rt = zeroed();
    let int = rt
        .resolve_type(b"Int", ResolveScope::Global, &[])
        .expect("Int resolves");
    let size = std::mem::size_of::<isize>();
    assert_eq!(int.size(), size);
    assert_eq!(int.alignment_mask(), std::mem::align_of::<isize>() - 1);

    let mut a = rt.allocate(&int, size, int.alignment_mask()).expect("a");
    let mut b = rt.allocate(&int, size, int.alignment_mask()).expect("b");
    assert_eq!(a.as_ptr() as usize & int.alignment_mask(), 0);
    a.write(0x0102_0304isize);
    b.write(0x0102_0304isize);

    let table = rt
        .conformance(&int, CapabilityDescriptor::equatable())
        .expect("Int is Equatable");
    // SAFETY: both instances hold an initialized Int.
    assert!(unsafe { rt.equal(&a, &b, &int, &table) });

    b.write_bytes(size - 1, &[0xFF]);
    // SAFETY: as above.
    assert!(!unsafe { rt.equal(&a, &b, &int, &table) });
}

#[test]
fn test_unknown_name_is_absent() {
    let rt = zeroed();
    assert!(rt
        .resolve_type(b"NoSuchType<<>>", ResolveScope::Global, &[])
        .is_none());
    assert!(rt.resolve_str("NoSuchType").is_none());
    assert!(rt.require_type("NoSuchType").is_err());
}

#[test]
fn test_allocation_honors_any_alignment() {
    let rt = runtime(RuntimeConfig::default());
    let byte = rt.resolve_str("UInt8").expect("UInt8");
    let mut rng = fastrand::Rng::with_seed(0x5eed);

    for _ in 0..200 {
        let mask = (1usize << rng.usize(0..13)) - 1;
        let size = rng.usize(0..512);
        let instance = rt.allocate(&byte, size, mask).expect("allocation");
        assert_eq!(instance.as_ptr() as usize & mask, 0, "mask {mask:#x}");
        assert!(instance.capacity() >= size.max(1));
        assert_eq!(instance.size(), size);
        assert_eq!(instance.ty(), &byte);
    }

    assert!(rt.allocate(&byte, 8, 6).is_err());
    assert!(rt.allocate(&byte, usize::MAX, 7).is_err());
}

#[test]
fn test_zero_fill_config() {
    let rt = zeroed();
    let point = rt.resolve_str("Point").expect("Point");
    let instance = instance_of(&rt, &point);
    // SAFETY: zero-filled allocation.
    let bytes = unsafe { instance.as_bytes() };
    assert!(bytes.iter().all(|b| *b == 0));
}

#[test]
fn test_conditional_conformance() {
    let rt = zeroed();
    let equatable = CapabilityDescriptor::equatable();

    let boxed_int = rt.resolve_str("Box<Int>").expect("Box<Int>");
    assert!(rt.conformance(&boxed_int, equatable).is_some());

    let boxed_handle = rt.resolve_str("Box<Handle>").expect("Box<Handle>");
    assert!(rt.conformance(&boxed_handle, equatable).is_none());
    assert!(rt.conformance(&boxed_handle, equatable).is_none());

    let hashable = rt.registry().capability(HASHABLE).expect("Hashable").clone();
    let opt_int = rt.resolve_str("Optional<Int>").expect("Optional<Int>");
    let opt_point = rt.resolve_str("Optional<Point>").expect("Optional<Point>");
    let opt_box = rt.resolve_str("Optional<Box<Int>>").expect("Optional<Box<Int>>");
    assert!(rt.conformance(&opt_int, &hashable).is_some());
    assert!(rt.conformance(&opt_point, &hashable).is_some());
    assert!(rt.conformance(&opt_box, &hashable).is_none());
    assert!(rt.conformance(&opt_box, equatable).is_some());
}

#[test]
fn test_conformance_tables_are_stable() {
    let rt = zeroed();
    let point = rt.resolve_str("Point").expect("Point");
    let first = rt
        .conformance(&point, CapabilityDescriptor::equatable())
        .expect("Point is Equatable");
    let second = rt
        .conformance(&point, CapabilityDescriptor::equatable())
        .expect("Point is Equatable");
    assert!(first.ptr_eq(&second));
    assert_eq!(first.ty(), &point);

    let unknown = CapabilityDescriptor::new("Unregistered", Vec::new());
    assert!(rt.conformance(&point, &unknown).is_none());
    assert!(rt.stats().conformance_lookups.hits >= 1);
}

#[test]
fn test_memberwise_struct_equality() {
    let rt = zeroed();
    let point = rt.resolve_str("Point").expect("Point");
    let table = rt
        .conformance(&point, CapabilityDescriptor::equatable())
        .expect("Point is Equatable");
    let y = point.field("y").expect("y").offset;

    let mut a = instance_of(&rt, &point);
    let mut b = instance_of(&rt, &point);
    for instance in [&mut a, &mut b] {
        instance.write_bytes(0, &3i32.to_ne_bytes());
        instance.write_bytes(y, &(-7i32).to_ne_bytes());
    }
    // SAFETY: both points are fully written.
    assert!(unsafe { rt.equal(&a, &a, &point, &table) });
    assert!(unsafe { rt.equal(&a, &b, &point, &table) });

    b.write_bytes(y, &8i32.to_ne_bytes());
    assert!(!unsafe { rt.equal(&a, &b, &point, &table) });
}

#[test]
fn test_optional_equality_ignores_inactive_payload() {
    let rt = zeroed();
    let opt = rt.resolve_str("Optional<Int64>").expect("Optional<Int64>");
    let table = rt
        .conformance(&opt, CapabilityDescriptor::equatable())
        .expect("Optional<Int64> is Equatable");
    let TypeKind::Enum { tag_offset: Some(tag), .. } = opt.kind() else {
        panic!("Optional is a multi-case enum");
    };
    let none = opt.case_index("none").expect("none") as u8;
    let some = opt.case_index("some").expect("some") as u8;

    let mut a = instance_of(&rt, &opt);
    let mut b = instance_of(&rt, &opt);
    a.write_bytes(0, &1i64.to_ne_bytes());
    b.write_bytes(0, &2i64.to_ne_bytes());
    a.write_bytes(*tag, &[none]);
    b.write_bytes(*tag, &[none]);
    // SAFETY: tag and payload bytes are initialized (zero-filled).
    assert!(unsafe { rt.equal(&a, &b, &opt, &table) });

    a.write_bytes(*tag, &[some]);
    assert!(!unsafe { rt.equal(&a, &b, &opt, &table) });

    b.write_bytes(*tag, &[some]);
    assert!(!unsafe { rt.equal(&a, &b, &opt, &table) });

    b.write_bytes(0, &1i64.to_ne_bytes());
    assert!(unsafe { rt.equal(&a, &b, &opt, &table) });
}

#[test]
fn test_float_equality() {
    let rt = zeroed();
    let double = rt.resolve_str("Double").expect("Double");
    let table = rt
        .conformance(&double, CapabilityDescriptor::equatable())
        .expect("Double is Equatable");

    let mut a = instance_of(&rt, &double);
    let mut b = instance_of(&rt, &double);
    a.write(0.0f64);
    b.write(-0.0f64);
    // SAFETY: both doubles are written.
    assert!(unsafe { rt.equal(&a, &b, &double, &table) });

    a.write(f64::NAN);
    assert!(!unsafe { rt.equal(&a, &a, &double, &table) });
}

#[test]
fn test_value_type_uses_partial_eq() {
    let rt = zeroed();
    let tag = rt.resolve_str("Tag").expect("Tag");
    let table = rt
        .conformance(&tag, CapabilityDescriptor::equatable())
        .expect("Tag is Equatable");

    let mut a = instance_of(&rt, &tag);
    let mut b = instance_of(&rt, &tag);
    a.write(Tag(*b"ABCD"));
    b.write(Tag(*b"abcd"));
    // SAFETY: both tags are written.
    assert!(unsafe { rt.equal(&a, &b, &tag, &table) });

    b.write(Tag(*b"abce"));
    assert!(!unsafe { rt.equal(&a, &b, &tag, &table) });
}

#[test]
fn test_checked_equality_rejects_mismatches() {
    let rt = runtime(
        RuntimeConfig::default()
            .with_zero_fill(true)
            .with_checked_equality(true),
    );
    let int = rt.resolve_str("Int").expect("Int");
    let bool_ty = rt.resolve_str("Bool").expect("Bool");
    let handle = rt.resolve_str("Handle").expect("Handle");
    let int_table = rt
        .conformance(&int, CapabilityDescriptor::equatable())
        .expect("Int table");
    let bool_table = rt
        .conformance(&bool_ty, CapabilityDescriptor::equatable())
        .expect("Bool table");
    let describable = rt
        .registry()
        .capability("Describable")
        .expect("Describable")
        .clone();
    let marker = rt.conformance(&handle, &describable).expect("Handle table");
    assert!(marker.equality_witness().is_none());

    let a = instance_of(&rt, &int);
    let b = instance_of(&rt, &int);
    let flag = instance_of(&rt, &bool_ty);
    let h = instance_of(&rt, &handle);

    // SAFETY: all instances are zero-filled.
    unsafe {
        assert_eq!(rt.try_equal(&a, &b, &int, &int_table), Ok(true));
        assert!(matches!(
            rt.try_equal(&a, &flag, &int, &int_table),
            Err(EqualityError::TypeMismatch { .. })
        ));
        assert!(matches!(
            rt.try_equal(&a, &b, &int, &bool_table),
            Err(EqualityError::TableTypeMismatch { .. })
        ));
        assert!(matches!(
            rt.try_equal(&h, &h, &handle, &marker),
            Err(EqualityError::NotEquatable(name)) if name == "Describable"
        ));
        assert!(!rt.equal(&a, &b, &int, &bool_table));
        assert!(!dynrt::equal_raw(h.as_ptr(), h.as_ptr(), &handle, &marker));
    }
}

#[test]
fn test_checked_equality_rejects_short_storage() {
    let rt = runtime(RuntimeConfig::default().with_checked_equality(true));
    let int = rt.resolve_str("Int").expect("Int");
    let table = rt
        .conformance(&int, CapabilityDescriptor::equatable())
        .expect("Int table");

    let mut full = rt.allocate_for(&int).expect("full");
    let mut short = rt.allocate(&int, 1, int.alignment_mask()).expect("short");
    full.write(1isize);
    short.write_bytes(0, &[1]);
    assert!(short.capacity() < int.size());

    // SAFETY: the short instance is rejected before any read.
    unsafe {
        assert!(matches!(
            rt.try_equal(&full, &short, &int, &table),
            Err(EqualityError::Capacity { required, capacity: 1, .. }) if required == int.size()
        ));
        assert!(!rt.equal(&short, &full, &int, &table));
    }
}

#[test]
fn test_checked_equality_through_refining_table() {
    let rt = runtime(
        RuntimeConfig::default()
            .with_zero_fill(true)
            .with_checked_equality(true),
    );
    let point = rt.resolve_str("Point").expect("Point");
    let hashable = rt.registry().capability(HASHABLE).expect("Hashable").clone();
    let table = rt.conformance(&point, &hashable).expect("Point is Hashable");
    assert!(table.equality_witness().is_some());
    let y = point.field("y").expect("y").offset;

    let mut a = instance_of(&rt, &point);
    let mut b = instance_of(&rt, &point);
    a.write_bytes(y, &4i32.to_ne_bytes());
    b.write_bytes(y, &4i32.to_ne_bytes());
    // SAFETY: both points are zero-filled and written.
    unsafe {
        assert!(rt.equal(&a, &b, &point, &table));
        assert_eq!(rt.try_equal(&a, &b, &point, &table), Ok(true));
        b.write_bytes(0, &1i32.to_ne_bytes());
        assert!(!rt.equal(&a, &b, &point, &table));
        assert_eq!(rt.try_equal(&a, &b, &point, &table), Ok(false));
    }
}

#[test]
fn test_derived_hashable_requires_hashable_members() {
    let rt = zeroed();
    let equatable = CapabilityDescriptor::equatable();
    let hashable = rt.registry().capability(HASHABLE).expect("Hashable").clone();

    let boxed = rt.resolve_str("Box<Int>").expect("Box<Int>");
    assert!(rt.conformance(&boxed, &hashable).is_none());

    for name in ["Holder", "Slot"] {
        let ty = rt.resolve_str(name).expect(name);
        assert!(rt.conformance(&ty, &hashable).is_none(), "{name} is not Hashable");
        assert!(rt.conformance(&ty, equatable).is_some(), "{name} stays Equatable");
    }

    let point = rt.resolve_str("Point").expect("Point");
    assert!(rt.conformance(&point, &hashable).is_some());
}

#[test]
fn test_scope_arity_is_exact() {
    let rt = zeroed();
    let int = rt.resolve_str("Int").expect("Int");
    let bool_ty = rt.resolve_str("Bool").expect("Bool");
    let lengths = |k: usize| [0, k - 1, k + 1];
    let args = |n: usize| vec![int.clone(); n];

    // Global: a bare generic path takes its whole signature.
    let pair = rt
        .resolve_type(b"Pair", ResolveScope::Global, &[int.clone(), bool_ty.clone()])
        .expect("Pair<Int, Bool>");
    assert_eq!(pair.name(), "Pair<Int, Bool>");
    for n in lengths(2) {
        assert!(rt.resolve_type(b"Pair", ResolveScope::Global, &args(n)).is_none(), "{n}");
    }

    let context = rt.context("Pair").expect("Pair context");
    let second = rt
        .resolve_type(
            b"$q_",
            ResolveScope::Context(&context),
            &[int.clone(), bool_ty.clone()],
        )
        .expect("second parameter");
    assert_eq!(second, bool_ty);
    for n in lengths(2) {
        assert!(
            rt.resolve_type(b"$q_", ResolveScope::Context(&context), &args(n))
                .is_none(),
            "context with {n} arguments"
        );
    }

    let environment = GenericEnvironment::new(vec![1, 0, 2]);
    let name: &[u8] = b"Pair<$x, $qd0__>";
    let resolved = rt
        .resolve_type(
            name,
            ResolveScope::Environment(&environment),
            &[bool_ty.clone(), int.clone(), int.clone()],
        )
        .expect("environment");
    assert_eq!(resolved.name(), "Pair<Bool, Int>");
    for n in lengths(3) {
        assert!(
            rt.resolve_type(name, ResolveScope::Environment(&environment), &args(n))
                .is_none(),
            "environment with {n} arguments"
        );
    }
}

/// `Link1 { next: Link2 } .. Link70 { value: Int }`.
fn chain_runtime(depth: usize, config: RuntimeConfig) -> Runtime {
    let mut builder = dynrt::RegistryBuilder::new().with_standard_types();
    for i in 1..depth {
        let next = format!("Link{}", i + 1);
        builder = builder.declare(TypeDecl::structure(format!("Link{i}")).field("next", next));
    }
    builder = builder.declare(TypeDecl::structure(format!("Link{depth}")).field("value", "Int"));
    Runtime::with_config(Arc::new(builder.build().expect("registry")), config)
}

#[test]
fn test_depth_limit_does_not_depend_on_cache() {
    let config = RuntimeConfig::default()
        .with_name_cache_capacity(0)
        .with_max_resolution_depth(64);

    let rt = chain_runtime(70, config.clone());
    assert!(rt.resolve_str("Link1").is_none());
    let middle = rt.resolve_str("Link40").expect("31 levels fit");
    assert_eq!(middle.nesting_height(), 31);
    assert!(rt.resolve_str("Link1").is_none());
    assert!(rt.resolve_str("Link6").is_none());
    assert_eq!(rt.resolve_str("Link7").expect("64 levels").nesting_height(), 64);
    assert!(rt.resolve_str("Optional<Link7>").is_none());

    let warm_first = chain_runtime(70, config);
    assert!(warm_first.resolve_str("Link40").is_some());
    assert!(warm_first.resolve_str("Link1").is_none());
    assert!(warm_first.resolve_str("Link6").is_none());

    let roomy = chain_runtime(70, RuntimeConfig::default().with_max_resolution_depth(128));
    assert_eq!(roomy.resolve_str("Link1").expect("fits").nesting_height(), 70);
}

#[test]
fn test_strategy_for_partially_equatable_tuple() {
    let rt = zeroed();
    let tuple = rt.resolve_str("(Int32, Handle)").expect("tuple");
    assert!(rt
        .conformance(&tuple, CapabilityDescriptor::equatable())
        .is_none());

    let strategy = EqualityStrategy::for_type(&rt, &tuple);
    assert!(matches!(strategy, EqualityStrategy::Tuple(_)));
    assert!(strategy.is_comparable());

    let TypeKind::Tuple { elements } = tuple.kind() else {
        panic!("tuple kind");
    };
    let handle_offset = elements[1].offset;

    let mut a = instance_of(&rt, &tuple);
    let mut b = instance_of(&rt, &tuple);
    for instance in [&mut a, &mut b] {
        instance.write_bytes(0, &9i32.to_ne_bytes());
        instance.write_bytes(handle_offset, &[0xAB]);
    }
    // SAFETY: both tuples are zero-filled and written.
    assert!(unsafe { strategy.are_equal(a.as_ptr(), b.as_ptr()) });
    b.write_bytes(handle_offset, &[0xCD]);
    assert!(!unsafe { strategy.are_equal(a.as_ptr(), b.as_ptr()) });

    let boxed = rt.resolve_str("Box<Handle>").expect("Box<Handle>");
    assert!(!EqualityStrategy::for_type(&rt, &boxed).is_comparable());
}

#[test]
fn test_concurrent_resolution_uniques() {
    let rt = zeroed();
    let names = ["Optional<Box<Int>>", "(Int, Optional<Point>)", "Box<Optional<Double>>"];

    let results: Vec<Vec<TypeHandle>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    names
                        .iter()
                        .map(|name| rt.resolve_str(name).expect("resolves"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });

    for row in &results[1..] {
        for (a, b) in row.iter().zip(&results[0]) {
            assert_eq!(a.id(), b.id());
        }
    }
}
