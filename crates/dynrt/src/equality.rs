// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Equality dispatch through conformance tables.
//!
//! [`equal_raw`] is the unchecked primitive: it trusts that both pointers
//! hold values of the table's type and hands them to the table's witness.
//! [`Runtime::try_equal`] validates instance tags and the table first, and
//! [`Runtime::equal`] does the same when `checked_equality` is configured.
//!
//! [`EqualityStrategy`] picks a comparison for an arbitrary type, falling
//! back to identity for references and element-wise comparison for tuples
//! that do not conform as a whole.

use crate::alloc::Instance;
use crate::conformance::{CapabilityDescriptor, ConformanceTable};
use crate::metadata::{TypeDescriptor, TypeHandle, TypeKind};
use crate::registry::TypeRegistry;
use crate::runtime::Runtime;
use std::fmt;

/// Compare two raw values through `table`.
///
/// Returns the witness result unmodified. A table without an equality
/// witness yields `false`.
///
/// # Safety
///
/// `lhs` and `rhs` must point to initialized values of `ty`, and `table` must
/// have been obtained for (`ty`, Equatable) or a refinement of it.
pub unsafe fn equal_raw(
    lhs: *const u8,
    rhs: *const u8,
    ty: &TypeDescriptor,
    table: &ConformanceTable,
) -> bool {
    match table.equality_witness() {
        // SAFETY: forwarded caller contract.
        Some(witness) => unsafe { witness.equal(lhs, rhs, ty) },
        None => {
            log::debug!(
                "[equality] table {} for {} has no equality witness",
                table.capability(),
                ty.name()
            );
            false
        }
    }
}

/// Checked-equality failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EqualityError {
    /// An instance is not tagged with the compared type.
    TypeMismatch { expected: String, found: String },
    /// The table was obtained for a different type.
    TableTypeMismatch { expected: String, found: String },
    /// The table's capability does not provide equality.
    NotEquatable(String),
    /// An instance's storage is smaller than a value of the compared type.
    Capacity {
        ty: String,
        required: usize,
        capacity: usize,
    },
}

impl fmt::Display for EqualityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EqualityError::TypeMismatch { expected, found } => {
                write!(f, "Instance of {} compared as {}", found, expected)
            }
            EqualityError::TableTypeMismatch { expected, found } => {
                write!(f, "Conformance table for {} used with {}", found, expected)
            }
            EqualityError::NotEquatable(capability) => {
                write!(f, "Capability {} provides no equality", capability)
            }
            EqualityError::Capacity {
                ty,
                required,
                capacity,
            } => write!(
                f,
                "Instance of {} holds {} bytes, values need {}",
                ty, capacity, required
            ),
        }
    }
}

impl std::error::Error for EqualityError {}

fn validate(
    lhs: &Instance,
    rhs: &Instance,
    ty: &TypeHandle,
    table: &ConformanceTable,
) -> Result<(), EqualityError> {
    for instance in [lhs, rhs] {
        if instance.ty() != ty {
            return Err(EqualityError::TypeMismatch {
                expected: ty.name().to_string(),
                found: instance.ty().name().to_string(),
            });
        }
        if instance.capacity() < ty.size() {
            return Err(EqualityError::Capacity {
                ty: ty.name().to_string(),
                required: ty.size(),
                capacity: instance.capacity(),
            });
        }
    }
    if table.ty() != ty {
        return Err(EqualityError::TableTypeMismatch {
            expected: ty.name().to_string(),
            found: table.ty().name().to_string(),
        });
    }
    if !table.capability().implies_equality() || table.equality_witness().is_none() {
        return Err(EqualityError::NotEquatable(
            table.capability().name().to_string(),
        ));
    }
    Ok(())
}

impl<R: TypeRegistry> Runtime<R> {
    /// Compare two instances of `ty` through `table`.
    ///
    /// With `checked_equality` on, mismatched tags or tables are logged and
    /// yield `false`.
    ///
    /// # Safety
    ///
    /// Both instances must hold initialized values of `ty`, and `table` must
    /// be the Equatable conformance of `ty`.
    pub unsafe fn equal(
        &self,
        lhs: &Instance,
        rhs: &Instance,
        ty: &TypeHandle,
        table: &ConformanceTable,
    ) -> bool {
        if self.config().checked_equality {
            if let Err(err) = validate(lhs, rhs, ty, table) {
                log::warn!("[equality] rejected comparison: {}", err);
                return false;
            }
        }
        // SAFETY: forwarded caller contract.
        unsafe { equal_raw(lhs.as_ptr(), rhs.as_ptr(), ty, table) }
    }

    /// Compare after validating tags, storage size, table type and
    /// capability.
    ///
    /// # Safety
    ///
    /// Both instances must hold initialized values; the type relationships
    /// are checked.
    pub unsafe fn try_equal(
        &self,
        lhs: &Instance,
        rhs: &Instance,
        ty: &TypeHandle,
        table: &ConformanceTable,
    ) -> Result<bool, EqualityError> {
        validate(lhs, rhs, ty, table)?;
        // SAFETY: types validated above; initialization is the caller's.
        Ok(unsafe { equal_raw(lhs.as_ptr(), rhs.as_ptr(), ty, table) })
    }
}

/// How to compare values of one type.
#[derive(Debug, Clone)]
pub enum EqualityStrategy {
    /// Not comparable; always unequal.
    None,
    /// Dispatch through an Equatable table.
    Witness(ConformanceTable),
    /// Compare this many bytes (reference identity).
    Bitwise(usize),
    /// Compare tuple elements at their offsets.
    Tuple(Vec<(usize, EqualityStrategy)>),
}

impl EqualityStrategy {
    pub fn for_type<R: TypeRegistry>(runtime: &Runtime<R>, ty: &TypeHandle) -> Self {
        if let Some(table) = runtime.conformance(ty, CapabilityDescriptor::equatable()) {
            return Self::Witness(table);
        }
        match ty.kind() {
            TypeKind::Reference => Self::Bitwise(ty.size()),
            TypeKind::Tuple { elements } => Self::Tuple(
                elements
                    .iter()
                    .map(|e| (e.offset, Self::for_type(runtime, &e.ty)))
                    .collect(),
            ),
            _ => Self::None,
        }
    }

    /// False when any part of the type has no comparison.
    pub fn is_comparable(&self) -> bool {
        match self {
            Self::None => false,
            Self::Witness(_) | Self::Bitwise(_) => true,
            Self::Tuple(elements) => elements.iter().all(|(_, s)| s.is_comparable()),
        }
    }

    /// Compare the values at `lhs` and `rhs`.
    ///
    /// # Safety
    ///
    /// Both pointers must hold initialized values of the type this strategy
    /// was built for.
    pub unsafe fn are_equal(&self, lhs: *const u8, rhs: *const u8) -> bool {
        match self {
            Self::None => false,
            // SAFETY: the table was obtained for the strategy's type.
            Self::Witness(table) => unsafe { equal_raw(lhs, rhs, table.ty(), table) },
            // SAFETY: both values span at least `size` bytes.
            Self::Bitwise(size) => unsafe {
                std::slice::from_raw_parts(lhs, *size) == std::slice::from_raw_parts(rhs, *size)
            },
            Self::Tuple(elements) => elements.iter().all(|(offset, strategy)| {
                // SAFETY: offsets come from the tuple layout.
                unsafe { strategy.are_equal(lhs.add(*offset), rhs.add(*offset)) }
            }),
        }
    }
}
