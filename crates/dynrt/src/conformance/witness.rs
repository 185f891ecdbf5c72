// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conformance witnesses.
//!
//! A witness is the implementation half of a conformance: for the equality
//! capability it is an [`EquatableWitness`] that compares two raw values of
//! the conforming type. The built-in witnesses cover scalars (bitwise or IEEE
//! float), aggregates (memberwise) and enums (tag then payload).

use super::ConformanceTable;
use crate::equality::equal_raw;
use crate::metadata::TypeDescriptor;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Equality implementation over raw storage.
pub trait EquatableWitness: Send + Sync + fmt::Debug {
    /// Compare the values at `lhs` and `rhs`.
    ///
    /// # Safety
    ///
    /// Both pointers must reference initialized values of `ty`, aligned for
    /// it and readable for `ty.size()` bytes.
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, ty: &TypeDescriptor) -> bool;
}

/// Implementation attached to a conformance.
#[derive(Clone, Debug)]
pub enum Witness {
    Equatable(Arc<dyn EquatableWitness>),
    /// Conformance with no callable requirements.
    Marker,
}

impl Witness {
    pub fn equatable<W: EquatableWitness + 'static>(witness: W) -> Self {
        Self::Equatable(Arc::new(witness))
    }

    pub fn bitwise() -> Self {
        Self::equatable(BitwiseEquality)
    }

    pub fn float() -> Self {
        Self::equatable(FloatEquality)
    }

    pub fn is_equatable(&self) -> bool {
        matches!(self, Self::Equatable(_))
    }
}

/// Byte-for-byte comparison over `ty.size()` bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitwiseEquality;

impl EquatableWitness for BitwiseEquality {
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, ty: &TypeDescriptor) -> bool {
        let size = ty.size();
        // SAFETY: caller guarantees both pointers are readable for size bytes.
        unsafe {
            std::slice::from_raw_parts(lhs, size) == std::slice::from_raw_parts(rhs, size)
        }
    }
}

/// IEEE-754 comparison for 4- and 8-byte floats (NaN != NaN, -0 == +0).
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatEquality;

impl EquatableWitness for FloatEquality {
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, ty: &TypeDescriptor) -> bool {
        // SAFETY: caller guarantees initialized values of ty.size() bytes.
        unsafe {
            match ty.size() {
                4 => {
                    lhs.cast::<f32>().read_unaligned() == rhs.cast::<f32>().read_unaligned()
                }
                8 => {
                    lhs.cast::<f64>().read_unaligned() == rhs.cast::<f64>().read_unaligned()
                }
                other => {
                    log::debug!("[witness] {}-byte float, comparing bitwise", other);
                    BitwiseEquality.equal(lhs, rhs, ty)
                }
            }
        }
    }
}

/// Compares each stored member through its own equality table.
#[derive(Debug, Clone)]
pub struct MemberwiseEquality {
    members: Vec<(usize, ConformanceTable)>,
}

impl MemberwiseEquality {
    pub fn new(members: Vec<(usize, ConformanceTable)>) -> Self {
        Self { members }
    }
}

impl EquatableWitness for MemberwiseEquality {
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, _ty: &TypeDescriptor) -> bool {
        self.members.iter().all(|(offset, table)| {
            // SAFETY: offsets come from the layout of the enclosing type, so
            // each member value lies inside the caller-provided storage.
            unsafe { equal_raw(lhs.add(*offset), rhs.add(*offset), table.ty(), table) }
        })
    }
}

/// Compares the case tag, then the payload of the matching case.
#[derive(Debug, Clone)]
pub struct EnumEquality {
    tag_offset: Option<usize>,
    payloads: Vec<Option<ConformanceTable>>,
}

impl EnumEquality {
    pub fn new(tag_offset: Option<usize>, payloads: Vec<Option<ConformanceTable>>) -> Self {
        Self {
            tag_offset,
            payloads,
        }
    }
}

impl EquatableWitness for EnumEquality {
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, _ty: &TypeDescriptor) -> bool {
        let (lhs_tag, rhs_tag) = match self.tag_offset {
            // SAFETY: the tag byte lies inside the enum's storage.
            Some(offset) => unsafe { (*lhs.add(offset) as usize, *rhs.add(offset) as usize) },
            None => (0, 0),
        };
        if lhs_tag != rhs_tag {
            return false;
        }
        match self.payloads.get(lhs_tag) {
            Some(Some(table)) => {
                // SAFETY: payloads start at offset 0 of the enum's storage.
                unsafe { equal_raw(lhs, rhs, table.ty(), table) }
            }
            Some(None) => true,
            None => {
                log::debug!("[witness] enum tag {} out of range", lhs_tag);
                false
            }
        }
    }
}

/// Equality of a Rust value type through its `PartialEq`.
pub struct TypedEquality<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedEquality<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedEquality<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedEquality<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedEquality<{}>", std::any::type_name::<T>())
    }
}

impl<T: PartialEq + 'static> EquatableWitness for TypedEquality<T> {
    unsafe fn equal(&self, lhs: *const u8, rhs: *const u8, _ty: &TypeDescriptor) -> bool {
        // SAFETY: caller guarantees both pointers hold initialized, aligned T.
        unsafe { *lhs.cast::<T>() == *rhs.cast::<T>() }
    }
}
