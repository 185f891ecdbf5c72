// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolved type descriptors and the shared handle type.

use super::Layout;
use crate::registry::NominalDecl;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Process-unique identity of a resolved descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataId(pub(crate) u32);

impl MetadataId {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Stored member of a struct.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub name: String,
    pub ty: TypeHandle,
    pub offset: usize,
}

/// Stored element of a tuple.
#[derive(Debug, Clone)]
pub struct TupleElement {
    pub ty: TypeHandle,
    pub offset: usize,
}

/// Enum case; the payload (if any) lives at offset 0.
#[derive(Debug, Clone)]
pub struct CaseMetadata {
    pub name: String,
    pub payload: Option<TypeHandle>,
}

/// Structural shape of a resolved type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Opaque fixed-size value (integers, floats, raw pointers).
    Scalar,
    /// One machine pointer compared by identity.
    Reference,
    Struct {
        fields: Vec<FieldMetadata>,
    },
    /// Case index stored as one byte at `tag_offset`; no tag for
    /// single-case enums.
    Enum {
        cases: Vec<CaseMetadata>,
        tag_offset: Option<usize>,
    },
    Tuple {
        elements: Vec<TupleElement>,
    },
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Reference => "reference",
            Self::Struct { .. } => "struct",
            Self::Enum { .. } => "enum",
            Self::Tuple { .. } => "tuple",
        }
    }

    /// Types stored inline in a value of this kind.
    pub fn member_types(&self) -> Vec<&TypeHandle> {
        match self {
            Self::Scalar | Self::Reference => Vec::new(),
            Self::Struct { fields } => fields.iter().map(|f| &f.ty).collect(),
            Self::Enum { cases, .. } => cases.iter().filter_map(|c| c.payload.as_ref()).collect(),
            Self::Tuple { elements } => elements.iter().map(|e| &e.ty).collect(),
        }
    }
}

/// Longest chain of generic arguments and stored members below a type.
pub(crate) fn nesting_height(kind: &TypeKind, generic_args: &[TypeHandle]) -> usize {
    kind.member_types()
        .into_iter()
        .chain(generic_args)
        .map(|ty| ty.height.saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Immutable description of a concrete runtime type.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub(crate) id: MetadataId,
    pub(crate) name: Arc<str>,
    pub(crate) decl: Option<Arc<NominalDecl>>,
    pub(crate) generic_args: Vec<TypeHandle>,
    pub(crate) kind: TypeKind,
    pub(crate) layout: Layout,
    pub(crate) height: usize,
}

impl TypeDescriptor {
    pub fn id(&self) -> MetadataId {
        self.id
    }

    /// Canonical name, e.g. `Pair<Int, Bool>` or `(Int, Bool)`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration this type instantiates; `None` for tuples.
    pub fn decl(&self) -> Option<&Arc<NominalDecl>> {
        self.decl.as_ref()
    }

    /// Flattened generic arguments, outermost depth first.
    pub fn generic_args(&self) -> &[TypeHandle] {
        &self.generic_args
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Levels of generic arguments and members nested under this type;
    /// 0 for scalars and references.
    pub fn nesting_height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size
    }

    #[inline]
    pub fn alignment_mask(&self) -> usize {
        self.layout.alignment_mask()
    }

    /// Look up a struct field by name.
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        match &self.kind {
            TypeKind::Struct { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Index of an enum case by name.
    pub fn case_index(&self, name: &str) -> Option<usize> {
        match &self.kind {
            TypeKind::Enum { cases, .. } => cases.iter().position(|c| c.name == name),
            _ => None,
        }
    }
}

/// Shared, uniqued reference to a [`TypeDescriptor`].
///
/// Equality and hashing go through [`MetadataId`], so two handles compare
/// equal exactly when they denote the same resolved type.
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeDescriptor>);

impl TypeHandle {
    pub(crate) fn new(descriptor: TypeDescriptor) -> Self {
        Self(Arc::new(descriptor))
    }

    /// Borrowed raw pointer, valid while any handle to the descriptor lives.
    pub fn as_ptr(&self) -> *const TypeDescriptor {
        Arc::as_ptr(&self.0)
    }

    #[cfg(test)]
    pub(crate) fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Rebuild a handle from [`TypeHandle::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `as_ptr` on a handle whose descriptor is still
    /// alive (descriptors held by a metadata cache live as long as it does).
    pub unsafe fn from_ptr(ptr: *const TypeDescriptor) -> Self {
        // SAFETY: caller guarantees ptr came from Arc::as_ptr on a live Arc.
        unsafe {
            Arc::increment_strong_count(ptr);
            Self(Arc::from_raw(ptr))
        }
    }
}

impl Deref for TypeHandle {
    type Target = TypeDescriptor;

    fn deref(&self) -> &TypeDescriptor {
        &self.0
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({}#{})", self.0.name, self.0.id.0)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
