// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type metadata.
//!
//! A [`TypeDescriptor`] is the resolved, immutable description of one
//! concrete type: canonical name, structural kind, flattened generic
//! arguments and [`Layout`]. Descriptors are uniqued by [`MetadataCache`] and
//! passed around as cheap [`TypeHandle`] clones.

mod cache;
mod descriptor;
mod layout;

pub use cache::{LookupStats, MetadataCache};
pub use descriptor::{
    CaseMetadata, FieldMetadata, MetadataId, TupleElement, TypeDescriptor, TypeHandle, TypeKind,
};
pub use layout::Layout;

pub(crate) use cache::StatsCounter;
pub(crate) use layout::LayoutBuilder;
