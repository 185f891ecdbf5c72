// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conformance lookup: does a type implement a capability, and with what?
//!
//! Nominal types conform through the records in their declaration, subject
//! to conditional requirements on their generic arguments. `Derived`
//! records are synthesized from the type's structure: bitwise for scalars
//! and references, memberwise for structs, tag + payload for enums. Tuples
//! are Equatable when every element is.
//!
//! Answers (including negative ones) are memoized per (type, capability);
//! repeated queries return the same table.

mod capability;
mod witness;

pub use capability::{CapabilityDescriptor, CapabilityInfo, EQUATABLE};
pub use witness::{
    BitwiseEquality, EnumEquality, EquatableWitness, FloatEquality, MemberwiseEquality,
    TypedEquality, Witness,
};

use crate::metadata::{LookupStats, MetadataId, StatsCounter, TypeHandle, TypeKind};
use crate::registry::{TypeRegistry, WitnessSource};
use crate::runtime::Runtime;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub struct ConformanceRecord {
    ty: TypeHandle,
    capability: CapabilityDescriptor,
    witness: Witness,
}

/// Binding of one type to one capability, with its witness.
#[derive(Clone)]
pub struct ConformanceTable(Arc<ConformanceRecord>);

impl ConformanceTable {
    pub fn new(ty: TypeHandle, capability: CapabilityDescriptor, witness: Witness) -> Self {
        Self(Arc::new(ConformanceRecord {
            ty,
            capability,
            witness,
        }))
    }

    pub fn ty(&self) -> &TypeHandle {
        &self.0.ty
    }

    pub fn capability(&self) -> &CapabilityDescriptor {
        &self.0.capability
    }

    pub fn witness(&self) -> &Witness {
        &self.0.witness
    }

    /// Equality implementation, if this table carries one.
    pub fn equality_witness(&self) -> Option<&Arc<dyn EquatableWitness>> {
        match &self.0.witness {
            Witness::Equatable(w) => Some(w),
            Witness::Marker => None,
        }
    }

    /// Same underlying table.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_ptr(&self) -> *const ConformanceRecord {
        Arc::as_ptr(&self.0)
    }

    /// Rebuild a table from [`ConformanceTable::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `as_ptr` on a table that is still alive (tables
    /// memoized by a runtime live as long as it does).
    pub unsafe fn from_ptr(ptr: *const ConformanceRecord) -> Self {
        // SAFETY: caller guarantees ptr came from Arc::as_ptr on a live Arc.
        unsafe {
            Arc::increment_strong_count(ptr);
            Self(Arc::from_raw(ptr))
        }
    }
}

impl fmt::Debug for ConformanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConformanceTable({}: {})", self.0.ty.name(), self.0.capability)
    }
}

/// Memo of conformance answers keyed by (type, capability name).
#[derive(Debug, Default)]
pub(crate) struct ConformanceCache {
    entries: DashMap<(MetadataId, String), Option<ConformanceTable>>,
    stats: StatsCounter,
}

impl ConformanceCache {
    fn get(&self, ty: &TypeHandle, capability: &str) -> Option<Option<ConformanceTable>> {
        let hit = self
            .entries
            .get(&(ty.id(), capability.to_string()))
            .map(|entry| entry.value().clone());
        match hit {
            Some(_) => self.stats.hit(),
            None => self.stats.miss(),
        }
        hit
    }

    /// Store an answer unless one raced in first; returns the stored answer.
    fn insert(
        &self,
        ty: &TypeHandle,
        capability: &str,
        answer: Option<ConformanceTable>,
    ) -> Option<ConformanceTable> {
        self.entries
            .entry((ty.id(), capability.to_string()))
            .or_insert(answer)
            .value()
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn stats(&self) -> LookupStats {
        self.stats.snapshot()
    }
}

impl<R: TypeRegistry> Runtime<R> {
    /// Conformance table for `ty` implementing `capability`, or `None`.
    ///
    /// The capability is matched by name against the registry; capabilities
    /// the registry does not know have no conformers.
    pub fn conformance(
        &self,
        ty: &TypeHandle,
        capability: &CapabilityDescriptor,
    ) -> Option<ConformanceTable> {
        if let Some(answer) = self.conformances.get(ty, capability.name()) {
            return answer;
        }
        let answer = self.derive_conformance(ty, capability.name());
        if answer.is_none() {
            log::debug!("[conformance] {} does not conform to {}", ty.name(), capability);
        }
        self.conformances.insert(ty, capability.name(), answer)
    }

    fn derive_conformance(&self, ty: &TypeHandle, capability: &str) -> Option<ConformanceTable> {
        let capability = self.registry.capability(capability)?.clone();

        if let TypeKind::Tuple { elements } = ty.kind() {
            if capability.name() != EQUATABLE {
                return None;
            }
            let mut members = Vec::with_capacity(elements.len());
            for element in elements {
                let table = self.conformance(&element.ty, &capability)?;
                members.push((element.offset, table));
            }
            let witness = Witness::equatable(MemberwiseEquality::new(members));
            return Some(ConformanceTable::new(ty.clone(), capability, witness));
        }

        let decl = ty.decl()?;
        let record = decl.conformance(capability.name())?;
        for requirement in &record.requirements {
            let index = decl.signature().flat_index(requirement.param)?;
            let arg = ty.generic_args().get(index)?;
            let required = self.registry.capability(&requirement.capability)?;
            if self.conformance(arg, required).is_none() {
                log::debug!(
                    "[conformance] {}: {} requires {} to conform to {}",
                    ty.name(),
                    capability,
                    arg.name(),
                    required
                );
                return None;
            }
        }

        let witness = match &record.witness {
            WitnessSource::Provided(witness) => witness.clone(),
            WitnessSource::Derived if capability.implies_equality() => {
                self.derive_equality_witness(ty, &capability)?
            }
            WitnessSource::Derived => Witness::Marker,
        };
        Some(ConformanceTable::new(ty.clone(), capability, witness))
    }

    /// Structural equality for `ty`. Every stored member must itself
    /// conform to `capability` (a derived Hashable needs Hashable fields);
    /// the witness compares members through their Equatable tables.
    fn derive_equality_witness(
        &self,
        ty: &TypeHandle,
        capability: &CapabilityDescriptor,
    ) -> Option<Witness> {
        let equatable = CapabilityDescriptor::equatable();
        let member_table = |member: &TypeHandle| {
            if capability.name() != EQUATABLE && self.conformance(member, capability).is_none() {
                log::debug!(
                    "[conformance] {}: member {} does not conform to {}",
                    ty.name(),
                    member.name(),
                    capability
                );
                return None;
            }
            self.conformance(member, equatable)
        };
        match ty.kind() {
            TypeKind::Scalar | TypeKind::Reference => Some(Witness::bitwise()),
            TypeKind::Struct { fields } => {
                let mut members = Vec::with_capacity(fields.len());
                for field in fields {
                    members.push((field.offset, member_table(&field.ty)?));
                }
                Some(Witness::equatable(MemberwiseEquality::new(members)))
            }
            TypeKind::Enum { cases, tag_offset } => {
                let mut payloads = Vec::with_capacity(cases.len());
                for case in cases {
                    payloads.push(match &case.payload {
                        Some(payload) => Some(member_table(payload)?),
                        None => None,
                    });
                }
                Some(Witness::equatable(EnumEquality::new(*tag_offset, payloads)))
            }
            TypeKind::Tuple { .. } => None,
        }
    }
}
