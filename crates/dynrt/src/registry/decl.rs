// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nominal declarations.
//!
//! [`TypeDecl`] is what callers hand to the builder (member types still as
//! text); [`NominalDecl`] is the validated, immutable form stored in the
//! registry.

use crate::conformance::Witness;
use crate::mangling::{GenericParam, TypeName};
use crate::metadata::Layout;

/// Parameter counts per generic depth, outermost first.
///
/// Only generic levels contribute a depth: `Outer.Inner<U>` with a
/// non-generic `Outer` has a single depth holding `U`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GenericSignature {
    depths: Vec<usize>,
}

impl GenericSignature {
    pub fn new(depths: Vec<usize>) -> Self {
        Self { depths }
    }

    pub fn depths(&self) -> &[usize] {
        &self.depths
    }

    /// Total parameter count across all depths.
    pub fn total(&self) -> usize {
        self.depths.iter().sum()
    }

    /// Position of `param` in a flattened argument list.
    pub fn flat_index(&self, param: GenericParam) -> Option<usize> {
        let count = *self.depths.get(param.depth)?;
        if param.index >= count {
            return None;
        }
        Some(self.depths[..param.depth].iter().sum::<usize>() + param.index)
    }

    pub fn contains(&self, param: GenericParam) -> bool {
        self.flat_index(param).is_some()
    }

    pub(crate) fn nested(&self, own_params: usize) -> Self {
        let mut depths = self.depths.clone();
        if own_params > 0 {
            depths.push(own_params);
        }
        Self { depths }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeName,
}

#[derive(Debug, Clone)]
pub struct CaseDecl {
    pub name: String,
    pub payload: Option<TypeName>,
}

/// Storage shape of a declaration.
#[derive(Debug, Clone)]
pub enum DeclBody {
    Scalar(Layout),
    Reference,
    Struct(Vec<FieldDecl>),
    Enum(Vec<CaseDecl>),
}

/// `param: capability` condition on a conformance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericRequirement {
    pub param: GenericParam,
    pub capability: String,
}

/// Where a conformance gets its witness.
#[derive(Debug, Clone)]
pub enum WitnessSource {
    Provided(Witness),
    /// Synthesized from the type's structure on first query.
    Derived,
}

#[derive(Debug, Clone)]
pub struct ConformanceDecl {
    pub capability: String,
    pub requirements: Vec<GenericRequirement>,
    pub witness: WitnessSource,
}

/// Validated declaration held by a registry.
#[derive(Debug)]
pub struct NominalDecl {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) own_params: usize,
    pub(crate) signature: GenericSignature,
    pub(crate) body: DeclBody,
    pub(crate) conformances: Vec<ConformanceDecl>,
}

impl NominalDecl {
    /// Qualified name, e.g. `Outer.Inner`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path component.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Parameters introduced by this level (not by its parents).
    pub fn own_params(&self) -> usize {
        self.own_params
    }

    pub fn signature(&self) -> &GenericSignature {
        &self.signature
    }

    pub fn body(&self) -> &DeclBody {
        &self.body
    }

    pub fn conformances(&self) -> &[ConformanceDecl] {
        &self.conformances
    }

    pub fn conformance(&self, capability: &str) -> Option<&ConformanceDecl> {
        self.conformances.iter().find(|c| c.capability == capability)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum DeclShape {
    Scalar(Layout),
    Reference,
    Struct,
    Enum,
}

#[derive(Debug, Clone)]
pub(crate) struct MemberSpec {
    pub(crate) name: String,
    pub(crate) ty: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConformanceSpec {
    pub(crate) capability: String,
    pub(crate) requirements: Vec<(String, String)>,
    pub(crate) witness: WitnessSource,
}

/// Declaration request for [`RegistryBuilder`](super::RegistryBuilder).
///
/// ```rust
/// use dynrt::registry::TypeDecl;
///
/// let pair = TypeDecl::structure("Pair")
///     .generic(2)
///     .field("first", "$x")
///     .field("second", "$q_")
///     .conforms_where("Equatable", &[("$x", "Equatable"), ("$q_", "Equatable")]);
/// assert_eq!(pair.name(), "Pair");
/// ```
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub(crate) name: String,
    pub(crate) params: usize,
    pub(crate) shape: DeclShape,
    pub(crate) members: Vec<MemberSpec>,
    pub(crate) conformances: Vec<ConformanceSpec>,
}

impl TypeDecl {
    fn with_shape(name: impl Into<String>, shape: DeclShape) -> Self {
        Self {
            name: name.into(),
            params: 0,
            shape,
            members: Vec::new(),
            conformances: Vec::new(),
        }
    }

    /// Opaque fixed-layout value.
    pub fn scalar(name: impl Into<String>, layout: Layout) -> Self {
        Self::with_shape(name, DeclShape::Scalar(layout))
    }

    /// Pointer-sized reference compared by identity.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::with_shape(name, DeclShape::Reference)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::with_shape(name, DeclShape::Struct)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::with_shape(name, DeclShape::Enum)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of generic parameters this level introduces.
    pub fn generic(mut self, params: usize) -> Self {
        self.params = params;
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.members.push(MemberSpec {
            name: name.into(),
            ty: Some(ty.into()),
        });
        self
    }

    pub fn case(mut self, name: impl Into<String>) -> Self {
        self.members.push(MemberSpec {
            name: name.into(),
            ty: None,
        });
        self
    }

    pub fn case_with(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.members.push(MemberSpec {
            name: name.into(),
            ty: Some(payload.into()),
        });
        self
    }

    /// Unconditional conformance with a derived witness.
    pub fn conforms(self, capability: impl Into<String>) -> Self {
        self.conformance(capability, &[], WitnessSource::Derived)
    }

    /// Unconditional conformance with an explicit witness.
    pub fn conforms_with(self, capability: impl Into<String>, witness: Witness) -> Self {
        self.conformance(capability, &[], WitnessSource::Provided(witness))
    }

    /// Conditional conformance with a derived witness.
    pub fn conforms_where(
        self,
        capability: impl Into<String>,
        requirements: &[(&str, &str)],
    ) -> Self {
        self.conformance(capability, requirements, WitnessSource::Derived)
    }

    pub fn conformance(
        mut self,
        capability: impl Into<String>,
        requirements: &[(&str, &str)],
        witness: WitnessSource,
    ) -> Self {
        self.conformances.push(ConformanceSpec {
            capability: capability.into(),
            requirements: requirements
                .iter()
                .map(|(param, cap)| (param.to_string(), cap.to_string()))
                .collect(),
            witness,
        });
        self
    }
}
