// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry assembly and validation.

use super::decl::{ConformanceSpec, DeclShape, MemberSpec};
use super::{
    standard, CaseDecl, ConformanceDecl, DeclBody, FieldDecl, GenericRequirement,
    GenericSignature, HashMapTypeRegistry, NominalDecl, RegistryError, TypeDecl, WitnessSource,
};
use crate::conformance::{CapabilityDescriptor, TypedEquality, Witness, EQUATABLE};
use crate::mangling::{self, ByteScanner, GenericParam, TypeName};
use crate::metadata::Layout;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Collects declarations and validates them into a [`HashMapTypeRegistry`].
///
/// The `Equatable` capability is always present. Declarations may be added
/// in any order; parents are resolved at [`build`](Self::build) time.
#[derive(Debug)]
pub struct RegistryBuilder {
    capabilities: Vec<(String, Vec<String>)>,
    types: Vec<TypeDecl>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: vec![(EQUATABLE.to_string(), Vec::new())],
            types: Vec::new(),
        }
    }

    /// Declare a capability refining `inherits`.
    #[must_use]
    pub fn capability(mut self, name: impl Into<String>, inherits: &[&str]) -> Self {
        self.capabilities.push((
            name.into(),
            inherits.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    #[must_use]
    pub fn declare(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    /// Register a Rust value type compared with its `PartialEq`.
    #[must_use]
    pub fn value_type<T: PartialEq + 'static>(self, name: impl Into<String>) -> Self {
        self.declare(
            TypeDecl::scalar(name, Layout::of::<T>())
                .conforms_with(EQUATABLE, Witness::equatable(TypedEquality::<T>::new())),
        )
    }

    /// Add the standard prelude (integers, floats, `Optional`, `Hashable`).
    #[must_use]
    pub fn with_standard_types(self) -> Self {
        standard::install(self)
    }

    pub fn build(self) -> Result<HashMapTypeRegistry, RegistryError> {
        let capabilities = build_capabilities(self.capabilities)?;

        let mut pending = self.types;
        pending.sort_by_key(|d| d.name.split('.').count());

        let mut types: HashMap<String, Arc<NominalDecl>> = HashMap::with_capacity(pending.len());
        for spec in pending {
            if !is_qualified_name(&spec.name) {
                return Err(RegistryError::InvalidName(spec.name));
            }
            if types.contains_key(&spec.name) {
                return Err(RegistryError::DuplicateType(spec.name));
            }
            let (parent, signature) = match spec.name.rsplit_once('.') {
                Some((parent, _)) => {
                    let decl = types.get(parent).ok_or_else(|| RegistryError::UnknownParent {
                        decl: spec.name.clone(),
                        parent: parent.to_string(),
                    })?;
                    (
                        Some(parent.to_string()),
                        decl.signature().nested(spec.params),
                    )
                }
                None => (None, GenericSignature::default().nested(spec.params)),
            };

            let body = build_body(&spec.name, &spec.shape, &spec.members, &signature)?;
            let conformances =
                build_conformances(&spec.name, &spec.conformances, &signature, &capabilities)?;

            log::debug!(
                "[registry] declared {} (params={}, conformances={})",
                spec.name,
                spec.params,
                conformances.len()
            );
            types.insert(
                spec.name.clone(),
                Arc::new(NominalDecl {
                    name: spec.name,
                    parent,
                    own_params: spec.params,
                    signature,
                    body,
                    conformances,
                }),
            );
        }

        log::debug!(
            "[registry] built {} types, {} capabilities",
            types.len(),
            capabilities.len()
        );
        Ok(HashMapTypeRegistry {
            types,
            capabilities,
        })
    }
}

fn is_identifier(text: &str) -> bool {
    let mut scanner = ByteScanner::new(text.as_bytes());
    scanner.scan_ident().is_some() && scanner.at_end()
}

fn is_qualified_name(text: &str) -> bool {
    text.split('.').all(is_identifier)
}

fn build_capabilities(
    declared: Vec<(String, Vec<String>)>,
) -> Result<HashMap<String, CapabilityDescriptor>, RegistryError> {
    let mut direct: HashMap<String, Vec<String>> = HashMap::with_capacity(declared.len());
    for (name, inherits) in declared {
        if !is_identifier(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if direct.contains_key(&name) {
            return Err(RegistryError::DuplicateCapability(name));
        }
        direct.insert(name, inherits);
    }

    for (name, inherits) in &direct {
        if let Some(missing) = inherits.iter().find(|base| !direct.contains_key(*base)) {
            return Err(RegistryError::UnknownCapability {
                decl: name.clone(),
                capability: missing.clone(),
            });
        }
    }

    let mut out = HashMap::with_capacity(direct.len());
    for (name, inherits) in &direct {
        let bases = refinement_closure(name, &direct)?;
        let descriptor = if name == EQUATABLE {
            CapabilityDescriptor::equatable().clone()
        } else {
            CapabilityDescriptor::with_bases(name.clone(), inherits.clone(), bases)
        };
        out.insert(name.clone(), descriptor);
    }
    Ok(out)
}

fn refinement_closure(
    start: &str,
    direct: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>, RegistryError> {
    let mut stack: Vec<&String> = direct.get(start).into_iter().flatten().collect();
    let mut visited: Vec<String> = Vec::new();
    while let Some(base) = stack.pop() {
        if base == start {
            return Err(RegistryError::CyclicRefinement(start.to_string()));
        }
        if visited.contains(base) {
            continue;
        }
        visited.push(base.clone());
        stack.extend(direct.get(base.as_str()).into_iter().flatten());
    }
    visited.sort();
    Ok(visited)
}

fn parse_member_type(
    decl: &str,
    text: &str,
    signature: &GenericSignature,
) -> Result<TypeName, RegistryError> {
    let name = mangling::parse(text.as_bytes()).map_err(|source| {
        RegistryError::InvalidTypeName {
            decl: decl.to_string(),
            text: text.to_string(),
            source,
        }
    })?;
    let mut params = Vec::new();
    name.referenced_params(&mut params);
    if let Some(param) = params.into_iter().find(|p| !signature.contains(*p)) {
        return Err(RegistryError::ParamOutOfRange {
            decl: decl.to_string(),
            param,
        });
    }
    Ok(name)
}

fn invalid_member(decl: &str, member: &str, reason: &'static str) -> RegistryError {
    RegistryError::InvalidMember {
        decl: decl.to_string(),
        member: member.to_string(),
        reason,
    }
}

fn build_body(
    decl: &str,
    shape: &DeclShape,
    members: &[MemberSpec],
    signature: &GenericSignature,
) -> Result<DeclBody, RegistryError> {
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !is_identifier(&member.name) {
            return Err(invalid_member(decl, &member.name, "is not an identifier"));
        }
        if !seen.insert(member.name.as_str()) {
            return Err(invalid_member(decl, &member.name, "is declared twice"));
        }
    }

    match shape {
        DeclShape::Scalar(_) | DeclShape::Reference => {
            if let Some(member) = members.first() {
                return Err(invalid_member(decl, &member.name, "on a type without members"));
            }
            Ok(match shape {
                DeclShape::Scalar(layout) => DeclBody::Scalar(*layout),
                _ => DeclBody::Reference,
            })
        }
        DeclShape::Struct => {
            let mut fields = Vec::with_capacity(members.len());
            for member in members {
                let text = member
                    .ty
                    .as_deref()
                    .ok_or_else(|| invalid_member(decl, &member.name, "has no type"))?;
                fields.push(FieldDecl {
                    name: member.name.clone(),
                    ty: parse_member_type(decl, text, signature)?,
                });
            }
            Ok(DeclBody::Struct(fields))
        }
        DeclShape::Enum => {
            let mut cases = Vec::with_capacity(members.len());
            for member in members {
                let payload = match member.ty.as_deref() {
                    Some(text) => Some(parse_member_type(decl, text, signature)?),
                    None => None,
                };
                cases.push(CaseDecl {
                    name: member.name.clone(),
                    payload,
                });
            }
            if cases.len() > usize::from(u8::MAX) + 1 {
                return Err(invalid_member(decl, &cases[0].name, "exceeds 256 cases"));
            }
            Ok(DeclBody::Enum(cases))
        }
    }
}

fn build_conformances(
    decl: &str,
    specs: &[ConformanceSpec],
    signature: &GenericSignature,
    capabilities: &HashMap<String, CapabilityDescriptor>,
) -> Result<Vec<ConformanceDecl>, RegistryError> {
    let unknown = |capability: &str| RegistryError::UnknownCapability {
        decl: decl.to_string(),
        capability: capability.to_string(),
    };

    let mut out: Vec<ConformanceDecl> = Vec::with_capacity(specs.len());
    for spec in specs {
        let capability = capabilities
            .get(&spec.capability)
            .ok_or_else(|| unknown(&spec.capability))?;
        if out.iter().any(|c| c.capability == spec.capability) {
            return Err(RegistryError::DuplicateConformance {
                decl: decl.to_string(),
                capability: spec.capability.clone(),
            });
        }
        let compatible = match &spec.witness {
            WitnessSource::Provided(witness) => {
                witness.is_equatable() == capability.implies_equality()
            }
            WitnessSource::Derived => true,
        };
        if !compatible {
            return Err(RegistryError::IncompatibleWitness {
                decl: decl.to_string(),
                capability: spec.capability.clone(),
            });
        }

        let mut requirements = Vec::with_capacity(spec.requirements.len());
        for (text, required) in &spec.requirements {
            let param = GenericParam::from_bytes(text.as_bytes()).ok_or_else(|| {
                RegistryError::InvalidRequirement {
                    decl: decl.to_string(),
                    text: text.clone(),
                }
            })?;
            if !signature.contains(param) {
                return Err(RegistryError::ParamOutOfRange {
                    decl: decl.to_string(),
                    param,
                });
            }
            if !capabilities.contains_key(required) {
                return Err(unknown(required));
            }
            requirements.push(GenericRequirement {
                param,
                capability: required.clone(),
            });
        }

        out.push(ConformanceDecl {
            capability: spec.capability.clone(),
            requirements,
            witness: spec.witness.clone(),
        });
    }

    // Conforming to a refinement implies its bases.
    let declared = out.len();
    for i in 0..declared {
        let source = out[i].clone();
        let Some(capability) = capabilities.get(&source.capability) else {
            continue;
        };
        for base in capability.bases() {
            if out.iter().any(|c| &c.capability == base) {
                continue;
            }
            let base_is_equality = capabilities
                .get(base)
                .is_some_and(CapabilityDescriptor::implies_equality);
            let witness = match (&source.witness, base_is_equality) {
                (WitnessSource::Provided(w @ Witness::Equatable(_)), true) => {
                    WitnessSource::Provided(w.clone())
                }
                (WitnessSource::Provided(_), false) => WitnessSource::Provided(Witness::Marker),
                _ => WitnessSource::Derived,
            };
            out.push(ConformanceDecl {
                capability: base.clone(),
                requirements: source.requirements.clone(),
                witness,
            });
        }
    }
    Ok(out)
}
