// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type resolution: encoded name + scope + generic arguments -> descriptor.
//!
//! ## Scopes
//!
//! - [`ResolveScope::Global`]: no enclosing declaration. A bare path to a
//!   generic type (`Optional`) takes the arguments directly; otherwise the
//!   arguments bind the depth-0 parameters the name references (`$x`,
//!   `$q_`, ...), and exactly that many must be supplied.
//! - [`ResolveScope::Context`]: inside a nominal declaration. Arguments
//!   bind the declaration's whole signature and names are looked up
//!   lexically (`Ctx.Name`, then the parents of `Ctx`, then global).
//! - [`ResolveScope::Environment`]: an explicit signature (e.g. a generic
//!   function body). Arguments bind the signature; lookup is global.
//!
//! Resolution is pure: the same inputs give the same handle or `None`.
//! Results, including failures, are memoized in a bounded LRU.

use crate::error::{Error, Result};
use crate::mangling::{self, PathSegment, TypeName};
use crate::metadata::{
    CaseMetadata, FieldMetadata, Layout, LayoutBuilder, LookupStats, MetadataId, StatsCounter,
    TypeHandle, TypeKind,
};
use crate::registry::{DeclBody, GenericSignature, NominalDecl, TypeRegistry};
use crate::runtime::Runtime;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Enclosing nominal declaration used as a resolution scope.
#[derive(Debug, Clone)]
pub struct ContextDescriptor {
    decl: Arc<NominalDecl>,
}

impl ContextDescriptor {
    pub fn new(decl: Arc<NominalDecl>) -> Self {
        Self { decl }
    }

    pub fn decl(&self) -> &Arc<NominalDecl> {
        &self.decl
    }

    pub fn signature(&self) -> &GenericSignature {
        self.decl.signature()
    }
}

/// Explicit generic signature used as a resolution scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericEnvironment {
    signature: GenericSignature,
}

impl GenericEnvironment {
    /// Parameter counts per depth, outermost first.
    pub fn new(depths: Vec<usize>) -> Self {
        Self {
            signature: GenericSignature::new(depths),
        }
    }

    pub fn signature(&self) -> &GenericSignature {
        &self.signature
    }
}

/// Where a name is resolved.
#[derive(Debug, Clone, Copy)]
pub enum ResolveScope<'a> {
    Global,
    Context(&'a ContextDescriptor),
    Environment(&'a GenericEnvironment),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScopeKey {
    Global,
    Context(String),
    Environment(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NameKey {
    scope: ScopeKey,
    name: Box<[u8]>,
    args: Box<[MetadataId]>,
}

impl NameKey {
    fn new(scope: &ResolveScope<'_>, name: &[u8], args: &[TypeHandle]) -> Self {
        let scope = match scope {
            ResolveScope::Global => ScopeKey::Global,
            ResolveScope::Context(ctx) => ScopeKey::Context(ctx.decl().name().to_string()),
            ResolveScope::Environment(env) => {
                ScopeKey::Environment(env.signature().depths().to_vec())
            }
        };
        Self {
            scope,
            name: name.into(),
            args: args.iter().map(|a| a.id()).collect(),
        }
    }
}

/// Bounded memo of resolved names; capacity 0 disables it.
pub(crate) struct NameMemo {
    inner: Mutex<Option<LruCache<NameKey, Option<TypeHandle>>>>,
    stats: StatsCounter,
}

impl NameMemo {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new)),
            stats: StatsCounter::default(),
        }
    }

    fn get(&self, key: &NameKey) -> Option<Option<TypeHandle>> {
        let mut guard = self.inner.lock();
        let cache = guard.as_mut()?;
        match cache.get(key) {
            Some(answer) => {
                self.stats.hit();
                Some(answer.clone())
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    fn put(&self, key: NameKey, answer: Option<TypeHandle>) {
        if let Some(cache) = self.inner.lock().as_mut() {
            cache.put(key, answer);
        }
    }

    /// Drop all entries and switch to `capacity`.
    pub(crate) fn reset(&self, capacity: usize) {
        *self.inner.lock() = NonZeroUsize::new(capacity).map(LruCache::new);
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::len)
    }

    pub(crate) fn stats(&self) -> LookupStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for NameMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameMemo")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Bindings visible while resolving one name.
struct Env<'e> {
    context: Option<&'e Arc<NominalDecl>>,
    signature: &'e GenericSignature,
    args: &'e [TypeHandle],
}

struct Resolver<'rt, R: TypeRegistry> {
    runtime: &'rt Runtime<R>,
    max_depth: usize,
}

impl<R: TypeRegistry> Resolver<'_, R> {
    fn resolve_root(
        &self,
        name: &[u8],
        scope: &ResolveScope<'_>,
        args: &[TypeHandle],
    ) -> Option<TypeHandle> {
        let parsed = match mangling::parse(name) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::debug!(
                    "[resolver] cannot decode {:?}: {}",
                    String::from_utf8_lossy(name),
                    err
                );
                return None;
            }
        };
        match scope {
            ResolveScope::Global => self.resolve_global(&parsed, args),
            ResolveScope::Context(ctx) => {
                self.resolve_scoped(&parsed, Some(ctx.decl()), ctx.signature(), args)
            }
            ResolveScope::Environment(env) => {
                self.resolve_scoped(&parsed, None, env.signature(), args)
            }
        }
    }

    fn resolve_global(&self, name: &TypeName, args: &[TypeHandle]) -> Option<TypeHandle> {
        if name.is_bare_path() {
            let decl = name
                .qualified_path()
                .and_then(|path| self.runtime.registry.lookup(&path).cloned());
            if let Some(decl) = decl {
                if decl.signature().total() > 0 {
                    return self
                        .instantiate(&decl, args.to_vec(), 0)
                        .and_then(|ty| self.within_depth(ty, 0));
                }
            }
        }

        let mut params = Vec::new();
        name.referenced_params(&mut params);
        if let Some(param) = params.iter().find(|p| p.depth > 0) {
            log::debug!("[resolver] {}: parameter {} needs a generic scope", name, param);
            return None;
        }
        let arity = params.iter().map(|p| p.index + 1).max().unwrap_or(0);
        let signature = if arity > 0 {
            GenericSignature::new(vec![arity])
        } else {
            GenericSignature::default()
        };
        self.resolve_scoped(name, None, &signature, args)
    }

    fn resolve_scoped(
        &self,
        name: &TypeName,
        context: Option<&Arc<NominalDecl>>,
        signature: &GenericSignature,
        args: &[TypeHandle],
    ) -> Option<TypeHandle> {
        if args.len() != signature.total() {
            log::debug!(
                "[resolver] {}: scope expects {} generic arguments, got {}",
                name,
                signature.total(),
                args.len()
            );
            return None;
        }
        let env = Env {
            context,
            signature,
            args,
        };
        self.resolve(name, &env, 0)
    }

    fn resolve(&self, name: &TypeName, env: &Env<'_>, depth: usize) -> Option<TypeHandle> {
        if depth > self.max_depth {
            log::warn!(
                "[resolver] {} exceeds resolution depth {}",
                name,
                self.max_depth
            );
            return None;
        }
        let resolved = match name {
            TypeName::Param(param) => {
                let bound = env
                    .signature
                    .flat_index(*param)
                    .and_then(|index| env.args.get(index));
                if bound.is_none() {
                    log::debug!("[resolver] parameter {} is not bound in scope", param);
                }
                bound.cloned()
            }
            TypeName::Tuple(elements) => {
                let resolved = elements
                    .iter()
                    .map(|e| self.resolve(e, env, depth + 1))
                    .collect::<Option<Vec<_>>>()?;
                self.runtime.metadata.tuple(&resolved)
            }
            TypeName::Nominal(segments) => self.resolve_nominal(segments, env, depth),
        }?;
        self.within_depth(resolved, depth)
    }

    /// The limit applies to the resolved type's own nesting, so interned
    /// and freshly built descriptors are accepted or rejected alike.
    fn within_depth(&self, ty: TypeHandle, depth: usize) -> Option<TypeHandle> {
        if depth.saturating_add(ty.nesting_height()) > self.max_depth {
            log::warn!(
                "[resolver] {} nests {} levels below depth {}, limit is {}",
                ty.name(),
                ty.nesting_height(),
                depth,
                self.max_depth
            );
            return None;
        }
        Some(ty)
    }

    fn resolve_nominal(
        &self,
        segments: &[PathSegment],
        env: &Env<'_>,
        depth: usize,
    ) -> Option<TypeHandle> {
        let path = segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".");
        let Some((decl, inherited)) = self.lookup_lexical(&path, env) else {
            log::debug!("[resolver] unknown type {}", path);
            return None;
        };

        let chain = self.decl_chain(&decl)?;
        let explicit = chain.len().checked_sub(segments.len())?;
        let mut args: Vec<TypeHandle> = env.args.get(..inherited)?.to_vec();
        for (segment, level) in segments.iter().zip(&chain[explicit..]) {
            if segment.arg_count() != level.own_params() {
                log::debug!(
                    "[resolver] {} takes {} generic arguments, got {}",
                    level.name(),
                    level.own_params(),
                    segment.arg_count()
                );
                return None;
            }
            for arg in segment.args.iter().flatten() {
                args.push(self.resolve(arg, env, depth + 1)?);
            }
        }
        self.instantiate(&decl, args, depth)
    }

    /// Find `path` from the innermost context outwards; also returns how
    /// many leading arguments the enclosing levels supply.
    fn lookup_lexical(&self, path: &str, env: &Env<'_>) -> Option<(Arc<NominalDecl>, usize)> {
        let registry = &self.runtime.registry;
        let mut scope = env.context.cloned();
        while let Some(ctx) = scope {
            if let Some(decl) = registry.lookup(&format!("{}.{}", ctx.name(), path)) {
                return Some((Arc::clone(decl), ctx.signature().total()));
            }
            scope = ctx.parent().and_then(|p| registry.lookup(p)).cloned();
        }
        registry.lookup(path).map(|decl| (Arc::clone(decl), 0))
    }

    /// Declaration and its parents, outermost first.
    fn decl_chain(&self, decl: &Arc<NominalDecl>) -> Option<Vec<Arc<NominalDecl>>> {
        let mut chain = vec![Arc::clone(decl)];
        let mut next = decl.parent().map(str::to_string);
        while let Some(name) = next {
            let parent = Arc::clone(self.runtime.registry.lookup(&name)?);
            next = parent.parent().map(str::to_string);
            chain.push(parent);
        }
        chain.reverse();
        Some(chain)
    }

    fn instantiate(
        &self,
        decl: &Arc<NominalDecl>,
        args: Vec<TypeHandle>,
        depth: usize,
    ) -> Option<TypeHandle> {
        if args.len() != decl.signature().total() {
            log::debug!(
                "[resolver] {} takes {} generic arguments, got {}",
                decl.name(),
                decl.signature().total(),
                args.len()
            );
            return None;
        }
        let metadata = &self.runtime.metadata;
        if let Some(hit) = metadata.lookup_nominal(decl.name(), &args) {
            return Some(hit);
        }

        let env = Env {
            context: Some(decl),
            signature: decl.signature(),
            args: &args,
        };
        let (kind, layout) = match decl.body() {
            DeclBody::Scalar(layout) => (TypeKind::Scalar, *layout),
            DeclBody::Reference => (TypeKind::Reference, Layout::POINTER),
            DeclBody::Struct(fields) => {
                let mut builder = LayoutBuilder::new();
                let mut stored = Vec::with_capacity(fields.len());
                for field in fields {
                    let ty = self.resolve(&field.ty, &env, depth + 1)?;
                    let offset = builder.push(ty.layout())?;
                    stored.push(FieldMetadata {
                        name: field.name.clone(),
                        ty,
                        offset,
                    });
                }
                (TypeKind::Struct { fields: stored }, builder.finish()?)
            }
            DeclBody::Enum(cases) => {
                let mut payload_size = 0usize;
                let mut alignment = 1usize;
                let mut stored = Vec::with_capacity(cases.len());
                for case in cases {
                    let payload = match &case.payload {
                        Some(name) => Some(self.resolve(name, &env, depth + 1)?),
                        None => None,
                    };
                    if let Some(payload) = &payload {
                        payload_size = payload_size.max(payload.size());
                        alignment = alignment.max(payload.layout().alignment);
                    }
                    stored.push(CaseMetadata {
                        name: case.name.clone(),
                        payload,
                    });
                }
                let tag_offset = (cases.len() > 1).then_some(payload_size);
                let size = payload_size.checked_add(usize::from(tag_offset.is_some()))?;
                (
                    TypeKind::Enum {
                        cases: stored,
                        tag_offset,
                    },
                    Layout::new(size, alignment)?,
                )
            }
        };

        let name = self.canonical_name(decl, &args)?;
        Some(metadata.intern_nominal(decl, args, name, kind, layout))
    }

    /// `Outer<A>.Inner<B>` from a declaration and its flattened arguments.
    fn canonical_name(&self, decl: &Arc<NominalDecl>, args: &[TypeHandle]) -> Option<String> {
        let mut out = String::new();
        let mut rest = args;
        for (i, level) in self.decl_chain(decl)?.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(level.simple_name());
            let count = level.own_params();
            if count > 0 {
                let own = rest.get(..count)?;
                rest = &rest[count..];
                let names: Vec<&str> = own.iter().map(|a| a.name()).collect();
                out.push('<');
                out.push_str(&names.join(", "));
                out.push('>');
            }
        }
        Some(out)
    }
}

impl<R: TypeRegistry> Runtime<R> {
    /// Resolve an encoded type name.
    ///
    /// Returns `None` for malformed names, unknown symbols, arity
    /// mismatches and unbound parameters; the reason is logged at debug.
    pub fn resolve_type(
        &self,
        name: &[u8],
        scope: ResolveScope<'_>,
        args: &[TypeHandle],
    ) -> Option<TypeHandle> {
        let key = NameKey::new(&scope, name, args);
        if let Some(answer) = self.names.get(&key) {
            return answer;
        }

        let resolver = Resolver {
            runtime: self,
            max_depth: self.config().effective_max_resolution_depth(),
        };
        let answer = resolver.resolve_root(name, &scope, args);
        match &answer {
            Some(ty) => log::debug!(
                "[resolver] {} -> {:?}",
                String::from_utf8_lossy(name),
                ty
            ),
            None => log::debug!(
                "[resolver] {} did not resolve",
                String::from_utf8_lossy(name)
            ),
        }
        self.names.put(key, answer.clone());
        answer
    }

    /// Resolve a non-generic name in global scope.
    pub fn resolve_str(&self, name: &str) -> Option<TypeHandle> {
        self.resolve_type(name.as_bytes(), ResolveScope::Global, &[])
    }

    /// Like [`resolve_str`](Self::resolve_str), reporting failure as an error.
    pub fn require_type(&self, name: &str) -> Result<TypeHandle> {
        self.resolve_str(name)
            .ok_or_else(|| Error::UnresolvedType(name.to_string()))
    }

    /// Scope descriptor for a declared type.
    pub fn context(&self, name: &str) -> Option<ContextDescriptor> {
        self.registry
            .lookup(name)
            .map(|decl| ContextDescriptor::new(Arc::clone(decl)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryBuilder, TypeDecl};

    fn runtime() -> Runtime {
        let registry = RegistryBuilder::new()
            .with_standard_types()
            .declare(
                TypeDecl::structure("Pair")
                    .generic(2)
                    .field("first", "$x")
                    .field("second", "$q_"),
            )
            .declare(TypeDecl::structure("Outer").generic(1).field("value", "$x"))
            .declare(
                TypeDecl::structure("Outer.Inner")
                    .generic(1)
                    .field("outer", "$x")
                    .field("inner", "$qd__"),
            )
            .declare(TypeDecl::structure("Outer.Leaf").field("inner", "Inner<Bool>"))
            .declare(TypeDecl::structure("Node").field("next", "Node"))
            .build()
            .expect("registry");
        Runtime::new(Arc::new(registry))
    }

    #[test]
    fn test_resolve_scalar() {
        let rt = runtime();
        let int = rt.resolve_str("Int").expect("Int");
        assert_eq!(int.name(), "Int");
        assert_eq!(int.size(), std::mem::size_of::<isize>());
        assert!(matches!(int.kind(), TypeKind::Scalar));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let rt = runtime();
        let a = rt.resolve_str("Pair<Int, Bool>").expect("pair");
        let b = rt.resolve_str("Pair<Int,Bool>").expect("pair");
        assert_eq!(a.id(), b.id());
        assert_eq!(a.name(), "Pair<Int, Bool>");
        assert!(rt.resolve_str("NoSuchType<<>>").is_none());
        assert!(rt.resolve_str("NoSuchType<<>>").is_none());
    }

    #[test]
    fn test_struct_layout() {
        let rt = runtime();
        let pair = rt.resolve_str("Pair<Int8, Int64>").expect("pair");
        let second = pair.field("second").expect("second");
        assert_eq!(second.offset, 8);
        assert_eq!(pair.size(), 16);
        assert_eq!(pair.alignment_mask(), 7);
    }

    #[test]
    fn test_global_arity() {
        let rt = runtime();
        let int = rt.resolve_str("Int").expect("Int");
        let bool_ty = rt.resolve_str("Bool").expect("Bool");

        let bare = rt
            .resolve_type(b"Optional", ResolveScope::Global, &[int.clone()])
            .expect("bare generic");
        let spelled = rt.resolve_str("Optional<Int>").expect("spelled");
        assert_eq!(bare, spelled);

        let via_param = rt
            .resolve_type(b"Pair<$q_, $x>", ResolveScope::Global, &[int.clone(), bool_ty.clone()])
            .expect("params");
        assert_eq!(via_param.name(), "Pair<Bool, Int>");

        assert!(rt.resolve_type(b"Optional", ResolveScope::Global, &[]).is_none());
        assert!(rt
            .resolve_type(b"Optional<$x>", ResolveScope::Global, &[int.clone(), bool_ty])
            .is_none());
        assert!(rt.resolve_type(b"Int", ResolveScope::Global, &[int.clone()]).is_none());
        assert!(rt.resolve_type(b"$qd__", ResolveScope::Global, &[int]).is_none());
    }

    #[test]
    fn test_context_lookup() {
        let rt = runtime();
        let int = rt.resolve_str("Int").expect("Int");
        let bool_ty = rt.resolve_str("Bool").expect("Bool");
        let outer = rt.context("Outer").expect("Outer context");

        let inner = rt
            .resolve_type(b"Inner<Bool>", ResolveScope::Context(&outer), &[int.clone()])
            .expect("lexical inner");
        assert_eq!(inner.name(), "Outer<Int>.Inner<Bool>");
        assert_eq!(inner.generic_args(), &[int.clone(), bool_ty.clone()]);

        let qualified = rt
            .resolve_type(b"Outer<$x>.Inner<Bool>", ResolveScope::Context(&outer), &[int.clone()])
            .expect("qualified");
        assert_eq!(inner, qualified);

        let param = rt
            .resolve_type(b"$x", ResolveScope::Context(&outer), &[bool_ty])
            .expect("param");
        assert_eq!(param.name(), "Bool");

        assert!(rt.resolve_type(b"$x", ResolveScope::Context(&outer), &[]).is_none());
        assert!(rt.resolve_type(b"$q_", ResolveScope::Context(&outer), &[int]).is_none());
    }

    #[test]
    fn test_member_types_resolve_lexically() {
        let rt = runtime();
        let int = rt.resolve_str("Int").expect("Int");
        let leaf = rt
            .resolve_type(b"Outer.Leaf", ResolveScope::Global, &[int])
            .expect("leaf");
        assert_eq!(leaf.name(), "Outer<Int>.Leaf");
        let inner = leaf.field("inner").expect("inner field");
        assert_eq!(inner.ty.name(), "Outer<Int>.Inner<Bool>");
    }

    #[test]
    fn test_environment_scope() {
        let rt = runtime();
        let int = rt.resolve_str("Int").expect("Int");
        let bool_ty = rt.resolve_str("Bool").expect("Bool");
        let env = GenericEnvironment::new(vec![1, 1]);

        let pair = rt
            .resolve_type(
                b"Pair<$x, $qd__>",
                ResolveScope::Environment(&env),
                &[int.clone(), bool_ty],
            )
            .expect("pair");
        assert_eq!(pair.name(), "Pair<Int, Bool>");
        assert!(rt
            .resolve_type(b"$x", ResolveScope::Environment(&env), &[int])
            .is_none());
    }

    #[test]
    fn test_tuples() {
        let rt = runtime();
        let tuple = rt.resolve_str("(Int8, Int32)").expect("tuple");
        assert_eq!(tuple.name(), "(Int8, Int32)");
        assert_eq!(tuple.size(), 8);
        assert_eq!(rt.resolve_str("()").expect("unit").size(), 0);
    }

    #[test]
    fn test_optional_layout() {
        let rt = runtime();
        let opt = rt.resolve_str("Optional<Int64>").expect("optional");
        match opt.kind() {
            TypeKind::Enum { cases, tag_offset } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(*tag_offset, Some(8));
            }
            other => panic!("expected enum, got {}", other.name()),
        }
        assert_eq!(opt.size(), 9);
        assert_eq!(opt.layout().stride, 16);
        assert_eq!(opt.case_index("some"), Some(1));
    }

    #[test]
    fn test_infinite_type_is_rejected() {
        let rt = runtime();
        assert!(rt.resolve_str("Node").is_none());
    }

    #[test]
    fn test_segment_arity_mismatch() {
        let rt = runtime();
        assert!(rt.resolve_str("Pair<Int>").is_none());
        assert!(rt.resolve_str("Int<Int>").is_none());
    }

    #[test]
    fn test_name_memo_counts_hits() {
        let rt = runtime();
        rt.resolve_str("Int");
        rt.resolve_str("Int");
        assert!(rt.names.stats().hits >= 1);
        assert!(rt.names.len() >= 1);
        rt.names.reset(0);
        assert_eq!(rt.names.len(), 0);
        assert!(rt.resolve_str("Int").is_some());
    }

    #[test]
    fn test_require_type() {
        let rt = runtime();
        assert!(rt.require_type("Int").is_ok());
        assert!(matches!(
            rt.require_type("Missing"),
            Err(Error::UnresolvedType(name)) if name == "Missing"
        ));
    }
}
