// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact type-name encoding.
//!
//! Decodes the byte strings handed to the resolver into a [`TypeName`] tree.
//!
//! # Grammar
//!
//! ```text
//! type    := param | tuple | path
//! param   := '$' ( 'x' | 'q' ( 'z' | 'd' index index | index ) )
//! index   := '_' | natural '_'
//! tuple   := '(' [ type (',' type)* ] ')'
//! path    := segment ('.' segment)*
//! segment := ident [ '<' type (',' type)* '>' ]
//! ```
//!
//! # Example
//!
//! ```rust
//! use dynrt::mangling::{parse, TypeName};
//!
//! let name = parse(b"Pair<Int, $x>").unwrap();
//! assert!(matches!(name, TypeName::Nominal(_)));
//! assert_eq!(name.to_string(), "Pair<Int, $x>");
//! ```

mod param;
mod scanner;

pub use param::GenericParam;
pub use scanner::ByteScanner;

use std::fmt;

/// Nesting limit for argument lists and tuples.
pub const MAX_NAME_NESTING: usize = 64;

/// Decoded type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    /// Dotted path to a nominal declaration, e.g. `Outer<Int>.Inner`.
    Nominal(Vec<PathSegment>),
    /// Generic parameter reference.
    Param(GenericParam),
    /// Tuple of element types; `()` is the empty tuple.
    Tuple(Vec<TypeName>),
}

/// One component of a nominal path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: String,
    /// Explicit generic arguments; `None` when the segment has no `<...>`.
    pub args: Option<Vec<TypeName>>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<TypeName>) -> Self {
        Self {
            name: name.into(),
            args: Some(args),
        }
    }

    /// Number of explicit arguments (0 without `<...>`).
    pub fn arg_count(&self) -> usize {
        self.args.as_ref().map_or(0, Vec::len)
    }
}

impl TypeName {
    /// Dotted path of a nominal name without arguments (`Outer.Inner`).
    pub fn qualified_path(&self) -> Option<String> {
        match self {
            Self::Nominal(segments) => Some(
                segments
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            _ => None,
        }
    }

    /// True for a nominal path with no `<...>` anywhere.
    pub fn is_bare_path(&self) -> bool {
        matches!(self, Self::Nominal(segments) if segments.iter().all(|s| s.args.is_none()))
    }

    /// Collect every generic parameter referenced by this name.
    pub fn referenced_params(&self, out: &mut Vec<GenericParam>) {
        match self {
            Self::Param(p) => out.push(*p),
            Self::Tuple(elements) => elements.iter().for_each(|e| e.referenced_params(out)),
            Self::Nominal(segments) => segments
                .iter()
                .filter_map(|s| s.args.as_ref())
                .flatten()
                .for_each(|a| a.referenced_params(out)),
        }
    }
}

/// Why a name failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MangleErrorKind {
    UnexpectedEnd,
    UnexpectedByte(u8),
    InvalidGenericParam,
    EmptyArgumentList,
    TooDeep,
    TrailingBytes,
}

/// Decode failure with the offset where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangleError {
    pub offset: usize,
    pub kind: MangleErrorKind,
}

impl fmt::Display for MangleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MangleErrorKind::UnexpectedEnd => {
                write!(f, "unexpected end of name at {}", self.offset)
            }
            MangleErrorKind::UnexpectedByte(b) => {
                write!(f, "unexpected byte 0x{:02x} at {}", b, self.offset)
            }
            MangleErrorKind::InvalidGenericParam => {
                write!(f, "malformed generic parameter at {}", self.offset)
            }
            MangleErrorKind::EmptyArgumentList => {
                write!(f, "empty generic argument list at {}", self.offset)
            }
            MangleErrorKind::TooDeep => {
                write!(f, "name nesting exceeds {} at {}", MAX_NAME_NESTING, self.offset)
            }
            MangleErrorKind::TrailingBytes => write!(f, "trailing bytes at {}", self.offset),
        }
    }
}

impl std::error::Error for MangleError {}

/// Decode a complete type name.
pub fn parse(bytes: &[u8]) -> Result<TypeName, MangleError> {
    let mut parser = Parser {
        scanner: ByteScanner::new(bytes),
        nesting: 0,
    };
    let name = parser.parse_type()?;
    if !parser.scanner.at_end() {
        return Err(parser.error(MangleErrorKind::TrailingBytes));
    }
    Ok(name)
}

struct Parser<'a> {
    scanner: ByteScanner<'a>,
    nesting: usize,
}

impl Parser<'_> {
    fn error(&self, kind: MangleErrorKind) -> MangleError {
        MangleError {
            offset: self.scanner.position(),
            kind,
        }
    }

    fn unexpected(&self) -> MangleError {
        match self.scanner.peek() {
            Some(b) => self.error(MangleErrorKind::UnexpectedByte(b)),
            None => self.error(MangleErrorKind::UnexpectedEnd),
        }
    }

    fn parse_type(&mut self) -> Result<TypeName, MangleError> {
        match self.scanner.peek() {
            Some(b'$') => {
                let start = self.scanner.position();
                self.scanner.scan(b'$');
                GenericParam::parse(&mut self.scanner)
                    .map(TypeName::Param)
                    .ok_or(MangleError {
                        offset: start,
                        kind: MangleErrorKind::InvalidGenericParam,
                    })
            }
            Some(b'(') => {
                self.scanner.scan(b'(');
                if self.scanner.scan(b')') {
                    return Ok(TypeName::Tuple(Vec::new()));
                }
                let elements = self.parse_list(b')')?;
                Ok(TypeName::Tuple(elements))
            }
            _ => self.parse_path(),
        }
    }

    fn parse_path(&mut self) -> Result<TypeName, MangleError> {
        let mut segments = Vec::new();
        loop {
            let name = self.scanner.scan_ident().ok_or_else(|| self.unexpected())?;
            let args = if self.scanner.scan(b'<') {
                if self.scanner.peek() == Some(b'>') {
                    return Err(self.error(MangleErrorKind::EmptyArgumentList));
                }
                Some(self.parse_list(b'>')?)
            } else {
                None
            };
            segments.push(PathSegment {
                name: name.to_string(),
                args,
            });
            if !self.scanner.scan(b'.') {
                break;
            }
        }
        Ok(TypeName::Nominal(segments))
    }

    /// Parse `type (',' type)* close`; the opening byte is already consumed.
    fn parse_list(&mut self, close: u8) -> Result<Vec<TypeName>, MangleError> {
        self.nesting += 1;
        if self.nesting > MAX_NAME_NESTING {
            return Err(self.error(MangleErrorKind::TooDeep));
        }
        let mut items = Vec::new();
        loop {
            self.scanner.skip_spaces();
            items.push(self.parse_type()?);
            self.scanner.skip_spaces();
            if self.scanner.scan(b',') {
                continue;
            }
            if self.scanner.scan(close) {
                break;
            }
            return Err(self.unexpected());
        }
        self.nesting -= 1;
        Ok(items)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeName]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(p) => write!(f, "{p}"),
            Self::Tuple(elements) => {
                f.write_str("(")?;
                write_list(f, elements)?;
                f.write_str(")")
            }
            Self::Nominal(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(&segment.name)?;
                    if let Some(args) = &segment.args {
                        f.write_str("<")?;
                        write_list(f, args)?;
                        f.write_str(">")?;
                    }
                }
                Ok(())
            }
        }
    }
}
