// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic parameter references (`$x`, `$q_`, `$qd__`, ...).

use super::scanner::ByteScanner;
use std::fmt;

/// Reference to a generic parameter by (depth, index).
///
/// Depth 0 is the outermost generic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenericParam {
    pub depth: usize,
    pub index: usize,
}

impl GenericParam {
    pub const fn new(depth: usize, index: usize) -> Self {
        Self { depth, index }
    }

    /// Parse the part following the `$` sigil.
    pub(crate) fn parse(scanner: &mut ByteScanner<'_>) -> Option<Self> {
        if scanner.scan(b'x') {
            return Some(Self::new(0, 0));
        }
        if !scanner.scan(b'q') {
            return None;
        }
        if scanner.scan(b'z') {
            return Some(Self::new(0, 0));
        }
        if scanner.scan(b'd') {
            let depth = parse_index(scanner)?;
            let index = parse_index(scanner)?;
            Some(Self::new(depth.checked_add(1)?, index))
        } else {
            let index = parse_index(scanner)?;
            Some(Self::new(0, index.checked_add(1)?))
        }
    }

    /// Parse a complete parameter reference, sigil included.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut scanner = ByteScanner::new(bytes);
        if !scanner.scan(b'$') {
            return None;
        }
        let param = Self::parse(&mut scanner)?;
        scanner.at_end().then_some(param)
    }
}

fn parse_index(scanner: &mut ByteScanner<'_>) -> Option<usize> {
    if scanner.scan(b'_') {
        return Some(0);
    }
    let value = scanner.scan_natural()?;
    if !scanner.scan(b'_') {
        return None;
    }
    value.checked_add(1)
}

fn write_index(f: &mut fmt::Formatter<'_>, value: usize) -> fmt::Result {
    match value {
        0 => f.write_str("_"),
        n => write!(f, "{}_", n - 1),
    }
}

impl fmt::Display for GenericParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.depth, self.index) {
            (0, 0) => f.write_str("$x"),
            (0, index) => {
                f.write_str("$q")?;
                write_index(f, index - 1)
            }
            (depth, index) => {
                f.write_str("$qd")?;
                write_index(f, depth - 1)?;
                write_index(f, index)
            }
        }
    }
}
