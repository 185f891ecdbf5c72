// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte cursor used by the type-name decoder.
//!
//! Works on an explicit-length slice: embedded NULs are ordinary bytes and
//! nothing ever scans for a terminator.

/// Forward-only cursor over an encoded name.
#[derive(Debug, Clone)]
pub struct ByteScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteScanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume `expected` if it is the next byte.
    pub fn scan(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume and return the next byte.
    pub fn scan_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume a run of ASCII digits.
    ///
    /// Returns `None` when no digit was present or the value overflows
    /// `usize`; the digits are consumed either way.
    pub fn scan_natural(&mut self) -> Option<usize> {
        let mut value: usize = 0;
        let mut scanned_any = false;
        let mut overflow = false;
        while let Some(byte) = self.peek().filter(u8::is_ascii_digit) {
            scanned_any = true;
            self.pos += 1;
            let digit = usize::from(byte - b'0');
            match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(next) => value = next,
                None => overflow = true,
            }
        }
        (scanned_any && !overflow).then_some(value)
    }

    /// Consume an identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn scan_ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.pos += 1,
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        // ASCII-only run, always valid UTF-8.
        std::str::from_utf8(&self.bytes[start..self.pos]).ok()
    }

    /// Skip ASCII spaces.
    pub fn skip_spaces(&mut self) {
        while self.scan(b' ') {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_natural() {
        let mut s = ByteScanner::new(b"1234_");
        assert_eq!(s.scan_natural(), Some(1234));
        assert!(s.scan(b'_'));
        assert!(s.at_end());
    }

    #[test]
    fn test_scan_natural_requires_digit() {
        let mut s = ByteScanner::new(b"_");
        assert_eq!(s.scan_natural(), None);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn test_scan_natural_overflow() {
        let mut s = ByteScanner::new(b"999999999999999999999999999999");
        assert_eq!(s.scan_natural(), None);
        assert!(s.at_end());
    }

    #[test]
    fn test_scan_ident_stops_at_punctuation() {
        let mut s = ByteScanner::new(b"Outer_1.Inner");
        assert_eq!(s.scan_ident(), Some("Outer_1"));
        assert!(s.scan(b'.'));
        assert_eq!(s.scan_ident(), Some("Inner"));
    }

    #[test]
    fn test_embedded_nul_is_a_regular_byte() {
        let mut s = ByteScanner::new(b"Int\0Garbage");
        assert_eq!(s.scan_ident(), Some("Int"));
        assert_eq!(s.peek(), Some(0));
        assert!(!s.at_end());
    }
}
