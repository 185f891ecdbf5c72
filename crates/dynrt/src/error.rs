// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-level error type.
//!
//! Each module reports its own error enum; [`Error`] wraps them for callers
//! that chain several steps (load a manifest, build a runtime, resolve).

use crate::alloc::AllocError;
use crate::config::ConfigError;
use crate::equality::EqualityError;
use crate::mangling::MangleError;
use crate::registry::RegistryError;
use std::fmt;

/// Result type for dynrt operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Type name could not be decoded.
    Mangle(MangleError),
    /// Registry validation failed.
    Registry(RegistryError),
    /// Instance allocation failed.
    Alloc(AllocError),
    /// Checked equality rejected its operands.
    Equality(EqualityError),
    /// Runtime configuration could not be loaded.
    Config(ConfigError),
    /// I/O error with underlying cause.
    Io(std::io::Error),
    /// Registry manifest is malformed.
    Manifest(String),
    /// Name did not resolve in the requested scope.
    UnresolvedType(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mangle(e) => write!(f, "Invalid type name: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Alloc(e) => write!(f, "Allocation failed: {}", e),
            Error::Equality(e) => write!(f, "Equality check failed: {}", e),
            Error::Config(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Manifest(msg) => write!(f, "Invalid manifest: {}", msg),
            Error::UnresolvedType(name) => write!(f, "Type '{}' does not resolve", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Mangle(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Alloc(e) => Some(e),
            Error::Equality(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Manifest(_) | Error::UnresolvedType(_) => None,
        }
    }
}

impl From<MangleError> for Error {
    fn from(e: MangleError) -> Self {
        Error::Mangle(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<AllocError> for Error {
    fn from(e: AllocError) -> Self {
        Error::Alloc(e)
    }
}

impl From<EqualityError> for Error {
    fn from(e: EqualityError) -> Self {
        Error::Equality(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
