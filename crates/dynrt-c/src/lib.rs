// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dynrt C FFI Bindings
//!
//! C-compatible entry points over the process-wide [`Runtime`].
//!
//! Type, protocol and conformance pointers returned here are borrowed from
//! the global runtime and stay valid for the life of the process; they are
//! never freed by the caller. Contexts, environments and allocated objects
//! are owned by the caller and released with their `_destroy` /
//! `dynrt_dealloc_object` counterparts. NULL means "absent".
//!
//! # Usage from C
//!
//! ```c
//! const DynrtType* int_ty = dynrt_get_type_by_name_in_context("Int", 3, NULL, NULL, 0);
//! const DynrtConformance* eq = dynrt_conforms_to_protocol(
//!     int_ty, dynrt_get_equatable_protocol_descriptor());
//!
//! void* a = dynrt_alloc_object(int_ty, 8, 7);
//! void* b = dynrt_alloc_object(int_ty, 8, 7);
//! *(int64_t*)a = 42;
//! *(int64_t*)b = 42;
//! bool same = dynrt_equality_helper(a, b, int_ty, eq);
//!
//! dynrt_dealloc_object(a, int_ty, 8, 7);
//! dynrt_dealloc_object(b, int_ty, 8, 7);
//! ```
//!
//! # Safety
//!
//! All public functions are `unsafe` and require the caller to uphold the
//! invariants documented in each function's safety comment.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr::{self, NonNull};
use std::slice;

use dynrt::conformance::{CapabilityInfo, ConformanceRecord};
use dynrt::{
    equal_raw, CapabilityDescriptor, ConformanceTable, ContextDescriptor, GenericEnvironment,
    Instance, ResolveScope, Runtime, TypeDescriptor, TypeHandle, TypeRegistry,
};

/// Opaque handle to a type descriptor (borrowed from the runtime)
#[repr(C)]
pub struct DynrtType {
    _private: [u8; 0],
}

/// Opaque handle to a resolution context (a declared type)
#[repr(C)]
pub struct DynrtContext {
    _private: [u8; 0],
}

/// Opaque handle to a generic environment
#[repr(C)]
pub struct DynrtEnvironment {
    _private: [u8; 0],
}

/// Opaque handle to a protocol (capability) descriptor
#[repr(C)]
pub struct DynrtProtocol {
    _private: [u8; 0],
}

/// Opaque handle to a conformance table
#[repr(C)]
pub struct DynrtConformance {
    _private: [u8; 0],
}

/// Error codes for dynrt C API
///
/// # Error Code Ranges
///
/// - **0-9**: Generic errors
/// - **10-19**: Configuration errors
/// - **20-29**: I/O errors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynrtError {
    /// Operation completed successfully
    DynrtOk = 0,
    /// Invalid argument provided (null pointer, invalid value)
    DynrtInvalidArgument = 1,
    /// Requested resource not found
    DynrtNotFound = 2,
    /// Generic operation failure
    DynrtOperationFailed = 3,
    /// Memory allocation failed
    DynrtOutOfMemory = 4,

    // === Configuration errors (10-19) ===
    /// Invalid registry manifest or configuration
    DynrtConfigError = 10,
    /// The global runtime was already initialized
    DynrtAlreadyInitialized = 11,

    // === I/O errors (20-29) ===
    /// File could not be read
    DynrtIoError = 20,
}

/// Borrowed descriptor behind a C type pointer.
unsafe fn type_ref<'a>(ty: *const DynrtType) -> Option<&'a TypeDescriptor> {
    ty.cast::<TypeDescriptor>().as_ref()
}

unsafe fn type_handle(ty: *const DynrtType) -> Option<TypeHandle> {
    if ty.is_null() {
        return None;
    }
    Some(TypeHandle::from_ptr(ty.cast::<TypeDescriptor>()))
}

fn type_ptr(ty: &TypeHandle) -> *const DynrtType {
    ty.as_ptr().cast::<DynrtType>()
}

/// Collect `len` generic arguments; any NULL entry rejects the list.
unsafe fn generic_args(args: *const *const DynrtType, len: usize) -> Option<Vec<TypeHandle>> {
    if len == 0 {
        return Some(Vec::new());
    }
    if args.is_null() {
        return None;
    }
    slice::from_raw_parts(args, len)
        .iter()
        .map(|&arg| type_handle(arg))
        .collect()
}

unsafe fn name_bytes<'a>(name: *const c_char, len: usize) -> Option<&'a [u8]> {
    if name.is_null() {
        return None;
    }
    Some(slice::from_raw_parts(name.cast::<u8>(), len))
}

unsafe fn resolve(
    name: *const c_char,
    name_len: usize,
    scope: ResolveScope<'_>,
    args: *const *const DynrtType,
    args_len: usize,
) -> *const DynrtType {
    let Some(bytes) = name_bytes(name, name_len) else {
        return ptr::null();
    };
    let Some(args) = generic_args(args, args_len) else {
        log::debug!("[dynrt-c] NULL generic argument");
        return ptr::null();
    };
    Runtime::global()
        .resolve_type(bytes, scope, &args)
        .map_or(ptr::null(), |ty| type_ptr(&ty))
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve an encoded type name relative to a context.
///
/// # Safety
/// - `name` must point to `name_len` readable bytes (not necessarily
///   NUL-terminated).
/// - `context` must be NULL (global scope) or a handle from
///   `dynrt_context_new`.
/// - `args` must point to `args_len` type pointers from this API, or be
///   NULL when `args_len` is 0.
///
/// # Returns
/// Borrowed type pointer, or NULL when the name does not resolve.
#[no_mangle]
pub unsafe extern "C" fn dynrt_get_type_by_name_in_context(
    name: *const c_char,
    name_len: usize,
    context: *const DynrtContext,
    args: *const *const DynrtType,
    args_len: usize,
) -> *const DynrtType {
    let context = context.cast::<ContextDescriptor>().as_ref();
    let scope = context.map_or(ResolveScope::Global, ResolveScope::Context);
    resolve(name, name_len, scope, args, args_len)
}

/// Resolve an encoded type name within a generic environment.
///
/// # Safety
/// Same as [`dynrt_get_type_by_name_in_context`]; `environment` must be
/// NULL (global scope) or a handle from `dynrt_environment_new`.
#[no_mangle]
pub unsafe extern "C" fn dynrt_get_type_by_name_in_environment(
    name: *const c_char,
    name_len: usize,
    environment: *const DynrtEnvironment,
    args: *const *const DynrtType,
    args_len: usize,
) -> *const DynrtType {
    let environment = environment.cast::<GenericEnvironment>().as_ref();
    let scope = environment.map_or(ResolveScope::Global, ResolveScope::Environment);
    resolve(name, name_len, scope, args, args_len)
}

/// Create a resolution context for a declared type.
///
/// # Safety
/// - `name` must be a valid null-terminated C string (qualified name).
/// - The returned handle must be released with `dynrt_context_destroy`.
///
/// # Returns
/// Context handle, or NULL if no such type is declared.
#[no_mangle]
pub unsafe extern "C" fn dynrt_context_new(name: *const c_char) -> *mut DynrtContext {
    if name.is_null() {
        return ptr::null_mut();
    }
    let Ok(name_str) = CStr::from_ptr(name).to_str() else {
        return ptr::null_mut();
    };
    match Runtime::global().context(name_str) {
        Some(context) => Box::into_raw(Box::new(context)).cast::<DynrtContext>(),
        None => ptr::null_mut(),
    }
}

/// Destroy a context handle.
///
/// # Safety
/// - `context` must be a valid pointer returned from `dynrt_context_new`, or NULL.
/// - Must not be called more than once for the same handle.
#[no_mangle]
pub unsafe extern "C" fn dynrt_context_destroy(context: *mut DynrtContext) {
    if !context.is_null() {
        let _ = Box::from_raw(context.cast::<ContextDescriptor>());
    }
}

/// Create a generic environment from per-level parameter counts.
///
/// # Safety
/// - `depths` must point to `depths_len` readable values, or be NULL when
///   `depths_len` is 0.
/// - The returned handle must be released with `dynrt_environment_destroy`.
#[no_mangle]
pub unsafe extern "C" fn dynrt_environment_new(
    depths: *const usize,
    depths_len: usize,
) -> *mut DynrtEnvironment {
    let depths = if depths_len == 0 {
        Vec::new()
    } else if depths.is_null() {
        return ptr::null_mut();
    } else {
        slice::from_raw_parts(depths, depths_len).to_vec()
    };
    Box::into_raw(Box::new(GenericEnvironment::new(depths))).cast::<DynrtEnvironment>()
}

/// Destroy an environment handle.
///
/// # Safety
/// - `environment` must be a valid pointer returned from
///   `dynrt_environment_new`, or NULL.
/// - Must not be called more than once for the same handle.
#[no_mangle]
pub unsafe extern "C" fn dynrt_environment_destroy(environment: *mut DynrtEnvironment) {
    if !environment.is_null() {
        let _ = Box::from_raw(environment.cast::<GenericEnvironment>());
    }
}

// =============================================================================
// Allocation
// =============================================================================

/// Allocate uninitialized storage for an instance of `ty`.
///
/// # Safety
/// - `ty` must be a type pointer from this API.
/// - The block must be released with `dynrt_dealloc_object`, passing the
///   same type, size and alignment mask.
///
/// # Returns
/// Pointer aligned to `alignment_mask + 1`, or NULL on invalid mask or
/// allocation failure.
#[no_mangle]
pub unsafe extern "C" fn dynrt_alloc_object(
    ty: *const DynrtType,
    size: usize,
    alignment_mask: usize,
) -> *mut c_void {
    let Some(ty) = type_handle(ty) else {
        return ptr::null_mut();
    };
    match Runtime::global().allocate(&ty, size, alignment_mask) {
        Ok(instance) => instance.into_raw().as_ptr().cast::<c_void>(),
        Err(e) => {
            log::debug!("[dynrt-c] allocation for {} failed: {}", ty.name(), e);
            ptr::null_mut()
        }
    }
}

/// Release storage from `dynrt_alloc_object`.
///
/// # Safety
/// - `object` must come from `dynrt_alloc_object` with the same `ty`,
///   `size` and `alignment_mask`, or be NULL.
/// - Must not be called more than once for the same object.
#[no_mangle]
pub unsafe extern "C" fn dynrt_dealloc_object(
    object: *mut c_void,
    ty: *const DynrtType,
    size: usize,
    alignment_mask: usize,
) -> DynrtError {
    let Some(object) = NonNull::new(object.cast::<u8>()) else {
        return DynrtError::DynrtOk;
    };
    let Some(ty) = type_handle(ty) else {
        return DynrtError::DynrtInvalidArgument;
    };
    match Instance::from_raw(object, ty, size, alignment_mask) {
        Ok(instance) => {
            drop(instance);
            DynrtError::DynrtOk
        }
        Err(_) => DynrtError::DynrtInvalidArgument,
    }
}

// =============================================================================
// Conformance
// =============================================================================

/// Descriptor of the Equatable protocol.
///
/// # Safety
/// Always safe to call; marked `unsafe` for API uniformity.
#[no_mangle]
pub unsafe extern "C" fn dynrt_get_equatable_protocol_descriptor() -> *const DynrtProtocol {
    CapabilityDescriptor::equatable()
        .as_ptr()
        .cast::<DynrtProtocol>()
}

/// Descriptor of a named protocol in the global registry.
///
/// # Safety
/// - `name` must be a valid null-terminated C string.
///
/// # Returns
/// Borrowed protocol pointer, or NULL if the protocol is not registered.
#[no_mangle]
pub unsafe extern "C" fn dynrt_get_protocol_descriptor(
    name: *const c_char,
) -> *const DynrtProtocol {
    if name.is_null() {
        return ptr::null();
    }
    let Ok(name_str) = CStr::from_ptr(name).to_str() else {
        return ptr::null();
    };
    Runtime::global()
        .registry()
        .capability(name_str)
        .map_or(ptr::null(), |cap| cap.as_ptr().cast::<DynrtProtocol>())
}

/// Conformance table for `ty` implementing `protocol`.
///
/// # Safety
/// - `ty` must be a type pointer from this API.
/// - `protocol` must be a protocol pointer from this API.
///
/// # Returns
/// Borrowed table pointer, or NULL when `ty` does not conform.
#[no_mangle]
pub unsafe extern "C" fn dynrt_conforms_to_protocol(
    ty: *const DynrtType,
    protocol: *const DynrtProtocol,
) -> *const DynrtConformance {
    if protocol.is_null() {
        return ptr::null();
    }
    let Some(ty) = type_handle(ty) else {
        return ptr::null();
    };
    let capability = CapabilityDescriptor::from_ptr(protocol.cast::<CapabilityInfo>());
    Runtime::global()
        .conformance(&ty, &capability)
        .map_or(ptr::null(), |table| table.as_ptr().cast::<DynrtConformance>())
}

// =============================================================================
// Equality
// =============================================================================

/// Compare two values of `ty` through an Equatable conformance table.
///
/// # Safety
/// - `lhs` and `rhs` must point to initialized values of `ty`.
/// - `table` must come from `dynrt_conforms_to_protocol` for `ty` and
///   Equatable (or a protocol refining it).
///
/// # Returns
/// The witness result; `false` if any argument is NULL or the table has no
/// equality witness.
#[no_mangle]
pub unsafe extern "C" fn dynrt_equality_helper(
    lhs: *const c_void,
    rhs: *const c_void,
    ty: *const DynrtType,
    table: *const DynrtConformance,
) -> bool {
    if lhs.is_null() || rhs.is_null() || table.is_null() {
        return false;
    }
    let Some(descriptor) = type_ref(ty) else {
        return false;
    };
    let table = ConformanceTable::from_ptr(table.cast::<ConformanceRecord>());
    equal_raw(lhs.cast::<u8>(), rhs.cast::<u8>(), descriptor, &table)
}

// =============================================================================
// Introspection
// =============================================================================

/// Size of a value of `ty` in bytes (0 for NULL).
///
/// # Safety
/// `ty` must be a type pointer from this API, or NULL.
#[no_mangle]
pub unsafe extern "C" fn dynrt_type_size(ty: *const DynrtType) -> usize {
    type_ref(ty).map_or(0, TypeDescriptor::size)
}

/// Alignment mask of `ty` (0 for NULL).
///
/// # Safety
/// `ty` must be a type pointer from this API, or NULL.
#[no_mangle]
pub unsafe extern "C" fn dynrt_type_alignment_mask(ty: *const DynrtType) -> usize {
    type_ref(ty).map_or(0, TypeDescriptor::alignment_mask)
}

/// Copy the canonical name of `ty` into `buf` (NUL-terminated, truncated
/// to fit).
///
/// # Safety
/// - `ty` must be a type pointer from this API.
/// - `buf` must be writable for `buf_len` bytes, or NULL with `buf_len` 0.
///
/// # Returns
/// Length of the full name excluding the terminator (call with `buf_len`
/// 0 to size a buffer), or 0 for a NULL type.
#[no_mangle]
pub unsafe extern "C" fn dynrt_type_name(
    ty: *const DynrtType,
    buf: *mut c_char,
    buf_len: usize,
) -> usize {
    let Some(descriptor) = type_ref(ty) else {
        return 0;
    };
    let name = descriptor.name().as_bytes();
    if !buf.is_null() && buf_len > 0 {
        let copied = name.len().min(buf_len - 1);
        ptr::copy_nonoverlapping(name.as_ptr(), buf.cast::<u8>(), copied);
        *buf.add(copied) = 0;
    }
    name.len()
}

// =============================================================================
// Logging
// =============================================================================

/// Environment variable overriding the filter of `dynrt_logging_init`.
const ENV_LOG_FILTER: &str = "DYNRT_LOG";

/// Verbosity of the runtime's own log records.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynrtLogLevel {
    DynrtLogOff = 0,
    DynrtLogError = 1,
    DynrtLogWarn = 2,
    DynrtLogInfo = 3,
    DynrtLogDebug = 4,
    DynrtLogTrace = 5,
}

impl From<DynrtLogLevel> for log::LevelFilter {
    fn from(level: DynrtLogLevel) -> Self {
        match level {
            DynrtLogLevel::DynrtLogOff => log::LevelFilter::Off,
            DynrtLogLevel::DynrtLogError => log::LevelFilter::Error,
            DynrtLogLevel::DynrtLogWarn => log::LevelFilter::Warn,
            DynrtLogLevel::DynrtLogInfo => log::LevelFilter::Info,
            DynrtLogLevel::DynrtLogDebug => log::LevelFilter::Debug,
            DynrtLogLevel::DynrtLogTrace => log::LevelFilter::Trace,
        }
    }
}

/// Runtime records (`dynrt`, `dynrt_c`) at `level`; other crates at warn.
fn runtime_log_filter(level: log::LevelFilter) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,dynrt={level},dynrt_c={level}")
}

fn install_logger(mut builder: env_logger::Builder) -> DynrtError {
    match builder.format_timestamp_millis().try_init() {
        Ok(()) => {
            log::debug!("[dynrt-c] logging initialized");
            DynrtError::DynrtOk
        }
        Err(_) => DynrtError::DynrtAlreadyInitialized,
    }
}

/// Log resolution, conformance and allocation activity to stderr.
///
/// Only the runtime's records are raised to `level`; `DYNRT_LOG`, when
/// set, replaces the whole filter (env_logger syntax).
///
/// # Safety
/// Always safe to call; marked `unsafe` for API uniformity.
///
/// # Returns
/// `DynrtOk`, or `DynrtAlreadyInitialized` if a logger is installed.
///
/// # Example (C)
/// ```c
/// dynrt_logging_init(DYNRT_LOG_DEBUG);
/// ```
#[no_mangle]
pub unsafe extern "C" fn dynrt_logging_init(level: DynrtLogLevel) -> DynrtError {
    let filter = runtime_log_filter(level.into());
    install_logger(env_logger::Builder::from_env(
        env_logger::Env::new().filter_or(ENV_LOG_FILTER, filter),
    ))
}

/// Log with an explicit env_logger filter, e.g. `"dynrt::resolver=trace"`.
///
/// # Safety
/// - `filter` must be a valid NUL-terminated C string or NULL.
///
/// # Returns
/// `DynrtOk`, `DynrtInvalidArgument` for NULL or non-UTF-8 filters, or
/// `DynrtAlreadyInitialized`.
#[no_mangle]
pub unsafe extern "C" fn dynrt_logging_init_with_filter(filter: *const c_char) -> DynrtError {
    if filter.is_null() {
        return DynrtError::DynrtInvalidArgument;
    }
    let Ok(filter) = CStr::from_ptr(filter).to_str() else {
        return DynrtError::DynrtInvalidArgument;
    };
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter);
    install_logger(builder)
}

// =============================================================================
// Global runtime
// =============================================================================

/// Install a global runtime built from a YAML registry manifest.
///
/// Must run before any other call touches the global runtime. Runtime
/// settings come from the `DYNRT_*` environment variables.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
///
/// # Returns
/// `DynrtOk`, `DynrtIoError` / `DynrtConfigError` when the manifest cannot
/// be loaded, or `DynrtAlreadyInitialized`.
#[cfg(feature = "loaders")]
#[no_mangle]
pub unsafe extern "C" fn dynrt_load_manifest(path: *const c_char) -> DynrtError {
    if path.is_null() {
        return DynrtError::DynrtInvalidArgument;
    }
    let Ok(path_str) = CStr::from_ptr(path).to_str() else {
        return DynrtError::DynrtInvalidArgument;
    };

    let runtime = match Runtime::from_manifest(path_str, dynrt::RuntimeConfig::from_env()) {
        Ok(runtime) => runtime,
        Err(dynrt::Error::Io(e)) => {
            log::error!("[dynrt-c] cannot read manifest {}: {}", path_str, e);
            return DynrtError::DynrtIoError;
        }
        Err(e) => {
            log::error!("[dynrt-c] invalid manifest {}: {}", path_str, e);
            return DynrtError::DynrtConfigError;
        }
    };
    match Runtime::install_global(runtime) {
        Ok(_) => DynrtError::DynrtOk,
        Err(_) => DynrtError::DynrtAlreadyInitialized,
    }
}

/// dynrt version as a static NUL-terminated string.
///
/// # Safety
/// Always safe to call; marked `unsafe` for API uniformity.
#[no_mangle]
pub unsafe extern "C" fn dynrt_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr().cast::<c_char>()
}
