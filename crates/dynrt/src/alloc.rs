// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw, aligned, type-tagged instance storage.
//!
//! An [`Instance`] owns one heap block obtained from the global allocator.
//! The block is sized and aligned as requested and tagged with the type it
//! was allocated for. Dropping an `Instance` releases the block but never
//! runs a destructor for whatever value was written into it.

use crate::metadata::TypeHandle;
use crate::registry::TypeRegistry;
use crate::runtime::Runtime;
use std::alloc::Layout as AllocLayout;
use std::fmt;
use std::mem::{align_of, size_of, ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

/// Allocation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// `mask + 1` is not a power of two.
    InvalidAlignmentMask(usize),
    /// Size rounded up to the alignment exceeds `isize::MAX`.
    LayoutOverflow { size: usize, align: usize },
    /// The global allocator returned null.
    OutOfMemory { size: usize, align: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::InvalidAlignmentMask(mask) => {
                write!(f, "Alignment mask {:#x} is not 2^n - 1", mask)
            }
            AllocError::LayoutOverflow { size, align } => {
                write!(f, "Layout overflow (size={}, align={})", size, align)
            }
            AllocError::OutOfMemory { size, align } => {
                write!(f, "Out of memory (size={}, align={})", size, align)
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Layout for a request; zero-size requests get one byte.
pub(crate) fn request_layout(
    size: usize,
    alignment_mask: usize,
) -> Result<AllocLayout, AllocError> {
    let align = alignment_mask
        .checked_add(1)
        .filter(|a| a.is_power_of_two())
        .ok_or(AllocError::InvalidAlignmentMask(alignment_mask))?;
    let size = size.max(1);
    AllocLayout::from_size_align(size, align)
        .map_err(|_| AllocError::LayoutOverflow { size, align })
}

/// Owned, possibly uninitialized storage for one value of `ty`.
pub struct Instance {
    ptr: NonNull<u8>,
    layout: AllocLayout,
    requested: usize,
    ty: TypeHandle,
}

// SAFETY: an Instance uniquely owns its block; shared references only
// permit reads and mutation requires &mut.
unsafe impl Send for Instance {}
// SAFETY: see above.
unsafe impl Sync for Instance {}

impl Instance {
    /// Allocate `size` bytes aligned to `alignment_mask + 1`.
    pub fn allocate(
        ty: &TypeHandle,
        size: usize,
        alignment_mask: usize,
        zero_fill: bool,
    ) -> Result<Self, AllocError> {
        let layout = request_layout(size, alignment_mask)?;
        // SAFETY: request_layout never yields a zero-size layout.
        let raw = unsafe {
            if zero_fill {
                std::alloc::alloc_zeroed(layout)
            } else {
                std::alloc::alloc(layout)
            }
        };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            log::error!(
                "[alloc] allocation of {} bytes (align {}) for {} failed",
                layout.size(),
                layout.align(),
                ty.name()
            );
            AllocError::OutOfMemory {
                size: layout.size(),
                align: layout.align(),
            }
        })?;
        debug_assert_eq!(ptr.as_ptr() as usize & alignment_mask, 0);
        Ok(Self {
            ptr,
            layout,
            requested: size,
            ty: ty.clone(),
        })
    }

    /// Type the storage was allocated for.
    pub fn ty(&self) -> &TypeHandle {
        &self.ty
    }

    /// Requested size in bytes.
    pub fn size(&self) -> usize {
        self.requested
    }

    /// Usable capacity (at least one byte).
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub fn alignment_mask(&self) -> usize {
        self.layout.align() - 1
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Write `value` at offset 0.
    ///
    /// # Panics
    ///
    /// If `T` does not fit the block's size or alignment.
    pub fn write<T>(&mut self, value: T) {
        assert!(
            size_of::<T>() <= self.capacity() && align_of::<T>() <= self.layout.align(),
            "{} does not fit a {}-byte, {}-aligned instance",
            std::any::type_name::<T>(),
            self.capacity(),
            self.layout.align()
        );
        // SAFETY: size and alignment checked above; the block is owned.
        unsafe { self.ptr.as_ptr().cast::<T>().write(value) }
    }

    /// Copy `bytes` into the block at `offset`.
    ///
    /// # Panics
    ///
    /// If the range exceeds the block.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset.checked_add(bytes.len());
        assert!(
            end.is_some_and(|end| end <= self.capacity()),
            "write of {} bytes at {} exceeds {}-byte instance",
            bytes.len(),
            offset,
            self.capacity()
        );
        // SAFETY: bounds checked above; source and block cannot overlap
        // because the block is exclusively borrowed.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.ptr.as_ptr().add(offset),
                bytes.len(),
            )
        }
    }

    /// The block as possibly-uninitialized bytes.
    pub fn bytes_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: the block is valid for capacity() bytes and exclusively borrowed.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr().cast::<MaybeUninit<u8>>(),
                self.capacity(),
            )
        }
    }

    /// The block as initialized bytes.
    ///
    /// # Safety
    ///
    /// Every byte must have been written (or the block zero-filled).
    pub unsafe fn as_bytes(&self) -> &[u8] {
        // SAFETY: caller guarantees initialization.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity()) }
    }

    /// Reinterpret the block as a `T`.
    ///
    /// # Safety
    ///
    /// A valid `T` must have been written at offset 0.
    pub unsafe fn assume_init_ref<T>(&self) -> &T {
        debug_assert!(size_of::<T>() <= self.capacity());
        debug_assert!(align_of::<T>() <= self.layout.align());
        // SAFETY: caller guarantees a valid T lives at offset 0.
        unsafe { &*self.ptr.as_ptr().cast::<T>() }
    }

    /// Release ownership of the block without freeing it. The type tag is
    /// dropped; [`Instance::from_raw`] takes a fresh one.
    pub fn into_raw(self) -> NonNull<u8> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the handle is read out once.
        drop(unsafe { std::ptr::read(&this.ty) });
        this.ptr
    }

    /// Take back a block released by [`Instance::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` on an instance allocated with the
    /// same `size` and `alignment_mask`, and must not be reclaimed twice.
    pub unsafe fn from_raw(
        ptr: NonNull<u8>,
        ty: TypeHandle,
        size: usize,
        alignment_mask: usize,
    ) -> Result<Self, AllocError> {
        let layout = request_layout(size, alignment_mask)?;
        Ok(Self {
            ptr,
            layout,
            requested: size,
            ty,
        })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout and is owned.
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.ty)
            .field("ptr", &self.ptr)
            .field("size", &self.requested)
            .field("align", &self.layout.align())
            .finish()
    }
}

impl<R: TypeRegistry> Runtime<R> {
    /// Allocate storage for an instance of `ty`.
    ///
    /// The returned block is at least `size` bytes (one byte for zero-size
    /// requests), its address satisfies `addr & alignment_mask == 0`, and
    /// its bytes are uninitialized unless the runtime is configured with
    /// `zero_fill`.
    pub fn allocate(
        &self,
        ty: &TypeHandle,
        size: usize,
        alignment_mask: usize,
    ) -> Result<Instance, AllocError> {
        let zero_fill = self.config().zero_fill;
        Instance::allocate(ty, size, alignment_mask, zero_fill)
    }

    /// Allocate using the descriptor's own size and alignment.
    pub fn allocate_for(&self, ty: &TypeHandle) -> Result<Instance, AllocError> {
        self.allocate(ty, ty.size(), ty.alignment_mask())
    }
}
