// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Size / alignment / stride triple and the aggregate layout algorithm.

/// Memory layout of a resolved type.
///
/// `alignment` is always a power of two and `stride` is `size` rounded up to
/// `alignment`, never less than 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    pub size: usize,
    pub alignment: usize,
    pub stride: usize,
}

impl Layout {
    /// Zero-sized, byte-aligned layout (empty tuple, payload-less enum).
    pub const EMPTY: Self = Self {
        size: 0,
        alignment: 1,
        stride: 1,
    };

    /// Layout of a reference (one machine pointer).
    pub const POINTER: Self = Self {
        size: std::mem::size_of::<usize>(),
        alignment: std::mem::align_of::<usize>(),
        stride: std::mem::size_of::<usize>(),
    };

    /// Build a layout; `None` if `alignment` is not a power of two or the
    /// stride overflows.
    pub fn new(size: usize, alignment: usize) -> Option<Self> {
        if !alignment.is_power_of_two() {
            return None;
        }
        let stride = round_up(size, alignment)?.max(1);
        Some(Self {
            size,
            alignment,
            stride,
        })
    }

    /// Naturally aligned scalar of `size` bytes.
    pub fn scalar(size: usize) -> Option<Self> {
        Self::new(size, size.max(1))
    }

    /// Layout of a Rust type.
    pub fn of<T>() -> Self {
        let size = std::mem::size_of::<T>();
        let alignment = std::mem::align_of::<T>();
        Self {
            size,
            alignment,
            stride: size.max(1),
        }
    }

    /// `alignment - 1`, the form the allocator takes.
    #[inline]
    pub fn alignment_mask(&self) -> usize {
        self.alignment - 1
    }
}

/// Round `value` up to a multiple of the power-of-two `align`.
#[inline]
pub(crate) fn round_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    Some(value.checked_add(align - 1)? & !(align - 1))
}

/// Sequential field placement with natural padding.
#[derive(Debug)]
pub(crate) struct LayoutBuilder {
    size: usize,
    alignment: usize,
}

impl LayoutBuilder {
    pub(crate) fn new() -> Self {
        Self {
            size: 0,
            alignment: 1,
        }
    }

    /// Place a member and return its offset.
    pub(crate) fn push(&mut self, member: &Layout) -> Option<usize> {
        let offset = round_up(self.size, member.alignment)?;
        self.size = offset.checked_add(member.size)?;
        self.alignment = self.alignment.max(member.alignment);
        Some(offset)
    }

    pub(crate) fn finish(self) -> Option<Layout> {
        Layout::new(self.size, self.alignment)
    }
}
