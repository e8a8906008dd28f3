// Copyright (c) 2025 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use core::ops::BitAnd;

/// A reference bit pattern together with the mask of bits that matter.
///
/// Bits outside `mask` are do-not-care: they are stored but never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedBits<T> {
    pub value: T,
    pub mask: T,
}

impl<T> MaskedBits<T>
where
    T: Copy + Eq + BitAnd<Output = T>,
{
    pub fn new(value: T, mask: T) -> Self {
        Self { value, mask }
    }

    /// `(candidate & mask) == (value & mask)`
    pub fn matches(&self, candidate: T) -> bool {
        (candidate & self.mask) == (self.value & self.mask)
    }
}
