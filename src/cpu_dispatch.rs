// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Support for CPU implementations of compute shaders.

use std::cell::{RefCell, RefMut};
use std::ops::Deref;

#[derive(Clone, Copy)]
pub enum CpuBinding<'a> {
    Buffer(&'a [u8]),
    BufferRW(&'a RefCell<Vec<u8>>),
}

pub enum CpuBufGuard<'a> {
    Slice(&'a [u8]),
    Interior(RefMut<'a, Vec<u8>>),
}

impl Deref for CpuBufGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match self {
            CpuBufGuard::Slice(s) => s,
            CpuBufGuard::Interior(r) => r,
        }
    }
}

impl CpuBufGuard<'_> {
    /// Get a mutable reference to the buffer.
    ///
    /// Panics if the underlying resource is read-only.
    pub fn as_mut(&mut self) -> &mut [u8] {
        match self {
            CpuBufGuard::Interior(r) => &mut *r,
            _ => panic!("tried to borrow immutable buffer as mutable"),
        }
    }
}

impl<'a> CpuBinding<'a> {
    pub fn as_buf(&self) -> CpuBufGuard<'a> {
        match self {
            CpuBinding::Buffer(b) => CpuBufGuard::Slice(b),
            CpuBinding::BufferRW(b) => CpuBufGuard::Interior(b.borrow_mut()),
        }
    }
}
