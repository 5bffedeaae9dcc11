// SPDX-License-Identifier: Apache-2.0
//! Program Walker: lookup of instructions by address
//!
//! Defines the [`Binary`] trait the encoder and decoder consult to fetch
//! instruction bytes at a given program counter, plus a few adapters.

pub mod basic;

#[cfg(feature = "elf")]
pub mod elf;

pub use basic::{from_fn, Empty};

use crate::error::Error;
use crate::instruction::Instruction;

/// A program that can be walked instruction-by-instruction by address
pub trait Binary {
    /// Retrieve the [`Instruction`] at the given address
    ///
    /// Returns [`Error::BadVma`] if `address` is outside any loadable
    /// section.
    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error>;

    /// "Move" this binary by a fixed offset
    ///
    /// Accesses are mapped by subtracting `offset` from the requested
    /// address; addresses below `offset` report [`Error::BadVma`].
    fn with_offset(self, offset: u64) -> Offset<Self>
    where
        Self: Sized,
    {
        Offset {
            inner: self,
            offset,
        }
    }
}

impl<B: Binary + ?Sized> Binary for &mut B {
    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error> {
        B::get_insn(self, address)
    }
}

/// [`Binary`] moved by a fixed offset; see [`Binary::with_offset`]
#[derive(Copy, Clone, Debug)]
pub struct Offset<B> {
    inner: B,
    offset: u64,
}

impl<B: Binary> Binary for Offset<B> {
    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error> {
        address
            .checked_sub(self.offset)
            .ok_or(Error::BadVma)
            .and_then(|a| self.inner.get_insn(a))
    }
}
