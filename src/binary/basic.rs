// SPDX-License-Identifier: Apache-2.0
//! Basic [`Binary`]s and adapters

use crate::error::Error;
use crate::instruction::Instruction;

use super::Binary;

/// [`Binary`] adapter wrapping an [`FnMut`]
#[derive(Copy, Clone, Default, Debug)]
pub struct Func<F: FnMut(u64) -> Result<Instruction, Error>> {
    func: F,
}

impl<F: FnMut(u64) -> Result<Instruction, Error>> Binary for Func<F> {
    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error> {
        (self.func)(address)
    }
}

/// Create a [`Binary`] from an [`FnMut`]
pub fn from_fn<F: FnMut(u64) -> Result<Instruction, Error>>(func: F) -> Func<F> {
    Func { func }
}

/// A [`Binary`] that contains no instructions at all
#[derive(Copy, Clone, Default, Debug)]
pub struct Empty;

impl Binary for Empty {
    fn get_insn(&mut self, _: u64) -> Result<Instruction, Error> {
        Err(Error::BadVma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_always_misses() {
        let mut bin = Empty;
        assert_eq!(bin.get_insn(0x1000), Err(Error::BadVma));
    }

    #[test]
    fn from_fn_forwards() {
        let mut bin = from_fn(|addr| {
            if addr == 4 {
                Ok(Instruction::default())
            } else {
                Err(Error::BadVma)
            }
        });
        assert!(bin.get_insn(4).is_ok());
        assert_eq!(bin.get_insn(8), Err(Error::BadVma));
    }
}
