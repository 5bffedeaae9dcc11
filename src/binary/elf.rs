// SPDX-License-Identifier: Apache-2.0
//! ELF-backed [`Binary`]

use elf::endian::EndianParse;
use elf::ElfBytes;

use crate::error::Error;
use crate::instruction::{Bits, Instruction};

use super::Binary;

/// Static ELF [`Binary`]
///
/// Retrieves [`Instruction`]s from executable `PT_LOAD` segments by virtual
/// address. Neither decompression nor dynamic linking is supported.
pub struct Elf<'d, P: EndianParse> {
    elf: ElfBytes<'d, P>,
    last_segment: (u64, &'d [u8]),
}

impl<'d, P: EndianParse> Elf<'d, P> {
    /// Wrap an already-parsed ELF file
    ///
    /// Returns [`Error::BadConfig`] if the file is not little-endian RISC-V.
    pub fn new(elf: ElfBytes<'d, P>) -> Result<Self, Error> {
        use elf::abi;

        if elf.ehdr.e_machine != abi::EM_RISCV || !elf.ehdr.endianness.is_little() {
            return Err(Error::BadConfig);
        }
        Ok(Self {
            elf,
            last_segment: (u64::MAX, &[]),
        })
    }

    /// The inner [`ElfBytes`]
    pub fn inner(&self) -> &ElfBytes<'d, P> {
        &self.elf
    }
}

impl<P: EndianParse> Binary for Elf<'_, P> {
    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error> {
        let segments = self
            .elf
            .segments()
            .into_iter()
            .flat_map(|s| s.iter())
            .filter(|s| s.p_type == elf::abi::PT_LOAD && s.p_flags & elf::abi::PF_X != 0)
            .map(|s| {
                self.elf
                    .segment_data(&s)
                    .map(|d| (s.p_vaddr, d))
                    .map_err(|_| Error::FileScan)
            });

        let (insn_data, segment) = core::iter::once(Ok(self.last_segment))
            .chain(segments)
            .map(|s| {
                let (base, data) = s?;
                let Some(offset) = address.checked_sub(base) else {
                    return Ok(None);
                };
                let offset: usize = offset.try_into().map_err(|_| Error::BadVma)?;
                let res = data
                    .split_at_checked(offset)
                    .filter(|(_, insn_data)| !insn_data.is_empty())
                    .map(|(_, insn_data)| (insn_data, (base, data)));
                Ok(res)
            })
            .find_map(Result::transpose)
            .ok_or(Error::BadVma)??;

        self.last_segment = segment;
        Bits::extract(insn_data)
            .map(|(bits, _)| bits.into())
            .ok_or(Error::BadInstr)
    }
}
