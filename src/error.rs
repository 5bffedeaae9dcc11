// SPDX-License-Identifier: Apache-2.0
//! The codec's flat error taxonomy

use core::fmt;

/// Everything that can go fatally wrong in one encode or decode step
///
/// The encoder and decoder report the first fatal error for a step and leave
/// their state as-is: no half-emitted packet, no half-appended instruction.
/// Statistics counters are not rolled back when an error occurs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A null or out-of-range argument was supplied
    Invalid,
    /// An allocation failed
    NoMem,
    /// Unknown packet format, truncated data, or an impossible field
    /// combination
    BadPacket,
    /// The disassembler refused to classify an instruction, or classified it
    /// as `noninsn`
    BadInstr,
    /// A protocol/configuration incompatibility, e.g. a `BRANCH_DIFF` packet
    /// received while `full_address` is set
    BadConfig,
    /// A pop from an empty return-address stack
    BadRas,
    /// The program counter left every loadable section
    BadVma,
    /// A section load returned no bytes
    SectionEmpty,
    /// Opening the backing file failed
    FileOpen,
    /// Reading the backing file failed
    FileRead,
    /// Writing the backing file failed
    FileWrite,
    /// Scanning/parsing the backing file failed
    FileScan,
    /// The `CONTEXT` subformat or a `context_change` trigger was encountered
    Unimplemented,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Invalid => "invalid argument",
            Self::NoMem => "allocation failed",
            Self::BadPacket => "unknown format, truncated data, or impossible field combination",
            Self::BadInstr => "disassembler refused or classified as noninsn",
            Self::BadConfig => "protocol/configuration incompatibility",
            Self::BadRas => "pop from empty return-address stack",
            Self::BadVma => "program counter outside any loadable section",
            Self::SectionEmpty => "section load returned no bytes",
            Self::FileOpen => "could not open file",
            Self::FileRead => "could not read file",
            Self::FileWrite => "could not write file",
            Self::FileScan => "could not scan/parse file",
            Self::Unimplemented => "unimplemented protocol feature",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
