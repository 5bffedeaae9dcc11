//! Shared value types used throughout the codec

pub mod branch;
pub mod stack;

/// RISC-V privilege level
///
/// Encoded in 2 bits on the wire; `0b10` (reserved/Hypervisor) is not a valid
/// value for this protocol.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Privilege {
    #[default]
    User,
    Supervisor,
    Machine,
}

impl TryFrom<u8> for Privilege {
    type Error = u8;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        match num {
            0b00 => Ok(Self::User),
            0b01 => Ok(Self::Supervisor),
            0b11 => Ok(Self::Machine),
            err => Err(err),
        }
    }
}

impl From<Privilege> for u8 {
    fn from(priv_level: Privilege) -> Self {
        match priv_level {
            Privilege::User => 0b00,
            Privilege::Supervisor => 0b01,
            Privilege::Machine => 0b11,
        }
    }
}

/// Trap information carried by a `SYNC/EXCEPTION` packet
///
/// `tval` is kept in the model even though the current protocol profile does
/// not serialize it (see the SYNC/EXCEPTION field layout).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Trap {
    pub cause: u8,
    pub interrupt: bool,
    pub tval: u64,
}

/// One retired instruction, as produced by the CPU model
///
/// Owned by the caller across a single encode step; the encoder keeps at
/// most three of these at a time in its sliding window.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Instr {
    pub valid: bool,
    pub exception: bool,
    pub interrupt: bool,
    pub cause: u8,
    pub tval: u64,
    pub privilege: Privilege,
    pub iaddr: u64,
    pub instr: u64,
    pub compressed: bool,
}

/// Address width the codec is operating at
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Width {
    #[default]
    Rv32,
    Rv64,
}

impl Width {
    /// The number of address bits at this width
    pub const fn bits(self) -> u8 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }
}
