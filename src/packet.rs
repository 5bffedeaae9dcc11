// SPDX-License-Identifier: Apache-2.0
//! Packet model and bit-exact serializer/deserializer
//!
//! Packets are packed little-endian, least-significant-bit first, with no
//! forced alignment between fields. The first byte of every packet holds a
//! 4-bit length hint (payload bytes following that byte) and a 2-bit message
//! type; [`decode_packet`] uses the length hint to find the end of the
//! packet and therefore the width of the trailing variable-length address
//! field, mirroring how the wire format lets a stream reader skip packets it
//! does not care about.

use crate::addr::{sign_extend, Addr};
use crate::error::Error;
use crate::types::branch::branch_map_len;
use crate::types::Privilege;

const PULPPKTLEN: u8 = 4;
const MSGTYPELEN: u8 = 2;
const FORMATLEN: u8 = 2;
const SUBFORMATLEN: u8 = 2;
const BRANCHLEN: u8 = 5;
const PRIVLEN: u8 = 3;
const CAUSELEN: u8 = 5;
const TIMELEN: u8 = 64;

const MSG_TRACE: u64 = 0;
const MSG_SOFTWARE: u64 = 1;
const MSG_TIMER: u64 = 2;

const FORMAT_BRANCH_FULL: u64 = 0;
const FORMAT_BRANCH_DIFF: u64 = 1;
const FORMAT_ADDR_ONLY: u64 = 2;
const FORMAT_SYNC: u64 = 3;

const SUBFORMAT_START: u64 = 0;
const SUBFORMAT_EXCEPTION: u64 = 1;
const SUBFORMAT_CONTEXT: u64 = 2;

/// A deserialized/to-be-serialized packet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Trace(Trace),
    Software(u32),
    Timer(u64),
}

/// A `Trace` packet, tagged by format
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trace {
    /// A branch-map flush with a full branch map and an optional address
    ///
    /// The address is omitted exactly when the map is full and the flush
    /// was not triggered by a discontinuity (encoded on the wire as
    /// `branches == 0`, reinterpreted by the decoder as a full map).
    BranchFull {
        branches: u8,
        branch_map: u32,
        address: Option<Addr>,
    },
    /// A branch-map flush with a differential address
    BranchDiff {
        branches: u8,
        branch_map: u32,
        address: Addr,
    },
    /// A lone address, absolute or differential per configuration
    AddrOnly { address: Addr },
    /// A synchronization packet
    Sync(Sync),
}

/// A `SYNC` packet, tagged by subformat
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sync {
    Start {
        privilege: Privilege,
        /// Set when a branch at `address` falls through (not taken) and no
        /// branch-map packet will otherwise report it
        branch: bool,
        address: u64,
    },
    Exception {
        privilege: Privilege,
        branch: bool,
        address: u64,
        cause: u8,
        interrupt: bool,
    },
    /// Reserved; always rejected by [`encode_packet`]/[`decode_packet`]
    Context { privilege: Privilege },
}

/// Serialize `packet` into `buf`, starting at byte 0
///
/// Returns the number of bytes written. `width` is the address width in
/// bits (32 or 64), used for `Sync` addresses and the `Software` userdata
/// field.
pub fn encode_packet(packet: &Packet, width: u8, buf: &mut [u8]) -> Result<usize, Error> {
    if let Packet::Trace(Trace::Sync(Sync::Context { .. })) = packet {
        return Err(Error::Unimplemented);
    }

    let mut w = Writer::new(buf);
    w.write_bits(0, PULPPKTLEN)?; // length placeholder, patched below

    match packet {
        Packet::Trace(t) => {
            w.write_bits(MSG_TRACE, MSGTYPELEN)?;
            encode_trace(t, width, &mut w)?;
        }
        Packet::Software(v) => {
            w.write_bits(MSG_SOFTWARE, MSGTYPELEN)?;
            w.write_bits((*v).into(), width)?;
        }
        Packet::Timer(v) => {
            w.write_bits(MSG_TIMER, MSGTYPELEN)?;
            w.write_bits(*v, TIMELEN)?;
        }
    }

    let total_bytes = w.bit_pos().div_ceil(8).max(1);
    let length = total_bytes - 1;
    if length > 0xF {
        return Err(Error::BadPacket);
    }
    buf[0] = (buf[0] & 0xF0) | (length as u8);
    Ok(total_bytes)
}

/// Write `addr`'s bits padded out to the next byte boundary, sign-extending
/// into the pad
///
/// The length hint only gives a reader the packet's length to whole-byte
/// granularity, so a decoder can never recover a sub-byte `keep` for the
/// trailing address field; it can only read "every bit up to the next byte
/// boundary". Writing the true value already sign-extended to that same
/// boundary means those extra bits are genuine sign bits, not zero filler,
/// so the decoded value (and its widened `keep`) matches what was encoded.
fn write_address(w: &mut Writer<'_>, addr: &Addr, width: u8) -> Result<(), Error> {
    let start = w.bit_pos();
    let end = start + addr.keep as usize;
    let padded_keep = (end.div_ceil(8) * 8 - start).min(width as usize) as u8;
    let bits = sign_extend(addr.bits, addr.keep, padded_keep);
    w.write_bits(bits, padded_keep)
}

fn encode_trace(t: &Trace, width: u8, w: &mut Writer<'_>) -> Result<(), Error> {
    match t {
        Trace::BranchFull {
            branches,
            branch_map,
            address,
        } => {
            w.write_bits(FORMAT_BRANCH_FULL, FORMATLEN)?;
            w.write_bits((*branches).into(), BRANCHLEN)?;
            w.write_bits((*branch_map).into(), branch_map_len(*branches))?;
            if let Some(addr) = address {
                write_address(w, addr, width)?;
            }
        }
        Trace::BranchDiff {
            branches,
            branch_map,
            address,
        } => {
            w.write_bits(FORMAT_BRANCH_DIFF, FORMATLEN)?;
            w.write_bits((*branches).into(), BRANCHLEN)?;
            w.write_bits((*branch_map).into(), branch_map_len(*branches))?;
            write_address(w, address, width)?;
        }
        Trace::AddrOnly { address } => {
            w.write_bits(FORMAT_ADDR_ONLY, FORMATLEN)?;
            write_address(w, address, width)?;
        }
        Trace::Sync(sync) => {
            w.write_bits(FORMAT_SYNC, FORMATLEN)?;
            match sync {
                Sync::Start {
                    privilege,
                    branch,
                    address,
                } => {
                    w.write_bits(SUBFORMAT_START, SUBFORMATLEN)?;
                    w.write_bits(u8::from(*privilege).into(), PRIVLEN)?;
                    w.write_bits((*branch).into(), 1)?;
                    w.write_bits(*address, width)?;
                }
                Sync::Exception {
                    privilege,
                    branch,
                    address,
                    cause,
                    interrupt,
                } => {
                    w.write_bits(SUBFORMAT_EXCEPTION, SUBFORMATLEN)?;
                    w.write_bits(u8::from(*privilege).into(), PRIVLEN)?;
                    w.write_bits((*branch).into(), 1)?;
                    w.write_bits(*address, width)?;
                    w.write_bits((*cause).into(), CAUSELEN)?;
                    w.write_bits((*interrupt).into(), 1)?;
                }
                Sync::Context { .. } => unreachable!("rejected in encode_packet"),
            }
        }
    }
    Ok(())
}

/// Deserialize one packet from the start of `data`
///
/// Returns the packet and the number of bytes it occupied.
pub fn decode_packet(data: &[u8], width: u8) -> Result<(Packet, usize), Error> {
    let mut r = Reader::new(data);
    let length = r.read_bits(PULPPKTLEN)?;
    let total_bits = (length as usize + 1) * 8;
    let msg_type = r.read_bits(MSGTYPELEN)?;

    let packet = match msg_type {
        MSG_TRACE => Packet::Trace(decode_trace(&mut r, width, total_bits)?),
        MSG_SOFTWARE => Packet::Software(r.read_bits(width)? as u32),
        MSG_TIMER => Packet::Timer(r.read_bits(TIMELEN)?),
        _ => return Err(Error::BadPacket),
    };

    if r.bit_pos() > total_bits {
        return Err(Error::BadPacket);
    }
    Ok((packet, total_bits / 8))
}

fn decode_trace(r: &mut Reader<'_>, width: u8, total_bits: usize) -> Result<Trace, Error> {
    let format = r.read_bits(FORMATLEN)?;
    match format {
        FORMAT_BRANCH_FULL => {
            let branches = r.read_bits(BRANCHLEN)? as u8;
            if branches > 31 {
                return Err(Error::BadPacket);
            }
            let branch_map = r.read_bits(branch_map_len(branches))? as u32;
            // `branches == 0` means "full map, no address" (the trailing
            // bits, if any, are pure byte padding): gate the read on the
            // branch count, not on whether bits happen to remain.
            let address = if branches == 0 {
                None
            } else {
                let remaining = total_bits.saturating_sub(r.bit_pos());
                if remaining == 0 {
                    return Err(Error::BadPacket);
                }
                let keep = remaining.min(width as usize) as u8;
                Some(Addr {
                    bits: r.read_bits(keep)?,
                    keep,
                })
            };
            Ok(Trace::BranchFull {
                branches,
                branch_map,
                address,
            })
        }
        FORMAT_BRANCH_DIFF => {
            let branches = r.read_bits(BRANCHLEN)? as u8;
            if branches > 31 {
                return Err(Error::BadPacket);
            }
            let branch_map = r.read_bits(branch_map_len(branches))? as u32;
            let remaining = total_bits.saturating_sub(r.bit_pos());
            if remaining == 0 {
                return Err(Error::BadPacket);
            }
            let keep = remaining.min(width as usize) as u8;
            let bits = r.read_bits(keep)?;
            Ok(Trace::BranchDiff {
                branches,
                branch_map,
                address: Addr { bits, keep },
            })
        }
        FORMAT_ADDR_ONLY => {
            let remaining = total_bits.saturating_sub(r.bit_pos());
            if remaining == 0 {
                return Err(Error::BadPacket);
            }
            let keep = remaining.min(width as usize) as u8;
            let bits = r.read_bits(keep)?;
            Ok(Trace::AddrOnly {
                address: Addr { bits, keep },
            })
        }
        FORMAT_SYNC => {
            let subformat = r.read_bits(SUBFORMATLEN)?;
            let privilege = Privilege::try_from(r.read_bits(PRIVLEN)? as u8)
                .map_err(|_| Error::BadPacket)?;
            match subformat {
                SUBFORMAT_START => {
                    let branch = r.read_bits(1)? != 0;
                    let address = r.read_bits(width)?;
                    Ok(Trace::Sync(Sync::Start {
                        privilege,
                        branch,
                        address,
                    }))
                }
                SUBFORMAT_EXCEPTION => {
                    let branch = r.read_bits(1)? != 0;
                    let address = r.read_bits(width)?;
                    let cause = r.read_bits(CAUSELEN)? as u8;
                    let interrupt = r.read_bits(1)? != 0;
                    Ok(Trace::Sync(Sync::Exception {
                        privilege,
                        branch,
                        address,
                        cause,
                        interrupt,
                    }))
                }
                SUBFORMAT_CONTEXT => Err(Error::Unimplemented),
                _ => Err(Error::BadPacket),
            }
        }
        _ => Err(Error::BadPacket),
    }
}

/// Bit-addressable writer over a caller-owned byte buffer
struct Writer<'a> {
    buf: &'a mut [u8],
    bit_pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    fn bit_pos(&self) -> usize {
        self.bit_pos
    }

    fn write_bits(&mut self, value: u64, count: u8) -> Result<(), Error> {
        for i in 0..count {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), Error> {
        let byte_pos = self.bit_pos >> 3;
        let byte = self.buf.get_mut(byte_pos).ok_or(Error::NoMem)?;
        if self.bit_pos & 0x7 == 0 {
            *byte = 0;
        }
        let mask = 1u8 << (self.bit_pos & 0x7);
        if bit {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        self.bit_pos += 1;
        Ok(())
    }
}

/// Bit-addressable reader over a borrowed byte slice
struct Reader<'d> {
    data: &'d [u8],
    bit_pos: usize,
}

impl<'d> Reader<'d> {
    fn new(data: &'d [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn bit_pos(&self) -> usize {
        self.bit_pos
    }

    fn read_bit(&mut self) -> Result<bool, Error> {
        let byte_pos = self.bit_pos >> 3;
        let byte = *self.data.get(byte_pos).ok_or(Error::BadPacket)?;
        let bit = (byte >> (self.bit_pos & 0x7)) & 1 != 0;
        self.bit_pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, count: u8) -> Result<u64, Error> {
        let mut value = 0u64;
        for i in 0..count {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }
}
