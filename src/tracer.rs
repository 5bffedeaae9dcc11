// SPDX-License-Identifier: Apache-2.0
//! Decoder state machine
//!
//! Walks a program one packet at a time, replaying the control-flow
//! decisions the encoder collapsed into branch maps and addresses, and
//! reports every instruction retired along the way.

use crate::addr::{mask, sign_extend, Addr};
use crate::binary::Binary;
use crate::config::Config;
use crate::error::Error;
use crate::instruction::RasKind;
use crate::packet::{Packet, Sync, Trace};
use crate::types::branch::Map;
use crate::types::stack::ReturnStack;
use crate::types::{Privilege, Trap};

/// One instruction retirement reconstructed from the packet stream
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Traced {
    pub pc: u64,
    pub privilege: Privilege,
    /// Set on the first instruction retired after a `SYNC/EXCEPTION`
    pub trap: Option<Trap>,
}

/// Outcome of retiring the instruction at the decoder's current `pc`
enum RetireKind {
    /// A conditional branch; the caller resolves it (from a branch-map bit
    /// or, for `SYNC`, the packet's `branch` flag)
    Branch { taken_pc: u64, fallthrough_pc: u64 },
    /// The next `pc` is already known
    Sequential(u64),
    /// An unpredictable discontinuity; the landing address is not known
    /// until a later packet supplies it
    Discontinuity,
}

/// Trace decoder: replays packets against a [`Binary`], reporting retired
/// instructions through a caller-supplied callback
#[derive(Clone, Debug)]
pub struct Decoder<R> {
    config: Config,
    pc: u64,
    /// Set when the previously retired instruction was an unpredictable
    /// discontinuity whose landing address has not yet arrived
    pending_discontinuity: bool,
    started: bool,
    privilege: Privilege,
    last_packet_addr: u64,
    branch_map: Map,
    ras: R,
}

impl<R: ReturnStack> Decoder<R> {
    pub fn new(config: Config, ras: R) -> Self {
        Self {
            config,
            pc: 0,
            pending_discontinuity: false,
            started: false,
            privilege: Privilege::default(),
            last_packet_addr: 0,
            branch_map: Map::default(),
            ras,
        }
    }

    /// Current program counter
    ///
    /// Only meaningful once [`started`][Self::started] is `true`.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Whether a `SYNC` packet has been processed yet
    pub fn started(&self) -> bool {
        self.started
    }

    fn width(&self) -> u8 {
        self.config.address_bits()
    }

    /// Reconstruct an absolute address from a packed address field
    ///
    /// `is_diff` selects whether `addr` holds a difference against
    /// [`last_packet_addr`][Self::last_packet_addr] or an absolute value.
    fn reconstruct(&self, addr: Addr, is_diff: bool) -> u64 {
        let width = self.width();
        let value = sign_extend(addr.bits, addr.keep, width);
        if is_diff {
            self.last_packet_addr.wrapping_add(value) & mask(width)
        } else {
            value & mask(width)
        }
    }

    /// Advance the decoder by one packet
    ///
    /// `binary` is consulted for every instruction retired while processing
    /// this packet; `emit` is called once per retired instruction, in
    /// program order.
    pub fn process(
        &mut self,
        packet: &Packet,
        binary: &mut impl Binary,
        mut emit: impl FnMut(Traced),
    ) -> Result<(), Error> {
        match packet {
            Packet::Software(_) | Packet::Timer(_) => Ok(()),
            Packet::Trace(Trace::Sync(Sync::Start {
                privilege,
                branch,
                address,
            })) => self.sync_advance(*privilege, *branch, *address, None, binary, &mut emit),
            Packet::Trace(Trace::Sync(Sync::Exception {
                privilege,
                branch,
                address,
                cause,
                interrupt,
            })) => {
                let trap = Trap {
                    cause: *cause,
                    interrupt: *interrupt,
                    tval: 0,
                };
                self.sync_advance(*privilege, *branch, *address, Some(trap), binary, &mut emit)
            }
            Packet::Trace(Trace::Sync(Sync::Context { .. })) => Err(Error::Unimplemented),
            Packet::Trace(Trace::BranchFull {
                branches,
                branch_map,
                address,
            }) => {
                let full = *branches == 0 && address.is_none();
                let cnt = if full { Map::MAX_BRANCHES } else { *branches };
                if cnt > Map::MAX_BRANCHES {
                    return Err(Error::BadPacket);
                }
                self.branch_map = Map::from_parts(cnt, *branch_map);
                let target = address.map(|a| self.reconstruct(a, false));
                self.walk_branches(target, binary, &mut emit)
            }
            Packet::Trace(Trace::BranchDiff {
                branches,
                branch_map,
                address,
            }) => {
                if *branches > Map::MAX_BRANCHES {
                    return Err(Error::BadPacket);
                }
                self.branch_map = Map::from_parts(*branches, *branch_map);
                let target = self.reconstruct(*address, true);
                self.walk_branches(Some(target), binary, &mut emit)
            }
            Packet::Trace(Trace::AddrOnly { address }) => {
                let target = self.reconstruct(*address, !self.config.full_address);
                self.walk_addr_only(target, binary, &mut emit)
            }
        }
    }

    /// Retire the instruction at the current `pc`
    ///
    /// Emits it and, for a call or call-and-return, pushes its fall-through
    /// address onto the return-address stack.
    fn retire(
        &mut self,
        binary: &mut impl Binary,
        emit: &mut impl FnMut(Traced),
        trap: Option<Trap>,
    ) -> Result<RetireKind, Error> {
        let insn = binary.get_insn(self.pc)?;
        let kind = insn.kind.ok_or(Error::BadInstr)?;
        if kind.is_unsupported() {
            return Err(Error::BadInstr);
        }
        emit(Traced {
            pc: self.pc,
            privilege: self.privilege,
            trap,
        });

        let fall = self.pc.wrapping_add(u64::from(insn.size));
        let ras_kind = kind.ras_kind();
        if matches!(ras_kind, RasKind::Call | RasKind::CoRet) {
            self.ras.push(fall);
        }

        if let Some(off) = kind.branch_target() {
            return Ok(RetireKind::Branch {
                taken_pc: self.pc.wrapping_add_signed(off.into()),
                fallthrough_pc: fall,
            });
        }
        if let Some(off) = kind.inferable_jump_target() {
            return Ok(RetireKind::Sequential(self.pc.wrapping_add_signed(off.into())));
        }
        if self.config.implicit_ret && ras_kind == RasKind::Ret {
            let target = self.ras.pop().ok_or(Error::BadRas)?;
            return Ok(RetireKind::Sequential(target));
        }
        if kind.is_unpred_discontinuity(self.config.implicit_ret) {
            return Ok(RetireKind::Discontinuity);
        }
        Ok(RetireKind::Sequential(fall))
    }

    /// Walk one instruction past a `SYNC` packet's address
    ///
    /// The `branch` flag resolves a conditional branch directly, since no
    /// branch map is available for a lone `SYNC`.
    fn sync_advance(
        &mut self,
        privilege: Privilege,
        branch: bool,
        address: u64,
        trap: Option<Trap>,
        binary: &mut impl Binary,
        emit: &mut impl FnMut(Traced),
    ) -> Result<(), Error> {
        self.pending_discontinuity = false;
        self.privilege = privilege;
        self.pc = address;
        self.started = true;
        self.last_packet_addr = address;

        match self.retire(binary, emit, trap)? {
            RetireKind::Discontinuity => self.pending_discontinuity = true,
            RetireKind::Sequential(next) => self.pc = next,
            RetireKind::Branch {
                taken_pc,
                fallthrough_pc,
            } => self.pc = if branch { fallthrough_pc } else { taken_pc },
        }
        Ok(())
    }

    /// Walk forward consuming `branch_map` bits, stopping at `target` (if
    /// given) or once the map is drained (a full map with no address)
    fn walk_branches(
        &mut self,
        target: Option<u64>,
        binary: &mut impl Binary,
        emit: &mut impl FnMut(Traced),
    ) -> Result<(), Error> {
        if self.pending_discontinuity {
            self.pc = target.ok_or(Error::BadPacket)?;
            self.pending_discontinuity = false;
        }

        loop {
            match self.retire(binary, emit, None)? {
                RetireKind::Discontinuity => {
                    self.pending_discontinuity = true;
                    self.last_packet_addr = self.pc;
                    return Ok(());
                }
                RetireKind::Sequential(next) => self.pc = next,
                RetireKind::Branch {
                    taken_pc,
                    fallthrough_pc,
                } => {
                    let taken = self.branch_map.pop().ok_or(Error::BadPacket)?;
                    self.pc = if taken { taken_pc } else { fallthrough_pc };
                }
            }

            let done = match target {
                Some(t) => self.pc == t,
                None => self.branch_map.cnt() == 0,
            };
            if done {
                self.last_packet_addr = self.pc;
                return Ok(());
            }
        }
    }

    /// Walk forward with no branch map at all, stopping at `target`
    ///
    /// A conditional branch encountered mid-walk is a protocol error: an
    /// `ADDR_ONLY` packet is only ever emitted for a branch-free stretch.
    fn walk_addr_only(
        &mut self,
        target: u64,
        binary: &mut impl Binary,
        emit: &mut impl FnMut(Traced),
    ) -> Result<(), Error> {
        if self.pending_discontinuity {
            self.pc = target;
            self.pending_discontinuity = false;
            self.last_packet_addr = target;
            return Ok(());
        }

        loop {
            match self.retire(binary, emit, None)? {
                RetireKind::Discontinuity => {
                    self.pending_discontinuity = true;
                    self.last_packet_addr = self.pc;
                    return Ok(());
                }
                RetireKind::Branch { .. } => return Err(Error::BadPacket),
                RetireKind::Sequential(next) => {
                    self.pc = next;
                    if self.pc == target {
                        self.last_packet_addr = target;
                        return Ok(());
                    }
                }
            }
        }
    }
}
