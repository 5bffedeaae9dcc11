// SPDX-License-Identifier: Apache-2.0
//! Encoder state machine
//!
//! Keeps a sliding window of three instruction records (`last`/`this`/`next`)
//! and, for each newly-confirmed `this`, decides whether to emit a packet and
//! which kind, following the emit-decision table in priority order.

use crate::addr::{differential_addr, mask, quantize_clz, sign_extendable_bits, Addr};
use crate::config::Config;
use crate::error::Error;
use crate::instruction::{Bits, Instruction, Kind};
use crate::packet::{encode_packet, Packet, Sync, Trace};
use crate::stats::Statistics;
use crate::types::branch::Map;
use crate::types::{Instr, Privilege};

/// A window slot: one instruction record plus derived classifier state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Slot {
    instr: Instr,
    kind: Option<Kind>,
    qualified: bool,
    unpred_disc: bool,
    privilege_change: bool,
    emitted_exception_sync: bool,
}

fn classify(instr: &Instr) -> Option<Kind> {
    let bits = if instr.compressed {
        Bits::Bit16(instr.instr as u16)
    } else {
        Bits::Bit32(instr.instr as u32)
    };
    Instruction::from(bits).kind
}

/// Fall-through address of one instruction
fn fallthrough(instr: &Instr) -> u64 {
    instr.iaddr.wrapping_add(if instr.compressed { 2 } else { 4 })
}

/// Trace encoder: consumes retired instructions one at a time, emitting at
/// most one packet per step
#[derive(Clone, Debug)]
pub struct Encoder {
    config: Config,
    last: Option<Slot>,
    this: Option<Slot>,
    next: Option<Slot>,
    branches: Map,
    last_iaddr: u64,
    last_seen_privilege: Option<Privilege>,
    started: bool,
    stats: Statistics,
}

impl Encoder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            last: None,
            this: None,
            next: None,
            branches: Map::default(),
            last_iaddr: 0,
            last_seen_privilege: None,
            started: false,
            stats: Statistics::default(),
        }
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    fn width(&self) -> u8 {
        self.config.address_bits()
    }

    fn make_slot(&mut self, instr: Instr) -> Slot {
        if !instr.valid {
            return Slot {
                instr,
                kind: None,
                qualified: false,
                unpred_disc: false,
                privilege_change: false,
                emitted_exception_sync: false,
            };
        }

        let kind = classify(&instr);
        let unpred_disc = kind
            .map(|k| k.is_unpred_discontinuity(self.config.implicit_ret))
            .unwrap_or(false);
        let privilege_change = self
            .last_seen_privilege
            .is_some_and(|p| p != instr.privilege);
        self.last_seen_privilege = Some(instr.privilege);

        Slot {
            instr,
            kind,
            qualified: true,
            unpred_disc,
            privilege_change,
            emitted_exception_sync: false,
        }
    }

    /// Advance the window by one retired instruction
    ///
    /// Returns at most one packet to emit. `Ok(None)` is returned both while
    /// the window is still filling and when no packet is due this step.
    pub fn step(&mut self, instr: Instr) -> Result<Option<Packet>, Error> {
        self.last = self.this.take();
        self.this = self.next.take();
        self.next = Some(self.make_slot(instr));

        if !self.next.as_ref().unwrap().instr.valid {
            // The stream ended (or paused): freeze, nothing further to decide.
            return Ok(None);
        }

        let Some(this) = self.this else {
            return Ok(None);
        };

        if this.kind.is_some_and(Kind::is_unsupported) {
            return Err(Error::BadInstr);
        }

        if this.qualified {
            self.stats.record_instruction();
        }

        if this.kind.is_some_and(Kind::is_branch) {
            let next = self.next.as_ref().unwrap();
            let taken = next.instr.iaddr != fallthrough(&this.instr);
            self.branches.push(taken);
        }

        self.decide(this)
    }

    fn sync_branch_bit(&self, this: &Slot) -> bool {
        let next = self.next.as_ref().unwrap();
        this.kind.is_some_and(Kind::is_branch) && next.instr.iaddr == fallthrough(&this.instr)
    }

    fn decide(&mut self, this: Slot) -> Result<Option<Packet>, Error> {
        if let Some(last) = self.last {
            if last.instr.exception {
                let packet = Packet::Trace(Trace::Sync(Sync::Exception {
                    privilege: last.instr.privilege,
                    branch: self.sync_branch_bit(&this),
                    address: this.instr.iaddr & mask(self.width()),
                    cause: last.instr.cause,
                    interrupt: last.instr.interrupt,
                }));
                self.this.as_mut().unwrap().emitted_exception_sync = true;
                self.last_iaddr = this.instr.iaddr;
                self.started = true;
                return self.emit(packet);
            }

            if last.emitted_exception_sync && self.config.pulp_vector_table_packet {
                let packet = Packet::Trace(Trace::Sync(Sync::Start {
                    privilege: this.instr.privilege,
                    branch: self.sync_branch_bit(&this),
                    address: this.instr.iaddr & mask(self.width()),
                }));
                self.last_iaddr = this.instr.iaddr;
                return self.emit(packet);
            }
        }

        if !self.started || this.privilege_change {
            self.started = true;
            let packet = Packet::Trace(Trace::Sync(Sync::Start {
                privilege: this.instr.privilege,
                branch: self.sync_branch_bit(&this),
                address: this.instr.iaddr & mask(self.width()),
            }));
            self.last_iaddr = this.instr.iaddr;
            return self.emit(packet);
        }

        if self.last.is_some_and(|last| last.unpred_disc) {
            let packet = self.flush(this.instr.iaddr, true);
            return self.emit(packet);
        }

        let next = self.next.unwrap();
        if next.instr.exception || next.privilege_change {
            let packet = self.flush(this.instr.iaddr, false);
            return self.emit(packet);
        }

        if self.branches.full() {
            let bits = self.branches.bits();
            self.branches.reset();
            return self.emit(Packet::Trace(Trace::BranchFull {
                branches: 0,
                branch_map: bits,
                address: None,
            }));
        }

        Ok(None)
    }

    /// Address used in an `ADDR_ONLY` packet
    ///
    /// Unlike `BRANCH_FULL`/`BRANCH_DIFF`, `ADDR_ONLY` has no format bit to
    /// record which form was chosen, so the choice is config-driven only:
    /// absolute under `full_address`, otherwise always the literal
    /// difference against `last_iaddr` (no tie-break toward absolute).
    fn packed_address(&mut self, this_iaddr: u64) -> Addr {
        self.stats.record_address(this_iaddr, self.width());
        let width = self.width();
        if self.config.full_address {
            Addr {
                bits: this_iaddr & mask(width),
                keep: width,
            }
        } else {
            let diff = this_iaddr.wrapping_sub(self.last_iaddr) & mask(width);
            let lead = sign_extendable_bits(diff, width);
            let lead = if self.config.use_pulp_sext {
                quantize_clz(lead)
            } else {
                lead
            };
            let keep = width - lead + 1;
            Addr {
                bits: diff & mask(keep),
                keep,
            }
        }
    }

    fn flush(&mut self, this_iaddr: u64, is_discontinuity: bool) -> Packet {
        let cnt = self.branches.cnt();
        let full_omit = self.branches.full() && !is_discontinuity;

        let packet = if cnt == 0 {
            Trace::AddrOnly {
                address: self.packed_address(this_iaddr),
            }
        } else if full_omit {
            Trace::BranchFull {
                branches: 0,
                branch_map: self.branches.bits(),
                address: None,
            }
        } else if self.config.full_address {
            self.stats.record_address(this_iaddr, self.width());
            Trace::BranchFull {
                branches: cnt,
                branch_map: self.branches.bits(),
                address: Some(crate::addr::Addr {
                    bits: this_iaddr & mask(self.width()),
                    keep: self.width(),
                }),
            }
        } else {
            self.stats.record_address(this_iaddr, self.width());
            let pack = differential_addr(
                this_iaddr,
                self.last_iaddr,
                self.width(),
                self.config.use_pulp_sext,
            );
            if pack.use_diff {
                Trace::BranchDiff {
                    branches: cnt,
                    branch_map: self.branches.bits(),
                    address: pack.addr(),
                }
            } else {
                Trace::BranchFull {
                    branches: cnt,
                    branch_map: self.branches.bits(),
                    address: Some(pack.addr()),
                }
            }
        };

        self.branches.reset();
        self.last_iaddr = this_iaddr;
        Packet::Trace(packet)
    }

    fn emit(&mut self, packet: Packet) -> Result<Option<Packet>, Error> {
        let mut buf = [0u8; 16];
        let len = encode_packet(&packet, self.width(), &mut buf)?;
        self.stats.record_packet(&packet, (len as u64) * 8);
        Ok(Some(packet))
    }
}
