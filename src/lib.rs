// SPDX-License-Identifier: Apache-2.0

//! # Bit-exact RISC-V instruction-trace codec
//!
//! Implements the PULP-flavored efficient-trace wire protocol: a
//! little-endian, least-significant-bit-first packet format that lets a CPU
//! model's retired-instruction stream be compressed into `BRANCH_FULL`,
//! `BRANCH_DIFF`, `ADDR_ONLY`, `SYNC`, `SOFTWARE` and `TIMER` packets on the
//! encode side, and replayed back into a `pc` stream on the decode side.
//!
//! See [`generator`] for the encoder state machine, [`tracer`] for the
//! decoder state machine, and [`packet`] for the wire format itself.
//!
//! # no_std
//!
//! This crate has no hard dependency on `std`; the `alloc` feature pulls in
//! [`types::stack::VecStack`] for a heap-backed return-address stack, and the
//! `elf` feature pulls in an ELF-backed [`binary::Binary`].
//!
//! # Example
//!
//! ```
//! use pulp_trace_codec::binary;
//! use pulp_trace_codec::config::CONFIG;
//! use pulp_trace_codec::generator::Encoder;
//! use pulp_trace_codec::instruction::{Bits, Instruction};
//! use pulp_trace_codec::tracer::Decoder;
//! use pulp_trace_codec::types::stack::NoStack;
//! use pulp_trace_codec::types::{Instr, Privilege};
//!
//! let nop = Instruction::from(Bits::Bit32(0x0000_0013)); // addi x0, x0, 0
//! let mut binary = binary::from_fn(move |_| Ok(nop));
//!
//! let mut enc = Encoder::new(CONFIG);
//! let mut dec = Decoder::new(CONFIG, NoStack::new(0).unwrap());
//!
//! let make = |iaddr| Instr {
//!     valid: true,
//!     privilege: Privilege::Machine,
//!     iaddr,
//!     instr: 0x0000_0013,
//!     ..Default::default()
//! };
//!
//! for iaddr in [0x1000, 0x1004, 0x1008] {
//!     for packet in enc.step(make(iaddr)).unwrap() {
//!         dec.process(&packet, &mut binary, |traced| {
//!             println!("pc = {:#x}", traced.pc);
//!         })
//!         .unwrap();
//!     }
//! }
//! ```
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod addr;
pub mod binary;
pub mod config;
pub mod error;
pub mod generator;
pub mod instruction;
pub mod packet;
pub mod stats;
pub mod tracer;
pub mod types;

pub use config::Config;
pub use error::Error;
pub use instruction::Instruction;
