// SPDX-License-Identifier: Apache-2.0
//! ELF-driven decoder
//!
//!     Usage: decode_elf <elf-file> <trace-file> [-p params.toml]
//!
//! `trace-file` is a concatenation of wire-format packets, as produced by
//! `encode_csv`. Every decoded `pc` is printed as a hex value to stdout.

use std::path::PathBuf;

use pulp_trace_codec::binary::elf::Elf;
use pulp_trace_codec::binary::Binary;
use pulp_trace_codec::config::Config;
use pulp_trace_codec::packet::decode_packet;
use pulp_trace_codec::tracer::Decoder;
use pulp_trace_codec::types::stack::VecStack;

fn main() {
    let matches = clap::Command::new("decode_elf")
        .arg(
            clap::arg!(<elf> "Path to the ELF file being traced")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(<trace> "Path to the packet-stream trace file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(-p --params <FILE> "Codec configuration")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(-d --debug "Enable additional debug output")
                .env("DEBUG")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let debug = matches.get_flag("debug");

    let config: Config = matches
        .get_one::<PathBuf>("params")
        .map(|p| {
            let text = std::fs::read_to_string(p).expect("could not load parameters");
            toml::from_str(&text).expect("could not parse parameters")
        })
        .unwrap_or_default();
    if debug {
        eprintln!("configuration: {config:?}");
    }

    let elf_path = matches.get_one::<PathBuf>("elf").unwrap();
    let elf_data = std::fs::read(elf_path).expect("could not read ELF file");
    let elf = elf::ElfBytes::<elf::endian::LittleEndian>::minimal_parse(&elf_data)
        .expect("could not parse ELF file");
    let elf = Elf::new(elf).expect("could not construct binary from ELF file");
    let mut binary = if elf.inner().ehdr.e_type == elf::abi::ET_DYN {
        elf.with_offset(0x8000_0000)
    } else {
        elf.with_offset(0)
    };

    let trace_path = matches.get_one::<PathBuf>("trace").unwrap();
    let trace = std::fs::read(trace_path).expect("could not read trace file");
    let mut data: &[u8] = &trace;

    let mut decoder = Decoder::new(config, VecStack::new(32).unwrap());

    while !data.is_empty() {
        let (packet, consumed) =
            decode_packet(data, config.address_bits()).expect("could not decode packet");
        data = &data[consumed..];
        if debug {
            eprintln!("packet: {packet:?}");
        }
        decoder
            .process(&packet, &mut binary, |traced| {
                println!("{:0x}", traced.pc);
            })
            .expect("error while tracing");
    }
}
