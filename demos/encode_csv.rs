// SPDX-License-Identifier: Apache-2.0
//! CSV-driven encoder
//!
//! Reads a CSV of retired-instruction records and feeds them through
//! [`generator::Encoder`], writing each emitted packet to an output file as a
//! concatenation of its wire bytes.
//!
//!     Usage: encode_csv <input.csv> [-o output] [-p params.toml]
//!
//! The input's header must be
//! `VALID,ADDRESS,INSN,PRIVILEGE,EXCEPTION,ECAUSE,TVAL,INTERRUPT`, numeric
//! fields hex except `VALID`/`EXCEPTION`/`INTERRUPT`, which are decimal
//! booleans.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use pulp_trace_codec::config::Config;
use pulp_trace_codec::generator::Encoder;
use pulp_trace_codec::packet::encode_packet;
use pulp_trace_codec::types::{Instr, Privilege};

fn main() {
    let matches = clap::Command::new("encode_csv")
        .arg(
            clap::arg!(<input> "Path to the CSV stimulus file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file").value_parser(clap::value_parser!(PathBuf)),
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

    let input = matches
        .get_one::<PathBuf>("input")
        .expect("no input file specified");
    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| input.with_extension("trace"));

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

    let input = std::fs::File::open(input).expect("could not open input file");
    let mut lines = std::io::BufReader::new(input).lines();

    let header = lines
        .next()
        .expect("no header in input")
        .expect("could not read header");
    assert_eq!(
        header.trim_end(),
        "VALID,ADDRESS,INSN,PRIVILEGE,EXCEPTION,ECAUSE,TVAL,INTERRUPT",
    );

    let mut output = std::io::BufWriter::new(
        std::fs::File::create(output).expect("could not create output file"),
    );

    let mut encoder = Encoder::new(config);
    let mut write_packet = |packet| {
        if debug {
            eprintln!("packet: {packet:?}");
        }
        let mut buf = [0u8; 16];
        let len = encode_packet(&packet, config.address_bits(), &mut buf)
            .expect("could not encode packet");
        output
            .write_all(&buf[..len])
            .expect("could not write packet");
    };

    for line in lines {
        let line = line.expect("could not read line");
        let record: StimulusLine = line.parse().expect("could not parse stimulus line");
        if let Some(packet) = encoder.step(record.into()).expect("encode step failed") {
            write_packet(packet);
        }
    }
    // Flush the window: two more empty steps surface `this`/`last` in turn.
    if let Some(packet) = encoder
        .step(Instr::default())
        .expect("encode step failed")
    {
        write_packet(packet);
    }
}

#[derive(Copy, Clone, Debug)]
struct StimulusLine {
    valid: bool,
    address: u64,
    insn: u64,
    privilege: Privilege,
    exception: bool,
    cause: u8,
    tval: u64,
    interrupt: bool,
}

impl FromStr for StimulusLine {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.trim_end().split(',');
        let mut next_bool = || -> Result<bool, String> {
            fields
                .next()
                .and_then(|f| f.parse::<u8>().ok())
                .map(|f| f != 0)
                .ok_or_else(|| line.to_string())
        };
        let valid = next_bool()?;
        let address = fields
            .next()
            .and_then(|f| u64::from_str_radix(f, 16).ok())
            .ok_or_else(|| line.to_string())?;
        let insn = fields
            .next()
            .and_then(|f| u64::from_str_radix(f, 16).ok())
            .ok_or_else(|| line.to_string())?;
        let privilege = fields
            .next()
            .and_then(|f| f.parse::<u8>().ok())
            .and_then(|f| Privilege::try_from(f).ok())
            .ok_or_else(|| line.to_string())?;
        let exception = next_bool()?;
        let cause = fields
            .next()
            .and_then(|f| u8::from_str_radix(f, 16).ok())
            .ok_or_else(|| line.to_string())?;
        let tval = fields
            .next()
            .and_then(|f| u64::from_str_radix(f, 16).ok())
            .ok_or_else(|| line.to_string())?;
        let interrupt = next_bool()?;

        Ok(Self {
            valid,
            address,
            insn,
            privilege,
            exception,
            cause,
            tval,
            interrupt,
        })
    }
}

impl From<StimulusLine> for Instr {
    fn from(line: StimulusLine) -> Self {
        Self {
            valid: line.valid,
            exception: line.exception,
            interrupt: line.interrupt,
            cause: line.cause,
            tval: line.tval,
            privilege: line.privilege,
            iaddr: line.address,
            instr: line.insn,
            compressed: line.insn & 0b11 != 0b11,
        }
    }
}
