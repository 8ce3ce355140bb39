/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The `chip8disasm` binary program.
//!
//! By default the whole program is listed, with a `*` in front of every line
//! that some jump, call or `LD I` refers to.

extern crate chip8_vm;
#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate failure;
#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, Write};
use std::process;

use clap::{App, ArgMatches};
use failure::{Error, ResultExt};
use log::LevelFilter;

use chip8_vm::Disassembler;
use chip8_vm::disassembler::Line;

/// Which lines to print, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    /// Every line, marking referenced ones.
    Marked,
    /// Every line, without marks.
    Plain,
    /// Only the referenced lines.
    Labels,
}

impl Listing {
    fn from_matches(matches: &ArgMatches) -> Listing {
        if matches.is_present("labels") {
            Listing::Labels
        } else if matches.is_present("no-marks") {
            Listing::Plain
        } else {
            Listing::Marked
        }
    }
}

fn main() {
    let matches = App::new("chip8disasm")
        .version(crate_version!())
        .author("Ian Johnson <ianprime0509@gmail.com>")
        .about("Lists a Chip-8 program as instructions")
        .args_from_usage(
            "-o, --output [OUTPUT] 'file to write the listing to (default stdout)'
             -n, --no-marks        'leave out the referenced-address marks'
             -l, --labels          'only list lines that the program refers to'
             -v, --verbose...      'increase verbosity'
             [FILE]                'program file (default stdin)'",
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));
    if let Err(e) = run(&matches) {
        error!("{}", e);
        for cause in e.causes().skip(1) {
            info!("caused by: {}", cause);
        }
        trace!("backtrace: {}", e.backtrace());
        process::exit(1);
    }
}

fn init_logging(verbosity: u64) {
    let filter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter(None, filter)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let listing = Listing::from_matches(matches);
    let source = matches.value_of("FILE").unwrap_or("-");

    let disasm = if source == "-" {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let disasm = Disassembler::new(&mut input).context("could not disassemble stdin")?;
        disasm
    } else {
        let mut input =
            File::open(source).with_context(|_| format!("could not open '{}'", source))?;
        Disassembler::new(&mut input)
            .with_context(|_| format!("could not disassemble '{}'", source))?
    };
    info!("disassembled {} words from '{}'", disasm.lines().len(), source);

    match matches.value_of("output") {
        Some(path) if path != "-" => {
            let mut output =
                File::create(path).with_context(|_| format!("could not create '{}'", path))?;
            write_listing(&disasm, listing, &mut output)
        }
        _ => {
            let stdout = io::stdout();
            let mut output = stdout.lock();
            write_listing(&disasm, listing, &mut output)
        }
    }
}

fn write_listing<'a, W: Write>(
    disasm: &'a Disassembler,
    listing: Listing,
    out: &mut W,
) -> Result<(), Error> {
    if listing == Listing::Marked {
        return disasm.dump(out);
    }

    let lines: Box<Iterator<Item = &'a Line> + 'a> = match listing {
        Listing::Labels => Box::new(disasm.referenced_lines()),
        _ => Box::new(disasm.lines().iter()),
    };
    for line in lines {
        writeln!(out, "{}", line).context("could not write disassembly")?;
    }
    Ok(())
}
