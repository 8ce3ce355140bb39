/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The Chip-8 disassembler.
//!
//! Programs are disassembled linearly, one 2-byte word at a time starting at
//! the program start address.  Chip-8 programs freely mix code and sprite
//! data, so a word that doesn't decode is printed as a `DW` directive rather
//! than treated as an error.

use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};

use failure::{Error, ResultExt};

use PROG_SIZE;
use PROG_START;
use instruction::{Address, Instruction, Opcode};
use interpreter::ProgramTooLargeError;

/// A single disassembled word (or trailing byte) of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    /// A word that decodes to an instruction.
    Instr(Opcode, Instruction),
    /// A word that isn't an instruction.
    Data(Opcode),
    /// A lone byte at the end of an odd-sized program.
    Byte(u8),
}

/// A disassembled line: a word and the address it lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub addr: Address,
    pub word: Word,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.word {
            Word::Instr(opcode, instr) => write!(f, "{}  {:04X}  {}", self.addr, opcode.0, instr),
            Word::Data(opcode) => write!(f, "{}  {:04X}  DW {}", self.addr, opcode.0, opcode),
            Word::Byte(b) => write!(f, "{}  {:02X}    DB #{:02X}", self.addr, b, b),
        }
    }
}

/// Contains the state of the disassembler.
pub struct Disassembler {
    /// The disassembled program.
    lines: Vec<Line>,
    /// Every address that some instruction refers to.
    labels: HashSet<Address>,
}

impl Disassembler {
    /// Creates a new disassembler from the given program data.
    pub fn new<R: Read>(input: &mut R) -> Result<Self, Error> {
        let mut prog = Vec::new();
        input
            .read_to_end(&mut prog)
            .context("could not read program data")?;
        Disassembler::from_bytes(&prog)
    }

    /// Creates a new disassembler from program data already in memory.
    pub fn from_bytes(prog: &[u8]) -> Result<Self, Error> {
        if prog.len() > PROG_SIZE {
            return Err(ProgramTooLargeError {
                size: prog.len(),
                max: PROG_SIZE,
            }.into());
        }

        let mut lines = Vec::with_capacity(prog.len() / 2 + 1);
        let mut labels = HashSet::new();

        for (n, chunk) in prog.chunks(2).enumerate() {
            let addr = Address::from_usize(PROG_START + 2 * n)?;
            let word = if chunk.len() == 2 {
                let opcode = Opcode::from_bytes(chunk[0], chunk[1]);
                match Instruction::from_opcode(opcode) {
                    Ok(instr) => {
                        if let Some(target) = instr.addr() {
                            labels.insert(target);
                        }
                        Word::Instr(opcode, instr)
                    }
                    Err(e) => {
                        debug!("treating word at {} as data: {}", addr, e);
                        Word::Data(opcode)
                    }
                }
            } else {
                Word::Byte(chunk[0])
            };
            lines.push(Line { addr, word });
        }

        Ok(Disassembler { lines, labels })
    }

    /// Returns the disassembled lines, in address order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Returns whether some instruction in the program refers to the given
    /// address.
    pub fn is_referenced(&self, addr: Address) -> bool {
        self.labels.contains(&addr)
    }

    /// Returns the lines at addresses that some instruction refers to.
    pub fn referenced_lines<'a>(&'a self) -> impl Iterator<Item = &'a Line> + 'a {
        self.lines
            .iter()
            .filter(move |line| self.is_referenced(line.addr))
    }

    /// Writes the disassembly to the given output, one line per word.
    ///
    /// Lines whose address is referenced elsewhere in the program are marked
    /// with a `*`.
    pub fn dump<W: Write>(&self, output: &mut W) -> Result<(), Error> {
        for line in &self.lines {
            let mark = if self.is_referenced(line.addr) { '*' } else { ' ' };
            writeln!(output, "{} {}", mark, line).context("could not write disassembly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words() {
        use instruction::Register::*;

        let disasm = Disassembler::from_bytes(&[0x60, 0x05, 0xFF, 0xFF, 0x12, 0x00, 0xAB]).unwrap();
        let words: Vec<_> = disasm.lines().iter().map(|line| line.word).collect();

        assert_eq!(
            words,
            vec![
                Word::Instr(Opcode(0x6005), Instruction::LdByte(V0, 5)),
                Word::Data(Opcode(0xFFFF)),
                Word::Instr(Opcode(0x1200), Instruction::Jp(Address::masked(0x200))),
                Word::Byte(0xAB),
            ]
        );
        assert_eq!(disasm.lines()[3].addr.addr(), 0x206);
        assert!(disasm.is_referenced(Address::masked(0x200)));
        assert!(!disasm.is_referenced(Address::masked(0x202)));
    }

    #[test]
    fn dump() {
        let disasm = Disassembler::from_bytes(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE]).unwrap();
        let mut output = Vec::new();
        disasm.dump(&mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "  #200  2204  CALL #204\n  #202  0000  DW #0000\n* #204  00EE  RET\n"
        );
    }

    #[test]
    fn referenced_lines() {
        // CALL #204; LD I, #208; RET; JP #200; sprite
        let disasm =
            Disassembler::from_bytes(&[0x22, 0x04, 0xA2, 0x08, 0x00, 0xEE, 0x12, 0x00, 0xF0, 0x90])
                .unwrap();
        let addrs: Vec<_> = disasm.referenced_lines().map(|line| line.addr.addr()).collect();

        assert_eq!(addrs, vec![0x200, 0x204, 0x208]);
    }

    #[test]
    fn too_large() {
        assert!(Disassembler::from_bytes(&[0; PROG_SIZE + 1]).is_err());
    }
}
