// Copyright 2018 Ian Johnson

// This file is part of Chip-8.

// Chip-8 is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Chip-8 is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Chip-8.  If not, see <http://www.gnu.org/licenses/>.

//! Chip-8 instructions and opcodes.
//!
//! This module provides the basic types and functions for working with Chip-8
//! instructions and opcodes, including (most notably) the translation of
//! opcodes to the internal `Instruction` type.  Decoding happens in two
//! levels: the top nibble selects an instruction family, and for the families
//! that pack several operations together (`0`, `8`, `E` and `F`) the low
//! nibble or low byte picks the exact instruction.  Anything that doesn't fit
//! one of the 34 known patterns is rejected here, so the interpreter never
//! has to deal with an undefined instruction.

use std::fmt;

use num::FromPrimitive;

use MEM_SIZE;

/// The mask that reduces a value to the 12-bit address space.
const ADDR_MASK: u16 = 0xFFF;

/// An error resulting from an out-of-bounds address.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "address out of bounds: {:#04X}", _0)]
pub struct AddressOutOfBoundsError(pub usize);

/// An error resulting from an opcode which matches no known instruction.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "invalid opcode: {}", _0)]
pub struct InvalidOpcodeError(pub Opcode);

enum_from_primitive! {
/// A Chip-8 register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    V0 = 0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
}

impl Register {
    /// Returns the register named by the lowest four bits of the given value.
    pub fn from_nibble(n: u16) -> Register {
        // Every 4-bit value names a register, so this can't fail.
        Register::from_u16(n & 0xF).unwrap()
    }

    /// Returns the index of the register (0 for `V0`, 15 for `VF`).
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", *self)
    }
}

/// A Chip-8 opcode.
///
/// Having this as a wrapper around an ordinary `u16` allows for some nice
/// helper methods to be implemented, which make decoding opcodes much easier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Combines a high and a low byte (in memory order) into an opcode.
    pub fn from_bytes(high: u8, low: u8) -> Self {
        Opcode((high as u16) << 8 | low as u16)
    }

    /// Returns the top nibble, which selects the instruction family.
    fn family(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Returns the `Vx` register corresponding to this opcode.
    ///
    /// This does not guarantee that the result is actually meaningful.
    fn vx(&self) -> Register {
        Register::from_nibble((self.0 & 0x0F00) >> 8)
    }

    /// Returns the `Vy` register corresponding to this opcode.
    ///
    /// This does not guarantee that the result is actually meaningful.
    fn vy(&self) -> Register {
        Register::from_nibble((self.0 & 0x00F0) >> 4)
    }

    /// Returns the `nibble` corresponding to this opcode.
    ///
    /// This does not guarantee that the result is actually meaningful.
    fn nibble(&self) -> u8 {
        self.0 as u8 & 0xF
    }

    /// Returns the `byte` corresponding to this opcode.
    ///
    /// This does not guarantee that the result is actually meaningful.
    fn byte(&self) -> u8 {
        self.0 as u8
    }

    /// Returns the `addr` corresponding to this opcode.
    fn addr(&self) -> Address {
        Address::masked(self.0)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:04X}", self.0)
    }
}

/// An address pointing to a Chip-8 memory location.
///
/// Every instance of this type is within the 12-bit addressable range.  Values
/// can either be checked (`from_u16` and `from_usize`, which fail on anything
/// too large) or masked down to 12 bits (`masked`).
///
/// # Examples
///
/// ```
/// use chip8_vm::Address;
///
/// let addr = Address::from_u16(0x204).unwrap();
/// assert_eq!(addr.addr(), 0x204);
/// assert!(Address::from_u16(0x1000).is_err());
/// assert_eq!(Address::masked(0x1234).addr(), 0x234);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(usize);

impl Address {
    /// Verifies whether the given `u16` address value is valid, returning the
    /// corresponding `Address` if it is.
    pub fn from_u16(addr: u16) -> Result<Self, AddressOutOfBoundsError> {
        Address::from_usize(addr as usize)
    }

    /// Verifies whether the given `usize` address is valid, returning the
    /// corresponding `Address` if it is.
    pub fn from_usize(addr: usize) -> Result<Self, AddressOutOfBoundsError> {
        if addr >= MEM_SIZE {
            Err(AddressOutOfBoundsError(addr))
        } else {
            Ok(Address(addr))
        }
    }

    /// Returns the address given by the lowest 12 bits of `addr`.
    pub fn masked(addr: u16) -> Self {
        Address((addr & ADDR_MASK) as usize)
    }

    /// Returns the value of the address.
    pub fn addr(&self) -> usize {
        self.0
    }

    /// Adds an offset to this address, wrapping around the end of memory.
    pub fn wrapping_add(&self, offset: usize) -> Self {
        Address((self.0 + offset) % MEM_SIZE)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:03X}", self.0)
    }
}

/// A Chip-8 instruction.
///
/// This is an internal representation used to make working with instructions
/// easier; if this type were not present, then opcodes would have to be
/// deciphered every time an instruction is used, which would quickly become
/// inconvenient.  Also, this type guarantees that the instruction it
/// represents is valid, so there is no need to check opcode validity on every
/// use.
///
/// The shift instructions keep both register operands.  Which of them is
/// shifted depends on the interpreter's shift quirks setting, so decoding
/// never needs to know about it.
///
/// # Examples
///
/// Instructions can be created from opcodes:
///
/// ```
/// use chip8_vm::{Instruction, Opcode, Register};
///
/// let instr = Instruction::from_opcode(Opcode(0x7510)).unwrap();
/// assert_eq!(instr, Instruction::AddByte(Register::V5, 0x10));
/// ```
///
/// Opcodes that don't match any instruction are rejected:
///
/// ```
/// use chip8_vm::{Instruction, Opcode};
///
/// assert!(Instruction::from_opcode(Opcode(0x5121)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `CLS` (`00E0`).
    Cls,
    /// `RET` (`00EE`).
    Ret,
    /// `JP addr` (`1nnn`).
    Jp(Address),
    /// `CALL addr` (`2nnn`).
    Call(Address),
    /// `SE Vx, byte` (`3xkk`).
    SeByte(Register, u8),
    /// `SNE Vx, byte` (`4xkk`).
    SneByte(Register, u8),
    /// `SE Vx, Vy` (`5xy0`).
    SeReg(Register, Register),
    /// `LD Vx, byte` (`6xkk`).
    LdByte(Register, u8),
    /// `ADD Vx, byte` (`7xkk`).
    AddByte(Register, u8),
    /// `LD Vx, Vy` (`8xy0`).
    LdReg(Register, Register),
    /// `OR Vx, Vy` (`8xy1`).
    Or(Register, Register),
    /// `AND Vx, Vy` (`8xy2`).
    And(Register, Register),
    /// `XOR Vx, Vy` (`8xy3`).
    Xor(Register, Register),
    /// `ADD Vx, Vy` (`8xy4`).
    AddReg(Register, Register),
    /// `SUB Vx, Vy` (`8xy5`).
    Sub(Register, Register),
    /// `SHR Vx {, Vy}` (`8xy6`).
    Shr(Register, Register),
    /// `SUBN Vx, Vy` (`8xy7`).
    Subn(Register, Register),
    /// `SHL Vx {, Vy}` (`8xyE`).
    Shl(Register, Register),
    /// `SNE Vx, Vy` (`9xy0`).
    SneReg(Register, Register),
    /// `LD I, addr` (`Annn`).
    LdI(Address),
    /// `JP V0, addr` (`Bnnn`).
    JpV0(Address),
    /// `RND Vx, byte` (`Cxkk`).
    Rnd(Register, u8),
    /// `DRW Vx, Vy, nibble` (`Dxyn`).
    Drw(Register, Register, u8),
    /// `SKP Vx` (`Ex9E`).
    Skp(Register),
    /// `SKNP Vx` (`ExA1`).
    Sknp(Register),
    /// `LD Vx, DT` (`Fx07`).
    LdRegDt(Register),
    /// `LD Vx, K` (`Fx0A`).
    LdKey(Register),
    /// `LD DT, Vx` (`Fx15`).
    LdDtReg(Register),
    /// `LD ST, Vx` (`Fx18`).
    LdSt(Register),
    /// `ADD I, Vx` (`Fx1E`).
    AddI(Register),
    /// `LD F, Vx` (`Fx29`).
    LdF(Register),
    /// `LD B, Vx` (`Fx33`).
    LdB(Register),
    /// `LD [I], Vx` (`Fx55`).
    LdDerefIReg(Register),
    /// `LD Vx, [I]` (`Fx65`).
    LdRegDerefI(Register),
}

impl Instruction {
    /// Returns the instruction corresponding to the given opcode.
    pub fn from_opcode(opcode: Opcode) -> Result<Self, InvalidOpcodeError> {
        use self::Instruction::*;

        Ok(match opcode.family() {
            0x0 => match opcode.0 {
                0x00E0 => Cls,
                0x00EE => Ret,
                _ => return Err(InvalidOpcodeError(opcode)),
            },
            0x1 => Jp(opcode.addr()),
            0x2 => Call(opcode.addr()),
            0x3 => SeByte(opcode.vx(), opcode.byte()),
            0x4 => SneByte(opcode.vx(), opcode.byte()),
            0x5 if opcode.nibble() == 0 => SeReg(opcode.vx(), opcode.vy()),
            0x6 => LdByte(opcode.vx(), opcode.byte()),
            0x7 => AddByte(opcode.vx(), opcode.byte()),
            0x8 => match opcode.nibble() {
                0x0 => LdReg(opcode.vx(), opcode.vy()),
                0x1 => Or(opcode.vx(), opcode.vy()),
                0x2 => And(opcode.vx(), opcode.vy()),
                0x3 => Xor(opcode.vx(), opcode.vy()),
                0x4 => AddReg(opcode.vx(), opcode.vy()),
                0x5 => Sub(opcode.vx(), opcode.vy()),
                0x6 => Shr(opcode.vx(), opcode.vy()),
                0x7 => Subn(opcode.vx(), opcode.vy()),
                0xE => Shl(opcode.vx(), opcode.vy()),
                _ => return Err(InvalidOpcodeError(opcode)),
            },
            0x9 if opcode.nibble() == 0 => SneReg(opcode.vx(), opcode.vy()),
            0xA => LdI(opcode.addr()),
            0xB => JpV0(opcode.addr()),
            0xC => Rnd(opcode.vx(), opcode.byte()),
            0xD => Drw(opcode.vx(), opcode.vy(), opcode.nibble()),
            0xE => match opcode.byte() {
                0x9E => Skp(opcode.vx()),
                0xA1 => Sknp(opcode.vx()),
                _ => return Err(InvalidOpcodeError(opcode)),
            },
            0xF => match opcode.byte() {
                0x07 => LdRegDt(opcode.vx()),
                0x0A => LdKey(opcode.vx()),
                0x15 => LdDtReg(opcode.vx()),
                0x18 => LdSt(opcode.vx()),
                0x1E => AddI(opcode.vx()),
                0x29 => LdF(opcode.vx()),
                0x33 => LdB(opcode.vx()),
                0x55 => LdDerefIReg(opcode.vx()),
                0x65 => LdRegDerefI(opcode.vx()),
                _ => return Err(InvalidOpcodeError(opcode)),
            },
            _ => return Err(InvalidOpcodeError(opcode)),
        })
    }

    /// Returns the address operand of this instruction, if it has one.
    pub fn addr(&self) -> Option<Address> {
        use self::Instruction::*;

        match *self {
            Jp(addr) | Call(addr) | LdI(addr) | JpV0(addr) => Some(addr),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp(addr) => write!(f, "JP {}", addr),
            Call(addr) => write!(f, "CALL {}", addr),
            SeByte(reg, b) => write!(f, "SE {}, #{:02X}", reg, b),
            SneByte(reg, b) => write!(f, "SNE {}, #{:02X}", reg, b),
            SeReg(reg1, reg2) => write!(f, "SE {}, {}", reg1, reg2),
            LdByte(reg, b) => write!(f, "LD {}, #{:02X}", reg, b),
            AddByte(reg, b) => write!(f, "ADD {}, #{:02X}", reg, b),
            LdReg(reg1, reg2) => write!(f, "LD {}, {}", reg1, reg2),
            Or(reg1, reg2) => write!(f, "OR {}, {}", reg1, reg2),
            And(reg1, reg2) => write!(f, "AND {}, {}", reg1, reg2),
            Xor(reg1, reg2) => write!(f, "XOR {}, {}", reg1, reg2),
            AddReg(reg1, reg2) => write!(f, "ADD {}, {}", reg1, reg2),
            Sub(reg1, reg2) => write!(f, "SUB {}, {}", reg1, reg2),
            Shr(reg1, reg2) => write!(f, "SHR {}, {}", reg1, reg2),
            Subn(reg1, reg2) => write!(f, "SUBN {}, {}", reg1, reg2),
            Shl(reg1, reg2) => write!(f, "SHL {}, {}", reg1, reg2),
            SneReg(reg1, reg2) => write!(f, "SNE {}, {}", reg1, reg2),
            LdI(addr) => write!(f, "LD I, {}", addr),
            JpV0(addr) => write!(f, "JP V0, {}", addr),
            Rnd(reg, b) => write!(f, "RND {}, #{:02X}", reg, b),
            Drw(reg1, reg2, n) => write!(f, "DRW {}, {}, {}", reg1, reg2, n),
            Skp(reg) => write!(f, "SKP {}", reg),
            Sknp(reg) => write!(f, "SKNP {}", reg),
            LdRegDt(reg) => write!(f, "LD {}, DT", reg),
            LdKey(reg) => write!(f, "LD {}, K", reg),
            LdDtReg(reg) => write!(f, "LD DT, {}", reg),
            LdSt(reg) => write!(f, "LD ST, {}", reg),
            AddI(reg) => write!(f, "ADD I, {}", reg),
            LdF(reg) => write!(f, "LD F, {}", reg),
            LdB(reg) => write!(f, "LD B, {}", reg),
            LdDerefIReg(reg) => write!(f, "LD [I], {}", reg),
            LdRegDerefI(reg) => write!(f, "LD {}, [I]", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that one opcode of every instruction decodes to the right
    /// instruction.
    #[test]
    fn decode_all() {
        use super::Instruction::*;
        use super::Register::*;

        let cases = [
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1ABC, Jp(Address(0xABC))),
            (0x2F00, Call(Address(0xF00))),
            (0x3A42, SeByte(VA, 0x42)),
            (0x4B00, SneByte(VB, 0x00)),
            (0x5120, SeReg(V1, V2)),
            (0x6CFF, LdByte(VC, 0xFF)),
            (0x7D01, AddByte(VD, 0x01)),
            (0x8340, LdReg(V3, V4)),
            (0x8341, Or(V3, V4)),
            (0x8342, And(V3, V4)),
            (0x8343, Xor(V3, V4)),
            (0x8344, AddReg(V3, V4)),
            (0x8345, Sub(V3, V4)),
            (0x8346, Shr(V3, V4)),
            (0x8347, Subn(V3, V4)),
            (0x834E, Shl(V3, V4)),
            (0x9560, SneReg(V5, V6)),
            (0xA123, LdI(Address(0x123))),
            (0xB456, JpV0(Address(0x456))),
            (0xC70F, Rnd(V7, 0x0F)),
            (0xD89A, Drw(V8, V9, 0xA)),
            (0xE09E, Skp(V0)),
            (0xEFA1, Sknp(VF)),
            (0xF107, LdRegDt(V1)),
            (0xF20A, LdKey(V2)),
            (0xF315, LdDtReg(V3)),
            (0xF418, LdSt(V4)),
            (0xF51E, AddI(V5)),
            (0xF629, LdF(V6)),
            (0xF733, LdB(V7)),
            (0xF855, LdDerefIReg(V8)),
            (0xF965, LdRegDerefI(V9)),
        ];

        for &(opcode, ref instr) in cases.iter() {
            assert_eq!(
                Instruction::from_opcode(Opcode(opcode)).as_ref(),
                Ok(instr),
                "case {:04X}",
                opcode
            );
        }
    }

    /// Tests that opcodes outside the instruction set are rejected.
    #[test]
    fn decode_invalid() {
        let cases = [
            0x0000, 0x00E1, 0x00FF, 0x0123, 0x5121, 0x800F, 0x8008, 0x9001, 0xE09F, 0xE0A2,
            0xF000, 0xF030, 0xF075, 0xFFFF,
        ];

        for &opcode in cases.iter() {
            assert_eq!(
                Instruction::from_opcode(Opcode(opcode)),
                Err(InvalidOpcodeError(Opcode(opcode))),
                "case {:04X}",
                opcode
            );
        }
    }

    /// Counts the distinct instruction kinds produced by decoding every
    /// possible opcode.
    #[test]
    fn decode_exhaustive() {
        use std::collections::HashSet;
        use std::mem;

        let kinds: HashSet<_> = (0..=0xFFFFu32)
            .filter_map(|op| Instruction::from_opcode(Opcode(op as u16)).ok())
            .map(|instr| mem::discriminant(&instr))
            .collect();
        assert_eq!(kinds.len(), 34);
    }

    #[test]
    fn display() {
        use super::Register::*;

        let cases = [
            (Instruction::Cls, "CLS"),
            (Instruction::Jp(Address(0x200)), "JP #200"),
            (Instruction::LdByte(V0, 5), "LD V0, #05"),
            (Instruction::Drw(V1, V2, 5), "DRW V1, V2, 5"),
            (Instruction::LdRegDerefI(VF), "LD VF, [I]"),
        ];

        for &(ref instr, s) in cases.iter() {
            assert_eq!(instr.to_string(), s);
        }
    }

    #[test]
    fn opcode_from_bytes() {
        assert_eq!(Opcode::from_bytes(0x12, 0x34), Opcode(0x1234));
        assert_eq!(Opcode(0xD12F).to_string(), "#D12F");
    }

    #[test]
    fn address_bounds() {
        assert_eq!(Address::from_usize(0xFFF).map(|a| a.addr()), Ok(0xFFF));
        assert_eq!(Address::from_usize(0x1000), Err(AddressOutOfBoundsError(0x1000)));
        assert_eq!(Address::masked(0xFFFF).addr(), 0xFFF);
        assert_eq!(Address(0xFFE).wrapping_add(3).addr(), 0x001);
    }
}
