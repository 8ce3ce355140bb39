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

//! The Chip-8 interpreter.
//!
//! The main focus of this module is the `Interpreter` struct, which contains
//! the state of a Chip-8 machine and provides the main interface to be used
//! by the front-end.  Several options can be configured using the `Options`
//! struct, such as whether to use shift or load quirks mode.
//!
//! The interpreter is entirely passive.  The front-end calls `step` once per
//! instruction at whatever rate it likes and `tick_timers` 60 times a second,
//! presses keys through `input_mut` and reads the screen through `display`.
//! Each call to `step` either executes exactly one instruction or fails
//! without changing anything, so a front-end which gets an error can inspect
//! the machine exactly as it was when the faulting instruction was fetched.

use std::default::Default;
use std::io::Read;
use std::num::Wrapping;

use failure::{Error, ResultExt};
use rand::{self, Rng, SeedableRng, XorShiftRng};

use FONT_START;
use MEM_SIZE;
use PROG_SIZE;
use PROG_START;
use Register;
use display::{self, FONT_HEIGHT, FONT_SPRITES};
use input::{self, Key};
use instruction::{Address, AddressOutOfBoundsError, Instruction, Opcode};

/// The number of return addresses the call stack can hold.
pub const STACK_SIZE: usize = 16;

/// Fixed words mixed into a user-supplied seed so that the generator state is
/// never all zeros.
const SEED_WORDS: [u32; 3] = [0x193A_6754, 0xA8A7_D469, 0x9783_0E05];

/// An error resulting from an input program being too large.
#[derive(Debug, Fail)]
#[fail(display = "input program is too large ({} bytes, at most {} allowed)", size, max)]
pub struct ProgramTooLargeError {
    /// The size of the rejected program.
    pub size: usize,
    /// The largest program that fits in memory.
    pub max: usize,
}

/// An error resulting from fetching an opcode that isn't an instruction.
#[derive(Debug, Fail)]
#[fail(display = "unknown instruction {} at address #{:03X}", opcode, pc)]
pub struct UnknownInstructionError {
    /// The offending opcode.
    pub opcode: Opcode,
    /// The address it was fetched from.
    pub pc: u16,
}

/// An error resulting from a `CALL` with a full call stack.
#[derive(Debug, Fail)]
#[fail(display = "call stack overflow at address #{:03X}", pc)]
pub struct StackOverflowError {
    /// The address of the `CALL` that overflowed.
    pub pc: u16,
}

/// An error resulting from a `RET` outside of any subroutine.
#[derive(Debug, Fail)]
#[fail(display = "no subroutine to return from at address #{:03X}", pc)]
pub struct StackUnderflowError {
    /// The address of the unmatched `RET`.
    pub pc: u16,
}

/// Options for the interpreter.
pub struct Options {
    /// Whether to enable load quirks mode (default `false`).
    pub load_quirks: bool,
    /// Whether to enable shift quirks mode (default `false`).
    pub shift_quirks: bool,
    /// The seed for the `RND` generator (default `None`, meaning a seed
    /// taken from the operating system).
    pub rng_seed: Option<u32>,
}

impl Options {
    /// Returns the default set of options.
    pub fn new() -> Self {
        Options {
            load_quirks: false,
            shift_quirks: false,
            rng_seed: None,
        }
    }

    /// Returns a set of options useful for testing (e.g. a fixed seed).
    pub fn testing() -> Self {
        Options {
            load_quirks: false,
            shift_quirks: false,
            rng_seed: Some(0x0C8),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

/// A Chip-8 interpreter.
///
/// This struct contains the entire state of a Chip-8 machine and provides
/// all the expected methods for interacting with an interpreter, such as
/// stepping through execution and inspecting the internal state.
pub struct Interpreter {
    /// The internal memory.
    mem: [u8; MEM_SIZE],
    /// The display buffer.
    display: display::Buffer,
    /// The input state.
    input: input::State,
    /// The general-purpose registers `V0`-`VF`.
    regs: [Wrapping<u8>; 16],
    /// The special register `I`.
    reg_i: Address,
    /// The delay timer.
    reg_dt: u8,
    /// The sound timer.
    reg_st: u8,
    /// The program counter.
    pc: u16,
    /// The call stack (for returning from subroutines).
    stack: [u16; STACK_SIZE],
    /// The number of occupied slots in `stack`.
    sp: usize,
    /// The most recently executed opcode.
    opcode: Opcode,
    /// The generator behind `RND`.
    rng: XorShiftRng,

    /// Whether to use shift quirks mode.
    shift_quirks: bool,
    /// Whether to use load quirks mode.
    load_quirks: bool,
}

impl Interpreter {
    /// Returns a new interpreter with the default options.
    pub fn new() -> Self {
        Interpreter::with_options(Options::default())
    }

    /// Returns a new interpreter using the given options.
    pub fn with_options(options: Options) -> Self {
        debug!(
            "creating interpreter (shift quirks: {}, load quirks: {}, seed: {:?})",
            options.shift_quirks, options.load_quirks, options.rng_seed
        );

        let rng = match options.rng_seed {
            Some(seed) => {
                XorShiftRng::from_seed([seed, SEED_WORDS[0], SEED_WORDS[1], SEED_WORDS[2]])
            }
            None => rand::weak_rng(),
        };
        let mut interpreter = Interpreter {
            mem: [0; MEM_SIZE],
            display: display::Buffer::new(),
            input: input::State::new(),
            regs: [Wrapping(0); 16],
            reg_i: Address::masked(0),
            reg_dt: 0,
            reg_st: 0,
            pc: PROG_START as u16,
            stack: [0; STACK_SIZE],
            sp: 0,
            opcode: Opcode(0),
            rng,

            shift_quirks: options.shift_quirks,
            load_quirks: options.load_quirks,
        };

        // Copy sprites into memory.
        for (i, sprite) in FONT_SPRITES.iter().enumerate() {
            let start = FONT_START + i * FONT_HEIGHT;
            let end = start + sprite.len();
            interpreter.mem[start..end].copy_from_slice(sprite);
        }

        interpreter
    }

    /// Copies the given program into memory at the program start address.
    ///
    /// Nothing but the program region is touched, so loading again over an
    /// already running program keeps its registers, timers and stack.  A
    /// program which doesn't fit is rejected before anything is written.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Error> {
        if program.len() > PROG_SIZE {
            return Err(ProgramTooLargeError {
                size: program.len(),
                max: PROG_SIZE,
            }.into());
        }
        self.mem[PROG_START..PROG_START + program.len()].copy_from_slice(program);
        debug!("loaded {} bytes of program data", program.len());
        Ok(())
    }

    /// Loads program data from the specified source.
    pub fn load_program<R: Read>(&mut self, input: &mut R) -> Result<(), Error> {
        let mut program = Vec::new();
        input
            .read_to_end(&mut program)
            .context("could not read program data")?;
        self.load(&program)
    }

    /// Returns a reference to the display buffer.
    pub fn display(&self) -> &display::Buffer {
        &self.display
    }

    /// Returns a mutable reference to the display buffer.
    pub fn display_mut(&mut self) -> &mut display::Buffer {
        &mut self.display
    }

    /// Returns a reference to the input state.
    pub fn input(&self) -> &input::State {
        &self.input
    }

    /// Returns a mutable reference to the input state.
    pub fn input_mut(&mut self) -> &mut input::State {
        &mut self.input
    }

    /// Returns a reference to the internal memory.
    pub fn mem(&self) -> &[u8; MEM_SIZE] {
        &self.mem
    }

    /// Returns a mutable reference to the internal memory.
    pub fn mem_mut(&mut self) -> &mut [u8; MEM_SIZE] {
        &mut self.mem
    }

    /// Returns the value of register `I`.
    pub fn i(&self) -> Address {
        self.reg_i
    }

    /// Sets the value of register `I`.
    pub fn set_i(&mut self, val: Address) {
        self.reg_i = val;
    }

    /// Returns the value of the delay timer.
    pub fn dt(&self) -> u8 {
        self.reg_dt
    }

    /// Sets the value of the delay timer.
    pub fn set_dt(&mut self, val: u8) {
        self.reg_dt = val;
    }

    /// Returns the value of the sound timer.
    ///
    /// The buzzer should sound whenever this is nonzero.
    pub fn st(&self) -> u8 {
        self.reg_st
    }

    /// Sets the value of the sound timer.
    pub fn set_st(&mut self, val: u8) {
        self.reg_st = val;
    }

    /// Returns the value in the given register.
    pub fn register(&self, reg: Register) -> u8 {
        self.regs[reg.index()].0
    }

    /// Sets the given register to the given value.
    pub fn set_register(&mut self, reg: Register, val: u8) {
        self.regs[reg.index()].0 = val
    }

    /// Returns a copy of all sixteen registers, `V0` first.
    pub fn registers(&self) -> [u8; 16] {
        let mut regs = [0; 16];
        for (dest, src) in regs.iter_mut().zip(self.regs.iter()) {
            *dest = src.0;
        }
        regs
    }

    /// Returns the value of the program counter.
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Sets the value of the program counter.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Returns the number of return addresses on the call stack.
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Returns the return addresses on the call stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    /// Returns the opcode of the most recently executed instruction.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the instruction at the program counter.
    pub fn current_instruction(&self) -> Result<Instruction, Error> {
        let opcode = self.current_opcode()?;
        Instruction::from_opcode(opcode).map_err(|e| {
            UnknownInstructionError {
                opcode: e.0,
                pc: self.pc,
            }.into()
        })
    }

    /// Returns the opcode at the program counter.
    pub fn current_opcode(&self) -> Result<Opcode, AddressOutOfBoundsError> {
        let addr = self.pc as usize;
        if addr + 1 >= MEM_SIZE {
            return Err(AddressOutOfBoundsError(addr + 1));
        }
        Ok(Opcode::from_bytes(self.mem[addr], self.mem[addr + 1]))
    }

    /// Performs a single execution step.
    ///
    /// On error, the interpreter is left exactly as it was before the call.
    pub fn step(&mut self) -> Result<(), Error> {
        let opcode = self.current_opcode()
            .context("could not fetch next instruction")?;
        let instr = Instruction::from_opcode(opcode).map_err(|e| UnknownInstructionError {
            opcode: e.0,
            pc: self.pc,
        })?;
        trace!("#{:03X}: {}", self.pc, instr);
        self.execute(instr)?;
        self.opcode = opcode;
        Ok(())
    }

    /// Decrements the delay and sound timers, stopping at zero.
    ///
    /// This should be called 60 times per second, independently of `step`.
    pub fn tick_timers(&mut self) {
        self.reg_dt = self.reg_dt.saturating_sub(1);
        self.reg_st = self.reg_st.saturating_sub(1);
    }

    /// Executes the given instruction in the current interpreter context.
    ///
    /// The interpreter will behave as if the given instruction were executed
    /// at the current program location in memory: the program counter is
    /// taken to be already past the instruction, so skips land two bytes
    /// further on and jumps replace it outright.
    pub fn execute(&mut self, ins: Instruction) -> Result<(), Error> {
        use self::Instruction::*;

        let next = self.pc.wrapping_add(2);
        let skip_if = |cond: bool| if cond { next.wrapping_add(2) } else { next };

        self.pc = match ins {
            Cls => {
                self.display.clear();
                next
            }
            Ret => {
                if self.sp == 0 {
                    return Err(StackUnderflowError { pc: self.pc }.into());
                }
                self.sp -= 1;
                self.stack[self.sp]
            }
            Jp(addr) => addr.addr() as u16,
            Call(addr) => {
                if self.sp == STACK_SIZE {
                    return Err(StackOverflowError { pc: self.pc }.into());
                }
                self.stack[self.sp] = next;
                self.sp += 1;
                addr.addr() as u16
            }
            SeByte(reg, b) => skip_if(self.register(reg) == b),
            SneByte(reg, b) => skip_if(self.register(reg) != b),
            SeReg(reg1, reg2) => skip_if(self.register(reg1) == self.register(reg2)),
            LdByte(reg, b) => {
                self.set_register(reg, b);
                next
            }
            AddByte(reg, b) => {
                self.regs[reg.index()] += Wrapping(b);
                next
            }
            LdReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.set_register(reg1, r2);
                next
            }
            Or(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 | r2);
                next
            }
            And(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 & r2);
                next
            }
            Xor(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 ^ r2);
                next
            }
            AddReg(reg1, reg2) => {
                self.add(reg1, reg2);
                next
            }
            Sub(reg1, reg2) => {
                self.sub(reg1, reg2);
                next
            }
            Shr(reg1, reg2) => {
                self.shr(reg1, reg2);
                next
            }
            Subn(reg1, reg2) => {
                self.subn(reg1, reg2);
                next
            }
            Shl(reg1, reg2) => {
                self.shl(reg1, reg2);
                next
            }
            SneReg(reg1, reg2) => skip_if(self.register(reg1) != self.register(reg2)),
            LdI(addr) => {
                self.reg_i = addr;
                next
            }
            JpV0(addr) => {
                let target = addr.addr() + self.register(Register::V0) as usize;
                if target >= MEM_SIZE {
                    warn!("JP V0 target #{:X} wrapped around memory", target);
                }
                Address::masked(target as u16).addr() as u16
            }
            Rnd(reg, b) => {
                let r = self.rng.gen::<u8>();
                self.set_register(reg, r & b);
                next
            }
            Drw(reg1, reg2, n) => {
                self.drw(reg1, reg2, n)
                    .with_context(|_| format!("error executing {}", ins))?;
                next
            }
            Skp(reg) => skip_if(self.input.is_pressed(Key::from_byte(self.register(reg)))),
            Sknp(reg) => skip_if(!self.input.is_pressed(Key::from_byte(self.register(reg)))),
            LdRegDt(reg) => {
                let dt = self.dt();
                self.set_register(reg, dt);
                next
            }
            // Without a key press the instruction is fetched again next step.
            LdKey(reg) => match self.input.pressed() {
                Some(key) => {
                    self.set_register(reg, key as u8);
                    next
                }
                None => self.pc,
            },
            LdDtReg(reg) => {
                let r = self.register(reg);
                self.set_dt(r);
                next
            }
            LdSt(reg) => {
                let r = self.register(reg);
                self.set_st(r);
                next
            }
            AddI(reg) => {
                let r = self.register(reg) as usize;
                self.reg_i = self.reg_i.wrapping_add(r);
                next
            }
            LdF(reg) => {
                let digit = (self.register(reg) & 0xF) as usize;
                self.reg_i = Address::masked((FONT_START + FONT_HEIGHT * digit) as u16);
                next
            }
            LdB(reg) => {
                self.ld_b(reg)
                    .with_context(|_| format!("error executing {}", ins))?;
                next
            }
            LdDerefIReg(reg) => {
                self.ld_deref_i_reg(reg)
                    .with_context(|_| format!("error executing {}", ins))?;
                next
            }
            LdRegDerefI(reg) => {
                self.ld_reg_deref_i(reg)
                    .with_context(|_| format!("error executing {}", ins))?;
                next
            }
        };

        Ok(())
    }

    /// Sets `reg1` to `reg1 + reg2`, setting `VF` to 1 on carry or 0
    /// otherwise.
    fn add(&mut self, reg1: Register, reg2: Register) {
        let sum = self.register(reg1) as u16 + self.register(reg2) as u16;
        self.set_register(Register::VF, (sum > 0xFF) as u8);
        self.set_register(reg1, sum as u8);
    }

    /// Sets `reg1` to `reg1 - reg2`, setting `VF` to 1 if `reg1` was strictly
    /// greater than `reg2` or 0 otherwise.
    fn sub(&mut self, reg1: Register, reg2: Register) {
        let r1 = self.register(reg1);
        let r2 = self.register(reg2);
        self.set_register(Register::VF, (r1 > r2) as u8);
        self.set_register(reg1, r1.wrapping_sub(r2));
    }

    /// Sets `reg1` to `reg2 - reg1`, setting `VF` to 1 if `reg2` was strictly
    /// greater than `reg1` or 0 otherwise.
    fn subn(&mut self, reg1: Register, reg2: Register) {
        let r1 = self.register(reg1);
        let r2 = self.register(reg2);
        self.set_register(Register::VF, (r2 > r1) as u8);
        self.set_register(reg1, r2.wrapping_sub(r1));
    }

    /// Returns the register a shift instruction reads from.
    fn shift_source(&self, reg1: Register, reg2: Register) -> u8 {
        if self.shift_quirks {
            self.register(reg2)
        } else {
            self.register(reg1)
        }
    }

    /// Sets `reg1` to its source shifted right, setting `VF` to the old
    /// lowest bit.
    fn shr(&mut self, reg1: Register, reg2: Register) {
        let src = self.shift_source(reg1, reg2);
        self.set_register(Register::VF, src & 1);
        self.set_register(reg1, src >> 1);
    }

    /// Sets `reg1` to its source shifted left, setting `VF` to the old
    /// highest bit.
    fn shl(&mut self, reg1: Register, reg2: Register) {
        let src = self.shift_source(reg1, reg2);
        self.set_register(Register::VF, src >> 7);
        self.set_register(reg1, src << 1);
    }

    /// Returns the range of `len` bytes starting at `I`, or an error if it
    /// would run past the end of memory.
    fn i_range(&self, len: usize) -> Result<(usize, usize), AddressOutOfBoundsError> {
        let start = self.reg_i.addr();
        let end = start + len;
        if end > MEM_SIZE {
            Err(AddressOutOfBoundsError(end - 1))
        } else {
            Ok((start, end))
        }
    }

    /// Implements the `DRW` operation.
    fn drw(&mut self, reg1: Register, reg2: Register, n: u8) -> Result<(), Error> {
        let (start, end) = self.i_range(n as usize)?;
        let x = self.register(reg1) as usize;
        let y = self.register(reg2) as usize;

        let collision = self.display.draw_sprite(&self.mem[start..end], x, y);
        self.set_register(Register::VF, collision as u8);
        Ok(())
    }

    /// Implements the `LD B, Vx` operation.
    fn ld_b(&mut self, reg: Register) -> Result<(), Error> {
        let val = self.register(reg);
        let (start, _) = self.i_range(3)?;

        self.mem[start] = val / 100;
        self.mem[start + 1] = val % 100 / 10;
        self.mem[start + 2] = val % 10;
        Ok(())
    }

    /// Implements the `LD [I], Vx` operation.
    fn ld_deref_i_reg(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg.index() + 1;
        let (start, end) = self.i_range(count)?;

        for (dest, src) in self.mem[start..end].iter_mut().zip(self.regs.iter()) {
            *dest = src.0;
        }
        if self.load_quirks {
            self.reg_i = self.reg_i.wrapping_add(count);
        }
        Ok(())
    }

    /// Implements the `LD Vx, [I]` operation.
    fn ld_reg_deref_i(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg.index() + 1;
        let (start, end) = self.i_range(count)?;

        for (dest, src) in self.regs.iter_mut().zip(self.mem[start..end].iter()) {
            *dest = Wrapping(*src);
        }
        if self.load_quirks {
            self.reg_i = self.reg_i.wrapping_add(count);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
