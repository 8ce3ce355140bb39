/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! A Chip-8 virtual machine.
//!
//! The `Interpreter` owns the whole machine (memory, registers, stack, timers,
//! display and keypad) and executes one instruction per call to `step`.
//! Everything to do with the outside world is left to the front-end: loading
//! the ROM bytes, pacing execution, ticking the timers at 60Hz, drawing the
//! display buffer, feeding in key presses and sounding the buzzer.
//!
//! ```
//! use chip8_vm::{Interpreter, Register};
//!
//! let mut interpreter = Interpreter::new();
//! // LD V0, #05; LD V1, #03; ADD V0, V1
//! interpreter.load(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14]).unwrap();
//! for _ in 0..3 {
//!     interpreter.step().unwrap();
//! }
//! assert_eq!(interpreter.register(Register::V0), 8);
//! assert_eq!(interpreter.pc(), 0x206);
//! ```

#[macro_use]
extern crate enum_primitive;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;
extern crate time;

/// The size of the Chip-8's memory, in bytes.
pub const MEM_SIZE: usize = 0x1000;
/// The address where programs should be loaded.
pub const PROG_START: usize = 0x200;
/// The maximum size of a Chip-8 program, in bytes.
pub const PROG_SIZE: usize = MEM_SIZE - PROG_START;
/// The address where the font sprites are stored.
pub const FONT_START: usize = 0x50;

pub mod disassembler;
pub mod display;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod timer;

pub use disassembler::Disassembler;
pub use instruction::{Address, AddressOutOfBoundsError, Instruction, InvalidOpcodeError, Opcode,
                      Register};
pub use interpreter::Interpreter;
