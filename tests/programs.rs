/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Runs small programs through the interpreter's public interface and checks
//! the machine state they leave behind.

extern crate chip8_vm;

use std::io::Cursor;

use chip8_vm::Register::*;
use chip8_vm::interpreter::{Options, StackOverflowError, STACK_SIZE};
use chip8_vm::{Interpreter, FONT_START, PROG_SIZE, PROG_START};

/// Returns an interpreter which has run the given number of steps of the
/// given program.
fn run(program: &[u8], steps: usize) -> Interpreter {
    let mut interpreter = Interpreter::with_options(Options::testing());
    interpreter.load(program).unwrap();
    for n in 0..steps {
        interpreter
            .step()
            .unwrap_or_else(|e| panic!("step {} failed: {}", n, e));
    }
    interpreter
}

#[test]
fn load_places_program_verbatim() {
    let lengths = [0, 1, 2, 77, PROG_SIZE];

    for &len in lengths.iter() {
        let program: Vec<u8> = (0..len).map(|n| (n * 7 + 3) as u8).collect();
        let mut interpreter = Interpreter::with_options(Options::testing());
        interpreter.load_program(&mut Cursor::new(&program)).unwrap();

        assert_eq!(
            &interpreter.mem()[PROG_START..PROG_START + len],
            program.as_slice(),
            "length {}",
            len
        );
        assert!(interpreter.mem()[PROG_START + len..].iter().all(|&b| b == 0));
    }
}

#[test]
fn fresh_machine() {
    let interpreter = Interpreter::new();

    assert_eq!(interpreter.pc(), 0x200);
    assert_eq!(interpreter.sp(), 0);
    assert_eq!(interpreter.registers(), [0; 16]);
    assert_eq!(interpreter.i().addr(), 0);
    assert_eq!((interpreter.dt(), interpreter.st()), (0, 0));
    assert!(interpreter.display().data().iter().all(|&p| !p));
    assert_eq!(
        &interpreter.mem()[FONT_START..FONT_START + 5],
        &[0xF0, 0x90, 0x90, 0x90, 0xF0]
    );
    assert_eq!(interpreter.mem()[FONT_START + 79], 0x80);
}

#[test]
fn clear_screen() {
    // LD I, font 8; DRW V0, V1, 5; LD V0, #20; DRW V0, V1, 5; CLS
    let mut interpreter = run(
        &[0xA0, 0x78, 0xD0, 0x15, 0x60, 0x20, 0xD0, 0x15, 0x00, 0xE0],
        4,
    );
    assert!(interpreter.display().data().iter().any(|&p| p));

    interpreter.step().unwrap();
    assert!(interpreter.display().data().iter().all(|&p| !p));
}

#[test]
fn add_sets_carry() {
    let values = [0u8, 1, 2, 100, 127, 128, 155, 156, 200, 254, 255];

    for &a in values.iter() {
        for &b in values.iter() {
            // LD V0, a; LD V1, b; ADD V0, V1
            let interpreter = run(&[0x60, a, 0x61, b, 0x80, 0x14], 3);
            let sum = a as u32 + b as u32;
            assert_eq!(interpreter.register(V0), sum as u8, "{} + {}", a, b);
            assert_eq!(interpreter.register(VF), (sum > 255) as u8, "{} + {}", a, b);
        }
    }
}

#[test]
fn sub_sets_not_borrow() {
    let values = [0u8, 1, 2, 100, 127, 128, 200, 254, 255];

    for &a in values.iter() {
        for &b in values.iter() {
            // LD V0, a; LD V1, b; SUB V0, V1
            let interpreter = run(&[0x60, a, 0x61, b, 0x80, 0x15], 3);
            assert_eq!(interpreter.register(V0), a.wrapping_sub(b), "{} - {}", a, b);
            assert_eq!(interpreter.register(VF), (a > b) as u8, "{} - {}", a, b);
        }
    }
}

#[test]
fn call_then_return() {
    // JP #206; (padding); CALL #20A; (padding); RET
    let program = [0x12, 0x06, 0x00, 0x00, 0x00, 0x00, 0x22, 0x0A, 0x00, 0x00, 0x00, 0xEE];
    let mut interpreter = run(&program, 2);
    assert_eq!(interpreter.pc(), 0x20A);
    assert_eq!(interpreter.stack(), &[0x208]);

    interpreter.step().unwrap();
    assert_eq!(interpreter.pc(), 0x208);
    assert_eq!(interpreter.sp(), 0);
}

#[test]
fn call_overflows_on_seventeenth() {
    // Each subroutine calls the next one, 17 deep.
    let mut program = Vec::new();
    for n in 0..=STACK_SIZE {
        let target = PROG_START + 2 * (n + 1);
        program.push(0x20 | (target >> 8) as u8);
        program.push(target as u8);
    }
    let mut interpreter = run(&program, STACK_SIZE);
    assert_eq!(interpreter.sp(), STACK_SIZE);

    let err = interpreter.step().unwrap_err();
    assert!(err.downcast_ref::<StackOverflowError>().is_some());
}

#[test]
fn font_address() {
    // LD I, #300; LD V3, #0A; LD F, V3
    let interpreter = run(&[0xA3, 0x00, 0x63, 0x0A, 0xF3, 0x29], 3);
    assert_eq!(interpreter.i().addr(), FONT_START + 50);
}

#[test]
fn draw_twice_collides() {
    // LD I, #208; DRW V0, V0, 2; DRW V0, V0, 2; JP #206; sprite
    let program = [0xA2, 0x08, 0xD0, 0x02, 0xD0, 0x02, 0x12, 0x06, 0xC3, 0x3C, 0x81, 0x7E];
    let mut interpreter = run(&program, 2);
    assert_eq!(interpreter.register(VF), 0);
    assert!(interpreter.display().pixel(0, 0));
    assert!(interpreter.display().pixel(7, 0));
    assert!(!interpreter.display().pixel(2, 0));

    interpreter.step().unwrap();
    assert_eq!(interpreter.register(VF), 1);
    assert!(interpreter.display().data().iter().all(|&p| !p));
}

#[test]
fn add_program() {
    let interpreter = run(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x14], 3);

    assert_eq!(interpreter.register(V0), 8);
    assert_eq!(interpreter.register(VF), 0);
    assert_eq!(interpreter.pc(), 0x206);
}

#[test]
fn self_jump() {
    let mut interpreter = run(&[0x12, 0x00], 0);
    let mem = *interpreter.mem();

    for _ in 0..1000 {
        interpreter.step().unwrap();
        assert_eq!(interpreter.pc(), 0x200);
    }
    assert_eq!(interpreter.registers(), [0; 16]);
    assert_eq!(interpreter.sp(), 0);
    assert_eq!(interpreter.i().addr(), 0);
    assert_eq!(&interpreter.mem()[..], &mem[..]);
}

#[test]
fn bcd_and_register_dump() {
    // LD V0, #FE; LD I, #300; LD B, V0; LD V2, [I]
    let interpreter = run(&[0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33, 0xF2, 0x65], 4);

    assert_eq!(&interpreter.mem()[0x300..0x303], &[2, 5, 4]);
    assert_eq!(&interpreter.registers()[..3], &[2, 5, 4]);
}

#[test]
fn countdown_with_delay_timer() {
    // LD V0, #03; LD DT, V0; loop: LD V1, DT; SE V1, #00; JP loop; JP end
    let program = [0x60, 0x03, 0xF0, 0x15, 0xF1, 0x07, 0x31, 0x00, 0x12, 0x04, 0x12, 0x0A];
    let mut interpreter = run(&program, 2);

    for _ in 0..3 {
        for _ in 0..3 {
            interpreter.step().unwrap();
        }
        assert_eq!(interpreter.pc(), 0x204);
        interpreter.tick_timers();
    }

    // The timer has reached zero, so the skip now falls through to the end.
    for _ in 0..3 {
        interpreter.step().unwrap();
    }
    assert_eq!(interpreter.pc(), 0x20A);
}
