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

//! Input handling for the Chip-8 interpreter.
//!
//! The interpreter never polls a device itself; the front-end presses and
//! releases keys here between steps.

use std::default::Default;

use num::traits::FromPrimitive;

/// The number of keys on the Chip-8 controller.
pub const N_KEYS: usize = 16;

enum_from_primitive!{
/// The keys on the Chip-8 controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    K0 = 0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF
}
}

impl Key {
    /// Returns the key corresponding to the lowest four bits of the given
    /// byte.
    pub fn from_byte(b: u8) -> Key {
        Key::from_u8(b % N_KEYS as u8).unwrap()
    }
}

/// Represents the state of the input device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// The key states (`true` means "pressed").
    keys: [bool; N_KEYS],
}

impl State {
    /// Returns a new input state with all keys unpressed.
    pub fn new() -> Self {
        State::default()
    }

    /// Returns the lowest key that is pressed, if any.
    pub fn pressed(&self) -> Option<Key> {
        self.keys
            .iter()
            .position(|&down| down)
            .map(|i| Key::from_byte(i as u8))
    }

    /// Returns whether the given key is pressed.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Marks the given key as pressed.
    pub fn press(&mut self, key: Key) {
        self.set(key, true);
    }

    /// Marks the given key as released.
    pub fn release(&mut self, key: Key) {
        self.set(key, false);
    }

    /// Sets the state of a single key.
    pub fn set(&mut self, key: Key, down: bool) {
        self.keys[key as usize] = down;
    }

    /// Replaces the state of the whole keypad at once, indexed by key number.
    pub fn set_all(&mut self, keys: [bool; N_KEYS]) {
        self.keys = keys;
    }

    /// Returns the raw key states, indexed by key number.
    pub fn keys(&self) -> &[bool; N_KEYS] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut state = State::new();
        assert_eq!(state.pressed(), None);

        state.press(Key::KB);
        state.press(Key::K7);
        assert!(state.is_pressed(Key::KB));
        assert!(!state.is_pressed(Key::K0));
        assert_eq!(state.pressed(), Some(Key::K7));

        // Reading the state doesn't consume presses.
        assert_eq!(state.pressed(), Some(Key::K7));

        state.release(Key::K7);
        assert_eq!(state.pressed(), Some(Key::KB));
    }

    #[test]
    fn from_byte_uses_low_nibble() {
        assert_eq!(Key::from_byte(0x0F), Key::KF);
        assert_eq!(Key::from_byte(0x13), Key::K3);
    }

    #[test]
    fn set_all() {
        let mut state = State::new();
        let mut keys = [false; N_KEYS];
        keys[0xE] = true;

        state.set_all(keys);
        assert_eq!(state.pressed(), Some(Key::KE));
        assert_eq!(state.keys(), &keys);
    }
}
