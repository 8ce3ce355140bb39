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

//! The Chip-8 display buffer and built-in font.

use std::default::Default;

use failure::Fail;

/// The width of the display.
pub const WIDTH: usize = 64;
/// The height of the display.
pub const HEIGHT: usize = 32;

/// The height of a font sprite.
pub const FONT_HEIGHT: usize = 5;

/// The hex digit sprites, in order from `0` to `F`.
pub const FONT_SPRITES: [[u8; FONT_HEIGHT]; 16] = [
    [0xF0, 0x90, 0x90, 0x90, 0xF0],
    [0x20, 0x60, 0x20, 0x20, 0x70],
    [0xF0, 0x10, 0xF0, 0x80, 0xF0],
    [0xF0, 0x10, 0xF0, 0x10, 0xF0],
    [0x90, 0x90, 0xF0, 0x10, 0x10],
    [0xF0, 0x80, 0xF0, 0x10, 0xF0],
    [0xF0, 0x80, 0xF0, 0x90, 0xF0],
    [0xF0, 0x10, 0x20, 0x40, 0x40],
    [0xF0, 0x90, 0xF0, 0x90, 0xF0],
    [0xF0, 0x90, 0xF0, 0x10, 0xF0],
    [0xF0, 0x90, 0xF0, 0x90, 0x90],
    [0xE0, 0x90, 0xE0, 0x90, 0xE0],
    [0xF0, 0x80, 0x80, 0x80, 0xF0],
    [0xE0, 0x90, 0x90, 0x90, 0xE0],
    [0xF0, 0x80, 0xF0, 0x80, 0xF0],
    [0xF0, 0x80, 0xF0, 0x80, 0x80],
];

/// A Chip-8 display buffer.
///
/// Pixels are stored row by row, so the pixel at `(x, y)` lives at index
/// `y * WIDTH + x` of `data()`.
pub struct Buffer {
    /// The underlying display buffer data.
    data: [bool; WIDTH * HEIGHT],
    /// Whether the display needs to be refreshed.
    needs_refresh: bool,
}

impl Buffer {
    /// Returns a new display buffer with all pixels clear.
    pub fn new() -> Self {
        Buffer {
            data: [false; WIDTH * HEIGHT],
            needs_refresh: true,
        }
    }

    /// Clears the display.
    pub fn clear(&mut self) {
        for elem in self.data.iter_mut() {
            *elem = false;
        }
        self.needs_refresh = true;
    }

    /// Returns a reference to the underlying pixel data.
    pub fn data(&self) -> &[bool; WIDTH * HEIGHT] {
        &self.data
    }

    /// Returns whether the pixel at the given position is on.
    ///
    /// Coordinates wrap around the edges of the screen.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.data[Buffer::index(x, y)]
    }

    /// Draws the given sprite with its top-left corner at the given position.
    ///
    /// Each byte of the sprite is one row of 8 pixels, most significant bit
    /// leftmost.  The starting position is taken modulo the screen size, and
    /// any part of the sprite that runs off an edge wraps around to the
    /// opposite edge.
    ///
    /// Returns whether there was a collision.
    pub fn draw_sprite(&mut self, sprite: &[u8], x: usize, y: usize) -> bool {
        let mut collision = false;

        for (j, row) in sprite.iter().enumerate() {
            for i in 0..8 {
                if row & (0x80 >> i) != 0 && self.toggle(x + i, y + j) {
                    collision = true;
                }
            }
        }

        collision
    }

    /// Forces a refresh on the next call to `refresh`, even if no draw
    /// operation has been performed.
    pub fn force_refresh(&mut self) {
        self.needs_refresh = true;
    }

    /// Refreshes the display using the given refresh function.
    ///
    /// If a refresh is unnecessary, nothing will be done.  The refresh
    /// function receives a "snapshot" of the display, and should draw that to
    /// whatever user-facing display buffer is currently being used.
    pub fn refresh<F, E>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce(&Self) -> Result<(), E>,
        E: Fail,
    {
        if self.needs_refresh {
            f(self)?;
            self.needs_refresh = false;
        }
        Ok(())
    }

    /// Flips the on/off state of the given pixel, returning whether it was
    /// flipped off from the on state.
    fn toggle(&mut self, x: usize, y: usize) -> bool {
        let idx = Buffer::index(x, y);
        let old = self.data[idx];
        self.data[idx] = !old;
        self.needs_refresh = true;

        old
    }

    fn index(x: usize, y: usize) -> usize {
        (y % HEIGHT) * WIDTH + x % WIDTH
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Fail)]
    #[fail(display = "refresh failed")]
    struct RefreshError;

    fn lit(buffer: &Buffer) -> usize {
        buffer.data().iter().filter(|&&p| p).count()
    }

    #[test]
    fn draw_and_collide() {
        let mut buffer = Buffer::new();

        assert!(!buffer.draw_sprite(&FONT_SPRITES[0], 10, 5));
        assert!(buffer.pixel(10, 5));
        assert!(!buffer.pixel(11, 6));
        assert_eq!(lit(&buffer), 14);

        // Drawing the same sprite again erases it.
        assert!(buffer.draw_sprite(&FONT_SPRITES[0], 10, 5));
        assert_eq!(lit(&buffer), 0);
    }

    /// Tests that sprites which run off an edge wrap to the opposite edge.
    #[test]
    fn draw_wraps() {
        let mut buffer = Buffer::new();

        assert!(!buffer.draw_sprite(&[0xFF, 0x81], WIDTH - 4, HEIGHT - 1));
        for x in WIDTH - 4..WIDTH {
            assert!(buffer.pixel(x, HEIGHT - 1), "x = {}", x);
        }
        for x in 0..4 {
            assert!(buffer.pixel(x, HEIGHT - 1), "x = {}", x);
        }
        assert!(buffer.pixel(WIDTH - 4, 0));
        assert!(buffer.pixel(3, 0));
        assert_eq!(lit(&buffer), 10);
    }

    #[test]
    fn draw_start_is_modulo() {
        let mut buffer = Buffer::new();

        buffer.draw_sprite(&[0x80], WIDTH + 3, HEIGHT * 2 + 7);
        assert!(buffer.data()[7 * WIDTH + 3]);
    }

    #[test]
    fn clear() {
        let mut buffer = Buffer::new();

        buffer.draw_sprite(&[0xFF; 15], 20, 20);
        assert!(lit(&buffer) > 0);
        buffer.clear();
        assert_eq!(lit(&buffer), 0);
    }

    #[test]
    fn refresh_only_when_needed() {
        let mut buffer = Buffer::new();
        let mut calls = 0;

        buffer
            .refresh(|_| -> Result<(), RefreshError> {
                calls += 1;
                Ok(())
            })
            .unwrap();
        buffer
            .refresh(|_| -> Result<(), RefreshError> {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(calls, 1);

        buffer.draw_sprite(&[0x80], 0, 0);
        buffer
            .refresh(|_| -> Result<(), RefreshError> {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(calls, 2);

        assert!(
            buffer
                .refresh(|_| -> Result<(), RefreshError> { Err(RefreshError) })
                .is_ok()
        );
        buffer.force_refresh();
        assert!(buffer.refresh(|_| Err(RefreshError)).is_err());
    }
}
