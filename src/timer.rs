/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! A basic wall-clock timer for front-ends.
//!
//! The interpreter itself has no notion of time: the front-end decides how
//! often to call `Interpreter::step` and `Interpreter::tick_timers`.  This
//! timer reports how many periods of a fixed frequency have gone by, which is
//! all a front-end needs to pace both.

use std::num::Wrapping;

use time;

/// A basic timer.
#[derive(Debug)]
pub struct Timer {
    /// The frequency at which to run the timer.
    frequency: u32,
    /// An internal number of ticks.
    ticks: Wrapping<u32>,
}

impl Timer {
    /// Returns a new timer running at the given frequency, in Hz.
    pub fn new(frequency: u32) -> Self {
        let mut timer = Timer {
            frequency,
            ticks: Wrapping(0),
        };
        timer.update(time::precise_time_ns());
        timer
    }

    /// Returns the frequency of the timer.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Returns the number of ticks which have elapsed since the last call to
    /// this method (or the creation of the timer).
    pub fn lap(&mut self) -> u32 {
        self.lap_at(time::precise_time_ns())
    }

    /// Does the work of `lap` given the current time in nanoseconds.
    fn lap_at(&mut self, now_ns: u64) -> u32 {
        let old = self.ticks;
        self.update(now_ns);
        (self.ticks - old).0
    }

    /// Updates the internal tick count.
    fn update(&mut self, now_ns: u64) {
        self.ticks = Wrapping((now_ns as f64 * self.frequency as f64 / 1e9) as u64 as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_counts_whole_periods() {
        let mut timer = Timer::new(60);
        timer.update(0);

        assert_eq!(timer.lap_at(1_000_000_000 / 120), 0);
        assert_eq!(timer.lap_at(1_000_000_000 / 60 + 1), 1);
        assert_eq!(timer.lap_at(1_000_000_000), 59);
        assert_eq!(timer.lap_at(1_000_000_000), 0);
    }
}
