//! Pausable answer-window countdown
//!
//! The countdown is driven by tick events from a 1 Hz producer (see
//! [`crate::runtime`]). It only ever changes in response to calls from the
//! round state machine, which owns it.

use serde::Serialize;

/// What a tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerSignal {
    /// One second elapsed and time remains
    Tick {
        /// Seconds left after this tick
        remaining: u64,
    },
    /// The countdown reached zero; sent once per start
    Expired,
}

/// A whole-second countdown that can be paused, resumed and cancelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Timer {
    remaining: u64,
    running: bool,
    paused: bool,
}

impl Timer {
    /// Starts (or restarts) the countdown from `seconds`
    pub fn start(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.running = true;
        self.paused = false;
    }

    /// Sets the displayed value and freezes the countdown until [`Timer::start`]
    /// or [`Timer::resume`] is called
    pub fn hold(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.running = true;
        self.paused = true;
    }

    /// Freezes the countdown without losing the remaining time
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continues from the frozen value
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stops the countdown; further ticks do nothing
    pub fn cancel(&mut self) {
        self.running = false;
        self.paused = false;
    }

    /// Applies one elapsed second
    ///
    /// # Returns
    ///
    /// `None` when the countdown is stopped or paused, otherwise the signal
    /// produced by this second.
    pub fn tick(&mut self) -> Option<TimerSignal> {
        if !self.running || self.paused {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.running = false;
            Some(TimerSignal::Expired)
        } else {
            Some(TimerSignal::Tick {
                remaining: self.remaining,
            })
        }
    }

    /// Seconds left on the countdown
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the countdown would react to a tick
    pub fn is_counting(&self) -> bool {
        self.running && !self.paused
    }
}
