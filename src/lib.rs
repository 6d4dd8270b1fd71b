//! # Scan Quiz Engine
//!
//! This library provides the core of a token-triggered trivia kiosk. A token,
//! decoded from a scanned optical code or sent by a hardware answer box,
//! opens a timed round; the first answer from the screen, the keyboard or the
//! answer box closes it and earns points weighted by the time left. Finished
//! sessions can be saved to a ten-entry hall of fame.
//!
//! All input is funnelled through one ordered queue of [`Envelope`]s that a
//! single [`dispatcher::Dispatcher`] consumes, so the round state machine never
//! sees two events at once.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]

use serde::Serialize;
use web_time::Instant;

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod game;
pub mod gate;
pub mod hardware;
pub mod leaderboard;
pub mod names;
pub mod presenter;
pub mod router;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod store;
pub mod timer;
pub mod vocabulary;

/// Announcements sent to presenters as things happen
#[derive(Debug, Serialize, Clone, PartialEq, Eq, derive_more::From)]
pub enum Notice {
    /// Round state machine updates
    Game(game::Fact),
    /// A scanned token was not recognised
    Unrecognised {
        /// Text as decoded
        raw: String,
        /// Why it was refused
        reason: gate::Rejection,
    },
    /// The hall of fame changed
    Leaderboard(Vec<leaderboard::LeaderboardEntry>),
    /// A result could not be saved
    SaveFailed(game::Error),
    /// The answer box connected or went away
    Hardware(hardware::Link),
}

impl Notice {
    /// Converts the notice to a JSON string for transmission
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The complete state sent to a display that (re)connects
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Game state
    pub game: game::Snapshot,
    /// Current hall of fame
    pub leaderboard: Vec<leaderboard::LeaderboardEntry>,
}

impl Snapshot {
    /// Converts the snapshot to a JSON string for transmission
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Operator commands
///
/// Commands are never stale: the dispatcher applies them whichever session
/// they were queued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a session whose producers stamp their events with this id
    Start(session::Id),
    /// Freeze the running session
    Pause,
    /// Unfreeze the running session
    Resume,
    /// End the running session early
    Stop,
    /// Discard the session and return to idle
    Reset,
    /// Save the finished session under a display name
    Save {
        /// Name as typed
        name: String,
    },
    /// Send a snapshot to the presenter
    Sync,
    /// Stop the dispatcher
    Shutdown,
}

/// Raw text from the decoder, before the token gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Decoded text
    pub raw: String,
    /// When it was decoded
    pub at: Instant,
}

/// One second of an answer window elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// When the ticker fired
    pub at: Instant,
    /// Round whose countdown the ticker was timing
    pub round: u32,
}

/// Everything the dispatcher consumes
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum Event {
    /// Operator command
    Command(Command),
    /// Decoded token candidate
    Scan(Scan),
    /// Answer from any source
    Answer(router::AnswerEvent),
    /// Countdown tick
    Tick(Tick),
    /// Answer box connection change
    Hardware(hardware::Link),
}

/// An event together with the session it was produced for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Session the producer was started for; `None` for operator commands
    pub session: Option<session::Id>,
    /// The event
    pub event: Event,
}

impl Envelope {
    /// Wraps an operator command
    pub fn command(command: Command) -> Self {
        Self {
            session: None,
            event: command.into(),
        }
    }

    /// Wraps an event produced for a session
    pub fn stamped(session: session::Id, event: impl Into<Event>) -> Self {
        Self {
            session: Some(session),
            event: event.into(),
        }
    }
}
