//! Session identity and per-session accounting
//!
//! A [`Session`] holds everything that lives for one game: cumulative score,
//! round count, the outcome of every resolved round, and how many answers
//! came in through each input source. It is owned by the round state machine
//! and replaced wholesale when a new game starts.

use std::{fmt::Display, str::FromStr};

use enum_map::EnumMap;
use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{router::AnswerSource, scoring::Points, vocabulary::Token};

/// A unique identifier for a game session
///
/// Producers stamp every event with the session they were started for, which
/// lets the dispatcher drop anything left over from a previous session.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The record of one resolved round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    /// Zero-based round index within the session
    pub index: u32,
    /// Token that opened the round
    pub token: Token,
    /// Answer the round expected
    pub expected: Token,
    /// Answer that resolved the round, `None` when the window expired
    pub answer: Option<Token>,
    /// Input source of the answer
    pub source: Option<AnswerSource>,
    /// Whether the answer matched
    pub correct: bool,
    /// Seconds left on the countdown when the round resolved
    pub remaining: u64,
    /// Point delta awarded for the round
    pub points: Points,
}

/// State of one game from start to game over
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Id,
    total_rounds: u32,
    score: u64,
    rounds_completed: u32,
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    created_at: SystemTime,
    history: Vec<RoundOutcome>,
    answers_by_source: EnumMap<AnswerSource, u32>,
}

impl Session {
    /// Creates an empty session
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier the session's producers stamp their events with
    /// * `total_rounds` - Number of rounds after which the session ends
    /// * `created_at` - Wall-clock creation time
    pub fn new(id: Id, total_rounds: u32, created_at: SystemTime) -> Self {
        Self {
            id,
            total_rounds,
            score: 0,
            rounds_completed: 0,
            created_at,
            history: Vec::new(),
            answers_by_source: EnumMap::default(),
        }
    }

    /// Records a resolved round and applies its points
    ///
    /// The score never drops below zero; a penalty larger than the current
    /// score leaves it at zero.
    pub fn record(&mut self, outcome: RoundOutcome) {
        self.score = self.score.saturating_add_signed(outcome.points);
        self.rounds_completed += 1;
        if let Some(source) = outcome.source {
            self.answers_by_source[source] += 1;
        }
        self.history.push(outcome);
    }

    /// Whether the configured number of rounds has been played
    pub fn is_complete(&self) -> bool {
        self.rounds_completed >= self.total_rounds
    }

    /// The session identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Cumulative score
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Number of resolved rounds
    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    /// Configured round target
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// Creation time
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Every resolved round in order
    pub fn history(&self) -> &[RoundOutcome] {
        &self.history
    }

    /// Number of answers delivered per input source
    pub fn answers_by_source(&self) -> &EnumMap<AnswerSource, u32> {
        &self.answers_by_source
    }
}
