//! Kiosk configuration
//!
//! A [`Config`] describes one deployment: which vocabulary is played, how long
//! rounds last, how answers are scored and what happens after a wrong answer.
//! It is read from JSON, every field falls back to its default, and the
//! result is validated before the kiosk starts.

use std::{path::Path, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{gate, input, round},
    names::NameStyle,
    router::InputMapping,
    scoring::ScoringPolicy,
    vocabulary::Vocabulary,
};

type ValidationResult = garde::Result;

/// Validates that a duration falls within specified bounds
///
/// # Generics
///
/// * `MIN_MILLIS` - The minimum allowed duration in milliseconds (inclusive)
/// * `MAX_MILLIS` - The maximum allowed duration in milliseconds (inclusive)
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the specified bounds.
fn validate_duration<const MIN_MILLIS: u64, const MAX_MILLIS: u64>(
    val: &Duration,
) -> ValidationResult {
    if (u128::from(MIN_MILLIS)..=u128::from(MAX_MILLIS)).contains(&val.as_millis()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_MILLIS}ms,{MAX_MILLIS}ms]",
        )))
    }
}

fn validate_window(val: &Duration) -> ValidationResult {
    if val.subsec_nanos() != 0 {
        return Err(garde::Error::new("must be a whole number of seconds"));
    }
    validate_duration::<{ round::MIN_WINDOW * 1000 }, { round::MAX_WINDOW * 1000 }>(val)
}

fn validate_inter_round_display(val: &Duration) -> ValidationResult {
    if val.subsec_nanos() != 0 {
        return Err(garde::Error::new("must be a whole number of seconds"));
    }
    validate_duration::<0, { round::MAX_WINDOW * 1000 }>(val)
}

fn validate_cooldown(val: &Duration) -> ValidationResult {
    validate_duration::<0, { gate::MAX_COOLDOWN_MS }>(val)
}

fn validate_capture_interval(val: &Duration) -> ValidationResult {
    validate_duration::<{ input::MIN_CAPTURE_INTERVAL_MS }, 1000>(val)
}

/// What a wrong or unanswered round does to the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrongAnswerPolicy {
    /// The session ends immediately
    #[default]
    End,
    /// The penalty is applied and play continues
    PenalizeAndContinue,
}

/// How long each round's answer window is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
pub enum WindowPolicy {
    /// Every round starts from the configured window
    #[default]
    Fixed,
    /// The next round starts from the time left plus a bonus, capped at the
    /// maximum window
    CarryOver {
        /// Seconds added after a correct answer
        #[garde(range(max = round::MAX_WINDOW))]
        bonus: u64,
    },
}

/// Configuration of the kiosk
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Tokens that may be scanned and the answers they expect
    #[garde(dive)]
    pub vocabulary: Vocabulary,
    /// Answer window of a round
    #[garde(custom(|v, _| validate_window(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub round_window: Duration,
    /// How the window changes from round to round
    #[garde(dive)]
    pub window_policy: WindowPolicy,
    /// Value shown on the frozen countdown between rounds
    #[garde(custom(|v, _| validate_inter_round_display(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub inter_round_display: Duration,
    /// Rounds after which the session ends
    #[garde(range(min = round::MIN_TOTAL_ROUNDS, max = round::MAX_TOTAL_ROUNDS))]
    pub total_rounds: u32,
    /// Time before the same token is accepted again
    #[garde(custom(|v, _| validate_cooldown(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub cooldown: Duration,
    /// Point values
    #[garde(dive)]
    pub scoring: ScoringPolicy,
    /// What a wrong or unanswered round does
    #[garde(skip)]
    pub on_wrong_answer: WrongAnswerPolicy,
    /// Style of the generated name used when a player saves without one;
    /// blank names are rejected when unset
    #[garde(dive)]
    pub anonymous_names: Option<NameStyle>,
    /// Key and button bindings
    #[garde(skip)]
    pub input: InputMapping,
    /// Interval between two capture ticks of the scanner
    #[garde(custom(|v, _| validate_capture_interval(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub capture_interval: Duration,
    /// Baud rate the answer box is configured for
    #[garde(range(min = 300))]
    pub baud_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            round_window: Duration::from_secs(round::DEFAULT_WINDOW),
            window_policy: WindowPolicy::Fixed,
            inter_round_display: Duration::from_secs(round::DEFAULT_INTER_ROUND_DISPLAY),
            total_rounds: round::DEFAULT_TOTAL_ROUNDS,
            cooldown: Duration::from_millis(gate::DEFAULT_COOLDOWN_MS),
            scoring: ScoringPolicy::default(),
            on_wrong_answer: WrongAnswerPolicy::End,
            anonymous_names: None,
            input: InputMapping::default(),
            capture_interval: Duration::from_millis(input::DEFAULT_CAPTURE_INTERVAL_MS),
            baud_rate: input::DEFAULT_BAUD_RATE,
        }
    }
}

/// Errors that can occur while loading a configuration
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be read
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid configuration JSON
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of bounds
    #[error("invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
    /// `min_points` is larger than `max_points`
    #[error("scoring.min_points ({min}) exceeds scoring.max_points ({max})")]
    PointBounds {
        /// Configured minimum
        min: u64,
        /// Configured maximum
        max: u64,
    },
}

impl Config {
    /// Parses and validates a configuration from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or a value is out of
    /// bounds.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Reads a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// a value that is out of bounds.
    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Runs field validation plus the checks that span several fields
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        if self.scoring.min_points > self.scoring.max_points {
            return Err(Error::PointBounds {
                min: self.scoring.min_points,
                max: self.scoring.max_points,
            });
        }
        Ok(())
    }

    /// The answer window in whole seconds
    pub fn window_seconds(&self) -> u64 {
        self.round_window.as_secs()
    }

    /// The inter-round display value in whole seconds
    pub fn inter_round_seconds(&self) -> u64 {
        self.inter_round_display.as_secs()
    }
}
