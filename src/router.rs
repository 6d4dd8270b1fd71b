//! Input fusion
//!
//! Answers arrive from three places: on-screen controls, the keyboard and the
//! hardware answer box. The [`Router`] normalizes each of them into an
//! [`AnswerEvent`] and funnels it into the dispatcher queue, stamped with the
//! session it was created for. It never touches game state; it only reads the
//! published [`Status`] to avoid queueing answers nobody is waiting for.

use std::collections::{BTreeMap, HashMap};

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use web_time::Instant;

use crate::{
    Envelope, Scan,
    game::{Phase, Status},
    hardware::{self, HardwareInput},
    session::Id,
    vocabulary::{Token, Vocabulary},
};

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// A button on the display
    Onscreen,
    /// A mapped key
    Keyboard,
    /// The hardware answer box
    Hardware,
}

/// A normalized answer from any source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEvent {
    /// Input source
    pub source: AnswerSource,
    /// The chosen answer value
    pub value: Token,
    /// Arrival instant
    pub at: Instant,
}

/// Key and button bindings
///
/// Both maps go from the label a player presses to an answer value. Labels
/// that are not configured fall back to the numbered defaults, `1` for the
/// first answer of the vocabulary, `2` for the second and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputMapping {
    /// Keyboard key to answer value
    pub keys: BTreeMap<String, String>,
    /// Hardware button label to answer value
    pub buttons: BTreeMap<String, String>,
}

impl InputMapping {
    fn resolve(
        configured: &BTreeMap<String, String>,
        vocabulary: &Vocabulary,
    ) -> HashMap<String, Token> {
        let defaults = vocabulary
            .answers()
            .into_iter()
            .enumerate()
            .map(|(i, answer)| ((i + 1).to_string(), answer));

        let configured = configured.iter().filter_map(|(label, value)| {
            Some((Token::new(label)?.as_str().to_owned(), Token::new(value)?))
        });

        defaults.chain(configured).collect()
    }
}

/// Why an input was not queued
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    /// The key or button has no binding
    #[error("input is not bound to an answer")]
    Unbound,
    /// The value is not an answer in the active vocabulary
    #[error("value is not an answer")]
    NotAnAnswer,
    /// No round of this session is waiting for an answer
    #[error("no round is waiting for an answer")]
    NotAwaiting,
    /// The dispatcher is gone
    #[error("dispatcher queue is closed")]
    Closed,
}

/// Funnels answers from every source into the dispatcher queue
#[derive(Debug, Clone)]
pub struct Router {
    session: Id,
    vocabulary: Vocabulary,
    keys: HashMap<String, Token>,
    buttons: HashMap<String, Token>,
    queue: mpsc::UnboundedSender<Envelope>,
    status: watch::Receiver<Status>,
}

impl Router {
    /// Creates a router for one session
    ///
    /// # Arguments
    ///
    /// * `session` - Session every queued event is stamped with
    /// * `vocabulary` - The active vocabulary
    /// * `mapping` - Key and button bindings
    /// * `queue` - The dispatcher queue
    /// * `status` - Status published by the dispatcher
    pub fn new(
        session: Id,
        vocabulary: Vocabulary,
        mapping: &InputMapping,
        queue: mpsc::UnboundedSender<Envelope>,
        status: watch::Receiver<Status>,
    ) -> Self {
        Self {
            session,
            keys: InputMapping::resolve(&mapping.keys, &vocabulary),
            buttons: InputMapping::resolve(&mapping.buttons, &vocabulary),
            vocabulary,
            queue,
            status,
        }
    }

    /// The session this router stamps events with
    pub fn session(&self) -> Id {
        self.session
    }

    /// Whether the published status is waiting for an answer from this session
    pub fn is_awaiting(&self) -> bool {
        let status = self.status.borrow();
        status.session == Some(self.session)
            && status.phase == Phase::AwaitingAnswer
            && !status.paused
    }

    /// Submits the value of an on-screen answer control
    ///
    /// # Errors
    ///
    /// Returns why the answer was not queued.
    pub fn onscreen(&self, value: &str) -> Result<(), Dropped> {
        let value = Token::new(value).ok_or(Dropped::NotAnAnswer)?;
        self.submit(AnswerSource::Onscreen, value)
    }

    /// Submits a key press
    ///
    /// # Errors
    ///
    /// Returns why the key press was not queued.
    pub fn key(&self, key: &str) -> Result<(), Dropped> {
        let value = Token::new(key)
            .and_then(|key| self.keys.get(key.as_str()).cloned())
            .ok_or(Dropped::Unbound)?;
        self.submit(AnswerSource::Keyboard, value)
    }

    /// Handles one line from the hardware answer box
    ///
    /// Answer lines are routed like any other answer. `SCAN:` lines are
    /// queued as scans and left to the token gate.
    ///
    /// # Errors
    ///
    /// Returns why the line was not queued.
    pub fn hardware_line(&self, line: &str) -> Result<(), Dropped> {
        match hardware::parse_line(line, &self.buttons, &self.vocabulary) {
            Some(HardwareInput::Answer(value)) => self.submit(AnswerSource::Hardware, value),
            Some(HardwareInput::Scan(raw)) => self.send(Scan {
                raw,
                at: Instant::now(),
            }),
            None => Err(Dropped::Unbound),
        }
    }

    fn submit(&self, source: AnswerSource, value: Token) -> Result<(), Dropped> {
        if !self.vocabulary.is_answer(&value) {
            debug!(?source, %value, "dropping unknown answer value");
            return Err(Dropped::NotAnAnswer);
        }
        if !self.is_awaiting() {
            debug!(?source, %value, "dropping answer outside of an answer window");
            return Err(Dropped::NotAwaiting);
        }

        self.send(AnswerEvent {
            source,
            value,
            at: Instant::now(),
        })
    }

    fn send(&self, event: impl Into<crate::Event>) -> Result<(), Dropped> {
        self.queue
            .send(Envelope::stamped(self.session, event))
            .map_err(|_| Dropped::Closed)
    }
}
