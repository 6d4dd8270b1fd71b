//! Hardware line protocol
//!
//! The answer box talks newline-terminated ASCII. Inbound lines are either an
//! answer (`BTN:<value>`, a configured button label, or a bare answer token) or
//! a physical token (`SCAN:<token>`). Outbound lines drive the box's LED and
//! buzzer.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    Notice,
    game::Fact,
    presenter::Presenter,
    vocabulary::{Token, Vocabulary},
};

const BUTTON_PREFIX: &str = "btn:";
const SCAN_PREFIX: &str = "scan:";

/// A parsed inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareInput {
    /// A player pressed an answer button
    Answer(Token),
    /// A physical token was presented; the raw text goes through the token gate
    Scan(String),
}

/// Parses one inbound line
///
/// # Arguments
///
/// * `line` - The line without its terminator
/// * `buttons` - Button labels mapped to answer values
/// * `vocabulary` - The active vocabulary, used to recognise bare answers
///
/// # Returns
///
/// `None` for blank lines, unknown buttons and anything else that is not part
/// of the protocol.
pub fn parse_line(
    line: &str,
    buttons: &HashMap<String, Token>,
    vocabulary: &Vocabulary,
) -> Option<HardwareInput> {
    let token = Token::new(line)?;
    let text = token.as_str();

    if let Some(raw) = text.strip_prefix(SCAN_PREFIX) {
        return Token::new(raw).map(|t| HardwareInput::Scan(t.as_str().to_owned()));
    }

    let value = match text.strip_prefix(BUTTON_PREFIX) {
        Some(value) => Token::new(value)?,
        None => token,
    };

    buttons
        .get(value.as_str())
        .cloned()
        .or_else(|| vocabulary.is_answer(&value).then_some(value))
        .map(HardwareInput::Answer)
}

/// Outbound commands for the answer box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum Feedback {
    /// A round opened
    #[display("LED_ON")]
    LedOn,
    /// The round was answered correctly
    #[display("BUZZ_CORRECT")]
    BuzzCorrect,
    /// The round was answered wrongly or timed out
    #[display("BUZZ_WRONG")]
    BuzzWrong,
    /// The session ended
    #[display("END")]
    End,
}

impl Feedback {
    /// Picks the feedback line for a notice, if the box reacts to it
    pub fn for_notice(notice: &Notice) -> Option<Self> {
        match notice {
            Notice::Game(Fact::RoundOpened { .. }) => Some(Self::LedOn),
            Notice::Game(Fact::RoundResolved { correct: true, .. }) => Some(Self::BuzzCorrect),
            Notice::Game(Fact::RoundResolved { correct: false, .. }) => Some(Self::BuzzWrong),
            Notice::Game(Fact::GameOver { .. }) => Some(Self::End),
            _ => None,
        }
    }

    /// The line written to the device, including its terminator
    pub fn to_line(self) -> String {
        format!("{self}\n")
    }
}

/// Connection state of the answer box
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Link {
    /// The line reader started
    Connected,
    /// The line reader stopped; the session carries on without hardware
    Lost(String),
}

/// Forwards feedback lines to a writer task
///
/// Sending never blocks the dispatcher; lines are dropped once the writer is
/// gone.
#[derive(Debug, Clone)]
pub struct FeedbackPresenter {
    lines: mpsc::UnboundedSender<Feedback>,
}

impl FeedbackPresenter {
    /// Creates a presenter and the receiving end for the writer task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Feedback>) {
        let (lines, receiver) = mpsc::unbounded_channel();
        (Self { lines }, receiver)
    }
}

impl Presenter for FeedbackPresenter {
    fn announce(&self, notice: &Notice) {
        if let Some(feedback) = Feedback::for_notice(notice) {
            // a closed channel means the device is gone, which is not fatal
            let _ = self.lines.send(feedback);
        }
    }
}
