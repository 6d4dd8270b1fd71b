//! Token gate
//!
//! The gate sits between the optical decoder (or the hardware `SCAN:` line)
//! and the round state machine. A decoder running at frame rate reports the
//! same code many times per second; the gate lets the first report through and
//! rejects identical reports until the cooldown has elapsed.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use web_time::Instant;

use crate::vocabulary::{Token, Vocabulary};

/// Why the gate refused a raw token
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The same token was delivered again at or before the instant it was accepted
    #[error("token was already accepted at this instant")]
    Duplicate,
    /// The same token was accepted less than one cooldown ago
    #[error("token is cooling down")]
    Cooldown,
    /// The token is empty or not part of the active vocabulary
    #[error("token is not recognised")]
    Malformed,
}

/// Outcome of [`TokenGate::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The token may open a round
    Accepted {
        /// The normalized token
        token: Token,
        /// When it was accepted
        at: Instant,
    },
    /// The token was refused and nothing changed
    Rejected(Rejection),
}

impl GateDecision {
    /// Whether the decision lets the token through
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Deduplicates and rate-limits raw decoded tokens
#[derive(Debug, Clone)]
pub struct TokenGate {
    vocabulary: Vocabulary,
    cooldown: Duration,
    last_accepted: Option<(Token, Instant)>,
}

impl TokenGate {
    /// Creates a gate for a vocabulary with the given cooldown
    pub fn new(vocabulary: Vocabulary, cooldown: Duration) -> Self {
        Self {
            vocabulary,
            cooldown,
            last_accepted: None,
        }
    }

    /// Decides whether a raw decoded string may open a round
    ///
    /// Acceptance records the token and instant in the same call, so two
    /// evaluations of one raw stream can never both accept inside a cooldown.
    ///
    /// # Arguments
    ///
    /// * `raw` - Text as delivered by the decoder, before normalization
    /// * `now` - Arrival instant of the text
    pub fn evaluate(&mut self, raw: &str, now: Instant) -> GateDecision {
        let Some(token) = Token::new(raw).filter(|t| self.vocabulary.accepts_token(t)) else {
            return GateDecision::Rejected(Rejection::Malformed);
        };

        if let Some((last_token, last_at)) = &self.last_accepted {
            if *last_token == token {
                if now <= *last_at {
                    return GateDecision::Rejected(Rejection::Duplicate);
                }
                if now.duration_since(*last_at) < self.cooldown {
                    return GateDecision::Rejected(Rejection::Cooldown);
                }
            }
        }

        self.last_accepted = Some((token.clone(), now));

        GateDecision::Accepted { token, at: now }
    }

    /// Forgets the last accepted token
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
