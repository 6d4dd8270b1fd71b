//! Round state machine
//!
//! A [`Game`] walks one session through its rounds:
//!
//! ```text
//! Idle -> AwaitingToken -> AwaitingAnswer -> Resolving -> Cooldown -> AwaitingAnswer ...
//!                                                      \-> GameOver
//! ```
//!
//! A scanned token opens a round and starts the countdown; the first answer
//! (or the countdown expiring) resolves it. Every transition is announced to
//! the [`Presenter`] as a [`Fact`]. The game is only ever driven by the
//! dispatcher, one event at a time, so none of its methods need to consider
//! concurrent callers.

use std::{mem, time::Duration};

use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{debug, info};
use web_time::{Instant, SystemTime};

use crate::{
    config::{Config, WindowPolicy, WrongAnswerPolicy},
    constants::round::MAX_WINDOW,
    leaderboard::LeaderboardEntry,
    names,
    presenter::Presenter,
    router::{AnswerEvent, AnswerSource},
    scoring::{self, Points},
    session::{Id, RoundOutcome, Session},
    timer::{Timer, TimerSignal},
    vocabulary::Token,
};

/// The observable phase of the game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// No session
    #[default]
    Idle,
    /// A session is running and waiting for the first token
    AwaitingToken,
    /// A round is open and its countdown is running
    AwaitingAnswer,
    /// A round is being scored
    Resolving,
    /// Between rounds; the countdown is frozen and the next token opens a round
    Cooldown,
    /// The session is over and can be saved
    GameOver,
}

/// What producers may read about the game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    /// The running session, if any
    pub session: Option<Id>,
    /// Current phase
    pub phase: Phase,
    /// Whether the session is paused
    pub paused: bool,
    /// Index of the open round, or of the next one to open
    pub round: u32,
    /// Whether the answer countdown is running and wants ticks
    pub counting: bool,
}

/// A round that is waiting for its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Zero-based index within the session
    pub index: u32,
    /// The token that opened the round
    pub token: Token,
    /// The answer that resolves it correctly
    pub expected: Token,
    /// Seconds on the countdown when it opened
    pub window: u64,
    /// When the opening token was accepted
    pub opened_at: Instant,
    /// When the window closes unless the countdown is paused
    pub deadline: Instant,
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    AwaitingToken,
    AwaitingAnswer(Round),
    Resolving,
    Cooldown,
    GameOver,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::AwaitingToken => Phase::AwaitingToken,
            Self::AwaitingAnswer(_) => Phase::AwaitingAnswer,
            Self::Resolving => Phase::Resolving,
            Self::Cooldown => Phase::Cooldown,
            Self::GameOver => Phase::GameOver,
        }
    }
}

/// Things that happened in the game, announced as they happen
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Fact {
    /// A new session started
    SessionStarted {
        /// The session identifier
        session: Id,
        /// Rounds the session will last at most
        total_rounds: u32,
        /// Seconds the first round will allow
        window: u64,
    },
    /// The phase changed
    PhaseChanged {
        /// Phase before
        from: Phase,
        /// Phase after
        to: Phase,
    },
    /// A token opened a round
    RoundOpened {
        /// Zero-based round index
        index: u32,
        /// The accepted token
        token: Token,
        /// Seconds the player has to answer
        window: u64,
    },
    /// One second passed on the countdown
    Tick {
        /// Seconds left
        remaining: u64,
    },
    /// A round was scored
    RoundResolved {
        /// Zero-based round index
        index: u32,
        /// Whether the answer matched
        correct: bool,
        /// Whether the countdown ran out before any answer
        timed_out: bool,
        /// The answer the round expected
        expected: Token,
        /// The answer given
        answer: Option<Token>,
        /// Where the answer came from
        source: Option<AnswerSource>,
        /// Points awarded for the round
        points: Points,
        /// Session score after the round
        score: u64,
    },
    /// The session was paused
    Paused,
    /// The session was resumed
    Resumed,
    /// The session ended
    GameOver {
        /// Final score
        score: u64,
        /// Rounds played
        rounds: u32,
    },
    /// The game returned to idle
    Reset,
}

/// Everything a display needs to draw the current screen from scratch
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// The running session, if any
    pub session: Option<Id>,
    /// Current phase
    pub phase: Phase,
    /// Whether the session is paused
    pub paused: bool,
    /// Session score
    pub score: u64,
    /// Rounds played
    pub rounds_completed: u32,
    /// Rounds the session lasts at most
    pub total_rounds: u32,
    /// Seconds shown on the countdown
    pub remaining: u64,
    /// Token of the open round
    pub token: Option<Token>,
    /// Answer values to offer as controls
    pub answers: Vec<Token>,
}

/// Errors returned when saving a result
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Only finished sessions can be saved
    #[error("session is not over")]
    NotOver,
    /// The display name was refused
    #[error(transparent)]
    Name(#[from] names::Error),
}

fn announce(presenter: &impl Presenter, fact: Fact) {
    presenter.announce(&fact.into());
}

/// The round state machine of one kiosk
#[derive(Debug)]
pub struct Game {
    config: Config,
    state: State,
    session: Option<Session>,
    timer: Timer,
    paused: bool,
    next_window: u64,
}

impl Game {
    /// Creates an idle game
    pub fn new(config: Config) -> Self {
        let next_window = config.window_seconds();
        Self {
            config,
            state: State::Idle,
            session: None,
            timer: Timer::default(),
            paused: false,
            next_window,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The running or finished session
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The round waiting for its answer
    pub fn round(&self) -> Option<&Round> {
        match &self.state {
            State::AwaitingAnswer(round) => Some(round),
            _ => None,
        }
    }

    /// Status published to producers
    pub fn status(&self) -> Status {
        Status {
            session: self.session.as_ref().map(Session::id),
            phase: self.phase(),
            paused: self.paused,
            round: self.session.as_ref().map_or(0, Session::rounds_completed),
            counting: matches!(self.state, State::AwaitingAnswer(_)) && self.timer.is_counting(),
        }
    }

    /// Whether events stamped with `session` belong to the running session
    pub fn is_current(&self, session: Option<Id>) -> bool {
        session.is_some() && session == self.session.as_ref().map(Session::id)
    }

    /// Whether a scanned token would be considered right now
    ///
    /// The token gate is only consulted when this holds, so scans that arrive
    /// mid-round do not start a cooldown.
    pub fn accepts_tokens(&self) -> bool {
        matches!(self.state, State::AwaitingToken | State::Cooldown) && !self.paused
    }

    fn set_state(&mut self, next: State, presenter: &impl Presenter) {
        let from = self.state.phase();
        let to = next.phase();
        self.state = next;
        if from != to {
            announce(presenter, Fact::PhaseChanged { from, to });
        }
    }

    /// Starts a session
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier producers of this session stamp their events with
    /// * `now` - Wall-clock start time
    /// * `presenter` - Receives the announcements
    ///
    /// # Returns
    ///
    /// `false` if the game is not idle.
    pub fn start(&mut self, id: Id, now: SystemTime, presenter: &impl Presenter) -> bool {
        if !matches!(self.state, State::Idle) {
            debug!(session = %id, phase = ?self.phase(), "ignoring start outside of idle");
            return false;
        }

        let window = self.config.window_seconds();
        let total_rounds = self.config.total_rounds;

        self.session = Some(Session::new(id, total_rounds, now));
        self.timer.hold(window);
        self.paused = false;
        self.next_window = window;

        info!(session = %id, total_rounds, window, "session started");
        announce(
            presenter,
            Fact::SessionStarted {
                session: id,
                total_rounds,
                window,
            },
        );
        self.set_state(State::AwaitingToken, presenter);

        true
    }

    /// Opens a round for a token the gate accepted
    ///
    /// # Arguments
    ///
    /// * `token` - The accepted token
    /// * `at` - When the gate accepted it
    /// * `presenter` - Receives the announcements
    ///
    /// # Returns
    ///
    /// `false` if no round can open right now or the token has no answer.
    pub fn open_round(&mut self, token: Token, at: Instant, presenter: &impl Presenter) -> bool {
        if !self.accepts_tokens() {
            debug!(%token, phase = ?self.phase(), "ignoring token");
            return false;
        }
        let Some(expected) = self.config.vocabulary.expected_answer(&token) else {
            debug!(%token, "token has no expected answer");
            return false;
        };
        let Some(index) = self.session.as_ref().map(Session::rounds_completed) else {
            return false;
        };

        let window = self.next_window;
        self.timer.start(window);

        info!(round = index, %token, window, "round opened");
        self.set_state(
            State::AwaitingAnswer(Round {
                index,
                token: token.clone(),
                expected,
                window,
                opened_at: at,
                deadline: at + Duration::from_secs(window),
            }),
            presenter,
        );
        announce(
            presenter,
            Fact::RoundOpened {
                index,
                token,
                window,
            },
        );

        true
    }

    /// Resolves the open round with an answer
    ///
    /// Only the first answer of a round counts. Answers that arrive while
    /// paused, outside of a round, or that were given before the round opened
    /// are ignored.
    ///
    /// # Returns
    ///
    /// Whether the answer resolved the round.
    pub fn receive_answer(&mut self, answer: AnswerEvent, presenter: &impl Presenter) -> bool {
        let State::AwaitingAnswer(round) = &self.state else {
            debug!(source = ?answer.source, value = %answer.value, "answer outside of a round");
            return false;
        };
        if self.paused {
            debug!(source = ?answer.source, "answer while paused");
            return false;
        }
        if answer.at < round.opened_at {
            debug!(source = ?answer.source, "answer was given before the round opened");
            return false;
        }

        self.resolve(Some(answer), presenter);

        true
    }

    /// Applies one second of the countdown
    ///
    /// An expired countdown resolves the open round as unanswered.
    pub fn receive_tick(&mut self, presenter: &impl Presenter) {
        match self.timer.tick() {
            Some(TimerSignal::Tick { remaining }) => {
                announce(presenter, Fact::Tick { remaining });
            }
            Some(TimerSignal::Expired) => {
                announce(presenter, Fact::Tick { remaining: 0 });
                if matches!(self.state, State::AwaitingAnswer(_)) {
                    info!("answer window expired");
                    self.resolve(None, presenter);
                }
            }
            None => {}
        }
    }

    fn resolve(&mut self, answer: Option<AnswerEvent>, presenter: &impl Presenter) {
        let previous = mem::replace(&mut self.state, State::Resolving);
        let State::AwaitingAnswer(round) = previous else {
            self.state = previous;
            return;
        };
        announce(
            presenter,
            Fact::PhaseChanged {
                from: Phase::AwaitingAnswer,
                to: Phase::Resolving,
            },
        );

        let remaining = self.timer.remaining();
        self.timer.cancel();

        let timed_out = answer.is_none();
        let (value, source) = answer.map_or((None, None), |a| (Some(a.value), Some(a.source)));
        let correct = value.as_ref() == Some(&round.expected);
        let points = scoring::score(remaining, round.window, correct, &self.config.scoring);

        let Some(session) = self.session.as_mut() else {
            self.finish(presenter);
            return;
        };
        session.record(RoundOutcome {
            index: round.index,
            token: round.token,
            expected: round.expected.clone(),
            answer: value.clone(),
            source,
            correct,
            remaining,
            points,
        });
        let score = session.score();
        let complete = session.is_complete();

        info!(round = round.index, correct, timed_out, points, score, "round resolved");
        announce(
            presenter,
            Fact::RoundResolved {
                index: round.index,
                correct,
                timed_out,
                expected: round.expected,
                answer: value,
                source,
                points,
                score,
            },
        );

        let continues = !complete
            && (correct || self.config.on_wrong_answer == WrongAnswerPolicy::PenalizeAndContinue);

        if !continues {
            self.finish(presenter);
            return;
        }

        self.next_window = match self.config.window_policy {
            WindowPolicy::CarryOver { bonus } if correct => {
                remaining.saturating_add(bonus).min(MAX_WINDOW)
            }
            _ => self.config.window_seconds(),
        };
        self.timer.hold(self.config.inter_round_seconds());
        self.set_state(State::Cooldown, presenter);
    }

    fn finish(&mut self, presenter: &impl Presenter) {
        self.timer.cancel();
        self.paused = false;
        self.set_state(State::GameOver, presenter);

        if let Some(session) = &self.session {
            let correct = session.history().iter().filter(|outcome| outcome.correct).count();
            let played = SystemTime::now()
                .duration_since(session.created_at())
                .unwrap_or_default();
            info!(
                session = %session.id(),
                score = session.score(),
                rounds = session.rounds_completed(),
                target = session.total_rounds(),
                correct,
                answers = ?session.answers_by_source(),
                played_secs = played.as_secs(),
                "game over"
            );
            announce(
                presenter,
                Fact::GameOver {
                    score: session.score(),
                    rounds: session.rounds_completed(),
                },
            );
        }
    }

    /// Freezes the session
    ///
    /// # Returns
    ///
    /// `false` if there is nothing to pause.
    pub fn pause(&mut self, presenter: &impl Presenter) -> bool {
        if self.paused || !matches!(self.state, State::AwaitingAnswer(_) | State::Cooldown) {
            return false;
        }
        self.paused = true;
        self.timer.pause();
        announce(presenter, Fact::Paused);
        true
    }

    /// Unfreezes the session
    ///
    /// # Returns
    ///
    /// `false` if the session was not paused.
    pub fn resume(&mut self, presenter: &impl Presenter) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        // the inter-round countdown stays frozen until the next round opens
        if matches!(self.state, State::AwaitingAnswer(_)) {
            self.timer.resume();
        }
        announce(presenter, Fact::Resumed);
        true
    }

    /// Ends a running session early
    ///
    /// # Returns
    ///
    /// `false` if no session was running.
    pub fn stop(&mut self, presenter: &impl Presenter) -> bool {
        if matches!(self.state, State::Idle | State::GameOver) {
            return false;
        }
        info!("session stopped");
        self.finish(presenter);
        true
    }

    /// Discards the session and returns to idle
    pub fn reset(&mut self, presenter: &impl Presenter) {
        self.timer.cancel();
        self.session = None;
        self.paused = false;
        self.next_window = self.config.window_seconds();
        self.set_state(State::Idle, presenter);
        announce(presenter, Fact::Reset);
    }

    /// Turns a finished session into a leaderboard entry and returns to idle
    ///
    /// # Arguments
    ///
    /// * `name` - Name typed at the save prompt
    /// * `now` - Timestamp of the entry
    /// * `presenter` - Receives the announcements
    ///
    /// # Errors
    ///
    /// * `Error::NotOver` - No finished session to save
    /// * `Error::Name` - The name was refused; the session stays saveable
    pub fn save(
        &mut self,
        name: &str,
        now: SystemTime,
        presenter: &impl Presenter,
    ) -> Result<LeaderboardEntry, Error> {
        let (State::GameOver, Some(session)) = (&self.state, &self.session) else {
            return Err(Error::NotOver);
        };

        let entry = LeaderboardEntry {
            name: names::display_name(name, self.config.anonymous_names)?,
            score: session.score(),
            timestamp: now,
        };

        self.reset(presenter);

        Ok(entry)
    }

    /// Builds a snapshot for a display that just connected
    pub fn snapshot(&self) -> Snapshot {
        let session = self.session.as_ref();
        Snapshot {
            session: session.map(Session::id),
            phase: self.phase(),
            paused: self.paused,
            score: session.map_or(0, Session::score),
            rounds_completed: session.map_or(0, Session::rounds_completed),
            total_rounds: self.config.total_rounds,
            remaining: self.timer.remaining(),
            token: self.round().map(|round| round.token.clone()),
            answers: self.config.vocabulary.answers(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{Notice, presenter::Recorder, scoring::ScoringPolicy, vocabulary::Vocabulary};

    fn token(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    fn answer(value: &str) -> AnswerEvent {
        AnswerEvent {
            source: AnswerSource::Onscreen,
            value: token(value),
            at: Instant::now(),
        }
    }

    fn started(config: Config) -> (Game, Recorder) {
        let recorder = Recorder::default();
        let mut game = Game::new(config);
        assert!(game.start(Id::new(), SystemTime::now(), &recorder));
        (game, recorder)
    }

    fn facts(recorder: &Recorder) -> Vec<Fact> {
        recorder
            .notices()
            .into_iter()
            .filter_map(|notice| match notice {
                Notice::Game(fact) => Some(fact),
                _ => None,
            })
            .collect()
    }

    fn resolved(recorder: &Recorder) -> Vec<(bool, Points)> {
        facts(recorder)
            .into_iter()
            .filter_map(|fact| match fact {
                Fact::RoundResolved {
                    correct, points, ..
                } => Some((correct, points)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_five_correct_answers_end_the_session() {
        let (mut game, recorder) = started(Config {
            total_rounds: 5,
            ..Config::default()
        });

        for round in 0..5 {
            assert!(game.open_round(token("granite"), Instant::now(), &recorder));
            assert_eq!(game.snapshot().token, Some(token("granite")));
            assert!(game.receive_answer(answer("igneous"), &recorder));
            if round < 4 {
                assert_eq!(game.phase(), Phase::Cooldown);
            }
        }

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.session().unwrap().score(), 50);
        assert_eq!(game.session().unwrap().rounds_completed(), 5);
        assert!(!game.open_round(token("basalt"), Instant::now(), &recorder));
        assert_eq!(
            facts(&recorder).last(),
            Some(&Fact::GameOver {
                score: 50,
                rounds: 5
            })
        );
    }

    #[test]
    fn test_phase_sequence() {
        let (mut game, recorder) = started(Config::default());
        game.open_round(token("shale"), Instant::now(), &recorder);
        game.receive_answer(answer("sedimentary"), &recorder);

        let phases: Vec<_> = facts(&recorder)
            .into_iter()
            .filter_map(|fact| match fact {
                Fact::PhaseChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();

        assert_eq!(
            phases,
            vec![
                (Phase::Idle, Phase::AwaitingToken),
                (Phase::AwaitingToken, Phase::AwaitingAnswer),
                (Phase::AwaitingAnswer, Phase::Resolving),
                (Phase::Resolving, Phase::Cooldown),
            ]
        );
    }

    #[test]
    fn test_wrong_answer_ends_by_default() {
        let (mut game, recorder) = started(Config::default());
        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_answer(answer("metamorphic"), &recorder);

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(resolved(&recorder), vec![(false, 0)]);
    }

    #[test]
    fn test_penalize_and_continue() {
        let (mut game, recorder) = started(Config {
            on_wrong_answer: WrongAnswerPolicy::PenalizeAndContinue,
            scoring: ScoringPolicy {
                wrong_penalty: 3,
                ..ScoringPolicy::default()
            },
            ..Config::default()
        });

        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_answer(answer("igneous"), &recorder);
        game.open_round(token("gneiss"), Instant::now(), &recorder);
        game.receive_answer(answer("igneous"), &recorder);

        assert_eq!(game.phase(), Phase::Cooldown);
        assert_eq!(resolved(&recorder), vec![(true, 10), (false, -3)]);
        assert_eq!(game.session().unwrap().score(), 7);
    }

    #[test]
    fn test_timeout_resolves_as_wrong() {
        let (mut game, recorder) = started(Config {
            round_window: Duration::from_secs(3),
            ..Config::default()
        });
        game.open_round(token("basalt"), Instant::now(), &recorder);

        game.receive_tick(&recorder);
        game.receive_tick(&recorder);
        assert_eq!(game.phase(), Phase::AwaitingAnswer);
        game.receive_tick(&recorder);

        assert_eq!(game.phase(), Phase::GameOver);
        assert!(facts(&recorder).contains(&Fact::RoundResolved {
            index: 0,
            correct: false,
            timed_out: true,
            expected: token("igneous"),
            answer: None,
            source: None,
            points: 0,
            score: 0,
        }));
    }

    #[test]
    fn test_time_weighted_points() {
        let (mut game, recorder) = started(Config {
            round_window: Duration::from_secs(30),
            ..Config::default()
        });
        game.open_round(token("schist"), Instant::now(), &recorder);
        for _ in 0..26 {
            game.receive_tick(&recorder);
        }
        assert_eq!(game.snapshot().remaining, 4);
        game.receive_answer(answer("metamorphic"), &recorder);

        assert_eq!(resolved(&recorder), vec![(true, 2)]);
    }

    #[test]
    fn test_only_first_answer_counts() {
        let (mut game, recorder) = started(Config::default());
        game.open_round(token("granite"), Instant::now(), &recorder);

        assert!(game.receive_answer(answer("igneous"), &recorder));
        assert!(!game.receive_answer(answer("metamorphic"), &recorder));
        assert_eq!(resolved(&recorder).len(), 1);
        assert_eq!(game.phase(), Phase::Cooldown);
    }

    #[test]
    fn test_answer_from_before_the_round_is_ignored() {
        let (mut game, recorder) = started(Config::default());
        let early = answer("igneous");
        game.open_round(token("granite"), Instant::now() + Duration::from_millis(5), &recorder);

        assert!(!game.receive_answer(early, &recorder));
        assert_eq!(game.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn test_cooldown_holds_the_countdown() {
        let (mut game, recorder) = started(Config {
            inter_round_display: Duration::from_secs(7),
            ..Config::default()
        });
        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_answer(answer("igneous"), &recorder);

        assert_eq!(game.snapshot().remaining, 7);
        game.receive_tick(&recorder);
        assert_eq!(game.snapshot().remaining, 7);
        assert!(game.accepts_tokens());
    }

    #[test]
    fn test_pause_drops_input_and_freezes() {
        let (mut game, recorder) = started(Config::default());
        assert!(!game.pause(&recorder));

        game.open_round(token("granite"), Instant::now(), &recorder);
        assert!(game.pause(&recorder));
        assert!(game.status().paused);

        game.receive_tick(&recorder);
        assert_eq!(game.snapshot().remaining, 10);
        assert!(!game.receive_answer(answer("igneous"), &recorder));

        assert!(game.resume(&recorder));
        game.receive_tick(&recorder);
        assert_eq!(game.snapshot().remaining, 9);
        assert!(game.receive_answer(answer("igneous"), &recorder));
        assert_eq!(resolved(&recorder), vec![(true, 9)]);
    }

    #[test]
    fn test_pause_in_cooldown_blocks_tokens() {
        let (mut game, recorder) = started(Config::default());
        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_answer(answer("igneous"), &recorder);

        assert!(game.pause(&recorder));
        assert!(!game.accepts_tokens());
        assert!(!game.open_round(token("basalt"), Instant::now(), &recorder));

        assert!(game.resume(&recorder));
        assert_eq!(game.snapshot().remaining, 10);
        assert!(game.open_round(token("basalt"), Instant::now(), &recorder));
    }

    #[test]
    fn test_carry_over_window() {
        let (mut game, recorder) = started(Config {
            round_window: Duration::from_secs(10),
            window_policy: WindowPolicy::CarryOver { bonus: 3 },
            on_wrong_answer: WrongAnswerPolicy::PenalizeAndContinue,
            ..Config::default()
        });

        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_tick(&recorder);
        game.receive_tick(&recorder);
        game.receive_answer(answer("igneous"), &recorder);

        game.open_round(token("shale"), Instant::now(), &recorder);
        assert_eq!(game.snapshot().remaining, 11);
        game.receive_answer(answer("igneous"), &recorder);

        // a wrong answer does not carry time over
        game.open_round(token("gneiss"), Instant::now(), &recorder);
        assert_eq!(game.snapshot().remaining, 10);
    }

    #[test]
    fn test_stop_and_save() {
        let (mut game, recorder) = started(Config::default());
        game.open_round(token("granite"), Instant::now(), &recorder);
        game.receive_answer(answer("igneous"), &recorder);

        assert_eq!(
            game.save("Aisyah", SystemTime::now(), &recorder),
            Err(Error::NotOver)
        );
        assert!(game.stop(&recorder));
        assert!(!game.stop(&recorder));

        assert_eq!(
            game.save("  ", SystemTime::now(), &recorder),
            Err(Error::Name(names::Error::Empty))
        );
        assert_eq!(game.phase(), Phase::GameOver);

        let now = SystemTime::now();
        let entry = game.save(" Aisyah ", now, &recorder).unwrap();
        assert_eq!(entry.name, "Aisyah");
        assert_eq!(entry.score, 10);
        assert_eq!(entry.timestamp, now);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.status().session, None);
    }

    #[test]
    fn test_anonymous_save() {
        let (mut game, recorder) = started(Config {
            anonymous_names: Some(crate::names::NameStyle::Roman(2)),
            ..Config::default()
        });
        game.stop(&recorder);

        let entry = game.save("", SystemTime::now(), &recorder).unwrap();
        assert!(!entry.name.is_empty());
        assert_eq!(entry.score, 0);
    }

    #[test]
    fn test_start_only_from_idle() {
        let (mut game, recorder) = started(Config::default());
        assert!(!game.start(Id::new(), SystemTime::now(), &recorder));

        game.stop(&recorder);
        assert!(!game.start(Id::new(), SystemTime::now(), &recorder));

        game.reset(&recorder);
        let id = Id::new();
        assert!(game.start(id, SystemTime::now(), &recorder));
        assert!(game.is_current(Some(id)));
        assert!(!game.is_current(None));
        assert_eq!(game.session().unwrap().score(), 0);
    }

    #[test]
    fn test_true_false_mode() {
        let (mut game, recorder) = started(Config {
            vocabulary: Vocabulary::true_false(),
            ..Config::default()
        });
        game.open_round(token("salah"), Instant::now(), &recorder);
        assert_eq!(
            game.snapshot().answers,
            vec![token("betul"), token("salah")]
        );
        game.receive_answer(answer("salah"), &recorder);

        assert_eq!(resolved(&recorder), vec![(true, 10)]);
    }

    #[test]
    fn test_round_deadline_and_countdown_status() {
        let (mut game, recorder) = started(Config::default());
        let at = Instant::now();
        game.open_round(token("granite"), at, &recorder);

        assert_eq!(game.round().unwrap().deadline, at + Duration::from_secs(10));
        assert!(game.status().counting);
        assert_eq!(game.status().round, 0);

        game.pause(&recorder);
        assert!(!game.status().counting);
        game.resume(&recorder);
        game.receive_answer(answer("igneous"), &recorder);

        assert!(game.round().is_none());
        assert!(!game.status().counting);
        assert_eq!(game.status().round, 1);
    }

    #[derive(Debug, Clone, Copy)]
    enum Play {
        Correct(u64),
        Wrong(u64),
        Expire,
    }

    fn play() -> impl Strategy<Value = Play> {
        prop_oneof![
            (0u64..10).prop_map(Play::Correct),
            (0u64..10).prop_map(Play::Wrong),
            Just(Play::Expire),
        ]
    }

    proptest! {
        #[test]
        fn score_is_the_sum_of_round_points(
            plays in prop::collection::vec(play(), 1..12),
            penalty in 0u64..6,
        ) {
            let (mut game, recorder) = started(Config {
                total_rounds: plays.len() as u32,
                on_wrong_answer: WrongAnswerPolicy::PenalizeAndContinue,
                scoring: ScoringPolicy {
                    wrong_penalty: penalty,
                    ..ScoringPolicy::default()
                },
                ..Config::default()
            });

            for play in &plays {
                prop_assert!(game.open_round(token("granite"), Instant::now(), &recorder));
                match *play {
                    Play::Correct(ticks) | Play::Wrong(ticks) => {
                        for _ in 0..ticks {
                            game.receive_tick(&recorder);
                        }
                        let value = match play {
                            Play::Correct(_) => "igneous",
                            _ => "metamorphic",
                        };
                        prop_assert!(game.receive_answer(answer(value), &recorder));
                    }
                    Play::Expire => {
                        for _ in 0..10 {
                            game.receive_tick(&recorder);
                        }
                    }
                }
            }

            prop_assert_eq!(game.phase(), Phase::GameOver);

            let policy = ScoringPolicy::default();
            let outcomes = resolved(&recorder);
            prop_assert_eq!(outcomes.len(), plays.len());

            let mut expected = 0u64;
            for (play, (correct, points)) in plays.iter().zip(outcomes) {
                prop_assert_eq!(correct, matches!(play, Play::Correct(_)));
                if correct {
                    prop_assert!(points >= policy.min_points as Points);
                    prop_assert!(points <= policy.max_points as Points);
                } else {
                    prop_assert_eq!(points, -(penalty as Points));
                }
                expected = expected.saturating_add_signed(points);
            }
            prop_assert_eq!(game.session().unwrap().score(), expected);
        }
    }

    #[test]
    fn test_snapshot_serializes() {
        let game = Game::new(Config::default());
        let json = serde_json::to_string(&game.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Idle\""));
        assert!(!json.contains("\"token\""));
    }
}
