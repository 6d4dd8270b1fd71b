//! Single consumer of the event queue
//!
//! The [`Dispatcher`] owns all mutable state of the kiosk: the round state
//! machine, the token gate and the hall of fame. It applies queued
//! [`Envelope`]s one at a time, drops events that belong to a session that is
//! no longer running, and publishes a [`Status`] after every event so that
//! producers can skip work nobody is waiting for.

use std::ops::ControlFlow;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};
use web_time::SystemTime;

use crate::{
    Command, Envelope, Event, Notice, Scan, Snapshot,
    config::Config,
    game::{Game, Status},
    gate::{GateDecision, Rejection, TokenGate},
    hardware::Link,
    leaderboard::Leaderboard,
    presenter::Presenter,
    store::KeyValueStore,
};

/// Applies events to the game in queue order
#[derive(Debug)]
pub struct Dispatcher<S, P> {
    game: Game,
    gate: TokenGate,
    leaderboard: Leaderboard,
    store: S,
    presenter: P,
    status: watch::Sender<Status>,
}

impl<S: KeyValueStore, P: Presenter> Dispatcher<S, P> {
    /// Creates a dispatcher and loads the hall of fame from `store`
    pub fn new(config: Config, store: S, presenter: P) -> Self {
        let gate = TokenGate::new(config.vocabulary.clone(), config.cooldown);
        let leaderboard = Leaderboard::load(&store);
        let game = Game::new(config);
        let (status, _) = watch::channel(game.status());

        info!(entries = leaderboard.list().len(), "hall of fame loaded");

        Self {
            game,
            gate,
            leaderboard,
            store,
            presenter,
            status,
        }
    }

    /// A receiver for the published status
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// The round state machine
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// The hall of fame
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// The full state for a display
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            game: self.game.snapshot(),
            leaderboard: self.leaderboard.list().to_vec(),
        }
    }

    /// Applies one event
    ///
    /// # Returns
    ///
    /// `ControlFlow::Break` once a shutdown command was applied.
    pub fn dispatch(&mut self, envelope: Envelope) -> ControlFlow<()> {
        let Envelope { session, event } = envelope;

        let flow = match event {
            Event::Command(command) => self.command(command),
            _ if !self.game.is_current(session) => {
                trace!(?session, "dropping event of an inactive session");
                ControlFlow::Continue(())
            }
            Event::Scan(scan) => {
                self.scan(scan);
                ControlFlow::Continue(())
            }
            Event::Answer(answer) => {
                self.game.receive_answer(answer, &self.presenter);
                ControlFlow::Continue(())
            }
            Event::Tick(tick) if tick.round != self.game.status().round => {
                trace!(round = tick.round, "dropping tick of a resolved round");
                ControlFlow::Continue(())
            }
            Event::Tick(_) => {
                self.game.receive_tick(&self.presenter);
                ControlFlow::Continue(())
            }
            Event::Hardware(link) => {
                match &link {
                    Link::Connected => info!("answer box connected"),
                    Link::Lost(reason) => warn!(%reason, "answer box lost, continuing without it"),
                }
                self.presenter.announce(&link.into());
                ControlFlow::Continue(())
            }
        };

        self.status.send_if_modified(|status| {
            let next = self.game.status();
            let changed = *status != next;
            *status = next;
            changed
        });

        flow
    }

    fn scan(&mut self, scan: Scan) {
        if !self.game.accepts_tokens() {
            trace!(raw = %scan.raw, phase = ?self.game.phase(), "not accepting tokens");
            return;
        }

        match self.gate.evaluate(&scan.raw, scan.at) {
            GateDecision::Accepted { token, at } => {
                self.game.open_round(token, at, &self.presenter);
            }
            GateDecision::Rejected(reason @ Rejection::Malformed) => {
                debug!(raw = %scan.raw, "unrecognised token");
                self.presenter.announce(&Notice::Unrecognised {
                    raw: scan.raw,
                    reason,
                });
            }
            GateDecision::Rejected(reason) => {
                trace!(raw = %scan.raw, %reason, "token rejected");
            }
        }
    }

    fn command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(?command, "command");
        match command {
            Command::Start(id) => {
                if self.game.start(id, SystemTime::now(), &self.presenter) {
                    self.gate.reset();
                } else {
                    warn!(session = %id, phase = ?self.game.phase(), "cannot start a session now");
                }
            }
            Command::Pause => {
                self.game.pause(&self.presenter);
            }
            Command::Resume => {
                self.game.resume(&self.presenter);
            }
            Command::Stop => {
                self.game.stop(&self.presenter);
            }
            Command::Reset => self.game.reset(&self.presenter),
            Command::Save { name } => self.save(&name),
            Command::Sync => self.presenter.sync(&self.snapshot()),
            Command::Shutdown => {
                info!("dispatcher shutting down");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn save(&mut self, name: &str) {
        match self.game.save(name, SystemTime::now(), &self.presenter) {
            Ok(entry) => {
                let score = entry.score;
                match self.leaderboard.add(entry) {
                    Some(position) => info!(score, position, "result saved"),
                    None => info!(score, "result did not make the hall of fame"),
                }
                if let Err(e) = self.leaderboard.save(&mut self.store) {
                    warn!(error = %e, "could not persist the hall of fame");
                }
                self.presenter
                    .announce(&self.leaderboard.list().to_vec().into());
            }
            Err(e) => {
                debug!(error = %e, "save refused");
                self.presenter.announce(&e.into());
            }
        }
    }

    /// Consumes the queue until it closes or a shutdown command arrives
    ///
    /// # Returns
    ///
    /// The dispatcher, so its final state can be inspected.
    pub async fn run(mut self, mut queue: mpsc::UnboundedReceiver<Envelope>) -> Self {
        while let Some(envelope) = queue.recv().await {
            if self.dispatch(envelope).is_break() {
                break;
            }
        }
        self
    }
}
