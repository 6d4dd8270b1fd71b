//! Async producers and session lifecycle
//!
//! A running session has up to three producers feeding the dispatcher queue:
//!
//! * a 1 Hz ticker driving the countdown, aligned to when the round opened,
//! * a scanner that captures and decodes a frame at a bounded rate,
//! * a line reader for the hardware answer box.
//!
//! Producers never touch game state. They stamp what they queue with their
//! session id and are aborted when the session stops, so a late line or frame
//! can never leak into the next session. The capture device and the answer box
//! can each be held by one session at a time.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};
use web_time::Instant;

use crate::{
    Command, Envelope, Scan, Tick,
    config::Config,
    constants::input::MAX_LINE_LENGTH,
    dispatcher::Dispatcher,
    game::{Phase, Status},
    hardware::{Feedback, Link},
    presenter::Presenter,
    router::{Dropped, Router},
    session::Id,
    store::KeyValueStore,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Errors raised while managing sessions
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The capture device is held by another session
    #[error("capture device is already in use")]
    CaptureBusy,
    /// The answer box is held by another session
    #[error("answer box is already in use")]
    HardwareBusy,
    /// A session is already running
    #[error("a session is already running")]
    SessionActive,
    /// The dispatcher is gone
    #[error("dispatcher is not running")]
    Closed,
}

/// A decoder failure; the frame is treated as holding no token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decode failed: {0}")]
pub struct DecodeError(pub String);

/// A source of frames, such as a camera
pub trait Capture: Send {
    /// The frame type
    type Frame;

    /// Grabs the current frame, `None` if there is none yet
    fn capture(&mut self) -> Option<Self::Frame>;
}

/// Turns a frame into the text of the optical code it shows
pub trait Decoder: Send {
    /// The frame type
    type Frame;

    /// Decodes one frame
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder failed. Frames without a code are
    /// `Ok(None)`.
    fn decode(&mut self, frame: &Self::Frame) -> Result<Option<String>, DecodeError>;
}

/// Produces decoded text once per capture tick
pub trait Scanner: Send {
    /// Captures and decodes one frame
    ///
    /// # Errors
    ///
    /// Returns an error if decoding failed.
    fn poll(&mut self) -> Result<Option<String>, DecodeError>;
}

/// Pairs a [`Capture`] with a [`Decoder`] for the same frame type
#[derive(Debug)]
pub struct Decoding<C, D> {
    capture: C,
    decoder: D,
}

impl<C, D> Decoding<C, D> {
    /// Creates a scanner from a capture device and a decoder
    pub fn new(capture: C, decoder: D) -> Self {
        Self { capture, decoder }
    }
}

impl<C, D> Scanner for Decoding<C, D>
where
    C: Capture,
    D: Decoder<Frame = C::Frame>,
{
    fn poll(&mut self) -> Result<Option<String>, DecodeError> {
        match self.capture.capture() {
            Some(frame) => self.decoder.decode(&frame),
            None => Ok(None),
        }
    }
}

/// A capture device fed from a channel, one text frame per message
#[derive(Debug)]
pub struct ChannelCapture {
    frames: mpsc::UnboundedReceiver<String>,
}

impl ChannelCapture {
    /// Creates the capture device and the sender that feeds it
    pub fn new() -> (mpsc::UnboundedSender<String>, Self) {
        let (sender, frames) = mpsc::unbounded_channel();
        (sender, Self { frames })
    }
}

impl Capture for ChannelCapture {
    type Frame = String;

    fn capture(&mut self) -> Option<String> {
        self.frames.try_recv().ok()
    }
}

/// Decodes frames that already carry the code as text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    type Frame = String;

    fn decode(&mut self, frame: &String) -> Result<Option<String>, DecodeError> {
        let text = frame.trim();
        Ok((!text.is_empty()).then(|| text.to_owned()))
    }
}

/// A device that only one session may use at a time
#[derive(Debug, Clone, Default)]
struct Slot(Arc<AtomicBool>);

/// Proof of holding a [`Slot`]; releases it when dropped
#[derive(Debug)]
struct Claim(Arc<AtomicBool>);

impl Slot {
    fn claim(&self, busy: Error) -> Result<Claim, Error> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Claim(self.0.clone()))
            .map_err(|_| busy)
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A running session's producers and devices
#[derive(Debug)]
struct Active {
    id: Id,
    router: Router,
    producers: Vec<JoinHandle<()>>,
    _claims: Vec<Claim>,
}

impl Drop for Active {
    fn drop(&mut self) {
        for producer in &self.producers {
            producer.abort();
        }
    }
}

/// Hardware for a session's line reader
pub type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// Handle to a running kiosk
///
/// The dispatcher itself runs on its own task; the kiosk starts and stops
/// sessions and hands out the [`Router`] for the running one.
#[derive(Debug)]
pub struct Kiosk {
    config: Config,
    queue: mpsc::UnboundedSender<Envelope>,
    status: watch::Receiver<Status>,
    capture: Slot,
    hardware: Slot,
    active: Option<Active>,
}

impl Kiosk {
    /// Spawns the dispatcher and returns a handle to it
    ///
    /// # Returns
    ///
    /// The kiosk handle and the dispatcher task, which resolves to the
    /// dispatcher once it shuts down.
    pub fn launch<S, P>(config: Config, store: S, presenter: P) -> (Self, JoinHandle<Dispatcher<S, P>>)
    where
        S: KeyValueStore + Send + 'static,
        P: Presenter + Send + 'static,
    {
        let dispatcher = Dispatcher::new(config.clone(), store, presenter);
        let status = dispatcher.subscribe();
        let (queue, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(dispatcher.run(receiver));

        (
            Self {
                config,
                queue,
                status,
                capture: Slot::default(),
                hardware: Slot::default(),
                active: None,
            },
            task,
        )
    }

    /// A receiver for the published status
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    /// The router of the running session
    pub fn router(&self) -> Option<&Router> {
        self.active.as_ref().map(|active| &active.router)
    }

    /// Queues an operator command
    ///
    /// # Errors
    ///
    /// Returns `Error::Closed` if the dispatcher has stopped.
    pub fn send(&self, command: Command) -> Result<(), Error> {
        self.queue
            .send(Envelope::command(command))
            .map_err(|_| Error::Closed)
    }

    /// Starts a session and its producers
    ///
    /// Any finished session that was not saved is discarded. Returns once the
    /// dispatcher has started the session.
    ///
    /// # Arguments
    ///
    /// * `scanner` - Capture and decode loop, if a camera is attached
    /// * `hardware` - Lines from the answer box, if one is attached
    ///
    /// # Errors
    ///
    /// Fails without side effects if a device is already claimed or a
    /// session is running.
    pub async fn start_session(
        &mut self,
        scanner: Option<Box<dyn Scanner>>,
        hardware: Option<LineSource>,
    ) -> Result<Router, Error> {
        self.release_finished();

        let mut claims = Vec::new();
        if scanner.is_some() {
            claims.push(self.capture.claim(Error::CaptureBusy)?);
        }
        if hardware.is_some() {
            claims.push(self.hardware.claim(Error::HardwareBusy)?);
        }
        if self.active.is_some() {
            return Err(Error::SessionActive);
        }

        let id = Id::new();
        self.send(Command::Reset)?;
        self.send(Command::Start(id))?;
        self.status
            .wait_for(|status| status.session == Some(id))
            .await
            .map_err(|_| Error::Closed)?;

        let router = Router::new(
            id,
            self.config.vocabulary.clone(),
            &self.config.input,
            self.queue.clone(),
            self.status.clone(),
        );

        let mut producers = vec![tokio::spawn(tick(
            id,
            self.queue.clone(),
            self.status.clone(),
        ))];
        if let Some(scanner) = scanner {
            producers.push(tokio::spawn(scan(
                id,
                scanner,
                self.config.capture_interval,
                self.queue.clone(),
                self.status.clone(),
            )));
        }
        if let Some(hardware) = hardware {
            info!(baud_rate = self.config.baud_rate, "reading answer box");
            producers.push(tokio::spawn(read_lines(
                hardware,
                router.clone(),
                self.queue.clone(),
            )));
        }

        info!(session = %id, producers = producers.len(), "session producers started");
        self.active = Some(Active {
            id,
            router: router.clone(),
            producers,
            _claims: claims,
        });

        Ok(router)
    }

    /// Stops the running session's producers and ends the session
    ///
    /// # Returns
    ///
    /// Whether a session was running.
    ///
    /// # Errors
    ///
    /// Returns `Error::Closed` if the dispatcher has stopped.
    pub fn stop_session(&mut self) -> Result<bool, Error> {
        let Some(active) = self.active.take() else {
            return Ok(false);
        };
        info!(session = %active.id, "stopping session producers");
        drop(active);
        self.send(Command::Stop)?;
        Ok(true)
    }

    /// Releases the producers and devices of a session that ended on its own
    ///
    /// The session's result stays available for saving.
    ///
    /// # Returns
    ///
    /// Whether a finished session was released.
    pub fn release_finished(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let finished = {
            let status = self.status.borrow();
            status.session != Some(active.id) || status.phase == Phase::GameOver
        };
        if finished {
            info!(session = %active.id, "releasing finished session");
            self.active = None;
        }
        finished
    }

    /// Stops everything and asks the dispatcher to exit
    ///
    /// # Errors
    ///
    /// Returns `Error::Closed` if the dispatcher had already stopped.
    pub fn shutdown(mut self) -> Result<(), Error> {
        self.active = None;
        self.send(Command::Shutdown)
    }
}

async fn tick(
    session: Id,
    queue: mpsc::UnboundedSender<Envelope>,
    mut status: watch::Receiver<Status>,
) {
    // round being counted down and when its next second elapses
    let mut next: Option<(u32, time::Instant)> = None;
    // part of a second a frozen countdown still had to go
    let mut frozen: Option<(u32, Duration)> = None;

    loop {
        let counting = {
            let status = status.borrow_and_update();
            (status.session == Some(session) && status.counting).then_some(status.round)
        };

        let now = time::Instant::now();
        match (next, counting) {
            (Some((round, _)), Some(current)) if round == current => {}
            (previous, current) => {
                if let Some((round, due)) = previous {
                    frozen = Some((round, due.saturating_duration_since(now)));
                }
                next = current.map(|round| {
                    let left = match frozen.take() {
                        Some((paused, left)) if paused == round => left,
                        _ => TICK_PERIOD,
                    };
                    (round, now + left)
                });
            }
        }

        let Some((round, due)) = next else {
            if status.changed().await.is_err() {
                break;
            }
            continue;
        };

        tokio::select! {
            () = time::sleep_until(due) => {
                next = Some((round, due + TICK_PERIOD));
                let tick = Tick { at: Instant::now(), round };
                if queue.send(Envelope::stamped(session, tick)).is_err() {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

async fn scan(
    session: Id,
    mut scanner: Box<dyn Scanner>,
    period: Duration,
    queue: mpsc::UnboundedSender<Envelope>,
    status: watch::Receiver<Status>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let accepting = {
            let status = status.borrow();
            status.session == Some(session)
                && matches!(status.phase, Phase::AwaitingToken | Phase::Cooldown)
                && !status.paused
        };
        if !accepting {
            continue;
        }

        match scanner.poll() {
            Ok(Some(raw)) => {
                let scan = Scan {
                    raw,
                    at: Instant::now(),
                };
                if queue.send(Envelope::stamped(session, scan)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => trace!(error = %e, "frame skipped"),
        }
    }
}

async fn read_lines(
    mut reader: LineSource,
    router: Router,
    queue: mpsc::UnboundedSender<Envelope>,
) {
    let session = router.session();
    let _ = queue.send(Envelope::stamped(session, Link::Connected));

    let mut buf = Vec::with_capacity(MAX_LINE_LENGTH + 1);
    let mut oversized = false;

    let reason = loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await;
        match read {
            Ok(0) => break "connection closed".to_owned(),
            Ok(_) => {}
            Err(e) => break e.to_string(),
        }

        let terminated = buf.last() == Some(&b'\n');
        if oversized || buf.len() - usize::from(terminated) > MAX_LINE_LENGTH {
            if !oversized {
                debug!("ignoring oversized hardware line");
            }
            // keep discarding until the end of the line
            oversized = !terminated;
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        match router.hardware_line(&line) {
            Ok(()) => {}
            Err(Dropped::Closed) => return,
            Err(reason) => trace!(line = %line.trim_end(), %reason, "hardware line dropped"),
        }
    };

    let _ = queue.send(Envelope::stamped(session, Link::Lost(reason)));
}

/// Writes feedback lines to the answer box until the channel closes
///
/// A failed write ends the writer; the game carries on without feedback.
pub async fn write_feedback<W>(mut lines: mpsc::UnboundedReceiver<Feedback>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(feedback) = lines.recv().await {
        let written = async {
            writer.write_all(feedback.to_line().as_bytes()).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(error = %e, "answer box feedback failed, giving up");
            break;
        }
    }
}
