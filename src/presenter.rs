//! Output side of the kiosk
//!
//! Everything the engine wants a display, speaker or answer box to know goes
//! through a [`Presenter`]. Announcements are fire-and-forget: a presenter
//! that cannot deliver simply drops the message.

use crate::{Notice, Snapshot};

/// A channel to whatever shows the game
pub trait Presenter {
    /// Announces something that just happened
    ///
    /// # Arguments
    ///
    /// * `notice` - The announcement
    fn announce(&self, notice: &Notice);

    /// Sends the full current state
    ///
    /// Used when a display connects or asks to be redrawn. Presenters that
    /// only react to events can ignore it.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The current state
    fn sync(&self, snapshot: &Snapshot) {
        let _ = snapshot;
    }
}

impl<A: Presenter, B: Presenter> Presenter for (A, B) {
    fn announce(&self, notice: &Notice) {
        self.0.announce(notice);
        self.1.announce(notice);
    }

    fn sync(&self, snapshot: &Snapshot) {
        self.0.sync(snapshot);
        self.1.sync(snapshot);
    }
}

/// Writes every message as one JSON line on standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn announce(&self, notice: &Notice) {
        println!("{}", notice.to_message());
    }

    fn sync(&self, snapshot: &Snapshot) {
        println!("{}", snapshot.to_message());
    }
}

#[cfg(test)]
pub(crate) use recorder::Recorder;

#[cfg(test)]
mod recorder {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Keeps everything it is given; clones share the same log
    #[derive(Debug, Clone, Default)]
    pub struct Recorder {
        notices: Arc<Mutex<Vec<Notice>>>,
        snapshots: Arc<Mutex<Vec<Snapshot>>>,
    }

    impl Recorder {
        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }

        pub fn snapshots(&self) -> Vec<Snapshot> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    impl Presenter for Recorder {
        fn announce(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }

        fn sync(&self, snapshot: &Snapshot) {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }
    }
}
