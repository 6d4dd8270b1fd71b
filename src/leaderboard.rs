//! Hall of fame
//!
//! The leaderboard keeps the best finished sessions, ranked by score with
//! earlier entries winning ties, and never holds more than
//! [`CAPACITY`](crate::constants::leaderboard::CAPACITY) entries. The ranking
//! is reapplied on every load since the stored list may have been edited or
//! appended to out of order.

use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};
use web_time::SystemTime;

use crate::{
    constants::leaderboard::{CAPACITY, STORE_KEY},
    store::{self, KeyValueStore},
};

fn unix_epoch() -> SystemTime {
    SystemTime::UNIX_EPOCH
}

/// A finished session as recorded in the hall of fame
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Display name chosen at the save prompt
    pub name: String,
    /// Final session score
    pub score: u64,
    /// When the session was saved; entries written without one rank as oldest
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    #[serde(default = "unix_epoch")]
    pub timestamp: SystemTime,
}

impl LeaderboardEntry {
    /// Ordering used for ranking: higher score first, then earlier timestamp
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.timestamp.cmp(&other.timestamp))
    }
}

/// Serialization helper that tolerates malformed entries
#[derive(Deserialize)]
#[serde(transparent)]
struct LeaderboardSerde(Vec<serde_json::Value>);

/// The ranked, capacity-bounded list of best sessions
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "LeaderboardSerde")]
pub struct Leaderboard {
    /// Entries in rank order
    entries: Vec<LeaderboardEntry>,
}

impl From<LeaderboardSerde> for Leaderboard {
    /// Rebuilds the ranking from stored data
    ///
    /// Entries that do not parse are skipped, the rest are sorted and
    /// truncated as if they had been added one by one.
    fn from(serde: LeaderboardSerde) -> Self {
        let entries = serde
            .0
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<LeaderboardEntry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "skipping malformed leaderboard entry");
                    None
                }
            })
            .sorted_by(LeaderboardEntry::rank)
            .take(CAPACITY)
            .collect_vec();

        Self { entries }
    }
}

impl Serialize for Leaderboard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.entries.serialize(serializer)
    }
}

impl Leaderboard {
    /// Inserts an entry at its rank, evicting the lowest entry when full
    ///
    /// # Returns
    ///
    /// The zero-based position of the entry, or `None` if it did not rank
    /// high enough to be kept.
    pub fn add(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        // after every entry that ranks at or above it, so earlier saves win full ties
        let position = self
            .entries
            .partition_point(|existing| existing.rank(&entry) != Ordering::Greater);

        if position >= CAPACITY {
            return None;
        }

        self.entries.insert(position, entry);
        self.entries.truncate(CAPACITY);

        Some(position)
    }

    /// Entries in rank order
    pub fn list(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Reads the leaderboard from a store
    ///
    /// A missing, unreadable or unparseable value yields an empty leaderboard;
    /// the hall of fame must never stop the kiosk from starting.
    pub fn load(store: &impl KeyValueStore) -> Self {
        let raw = match store.get(STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(error = %e, "could not read leaderboard, starting empty");
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "stored leaderboard is corrupted, starting empty");
            Self::default()
        })
    }

    /// Writes the leaderboard to a store
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub fn save(&self, store: &mut impl KeyValueStore) -> Result<(), store::Error> {
        let raw = serde_json::to_string(self)?;
        store.set(STORE_KEY, &raw)
    }
}
