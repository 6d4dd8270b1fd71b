//! Configuration constants for the scan quiz engine
//!
//! This module contains the limits and defaults used throughout the engine
//! to validate configuration and to keep the round, gate and leaderboard
//! components within consistent boundaries.

/// Round configuration constants
pub mod round {
    /// Default answer window in seconds
    pub const DEFAULT_WINDOW: u64 = 10;
    /// Minimum answer window in seconds
    pub const MIN_WINDOW: u64 = 3;
    /// Maximum answer window in seconds, also the cap for carried-over bonus time
    pub const MAX_WINDOW: u64 = 120;
    /// Default time in seconds shown (frozen) between rounds
    pub const DEFAULT_INTER_ROUND_DISPLAY: u64 = 10;
    /// Default number of rounds in a session
    pub const DEFAULT_TOTAL_ROUNDS: u32 = 5;
    /// Minimum number of rounds in a session
    pub const MIN_TOTAL_ROUNDS: u32 = 1;
    /// Maximum number of rounds in a session
    pub const MAX_TOTAL_ROUNDS: u32 = 1000;
}

/// Token gate configuration constants
pub mod gate {
    /// Default cooldown in milliseconds before an identical token is re-accepted
    pub const DEFAULT_COOLDOWN_MS: u64 = 2_000;
    /// Maximum cooldown in milliseconds
    pub const MAX_COOLDOWN_MS: u64 = 10_000;
}

/// Scoring configuration constants
pub mod scoring {
    /// Default points for an instant correct answer
    pub const DEFAULT_MAX_POINTS: u64 = 10;
    /// Default points for a correct answer with no time left
    pub const DEFAULT_MIN_POINTS: u64 = 1;
    /// Upper bound accepted for `max_points`
    pub const MAX_POINTS_LIMIT: u64 = 10_000;
}

/// Leaderboard configuration constants
pub mod leaderboard {
    /// Number of entries kept in the hall of fame
    pub const CAPACITY: usize = 10;
    /// Key under which the hall of fame is persisted
    pub const STORE_KEY: &str = "hallOfFame";
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Capture and hardware constants
pub mod input {
    /// Default interval in milliseconds between capture ticks
    pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 100;
    /// Minimum interval in milliseconds between capture ticks
    pub const MIN_CAPTURE_INTERVAL_MS: u64 = 16;
    /// Baud rate the hardware line protocol is spoken at
    pub const DEFAULT_BAUD_RATE: u32 = 9_600;
    /// Maximum accepted length of a single hardware line in bytes
    pub const MAX_LINE_LENGTH: usize = 64;
}
