//! Wager Engine - win/loss determination and payouts for casino-style games
//!
//! Decides each wager through a shuffled win/loss pattern, draws a payout
//! multiplier from per-game weighted tables and computes the balance the
//! caller should persist. Also hosts the crash curve shared by the
//! climb-then-crash games.

pub mod config;
pub mod errors;
pub mod games;
pub mod logging;
pub mod metrics;

pub use config::{ConfigLoader, EngineConfig};
pub use errors::{ConfigurationError, CrashError, EngineError, EngineResult, PlayRejection};
pub use games::{
    can_play, BetBounds, GameOutcome, PlayRequest, PlayResult, SessionEngines, SharedEngine,
    WinLossEngine, WinLossStats,
};
pub use metrics::{MetricsSnapshot, PlayMetrics};
