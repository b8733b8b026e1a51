pub mod types;
pub mod tables;
pub mod pattern;
pub mod engine;
pub mod session;
pub mod crash;

pub use types::*;
pub use tables::{BetBoundsTable, MultiplierTable};
pub use pattern::{PatternState, WinLossPattern};
pub use engine::{can_play, weighted_pick, WinLossEngine};
pub use session::{SessionEngines, SharedEngine};
pub use crash::{CrashCurve, CrashEvent, CrashPhase, CrashPointDistribution, CrashRoundDriver, HouseEdgeDistribution};
