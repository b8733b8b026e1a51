//! Error types for the wager engine
//!
//! Play rejections are plain data returned inside a `PlayResult`; they never
//! propagate as failures. `EngineError` covers the things that can actually
//! go wrong around the engine: configuration, metrics and the crash curve.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a wager was refused before any outcome was drawn
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PlayRejection {
    #[error("Stake must be greater than zero (got {stake})")]
    InvalidStake { stake: f64 },

    #[error("Insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: f64, balance: f64 },

    #[error("Minimum bet for {game_type} is {min} (got {stake})")]
    BelowMinimumBet { game_type: String, stake: f64, min: f64 },

    #[error("Maximum bet for {game_type} is {max} (got {stake})")]
    AboveMaximumBet { game_type: String, stake: f64, max: f64 },

    #[error("Stake {stake} at up to {max_multiplier}x overflows the payout range")]
    PayoutOverflow { stake: f64, max_multiplier: f64 },
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Crash curve state machine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrashError {
    #[error("Cannot {action} while round is {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    #[error("Cash out requires a positive stake")]
    InvalidStake,
}

/// Root error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Crash error: {0}")]
    Crash(#[from] CrashError),
}

pub type EngineResult<T> = Result<T, EngineError>;
