use crate::errors::PlayRejection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive stake bounds for one game type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetBounds {
    pub min: f64,
    pub max: f64,
}

impl BetBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Rejected,
}

impl GameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOutcome::Win => "win",
            GameOutcome::Loss => "loss",
            GameOutcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to play one round of any game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    pub stake_amount: f64,
    pub current_balance: f64,
    pub game_type: String,
    /// Accepted for compatibility with game screens; does not alter the table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_multiplier: Option<f64>,
}

impl PlayRequest {
    pub fn new(stake_amount: f64, current_balance: f64, game_type: impl Into<String>) -> Self {
        Self {
            stake_amount,
            current_balance,
            game_type: game_type.into(),
            base_multiplier: None,
        }
    }

    pub fn with_base_multiplier(mut self, base_multiplier: f64) -> Self {
        self.base_multiplier = Some(base_multiplier);
        self
    }
}

/// What should happen to the player's balance for a single wager.
///
/// The engine never commits this anywhere; the caller persists
/// `resulting_balance` to its own wallet store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResult {
    pub play_id: String,
    pub game_type: String,
    pub won: bool,
    /// 0 on a loss or rejection
    pub multiplier: f64,
    pub payout: u64,
    pub stake: f64,
    pub resulting_balance: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PlayRejection>,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl PlayResult {
    pub fn outcome(&self) -> GameOutcome {
        match (self.rejection.is_some(), self.won) {
            (true, _) => GameOutcome::Rejected,
            (false, true) => GameOutcome::Win,
            (false, false) => GameOutcome::Loss,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Net change to the balance (negative on a loss)
    pub fn net(&self) -> f64 {
        if self.is_rejected() {
            0.0
        } else {
            self.payout as f64 - self.stake
        }
    }
}

/// Unconsumed portion of the current pattern generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLossStats {
    pub wins_remaining: usize,
    pub losses_remaining: usize,
    pub total_in_queue: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(won: bool, rejection: Option<PlayRejection>) -> PlayResult {
        PlayResult {
            play_id: "p".to_string(),
            game_type: "dice".to_string(),
            won,
            multiplier: if won { 2.0 } else { 0.0 },
            payout: if won { 20 } else { 0 },
            stake: 10.0,
            resulting_balance: 0.0,
            message: String::new(),
            rejection,
            timestamp: 0,
        }
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(result(true, None).outcome(), GameOutcome::Win);
        assert_eq!(result(false, None).outcome(), GameOutcome::Loss);
        let rejected = result(false, Some(PlayRejection::InvalidStake { stake: 0.0 }));
        assert_eq!(rejected.outcome(), GameOutcome::Rejected);
        assert_eq!(rejected.net(), 0.0);
    }

    #[test]
    fn test_net_change() {
        assert_eq!(result(true, None).net(), 10.0);
        assert_eq!(result(false, None).net(), -10.0);
    }

    #[test]
    fn test_request_deserializes_without_base_multiplier() {
        let request: PlayRequest = serde_json::from_str(
            r#"{"stake_amount": 10.0, "current_balance": 100.0, "game_type": "dice"}"#,
        )
        .unwrap();
        assert_eq!(request.base_multiplier, None);
        assert_eq!(request.game_type, "dice");
    }
}
