//! Static per-game lookup tables
//!
//! Both tables are built once from `TablesConfig` and never mutated.
//! Lookups normalise the game type key, and unknown game types fall back
//! to the default entry.

use crate::config::TablesConfig;
use crate::errors::PlayRejection;
use crate::games::types::BetBounds;
use std::collections::HashMap;

pub(crate) fn normalize_game_type(game_type: &str) -> String {
    game_type.trim().to_ascii_lowercase()
}

/// gameType -> ascending multiplier candidates
#[derive(Debug, Clone)]
pub struct MultiplierTable {
    tables: HashMap<String, Vec<f64>>,
    default: Vec<f64>,
}

impl MultiplierTable {
    pub fn new(tables: HashMap<String, Vec<f64>>, default: Vec<f64>) -> Self {
        let tables = tables
            .into_iter()
            .map(|(game, table)| (normalize_game_type(&game), table))
            .collect();
        Self { tables, default }
    }

    pub fn from_config(config: &TablesConfig) -> Self {
        Self::new(config.multipliers.clone(), config.default_multipliers.clone())
    }

    pub fn candidates(&self, game_type: &str) -> &[f64] {
        self.tables
            .get(&normalize_game_type(game_type))
            .map(Vec::as_slice)
            .unwrap_or(self.default.as_slice())
    }

    pub fn is_known(&self, game_type: &str) -> bool {
        self.tables.contains_key(&normalize_game_type(game_type))
    }
}

/// gameType -> stake bounds
#[derive(Debug, Clone)]
pub struct BetBoundsTable {
    bounds: HashMap<String, BetBounds>,
    default: BetBounds,
}

impl BetBoundsTable {
    pub fn new(bounds: HashMap<String, BetBounds>, default: BetBounds) -> Self {
        let bounds = bounds
            .into_iter()
            .map(|(game, b)| (normalize_game_type(&game), b))
            .collect();
        Self { bounds, default }
    }

    pub fn from_config(config: &TablesConfig) -> Self {
        Self::new(config.bounds.clone(), config.default_bounds)
    }

    pub fn bounds(&self, game_type: &str) -> BetBounds {
        self.bounds
            .get(&normalize_game_type(game_type))
            .copied()
            .unwrap_or(self.default)
    }

    /// Check a stake against the game's inclusive bounds
    pub fn validate_stake(&self, stake: f64, game_type: &str) -> Result<(), PlayRejection> {
        let BetBounds { min, max } = self.bounds(game_type);
        // Written so NaN lands below the minimum
        if !(stake >= min) {
            return Err(PlayRejection::BelowMinimumBet {
                game_type: normalize_game_type(game_type),
                stake,
                min,
            });
        }
        if stake > max {
            return Err(PlayRejection::AboveMaximumBet {
                game_type: normalize_game_type(game_type),
                stake,
                max,
            });
        }
        Ok(())
    }
}
