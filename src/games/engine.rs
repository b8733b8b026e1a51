//! Win/loss decision and payout engine
//!
//! An explicit context object: each instance owns its own pattern queue and
//! RNG, so tests and sessions never share hidden state. Every operation is a
//! synchronous computation with no I/O; persisting `resulting_balance` is the
//! caller's job.

use crate::config::{EngineConfig, PatternConfig};
use crate::errors::{EngineResult, PlayRejection};
use crate::games::pattern::WinLossPattern;
use crate::games::tables::{normalize_game_type, BetBoundsTable, MultiplierTable};
use crate::games::types::{PlayRequest, PlayResult, WinLossStats};
use crate::metrics::{PlayMetrics, DEFAULT_GAME_LABEL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// True iff `stake > 0` and the balance covers it
pub fn can_play(stake: f64, balance: f64) -> bool {
    check_affordable(stake, balance).is_ok()
}

fn check_affordable(stake: f64, balance: f64) -> Result<(), PlayRejection> {
    // Written so NaN fails both checks
    if !(stake > 0.0) {
        return Err(PlayRejection::InvalidStake { stake });
    }
    if !(balance >= stake) {
        return Err(PlayRejection::InsufficientBalance { stake, balance });
    }
    Ok(())
}

/// Reject stakes whose best possible payout cannot be represented as `u64`
fn check_payout_range(stake: f64, candidates: &[f64]) -> Result<(), PlayRejection> {
    let max_multiplier = candidates.iter().copied().fold(0.0, f64::max);
    // u64::MAX rounds up to 2^64 as f64, so equality already overflows
    if (stake * max_multiplier).floor() < u64::MAX as f64 {
        Ok(())
    } else {
        Err(PlayRejection::PayoutOverflow { stake, max_multiplier })
    }
}

/// Pick from `candidates` with weight `decay^index`, using a uniform `draw`
/// in `[0, 1)` against the normalised cumulative distribution.
pub fn weighted_pick(candidates: &[f64], decay: f64, draw: f64) -> Option<f64> {
    let weights: Vec<f64> = (0..candidates.len()).map(|i| decay.powi(i as i32)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return candidates.first().copied();
    }

    let mut cumulative = 0.0;
    for (candidate, weight) in candidates.iter().zip(&weights) {
        cumulative += weight / total;
        if draw < cumulative {
            return Some(*candidate);
        }
    }
    // Rounding can leave the cumulative sum a hair under 1.0
    candidates.last().copied()
}

pub struct WinLossEngine<R: Rng = StdRng> {
    pattern_config: PatternConfig,
    weight_decay: f64,
    multipliers: MultiplierTable,
    bounds: BetBoundsTable,
    pattern: WinLossPattern,
    rng: R,
    metrics: Option<PlayMetrics>,
}

impl WinLossEngine<StdRng> {
    /// Engine seeded from OS entropy
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible engine for tests and simulations
    pub fn seeded(config: &EngineConfig, seed: u64) -> EngineResult<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> WinLossEngine<R> {
    pub fn with_rng(config: &EngineConfig, rng: R) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            pattern_config: config.pattern.clone(),
            weight_decay: config.payout.weight_decay,
            multipliers: MultiplierTable::from_config(&config.tables),
            bounds: BetBoundsTable::from_config(&config.tables),
            pattern: WinLossPattern::new(&config.pattern),
            rng,
            metrics: None,
        })
    }

    /// Record every settled play into `metrics`
    pub fn with_metrics(mut self, metrics: PlayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&PlayMetrics> {
        self.metrics.as_ref()
    }

    pub fn multiplier_table(&self) -> &MultiplierTable {
        &self.multipliers
    }

    pub fn bounds_table(&self) -> &BetBoundsTable {
        &self.bounds
    }

    pub fn can_play(&self, stake: f64, balance: f64) -> bool {
        can_play(stake, balance)
    }

    pub fn validate_stake_bounds(&self, stake: f64, game_type: &str) -> Result<(), PlayRejection> {
        self.bounds.validate_stake(stake, game_type)
    }

    /// Next win/loss decision.
    ///
    /// Usually the front of the shuffled pattern queue; otherwise an
    /// independent draw at `override_win_probability`. The override path
    /// pulls the long-run rate slightly under the pattern's ratio
    /// (0.9 * 0.2 + 0.1 * 0.15 = 0.195 with the defaults).
    pub fn decide_outcome(&mut self) -> bool {
        let pattern_result = self.pattern.next(&mut self.rng);

        if self.rng.gen_bool(self.pattern_config.pattern_follow_probability) {
            pattern_result
        } else {
            self.rng.gen_bool(self.pattern_config.override_win_probability)
        }
    }

    /// Weighted multiplier for `game_type`, lowest candidate most likely.
    ///
    /// `base_multiplier` is accepted but does not influence the draw.
    pub fn pick_multiplier(&mut self, game_type: &str, base_multiplier: Option<f64>) -> f64 {
        if let Some(base) = base_multiplier {
            tracing::trace!(game_type, base, "Ignoring base multiplier");
        }
        let draw: f64 = self.rng.gen();
        let candidates = self.multipliers.candidates(game_type);
        // Tables are validated non-empty at construction
        weighted_pick(candidates, self.weight_decay, draw).unwrap_or(0.0)
    }

    /// Settle one wager without stake-bound checks
    pub fn compute_result(
        &mut self,
        stake: f64,
        balance: f64,
        game_type: &str,
        base_multiplier: Option<f64>,
    ) -> PlayResult {
        let verdict = check_affordable(stake, balance)
            .and_then(|_| check_payout_range(stake, self.multipliers.candidates(game_type)));
        if let Err(rejection) = verdict {
            return self.reject(stake, balance, game_type, rejection);
        }

        let won = self.decide_outcome();
        let (multiplier, payout) = if won {
            let multiplier = self.pick_multiplier(game_type, base_multiplier);
            (multiplier, (stake * multiplier).floor() as u64)
        } else {
            (0.0, 0)
        };
        let resulting_balance = balance - stake + payout as f64;

        let message = if won {
            format!("You won {} at {}x!", payout, multiplier)
        } else {
            format!("You lost {}. Better luck next time!", stake)
        };

        tracing::debug!(game_type, stake, won, multiplier, payout, resulting_balance, "Play settled");

        self.finish(PlayResult {
            play_id: Uuid::new_v4().to_string(),
            game_type: normalize_game_type(game_type),
            won,
            multiplier,
            payout,
            stake,
            resulting_balance,
            message,
            rejection: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Full play: affordability, then stake bounds, then settlement
    pub fn play(&mut self, request: &PlayRequest) -> PlayResult {
        let PlayRequest {
            stake_amount,
            current_balance,
            ref game_type,
            base_multiplier,
        } = *request;

        let verdict = check_affordable(stake_amount, current_balance)
            .and_then(|_| self.bounds.validate_stake(stake_amount, game_type));
        if let Err(rejection) = verdict {
            return self.reject(stake_amount, current_balance, game_type, rejection);
        }

        self.compute_result(stake_amount, current_balance, game_type, base_multiplier)
    }

    pub fn get_win_loss_stats(&self) -> WinLossStats {
        self.pattern.stats()
    }

    /// Throw away the rest of the current pattern and reshuffle now
    pub fn reset_pattern(&mut self) {
        self.pattern.reshuffle(&mut self.rng);
        tracing::debug!(generation = self.pattern.generation(), "Win/loss pattern reset");
    }

    fn reject(
        &self,
        stake: f64,
        balance: f64,
        game_type: &str,
        rejection: PlayRejection,
    ) -> PlayResult {
        tracing::info!(game_type, stake, balance, reason = %rejection, "Play rejected");

        self.finish(PlayResult {
            play_id: Uuid::new_v4().to_string(),
            game_type: normalize_game_type(game_type),
            won: false,
            multiplier: 0.0,
            payout: 0,
            stake,
            resulting_balance: balance,
            message: rejection.to_string(),
            rejection: Some(rejection),
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    fn finish(&self, result: PlayResult) -> PlayResult {
        if let Some(metrics) = &self.metrics {
            // Caller-supplied names outside the table share one series
            let label = if self.multipliers.is_known(&result.game_type) {
                result.game_type.as_str()
            } else {
                DEFAULT_GAME_LABEL
            };
            metrics.record(label, &result);
        }
        result
    }
}
