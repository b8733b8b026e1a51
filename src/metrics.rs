//! Play metrics collection

use crate::errors::EngineResult;
use crate::games::types::PlayResult;
use prometheus::{Counter, Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

/// `game_type` label for plays on games outside the multiplier table
pub const DEFAULT_GAME_LABEL: &str = "default";

/// Counters for every play the engine settles
#[derive(Clone)]
pub struct PlayMetrics {
    registry: Registry,
    plays: IntCounterVec,
    staked: Counter,
    paid: Counter,
}

/// Aggregate view over all recorded plays
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub plays: u64,
    pub wins: u64,
    pub losses: u64,
    pub rejections: u64,
    pub total_staked: f64,
    pub total_paid: f64,
    pub win_rate: f64,
    pub return_to_player: f64,
}

impl PlayMetrics {
    pub fn new() -> EngineResult<Self> {
        let registry = Registry::new();

        let plays = IntCounterVec::new(
            Opts::new("wager_plays_total", "Plays settled by the engine"),
            &["game_type", "outcome"],
        )?;
        let staked = Counter::new("wager_staked_total", "Total stake accepted")?;
        let paid = Counter::new("wager_paid_total", "Total payout credited")?;

        registry.register(Box::new(plays.clone()))?;
        registry.register(Box::new(staked.clone()))?;
        registry.register(Box::new(paid.clone()))?;

        Ok(Self {
            registry,
            plays,
            staked,
            paid,
        })
    }

    /// Count one play under `game_label`, which must come from a bounded set
    pub fn record(&self, game_label: &str, result: &PlayResult) {
        self.plays
            .with_label_values(&[game_label, result.outcome().as_str()])
            .inc();
        if !result.is_rejected() {
            self.staked.inc_by(result.stake);
            self.paid.inc_by(result.payout as f64);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (mut wins, mut losses, mut rejections) = (0, 0, 0);
        for family in self.registry.gather() {
            if family.get_name() != "wager_plays_total" {
                continue;
            }
            for metric in family.get_metric() {
                let count = metric.get_counter().get_value() as u64;
                let outcome = metric
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == "outcome")
                    .map(|l| l.get_value().to_string());
                match outcome.as_deref() {
                    Some("win") => wins += count,
                    Some("loss") => losses += count,
                    Some("rejected") => rejections += count,
                    _ => {}
                }
            }
        }

        let settled = wins + losses;
        let total_staked = self.staked.get();
        let total_paid = self.paid.get();
        MetricsSnapshot {
            plays: settled + rejections,
            wins,
            losses,
            rejections,
            total_staked,
            total_paid,
            win_rate: if settled == 0 { 0.0 } else { wins as f64 / settled as f64 },
            return_to_player: if total_staked == 0.0 { 0.0 } else { total_paid / total_staked },
        }
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> EngineResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlayRejection;

    fn play(won: bool, rejection: Option<PlayRejection>) -> PlayResult {
        PlayResult {
            play_id: "id".to_string(),
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
    fn test_snapshot_counts_outcomes() {
        let metrics = PlayMetrics::new().unwrap();
        metrics.record("dice", &play(true, None));
        metrics.record("dice", &play(false, None));
        metrics.record("dice", &play(false, None));
        metrics.record("dice", &play(false, Some(PlayRejection::InvalidStake { stake: 0.0 })));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plays, 4);
        assert_eq!(snapshot.wins, 1);
        assert_eq!(snapshot.losses, 2);
        assert_eq!(snapshot.rejections, 1);
        assert_eq!(snapshot.total_staked, 30.0);
        assert_eq!(snapshot.total_paid, 20.0);
        assert!((snapshot.return_to_player - 20.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_contains_counters() {
        let metrics = PlayMetrics::new().unwrap();
        metrics.record("dice", &play(true, None));
        let text = metrics.render().unwrap();
        assert!(text.contains("wager_plays_total"));
        assert!(text.contains("outcome=\"win\""));
        assert!(text.contains("wager_paid_total"));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PlayMetrics::new().unwrap().snapshot();
        assert_eq!(snapshot.plays, 0);
        assert_eq!(snapshot.win_rate, 0.0);
        assert_eq!(snapshot.return_to_player, 0.0);
    }
}
