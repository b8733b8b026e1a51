//! Crash curve generator shared by the climb-then-crash games (aviator,
//! roll master)
//!
//! A round moves `Waiting -> Rolling -> Crashed -> Waiting`. The explosion
//! point is drawn when the round starts; while rolling, the multiplier grows
//! as `exp(growth_per_second * t)` until it reaches that point.
//! `CrashRoundDriver` steps the curve on a tokio interval and broadcasts
//! events to whatever renders it.

use crate::config::CrashConfig;
use crate::errors::{CrashError, EngineResult};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashPhase {
    Waiting,
    Rolling,
    Crashed,
}

impl fmt::Display for CrashPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrashPhase::Waiting => write!(f, "waiting"),
            CrashPhase::Rolling => write!(f, "rolling"),
            CrashPhase::Crashed => write!(f, "crashed"),
        }
    }
}

/// Source of explosion points
pub trait CrashPointDistribution: Send + Sync {
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

impl<F> CrashPointDistribution for F
where
    F: Fn(&mut dyn RngCore) -> f64 + Send + Sync,
{
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self(rng)
    }
}

/// `crash = house_factor / (1 - u)`, clamped to `[1, max]`
#[derive(Debug, Clone, Copy)]
pub struct HouseEdgeDistribution {
    pub house_factor: f64,
    pub max: f64,
}

impl HouseEdgeDistribution {
    pub fn from_config(config: &CrashConfig) -> Self {
        Self {
            house_factor: config.house_factor,
            max: config.max_crash_point,
        }
    }

    pub fn crash_point(&self, uniform: f64) -> f64 {
        let uniform = uniform.clamp(0.0, 0.99999);
        (self.house_factor / (1.0 - uniform)).clamp(1.0, self.max)
    }
}

impl CrashPointDistribution for HouseEdgeDistribution {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.crash_point(rng.gen())
    }
}

/// Single-round crash state machine
pub struct CrashCurve {
    distribution: Box<dyn CrashPointDistribution>,
    growth_per_second: f64,
    phase: CrashPhase,
    round_id: Option<Uuid>,
    crash_point: f64,
    current_multiplier: f64,
    elapsed: Duration,
    rounds_started: u64,
}

impl CrashCurve {
    pub fn new(config: &CrashConfig) -> Self {
        Self::with_distribution(config, HouseEdgeDistribution::from_config(config))
    }

    pub fn with_distribution<D>(config: &CrashConfig, distribution: D) -> Self
    where
        D: CrashPointDistribution + 'static,
    {
        Self {
            distribution: Box::new(distribution),
            growth_per_second: config.growth_per_second,
            phase: CrashPhase::Waiting,
            round_id: None,
            crash_point: 1.0,
            current_multiplier: 1.0,
            elapsed: Duration::ZERO,
            rounds_started: 0,
        }
    }

    pub fn phase(&self) -> CrashPhase {
        self.phase
    }

    pub fn round_id(&self) -> Option<Uuid> {
        self.round_id
    }

    pub fn current_multiplier(&self) -> f64 {
        self.current_multiplier
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds_started
    }

    /// Explosion point, revealed only once the round has crashed
    pub fn crash_point(&self) -> Option<f64> {
        (self.phase == CrashPhase::Crashed).then_some(self.crash_point)
    }

    /// Waiting -> Rolling; draws the explosion point
    pub fn start_round<R: RngCore>(&mut self, rng: &mut R) -> Result<Uuid, CrashError> {
        self.expect_phase(CrashPhase::Waiting, "start a round")?;

        let crash_point = self.distribution.sample(rng);
        let round_id = Uuid::new_v4();

        self.crash_point = crash_point.max(1.0);
        self.current_multiplier = 1.0;
        self.elapsed = Duration::ZERO;
        self.round_id = Some(round_id);
        self.rounds_started += 1;
        self.phase = CrashPhase::Rolling;

        tracing::debug!(%round_id, round = self.rounds_started, "Crash round started");
        Ok(round_id)
    }

    /// Move the curve forward by `delta`; returns the phase afterwards
    pub fn advance(&mut self, delta: Duration) -> Result<CrashPhase, CrashError> {
        self.expect_phase(CrashPhase::Rolling, "advance")?;

        self.elapsed += delta;
        let multiplier = (self.growth_per_second * self.elapsed.as_secs_f64()).exp();
        if multiplier >= self.crash_point {
            self.current_multiplier = self.crash_point;
            self.phase = CrashPhase::Crashed;
            tracing::debug!(
                round_id = ?self.round_id,
                crash_point = self.crash_point,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Crash round exploded"
            );
        } else {
            self.current_multiplier = multiplier;
        }
        Ok(self.phase)
    }

    /// Crashed -> Waiting
    pub fn finish_round(&mut self) -> Result<(), CrashError> {
        self.expect_phase(CrashPhase::Crashed, "finish a round")?;
        self.phase = CrashPhase::Waiting;
        self.round_id = None;
        Ok(())
    }

    /// Payout for cashing out `stake` at the current multiplier
    pub fn cash_out(&self, stake: f64) -> Result<u64, CrashError> {
        self.expect_phase(CrashPhase::Rolling, "cash out")?;
        if !(stake > 0.0) {
            return Err(CrashError::InvalidStake);
        }
        Ok((stake * self.current_multiplier).floor() as u64)
    }

    fn expect_phase(&self, expected: CrashPhase, action: &'static str) -> Result<(), CrashError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(CrashError::InvalidTransition {
                action,
                phase: self.phase.to_string(),
            })
        }
    }
}

/// Events published by `CrashRoundDriver`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrashEvent {
    RoundStarted { round_id: Uuid, round: u64 },
    Tick { round_id: Uuid, multiplier: f64, elapsed_ms: u64 },
    Crashed { round_id: Uuid, crash_point: f64, elapsed_ms: u64 },
}

/// Drives a `CrashCurve` in real time and broadcasts its progress
pub struct CrashRoundDriver {
    config: CrashConfig,
    events: broadcast::Sender<CrashEvent>,
    running: Arc<AtomicBool>,
    seed: Option<u64>,
}

impl CrashRoundDriver {
    pub fn new(config: &CrashConfig) -> Self {
        let (events, _) = broadcast::channel(1_024);
        Self {
            config: config.clone(),
            events,
            running: Arc::new(AtomicBool::new(true)),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrashEvent> {
        self.events.subscribe()
    }

    /// Stop after the current round
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Play `rounds` rounds (forever when `None`) and return how many finished
    pub async fn run_rounds(&self, rounds: Option<u64>) -> EngineResult<u64> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut curve = CrashCurve::new(&self.config);
        let tick = Duration::from_millis(self.config.tick_ms);
        let mut completed = 0;

        while self.is_running() && rounds.map_or(true, |n| completed < n) {
            tokio::time::sleep(Duration::from_millis(self.config.waiting_ms)).await;

            let round_id = curve.start_round(&mut rng)?;
            let _ = self.events.send(CrashEvent::RoundStarted {
                round_id,
                round: curve.rounds_started(),
            });

            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                let phase = curve.advance(tick)?;
                let elapsed_ms = curve.elapsed().as_millis() as u64;
                if phase == CrashPhase::Crashed {
                    let _ = self.events.send(CrashEvent::Crashed {
                        round_id,
                        crash_point: curve.current_multiplier(),
                        elapsed_ms,
                    });
                    break;
                }
                let _ = self.events.send(CrashEvent::Tick {
                    round_id,
                    multiplier: curve.current_multiplier(),
                    elapsed_ms,
                });
            }

            tokio::time::sleep(Duration::from_millis(self.config.crashed_ms)).await;
            curve.finish_round()?;
            completed += 1;
        }

        tracing::info!(completed, "Crash driver finished");
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn fixed(point: f64) -> impl Fn(&mut dyn RngCore) -> f64 + Send + Sync {
        move |_: &mut dyn RngCore| point
    }

    #[test]
    fn test_house_edge_distribution_bounds() {
        let dist = HouseEdgeDistribution { house_factor: 0.99, max: 100.0 };
        assert_eq!(dist.crash_point(0.0), 1.0);
        assert!((dist.crash_point(0.5) - 1.98).abs() < 1e-9);
        assert_eq!(dist.crash_point(0.999_999), 100.0);
        assert_eq!(dist.crash_point(-3.0), 1.0);
    }

    #[test]
    fn test_full_round_lifecycle() {
        let config = EngineConfig::default().crash;
        let mut curve = CrashCurve::with_distribution(&config, fixed(2.0));
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(curve.phase(), CrashPhase::Waiting);
        curve.start_round(&mut rng).unwrap();
        assert_eq!(curve.phase(), CrashPhase::Rolling);
        assert_eq!(curve.crash_point(), None);

        // exp(0.06 * 5) ~= 1.35
        assert_eq!(curve.advance(Duration::from_secs(5)).unwrap(), CrashPhase::Rolling);
        assert!((curve.current_multiplier() - (0.3f64).exp()).abs() < 1e-9);

        // exp(0.06 * 15) ~= 2.46 >= 2.0
        assert_eq!(curve.advance(Duration::from_secs(10)).unwrap(), CrashPhase::Crashed);
        assert_eq!(curve.current_multiplier(), 2.0);
        assert_eq!(curve.crash_point(), Some(2.0));

        curve.finish_round().unwrap();
        assert_eq!(curve.phase(), CrashPhase::Waiting);
        assert_eq!(curve.rounds_started(), 1);
    }

    #[test]
    fn test_illegal_transitions() {
        let config = EngineConfig::default().crash;
        let mut curve = CrashCurve::with_distribution(&config, fixed(3.0));
        let mut rng = StdRng::seed_from_u64(1);

        assert!(curve.advance(Duration::from_millis(100)).is_err());
        assert!(curve.finish_round().is_err());
        assert!(curve.cash_out(10.0).is_err());

        curve.start_round(&mut rng).unwrap();
        assert!(matches!(
            curve.start_round(&mut rng),
            Err(CrashError::InvalidTransition { .. })
        ));
        assert!(curve.finish_round().is_err());
    }

    #[test]
    fn test_cash_out_floors_payout() {
        let config = EngineConfig::default().crash;
        let mut curve = CrashCurve::with_distribution(&config, fixed(50.0));
        let mut rng = StdRng::seed_from_u64(1);
        curve.start_round(&mut rng).unwrap();
        curve.advance(Duration::from_secs(10)).unwrap();

        // exp(0.6) ~= 1.822
        assert_eq!(curve.cash_out(10.0).unwrap(), 18);
        assert_eq!(curve.cash_out(0.0), Err(CrashError::InvalidStake));
    }

    #[test]
    fn test_instant_crash_at_one() {
        let config = EngineConfig::default().crash;
        let mut curve = CrashCurve::with_distribution(&config, fixed(0.5));
        let mut rng = StdRng::seed_from_u64(1);
        curve.start_round(&mut rng).unwrap();
        assert_eq!(curve.advance(Duration::ZERO).unwrap(), CrashPhase::Crashed);
        assert_eq!(curve.crash_point(), Some(1.0));
    }

    #[tokio::test]
    async fn test_driver_broadcasts_rounds() {
        let config = EngineConfig::testing().crash;
        let driver = CrashRoundDriver::new(&config).with_seed(7);
        let mut events = driver.subscribe();

        let completed = driver.run_rounds(Some(2)).await.unwrap();
        assert_eq!(completed, 2);

        let mut started = 0;
        let mut crashed = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                CrashEvent::RoundStarted { .. } => started += 1,
                CrashEvent::Crashed { crash_point, .. } => {
                    assert!((1.0..=config.max_crash_point).contains(&crash_point));
                    crashed += 1;
                }
                CrashEvent::Tick { multiplier, .. } => assert!(multiplier >= 1.0),
            }
        }
        assert_eq!(started, 2);
        assert_eq!(crashed, 2);
    }

    #[tokio::test]
    async fn test_stopped_driver_plays_nothing() {
        let driver = CrashRoundDriver::new(&EngineConfig::testing().crash);
        driver.stop();
        assert_eq!(driver.run_rounds(None).await.unwrap(), 0);
    }
}
