//! Engines shared across concurrent callers
//!
//! The pattern's shuffle-and-pop sequence is not atomic, so a single engine
//! used from several threads sits behind a mutex (`SharedEngine`). When
//! sessions should not influence each other, `SessionEngines` keeps one
//! engine (and one queue) per session id.

use crate::config::EngineConfig;
use crate::errors::{EngineResult, PlayRejection};
use crate::games::engine::WinLossEngine;
use crate::games::types::{PlayRequest, PlayResult, WinLossStats};
use crate::metrics::PlayMetrics;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One engine, serialized behind a lock
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<WinLossEngine>>,
}

impl SharedEngine {
    pub fn new(engine: WinLossEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WinLossEngine> {
        // Every engine operation leaves the queue consistent, so a poisoned
        // lock is still safe to reuse
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn can_play(&self, stake: f64, balance: f64) -> bool {
        self.lock().can_play(stake, balance)
    }

    pub fn validate_stake_bounds(&self, stake: f64, game_type: &str) -> Result<(), PlayRejection> {
        self.lock().validate_stake_bounds(stake, game_type)
    }

    pub fn compute_result(
        &self,
        stake: f64,
        balance: f64,
        game_type: &str,
        base_multiplier: Option<f64>,
    ) -> PlayResult {
        self.lock().compute_result(stake, balance, game_type, base_multiplier)
    }

    pub fn play(&self, request: &PlayRequest) -> PlayResult {
        self.lock().play(request)
    }

    pub fn decide_outcome(&self) -> bool {
        self.lock().decide_outcome()
    }

    pub fn get_win_loss_stats(&self) -> WinLossStats {
        self.lock().get_win_loss_stats()
    }

    pub fn reset_pattern(&self) {
        self.lock().reset_pattern()
    }
}

/// Queue-per-session registry
pub struct SessionEngines {
    config: Arc<EngineConfig>,
    sessions: DashMap<String, WinLossEngine>,
    metrics: Option<PlayMetrics>,
}

impl SessionEngines {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            sessions: DashMap::new(),
            metrics: None,
        })
    }

    /// Attach metrics shared by every session engine created afterwards
    pub fn with_metrics(mut self, metrics: PlayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Play within a session, creating its engine on first use
    pub fn play(&self, session_id: &str, request: &PlayRequest) -> EngineResult<PlayResult> {
        if let Some(mut engine) = self.sessions.get_mut(session_id) {
            return Ok(engine.play(request));
        }

        let mut engine = self
            .sessions
            .entry(session_id.to_string())
            .or_try_insert_with(|| self.create_engine(session_id))?;
        Ok(engine.play(request))
    }

    pub fn stats(&self, session_id: &str) -> Option<WinLossStats> {
        self.sessions.get(session_id).map(|engine| engine.get_win_loss_stats())
    }

    /// Reshuffle one session's pattern; false if the session does not exist
    pub fn reset(&self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut engine) => {
                engine.reset_pattern();
                true
            }
            None => false,
        }
    }

    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::debug!(session_id, "Session engine dropped");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn create_engine(&self, session_id: &str) -> EngineResult<WinLossEngine> {
        tracing::debug!(session_id, "Creating session engine");
        let engine = WinLossEngine::new(&self.config)?;
        Ok(match &self.metrics {
            Some(metrics) => engine.with_metrics(metrics.clone()),
            None => engine,
        })
    }
}
