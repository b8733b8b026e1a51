//! Shuffled win/loss queue
//!
//! Each generation holds exactly `wins` trues among `length` entries in
//! uniformly shuffled order. The queue is only refilled once it is empty, or
//! when a reshuffle is forced.

use crate::config::PatternConfig;
use crate::games::types::WinLossStats;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternState {
    Populated,
    Empty,
}

#[derive(Debug, Clone)]
pub struct WinLossPattern {
    queue: VecDeque<bool>,
    length: usize,
    wins: usize,
    generation: u64,
}

impl WinLossPattern {
    /// Starts `Empty`; the first draw fills it
    pub fn new(config: &PatternConfig) -> Self {
        Self {
            queue: VecDeque::with_capacity(config.cycle_length),
            length: config.cycle_length,
            wins: config.wins_per_cycle.min(config.cycle_length),
            generation: 0,
        }
    }

    pub fn state(&self) -> PatternState {
        if self.queue.is_empty() {
            PatternState::Empty
        } else {
            PatternState::Populated
        }
    }

    /// Number of refills so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pop the next queued outcome, refilling first if the queue is empty
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.queue.is_empty() {
            self.refill(rng);
        }
        // length > 0 is enforced by config validation
        self.queue.pop_front().unwrap_or(false)
    }

    /// Discard whatever is left and start a new generation now
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.refill(rng);
    }

    pub fn stats(&self) -> WinLossStats {
        let wins_remaining = self.queue.iter().filter(|won| **won).count();
        WinLossStats {
            wins_remaining,
            losses_remaining: self.queue.len() - wins_remaining,
            total_in_queue: self.queue.len(),
        }
    }

    fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut entries: Vec<bool> = (0..self.length).map(|i| i < self.wins).collect();
        // SliceRandom::shuffle is a Fisher-Yates shuffle
        entries.shuffle(rng);

        self.queue.clear();
        self.queue.extend(entries);
        self.generation += 1;

        tracing::trace!(generation = self.generation, pattern = ?self.queue, "Win/loss pattern refilled");
    }
}
