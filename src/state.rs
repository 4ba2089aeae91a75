//! The global simulation state of a self-timed execution.
//!
//! A [`SimulationState`] is a plain value: the transition system owns one live
//! instance and mutates it in place, while the recurrence store keeps clones
//! taken at sample points. Two states are equal when every field is equal,
//! which is exactly the comparison used to detect the periodic regime.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::types::{SimTime, TokenCount};

/// Snapshot of a self-timed execution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationState {
    /// Current phase of each actor, advanced when a firing starts
    pub seq_pos: Vec<usize>,
    /// Remaining execution time of each in-flight firing, oldest first
    pub active_firings: Vec<VecDeque<SimTime>>,
    /// Tokens held by each channel
    pub tokens: Vec<TokenCount>,
    /// Time elapsed since the previous sample point
    pub period_clock: SimTime,
}

impl SimulationState {
    /// Creates the initial state of a graph.
    ///
    /// Every actor starts in phase 0 with nothing in flight, every channel
    /// holds its initial tokens and the period clock is zero.
    pub fn initial(graph: &Graph) -> Self {
        Self {
            seq_pos: vec![0; graph.actor_count()],
            active_firings: vec![VecDeque::new(); graph.actor_count()],
            tokens: graph.channels().iter().map(|c| c.initial_tokens).collect(),
            period_clock: 0,
        }
    }

    /// Returns true if no actor has a firing in flight.
    pub fn is_idle(&self) -> bool {
        self.active_firings.iter().all(VecDeque::is_empty)
    }

    /// Total number of firings in flight across all actors.
    pub fn in_flight(&self) -> usize {
        self.active_firings.iter().map(VecDeque::len).sum()
    }
}
