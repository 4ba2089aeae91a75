//! Recurrence detection over sampled states.
//!
//! The transition system is deterministic, so once a sampled state repeats,
//! the whole trajectory after it repeats as well. The [`RecurrenceStore`]
//! keeps every distinct sampled state in sampling order; the first time a
//! sample matches an earlier entry, the entries from that match to the end
//! of the store form exactly one period of the execution.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::state::SimulationState;
use crate::types::SimTime;

/// The periodic regime found by the recurrence check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Number of sampled states before the period starts
    pub tail_len: usize,
    /// Number of sampled states (graph iterations) in one period
    pub period_len: usize,
    /// Time spanned by one period
    pub elapsed: SimTime,
}

impl CycleSummary {
    /// Graph iterations per time unit, or `None` if the period takes no time.
    pub fn throughput(&self) -> Option<f64> {
        if self.elapsed == 0 {
            None
        } else {
            Some(self.period_len as f64 / self.elapsed as f64)
        }
    }
}

/// Outcome of sampling a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sample {
    /// The state is new and was stored at this index.
    Stored(usize),
    /// The state equals the entry at this index; exploration is complete.
    Recurred(usize),
}

/// Append-only, insertion-ordered set of sampled states.
#[derive(Clone, Debug, Default)]
pub struct RecurrenceStore {
    states: IndexSet<SimulationState>,
}

impl RecurrenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if nothing has been sampled yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Stores a state and returns its index.
    ///
    /// If an equal state is already present, its index is returned and the
    /// store is left unchanged.
    pub fn append(&mut self, state: SimulationState) -> usize {
        self.states.insert_full(state).0
    }

    /// Returns the index of an equal stored state.
    pub fn find(&self, state: &SimulationState) -> Option<usize> {
        self.states.get_index_of(state)
    }

    /// Samples a state: stores it unless it recurs.
    pub fn insert_or_find(&mut self, state: &SimulationState) -> Sample {
        match self.find(state) {
            Some(index) => Sample::Recurred(index),
            None => Sample::Stored(self.append(state.clone())),
        }
    }

    /// Returns the stored state at an index.
    pub fn get(&self, index: usize) -> Option<&SimulationState> {
        self.states.get_index(index)
    }

    /// Iterates over the stored states in sampling order.
    pub fn iter(&self) -> impl Iterator<Item = &SimulationState> {
        self.states.iter()
    }

    /// Summarizes the cycle closed by a recurrence at index `start`.
    ///
    /// Every sampled state carries the time elapsed since the previous
    /// sample, so the period's duration is the sum of the period clocks of
    /// `entries[start..]`. Returns `None` if `start` is not a stored index.
    pub fn cycle(&self, start: usize) -> Option<CycleSummary> {
        if start >= self.len() {
            return None;
        }
        let elapsed = self
            .states
            .iter()
            .skip(start)
            .map(|s| s.period_clock)
            .sum();
        Some(CycleSummary {
            tail_len: start,
            period_len: self.len() - start,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn state(tokens: u64, clock: SimTime) -> SimulationState {
        SimulationState {
            seq_pos: vec![0],
            active_firings: vec![VecDeque::from(vec![0])],
            tokens: vec![tokens],
            period_clock: clock,
        }
    }

    #[test]
    fn test_append_and_find() {
        let mut store = RecurrenceStore::new();
        assert!(store.is_empty());

        assert_eq!(store.append(state(1, 3)), 0);
        assert_eq!(store.append(state(2, 3)), 1);
        assert_eq!(store.len(), 2);

        assert_eq!(store.find(&state(2, 3)), Some(1));
        assert_eq!(store.find(&state(2, 4)), None);
    }

    #[test]
    fn test_append_duplicate_keeps_store() {
        let mut store = RecurrenceStore::new();
        store.append(state(1, 3));
        store.append(state(2, 3));

        assert_eq!(store.append(state(1, 3)), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sample_detects_recurrence() {
        let mut store = RecurrenceStore::new();

        assert_eq!(store.insert_or_find(&state(5, 1)), Sample::Stored(0));
        assert_eq!(store.insert_or_find(&state(1, 2)), Sample::Stored(1));
        assert_eq!(store.insert_or_find(&state(2, 3)), Sample::Stored(2));
        assert_eq!(store.insert_or_find(&state(1, 2)), Sample::Recurred(1));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_cycle_summary() {
        let mut store = RecurrenceStore::new();
        store.append(state(9, 7)); // tail
        store.append(state(1, 2));
        store.append(state(2, 3));
        store.append(state(3, 5));

        let cycle = store.cycle(1).unwrap();
        assert_eq!(cycle.tail_len, 1);
        assert_eq!(cycle.period_len, 3);
        assert_eq!(cycle.elapsed, 10);
        assert_eq!(cycle.throughput(), Some(0.3));
    }

    #[test]
    fn test_cycle_out_of_range() {
        let mut store = RecurrenceStore::new();
        assert_eq!(store.cycle(0), None);

        store.append(state(1, 2));
        assert!(store.cycle(0).is_some());
        assert_eq!(store.cycle(1), None);
    }

    #[test]
    fn test_zero_period_has_no_throughput() {
        let mut store = RecurrenceStore::new();
        store.append(state(1, 0));

        let cycle = store.cycle(0).unwrap();
        assert_eq!(cycle.elapsed, 0);
        assert_eq!(cycle.throughput(), None);
    }
}
