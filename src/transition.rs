//! Self-timed transition system.
//!
//! The [`TransitionSystem`] owns the live [`SimulationState`] of one graph
//! and advances it with four primitives:
//!
//! - **start**: consume the current phase's input rates and put a firing in
//!   flight with the phase's duration,
//! - **end**: produce the output rates of the phase the oldest firing started
//!   in, and retire it,
//! - **clock step**: move time forward to the next firing completion,
//! - **readiness tests** for start and end.
//!
//! [`TransitionSystem::run`] drives these in rounds (end everything that is
//! done, start everything that is enabled, advance the clock) and samples the
//! state every time the output actor completes a graph iteration. The first
//! sample that matches an earlier one closes the periodic regime.
//!
//! Firings of one actor complete in the order they started. Their remaining
//! times shrink uniformly, so only the oldest firing of each actor decides
//! the next clock step; a younger firing whose time has already run out
//! waits at zero until it reaches the front.

use tracing::{debug, trace};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::graph::Graph;
use crate::recurrence::{CycleSummary, RecurrenceStore, Sample};
use crate::state::SimulationState;
use crate::stats::ExplorationStats;
use crate::types::{ActorId, SimTime};

/// How the exploration of a graph ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exploration {
    /// A sampled state recurred; the cycle describes the periodic regime.
    Periodic(CycleSummary),
    /// Nothing is in flight and nothing can start.
    Deadlock,
}

/// The actor whose completed firings define sample points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputActor {
    pub actor: ActorId,
    /// Firings per graph iteration
    pub repetitions: u64,
}

impl OutputActor {
    /// Picks the actor with the smallest repetition count, lowest id first.
    pub fn select(repetitions: &[u64]) -> Option<Self> {
        repetitions
            .iter()
            .enumerate()
            .min_by_key(|&(id, &count)| (count, id))
            .map(|(actor, &count)| Self {
                actor,
                repetitions: count,
            })
    }
}

/// True if `order` names each of `actor_count` actors exactly once.
pub(crate) fn is_permutation(order: &[ActorId], actor_count: usize) -> bool {
    let mut seen = vec![false; actor_count];
    for &actor in order {
        match seen.get_mut(actor) {
            Some(flag) if !*flag => *flag = true,
            _ => return false,
        }
    }
    order.len() == actor_count
}

/// Self-timed execution of one graph.
pub struct TransitionSystem<'g> {
    graph: &'g Graph,
    state: SimulationState,
    store: RecurrenceStore,
    /// Actor visiting order within a round
    order: Vec<ActorId>,
    /// Ceiling on transitions before giving up
    max_steps: Option<u64>,
    steps: u64,
    stats: ExplorationStats,
}

impl<'g> TransitionSystem<'g> {
    /// Creates a transition system in the initial state of `graph`.
    ///
    /// Actors are visited in ascending id order.
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            state: SimulationState::initial(graph),
            store: RecurrenceStore::new(),
            order: (0..graph.actor_count()).collect(),
            max_steps: None,
            steps: 0,
            stats: ExplorationStats::default(),
        }
    }

    /// Sets the order in which actors are visited within a round.
    ///
    /// The order must be a permutation of all actor ids.
    pub fn with_firing_order(mut self, order: Vec<ActorId>) -> AnalysisResult<Self> {
        if !is_permutation(&order, self.graph.actor_count()) {
            return Err(AnalysisError::InvalidFiringOrder(order));
        }
        self.order = order;
        Ok(self)
    }

    /// Limits the number of transitions (starts, ends and clock advances).
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Returns the live state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Returns the sampled states collected so far.
    pub fn store(&self) -> &RecurrenceStore {
        &self.store
    }

    /// Returns the exploration statistics.
    pub fn stats(&self) -> &ExplorationStats {
        &self.stats
    }

    /// True if every input of `actor` holds enough tokens for its current phase.
    pub fn ready_to_start(&self, actor: ActorId) -> bool {
        let phase = self.state.seq_pos[actor];
        self.graph
            .actor(actor)
            .input_ports()
            .all(|p| self.state.tokens[p.channel] >= p.rate(phase))
    }

    /// Starts a firing of `actor` in its current phase.
    pub fn start_firing(&mut self, actor: ActorId) {
        debug_assert!(self.ready_to_start(actor));
        let desc = self.graph.actor(actor);
        let phase = self.state.seq_pos[actor];

        for port in desc.input_ports() {
            self.state.tokens[port.channel] -= port.rate(phase);
        }
        self.state.active_firings[actor].push_back(desc.duration(phase));
        self.state.seq_pos[actor] = (phase + 1) % desc.phase_count();

        self.stats.firings_started += 1;
        trace!(actor = %desc.name, phase, "start firing");
    }

    /// True if the oldest firing of `actor` has no time left.
    pub fn ready_to_end(&self, actor: ActorId) -> bool {
        self.state.active_firings[actor].front() == Some(&0)
    }

    /// Ends the oldest firing of `actor`, producing its output tokens.
    pub fn end_firing(&mut self, actor: ActorId) {
        debug_assert!(self.ready_to_end(actor));
        let desc = self.graph.actor(actor);
        let phases = desc.phase_count();
        let in_flight = self.state.active_firings[actor].len();
        // phase in which the oldest in-flight firing started
        let phase = (self.state.seq_pos[actor] + phases - in_flight % phases) % phases;

        for port in desc.output_ports() {
            self.state.tokens[port.channel] += port.rate(phase);
        }
        self.state.active_firings[actor].pop_front();

        self.stats.firings_ended += 1;
        trace!(actor = %desc.name, phase, "end firing");
    }

    /// Advances time to the next firing completion.
    ///
    /// Returns the step taken, or `None` if nothing is in flight. A step of
    /// zero means some firing is ready to end and time does not move.
    pub fn clock_step(&mut self) -> Option<SimTime> {
        let step = self
            .state
            .active_firings
            .iter()
            .filter_map(|firings| firings.front().copied())
            .min()?;

        if step > 0 {
            for remaining in self.state.active_firings.iter_mut().flatten() {
                *remaining = remaining.saturating_sub(step);
            }
            self.state.period_clock += step;
            self.stats.clock_advances += 1;
            self.stats.simulated_time += step;
        }
        Some(step)
    }

    /// Explores the execution until a sampled state recurs or the graph
    /// deadlocks.
    ///
    /// A sample is taken each time `output` completes `output.repetitions`
    /// firings, just before the completing firing ends.
    pub fn run(&mut self, output: OutputActor) -> AnalysisResult<Exploration> {
        let mut completed = 0u64;

        loop {
            self.stats.rounds += 1;

            for i in 0..self.order.len() {
                let actor = self.order[i];
                while self.ready_to_end(actor) {
                    if actor == output.actor {
                        completed += 1;
                        if completed == output.repetitions {
                            completed = 0;
                            if let Some(cycle) = self.sample() {
                                return Ok(Exploration::Periodic(cycle));
                            }
                        }
                    }
                    self.end_firing(actor);
                    self.count_step()?;
                }
            }

            for i in 0..self.order.len() {
                let actor = self.order[i];
                while self.ready_to_start(actor) {
                    self.start_firing(actor);
                    self.count_step()?;
                }
            }

            match self.clock_step() {
                None => {
                    debug!(
                        samples = self.store.len(),
                        time = self.stats.simulated_time,
                        "deadlock"
                    );
                    return Ok(Exploration::Deadlock);
                }
                Some(0) => {}
                Some(_) => self.count_step()?,
            }
        }
    }

    /// Records the current state; returns the cycle if it recurred.
    fn sample(&mut self) -> Option<CycleSummary> {
        let cycle = match self.store.insert_or_find(&self.state) {
            Sample::Recurred(start) => {
                let cycle = self.store.cycle(start);
                if let Some(cycle) = &cycle {
                    debug!(
                        tail = cycle.tail_len,
                        period = cycle.period_len,
                        elapsed = cycle.elapsed,
                        "state recurred"
                    );
                }
                cycle
            }
            Sample::Stored(index) => {
                trace!(index, clock = self.state.period_clock, "sampled state");
                None
            }
        };
        self.stats.sampled_states = self.store.len();
        if let Some(cycle) = cycle {
            self.stats.tail_len = cycle.tail_len;
            self.stats.period_len = cycle.period_len;
        }
        self.state.period_clock = 0;
        cycle
    }

    fn count_step(&mut self) -> AnalysisResult<()> {
        self.steps += 1;
        match self.max_steps {
            Some(limit) if self.steps > limit => Err(AnalysisError::StepLimitExceeded(limit)),
            _ => Ok(()),
        }
    }
}
