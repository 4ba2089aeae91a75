//! Throughput analysis of whole graphs.
//!
//! A strongly connected graph is explored directly by a
//! [`TransitionSystem`]. Any other graph is split into its strongly connected
//! components; each component with at least one channel is analyzed as an
//! induced sub-graph and its rate is rescaled to whole-graph iterations:
//!
//! ```text
//! scaled = rate * rep_component[first] / rep_graph[first]
//! ```
//!
//! where `first` is the component's lowest-id actor. The slowest component
//! bounds the graph, so the result is the minimum scaled rate.
//!
//! # Example
//!
//! ```
//! use selftimed::analysis::analyze_throughput;
//! use selftimed::graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! let a = builder.add_actor("A", vec![2]);
//! let b = builder.add_actor("B", vec![3]);
//! builder.connect_actors(a, b, vec![1], vec![1], 0).unwrap();
//! builder.connect_actors(b, a, vec![1], vec![1], 1).unwrap();
//! let graph = builder.build().unwrap();
//!
//! let throughput = analyze_throughput(&graph).unwrap();
//! assert!((throughput - 0.2).abs() < 1e-12);
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AnalysisParams;
use crate::graph::{Graph, GraphError};
use crate::parallel::ComponentExecutor;
use crate::recurrence::CycleSummary;
use crate::scc::IdMap;
use crate::stats::{ExplorationStats, Timer};
use crate::transition::{is_permutation, Exploration, OutputActor, TransitionSystem};
use crate::types::ActorId;

/// Errors that invalidate a throughput result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Periodic regime of {period_len} iterations takes no time")]
    ZeroPeriod { period_len: usize },

    #[error("Step limit of {0} transitions exceeded before a state recurred")]
    StepLimitExceeded(u64),

    #[error("Firing order {0:?} is not a permutation of the actors")]
    InvalidFiringOrder(Vec<ActorId>),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// How a component's analysis ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentOutcome {
    /// Reached a periodic regime.
    Periodic(CycleSummary),
    /// Stopped with nothing in flight and nothing enabled.
    Deadlock,
    /// No channels; imposes no bound.
    Skipped,
}

/// Analysis result of one strongly connected component.
#[derive(Clone, Debug, Serialize)]
pub struct ComponentReport {
    /// Original ids of the component's actors, ascending
    pub actors: Vec<ActorId>,
    pub outcome: ComponentOutcome,
    /// Component iterations per time unit
    pub rate: f64,
    /// Whole-graph iterations per time unit
    pub scaled_rate: f64,
    /// Original id of the actor whose firings defined sample points
    pub output_actor: Option<ActorId>,
    pub stats: ExplorationStats,
}

/// Result of a whole-graph analysis.
#[derive(Clone, Debug, Serialize)]
pub struct ThroughputReport {
    /// Whole-graph iterations per time unit
    pub throughput: f64,
    /// Firings per iteration of each actor
    pub repetition_vector: Vec<u64>,
    /// Channels in the analyzed graph
    pub channel_count: usize,
    /// One entry per strongly connected component, by lowest actor id
    pub components: Vec<ComponentReport>,
    /// Wall-clock duration of the analysis
    pub wall_time_ms: f64,
}

impl ThroughputReport {
    /// Firings of `actor` per time unit.
    pub fn actor_throughput(&self, actor: ActorId) -> f64 {
        self.throughput * self.repetition_vector[actor] as f64
    }

    /// True if the graph stops making progress.
    pub fn is_deadlocked(&self) -> bool {
        self.throughput == 0.0
    }

    /// The component that bounds the throughput, if any component does.
    pub fn bottleneck(&self) -> Option<&ComponentReport> {
        self.components
            .iter()
            .filter(|c| c.outcome != ComponentOutcome::Skipped)
            .min_by(|a, b| a.scaled_rate.total_cmp(&b.scaled_rate))
    }
}

/// Computes self-timed throughput with a given set of parameters.
#[derive(Clone, Debug, Default)]
pub struct ThroughputAnalyzer {
    params: AnalysisParams,
}

impl ThroughputAnalyzer {
    /// Creates an analyzer.
    pub fn new(params: AnalysisParams) -> Self {
        Self { params }
    }

    /// Returns the analysis parameters.
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Analyzes a graph.
    ///
    /// Deadlock is not an error: it yields a throughput of 0. A graph without
    /// channels is unconstrained and yields `f64::INFINITY`.
    pub fn analyze(&self, graph: &Graph) -> AnalysisResult<ThroughputReport> {
        let timer = Timer::start();

        if let Some(order) = &self.params.firing_order {
            if !is_permutation(order, graph.actor_count()) {
                return Err(AnalysisError::InvalidFiringOrder(order.clone()));
            }
        }
        let repetitions = graph.repetition_vector()?;

        let components = if graph.is_strongly_connected() {
            let actors = (0..graph.actor_count()).collect::<Vec<_>>();
            let mut report = self.analyze_component(graph, &actors)?;
            report.scaled_rate = report.rate;
            vec![report]
        } else {
            let parts = graph.decompose();
            debug!(components = parts.len(), "decomposed graph");
            let executor = ComponentExecutor::new()
                .with_parallel(self.params.parallel)
                .with_threads(self.params.threads);
            executor
                .map(&parts, |sub, ids| self.analyze_part(sub, ids, &repetitions))
                .into_iter()
                .collect::<AnalysisResult<Vec<_>>>()?
        };

        let throughput = components
            .iter()
            .map(|c| c.scaled_rate)
            .fold(f64::INFINITY, f64::min);
        let wall_time_ms = timer.elapsed_ms();

        info!(
            throughput,
            components = components.len(),
            wall_time_ms,
            "throughput analysis complete"
        );

        Ok(ThroughputReport {
            throughput,
            repetition_vector: repetitions,
            channel_count: graph.channel_count(),
            components,
            wall_time_ms,
        })
    }

    /// Analyzes one component sub-graph and rescales it to the parent.
    fn analyze_part(
        &self,
        sub: &Graph,
        ids: &IdMap,
        parent_repetitions: &[u64],
    ) -> AnalysisResult<ComponentReport> {
        let mut report = self.analyze_component(sub, ids.actors())?;
        report.output_actor = report.output_actor.map(|local| ids.original_actor(local));

        if report.outcome != ComponentOutcome::Skipped {
            let first = ids.original_actor(0);
            let local_reps = sub.repetition_vector()?;
            report.scaled_rate =
                report.rate * local_reps[0] as f64 / parent_repetitions[first] as f64;
            debug!(
                actors = ?report.actors,
                rate = report.rate,
                scaled = report.scaled_rate,
                "rescaled component"
            );
        }
        Ok(report)
    }

    /// Explores a strongly connected graph.
    ///
    /// `actors` holds the original ids of the graph's actors, in order.
    fn analyze_component(&self, graph: &Graph, actors: &[ActorId]) -> AnalysisResult<ComponentReport> {
        let mut report = ComponentReport {
            actors: actors.to_vec(),
            outcome: ComponentOutcome::Skipped,
            rate: f64::INFINITY,
            scaled_rate: f64::INFINITY,
            output_actor: None,
            stats: ExplorationStats::default(),
        };
        if graph.channel_count() == 0 {
            debug!(actors = ?actors, "component has no channels, skipping");
            return Ok(report);
        }

        let repetitions = graph.repetition_vector()?;
        let Some(output) = OutputActor::select(&repetitions) else {
            return Ok(report);
        };

        let mut system = TransitionSystem::new(graph).with_max_steps(self.params.max_steps);
        if let Some(order) = &self.params.firing_order {
            // keep the global order, restricted to this component
            let local = order
                .iter()
                .filter_map(|&a| actors.iter().position(|&m| m == a))
                .collect();
            system = system.with_firing_order(local)?;
        }

        let exploration = system.run(output)?;
        report.output_actor = Some(output.actor);
        report.stats = system.stats().clone();

        match exploration {
            Exploration::Periodic(cycle) => {
                let rate = cycle.throughput().ok_or(AnalysisError::ZeroPeriod {
                    period_len: cycle.period_len,
                })?;
                report.outcome = ComponentOutcome::Periodic(cycle);
                report.rate = rate;
            }
            Exploration::Deadlock => {
                warn!(actors = ?actors, "component deadlocks");
                report.outcome = ComponentOutcome::Deadlock;
                report.rate = 0.0;
            }
        }
        report.scaled_rate = report.rate;
        Ok(report)
    }
}

/// Computes the throughput of a graph with default parameters.
///
/// Returns graph iterations per time unit.
pub fn analyze_throughput(graph: &Graph) -> AnalysisResult<f64> {
    Ok(ThroughputAnalyzer::default().analyze(graph)?.throughput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use approx::assert_relative_eq;

    fn ring(durations: &[u64], tokens: u64) -> Graph {
        let mut builder = GraphBuilder::new();
        let ids = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| builder.add_actor(format!("R{}", i), vec![d]))
            .collect::<Vec<_>>();
        for i in 0..ids.len() {
            let next = ids[(i + 1) % ids.len()];
            let initial = if next == ids[0] { tokens } else { 0 };
            builder
                .connect_actors(ids[i], next, vec![1], vec![1], initial)
                .unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_strongly_connected_graph() {
        let report = ThroughputAnalyzer::default()
            .analyze(&ring(&[2, 3], 1))
            .unwrap();

        assert_relative_eq!(report.throughput, 0.2);
        assert_eq!(report.components.len(), 1);
        assert_eq!(report.components[0].actors, vec![0, 1]);
        assert_eq!(report.components[0].output_actor, Some(0));
        assert!(!report.is_deadlocked());
    }

    #[test]
    fn test_graph_without_channels_is_unconstrained() {
        let mut builder = GraphBuilder::new();
        builder.add_actor("A", vec![1]);
        builder.add_actor("B", vec![1]);
        let graph = builder.build().unwrap();

        let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
        assert!(report.throughput.is_infinite());
        assert!(report
            .components
            .iter()
            .all(|c| c.outcome == ComponentOutcome::Skipped));
        assert!(report.bottleneck().is_none());
    }

    #[test]
    fn test_rescaled_minimum() {
        // A(1) self-loop --2:1--> B(4) self-loop; q = [1, 2]
        let mut builder = GraphBuilder::new();
        let a = builder.add_actor("A", vec![1]);
        let b = builder.add_actor("B", vec![4]);
        builder.connect_actors(a, a, vec![1], vec![1], 1).unwrap();
        builder.connect_actors(a, b, vec![2], vec![1], 0).unwrap();
        builder.connect_actors(b, b, vec![1], vec![1], 1).unwrap();
        let graph = builder.build().unwrap();

        let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
        assert_eq!(report.repetition_vector, vec![1, 2]);
        assert_eq!(report.components.len(), 2);
        assert_relative_eq!(report.components[0].scaled_rate, 1.0);
        assert_relative_eq!(report.components[1].rate, 0.25);
        assert_relative_eq!(report.components[1].scaled_rate, 0.125);
        assert_relative_eq!(report.throughput, 0.125);
        assert_relative_eq!(report.actor_throughput(b), 0.25);
        assert_eq!(report.bottleneck().unwrap().actors, vec![1]);
        assert_eq!(report.components[1].output_actor, Some(1));
    }

    #[test]
    fn test_deadlock_component_gives_zero() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_actor("A", vec![1]);
        let b = builder.add_actor("B", vec![1]);
        builder.connect_actors(a, a, vec![1], vec![1], 1).unwrap();
        builder.connect_actors(a, b, vec![1], vec![1], 0).unwrap();
        builder.connect_actors(b, b, vec![1], vec![1], 0).unwrap();
        let graph = builder.build().unwrap();

        let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
        assert_eq!(report.throughput, 0.0);
        assert!(report.is_deadlocked());
        assert_eq!(report.components[1].outcome, ComponentOutcome::Deadlock);
    }

    #[test]
    fn test_zero_period() {
        let graph = ring(&[0, 0], 1);
        let result = analyze_throughput(&graph);

        assert!(matches!(result, Err(AnalysisError::ZeroPeriod { .. })));
    }

    #[test]
    fn test_invalid_global_firing_order() {
        let params = AnalysisParams {
            firing_order: Some(vec![0, 0]),
            ..AnalysisParams::default()
        };
        let result = ThroughputAnalyzer::new(params).analyze(&ring(&[1, 1], 1));

        assert_eq!(result.unwrap_err(), AnalysisError::InvalidFiringOrder(vec![0, 0]));
    }

    #[test]
    fn test_inconsistent_graph() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_actor("A", vec![1]);
        let b = builder.add_actor("B", vec![1]);
        builder.connect_actors(a, b, vec![2], vec![1], 0).unwrap();
        builder.connect_actors(b, a, vec![1], vec![1], 1).unwrap();
        let graph = builder.build().unwrap();

        assert!(matches!(
            analyze_throughput(&graph),
            Err(AnalysisError::Graph(GraphError::Inconsistent(_)))
        ));
    }
}
