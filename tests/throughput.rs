//! Integration tests for self-timed throughput analysis.
//!
//! These tests verify end-to-end analysis scenarios including:
//! - Closed-form throughputs of small strongly connected graphs
//! - Deadlock, zero-time periods and the step limit
//! - Determinism and independence from the firing order

use approx::assert_relative_eq;
use selftimed::recurrence::RecurrenceStore;
use selftimed::state::SimulationState;
use selftimed::transition::{Exploration, OutputActor, TransitionSystem};
use selftimed::{
    analyze_throughput, AnalysisError, AnalysisParams, ComponentOutcome, Graph, GraphBuilder,
    GraphError, ThroughputAnalyzer,
};
use std::collections::VecDeque;

// ============================================================================
// Test Graphs
// ============================================================================

/// A single actor feeding itself through one channel.
fn self_loop(duration: u64, tokens: u64) -> Graph {
    let mut builder = GraphBuilder::new();
    let a = builder.add_actor("A", vec![duration]);
    builder.connect_actors(a, a, vec![1], vec![1], tokens).unwrap();
    builder.build().unwrap()
}

/// Single-rate ring; the closing channel into the first actor holds `tokens`.
fn ring(durations: &[u64], tokens: u64) -> Graph {
    let mut builder = GraphBuilder::new();
    let ids: Vec<_> = durations
        .iter()
        .enumerate()
        .map(|(i, &d)| builder.add_actor(format!("R{}", i), vec![d]))
        .collect();
    for i in 0..ids.len() {
        let next = (i + 1) % ids.len();
        let initial = if next == 0 { tokens } else { 0 };
        builder
            .connect_actors(ids[i], ids[next], vec![1], vec![1], initial)
            .unwrap();
    }
    builder.build().unwrap()
}

/// A two-phase producer and a one-phase consumer in a loop.
///
/// A fires twice per iteration producing one token each time, B consumes
/// both in one firing and returns them.
fn csdf_pair() -> Graph {
    let mut builder = GraphBuilder::new();
    let a = builder.add_actor("A", vec![1, 1]);
    let b = builder.add_actor("B", vec![1]);
    builder.connect_actors(a, b, vec![1, 1], vec![2], 0).unwrap();
    builder.connect_actors(b, a, vec![2], vec![1, 1], 2).unwrap();
    builder.build().unwrap()
}

fn analyze_with_order(graph: &Graph, order: Vec<usize>) -> f64 {
    let params = AnalysisParams {
        firing_order: Some(order),
        ..AnalysisParams::default()
    };
    ThroughputAnalyzer::new(params)
        .analyze(graph)
        .unwrap()
        .throughput
}

// ============================================================================
// Closed-Form Throughputs
// ============================================================================

#[test]
fn test_self_loop_throughput() {
    for d in [1, 2, 7] {
        let throughput = analyze_throughput(&self_loop(d, 1)).unwrap();
        assert_relative_eq!(throughput, 1.0 / d as f64);
    }
}

#[test]
fn test_self_loop_auto_concurrency() {
    // Three tokens let three firings overlap.
    let throughput = analyze_throughput(&self_loop(4, 3)).unwrap();
    assert_relative_eq!(throughput, 0.75);
}

#[test]
fn test_two_actor_cycle() {
    let throughput = analyze_throughput(&ring(&[2, 3], 1)).unwrap();
    assert_relative_eq!(throughput, 0.2);
}

#[test]
fn test_ring_single_token() {
    let throughput = analyze_throughput(&ring(&[2, 3, 4], 1)).unwrap();
    assert_relative_eq!(throughput, 1.0 / 9.0);
}

#[test]
fn test_csdf_phases() {
    let mut builder = GraphBuilder::new();
    let a = builder.add_actor("A", vec![1, 2]);
    builder.connect_actors(a, a, vec![1, 1], vec![1, 1], 1).unwrap();
    let graph = builder.build().unwrap();

    let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
    assert_eq!(report.repetition_vector, vec![2]);
    assert_relative_eq!(report.throughput, 1.0 / 3.0);
    assert_relative_eq!(report.actor_throughput(0), 2.0 / 3.0);
}

#[test]
fn test_long_phase_completes_before_short_successor() {
    // The second firing runs out of time first but completes with the first.
    let mut builder = GraphBuilder::new();
    let a = builder.add_actor("A", vec![5, 1]);
    builder.connect_actors(a, a, vec![1, 1], vec![1, 1], 2).unwrap();
    let graph = builder.build().unwrap();

    let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
    assert_eq!(report.repetition_vector, vec![2]);
    assert_relative_eq!(report.throughput, 0.2);
    assert_relative_eq!(report.actor_throughput(0), 0.4);
}

#[test]
fn test_csdf_pair() {
    let report = ThroughputAnalyzer::default().analyze(&csdf_pair()).unwrap();

    assert_eq!(report.repetition_vector, vec![2, 1]);
    assert_eq!(report.components[0].output_actor, Some(1));
    assert_relative_eq!(report.throughput, 0.5);
    assert_relative_eq!(report.actor_throughput(0), 1.0);
    assert_relative_eq!(report.actor_throughput(1), 0.5);
}

// ============================================================================
// Termination Outcomes
// ============================================================================

#[test]
fn test_deadlock_yields_zero() {
    let report = ThroughputAnalyzer::default()
        .analyze(&ring(&[1, 1, 1], 0))
        .unwrap();

    assert_eq!(report.throughput, 0.0);
    assert!(report.is_deadlocked());
    assert_eq!(report.components[0].outcome, ComponentOutcome::Deadlock);
}

#[test]
fn test_zero_duration_cycle() {
    let result = analyze_throughput(&self_loop(0, 1));
    assert!(matches!(
        result,
        Err(AnalysisError::ZeroPeriod { period_len: 1 })
    ));
}

#[test]
fn test_zero_rate_channel_is_rejected_before_exploration() {
    let mut builder = GraphBuilder::new();
    let a = builder.add_actor("A", vec![1]);
    builder.connect_actors(a, a, vec![0], vec![0], 0).unwrap();
    let graph = builder.build().unwrap();

    assert!(matches!(
        analyze_throughput(&graph),
        Err(AnalysisError::Graph(GraphError::ZeroRateChannel(_)))
    ));
}

#[test]
fn test_step_limit_exceeded() {
    let params = AnalysisParams {
        max_steps: Some(3),
        ..AnalysisParams::default()
    };
    let result = ThroughputAnalyzer::new(params).analyze(&ring(&[2, 3, 4], 1));

    assert_eq!(result.unwrap_err(), AnalysisError::StepLimitExceeded(3));
}

#[test]
fn test_generous_step_limit_is_not_hit() {
    let params = AnalysisParams {
        max_steps: Some(10_000),
        ..AnalysisParams::default()
    };
    let report = ThroughputAnalyzer::new(params)
        .analyze(&ring(&[2, 3, 4], 1))
        .unwrap();

    assert_relative_eq!(report.throughput, 1.0 / 9.0);
}

// ============================================================================
// Determinism and Order Independence
// ============================================================================

#[test]
fn test_repeated_runs_are_identical() {
    let graph = ring(&[3, 1, 2], 2);
    let output = OutputActor::select(&graph.repetition_vector().unwrap()).unwrap();

    let mut first = TransitionSystem::new(&graph);
    let mut second = TransitionSystem::new(&graph);
    let a = first.run(output).unwrap();
    let b = second.run(output).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.stats(), second.stats());
    assert!(first.store().iter().eq(second.store().iter()));
}

#[test]
fn test_firing_order_independence() {
    let graph = ring(&[2, 3, 4], 2);
    let reference = analyze_throughput(&graph).unwrap();

    for order in [
        vec![0, 1, 2],
        vec![0, 2, 1],
        vec![1, 0, 2],
        vec![1, 2, 0],
        vec![2, 0, 1],
        vec![2, 1, 0],
    ] {
        assert_relative_eq!(analyze_with_order(&graph, order), reference);
    }
}

#[test]
fn test_csdf_order_independence() {
    let graph = csdf_pair();
    assert_relative_eq!(analyze_with_order(&graph, vec![1, 0]), 0.5);
}

// ============================================================================
// Recurrence Store and Extraction
// ============================================================================

#[test]
fn test_cycle_extraction_from_store() {
    let sample = |tokens: u64, clock: u64| SimulationState {
        seq_pos: vec![0, 0],
        active_firings: vec![VecDeque::new(), VecDeque::from(vec![1])],
        tokens: vec![tokens, 0],
        period_clock: clock,
    };

    let mut store = RecurrenceStore::new();
    for (tokens, clock) in [(0, 4), (1, 2), (2, 3), (3, 5), (4, 1)] {
        store.append(sample(tokens, clock));
    }
    let k = store.find(&sample(2, 3)).unwrap();
    let cycle = store.cycle(k).unwrap();

    assert_eq!(cycle.tail_len, 2);
    assert_eq!(cycle.period_len, 3);
    assert_eq!(cycle.elapsed, 9);
    assert_relative_eq!(cycle.throughput().unwrap(), 3.0 / 9.0);
    assert!(store.cycle(store.len()).is_none());
}

#[test]
fn test_exploration_summary_matches_store() {
    let graph = ring(&[2, 3], 1);
    let mut system = TransitionSystem::new(&graph);

    let Exploration::Periodic(cycle) = system.run(OutputActor::select(&[1, 1]).unwrap()).unwrap()
    else {
        panic!("Expected periodic regime");
    };
    assert_eq!(cycle.tail_len + cycle.period_len, system.store().len());
    assert_eq!(system.stats().sampled_states, system.store().len());
}
