//! # Selftimed
//!
//! Throughput analysis of cyclo-static dataflow (CSDF) graphs by self-timed
//! state-space exploration.
//!
//! ## Design Principles
//!
//! - **Graph-Driven**: A [`Graph`] of actors and channels is the single
//!   description of the system. Actors cycle through phases, each with its
//!   own duration and token rates.
//! - **Self-Timed Execution**: Every actor fires as soon as its input tokens
//!   are available, with unbounded auto-concurrency.
//! - **Recurrence Detection**: Execution is deterministic, so the first
//!   repeated sampled state closes the periodic regime, from which the
//!   throughput is read off exactly.
//! - **Component Decomposition**: Graphs that are not strongly connected are
//!   split into components, analyzed independently, and the slowest one
//!   bounds the whole graph.
//!
//! ## Features
//!
//! - `parallel` - Analyze independent components concurrently using rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use selftimed::{GraphBuilder, ThroughputAnalyzer, AnalysisParams};
//!
//! let mut builder = GraphBuilder::new();
//! let a = builder.add_actor("A", vec![2]);
//! let b = builder.add_actor("B", vec![3]);
//! builder.connect_actors(a, b, vec![1], vec![1], 0).unwrap();
//! builder.connect_actors(b, a, vec![1], vec![1], 1).unwrap();
//! let graph = builder.build().unwrap();
//!
//! let report = ThroughputAnalyzer::new(AnalysisParams::default())
//!     .analyze(&graph)
//!     .unwrap();
//! println!("Throughput: {} iterations per time unit", report.throughput);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use selftimed::config::GraphConfig;
//!
//! let config = GraphConfig::from_yaml_file("graph.yaml")?;
//! selftimed::init_logging(&config.analysis.log_level);
//! let graph = config.build_graph()?;
//! let report = ThroughputAnalyzer::new(config.analysis).analyze(&graph)?;
//! ```

pub mod types;
pub mod graph;
pub mod repetition;
pub mod scc;
pub mod state;
pub mod recurrence;
pub mod transition;
pub mod analysis;
pub mod parallel;
pub mod config;
pub mod stats;

// Re-export commonly used types
pub use types::{ActorId, ChannelId, PortId, Rate, SimTime, TokenCount};
pub use graph::{Actor, Channel, Endpoint, Graph, GraphBuilder, GraphError, Port, PortDirection};
pub use scc::IdMap;
pub use state::SimulationState;
pub use recurrence::{CycleSummary, RecurrenceStore};
pub use transition::{Exploration, OutputActor, TransitionSystem};
pub use analysis::{
    analyze_throughput, AnalysisError, ComponentOutcome, ComponentReport, ThroughputAnalyzer,
    ThroughputReport,
};
pub use parallel::ComponentExecutor;
pub use config::{AnalysisParams, ConfigError, GraphConfig, GraphConfigBuilder};
pub use stats::{AnalysisStats, ExplorationStats, Timer};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging.
///
/// # Example
///
/// ```rust,ignore
/// selftimed::init_logging("debug");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
