//! Two-actor throughput example.
//!
//! Loads a producer/consumer loop from YAML, analyzes its self-timed
//! throughput and prints the statistics summary.
//!
//! Run with: `cargo run --example two_actor [path/to/graph.yaml]`

use selftimed::{AnalysisStats, GraphConfig, ThroughputAnalyzer};

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/two_actor.yaml");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let config = GraphConfig::from_file(&path)?;
    selftimed::init_logging(&config.analysis.log_level);

    let graph = config.build_graph()?;
    let report = ThroughputAnalyzer::new(config.analysis.clone()).analyze(&graph)?;

    let stats = AnalysisStats::from_report(&report).with_name("two_actor");
    println!("{}", stats.summary());

    for actor in graph.actors() {
        println!(
            "{}: {:.4} firings per time unit",
            actor.name,
            report.actor_throughput(actor.id)
        );
    }

    Ok(())
}
