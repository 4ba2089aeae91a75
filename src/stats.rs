//! Statistics collection and export for throughput analyses.
//!
//! Each explored component records [`ExplorationStats`] while it runs; a
//! finished [`ThroughputReport`] can be turned into [`AnalysisStats`] and
//! exported as JSON, CSV or a human-readable summary.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::analysis::{ComponentOutcome, ThroughputReport};
use crate::types::{ActorId, SimTime};

/// Counters kept by one transition system run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationStats {
    /// Rounds of the end/start/advance loop
    pub rounds: u64,
    /// Firings started
    pub firings_started: u64,
    /// Firings ended
    pub firings_ended: u64,
    /// Non-zero clock advances
    pub clock_advances: u64,
    /// Total simulated time
    pub simulated_time: SimTime,
    /// Distinct sampled states stored
    pub sampled_states: usize,
    /// Sampled states before the periodic regime
    pub tail_len: usize,
    /// Sampled states in one period
    pub period_len: usize,
}

/// Metadata about the analyzed graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Analysis name/description
    pub name: String,
    /// Crate version that produced the numbers
    pub version: String,
    /// Number of actors in the graph
    pub actor_count: usize,
    /// Number of channels in the graph
    pub channel_count: usize,
}

/// Per-component statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComponentStats {
    /// Original ids of the component's actors
    pub actors: Vec<ActorId>,
    /// "periodic", "deadlock" or "skipped"
    pub outcome: String,
    /// Component iterations per time unit
    pub rate: f64,
    /// Whole-graph iterations per time unit
    pub scaled_rate: f64,
    /// Exploration counters
    pub exploration: ExplorationStats,
}

/// Timing statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    /// Total wall-clock time in milliseconds
    pub total_wall_time_ms: f64,
    /// Firings simulated per wall-clock second
    pub firings_per_second: f64,
    /// Sampled states stored per wall-clock second
    pub states_per_second: f64,
}

/// Aggregate statistics for an analysis run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Analysis metadata
    pub metadata: AnalysisMetadata,
    /// Whole-graph throughput
    pub throughput: f64,
    /// Per-component statistics
    pub components: Vec<ComponentStats>,
    /// Timing statistics
    pub timing: TimingStats,
}

impl AnalysisStats {
    /// Creates a new empty statistics container.
    pub fn new() -> Self {
        Self {
            metadata: AnalysisMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..AnalysisMetadata::default()
            },
            ..Self::default()
        }
    }

    /// Sets the analysis name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    /// Collects statistics from a finished analysis.
    pub fn from_report(report: &ThroughputReport) -> Self {
        let mut stats = Self::new();
        stats.metadata.actor_count = report.repetition_vector.len();
        stats.metadata.channel_count = report.channel_count;
        stats.throughput = report.throughput;
        stats.components = report
            .components
            .iter()
            .map(|c| ComponentStats {
                actors: c.actors.clone(),
                outcome: outcome_name(&c.outcome).to_string(),
                rate: c.rate,
                scaled_rate: c.scaled_rate,
                exploration: c.stats.clone(),
            })
            .collect();
        stats.compute_timing(report.wall_time_ms);
        stats
    }

    /// Updates timing statistics based on wall clock time.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        self.timing.total_wall_time_ms = wall_time_ms;

        if wall_time_ms > 0.0 {
            let seconds = wall_time_ms / 1000.0;
            self.timing.firings_per_second = self.total_firings() as f64 / seconds;
            self.timing.states_per_second = self.total_states() as f64 / seconds;
        }
    }

    /// Firings started across all components.
    pub fn total_firings(&self) -> u64 {
        self.components
            .iter()
            .map(|c| c.exploration.firings_started)
            .sum()
    }

    /// Sampled states stored across all components.
    pub fn total_states(&self) -> usize {
        self.components
            .iter()
            .map(|c| c.exploration.sampled_states)
            .sum()
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");
        csv.push_str(&format!("throughput,{}\n", self.throughput));
        csv.push_str(&format!("actor_count,{}\n", self.metadata.actor_count));
        csv.push_str(&format!("channel_count,{}\n", self.metadata.channel_count));
        csv.push_str(&format!("component_count,{}\n", self.components.len()));
        csv.push_str(&format!("total_firings,{}\n", self.total_firings()));
        csv.push_str(&format!("total_states,{}\n", self.total_states()));
        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.timing.total_wall_time_ms));
        csv.push_str(&format!("firings_per_second,{:.2}\n", self.timing.firings_per_second));

        csv
    }

    /// Exports per-component statistics to CSV.
    pub fn components_to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("component,actors,outcome,rate,scaled_rate,sampled_states,tail_len,period_len\n");
        for (index, c) in self.components.iter().enumerate() {
            let actors = c
                .actors
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                index,
                actors,
                c.outcome,
                c.rate,
                c.scaled_rate,
                c.exploration.sampled_states,
                c.exploration.tail_len,
                c.exploration.period_len,
            ));
        }

        csv
    }

    /// Exports summary statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Throughput Analysis ===")?;
        writeln!(w)?;

        if !self.metadata.name.is_empty() {
            writeln!(w, "Name: {}", self.metadata.name)?;
        }
        writeln!(w, "Actors: {}", self.metadata.actor_count)?;
        writeln!(w, "Channels: {}", self.metadata.channel_count)?;
        writeln!(w, "Throughput: {}", self.throughput)?;
        writeln!(w)?;

        writeln!(w, "--- Components ---")?;
        for (index, c) in self.components.iter().enumerate() {
            writeln!(w, "Component {} ({}): actors {:?}", index, c.outcome, c.actors)?;
            writeln!(w, "  Rate: {} (scaled {})", c.rate, c.scaled_rate)?;
            writeln!(
                w,
                "  States: {} (tail {}, period {})",
                c.exploration.sampled_states, c.exploration.tail_len, c.exploration.period_len
            )?;
            writeln!(
                w,
                "  Firings: {}, simulated time: {}",
                c.exploration.firings_started, c.exploration.simulated_time
            )?;
        }
        writeln!(w)?;

        writeln!(w, "--- Timing ---")?;
        writeln!(w, "Wall time: {:.2} ms", self.timing.total_wall_time_ms)?;
        writeln!(w, "Firings/sec: {:.2}", self.timing.firings_per_second)?;

        Ok(())
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn outcome_name(outcome: &ComponentOutcome) -> &'static str {
    match outcome {
        ComponentOutcome::Periodic(_) => "periodic",
        ComponentOutcome::Deadlock => "deadlock",
        ComponentOutcome::Skipped => "skipped",
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
