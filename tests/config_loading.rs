//! Integration tests for configuration files and statistics export.

use approx::assert_relative_eq;
use selftimed::{AnalysisStats, ConfigError, GraphConfig, ThroughputAnalyzer};
use tempfile::tempdir;

const PIPELINE: &str = r#"
analysis:
  max_steps: 100000

actors:
  - name: src
    durations: [1, 2]
    ports:
      - { name: out, direction: out, rates: [1, 1] }
      - { name: credit, direction: in, rates: [1, 1] }
  - name: sink
    durations: [1]
    ports:
      - { name: in, direction: in, rates: [2] }
      - { name: credit, direction: out, rates: [2] }

channels:
  - { src: src.out, dst: sink.in }
  - { src: sink.credit, dst: src.credit, initial_tokens: 2 }
"#;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_yaml_file_and_analyze() {
    let dir = tempdir().expect("test should be able to create a tempdir");
    let path = dir.path().join("pipeline.yaml");
    std::fs::write(&path, PIPELINE).unwrap();

    let config = GraphConfig::from_file(&path).unwrap();
    let graph = config.build_graph().unwrap();
    let report = ThroughputAnalyzer::new(config.analysis.clone())
        .analyze(&graph)
        .unwrap();

    // Phases of src overlap; sink waits for the slower one.
    assert_eq!(report.repetition_vector, vec![2, 1]);
    assert_relative_eq!(report.throughput, 1.0 / 3.0);
}

#[test]
fn test_bundled_demo_config() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/two_actor.yaml");
    let config = GraphConfig::from_file(path).unwrap();
    assert_eq!(config.analysis.log_level, "info");

    let graph = config.build_graph().unwrap();
    let report = ThroughputAnalyzer::new(config.analysis.clone())
        .analyze(&graph)
        .unwrap();
    assert_relative_eq!(report.throughput, 0.2);
}

#[test]
fn test_json_file_roundtrip() {
    let dir = tempdir().expect("test should be able to create a tempdir");
    let path = dir.path().join("pipeline.json");

    let config = GraphConfig::from_yaml(PIPELINE).unwrap();
    config.to_json_file(&path).unwrap();
    let restored = GraphConfig::from_file(&path).unwrap();

    assert_eq!(restored, config);
}

#[test]
fn test_yaml_file_roundtrip() {
    let dir = tempdir().expect("test should be able to create a tempdir");
    let path = dir.path().join("pipeline.yml");

    let config = GraphConfig::from_yaml(PIPELINE).unwrap();
    config.to_yaml_file(&path).unwrap();

    assert_eq!(GraphConfig::from_yaml_file(&path).unwrap(), config);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().expect("test should be able to create a tempdir");
    let result = GraphConfig::from_file(dir.path().join("absent.yaml"));

    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_inconsistent_rates_fail_at_analysis() {
    let yaml = PIPELINE.replace("rates: [2] }\n      - { name: credit", "rates: [3] }\n      - { name: credit");
    let graph = GraphConfig::from_yaml(&yaml).unwrap().build_graph().unwrap();

    assert!(ThroughputAnalyzer::default().analyze(&graph).is_err());
}

// ============================================================================
// Statistics Export
// ============================================================================

#[test]
fn test_stats_export_files() {
    let graph = GraphConfig::from_yaml(PIPELINE)
        .unwrap()
        .build_graph()
        .unwrap();
    let report = ThroughputAnalyzer::default().analyze(&graph).unwrap();
    let stats = AnalysisStats::from_report(&report).with_name("pipeline");

    assert_eq!(stats.metadata.actor_count, 2);
    assert_eq!(stats.metadata.channel_count, 2);
    assert_eq!(stats.components.len(), 1);
    assert_eq!(stats.components[0].outcome, "periodic");
    assert!(stats.total_firings() > 0);

    let dir = tempdir().expect("test should be able to create a tempdir");
    let json_path = dir.path().join("stats.json");
    let csv_path = dir.path().join("stats.csv");
    stats.to_json_file(&json_path).unwrap();
    stats.to_csv_file(&csv_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["metadata"]["name"], "pipeline");
    assert!(std::fs::read_to_string(&csv_path)
        .unwrap()
        .starts_with("metric,value\n"));
    assert!(stats.summary().contains("Component 0 (periodic)"));
}
