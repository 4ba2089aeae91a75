//! Configuration system for throughput analyses.
//!
//! Graphs and analysis parameters can be described declaratively in YAML or
//! JSON and turned into a [`Graph`].
//!
//! # Configuration File Structure
//!
//! ```yaml
//! analysis:
//!   max_steps: 1000000
//!   parallel: false
//!
//! actors:
//!   - name: A
//!     durations: [2]
//!     ports:
//!       - { name: out, direction: out, rates: [1] }
//!       - { name: in, direction: in, rates: [1] }
//!   - name: B
//!     durations: [3]
//!     ports:
//!       - { name: in, direction: in, rates: [1] }
//!       - { name: out, direction: out, rates: [1] }
//!
//! channels:
//!   - { src: A.out, dst: B.in }
//!   - { src: B.out, dst: A.in, initial_tokens: 1 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::graph::{Endpoint, Graph, GraphBuilder, GraphError, PortDirection};
use crate::types::{ActorId, Rate, SimTime, TokenCount};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parameters of a throughput analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Ceiling on transitions per explored component (None = unbounded)
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Order in which actors are visited within a round (None = by id)
    #[serde(default)]
    pub firing_order: Option<Vec<ActorId>>,

    /// Analyze independent components concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Worker threads for parallel analysis (0 = automatic)
    #[serde(default)]
    pub threads: usize,

    /// Logging level (trace, debug, info, warn, error), passed to
    /// [`crate::init_logging`]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            max_steps: None,
            firing_order: None,
            parallel: false,
            threads: 0,
            log_level: default_log_level(),
        }
    }
}

/// Configuration for a port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Port name, unique within its actor
    pub name: String,

    /// Input or output
    pub direction: PortDirection,

    /// Tokens moved per phase
    pub rates: Vec<Rate>,
}

/// Configuration for an actor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Actor name, unique within the graph
    pub name: String,

    /// Execution duration of each phase
    pub durations: Vec<SimTime>,

    /// Ports of the actor
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

/// Configuration for a channel.
///
/// Endpoints are written `actor.port`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Producing endpoint
    pub src: String,

    /// Consuming endpoint
    pub dst: String,

    /// Tokens present before the first firing
    #[serde(default)]
    pub initial_tokens: TokenCount,
}

/// Complete analysis configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Analysis parameters
    #[serde(default)]
    pub analysis: AnalysisParams,

    /// Actor definitions
    #[serde(default)]
    pub actors: Vec<ActorConfig>,

    /// Channel definitions
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn split_endpoint(endpoint: &str) -> ConfigResult<(&str, &str)> {
    endpoint
        .rsplit_once('.')
        .filter(|(actor, port)| !actor.is_empty() && !port.is_empty())
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "Malformed endpoint '{}', expected 'actor.port'",
                endpoint
            ))
        })
}

impl GraphConfig {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Describes an existing graph.
    pub fn from_graph(graph: &Graph) -> Self {
        let actors = graph
            .actors()
            .iter()
            .map(|a| ActorConfig {
                name: a.name.clone(),
                durations: a.durations.clone(),
                ports: a
                    .ports
                    .iter()
                    .map(|p| PortConfig {
                        name: p.name.clone(),
                        direction: p.direction,
                        rates: p.rates.clone(),
                    })
                    .collect(),
            })
            .collect();
        let endpoint = |e: Endpoint| {
            let actor = graph.actor(e.actor);
            format!("{}.{}", actor.name, actor.ports[e.port].name)
        };
        let channels = graph
            .channels()
            .iter()
            .map(|c| ChannelConfig {
                src: endpoint(c.src),
                dst: endpoint(c.dst),
                initial_tokens: c.initial_tokens,
            })
            .collect();

        Self {
            analysis: AnalysisParams::default(),
            actors,
            channels,
        }
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: GraphConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: GraphConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut ports: HashMap<&str, HashMap<&str, &PortConfig>> = HashMap::new();
        for actor in &self.actors {
            if actor.durations.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Actor {} has no phases",
                    actor.name
                )));
            }
            let mut names = HashMap::new();
            for port in &actor.ports {
                if port.rates.len() != actor.durations.len() {
                    return Err(ConfigError::Validation(format!(
                        "Port {}.{} has {} rates for {} phases",
                        actor.name,
                        port.name,
                        port.rates.len(),
                        actor.durations.len()
                    )));
                }
                if names.insert(port.name.as_str(), port).is_some() {
                    return Err(ConfigError::Validation(format!(
                        "Duplicate port: {}.{}",
                        actor.name, port.name
                    )));
                }
            }
            if ports.insert(actor.name.as_str(), names).is_some() {
                return Err(ConfigError::Validation(format!(
                    "Duplicate actor name: {}",
                    actor.name
                )));
            }
        }

        let mut bound = HashSet::new();
        for channel in &self.channels {
            for (endpoint, expected) in [
                (&channel.src, PortDirection::Out),
                (&channel.dst, PortDirection::In),
            ] {
                let (actor, port) = split_endpoint(endpoint)?;
                let config = ports
                    .get(actor)
                    .and_then(|p| p.get(port))
                    .ok_or_else(|| {
                        ConfigError::Validation(format!(
                            "Channel references non-existent port: {}",
                            endpoint
                        ))
                    })?;
                if config.direction != expected {
                    return Err(ConfigError::Validation(format!(
                        "Channel endpoint {} is not an {} port",
                        endpoint, expected
                    )));
                }
                if !bound.insert(endpoint.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "Port {} is connected more than once",
                        endpoint
                    )));
                }
            }
        }

        if let Some(order) = &self.analysis.firing_order {
            let mut sorted = order.clone();
            sorted.sort_unstable();
            if sorted != (0..self.actors.len()).collect::<Vec<_>>() {
                return Err(ConfigError::Validation(format!(
                    "Firing order {:?} is not a permutation of the actors",
                    order
                )));
            }
        }

        Ok(())
    }

    /// Builds the graph described by this configuration.
    pub fn build_graph(&self) -> ConfigResult<Graph> {
        let mut builder = GraphBuilder::new();
        for actor in &self.actors {
            let id = builder.add_actor(actor.name.clone(), actor.durations.clone());
            for port in &actor.ports {
                builder.add_port(id, port.name.clone(), port.direction, port.rates.clone())?;
            }
        }

        let resolve = |builder: &GraphBuilder, endpoint: &str| -> ConfigResult<Endpoint> {
            let (actor, port) = split_endpoint(endpoint)?;
            let actor = builder.actor_id(actor)?;
            let port = builder.port_id(actor, port)?;
            Ok(Endpoint { actor, port })
        };
        for channel in &self.channels {
            let src = resolve(&builder, &channel.src)?;
            let dst = resolve(&builder, &channel.dst)?;
            builder.connect(src, dst, channel.initial_tokens)?;
        }

        Ok(builder.build()?)
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the number of actors.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Finds an actor configuration by name.
    pub fn find_actor(&self, name: &str) -> Option<&ActorConfig> {
        self.actors.iter().find(|a| a.name == name)
    }
}

/// Builder for creating GraphConfig programmatically.
#[derive(Default)]
pub struct GraphConfigBuilder {
    config: GraphConfig,
}

impl GraphConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transition ceiling.
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.config.analysis.max_steps = Some(steps);
        self
    }

    /// Sets the actor visiting order.
    pub fn firing_order(mut self, order: Vec<ActorId>) -> Self {
        self.config.analysis.firing_order = Some(order);
        self
    }

    /// Enables parallel component analysis.
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.analysis.parallel = enable;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.analysis.log_level = level.into();
        self
    }

    /// Adds an actor without ports.
    pub fn add_actor(mut self, name: impl Into<String>, durations: Vec<SimTime>) -> Self {
        self.config.actors.push(ActorConfig {
            name: name.into(),
            durations,
            ports: Vec::new(),
        });
        self
    }

    /// Adds a port to the most recently added actor.
    pub fn with_port(
        mut self,
        name: impl Into<String>,
        direction: PortDirection,
        rates: Vec<Rate>,
    ) -> Self {
        if let Some(actor) = self.config.actors.last_mut() {
            actor.ports.push(PortConfig {
                name: name.into(),
                direction,
                rates,
            });
        }
        self
    }

    /// Adds a channel between two `actor.port` endpoints.
    pub fn add_channel(
        mut self,
        src: impl Into<String>,
        dst: impl Into<String>,
        initial_tokens: TokenCount,
    ) -> Self {
        self.config.channels.push(ChannelConfig {
            src: src.into(),
            dst: dst.into(),
            initial_tokens,
        });
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<GraphConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
