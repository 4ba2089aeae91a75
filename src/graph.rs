//! Cyclo-static dataflow graph model.
//!
//! A [`Graph`] is a set of actors connected by point-to-point channels.
//! Each actor cycles through a fixed sequence of phases; every phase has an
//! execution duration and, per port, a number of tokens consumed (input
//! ports) or produced (output ports).
//!
//! Graphs are immutable once built. They are assembled with a
//! [`GraphBuilder`], which checks that every port carries one rate per phase
//! and that every port is connected to exactly one channel.
//!
//! # Example
//!
//! ```
//! use selftimed::graph::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new();
//! let a = builder.add_actor("A", vec![2]);
//! let b = builder.add_actor("B", vec![3]);
//! builder.connect_actors(a, b, vec![1], vec![1], 0).unwrap();
//! builder.connect_actors(b, a, vec![1], vec![1], 1).unwrap();
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.actor_count(), 2);
//! assert_eq!(graph.channel_count(), 2);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ActorId, ChannelId, PortId, Rate, SimTime, TokenCount};

/// Errors raised while building or validating a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("Unknown actor name: {0}")]
    UnknownActorName(String),

    #[error("Actor '{actor}' has no port named '{port}'")]
    UnknownPort { actor: String, port: String },

    #[error("Duplicate actor name: {0}")]
    DuplicateActor(String),

    #[error("Duplicate port '{port}' on actor '{actor}'")]
    DuplicatePort { actor: String, port: String },

    #[error("Actor '{0}' has no phases")]
    NoPhases(String),

    #[error("Port '{port}' of actor '{actor}' has {rates} rates but the actor has {phases} phases")]
    PhaseMismatch {
        actor: String,
        port: String,
        rates: usize,
        phases: usize,
    },

    #[error("Port '{port}' of actor '{actor}' is not an {expected} port")]
    WrongDirection {
        actor: String,
        port: String,
        expected: PortDirection,
    },

    #[error("Port '{port}' of actor '{actor}' is already connected")]
    AlreadyConnected { actor: String, port: String },

    #[error("Port '{port}' of actor '{actor}' is not connected")]
    UnconnectedPort { actor: String, port: String },

    #[error("Inconsistent rates on channel '{0}': no repetition vector exists")]
    Inconsistent(String),

    #[error("Channel '{0}' moves no tokens over a full phase cycle")]
    ZeroRateChannel(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Direction of a port relative to its owning actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Consumes tokens from its channel.
    In,
    /// Produces tokens onto its channel.
    Out,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::In => write!(f, "input"),
            PortDirection::Out => write!(f, "output"),
        }
    }
}

/// A port of an actor, bound to a single channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Identifier, local to the owning actor
    pub id: PortId,
    /// Port name (unique within the actor)
    pub name: String,
    /// Input or output
    pub direction: PortDirection,
    /// Tokens consumed or produced, one entry per phase
    pub rates: Vec<Rate>,
    /// The channel this port is bound to
    pub channel: ChannelId,
}

impl Port {
    /// Returns the rate of this port in the given phase.
    #[inline]
    pub fn rate(&self, phase: usize) -> Rate {
        self.rates[phase]
    }

    /// Returns the total number of tokens moved over one full phase cycle.
    pub fn cycle_rate(&self) -> Rate {
        self.rates.iter().sum()
    }
}

/// An actor with its phase sequence and ports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Dense identifier
    pub id: ActorId,
    /// Actor name (unique within the graph)
    pub name: String,
    /// Execution duration of each phase
    pub durations: Vec<SimTime>,
    /// All ports, inputs and outputs
    pub ports: Vec<Port>,
}

impl Actor {
    /// Returns the length of the phase sequence.
    #[inline]
    pub fn phase_count(&self) -> usize {
        self.durations.len()
    }

    /// Returns the execution duration of the given phase.
    #[inline]
    pub fn duration(&self, phase: usize) -> SimTime {
        self.durations[phase]
    }

    /// Iterates over the input ports.
    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::In)
    }

    /// Iterates over the output ports.
    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Out)
    }

    /// Finds a port by name.
    pub fn port_by_name(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }
}

/// One end of a channel: an actor and one of its ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub actor: ActorId,
    pub port: PortId,
}

/// A point-to-point, unbounded FIFO channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Dense identifier
    pub id: ChannelId,
    /// Channel name
    pub name: String,
    /// Producing side
    pub src: Endpoint,
    /// Consuming side
    pub dst: Endpoint,
    /// Tokens present before the first firing
    pub initial_tokens: TokenCount,
}

impl Channel {
    /// Returns true if the channel connects an actor to itself.
    pub fn is_self_loop(&self) -> bool {
        self.src.actor == self.dst.actor
    }
}

/// An immutable, validated CSDF graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    actors: Vec<Actor>,
    channels: Vec<Channel>,
}

impl Graph {
    /// Returns the number of actors.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns all actors, ordered by id.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Returns all channels, ordered by id.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Returns an actor by id.
    ///
    /// # Panics
    /// Panics if `id` is out of range. Ids handed out by the builder are
    /// always valid for the graph it produced.
    #[inline]
    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id]
    }

    /// Returns a channel by id.
    #[inline]
    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id]
    }

    /// Finds an actor by name.
    pub fn actor_by_name(&self, name: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.name == name)
    }

    /// Returns the port at one end of a channel.
    pub fn endpoint_port(&self, endpoint: Endpoint) -> &Port {
        &self.actors[endpoint.actor].ports[endpoint.port]
    }

    /// Computes the repetition vector of the graph.
    ///
    /// See [`crate::repetition::repetition_vector`].
    pub fn repetition_vector(&self) -> GraphResult<Vec<u64>> {
        crate::repetition::repetition_vector(self)
    }

    /// Returns true if every actor can reach every other actor.
    pub fn is_strongly_connected(&self) -> bool {
        crate::scc::is_strongly_connected(self)
    }

    /// Splits the graph into its strongly connected components.
    pub fn decompose(&self) -> Vec<(Graph, crate::scc::IdMap)> {
        crate::scc::components(self)
            .iter()
            .map(|component| crate::scc::induced_subgraph(self, component))
            .collect()
    }

    pub(crate) fn from_parts(actors: Vec<Actor>, channels: Vec<Channel>) -> Self {
        Self { actors, channels }
    }
}

/// A port under construction; the channel is bound later by `connect`.
#[derive(Clone, Debug)]
struct PortDraft {
    name: String,
    direction: PortDirection,
    rates: Vec<Rate>,
    channel: Option<ChannelId>,
}

#[derive(Clone, Debug)]
struct ActorDraft {
    name: String,
    durations: Vec<SimTime>,
    ports: Vec<PortDraft>,
}

/// Incremental builder for [`Graph`].
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    actors: Vec<ActorDraft>,
    channels: Vec<Channel>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an actor with one execution duration per phase.
    pub fn add_actor(&mut self, name: impl Into<String>, durations: Vec<SimTime>) -> ActorId {
        let id = self.actors.len();
        self.actors.push(ActorDraft {
            name: name.into(),
            durations,
            ports: Vec::new(),
        });
        id
    }

    /// Adds a port to an actor.
    pub fn add_port(
        &mut self,
        actor: ActorId,
        name: impl Into<String>,
        direction: PortDirection,
        rates: Vec<Rate>,
    ) -> GraphResult<PortId> {
        let name = name.into();
        let draft = self
            .actors
            .get_mut(actor)
            .ok_or(GraphError::UnknownActor(actor))?;

        if draft.ports.iter().any(|p| p.name == name) {
            return Err(GraphError::DuplicatePort {
                actor: draft.name.clone(),
                port: name,
            });
        }
        if rates.len() != draft.durations.len() {
            return Err(GraphError::PhaseMismatch {
                actor: draft.name.clone(),
                port: name,
                rates: rates.len(),
                phases: draft.durations.len(),
            });
        }

        let id = draft.ports.len();
        draft.ports.push(PortDraft {
            name,
            direction,
            rates,
            channel: None,
        });
        Ok(id)
    }

    /// Connects an output port to an input port with a new channel.
    pub fn connect(
        &mut self,
        src: Endpoint,
        dst: Endpoint,
        initial_tokens: TokenCount,
    ) -> GraphResult<ChannelId> {
        self.check_free(src, PortDirection::Out)?;
        self.check_free(dst, PortDirection::In)?;

        let id = self.channels.len();
        let name = format!(
            "{}.{}->{}.{}",
            self.actors[src.actor].name,
            self.actors[src.actor].ports[src.port].name,
            self.actors[dst.actor].name,
            self.actors[dst.actor].ports[dst.port].name,
        );
        self.actors[src.actor].ports[src.port].channel = Some(id);
        self.actors[dst.actor].ports[dst.port].channel = Some(id);
        self.channels.push(Channel {
            id,
            name,
            src,
            dst,
            initial_tokens,
        });
        Ok(id)
    }

    /// Creates a fresh port pair and connects them.
    ///
    /// Port names are generated (`out0`, `in0`, ...). This is the shortest
    /// way to wire up a graph in code.
    pub fn connect_actors(
        &mut self,
        src: ActorId,
        dst: ActorId,
        production: Vec<Rate>,
        consumption: Vec<Rate>,
        initial_tokens: TokenCount,
    ) -> GraphResult<ChannelId> {
        let out_name = self.fresh_port_name(src, "out")?;
        let src_port = self.add_port(src, out_name, PortDirection::Out, production)?;
        let in_name = self.fresh_port_name(dst, "in")?;
        let dst_port = self.add_port(dst, in_name, PortDirection::In, consumption)?;
        self.connect(
            Endpoint {
                actor: src,
                port: src_port,
            },
            Endpoint {
                actor: dst,
                port: dst_port,
            },
            initial_tokens,
        )
    }

    /// Looks up an actor id by name.
    pub fn actor_id(&self, name: &str) -> GraphResult<ActorId> {
        self.actors
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| GraphError::UnknownActorName(name.to_string()))
    }

    /// Looks up a port id by actor id and port name.
    pub fn port_id(&self, actor: ActorId, name: &str) -> GraphResult<PortId> {
        let draft = self
            .actors
            .get(actor)
            .ok_or(GraphError::UnknownActor(actor))?;
        draft
            .ports
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| GraphError::UnknownPort {
                actor: draft.name.clone(),
                port: name.to_string(),
            })
    }

    /// Validates and builds the graph.
    pub fn build(self) -> GraphResult<Graph> {
        let mut names = std::collections::HashSet::new();
        let mut actors = Vec::with_capacity(self.actors.len());

        for (id, draft) in self.actors.into_iter().enumerate() {
            if !names.insert(draft.name.clone()) {
                return Err(GraphError::DuplicateActor(draft.name));
            }
            if draft.durations.is_empty() {
                return Err(GraphError::NoPhases(draft.name));
            }

            let mut ports = Vec::with_capacity(draft.ports.len());
            for (port_id, port) in draft.ports.into_iter().enumerate() {
                let channel = port.channel.ok_or_else(|| GraphError::UnconnectedPort {
                    actor: draft.name.clone(),
                    port: port.name.clone(),
                })?;
                ports.push(Port {
                    id: port_id,
                    name: port.name,
                    direction: port.direction,
                    rates: port.rates,
                    channel,
                });
            }

            actors.push(Actor {
                id,
                name: draft.name,
                durations: draft.durations,
                ports,
            });
        }

        Ok(Graph::from_parts(actors, self.channels))
    }

    fn check_free(&self, endpoint: Endpoint, expected: PortDirection) -> GraphResult<()> {
        let actor = self
            .actors
            .get(endpoint.actor)
            .ok_or(GraphError::UnknownActor(endpoint.actor))?;
        let port = actor
            .ports
            .get(endpoint.port)
            .ok_or_else(|| GraphError::UnknownPort {
                actor: actor.name.clone(),
                port: endpoint.port.to_string(),
            })?;

        if port.direction != expected {
            return Err(GraphError::WrongDirection {
                actor: actor.name.clone(),
                port: port.name.clone(),
                expected,
            });
        }
        if port.channel.is_some() {
            return Err(GraphError::AlreadyConnected {
                actor: actor.name.clone(),
                port: port.name.clone(),
            });
        }
        Ok(())
    }

    fn fresh_port_name(&self, actor: ActorId, prefix: &str) -> GraphResult<String> {
        let draft = self
            .actors
            .get(actor)
            .ok_or(GraphError::UnknownActor(actor))?;
        let taken = draft
            .ports
            .iter()
            .filter(|p| p.name.starts_with(prefix))
            .count();
        Ok(format!("{}{}", prefix, taken))
    }
}
