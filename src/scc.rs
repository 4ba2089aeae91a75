//! Strongly connected component decomposition.
//!
//! The state-space method needs a strongly connected graph: only then does
//! every actor's progress bound every other actor's. Other graphs are split
//! into their components, each of which is analyzed on its own as an
//! induced sub-graph with dense, relabeled identifiers.
//!
//! Relabeling is returned as an explicit [`IdMap`] next to the new graph, so
//! results computed on a component can be mapped back to the original ids.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use crate::graph::{Actor, Channel, Endpoint, Graph, Port};
use crate::types::{ActorId, ChannelId, PortId};

/// Bijection between the ids of an induced sub-graph and its parent graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdMap {
    /// Parent actor id of each sub-graph actor
    actors: Vec<ActorId>,
    /// Parent channel id of each sub-graph channel
    channels: Vec<ChannelId>,
    actor_index: HashMap<ActorId, ActorId>,
    channel_index: HashMap<ChannelId, ChannelId>,
}

impl IdMap {
    /// Returns the parent id of a sub-graph actor.
    pub fn original_actor(&self, local: ActorId) -> ActorId {
        self.actors[local]
    }

    /// Returns the parent id of a sub-graph channel.
    pub fn original_channel(&self, local: ChannelId) -> ChannelId {
        self.channels[local]
    }

    /// Returns the sub-graph id of a parent actor, if it belongs to the component.
    pub fn local_actor(&self, original: ActorId) -> Option<ActorId> {
        self.actor_index.get(&original).copied()
    }

    /// Returns the sub-graph id of a parent channel, if it lies inside the component.
    pub fn local_channel(&self, original: ChannelId) -> Option<ChannelId> {
        self.channel_index.get(&original).copied()
    }

    /// Parent ids of all actors, in sub-graph order.
    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    /// Parent ids of all channels, in sub-graph order.
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }
}

fn topology(graph: &Graph) -> DiGraph<ActorId, ChannelId> {
    let mut topo = DiGraph::with_capacity(graph.actor_count(), graph.channel_count());
    let nodes = graph
        .actors()
        .iter()
        .map(|a| topo.add_node(a.id))
        .collect::<Vec<_>>();
    for channel in graph.channels() {
        topo.add_edge(nodes[channel.src.actor], nodes[channel.dst.actor], channel.id);
    }
    topo
}

/// Returns the strongly connected components of a graph.
///
/// Each component lists its actors in ascending id order; components are
/// ordered by their lowest actor id.
pub fn components(graph: &Graph) -> Vec<Vec<ActorId>> {
    let topo = topology(graph);
    let mut sccs = tarjan_scc(&topo)
        .into_iter()
        .map(|scc| {
            let mut actors = scc.into_iter().map(|n| topo[n]).collect::<Vec<_>>();
            actors.sort_unstable();
            actors
        })
        .collect::<Vec<_>>();
    sccs.sort_unstable_by_key(|scc| scc[0]);
    sccs
}

/// Returns true if every actor can reach every other actor.
///
/// A graph with a single actor is strongly connected, with or without a
/// self-loop.
pub fn is_strongly_connected(graph: &Graph) -> bool {
    components(graph).len() <= 1
}

/// Builds the sub-graph induced by a set of actors.
///
/// Only channels with both endpoints inside the set are kept; ports bound to
/// other channels are dropped. Actors, ports and channels are renumbered
/// densely, preserving their relative order.
pub fn induced_subgraph(graph: &Graph, members: &[ActorId]) -> (Graph, IdMap) {
    let mut sorted = members.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let actor_index: HashMap<ActorId, ActorId> = sorted
        .iter()
        .enumerate()
        .map(|(local, &original)| (original, local))
        .collect();

    let inner = graph
        .channels()
        .iter()
        .filter(|c| actor_index.contains_key(&c.src.actor) && actor_index.contains_key(&c.dst.actor))
        .map(|c| c.id)
        .collect::<Vec<_>>();
    let channel_index: HashMap<ChannelId, ChannelId> = inner
        .iter()
        .enumerate()
        .map(|(local, &original)| (original, local))
        .collect();

    // (parent actor, parent port) -> local port
    let mut port_index: HashMap<(ActorId, PortId), PortId> = HashMap::new();
    let actors = sorted
        .iter()
        .enumerate()
        .map(|(local, &original)| {
            let source = graph.actor(original);
            let ports = source
                .ports
                .iter()
                .filter_map(|p| channel_index.get(&p.channel).map(|&ch| (p, ch)))
                .enumerate()
                .map(|(port_id, (p, channel))| {
                    port_index.insert((original, p.id), port_id);
                    Port {
                        id: port_id,
                        name: p.name.clone(),
                        direction: p.direction,
                        rates: p.rates.clone(),
                        channel,
                    }
                })
                .collect();
            Actor {
                id: local,
                name: source.name.clone(),
                durations: source.durations.clone(),
                ports,
            }
        })
        .collect::<Vec<_>>();

    let remap = |e: Endpoint| Endpoint {
        actor: actor_index[&e.actor],
        port: port_index[&(e.actor, e.port)],
    };
    let channels = inner
        .iter()
        .enumerate()
        .map(|(local, &original)| {
            let source = graph.channel(original);
            Channel {
                id: local,
                name: source.name.clone(),
                src: remap(source.src),
                dst: remap(source.dst),
                initial_tokens: source.initial_tokens,
            }
        })
        .collect();

    let ids = IdMap {
        actors: sorted,
        channels: inner,
        actor_index,
        channel_index,
    };
    (Graph::from_parts(actors, channels), ids)
}
