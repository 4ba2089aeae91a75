//! Core type definitions for the throughput analysis.
//!
//! Identifiers are dense indices: actors, channels and ports are numbered
//! `0..n` in the order they were added to a graph, which lets the transition
//! system index its tables positionally.

/// Simulation time unit.
///
/// Execution durations, the period clock and every clock advance share this
/// representation. Integer time keeps the recurrence check exact.
pub type SimTime = u64;

/// Dense identifier of an actor within one graph.
pub type ActorId = usize;

/// Dense identifier of a channel within one graph.
pub type ChannelId = usize;

/// Identifier of a port, local to its owning actor.
pub type PortId = usize;

/// Number of tokens produced or consumed by one phase on one port.
pub type Rate = u64;

/// Number of tokens held by a channel.
pub type TokenCount = u64;
