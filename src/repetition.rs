//! Repetition vector computation.
//!
//! The repetition vector gives, per actor, how many times it fires in one
//! graph iteration: the smallest positive schedule after which every channel
//! holds its initial token count again.
//!
//! For a CSDF actor a firing executes one phase, so an iteration must run
//! every actor through a whole number of phase cycles. The balance equations
//! are solved over phase cycles:
//!
//! ```text
//! cycles[src] * Σ production(src) = cycles[dst] * Σ consumption(dst)
//! ```
//!
//! and the result is reported in firings, `cycles[a] * phase_count(a)`.
//! Each weakly connected part of the graph is normalized independently.

use num::integer::{gcd, lcm};
use num::rational::Ratio;
use num::Zero;
use tracing::debug;

use crate::graph::{Graph, GraphError, GraphResult};
use crate::types::ActorId;

/// Computes the repetition vector, in firings per actor.
///
/// Fails with [`GraphError::Inconsistent`] if the rates admit no non-trivial
/// periodic schedule, and with [`GraphError::ZeroRateChannel`] if a channel
/// moves no tokens per cycle on either side. Such a channel never blocks its
/// consumer, which could then start firings without bound.
pub fn repetition_vector(graph: &Graph) -> GraphResult<Vec<u64>> {
    let cycles = cycle_counts(graph)?;
    let firings = cycles
        .iter()
        .zip(graph.actors())
        .map(|(&c, actor)| c * actor.phase_count() as u64)
        .collect::<Vec<_>>();

    debug!(repetitions = ?firings, "computed repetition vector");
    Ok(firings)
}

/// Solves the balance equations for whole phase cycles per actor.
fn cycle_counts(graph: &Graph) -> GraphResult<Vec<u64>> {
    let n = graph.actor_count();
    let mut fraction: Vec<Option<Ratio<u64>>> = vec![None; n];

    // Adjacency over both directions: (neighbor, own cycle rate, neighbor cycle rate, channel)
    let mut adjacent: Vec<Vec<(ActorId, u64, u64, usize)>> = vec![Vec::new(); n];
    for channel in graph.channels() {
        let produced = graph.endpoint_port(channel.src).cycle_rate();
        let consumed = graph.endpoint_port(channel.dst).cycle_rate();
        if produced == 0 && consumed == 0 {
            return Err(GraphError::ZeroRateChannel(channel.name.clone()));
        }
        if produced == 0 || consumed == 0 {
            return Err(GraphError::Inconsistent(channel.name.clone()));
        }
        adjacent[channel.src.actor].push((channel.dst.actor, produced, consumed, channel.id));
        adjacent[channel.dst.actor].push((channel.src.actor, consumed, produced, channel.id));
    }

    let mut result = vec![0u64; n];
    for root in 0..n {
        if fraction[root].is_some() {
            continue;
        }

        // Propagate rational cycle counts over one weakly connected part.
        let mut part = vec![root];
        let mut stack = vec![root];
        fraction[root] = Some(Ratio::from_integer(1));
        while let Some(actor) = stack.pop() {
            let own = fraction[actor].unwrap_or_else(Ratio::zero);
            for &(next, own_rate, next_rate, channel) in &adjacent[actor] {
                // own * own_rate == next * next_rate
                let expected = own * Ratio::new(own_rate, next_rate);
                match fraction[next] {
                    Some(existing) if existing != expected => {
                        return Err(GraphError::Inconsistent(
                            graph.channel(channel).name.clone(),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        fraction[next] = Some(expected);
                        part.push(next);
                        stack.push(next);
                    }
                }
            }
        }

        // Scale to the smallest positive integers.
        let denominators = part
            .iter()
            .filter_map(|&a| fraction[a].map(|f| *f.denom()))
            .fold(1u64, lcm);
        let scaled = part
            .iter()
            .map(|&a| {
                fraction[a]
                    .map(|f| (f * denominators).to_integer())
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();
        let divisor = scaled.iter().copied().fold(0u64, gcd).max(1);
        for (&actor, &value) in part.iter().zip(&scaled) {
            result[actor] = value / divisor;
        }
    }

    Ok(result)
}
