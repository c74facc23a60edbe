//! Stable topological sort shared by the scheduler and the transform
//! propagator.
//!
//! Nodes are plain indices `0..n`; an edge `(a, b)` means `a` must come
//! before `b`. Among nodes that are ready at the same time the smallest index
//! wins, so callers that number nodes in registration order get a
//! registration-order tie-break for free.
//!
//! The sort never fails. Nodes that cannot be ordered are split into
//! [`Toposort::cyclic`] (on a cycle, or wedged between two cycles) and
//! [`Toposort::downstream`] (only reachable from a cycle). Callers decide
//! whether that is fatal.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Result of [`toposort`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toposort {
    /// Every orderable node, dependencies first.
    pub order: Vec<usize>,
    /// Nodes on a cycle, ascending.
    pub cyclic: Vec<usize>,
    /// Nodes that depend on a cycle without being part of one, ascending.
    pub downstream: Vec<usize>,
}

impl Toposort {
    /// `true` when every node was ordered.
    pub fn is_complete(&self) -> bool {
        self.cyclic.is_empty() && self.downstream.is_empty()
    }
}

/// Kahn's algorithm with a min-heap ready set.
///
/// Edges referencing nodes `>= node_count` are ignored.
pub fn toposort(node_count: usize, edges: &[(usize, usize)]) -> Toposort {
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree = vec![0usize; node_count];
    for &(from, to) in edges {
        if from >= node_count || to >= node_count {
            continue;
        }
        out_edges[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..node_count)
        .filter(|&n| in_degree[n] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(node_count);
    let mut remaining = in_degree.clone();
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in &out_edges[node] {
            remaining[next] -= 1;
            if remaining[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() == node_count {
        return Toposort {
            order,
            ..Default::default()
        };
    }

    // Peel nodes with no outgoing edge back into the unresolved set: those
    // are tails hanging off a cycle. Whatever survives sits on a cycle.
    let mut unresolved: Vec<bool> = vec![false; node_count];
    for (node, &deg) in remaining.iter().enumerate() {
        unresolved[node] = deg > 0;
    }
    let mut out_degree: Vec<usize> = (0..node_count)
        .map(|n| {
            if unresolved[n] {
                out_edges[n].iter().filter(|&&m| unresolved[m]).count()
            } else {
                0
            }
        })
        .collect();
    let mut in_edges: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (from, targets) in out_edges.iter().enumerate() {
        for &to in targets {
            in_edges[to].push(from);
        }
    }

    let mut downstream = Vec::new();
    let mut stack: Vec<usize> = (0..node_count)
        .filter(|&n| unresolved[n] && out_degree[n] == 0)
        .collect();
    while let Some(node) = stack.pop() {
        if !unresolved[node] {
            continue;
        }
        unresolved[node] = false;
        downstream.push(node);
        for &pred in &in_edges[node] {
            if unresolved[pred] {
                out_degree[pred] -= 1;
                if out_degree[pred] == 0 {
                    stack.push(pred);
                }
            }
        }
    }

    let cyclic: Vec<usize> = (0..node_count).filter(|&n| unresolved[n]).collect();
    downstream.sort_unstable();

    Toposort {
        order,
        cyclic,
        downstream,
    }
}
