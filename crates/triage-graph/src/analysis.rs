// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Root cause classification.
//!
//! Per weakly-connected component, the root causes are the sink strongly-
//! connected components of the requires-relation: obligations with no
//! outgoing edge to another unsatisfied obligation. A multi-node sink SCC is
//! a genuine requirement cycle; it is merged into a single root anchored at
//! the lexicographically smallest subject and flagged so the renderer can
//! surface an explicit caveat. Components containing no top-level obligation
//! are extraction noise and are dropped, not reported.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::{NodeId, ObligationGraph};

/// A classified root cause.
#[derive(Debug, Clone)]
pub struct RootCause {
    /// The root obligation (cycle anchor, for a merged cycle).
    pub node: NodeId,
    /// Other members of a merged requirement cycle, identity-sorted.
    pub merged: Vec<NodeId>,
    /// Shortest dependency path from a top-level obligation down to the
    /// root, both ends inclusive.
    pub trace: Vec<NodeId>,
    pub cyclic: bool,
}

/// Partition the finished graph into root causes.
///
/// Deterministic: results are ordered by normalized node identity, never by
/// arena numbering, so any input line order yields the same report.
pub fn analyze(graph: &ObligationGraph) -> Vec<RootCause> {
    if graph.is_empty() {
        return Vec::new();
    }

    let components = weak_components(graph);
    let sccs = strongly_connected(graph);

    let mut roots: Vec<RootCause> = Vec::new();

    for members in components.values() {
        // Orphaned extraction noise: no user-facing obligation anywhere.
        if !members.iter().any(|&id| graph.node(id).top_level) {
            continue;
        }

        for root in sink_roots(graph, members, &sccs) {
            let trace = shortest_trace(graph, root.node, &root.merged);
            roots.push(RootCause { trace, ..root });
        }
    }

    roots.sort_by(|a, b| graph.key(a.node).cmp(&graph.key(b.node)));
    roots
}

// ============================================================================
// Weak components
// ============================================================================

/// Union-find over arena indices; returns component members keyed by the
/// smallest identity key in the component (stable under permutation).
fn weak_components(graph: &ObligationGraph) -> BTreeMap<String, Vec<NodeId>> {
    let n = graph.len();
    let mut parent: Vec<u32> = (0..n as u32).collect();

    fn find(parent: &mut [u32], x: u32) -> u32 {
        let mut root = x;
        while parent[root as usize] != root {
            root = parent[root as usize];
        }
        // Path compression
        let mut cur = x;
        while parent[cur as usize] != root {
            let next = parent[cur as usize];
            parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    for (s, t) in graph.edges() {
        let (rs, rt) = (find(&mut parent, s.0), find(&mut parent, t.0));
        if rs != rt {
            parent[rs as usize] = rt;
        }
    }

    let mut by_root: HashMap<u32, Vec<NodeId>> = HashMap::new();
    for id in graph.ids() {
        let root = find(&mut parent, id.0);
        by_root.entry(root).or_default().push(id);
    }

    by_root
        .into_values()
        .map(|mut members| {
            members.sort_by_key(|&id| graph.key(id));
            (graph.key(members[0]), members)
        })
        .collect()
}

// ============================================================================
// Strongly-connected components (Tarjan, iterative)
// ============================================================================

/// Maps each node to its SCC index; nodes sharing an index form a cycle
/// (or are a single node).
fn strongly_connected(graph: &ObligationGraph) -> Vec<usize> {
    let n = graph.len();
    let mut index_of = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut scc_of = vec![usize::MAX; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut next_index = 0usize;
    let mut scc_count = 0usize;

    // Iterative DFS frame: (node, neighbor cursor)
    for start in 0..n as u32 {
        if index_of[start as usize] != usize::MAX {
            continue;
        }
        let mut frames: Vec<(u32, Vec<u32>, usize)> = Vec::new();
        let neighbors: Vec<u32> = sorted_out(graph, NodeId(start));
        frames.push((start, neighbors, 0));
        index_of[start as usize] = next_index;
        low[start as usize] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start as usize] = true;

        while let Some((node, neighbors, cursor)) = frames.last_mut() {
            if let Some(&next) = neighbors.get(*cursor) {
                *cursor += 1;
                let node = *node;
                if index_of[next as usize] == usize::MAX {
                    index_of[next as usize] = next_index;
                    low[next as usize] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next as usize] = true;
                    let next_neighbors = sorted_out(graph, NodeId(next));
                    frames.push((next, next_neighbors, 0));
                } else if on_stack[next as usize] {
                    low[node as usize] = low[node as usize].min(index_of[next as usize]);
                }
            } else {
                let node = *node;
                if low[node as usize] == index_of[node as usize] {
                    // Pop one complete SCC
                    while let Some(popped) = stack.pop() {
                        on_stack[popped as usize] = false;
                        scc_of[popped as usize] = scc_count;
                        if popped == node {
                            break;
                        }
                    }
                    scc_count += 1;
                }
                frames.pop();
                if let Some((parent, _, _)) = frames.last() {
                    let parent = *parent as usize;
                    low[parent] = low[parent].min(low[node as usize]);
                }
            }
        }
    }

    scc_of
}

fn sorted_out(graph: &ObligationGraph, id: NodeId) -> Vec<u32> {
    let mut out: Vec<u32> = graph.out_neighbors(id).map(|n| n.0).collect();
    out.sort_unstable();
    out
}

// ============================================================================
// Sink classification
// ============================================================================

/// Sink SCCs of one weak component: no edge leaving the SCC.
fn sink_roots(graph: &ObligationGraph, members: &[NodeId], sccs: &[usize]) -> Vec<RootCause> {
    let mut groups: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    for &id in members {
        groups.entry(sccs[id.0 as usize]).or_default().push(id);
    }

    let mut roots = Vec::new();
    for (scc, group) in groups {
        let escapes = group.iter().any(|&id| {
            graph
                .out_neighbors(id)
                .any(|t| sccs[t.0 as usize] != scc)
        });
        if escapes {
            continue;
        }

        let cyclic = group.len() > 1;
        let mut sorted = group;
        sorted.sort_by_key(|&id| {
            // Anchor at the lexicographically smallest subject
            let node = graph.node(id);
            (node.obligation.subject.clone(), node.obligation.capability.clone())
        });
        let anchor = sorted[0];
        let merged = if cyclic { sorted[1..].to_vec() } else { Vec::new() };
        roots.push(RootCause {
            node: anchor,
            merged,
            trace: Vec::new(),
            cyclic,
        });
    }
    roots
}

// ============================================================================
// Trace
// ============================================================================

/// Shortest path from a top-level obligation down to the root, found by BFS
/// over reversed edges starting at the root. Ties break on identity key so
/// the trace is stable under input permutation.
fn shortest_trace(graph: &ObligationGraph, root: NodeId, merged: &[NodeId]) -> Vec<NodeId> {
    if graph.node(root).top_level {
        return vec![root];
    }

    let mut predecessor: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(root);
    predecessor.insert(root, root);
    // Cycle members count as visited so the trace walks out of the cycle.
    for &m in merged {
        predecessor.entry(m).or_insert(root);
        queue.push_back(m);
    }

    while let Some(current) = queue.pop_front() {
        let mut parents: Vec<NodeId> = graph.in_neighbors(current).collect();
        parents.sort_by_key(|&id| graph.key(id));

        for parent in parents {
            if predecessor.contains_key(&parent) {
                continue;
            }
            predecessor.insert(parent, current);

            if graph.node(parent).top_level {
                // Walk back down to the root
                let mut path = vec![parent];
                let mut cur = parent;
                while cur != root {
                    cur = predecessor[&cur];
                    path.push(cur);
                }
                return path;
            }
            queue.push_back(parent);
        }
    }

    // No top-level ancestor found (callers filter these components out,
    // but stay total): the root stands alone.
    vec![root]
}
