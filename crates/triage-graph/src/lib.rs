// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Obligation dependency graph for one compilation batch.
//!
//! Nodes are obligations (a type/trait/field requirement) held in an index
//! arena; an edge `source -> target` means satisfying `target` is necessary
//! to satisfy `source`. Building is purely additive and order-independent:
//! nodes are merged by normalized identity, edges deduplicate by
//! (source, target), and provenance lists accumulate rather than overwrite.

pub mod analysis;
pub mod dedup;

use std::collections::{BTreeSet, HashMap};

use triage_extract::{Extraction, Obligation};

/// Arena index of an obligation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// One obligation in the graph. Never mutated after the batch is built,
/// except that provenance and the top-level flag accumulate during build.
#[derive(Debug, Clone)]
pub struct ObligationNode {
    pub obligation: Obligation,
    /// True when this obligation is the user-facing end of some chain.
    pub top_level: bool,
    /// Indices of the batch records that mentioned this obligation.
    pub provenance: Vec<usize>,
}

/// The node/edge set for exactly one batch.
#[derive(Debug, Default)]
pub struct ObligationGraph {
    nodes: Vec<ObligationNode>,
    index: HashMap<String, NodeId>,
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl ObligationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ObligationNode {
        &self.nodes[id.0 as usize]
    }

    /// The normalized identity key of a node, used for all deterministic
    /// ordering so output does not depend on input line order.
    pub fn key(&self, id: NodeId) -> String {
        self.node(id).obligation.key()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    /// Nodes this node requires.
    pub fn out_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .range((id, NodeId(0))..=(id, NodeId(u32::MAX)))
            .map(|&(_, t)| t)
    }

    /// Nodes that require this node.
    pub fn in_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |&&(_, t)| t == id)
            .map(|&(s, _)| s)
    }

    pub fn has_out_edges(&self, id: NodeId) -> bool {
        self.out_neighbors(id).next().is_some()
    }

    /// Look up a node by obligation identity.
    pub fn find(&self, obligation: &Obligation) -> Option<NodeId> {
        self.index.get(&obligation.key()).copied()
    }

    /// Fold one record's extraction into the graph.
    ///
    /// Interns every obligation in the chain, marks the chain's user-facing
    /// end as top-level, and inserts one requires-edge per layer. Calling
    /// this with the same extractions in any order yields the same graph up
    /// to node numbering.
    pub fn insert_extraction(&mut self, extraction: &Extraction, record_ix: usize) {
        if extraction.chain.is_empty() {
            return;
        }

        let ids: Vec<NodeId> = extraction
            .chain
            .iter()
            .map(|o| self.intern(o, record_ix))
            .collect();

        // The last chain entry is the obligation the user actually wrote.
        if let Some(&last) = ids.last() {
            self.nodes[last.0 as usize].top_level = true;
        }

        for (source, target) in extraction.requires() {
            let (s, t) = (ids[source], ids[target]);
            if s != t {
                self.edges.insert((s, t));
            }
        }
    }

    fn intern(&mut self, obligation: &Obligation, record_ix: usize) -> NodeId {
        let key = obligation.key();
        if let Some(&id) = self.index.get(&key) {
            let node = &mut self.nodes[id.0 as usize];
            if !node.provenance.contains(&record_ix) {
                node.provenance.push(record_ix);
            }
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ObligationNode {
            obligation: obligation.clone(),
            top_level: false,
            provenance: vec![record_ix],
        });
        self.index.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_extract::{Obligation, ObligationKind};

    fn ob(subject: &str, capability: &str) -> Obligation {
        Obligation {
            kind: ObligationKind::TraitBound,
            subject: subject.to_string(),
            capability: capability.to_string(),
        }
    }

    fn chain_extraction(chain: Vec<Obligation>) -> Extraction {
        Extraction {
            chain,
            is_cgp: true,
            ..Extraction::default()
        }
    }

    #[test]
    fn nodes_merge_by_identity() {
        let mut graph = ObligationGraph::new();
        graph.insert_extraction(&chain_extraction(vec![ob("A", "X"), ob("B", "Y")]), 0);
        graph.insert_extraction(&chain_extraction(vec![ob("A", "X"), ob("C", "Z")]), 1);

        assert_eq!(graph.len(), 3);
        let shared = graph.find(&ob("A", "X")).unwrap();
        assert_eq!(graph.node(shared).provenance, vec![0, 1]);
    }

    #[test]
    fn edges_deduplicate() {
        let mut graph = ObligationGraph::new();
        let chain = vec![ob("A", "X"), ob("B", "Y")];
        graph.insert_extraction(&chain_extraction(chain.clone()), 0);
        graph.insert_extraction(&chain_extraction(chain), 1);

        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn top_level_is_chain_end() {
        let mut graph = ObligationGraph::new();
        graph.insert_extraction(
            &chain_extraction(vec![ob("A", "X"), ob("B", "Y"), ob("C", "Z")]),
            0,
        );
        let top = graph.find(&ob("C", "Z")).unwrap();
        let bottom = graph.find(&ob("A", "X")).unwrap();
        assert!(graph.node(top).top_level);
        assert!(!graph.node(bottom).top_level);
        assert!(!graph.has_out_edges(bottom));
        assert!(graph.has_out_edges(top));
    }
}
