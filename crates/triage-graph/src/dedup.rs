// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cascade deduplication.
//!
//! Diagnostics attributable to the same root cause are clustered.
//! The fingerprint is (root identity, primary span file:line): identical
//! fingerprints fold into one entry with a preserved duplicate count; the
//! same root at a different call site stays a distinct entry under the same
//! heading, because the user may need to fix every call site.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::analysis::RootCause;
use crate::{NodeId, ObligationGraph};

/// Primary source location of one record, as reported on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordSite {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// One call site under a root cause.
#[derive(Debug, Clone)]
pub struct CascadeSite {
    pub site: Option<RecordSite>,
    /// Batch indices of the records folded here, smallest site first.
    pub records: Vec<usize>,
    /// How many exact duplicates were folded away (records - 1).
    pub folded: usize,
}

/// All records attributable to one root cause.
#[derive(Debug, Clone)]
pub struct Cascade {
    pub root: NodeId,
    pub sites: Vec<CascadeSite>,
}

impl Cascade {
    /// Total duplicates folded across every site of this cascade.
    pub fn total_folded(&self) -> usize {
        self.sites.iter().map(|s| s.folded).sum()
    }
}

/// Attribution input: one recognized record's deepest obligation node and
/// its primary location.
#[derive(Debug, Clone)]
pub struct RecordAnchor {
    pub record_ix: usize,
    pub deepest: NodeId,
    pub site: Option<RecordSite>,
}

/// Cluster records under the root causes their failures trace to.
///
/// A record is attributed to every root reachable from its deepest
/// obligation along requires-edges (almost always exactly one). Cascades
/// come back in the same order as `roots`.
pub fn deduplicate(
    graph: &ObligationGraph,
    roots: &[RootCause],
    anchors: &[RecordAnchor],
) -> Vec<Cascade> {
    let mut cascades: Vec<Cascade> = roots
        .iter()
        .map(|r| Cascade {
            root: r.node,
            sites: Vec::new(),
        })
        .collect();

    // file:line fingerprint buckets per root, ordered for determinism
    let mut buckets: Vec<BTreeMap<Option<RecordSite>, Vec<usize>>> =
        vec![BTreeMap::new(); roots.len()];

    for anchor in anchors {
        for root_ix in attributed_roots(graph, roots, anchor.deepest) {
            // Fingerprint folds on file+line; column is display-only
            let fingerprint = anchor.site.as_ref().map(|s| RecordSite {
                file: s.file.clone(),
                line: s.line,
                column: 0,
            });
            let bucket = buckets[root_ix].entry(fingerprint).or_default();
            if !bucket.contains(&anchor.record_ix) {
                bucket.push(anchor.record_ix);
            }
        }
    }

    for (root_ix, bucket) in buckets.into_iter().enumerate() {
        for (_, records) in bucket {
            // Representative site is the smallest (file, line, column) among
            // the folded records, never a batch position: output must not
            // depend on input line order.
            let mut keyed: Vec<(Option<RecordSite>, usize)> = records
                .iter()
                .map(|&ix| {
                    let site = anchors
                        .iter()
                        .find(|a| a.record_ix == ix)
                        .and_then(|a| a.site.clone());
                    (site, ix)
                })
                .collect();
            keyed.sort();
            let site = keyed.first().and_then(|(s, _)| s.clone());
            let records: Vec<usize> = keyed.into_iter().map(|(_, ix)| ix).collect();
            cascades[root_ix].sites.push(CascadeSite {
                site,
                folded: records.len().saturating_sub(1),
                records,
            });
        }
    }

    cascades
}

/// Indices into `roots` of every root reachable from `from`.
fn attributed_roots(graph: &ObligationGraph, roots: &[RootCause], from: NodeId) -> Vec<usize> {
    let mut reachable: HashSet<NodeId> = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(from);
    reachable.insert(from);
    while let Some(current) = queue.pop_front() {
        for next in graph.out_neighbors(current) {
            if reachable.insert(next) {
                queue.push_back(next);
            }
        }
    }

    roots
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            reachable.contains(&r.node) || r.merged.iter().any(|m| reachable.contains(m))
        })
        .map(|(ix, _)| ix)
        .collect()
}
