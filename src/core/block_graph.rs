//! `BlockGraph` -- a blocking expressed as either a label vector (disjoint
//! groups) or an undirected graph (for AND/OR composition over rule trees).
//!
//! Mirroring the teacher's `Cluster::Index` enum (which tracks whether a
//! cluster's membership is stored as direct indices, an offset into a
//! reordered dataset, or is only reachable via traversal), we model the two
//! representations and their validity as a single state enum rather than two
//! booleans plus two `Option` fields. That makes "both caches stale"
//! unrepresentable.

use std::collections::HashSet;

use crate::core::label_algebra::{self, Label, LabelVector};

type Edge = (usize, usize);

#[derive(Debug, Clone)]
enum Cached {
    Labels(LabelVector),
    Graph(Vec<Edge>),
    Both(LabelVector, Vec<Edge>),
}

/// An undirected graph on `n` vertices, bijective (up to relabeling) with a
/// [`LabelVector`] of the same length: two vertices are connected iff they
/// share a label.
#[derive(Debug, Clone)]
pub struct BlockGraph {
    n: usize,
    cached: Cached,
}

impl BlockGraph {
    pub fn from_labels(labels: LabelVector) -> Self {
        let n = labels.len();
        BlockGraph {
            n,
            cached: Cached::Labels(labels),
        }
    }

    pub fn from_edges(n: usize, edges: Vec<Edge>) -> Self {
        BlockGraph {
            n,
            cached: Cached::Graph(edges),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the label view, rebuilding it from the graph view via
    /// connected components if it isn't already cached.
    pub fn labels(&mut self) -> &LabelVector {
        self.cached = match std::mem::replace(&mut self.cached, Cached::Labels(Vec::new())) {
            Cached::Labels(l) => Cached::Labels(l),
            Cached::Both(l, g) => Cached::Both(l, g),
            Cached::Graph(g) => {
                let l = label_algebra::connected_components(&g, self.n);
                Cached::Both(l, g)
            }
        };
        match &self.cached {
            Cached::Labels(l) | Cached::Both(l, _) => l,
            Cached::Graph(_) => unreachable!("just normalized to Labels or Both"),
        }
    }

    /// Returns the clique-graph view: every intra-group pair is an edge.
    /// Rebuilds it from the label view if it isn't already cached.
    pub fn clique_graph(&mut self) -> &[Edge] {
        self.cached = match std::mem::replace(&mut self.cached, Cached::Labels(Vec::new())) {
            Cached::Graph(g) => Cached::Graph(g),
            Cached::Both(l, g) => Cached::Both(l, g),
            Cached::Labels(l) => {
                let g = clique_edges(&l);
                Cached::Both(l, g)
            }
        };
        match &self.cached {
            Cached::Graph(g) | Cached::Both(_, g) => g,
            Cached::Labels(_) => unreachable!("just normalized to Graph or Both"),
        }
    }

    /// Consumes `self` into its label view.
    pub fn into_labels(mut self) -> LabelVector {
        self.labels();
        match self.cached {
            Cached::Labels(l) | Cached::Both(l, _) => l,
            Cached::Graph(_) => unreachable!(),
        }
    }
}

/// Builds a clique graph from a label vector: every pair sharing a (non-
/// negative) label is an edge. Used for `AND` at `level=graph` and whenever
/// a fully materialized intersection/union is requested.
fn clique_edges(labels: &[Label]) -> Vec<Edge> {
    label_algebra::labels_to_pairs(labels)
}

/// Builds a path graph from a label vector: members of a group are chained
/// in input order rather than fully connected. Asymptotically fewer edges
/// than [`clique_edges`] while preserving the same transitive closure --
/// used for `OR` at `level=groups`.
pub fn path_edges(labels: &[Label]) -> Vec<Edge> {
    use std::collections::HashMap;
    let mut groups: HashMap<Label, Vec<usize>> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label >= 0 {
            groups.entry(label).or_default().push(i);
        }
    }
    groups
        .into_values()
        .flat_map(|members| members.windows(2).map(|w| label_algebra::canonical_pair(w[0], w[1])).collect::<Vec<_>>())
        .collect()
}

/// Edge is present iff present in every input graph -- the graph-level
/// analogue of `AND` over rules.
pub fn intersection(graphs: &mut [BlockGraph]) -> BlockGraph {
    assert!(!graphs.is_empty(), "intersection requires at least one graph");
    let n = graphs[0].n();
    let sets: Vec<HashSet<Edge>> = graphs.iter_mut().map(|g| g.clique_graph().iter().copied().collect()).collect();
    let mut edges: HashSet<Edge> = sets[0].clone();
    for s in &sets[1..] {
        edges.retain(|e| s.contains(e));
    }
    BlockGraph::from_edges(n, edges.into_iter().collect())
}

/// Edge is present iff present in any input graph -- the graph-level
/// analogue of `OR` over rules.
pub fn union(graphs: &mut [BlockGraph]) -> BlockGraph {
    assert!(!graphs.is_empty(), "union requires at least one graph");
    let n = graphs[0].n();
    let mut edges: HashSet<Edge> = HashSet::new();
    for g in graphs.iter_mut() {
        edges.extend(g.clique_graph().iter().copied());
    }
    BlockGraph::from_edges(n, edges.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_then_graph_then_labels_round_trips_equivalence_classes() {
        let labels = vec![0, 0, 1, 2, 2];
        let mut g = BlockGraph::from_labels(labels.clone());
        let _ = g.clique_graph();
        let recomputed = g.labels();
        // Same equivalence classes, though label ids may be re-assigned.
        assert_eq!(recomputed[0], recomputed[1]);
        assert_eq!(recomputed[3] == recomputed[4], labels[3] == labels[4]);
        assert_ne!(recomputed[0], recomputed[2]);
    }

    #[test]
    fn path_graph_has_fewer_or_equal_edges_than_clique_graph() {
        let labels = vec![0, 0, 0, 0];
        let path = path_edges(&labels);
        let clique = clique_edges(&labels);
        assert!(path.len() <= clique.len());
        assert_eq!(path.len(), 3);
        assert_eq!(clique.len(), 6);
    }

    #[test]
    fn path_graph_preserves_transitive_closure_of_clique_graph() {
        let labels = vec![0, 0, 0, 0];
        let path = path_edges(&labels);
        let components = label_algebra::connected_components(&path, labels.len());
        assert!(components.iter().all(|&c| c == components[0]));
    }

    #[test]
    fn intersection_of_a_graph_with_itself_is_itself() {
        let labels = vec![0, 0, 1];
        let g1 = BlockGraph::from_labels(labels.clone());
        let g2 = BlockGraph::from_labels(labels.clone());
        let mut solo = BlockGraph::from_labels(labels);
        let mut inter = intersection(&mut [g1, g2]);
        assert_eq!(inter.labels(), solo.labels());
    }
}
