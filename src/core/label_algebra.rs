//! Pure functions over label vectors, pair lists, and clusters.
//!
//! A `LabelVector` is a `Vec<i64>` of length `N`: entry `i` names the group
//! of record `i`. This module never mutates its inputs and never touches the
//! `BlockGraph`/`BlockingRule` machinery -- it is the algebra those higher
//! layers are built on.

use std::collections::HashMap;

use crate::core::record::Record;
use crate::error::DedupError;

/// A group index. `-1` denotes noise / "not clustered".
pub type Label = i64;
pub type LabelVector = Vec<Label>;

/// An unordered pair of mention ids, stored canonically as `(min, max)`.
pub type LinkedPair = (usize, usize);

/// Builds a canonical [`LinkedPair`] from two mention ids.
///
/// # Panics
/// If `a == b`: a record can't be paired with itself.
pub fn canonical_pair(a: usize, b: usize) -> LinkedPair {
    assert_ne!(a, b, "a LinkedPair requires two distinct mentions");
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// `C(n, 2) = n * (n - 1) / 2`, computed in 64-bit integer arithmetic so
/// large blocks don't silently overflow into garbage counts.
pub fn n_choose_2(n: u64) -> u64 {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

/// Stable ordinal encoding of a column across a record batch.
///
/// Distinct non-missing values are assigned increasing labels in order of
/// first appearance (stable w.r.t. input order, not sorted). Missing values
/// (the attribute absent from the record) each get a label unique to that
/// record, drawn from `[N, 2N)`, so that two records both missing the column
/// never land in the same group -- "NaN never matches NaN".
pub fn factorize(records: &[Record], attribute: &str) -> LabelVector {
    let n = records.len();
    let mut seen: HashMap<String, Label> = HashMap::new();
    let mut next_label: Label = 0;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if record.contains(attribute) {
                let value = record.get_str(attribute);
                *seen.entry(value).or_insert_with(|| {
                    let label = next_label;
                    next_label += 1;
                    label
                })
            } else {
                (n as Label) + i as Label
            }
        })
        .collect()
}

/// Re-densifies a label vector into `[0, K)`, preserving the order in which
/// labels first appear. `-1` (noise) passes through unchanged.
pub fn densify(labels: &[Label]) -> LabelVector {
    let mut seen: HashMap<Label, Label> = HashMap::new();
    let mut next_label: Label = 0;
    labels
        .iter()
        .map(|&label| {
            if label < 0 {
                label
            } else {
                *seen.entry(label).or_insert_with(|| {
                    let l = next_label;
                    next_label += 1;
                    l
                })
            }
        })
        .collect()
}

/// All unordered in-cluster pairs of a label vector, in canonical
/// `(min, max)` form. Records labeled `-1` are excluded -- noise never
/// pairs with anything.
pub fn labels_to_pairs(labels: &[Label]) -> Vec<LinkedPair> {
    let mut groups: HashMap<Label, Vec<usize>> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label >= 0 {
            groups.entry(label).or_default().push(i);
        }
    }

    let mut pairs = Vec::new();
    for members in groups.values() {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                pairs.push(canonical_pair(members[i], members[j]));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// A minimal disjoint-set-union with path compression and union by rank,
/// used to turn a pair list back into connected components.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Computes a [`LabelVector`] of length `n` from a pair list via union-find.
///
/// If `drop_singletons` is true, mentions that never appear in `pairs`
/// receive label `-1` instead of a fresh singleton label.
pub fn pairs_to_labels(pairs: &[LinkedPair], n: usize, drop_singletons: bool) -> LabelVector {
    let mut dsu = UnionFind::new(n);
    for &(a, b) in pairs {
        dsu.union(a, b);
    }

    let mut in_a_pair = vec![false; n];
    for &(a, b) in pairs {
        in_a_pair[a] = true;
        in_a_pair[b] = true;
    }

    let roots: Vec<usize> = (0..n).map(|i| dsu.find(i)).collect();
    let mut label_of_root: HashMap<usize, Label> = HashMap::new();
    let mut next_label: Label = 0;

    roots
        .iter()
        .enumerate()
        .map(|(i, &root)| {
            if drop_singletons && !in_a_pair[i] {
                -1
            } else {
                *label_of_root.entry(root).or_insert_with(|| {
                    let l = next_label;
                    next_label += 1;
                    l
                })
            }
        })
        .collect()
}

/// Builds a [`LabelVector`] of length `n` from an explicit partition of
/// mention ids into clusters.
///
/// # Errors
/// Returns [`DedupError::DuplicateMembership`] if a mention id is present in
/// more than one cluster.
pub fn clusters_to_labels(
    clusters: &[Vec<usize>],
    n: usize,
    drop_singletons: bool,
) -> Result<LabelVector, DedupError> {
    let mut owner: Vec<Option<Label>> = vec![None; n];
    for (cluster_id, members) in clusters.iter().enumerate() {
        for &m in members {
            if let Some(existing) = owner[m] {
                return Err(DedupError::DuplicateMembership {
                    mention: m,
                    first: existing,
                    second: cluster_id as Label,
                });
            }
            owner[m] = Some(cluster_id as Label);
        }
    }

    Ok(owner
        .into_iter()
        .enumerate()
        .map(|(i, label)| match label {
            Some(l) => l,
            None if drop_singletons => -1,
            None => (clusters.len() + i) as Label,
        })
        .collect())
}

/// Connected components of an undirected graph on `n` vertices, given as an
/// edge list. Every vertex gets a label, including isolated ones (each forms
/// its own singleton component) -- this is the building block
/// [`crate::core::block_graph::BlockGraph`] uses to go from a graph view back
/// to a label view.
pub fn connected_components(edges: &[(usize, usize)], n: usize) -> LabelVector {
    let mut dsu = UnionFind::new(n);
    for &(a, b) in edges {
        dsu.union(a, b);
    }
    densify(&(0..n).map(|i| dsu.find(i) as Label).collect::<Vec<_>>())
}
