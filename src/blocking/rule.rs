//! `BlockingRule` -- a tree of composable rules that produces a label
//! vector (equivalently, a [`BlockGraph`]) for a dataset.
//!
//! Leaves factorize a single (optionally encoded) column. Internal nodes
//! compose their children's equivalence relations with `And` (meet), `Or`
//! (join), or `ExceptK` (an `Or` over every `(n-k)`-sized `And`ed subset of
//! children). The `RuleLevel` on an internal node picks between computing
//! the composition over label vectors (cheap, recommended) or over fully
//! materialized clique graphs.

use std::sync::Arc;

use itertools::Itertools;

use crate::core::block_graph::{self, BlockGraph};
use crate::core::label_algebra::{self, LabelVector};
use crate::core::record::Record;
use crate::error::ConfigError;

/// A pure `string -> string` normalizer applied to a column's values before
/// factorization. The engine treats encoders as opaque; it does not know or
/// care what algorithm backs one (phonetic, date, geohash, ...).
pub type Encoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Whether an `And`/`Or` node composes its children over label vectors or
/// over fully materialized graphs. `Groups` is the default and is
/// recommended: it never materializes the `O(n^2)` clique edges that
/// `Graph` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLevel {
    Groups,
    Graph,
}

impl Default for RuleLevel {
    fn default() -> Self {
        RuleLevel::Groups
    }
}

enum Node {
    /// Every record in one block -- the degenerate baseline used when no
    /// blocking is configured at all.
    Cartesian,
    Leaf {
        column: String,
        encoder: Option<Encoder>,
    },
    And(Vec<BlockingRule>, RuleLevel),
    Or(Vec<BlockingRule>, RuleLevel),
    ExceptK {
        children: Vec<BlockingRule>,
        k: usize,
        level: RuleLevel,
    },
}

/// A blocking rule. Call [`BlockingRule::fit`] once against a record batch
/// before calling [`BlockingRule::labels`] or [`BlockingRule::graph`].
pub struct BlockingRule {
    node: Node,
    fitted: Option<BlockGraph>,
}

impl BlockingRule {
    /// The `CartesianBlocking` baseline: puts every record into a single
    /// block, i.e. no blocking at all.
    pub fn cartesian() -> Self {
        BlockingRule {
            node: Node::Cartesian,
            fitted: None,
        }
    }

    /// A leaf rule that factorizes `column` directly, with no encoder.
    pub fn column(column: impl Into<String>) -> Self {
        BlockingRule {
            node: Node::Leaf {
                column: column.into(),
                encoder: None,
            },
            fitted: None,
        }
    }

    /// A leaf rule that applies `encoder` to `column`'s values before
    /// factorizing.
    pub fn encoded_column(column: impl Into<String>, encoder: Encoder) -> Self {
        BlockingRule {
            node: Node::Leaf {
                column: column.into(),
                encoder: Some(encoder),
            },
            fitted: None,
        }
    }

    pub fn and(children: Vec<BlockingRule>, level: RuleLevel) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::MissingBlockingSpec);
        }
        Ok(BlockingRule {
            node: Node::And(children, level),
            fitted: None,
        })
    }

    pub fn or(children: Vec<BlockingRule>, level: RuleLevel) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::MissingBlockingSpec);
        }
        Ok(BlockingRule {
            node: Node::Or(children, level),
            fitted: None,
        })
    }

    /// `k` is the number of children to *exclude* from each And-ed subset;
    /// every `(n-k)`-sized subset of `children` is AND-ed, and the resulting
    /// subsets are OR-ed together.
    pub fn combinations_except_k(children: Vec<BlockingRule>, k: usize, level: RuleLevel) -> Result<Self, ConfigError> {
        if children.is_empty() || k >= children.len() {
            return Err(ConfigError::MissingBlockingSpec);
        }
        Ok(BlockingRule {
            node: Node::ExceptK { children, k, level },
            fitted: None,
        })
    }

    /// An implicit `And` of bare-column leaves -- the shape produced by the
    /// engine's `blocking_attributes` configuration option.
    pub fn from_attributes(attributes: &[String]) -> Result<Self, ConfigError> {
        if attributes.is_empty() {
            return Err(ConfigError::MissingBlockingSpec);
        }
        if attributes.len() == 1 {
            return Ok(BlockingRule::column(attributes[0].clone()));
        }
        BlockingRule::and(
            attributes.iter().cloned().map(BlockingRule::column).collect(),
            RuleLevel::Groups,
        )
    }

    /// Memoizes the label vector / graph for this node (and, recursively,
    /// its children) against `records`. Must be called before `labels()` or
    /// `graph()`.
    pub fn fit(&mut self, records: &[Record]) -> &mut BlockGraph {
        let n = records.len();
        let labels = match &mut self.node {
            Node::Cartesian => Some(vec![0i64; n]),
            Node::Leaf { column, encoder } => Some(fit_leaf(records, column, encoder.as_ref())),
            Node::And(children, RuleLevel::Groups) => Some(fit_and_groups(children, records)),
            Node::Or(children, RuleLevel::Groups) => Some(fit_or_groups(children, records)),
            _ => None,
        };

        self.fitted = Some(match labels {
            Some(l) => BlockGraph::from_labels(l),
            None => match &mut self.node {
                Node::And(children, RuleLevel::Graph) => {
                    let mut graphs: Vec<BlockGraph> = children.iter_mut().map(|c| c.fit(records).clone()).collect();
                    block_graph::intersection(&mut graphs)
                }
                Node::Or(children, RuleLevel::Graph) => {
                    let mut graphs: Vec<BlockGraph> = children.iter_mut().map(|c| c.fit(records).clone()).collect();
                    block_graph::union(&mut graphs)
                }
                Node::ExceptK { children, k, level } => fit_except_k(children, *k, *level, records),
                _ => unreachable!("Groups-level And/Or handled above"),
            },
        });

        debug_assert_eq!(self.fitted.as_ref().unwrap().n(), n);
        self.fitted.as_mut().unwrap()
    }

    pub fn labels(&mut self) -> &LabelVector {
        self.fitted.as_mut().expect("call fit() before labels()").labels()
    }

    pub fn graph(&mut self) -> &mut BlockGraph {
        self.fitted.as_mut().expect("call fit() before graph()")
    }
}

fn fit_leaf(records: &[Record], column: &str, encoder: Option<&Encoder>) -> LabelVector {
    match encoder {
        None => label_algebra::factorize(records, column),
        Some(enc) => {
            let encoded: Vec<Record> = records
                .iter()
                .map(|r| {
                    let mut attrs = r.attributes().clone();
                    if let Some(v) = r.get(column) {
                        let encoded_value = enc(&v.as_comparable_str());
                        attrs.insert(column.to_string(), crate::core::record::Value::String(encoded_value));
                    }
                    Record::new(attrs)
                })
                .collect();
            label_algebra::factorize(&encoded, column)
        }
    }
}

/// `And` at `level=groups`: re-factorizes the row-wise tuple of children's
/// labels. Two records land in the same group iff they agree on every
/// child's label -- the meet of the equivalence relations.
fn fit_and_groups(children: &mut [BlockingRule], records: &[Record]) -> LabelVector {
    let n = records.len();
    let child_labels: Vec<LabelVector> = children.iter_mut().map(|c| c.fit(records).labels().clone()).collect();

    let mut seen = std::collections::HashMap::new();
    let mut next_label = 0i64;
    (0..n)
        .map(|i| {
            let key: Vec<i64> = child_labels.iter().map(|l| l[i]).collect();
            // Any child assigning noise (-1, only possible via external composition)
            // keeps the tuple unique rather than matching another noise tuple.
            if key.iter().any(|&l| l < 0) {
                return (n as i64) + i as i64;
            }
            *seen.entry(key).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            })
        })
        .collect()
}

/// `Or` at `level=groups`: unions each child's path graph, then takes
/// connected components -- the join of the equivalence relations, computed
/// without materializing every child's full clique graph.
fn fit_or_groups(children: &mut [BlockingRule], records: &[Record]) -> LabelVector {
    let n = records.len();
    let mut edges = Vec::new();
    for child in children.iter_mut() {
        let labels = child.fit(records).labels().clone();
        edges.extend(block_graph::path_edges(&labels));
    }
    label_algebra::connected_components(&edges, n)
}

fn fit_except_k(children: &mut [BlockingRule], k: usize, level: RuleLevel, records: &[Record]) -> BlockGraph {
    let n = records.len();
    let subset_size = children.len() - k;

    let child_labels: Vec<LabelVector> = children.iter_mut().map(|c| c.fit(records).labels().clone()).collect();

    let mut edges = Vec::new();
    for combo in (0..children.len()).combinations(subset_size) {
        let key_labels: Vec<&LabelVector> = combo.iter().map(|&idx| &child_labels[idx]).collect();
        let mut seen = std::collections::HashMap::new();
        let mut next_label = 0i64;
        let and_labels: LabelVector = (0..n)
            .map(|i| {
                let key: Vec<i64> = key_labels.iter().map(|l| l[i]).collect();
                if key.iter().any(|&l| l < 0) {
                    return (n as i64) + i as i64;
                }
                *seen.entry(key).or_insert_with(|| {
                    let l = next_label;
                    next_label += 1;
                    l
                })
            })
            .collect();

        match level {
            RuleLevel::Groups => edges.extend(block_graph::path_edges(&and_labels)),
            RuleLevel::Graph => edges.extend(label_algebra::labels_to_pairs(&and_labels)),
        }
    }

    let or_labels = label_algebra::connected_components(&edges, n);
    BlockGraph::from_labels(or_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Value;
    use std::collections::BTreeMap;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        let mut attrs = BTreeMap::new();
        for (k, v) in pairs {
            attrs.insert(k.to_string(), Value::from(*v));
        }
        Record::new(attrs)
    }

    fn same_group(labels: &[i64], a: usize, b: usize) -> bool {
        labels[a] >= 0 && labels[a] == labels[b]
    }

    #[test]
    fn leaf_rule_groups_records_by_exact_value() {
        let records = vec![rec(&[("n", "a")]), rec(&[("n", "a")]), rec(&[("n", "b")])];
        let mut rule = BlockingRule::column("n");
        rule.fit(&records);
        let labels = rule.labels();
        assert!(same_group(labels, 0, 1));
        assert!(!same_group(labels, 0, 2));
    }

    #[test]
    fn and_composition_requires_agreement_on_every_child() {
        // S3: first=John for all; last differs between "Doe" and "Dow" after a
        // FirstNChars(2) encoder, so AND(first, FirstNChars(last, 2)) should
        // still put them together, but a distinct first should not join.
        let records = vec![
            rec(&[("first", "John"), ("last", "Doe")]),
            rec(&[("first", "John"), ("last", "Dow")]),
            rec(&[("first", "Jane"), ("last", "Doe")]),
        ];
        let first_two: Encoder = Arc::new(|s: &str| s.chars().take(2).collect());
        let mut rule = BlockingRule::and(
            vec![
                BlockingRule::column("first"),
                BlockingRule::encoded_column("last", first_two),
            ],
            RuleLevel::Groups,
        )
        .unwrap();
        rule.fit(&records);
        let labels = rule.labels();
        assert!(same_group(labels, 0, 1));
        assert!(!same_group(labels, 0, 2));
    }

    #[test]
    fn or_composition_joins_on_any_child_agreement() {
        // S4: two records match only on an encoded "last" field, one matches
        // only on "first". OR should merge all three into one block; AND
        // should leave them as singletons.
        let phonetic: Encoder = Arc::new(|s: &str| if s.starts_with('S') { "S000".to_string() } else { s.to_string() });
        let records = vec![
            rec(&[("first", "Ann"), ("last", "Smith")]),
            rec(&[("first", "Bob"), ("last", "Smyth")]),
            rec(&[("first", "Ann"), ("last", "Jones")]),
        ];

        let mut or_rule = BlockingRule::or(
            vec![
                BlockingRule::column("first"),
                BlockingRule::encoded_column("last", phonetic.clone()),
            ],
            RuleLevel::Groups,
        )
        .unwrap();
        or_rule.fit(&records);
        let or_labels = or_rule.labels().clone();
        assert!(same_group(&or_labels, 0, 1));
        assert!(same_group(&or_labels, 0, 2));

        let mut and_rule = BlockingRule::and(
            vec![
                BlockingRule::column("first"),
                BlockingRule::encoded_column("last", phonetic),
            ],
            RuleLevel::Groups,
        )
        .unwrap();
        and_rule.fit(&records);
        let and_labels = and_rule.labels();
        assert!(!same_group(and_labels, 0, 1));
        assert!(!same_group(and_labels, 0, 2));
        assert!(!same_group(and_labels, 1, 2));
    }

    #[test]
    fn groups_level_and_graph_level_denote_the_same_equivalence_relation() {
        let records = vec![rec(&[("n", "a")]), rec(&[("n", "a")]), rec(&[("n", "b")]), rec(&[("n", "b")])];

        let mut groups_rule = BlockingRule::and(
            vec![BlockingRule::column("n"), BlockingRule::column("n")],
            RuleLevel::Groups,
        )
        .unwrap();
        groups_rule.fit(&records);
        let groups_labels = groups_rule.labels().clone();

        let mut graph_rule = BlockingRule::and(
            vec![BlockingRule::column("n"), BlockingRule::column("n")],
            RuleLevel::Graph,
        )
        .unwrap();
        graph_rule.fit(&records);
        let graph_labels = graph_rule.labels();

        for i in 0..records.len() {
            for j in 0..records.len() {
                assert_eq!(groups_labels[i] == groups_labels[j], graph_labels[i] == graph_labels[j]);
            }
        }
    }

    #[test]
    fn cartesian_rule_puts_every_record_in_one_block() {
        let records = vec![rec(&[("n", "a")]), rec(&[("n", "b")]), rec(&[("n", "c")])];
        let mut rule = BlockingRule::cartesian();
        rule.fit(&records);
        let labels = rule.labels();
        assert!(labels.iter().all(|&l| l == labels[0]));
    }

    #[test]
    fn combinations_except_k_expands_to_or_over_anded_subsets() {
        // Three leaves, k=1: OR over every AND of 2-of-3 leaves.
        let records = vec![
            rec(&[("a", "x"), ("b", "x"), ("c", "y")]),
            rec(&[("a", "x"), ("b", "z"), ("c", "y")]),
        ];
        // Records agree on "a" and "c" but not "b". A 2-of-3 AND subset
        // {a, c} matches, so the OR over all subsets should merge them.
        let mut rule = BlockingRule::combinations_except_k(
            vec![BlockingRule::column("a"), BlockingRule::column("b"), BlockingRule::column("c")],
            1,
            RuleLevel::Groups,
        )
        .unwrap();
        rule.fit(&records);
        assert!(same_group(rule.labels(), 0, 1));
    }
}
