//! DBSCAN clustering over a precomputed similarity matrix.
//!
//! The similarity matrix is converted to a distance matrix via `d = 1 - s`
//! and partitioned with density-based clustering rather than a fixed
//! threshold cut, so a block can resolve to more than one cluster when it
//! contains several dense groups plus noise.

use crate::scoring::SimilarityMatrix;

/// `eps`/`min_samples` DBSCAN over a dense distance matrix derived from a
/// [`SimilarityMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct Clusterer {
    eps: f64,
    min_samples: usize,
}

impl Clusterer {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        assert!(min_samples >= 2, "min_samples must be >= 2, got {min_samples}");
        Clusterer { eps, min_samples }
    }

    fn neighbors(&self, matrix: &SimilarityMatrix, i: usize) -> Vec<usize> {
        (0..matrix.n())
            .filter(|&j| j != i && (1.0 - matrix.get(i, j)) <= self.eps)
            .collect()
    }

    /// Labels every point `0..n` with a dense cluster id, or `-1` for noise.
    /// A point with no neighborhood at all (`n == 1`) is its own singleton
    /// cluster, not noise -- a lone record was never compared against
    /// anything it could fail to match.
    pub fn cluster(&self, matrix: &SimilarityMatrix) -> Vec<i64> {
        let n = matrix.n();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![0];
        }

        let mut labels = vec![-1i64; n];
        let mut visited = vec![false; n];
        let mut next_cluster = 0i64;

        for point in 0..n {
            if visited[point] {
                continue;
            }
            visited[point] = true;

            let neighbors = self.neighbors(matrix, point);
            if neighbors.len() + 1 < self.min_samples {
                // Not a core point; stays noise unless later reached by one.
                continue;
            }

            let cluster_id = next_cluster;
            next_cluster += 1;
            labels[point] = cluster_id;

            let mut seeds = neighbors;
            let mut cursor = 0;
            while cursor < seeds.len() {
                let q = seeds[cursor];
                cursor += 1;

                if labels[q] == -1 {
                    labels[q] = cluster_id;
                }
                if visited[q] {
                    continue;
                }
                visited[q] = true;

                let q_neighbors = self.neighbors(matrix, q);
                if q_neighbors.len() + 1 >= self.min_samples {
                    for qn in q_neighbors {
                        if !seeds.contains(&qn) {
                            seeds.push(qn);
                        }
                    }
                }
            }
        }

        labels
    }
}
