//! Isolation forest outlier scoring
//!
//! Points that random axis-aligned splits isolate in few steps are
//! outliers. Each tree is grown on a random subsample; a point's score is
//! `2^(-E[h(x)] / c(ψ))`, where `h` is its path length and `c(ψ)` the
//! average path length of an unsuccessful BST search over ψ points.
//! Scores lie in (0, 1]; higher is more anomalous.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::features::Point;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Per-point output of an outlier model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScore {
    /// Continuous anomaly score in [0, 1], higher is more anomalous
    pub score: f64,
    pub is_outlier: bool,
}

/// Unsupervised outlier model: fit on a batch and score the same batch
pub trait OutlierModel {
    fn fit_score(&self, points: &[Point]) -> Vec<OutlierScore>;
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: u64,
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        dim: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl IsolationForest {
    pub fn new(trees: usize, sample_size: usize, contamination: f64, seed: u64) -> Self {
        IsolationForest {
            trees: trees.max(1),
            sample_size: sample_size.max(2),
            contamination,
            seed,
        }
    }

    fn build(points: &[Point], indices: &[usize], depth: usize, limit: usize, rng: &mut StdRng) -> Node {
        if depth >= limit || indices.len() <= 1 {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        // Only dimensions that still have spread can be split
        let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(2);
        for dim in 0..2 {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(points[i][dim]), hi.max(points[i][dim]))
            });
            if max > min {
                candidates.push((dim, min, max));
            }
        }
        if candidates.is_empty() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (dim, min, max) = candidates[rng.gen_range(0..candidates.len())];
        let value = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&i| points[i][dim] < value);

        Node::Split {
            dim,
            value,
            left: Box::new(Self::build(points, &left, depth + 1, limit, rng)),
            right: Box::new(Self::build(points, &right, depth + 1, limit, rng)),
        }
    }

    fn path_length(node: &Node, point: &Point, depth: usize) -> f64 {
        match node {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                dim,
                value,
                left,
                right,
            } => {
                let next = if point[*dim] < *value { left } else { right };
                Self::path_length(next, point, depth + 1)
            }
        }
    }

    /// Flags the `ceil(n * contamination)` highest scores, ties included
    fn flag(&self, scores: &[f64]) -> Vec<bool> {
        let n = scores.len();
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        if n == 0 || max - min <= f64::EPSILON {
            return vec![false; n];
        }

        let k = ((n as f64 * self.contamination) - 1e-9).ceil().clamp(1.0, n as f64) as usize;
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let cutoff = sorted[k - 1];

        scores.iter().map(|&s| s >= cutoff).collect()
    }
}

impl OutlierModel for IsolationForest {
    fn fit_score(&self, points: &[Point]) -> Vec<OutlierScore> {
        let n = points.len();
        if n < 2 {
            return vec![
                OutlierScore {
                    score: 0.5,
                    is_outlier: false,
                };
                n
            ];
        }

        let psi = self.sample_size.min(n);
        let limit = (psi as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let forest: Vec<Node> = (0..self.trees)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, psi).into_vec();
                Self::build(points, &sample, 0, limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(psi);
        let scores: Vec<f64> = points
            .iter()
            .map(|point| {
                let mean_path = forest
                    .iter()
                    .map(|tree| Self::path_length(tree, point, 0))
                    .sum::<f64>()
                    / forest.len() as f64;
                2f64.powf(-mean_path / normalizer).clamp(0.0, 1.0)
            })
            .collect();

        let flags = self.flag(&scores);
        scores
            .into_iter()
            .zip(flags)
            .map(|(score, is_outlier)| OutlierScore { score, is_outlier })
            .collect()
    }
}

/// c(n): average path length of an unsuccessful search in a BST of n points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
