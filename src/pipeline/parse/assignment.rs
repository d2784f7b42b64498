use ndarray::{Array2, s};
use rayon::prelude::*;

use super::munkres;

/// Selected `(source, target)` pairs of one edge as a 0/1 table shaped like
/// the edge's score matrix. Rows and columns hold at most one selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Matching {
    selected: Array2<bool>,
}

impl Matching {
    pub fn empty(num_sources: usize, num_targets: usize) -> Self {
        Self {
            selected: Array2::from_elem((num_sources, num_targets), false),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.selected.dim()
    }

    pub fn is_selected(&self, source: usize, target: usize) -> bool {
        self.selected
            .get((source, target))
            .copied()
            .unwrap_or(false)
    }

    pub fn target_of(&self, source: usize) -> Option<usize> {
        if source >= self.selected.nrows() {
            return None;
        }
        self.selected.row(source).iter().position(|&m| m)
    }

    pub fn source_of(&self, target: usize) -> Option<usize> {
        if target >= self.selected.ncols() {
            return None;
        }
        self.selected.column(target).iter().position(|&m| m)
    }

    /// Selected pairs in ascending source order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.selected
            .indexed_iter()
            .filter(|(_, m)| **m)
            .map(|(cell, _)| cell)
    }

    pub fn len(&self) -> usize {
        self.selected.iter().filter(|&&m| m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maximum-score one-to-one matching of one edge.
///
/// Only the first `max_count` rows and columns take part. Non-finite scores
/// count as zero. Pairs scoring below `link_threshold` are dropped after the
/// optimum is found.
pub fn assign(scores: &Array2<f32>, link_threshold: f32, max_count: usize) -> Matching {
    let (nrows, ncols) = scores.dim();
    let (nrows, ncols) = (nrows.min(max_count), ncols.min(max_count));
    let scores = scores
        .slice(s![..nrows, ..ncols])
        .mapv(|score| if score.is_finite() { score } else { 0.0 });
    let mut matching = Matching::empty(nrows, ncols);

    let cost = scores.mapv(|score| -score);
    for (source, target) in munkres::solve(cost.view()) {
        if scores[[source, target]] >= link_threshold {
            matching.selected[[source, target]] = true;
        }
    }

    matching
}

pub fn assign_all(scores: &[Array2<f32>], link_threshold: f32, max_count: usize) -> Vec<Matching> {
    scores
        .par_iter()
        .map(|edge_scores| assign(edge_scores, link_threshold, max_count))
        .collect()
}
