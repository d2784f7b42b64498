//! Munkres (Hungarian) assignment on a dense cost matrix.
//!
//! Rectangular inputs are padded to a square with zero-cost dummy rows or
//! columns; dummy assignments are dropped from the result.

use ndarray::{Array2, ArrayView2, Axis};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

/// Boolean membership table over the cells of an `n × n` matrix, used for
/// both starred and primed zeros.
#[derive(Clone, Debug)]
struct PairGraph {
    marked: Array2<bool>,
}

impl PairGraph {
    fn new(n: usize) -> Self {
        Self {
            marked: Array2::from_elem((n, n), false),
        }
    }

    fn set(&mut self, cell: Cell, marked: bool) {
        self.marked[[cell.row, cell.col]] = marked;
    }

    fn col_in_row(&self, row: usize) -> Option<usize> {
        self.marked.row(row).iter().position(|&m| m)
    }

    fn row_in_col(&self, col: usize) -> Option<usize> {
        self.marked.column(col).iter().position(|&m| m)
    }

    fn clear(&mut self) {
        self.marked.fill(false);
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.marked
            .indexed_iter()
            .filter(|(_, m)| **m)
            .map(|((row, col), _)| Cell { row, col })
    }
}

#[derive(Clone, Debug)]
struct CoverTable {
    rows: Vec<bool>,
    cols: Vec<bool>,
}

impl CoverTable {
    fn new(n: usize) -> Self {
        Self {
            rows: vec![false; n],
            cols: vec![false; n],
        }
    }

    fn is_covered(&self, cell: Cell) -> bool {
        self.rows[cell.row] || self.cols[cell.col]
    }

    fn covered_cols(&self) -> usize {
        self.cols.iter().filter(|&&c| c).count()
    }

    fn clear(&mut self) {
        self.rows.fill(false);
        self.cols.fill(false);
    }
}

/// Returns the `(row, col)` pairs of a minimum-cost assignment, sorted by row.
///
/// Every row or column of the smaller side is assigned exactly once.
/// Non-finite costs are treated as zero.
pub fn solve(cost: ArrayView2<'_, f32>) -> Vec<(usize, usize)> {
    let (nrows, ncols) = cost.dim();
    if nrows == 0 || ncols == 0 {
        return Vec::new();
    }

    let n = nrows.max(ncols);
    let mut graph = Array2::<f64>::zeros((n, n));
    for ((r, c), &value) in cost.indexed_iter() {
        graph[[r, c]] = if value.is_finite() { value as f64 } else { 0.0 };
    }

    subtract_minimum_row(&mut graph);
    subtract_minimum_column(&mut graph);

    let mut stars = PairGraph::new(n);
    let mut primes = PairGraph::new(n);
    let mut cover = CoverTable::new(n);
    star_zeros(&graph, &mut stars);

    while !cover_starred_columns(&stars, &mut cover) {
        loop {
            let Some(zero) = find_uncovered_zero(&graph, &cover) else {
                adjust(&mut graph, &cover);
                continue;
            };

            primes.set(zero, true);
            match stars.col_in_row(zero.row) {
                Some(star_col) => {
                    cover.rows[zero.row] = true;
                    cover.cols[star_col] = false;
                }
                None => {
                    augment(&mut stars, &primes, zero);
                    primes.clear();
                    cover.clear();
                    break;
                }
            }
        }
    }

    stars
        .cells()
        .filter(|cell| cell.row < nrows && cell.col < ncols)
        .map(|cell| (cell.row, cell.col))
        .collect()
}

fn subtract_minimum_row(graph: &mut Array2<f64>) {
    for mut row in graph.axis_iter_mut(Axis(0)) {
        let min = row.iter().copied().fold(f64::INFINITY, f64::min);
        row.mapv_inplace(|v| v - min);
    }
}

fn subtract_minimum_column(graph: &mut Array2<f64>) {
    for mut col in graph.axis_iter_mut(Axis(1)) {
        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        col.mapv_inplace(|v| v - min);
    }
}

/// Stars the first zero of each row whose column holds no star yet.
fn star_zeros(graph: &Array2<f64>, stars: &mut PairGraph) {
    let n = graph.nrows();
    let mut starred_cols = vec![false; n];
    for row in 0..n {
        if let Some(col) = (0..n).find(|&col| !starred_cols[col] && graph[[row, col]] == 0.0) {
            stars.set(Cell { row, col }, true);
            starred_cols[col] = true;
        }
    }
}

/// Covers every column holding a star; true once the stars form a complete
/// assignment.
fn cover_starred_columns(stars: &PairGraph, cover: &mut CoverTable) -> bool {
    for cell in stars.cells() {
        cover.cols[cell.col] = true;
    }
    cover.covered_cols() == cover.cols.len()
}

fn find_uncovered_zero(graph: &Array2<f64>, cover: &CoverTable) -> Option<Cell> {
    graph
        .indexed_iter()
        .map(|((row, col), &value)| (Cell { row, col }, value))
        .find(|&(cell, value)| value == 0.0 && !cover.is_covered(cell))
        .map(|(cell, _)| cell)
}

/// Flips stars and primes along the alternating path that starts at the
/// unmatched prime `start`.
fn augment(stars: &mut PairGraph, primes: &PairGraph, start: Cell) {
    let mut path = vec![start];
    let mut current = start;
    while let Some(row) = stars.row_in_col(current.col) {
        let star = Cell {
            row,
            col: current.col,
        };
        path.push(star);
        // a starred row reached along the path always carries a prime
        let Some(col) = primes.col_in_row(row) else {
            break;
        };
        current = Cell { row, col };
        path.push(current);
    }

    for (step, cell) in path.into_iter().enumerate() {
        // even steps are primes, odd steps are stars
        stars.set(cell, step % 2 == 0);
    }
}

/// Adds the smallest uncovered value to covered rows and subtracts it from
/// uncovered columns.
fn adjust(graph: &mut Array2<f64>, cover: &CoverTable) {
    let min = graph
        .indexed_iter()
        .filter(|((row, col), _)| {
            !cover.is_covered(Cell {
                row: *row,
                col: *col,
            })
        })
        .map(|(_, &value)| value)
        .fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return;
    }

    for ((row, col), value) in graph.indexed_iter_mut() {
        if cover.rows[row] {
            *value += min;
        }
        if !cover.cols[col] {
            *value -= min;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn total(cost: &Array2<f32>, pairs: &[(usize, usize)]) -> f32 {
        pairs.iter().map(|&(r, c)| cost[[r, c]]).sum()
    }

    fn assert_partial_permutation(pairs: &[(usize, usize)], nrows: usize, ncols: usize) {
        let mut rows = vec![false; nrows];
        let mut cols = vec![false; ncols];
        for &(r, c) in pairs {
            assert!(!rows[r], "row {r} assigned twice");
            assert!(!cols[c], "column {c} assigned twice");
            rows[r] = true;
            cols[c] = true;
        }
        assert_eq!(pairs.len(), nrows.min(ncols));
    }

    /// Minimum over every injective map from the smaller side to the larger.
    fn brute_force_min(cost: &Array2<f32>) -> f32 {
        let (nrows, ncols) = cost.dim();
        let transposed = nrows > ncols;
        let (small, large) = if transposed {
            (ncols, nrows)
        } else {
            (nrows, ncols)
        };
        let mut used = vec![false; large];
        let mut best = f32::INFINITY;
        search(cost, transposed, 0, small, &mut used, 0.0, &mut best);
        best
    }

    fn search(
        cost: &Array2<f32>,
        transposed: bool,
        depth: usize,
        small: usize,
        used: &mut [bool],
        acc: f32,
        best: &mut f32,
    ) {
        if depth == small {
            *best = best.min(acc);
            return;
        }
        for other in 0..used.len() {
            if used[other] {
                continue;
            }
            used[other] = true;
            let value = if transposed {
                cost[[other, depth]]
            } else {
                cost[[depth, other]]
            };
            search(cost, transposed, depth + 1, small, used, acc + value, best);
            used[other] = false;
        }
    }

    /// Deterministic pseudo-random matrix from a linear congruential sequence.
    fn lcg_matrix(nrows: usize, ncols: usize, seed: u64) -> Array2<f32> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        Array2::from_shape_fn((nrows, ncols), |_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) % 1000) as f32 / 10.0
        })
    }

    #[test]
    fn test_identity_2x2() {
        let cost = array![[0.0_f32, 1.0], [1.0, 0.0]];
        assert_eq!(solve(cost.view()), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_swapped_2x2() {
        let cost = array![[1.0_f32, 0.0], [0.0, 1.0]];
        assert_eq!(solve(cost.view()), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_classic_3x3() {
        let cost = array![[4.0_f32, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let pairs = solve(cost.view());
        assert_partial_permutation(&pairs, 3, 3);
        assert_eq!(total(&cost, &pairs), 5.0);
    }

    #[test]
    fn test_negated_scores_maximize() {
        let scores = array![[0.9_f32, 0.8], [0.85, 0.1]];
        let pairs = solve((-&scores).view());
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_empty_matrix() {
        let cost = Array2::<f32>::zeros((0, 3));
        assert!(solve(cost.view()).is_empty());
    }

    #[test]
    fn test_single_element() {
        let cost = array![[0.5_f32]];
        assert_eq!(solve(cost.view()), vec![(0, 0)]);
    }

    #[test]
    fn test_rectangular_more_rows() {
        let cost = array![[5.0_f32, 9.0], [4.0, 6.0], [3.0, 1.0]];
        let pairs = solve(cost.view());
        assert_partial_permutation(&pairs, 3, 2);
        assert_eq!(total(&cost, &pairs), 5.0);
    }

    #[test]
    fn test_non_finite_costs_do_not_hang() {
        let cost = array![[f32::NAN, 1.0], [2.0, f32::INFINITY]];
        let pairs = solve(cost.view());
        assert_partial_permutation(&pairs, 2, 2);
    }

    #[test]
    fn test_matches_brute_force_up_to_6x6() {
        let mut seed = 1;
        for nrows in 1..=6 {
            for ncols in 1..=6 {
                for _ in 0..3 {
                    seed += 1;
                    let cost = lcg_matrix(nrows, ncols, seed);
                    let pairs = solve(cost.view());
                    assert_partial_permutation(&pairs, nrows, ncols);
                    let expected = brute_force_min(&cost);
                    assert!(
                        (total(&cost, &pairs) - expected).abs() < 1e-3,
                        "{nrows}x{ncols} seed {seed}: got {} expected {expected}",
                        total(&cost, &pairs)
                    );
                }
            }
        }
    }

    #[test]
    fn test_negative_costs_match_brute_force() {
        for seed in 100..120 {
            let cost = -lcg_matrix(4, 5, seed);
            let pairs = solve(cost.view());
            assert_partial_permutation(&pairs, 4, 5);
            assert!((total(&cost, &pairs) - brute_force_min(&cost)).abs() < 1e-3);
        }
    }
}
