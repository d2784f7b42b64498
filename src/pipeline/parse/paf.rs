use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;

use super::EPS;
use crate::pipeline::topology::{Edge, Topology};
use crate::types::Peak;

/// Line-integral scores for every topology edge, in edge order.
///
/// Entry `[i, j]` of edge `k` rates peak `i` of the edge's source part against
/// peak `j` of its target part.
pub fn score_graph(
    paf: ArrayView3<'_, f32>,
    topology: &Topology,
    peaks: &[Vec<Peak>],
    num_samples: usize,
) -> Vec<Array2<f32>> {
    topology
        .edges()
        .par_iter()
        .map(|edge| score_edge(paf, edge, peaks, num_samples))
        .collect()
}

pub fn score_edge(
    paf: ArrayView3<'_, f32>,
    edge: &Edge,
    peaks: &[Vec<Peak>],
    num_samples: usize,
) -> Array2<f32> {
    let empty = Vec::new();
    let sources = peaks.get(edge.source).unwrap_or(&empty);
    let targets = peaks.get(edge.target).unwrap_or(&empty);
    let field_x = paf.index_axis(Axis(0), edge.paf_x);
    let field_y = paf.index_axis(Axis(0), edge.paf_y);

    Array2::from_shape_fn((sources.len(), targets.len()), |(i, j)| {
        line_integral(field_x, field_y, &sources[i], &targets[j], num_samples)
    })
}

/// Mean projection of the field onto the `a → b` direction over `num_samples`
/// evenly spaced points of the segment, including both ends.
///
/// Samples use the grid cell containing them; samples outside the grid and
/// negative projections add nothing. A field pointing from `b` to `a`
/// therefore scores zero.
pub fn line_integral(
    field_x: ArrayView2<'_, f32>,
    field_y: ArrayView2<'_, f32>,
    a: &Peak,
    b: &Peak,
    num_samples: usize,
) -> f32 {
    let (height, width) = field_x.dim();
    let (a_row, a_col) = (a.y * height as f32, a.x * width as f32);
    let (b_row, b_col) = (b.y * height as f32, b.x * width as f32);
    let (d_row, d_col) = (b_row - a_row, b_col - a_col);
    let norm = (d_row * d_row + d_col * d_col).sqrt();

    if !(norm >= EPS) {
        return coincident_score(field_x, field_y, a, b);
    }

    let (u_row, u_col) = (d_row / norm, d_col / norm);
    let last = num_samples.saturating_sub(1).max(1) as f32;
    let mut integral = 0.0_f32;
    for sample in 0..num_samples {
        let t = sample as f32 / last;
        let Some((r, c)) = grid_cell(a_row + t * d_row, a_col + t * d_col, height, width) else {
            continue;
        };
        let projection = field_x[[r, c]] * u_col + field_y[[r, c]] * u_row;
        if projection > 0.0 {
            integral += projection;
        }
    }

    integral / num_samples.max(1) as f32
}

/// Field magnitude at the shared cell, weighted by the geometric mean of the
/// two peak confidences.
fn coincident_score(
    field_x: ArrayView2<'_, f32>,
    field_y: ArrayView2<'_, f32>,
    a: &Peak,
    b: &Peak,
) -> f32 {
    let (height, width) = field_x.dim();
    let Some((r, c)) = grid_cell(a.y * height as f32, a.x * width as f32, height, width) else {
        return 0.0;
    };
    let (fx, fy) = (field_x[[r, c]], field_y[[r, c]]);
    let weight = (a.confidence.max(0.0) * b.confidence.max(0.0)).sqrt();
    let score = (fx * fx + fy * fy).sqrt() * weight;
    if score.is_finite() { score } else { 0.0 }
}

fn grid_cell(row: f32, col: f32, height: usize, width: usize) -> Option<(usize, usize)> {
    if !(row >= 0.0 && col >= 0.0 && row < height as f32 && col < width as f32) {
        return None;
    }
    let (r, c) = (row.floor() as usize, col.floor() as usize);
    (r < height && c < width).then_some((r, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn peak_at(row: usize, col: usize, height: usize, width: usize) -> Peak {
        Peak {
            row,
            col,
            y: (row as f32 + 0.5) / height as f32,
            x: (col as f32 + 0.5) / width as f32,
            confidence: 1.0,
        }
    }

    /// Uniform field along +x in channels 0/1.
    fn horizontal_field(height: usize, width: usize, direction: f32) -> Array3<f32> {
        let mut paf = Array3::<f32>::zeros((2, height, width));
        paf.index_axis_mut(Axis(0), 0).fill(direction);
        paf
    }

    #[test]
    fn test_aligned_field_scores_one() {
        let paf = horizontal_field(8, 8, 1.0);
        let a = peak_at(4, 1, 8, 8);
        let b = peak_at(4, 6, 8, 8);
        let score = line_integral(
            paf.index_axis(Axis(0), 0),
            paf.index_axis(Axis(0), 1),
            &a,
            &b,
            7,
        );
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_direction_scores_zero() {
        let paf = horizontal_field(8, 8, 1.0);
        let a = peak_at(4, 1, 8, 8);
        let b = peak_at(4, 6, 8, 8);
        let score = line_integral(
            paf.index_axis(Axis(0), 0),
            paf.index_axis(Axis(0), 1),
            &b,
            &a,
            7,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_perpendicular_field_scores_zero() {
        let mut paf = Array3::<f32>::zeros((2, 8, 8));
        paf.index_axis_mut(Axis(0), 1).fill(1.0);
        let a = peak_at(4, 1, 8, 8);
        let b = peak_at(4, 6, 8, 8);
        let score = line_integral(
            paf.index_axis(Axis(0), 0),
            paf.index_axis(Axis(0), 1),
            &a,
            &b,
            5,
        );
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn test_diagonal_projection() {
        let mut paf = Array3::<f32>::zeros((2, 10, 10));
        paf.index_axis_mut(Axis(0), 0).fill(1.0);
        let a = peak_at(1, 1, 10, 10);
        let b = peak_at(7, 7, 10, 10);
        let score = line_integral(
            paf.index_axis(Axis(0), 0),
            paf.index_axis(Axis(0), 1),
            &a,
            &b,
            4,
        );
        assert!((score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_coincident_peaks_use_weighted_magnitude() {
        let mut paf = Array3::<f32>::zeros((2, 6, 6));
        paf[[0, 2, 3]] = 3.0;
        paf[[1, 2, 3]] = 4.0;
        let mut a = peak_at(2, 3, 6, 6);
        let mut b = a;
        a.confidence = 0.25;
        b.confidence = 1.0;
        let field_x = paf.index_axis(Axis(0), 0);
        let field_y = paf.index_axis(Axis(0), 1);
        let first = line_integral(field_x, field_y, &a, &b, 7);
        let second = line_integral(field_x, field_y, &a, &b, 7);
        assert!((first - 2.5).abs() < 1e-6);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_score_edge_shape_and_channels() {
        let mut paf = Array3::<f32>::zeros((4, 8, 8));
        paf.index_axis_mut(Axis(0), 2).fill(1.0);
        let peaks = vec![
            vec![peak_at(2, 1, 8, 8), peak_at(5, 1, 8, 8)],
            vec![peak_at(2, 6, 8, 8)],
        ];
        let edge = Edge::new(2, 3, 0, 1);
        let scores = score_edge(paf.view(), &edge, &peaks, 7);
        assert_eq!(scores.dim(), (2, 1));
        assert!((scores[[0, 0]] - 1.0).abs() < 1e-6);
        assert!(scores[[1, 0]] > 0.0 && scores[[1, 0]] < 1.0);
    }

    #[test]
    fn test_score_graph_empty_peaks() {
        let paf = Array3::<f32>::zeros((2, 4, 4));
        let topology = Topology::from(&[[0, 1, 0, 1]][..]);
        let peaks = vec![Vec::new(), vec![peak_at(1, 1, 4, 4)]];
        let graph = score_graph(paf.view(), &topology, &peaks, 7);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph[0].dim(), (0, 1));
    }
}
