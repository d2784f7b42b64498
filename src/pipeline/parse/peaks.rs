use ndarray::{ArrayView2, ArrayView3, Axis, s};
use rayon::prelude::*;

use crate::types::GridPeak;

/// Finds local maxima of every confidence-map channel.
///
/// A cell is a peak when its value reaches `threshold` and no cell of the
/// `window_size` square around it (clipped at the borders) is larger. Peaks
/// come out in row-major scan order, at most `max_count` per channel.
pub fn find_peaks(
    cmap: ArrayView3<'_, f32>,
    threshold: f32,
    window_size: usize,
    max_count: usize,
) -> Vec<Vec<GridPeak>> {
    (0..cmap.len_of(Axis(0)))
        .into_par_iter()
        .map(|part| {
            find_channel_peaks(
                cmap.index_axis(Axis(0), part),
                threshold,
                window_size,
                max_count,
            )
        })
        .collect()
}

pub fn find_channel_peaks(
    channel: ArrayView2<'_, f32>,
    threshold: f32,
    window_size: usize,
    max_count: usize,
) -> Vec<GridPeak> {
    let (height, width) = channel.dim();
    let win = window_size / 2;
    let mut peaks = Vec::new();
    if max_count == 0 {
        return peaks;
    }

    'scan: for row in 0..height {
        for col in 0..width {
            let value = channel[[row, col]];
            // NaN never passes
            if !(value >= threshold) {
                continue;
            }

            let rows = row.saturating_sub(win)..(row + win + 1).min(height);
            let cols = col.saturating_sub(win)..(col + win + 1).min(width);
            let is_peak = channel
                .slice(s![rows, cols])
                .iter()
                .all(|&neighbor| !(neighbor > value));
            if !is_peak {
                continue;
            }

            peaks.push(GridPeak { row, col, value });
            if peaks.len() >= max_count {
                break 'scan;
            }
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_single_spike_any_window() {
        let mut map = Array2::<f32>::zeros((9, 11));
        map[[4, 6]] = 0.9;
        for window in [3, 5, 7, 9] {
            let peaks = find_channel_peaks(map.view(), 0.1, window, 10);
            assert_eq!(
                peaks,
                vec![GridPeak {
                    row: 4,
                    col: 6,
                    value: 0.9
                }],
                "window {window}"
            );
        }
    }

    #[test]
    fn test_below_threshold_ignored() {
        let mut map = Array2::<f32>::zeros((5, 5));
        map[[2, 2]] = 0.05;
        assert!(find_channel_peaks(map.view(), 0.1, 3, 10).is_empty());
    }

    #[test]
    fn test_neighbor_suppresses_smaller_value() {
        let mut map = Array2::<f32>::zeros((6, 6));
        map[[2, 2]] = 0.8;
        map[[2, 3]] = 0.6;
        let peaks = find_channel_peaks(map.view(), 0.1, 3, 10);
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].row, peaks[0].col), (2, 2));
    }

    #[test]
    fn test_plateau_keeps_every_tied_cell() {
        let mut map = Array2::<f32>::zeros((4, 4));
        map[[1, 1]] = 0.5;
        map[[1, 2]] = 0.5;
        let peaks = find_channel_peaks(map.view(), 0.1, 3, 10);
        let cells: Vec<_> = peaks.iter().map(|p| (p.row, p.col)).collect();
        assert_eq!(cells, vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn test_cap_keeps_scan_order() {
        let mut map = Array2::<f32>::zeros((10, 10));
        map[[8, 1]] = 0.9;
        map[[1, 8]] = 0.3;
        map[[1, 1]] = 0.5;
        let peaks = find_channel_peaks(map.view(), 0.1, 3, 2);
        let cells: Vec<_> = peaks.iter().map(|p| (p.row, p.col)).collect();
        assert_eq!(cells, vec![(1, 1), (1, 8)]);
    }

    #[test]
    fn test_border_peak_with_clamped_window() {
        let mut map = Array2::<f32>::zeros((5, 5));
        map[[0, 4]] = 0.7;
        let peaks = find_channel_peaks(map.view(), 0.1, 5, 10);
        assert_eq!((peaks[0].row, peaks[0].col), (0, 4));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut cmap = Array3::<f32>::zeros((3, 6, 6));
        cmap[[0, 1, 1]] = 0.4;
        cmap[[2, 4, 4]] = 0.4;
        cmap[[2, 1, 1]] = 0.2;
        let peaks = find_peaks(cmap.view(), 0.1, 3, 5);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].len(), 1);
        assert!(peaks[1].is_empty());
        assert_eq!(peaks[2].len(), 2);
    }
}
