use ndarray::{ArrayView2, ArrayView3, Axis};

use super::EPS;
use crate::types::{GridPeak, Peak};

/// Moves every peak to the confidence-weighted centroid of its window and
/// normalizes the result to `[0, 1]`.
pub fn refine_peaks(
    peaks: &[Vec<GridPeak>],
    cmap: ArrayView3<'_, f32>,
    window_size: usize,
) -> Vec<Vec<Peak>> {
    peaks
        .iter()
        .enumerate()
        .map(|(part, channel_peaks)| {
            let channel = cmap.index_axis(Axis(0), part);
            channel_peaks
                .iter()
                .map(|peak| refine_peak(channel, *peak, window_size))
                .collect()
        })
        .collect()
}

pub fn refine_peak(channel: ArrayView2<'_, f32>, peak: GridPeak, window_size: usize) -> Peak {
    let (height, width) = channel.dim();
    let (offset_row, offset_col) = centroid_offset(channel, peak.row, peak.col, window_size);

    Peak {
        row: peak.row,
        col: peak.col,
        y: (peak.row as f32 + offset_row + 0.5) / height as f32,
        x: (peak.col as f32 + offset_col + 0.5) / width as f32,
        confidence: peak.value,
    }
}

/// Centroid offset from `(row, col)` in cells, clamped to half a cell.
///
/// The window is clipped to the grid; cells with non-positive confidence carry
/// no weight.
fn centroid_offset(
    channel: ArrayView2<'_, f32>,
    row: usize,
    col: usize,
    window_size: usize,
) -> (f32, f32) {
    let (height, width) = channel.dim();
    let win = window_size / 2;
    let rows = row.saturating_sub(win)..row.saturating_add(win + 1).min(height);
    let cols = col.saturating_sub(win)..col.saturating_add(win + 1).min(width);

    let mut weight_sum = 0.0_f32;
    let mut row_sum = 0.0_f32;
    let mut col_sum = 0.0_f32;
    for r in rows {
        for c in cols.clone() {
            let weight = channel[[r, c]];
            if !(weight > 0.0) {
                continue;
            }
            weight_sum += weight;
            row_sum += weight * (r as f32 - row as f32);
            col_sum += weight * (c as f32 - col as f32);
        }
    }

    if weight_sum < EPS {
        return (0.0, 0.0);
    }

    (
        (row_sum / weight_sum).clamp(-0.5, 0.5),
        (col_sum / weight_sum).clamp(-0.5, 0.5),
    )
}
