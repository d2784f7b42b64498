pub mod assignment;
pub mod connect;
pub mod munkres;
pub mod paf;
pub mod peaks;
pub mod refine;

use ndarray::ArrayView3;

use crate::error::{ParseError, Result};
use crate::pipeline::topology::Topology;
use crate::types::ParsedPoses;

pub(crate) const EPS: f32 = 1e-6;

/// What the assembler does with a matched pair whose endpoints already belong
/// to two different skeletons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Drop the pair; skeletons are never joined.
    #[default]
    Never,
    /// Join the two skeletons when they share no part type.
    Disjoint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseConfig {
    pub detection_threshold: f32,
    pub window_size: usize,
    pub max_parts_per_type: usize,
    pub num_integral_samples: usize,
    pub link_threshold: f32,
    pub max_objects: usize,
    pub merge_policy: MergePolicy,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.1,
            window_size: 5,
            max_parts_per_type: 2,
            num_integral_samples: 7,
            link_threshold: 0.1,
            max_objects: 100,
            merge_policy: MergePolicy::Never,
        }
    }
}

impl ParseConfig {
    /// Defaults paired with [`Topology::human_pose`].
    ///
    /// That edge order starts both legs as separate skeletons before the hip
    /// edge reaches them, so fragments sharing no part type are merged.
    pub fn human_pose() -> Self {
        Self {
            merge_policy: MergePolicy::Disjoint,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.detection_threshold.is_finite() {
            return Err(ParseError::InvalidConfig(format!(
                "detection_threshold must be finite, got {}",
                self.detection_threshold
            )));
        }
        if !self.link_threshold.is_finite() {
            return Err(ParseError::InvalidConfig(format!(
                "link_threshold must be finite, got {}",
                self.link_threshold
            )));
        }
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(ParseError::InvalidConfig(format!(
                "window_size must be an odd number >= 3, got {}",
                self.window_size
            )));
        }
        if self.num_integral_samples < 2 {
            return Err(ParseError::InvalidConfig(format!(
                "num_integral_samples must be >= 2, got {}",
                self.num_integral_samples
            )));
        }
        if self.max_parts_per_type == 0 {
            return Err(ParseError::InvalidConfig(
                "max_parts_per_type must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses skeletons out of flat row-major `(channels, height, width)` buffers.
///
/// The confidence map carries one channel per part type, the affinity field
/// the channels named by `topology`. Both must share the same grid.
pub fn parse_skeletons(
    confidence_map: &[f32],
    confidence_map_shape: [usize; 3],
    affinity_field: &[f32],
    affinity_field_shape: [usize; 3],
    topology: &Topology,
    config: &ParseConfig,
) -> Result<ParsedPoses> {
    let cmap = tensor_view("confidence map", confidence_map, confidence_map_shape)?;
    let paf = tensor_view("affinity field", affinity_field, affinity_field_shape)?;
    parse_views(cmap, paf, topology, config)
}

pub fn parse_views(
    cmap: ArrayView3<'_, f32>,
    paf: ArrayView3<'_, f32>,
    topology: &Topology,
    config: &ParseConfig,
) -> Result<ParsedPoses> {
    config.validate()?;
    check_shapes(cmap.dim(), paf.dim(), topology)?;

    let grid_peaks = peaks::find_peaks(
        cmap,
        config.detection_threshold,
        config.window_size,
        config.max_parts_per_type,
    );
    let peaks = refine::refine_peaks(&grid_peaks, cmap, config.window_size);
    let scores = paf::score_graph(paf, topology, &peaks, config.num_integral_samples);
    let matchings =
        assignment::assign_all(&scores, config.link_threshold, config.max_parts_per_type);

    let peak_counts: Vec<usize> = peaks.iter().map(Vec::len).collect();
    let skeletons = connect::connect_parts(
        &matchings,
        topology,
        &peak_counts,
        config.max_objects,
        config.merge_policy,
    );

    log::debug!(
        "parsed {} skeletons from {} peaks and {} links",
        skeletons.len(),
        peak_counts.iter().sum::<usize>(),
        matchings.iter().map(assignment::Matching::len).sum::<usize>()
    );

    Ok(ParsedPoses { peaks, skeletons })
}

fn tensor_view<'a>(
    tensor: &'static str,
    data: &'a [f32],
    shape: [usize; 3],
) -> Result<ArrayView3<'a, f32>> {
    if shape.contains(&0) {
        return Err(ParseError::EmptyDimension { tensor, shape });
    }
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
    let size_error = || ParseError::BufferSize {
        tensor,
        shape,
        len: data.len(),
        expected: expected.unwrap_or(usize::MAX),
    };
    if expected != Some(data.len()) {
        return Err(size_error());
    }

    ArrayView3::from_shape((shape[0], shape[1], shape[2]), data).map_err(|_| size_error())
}

fn check_shapes(
    cmap: (usize, usize, usize),
    paf: (usize, usize, usize),
    topology: &Topology,
) -> Result<()> {
    let (parts, height, width) = cmap;
    let (paf_channels, paf_height, paf_width) = paf;
    if parts == 0 || height == 0 || width == 0 {
        return Err(ParseError::EmptyDimension {
            tensor: "confidence map",
            shape: [parts, height, width],
        });
    }
    if paf_channels == 0 || paf_height == 0 || paf_width == 0 {
        return Err(ParseError::EmptyDimension {
            tensor: "affinity field",
            shape: [paf_channels, paf_height, paf_width],
        });
    }
    if (height, width) != (paf_height, paf_width) {
        return Err(ParseError::GridMismatch {
            cmap_grid: (height, width),
            paf_grid: (paf_height, paf_width),
        });
    }

    for (edge_idx, edge) in topology.edges().iter().enumerate() {
        for channel in [edge.source, edge.target] {
            if channel >= parts {
                return Err(ParseError::ChannelOutOfRange {
                    edge: edge_idx,
                    tensor: "confidence map",
                    channel,
                    available: parts,
                });
            }
        }
        for channel in [edge.paf_x, edge.paf_y] {
            if channel >= paf_channels {
                return Err(ParseError::ChannelOutOfRange {
                    edge: edge_idx,
                    tensor: "affinity field",
                    channel,
                    available: paf_channels,
                });
            }
        }
    }

    Ok(())
}
