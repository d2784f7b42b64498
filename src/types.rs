use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }
}

/// Local maximum of one confidence-map channel, in grid cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPeak {
    pub row: usize,
    pub col: usize,
    pub value: f32,
}

/// A detected joint candidate.
///
/// `y` and `x` are the sub-pixel refined location normalized to `[0, 1]` over
/// the grid height and width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub row: usize,
    pub col: usize,
    pub y: f32,
    pub x: f32,
    pub confidence: f32,
}

/// One assembled person: entry `j` is the index into the peak set of part
/// type `j`, or `None` when that part was not found.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Skeleton {
    parts: Vec<Option<usize>>,
}

impl Skeleton {
    pub fn empty(num_parts: usize) -> Self {
        Self {
            parts: vec![None; num_parts],
        }
    }

    pub fn from_parts(parts: Vec<Option<usize>>) -> Self {
        Self { parts }
    }

    pub fn part(&self, part_type: usize) -> Option<usize> {
        self.parts.get(part_type).copied().flatten()
    }

    pub(crate) fn set_part(&mut self, part_type: usize, peak: usize) {
        self.parts[part_type] = Some(peak);
    }

    pub fn parts(&self) -> &[Option<usize>] {
        &self.parts
    }

    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn num_found(&self) -> usize {
        self.parts.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(Option::is_some)
    }
}

/// Output of one parse: the skeletons plus the refined peaks they index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedPoses {
    pub peaks: Vec<Vec<Peak>>,
    pub skeletons: Vec<Skeleton>,
}

impl ParsedPoses {
    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.skeletons.len()
    }

    /// Resolves every part of `skeleton` to its peak, if found.
    pub fn keypoints<'a>(
        &'a self,
        skeleton: &'a Skeleton,
    ) -> impl Iterator<Item = Option<&'a Peak>> + 'a {
        skeleton
            .parts()
            .iter()
            .enumerate()
            .map(move |(part_type, &idx)| {
                idx.and_then(|i| self.peaks.get(part_type).and_then(|set| set.get(i)))
            })
    }

    /// Normalized `(x, y)` per part, `None` where the part is missing.
    pub fn normalized_points(&self, skeleton: &Skeleton) -> Vec<Option<(f32, f32)>> {
        self.keypoints(skeleton)
            .map(|peak| peak.map(|p| (p.x, p.y)))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct PoseResult {
    pub frame_index: u64,
    pub frame: Frame,
    pub poses: ParsedPoses,
}
