/// One limb of the body graph.
///
/// `paf_x` and `paf_y` are the affinity-field channels holding the column and
/// row components of the limb's vector field. `source` and `target` are the
/// confidence-map channels of its two joints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub paf_x: usize,
    pub paf_y: usize,
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub const fn new(paf_x: usize, paf_y: usize, source: usize, target: usize) -> Self {
        Self {
            paf_x,
            paf_y,
            source,
            target,
        }
    }
}

impl From<[usize; 4]> for Edge {
    fn from([paf_x, paf_y, source, target]: [usize; 4]) -> Self {
        Self::new(paf_x, paf_y, source, target)
    }
}

pub const HUMAN_POSE_KEYPOINTS: &[&str] = &[
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "neck",
];

const HUMAN_POSE_EDGES: &[[usize; 4]] = &[
    [0, 1, 15, 13],
    [2, 3, 13, 11],
    [4, 5, 16, 14],
    [6, 7, 14, 12],
    [8, 9, 11, 12],
    [10, 11, 5, 7],
    [12, 13, 6, 8],
    [14, 15, 7, 9],
    [16, 17, 8, 10],
    [18, 19, 1, 2],
    [20, 21, 0, 1],
    [22, 23, 0, 2],
    [24, 25, 1, 3],
    [26, 27, 2, 4],
    [28, 29, 3, 5],
    [30, 31, 4, 6],
    [32, 33, 17, 0],
    [34, 35, 17, 5],
    [36, 37, 17, 6],
    [38, 39, 17, 11],
    [40, 41, 17, 12],
];

/// Ordered limb list. Edge order is significant: the assembler walks edges in
/// this order, so it decides which skeleton claims a contested joint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    edges: Vec<Edge>,
}

impl Topology {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// 18 keypoints (COCO order plus neck) joined by 21 limbs.
    pub fn human_pose() -> Self {
        Self::new(HUMAN_POSE_EDGES.iter().copied().map(Edge::from).collect())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of confidence-map channels the edges reference.
    pub fn min_part_types(&self) -> usize {
        self.edges
            .iter()
            .map(|e| e.source.max(e.target) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of affinity-field channels the edges reference.
    pub fn min_paf_channels(&self) -> usize {
        self.edges
            .iter()
            .map(|e| e.paf_x.max(e.paf_y) + 1)
            .max()
            .unwrap_or(0)
    }
}

impl From<&[[usize; 4]]> for Topology {
    fn from(edges: &[[usize; 4]]) -> Self {
        Self::new(edges.iter().copied().map(Edge::from).collect())
    }
}
