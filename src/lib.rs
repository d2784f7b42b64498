//! Multi-person skeleton parsing from part confidence maps and part affinity
//! fields, plus the frame worker and overlay drawing that sit around it.

pub mod error;
pub mod pipeline;
pub mod types;

pub use error::{ParseError, Result};
pub use pipeline::{
    Edge, MergePolicy, ParseConfig, Topology, parse_skeletons, parse_views,
};
pub use types::{Frame, GridPeak, ParsedPoses, Peak, PoseResult, Skeleton};
