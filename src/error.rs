use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Precondition violations detected before any parsing stage runs.
///
/// Empty detections are never reported here: a frame without peaks parses to
/// an empty skeleton set.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("{tensor} shape {shape:?} has a zero dimension")]
    EmptyDimension {
        tensor: &'static str,
        shape: [usize; 3],
    },

    #[error("{tensor} buffer holds {len} values but shape {shape:?} needs {expected}")]
    BufferSize {
        tensor: &'static str,
        shape: [usize; 3],
        len: usize,
        expected: usize,
    },

    #[error(
        "confidence map grid {cmap_grid:?} does not match affinity field grid {paf_grid:?}"
    )]
    GridMismatch {
        cmap_grid: (usize, usize),
        paf_grid: (usize, usize),
    },

    #[error("topology edge {edge} references {tensor} channel {channel}, only {available} exist")]
    ChannelOutOfRange {
        edge: usize,
        tensor: &'static str,
        channel: usize,
        available: usize,
    },

    #[error("invalid parse config: {0}")]
    InvalidConfig(String),
}
