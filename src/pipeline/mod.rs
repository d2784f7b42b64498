pub mod parse;
pub mod recognizer;
pub mod skeleton;
pub mod topology;

// Re-exports for convenience
pub use parse::{MergePolicy, ParseConfig, parse_skeletons, parse_views};
pub use recognizer::{EngineConfig, PoseEngine, PoseTensors, process_frame, start_pose_worker};
#[cfg(feature = "onnx")]
pub use recognizer::{OrtEngine, start_ort_worker};
pub use skeleton::{draw_frame_index, draw_poses, label_font};
pub use topology::{Edge, HUMAN_POSE_KEYPOINTS, Topology};
