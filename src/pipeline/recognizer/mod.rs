mod common;
#[cfg(feature = "onnx")]
mod ort;

use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};

pub use self::common::{
    EngineConfig, INPUT_SIZE, PoseTensors, default_model_path, prepare_frame,
    prepare_frame_with_size, tensors_from_outputs,
};
#[cfg(feature = "onnx")]
pub use self::ort::{OrtEngine, start_ort_worker};
use crate::{
    pipeline::{
        parse::{ParseConfig, parse_views},
        topology::Topology,
    },
    types::{Frame, ParsedPoses, PoseResult},
};

/// Turns a frame into raw confidence-map and affinity-field tensors.
pub trait PoseEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> Result<PoseTensors>;
}

impl<E: PoseEngine + ?Sized> PoseEngine for Box<E> {
    fn infer(&mut self, frame: &Frame) -> Result<PoseTensors> {
        (**self).infer(frame)
    }
}

pub fn process_frame<E: PoseEngine + ?Sized>(
    engine: &mut E,
    frame: &Frame,
    topology: &Topology,
    config: &ParseConfig,
) -> Result<ParsedPoses> {
    let tensors = engine.infer(frame)?;
    parse_views(tensors.cmap.view(), tensors.paf.view(), topology, config)
        .context("failed to parse pose tensors")
}

/// Consumes frames until the sender hangs up or the result receiver is gone.
///
/// Every frame pulled from the channel takes the next frame index, so a frame
/// that fails inference leaves a gap in the emitted indices.
pub(crate) fn run_worker_loop<E: PoseEngine>(
    mut engine: E,
    topology: Topology,
    config: ParseConfig,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<PoseResult>,
) {
    let mut frame_index: u64 = 0;

    while let Some(frame) = recv_latest_frame(&frame_rx) {
        let index = frame_index;
        frame_index += 1;

        match process_frame(&mut engine, &frame, &topology, &config) {
            Ok(poses) => {
                let result = PoseResult {
                    frame_index: index,
                    frame,
                    poses,
                };
                if result_tx.send(result).is_err() {
                    log::debug!("pose result receiver dropped, stopping worker");
                    break;
                }
            }
            Err(err) => {
                log::warn!("pose inference failed on frame {index}: {err:?}");
            }
        }
    }
}

fn recv_latest_frame(frame_rx: &Receiver<Frame>) -> Option<Frame> {
    let mut frame = frame_rx.recv().ok()?;
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    Some(frame)
}

pub fn start_pose_worker<E: PoseEngine>(
    engine: E,
    topology: Topology,
    config: ParseConfig,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<PoseResult>,
) -> thread::JoinHandle<()> {
    log::info!(
        "starting pose worker with {} limbs and {} objects max",
        topology.len(),
        config.max_objects
    );

    thread::spawn(move || run_worker_loop(engine, topology, config, frame_rx, result_tx))
}
