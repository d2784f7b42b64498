use std::thread;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    PoseEngine,
    common::{self, EngineConfig, PoseTensors},
    run_worker_loop,
};
use crate::{
    pipeline::{parse::ParseConfig, topology::Topology},
    types::{Frame, PoseResult},
};

/// Loads the model on the worker thread and runs the pose loop on it.
pub fn start_ort_worker(
    engine_config: EngineConfig,
    topology: Topology,
    config: ParseConfig,
    frame_rx: Receiver<Frame>,
    result_tx: Sender<PoseResult>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let engine = match OrtEngine::new(&engine_config) {
            Ok(engine) => {
                log::info!(
                    "pose ORT backend ready using {}",
                    engine_config.model_path.display()
                );
                engine
            }
            Err(err) => {
                log::error!("failed to load ORT pose model: {err:?}");
                return;
            }
        };

        run_worker_loop(engine, topology, config, frame_rx, result_tx);
    })
}

pub struct OrtEngine {
    session: Session,
    input_size: u32,
}

impl OrtEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?
            .commit_from_file(&config.model_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    config.model_path.display()
                )
            })?;

        Ok(Self {
            session,
            input_size: config.input_size,
        })
    }
}

impl PoseEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<PoseTensors> {
        let input = common::prepare_frame_with_size(frame, self.input_size)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        // output 0 is the confidence map, output 1 the affinity field
        if outputs.len() < 2 {
            return Err(anyhow!(
                "pose model returned {} outputs, need 2",
                outputs.len()
            ));
        }

        let cmap = outputs[0].try_extract_array::<f32>()?;
        let cmap_shape = cmap.shape().to_vec();
        let cmap_data: Vec<f32> = cmap.iter().copied().collect();

        let paf = outputs[1].try_extract_array::<f32>()?;
        let paf_shape = paf.shape().to_vec();
        let paf_data: Vec<f32> = paf.iter().copied().collect();

        common::tensors_from_outputs(cmap_data, &cmap_shape, paf_data, &paf_shape)
    }
}
