use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::{Array3, Array4};
use rayon::prelude::*;

use crate::types::Frame;

pub const INPUT_SIZE: u32 = 224;
const MODEL_FILENAME: &str = "pose_estimation.onnx";
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

pub fn default_model_path() -> PathBuf {
    PathBuf::from("models").join(MODEL_FILENAME)
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub intra_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_size: INPUT_SIZE,
            intra_threads: 2,
        }
    }
}

/// Raw network output for one frame, batch dimension removed.
#[derive(Clone, Debug)]
pub struct PoseTensors {
    pub cmap: Array3<f32>,
    pub paf: Array3<f32>,
}

pub fn prepare_frame(frame: &Frame) -> Result<Array4<f32>> {
    prepare_frame_with_size(frame, INPUT_SIZE)
}

/// Stretches the frame to `target_size` square and normalizes it with the
/// ImageNet statistics into a `[1, 3, size, size]` tensor.
pub fn prepare_frame_with_size(frame: &Frame, target_size: u32) -> Result<Array4<f32>> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }
    if target_size == 0 {
        return Err(anyhow!("model input size must be positive"));
    }

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(target_size, target_size, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let side = target_size as usize;
    let plane = side * side;
    let mut data = vec![0.0_f32; 3 * plane];
    data.par_chunks_mut(plane)
        .enumerate()
        .for_each(|(channel, dst)| {
            for (value, px) in dst.iter_mut().zip(resized.chunks_exact(4)) {
                *value = (px[channel] as f32 / 255.0 - MEAN[channel]) / STD[channel];
            }
        });

    Array4::<f32>::from_shape_vec((1, 3, side, side), data)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))
}

/// Builds [`PoseTensors`] from flattened network outputs shaped
/// `[channels, height, width]` or `[1, channels, height, width]`.
pub fn tensors_from_outputs(
    cmap: Vec<f32>,
    cmap_shape: &[usize],
    paf: Vec<f32>,
    paf_shape: &[usize],
) -> Result<PoseTensors> {
    let cmap_dims = squeeze_batch(cmap_shape).context("bad confidence map output")?;
    let paf_dims = squeeze_batch(paf_shape).context("bad affinity field output")?;

    let cmap = Array3::from_shape_vec(cmap_dims, cmap)
        .map_err(|err| anyhow!("failed to build confidence map: {err}"))?;
    let paf = Array3::from_shape_vec(paf_dims, paf)
        .map_err(|err| anyhow!("failed to build affinity field: {err}"))?;
    Ok(PoseTensors { cmap, paf })
}

fn squeeze_batch(shape: &[usize]) -> Result<(usize, usize, usize)> {
    match shape {
        [c, h, w] | [1, c, h, w] => Ok((*c, *h, *w)),
        _ => Err(anyhow!(
            "unexpected output shape {shape:?}, need [channels, height, width] with optional batch of 1"
        )),
    }
}
