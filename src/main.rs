use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use image::RgbaImage;
use pose_universe::{
    Frame, MergePolicy, ParseConfig, Topology,
    pipeline::{
        EngineConfig, PoseEngine, draw_frame_index, draw_poses, label_font, process_frame,
    },
};

const USAGE: &str = "usage: pose-universe [--model PATH] [--out DIR] [--threshold F] \
[--link-threshold F] [--max-objects N] [--no-merge] IMAGE...";

#[derive(Debug)]
struct Args {
    engine: EngineConfig,
    parse: ParseConfig,
    output_dir: PathBuf,
    inputs: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut engine = EngineConfig::default();
    let mut parse = ParseConfig::human_pose();
    let mut output_dir = PathBuf::from("out");
    let mut inputs = Vec::new();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"))
        };
        match arg.as_str() {
            "--model" => engine.model_path = PathBuf::from(value("--model")?),
            "--out" => output_dir = PathBuf::from(value("--out")?),
            "--threshold" => {
                parse.detection_threshold = value("--threshold")?
                    .parse()
                    .context("--threshold is not a number")?;
            }
            "--link-threshold" => {
                parse.link_threshold = value("--link-threshold")?
                    .parse()
                    .context("--link-threshold is not a number")?;
            }
            "--max-objects" => {
                parse.max_objects = value("--max-objects")?
                    .parse()
                    .context("--max-objects is not a count")?;
            }
            "--no-merge" => parse.merge_policy = MergePolicy::Never,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            path => inputs.push(PathBuf::from(path)),
        }
    }

    parse.validate()?;
    Ok(Args {
        engine,
        parse,
        output_dir,
        inputs,
    })
}

#[cfg(feature = "onnx")]
fn build_engine(config: &EngineConfig) -> Result<Box<dyn PoseEngine>> {
    let engine = pose_universe::pipeline::OrtEngine::new(config)?;
    log::info!("pose ORT backend ready using {}", config.model_path.display());
    Ok(Box::new(engine))
}

#[cfg(not(feature = "onnx"))]
fn build_engine(config: &EngineConfig) -> Result<Box<dyn PoseEngine>> {
    Err(anyhow!(
        "cannot load {}: built without the `onnx` feature",
        config.model_path.display()
    ))
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(image.into_raw(), width, height))
}

fn into_image(frame: Frame) -> Result<RgbaImage> {
    let Frame {
        rgba, width, height, ..
    } = frame;
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("frame buffer does not match {width}x{height}"))
}

fn output_path(output_dir: &Path, input: &Path, frame_index: u64) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    output_dir.join(format!("{frame_index:05}_{stem}.png"))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.inputs.is_empty() {
        eprintln!("{USAGE}");
        return Ok(());
    }

    let topology = Topology::human_pose();
    let font = label_font()?;
    let mut engine = build_engine(&args.engine)?;
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    let mut frame_index: u64 = 0;
    for input in &args.inputs {
        let index = frame_index;
        frame_index += 1;

        let mut frame = load_frame(input)?;
        let poses = match process_frame(&mut engine, &frame, &topology, &args.parse) {
            Ok(poses) => poses,
            Err(err) => {
                log::warn!("pose inference failed on {}: {err:?}", input.display());
                continue;
            }
        };
        log::info!(
            "frame {index}: {} people in {}",
            poses.len(),
            input.display()
        );

        let (width, height) = (frame.width, frame.height);
        draw_poses(&mut frame.rgba, width, height, &poses, &topology);
        let mut image = into_image(frame)?;
        draw_frame_index(&mut image, &font, index);

        let path = output_path(&args.output_dir, input, index);
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}
