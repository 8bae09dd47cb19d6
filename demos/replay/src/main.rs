use clap::Parser;
use log::{info, warn};
use mocap_rs::{
    evaluation::ReconstructionError,
    mocap_core::common::{errors::Result, hand_template::HandTemplate, markers::MarkerMap},
    mocap_utils::vector::Vector3f,
    simulation::{OcclusionCount, OcclusionSimulator},
    tracker::HandTracker,
};
use nalgebra as na;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = "Replays a synthetic hand motion with random occlusions and reports the reconstruction error")]
struct Args {
    /// Tracker configuration (TOML)
    #[arg(short, long, default_value = "demos/replay/config/hand.toml")]
    config: PathBuf,
    /// Number of frames to replay
    #[arg(short, long, default_value_t = 600)]
    frames: usize,
    /// Capture rate in Hz
    #[arg(long, default_value_t = 120.0)]
    fps: f32,
    /// Seed of the occlusion simulator
    #[arg(short, long, default_value_t = 1)]
    seed: u64,
    /// Occlude exactly this many markers per frame instead of 1-4 at random
    #[arg(short, long)]
    occlusions: Option<usize>,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

/// World positions of the markers at time `t`: the bind pose carried by a
/// slow wrist motion, with the finger markers curling on top of it
fn synthetic_frame(template: &HandTemplate, t: f32) -> MarkerMap {
    let rotation = na::UnitQuaternion::from_euler_angles(0.3 * (0.7 * t).sin(), 0.5 * t.sin(), 0.2 * (1.3 * t).cos());
    let translation = Vector3f::new(0.1 * t.sin(), 1.0 + 0.05 * (2.0 * t).sin(), 0.3);
    template
        .markers()
        .iter()
        .enumerate()
        .map(|(idx, marker)| {
            let mut local = template.initial_position_at(idx);
            if !template.is_alignment_marker(marker) {
                #[allow(clippy::cast_precision_loss)]
                let phase = idx as f32;
                local.z += 0.015 * (3.0 * t + phase).sin();
            }
            (marker.clone(), rotation * local + translation)
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new().filter_level(args.log_level).parse_default_env().init();

    let mut tracker = HandTracker::from_file(&args.config)?;
    let template = tracker.template().clone();
    let universe = template.markers().to_vec();
    let count = args.occlusions.map_or(OcclusionCount::Weighted, |n| OcclusionCount::Range(n, n));
    let mut simulator = OcclusionSimulator::with_count(args.seed, count);
    let mut error = ReconstructionError::new();
    let dt = 1.0 / args.fps;

    println!("- Config: {:?}", args.config);
    println!("- Markers: {}", universe.join(", "));
    println!("- Frames: {} at {} Hz, occlusions: {:?}", args.frames, args.fps, count);

    for frame_idx in 0..args.frames {
        #[allow(clippy::cast_precision_loss)]
        let t = frame_idx as f32 * dt;
        let truth = synthetic_frame(&template, t);
        let mut frame = truth.clone();
        // the first frame initializes the tracker and must be complete
        let hidden = if frame_idx == 0 {
            Default::default()
        } else {
            simulator.occlude(&mut frame, &universe)
        };
        let joints = tracker.update(&mut frame, dt)?;
        let resolved = error.add_frame(&frame, &truth, &hidden);
        if resolved < hidden.len() {
            warn!("frame {frame_idx}: {} of {} occluded markers unresolved", hidden.len() - resolved, hidden.len());
        }
        if let Some(joints) = joints {
            log::trace!("frame {frame_idx}: {} joint rotations", joints.len());
        }
    }

    match (error.rmse(), error.mae()) {
        (Some(rmse), Some(mae)) => {
            info!("reconstruction error over {} coordinates", error.count());
            println!("- RMSE: {:.3} cm", rmse * 100.0);
            println!("- MAE: {:.3} cm", mae * 100.0);
        }
        _ => println!("- No occluded marker was evaluated"),
    }
    Ok(())
}
