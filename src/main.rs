// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use hand_retarget::data::SessionRecorder;
use hand_retarget::joint_anim::{JointAnimator, DEFAULT_DURATION};
use hand_retarget::simulation::simulated_frame;
use hand_retarget::{
    Handedness, HandTrackingResult, RetargetConfig, RetargetPipeline, RobotHandMetadata,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Retargets recorded or simulated hand tracking onto a robot hand model
#[derive(Parser, Debug)]
#[command(name = "hand_retarget", about = "Hand-tracking to robot-hand retargeting")]
struct Cli {
    /// Retargeting config (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hand model metadata (JSON); the built-in Linker L10 when omitted
    #[arg(long)]
    model: Option<PathBuf>,

    /// Recorded detector output: a JSON array of frames
    #[arg(long)]
    recording: Option<PathBuf>,

    /// Number of simulated frames when no recording is given
    #[arg(long, default_value_t = 600)]
    frames: usize,

    /// Session output directory (overrides the config)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => RetargetConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RetargetConfig::default(),
    };
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_directory.clone());
    let rate = config.reference_rate_hz;

    let mut pipeline = RetargetPipeline::new(config)?;
    match &args.model {
        Some(path) => {
            let metadata = RobotHandMetadata::from_json_file(path)
                .with_context(|| format!("Failed to read hand model {}", path.display()))?;
            pipeline.load_model(Arc::new(metadata))?;
        }
        None => pipeline.load_builtin("linker-l10-right")?,
    }

    let frames: Vec<Vec<HandTrackingResult>> = match &args.recording {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read recording {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Malformed recording {}", path.display()))?
        }
        None => {
            let count = args.frames;
            tracing::info!("No recording given, simulating {} frames", count);
            (0..count)
                .map(|i| simulated_frame(i as f64 / rate, Handedness::Right))
                .collect()
        }
    };

    let dt = Duration::from_secs_f64(1.0 / rate);
    let joint_names: Vec<String> = pipeline
        .hand_state()
        .map(|state| state.joint_names().to_vec())
        .unwrap_or_default();
    let mut next_joint = joint_names.iter().cycle();
    let mut animator = JointAnimator::new();
    let mut recorder = SessionRecorder::new(&output_dir, None);
    let mut skipped = 0;

    for (i, hands) in frames.iter().enumerate() {
        if let Some(model) = pipeline.model_mut() {
            if animator.active_count() == 0 {
                if let Some(joint) = next_joint.next() {
                    animator.start(&model.state, joint, DEFAULT_DURATION)?;
                }
            }
            animator.update(&mut model.state, dt);
            model.sync_skeleton();
        }

        let output = pipeline.tick(hands, Some(dt));
        if output.skip_reason().is_some() {
            skipped += 1;
        }
        recorder.add_frame(&output, pipeline.hand_state(), i as f64 * dt.as_secs_f64());
    }

    let pose = pipeline.root_pose();
    tracing::info!(
        "Processed {} frames ({} skipped), final root rotation {:.3} rad",
        frames.len(),
        skipped,
        pose.rotation.angle()
    );

    let csv_path = recorder.export_csv().context("Failed to export session data")?;
    let json_path = recorder
        .export_joint_values()
        .context("Failed to export joint values")?;
    println!("Session data: {}", csv_path.display());
    println!("Joint values: {}", json_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn options_parse_with_defaults() {
        let cli = Cli::try_parse_from(["hand_retarget", "--model", "hand.json", "--output", "out"])
            .unwrap();
        assert_eq!(cli.model, Some(PathBuf::from("hand.json")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.frames, 600);
        assert!(cli.config.is_none() && cli.recording.is_none());
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["hand_retarget", "--frames"]).is_err());
        assert!(Cli::try_parse_from(["hand_retarget", "--frames", "many"]).is_err());
        assert!(Cli::try_parse_from(["hand_retarget", "--speed", "2"]).is_err());
    }
}
