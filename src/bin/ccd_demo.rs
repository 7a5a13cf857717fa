use anyhow::Result;
use clap::Parser;
use hand_retarget::ccd::{CcdChain, CcdOptions};
use nalgebra::Vector3;
use tracing_subscriber::EnvFilter;

/// Steps a four-link CCD chain toward a target
#[derive(Parser, Debug)]
#[command(name = "ccd_demo")]
struct Cli {
    /// Target position X Y Z; a point in reach of the chain when omitted
    #[arg(num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    target: Vec<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let target = match cli.target.as_slice() {
        [x, y, z] => Vector3::new(*x, *y, *z),
        _ => Vector3::new(8.0, 4.0, 6.0),
    };

    let mut chain = CcdChain::new(Vector3::new(0.0, -12.0, 0.0))
        .with_link(Vector3::zeros(), true)
        .with_link(Vector3::new(0.0, 8.0, 0.0), true)
        .with_link(Vector3::new(0.0, 8.0, 0.0), true)
        .with_link(Vector3::new(0.0, 8.0, 0.0), true);

    println!("Target: ({:.2}, {:.2}, {:.2})", target.x, target.y, target.z);
    for step in 1..=10 {
        let report = chain.solve(
            &target,
            &CcdOptions {
                iterations: 1,
                ..CcdOptions::default()
            },
        );
        let effector = chain.effector_position();
        println!(
            "  step {:2}: effector ({:.3}, {:.3}, {:.3}), distance {:.4}",
            step, effector.x, effector.y, effector.z, report.distance
        );
        if report.iterations == 0 {
            break;
        }
    }

    for (i, link) in chain.links.iter().enumerate() {
        let (axis, angle) = link
            .rotation
            .axis_angle()
            .map(|(axis, angle)| (axis.into_inner(), angle))
            .unwrap_or((Vector3::zeros(), 0.0));
        tracing::info!(
            "link {}: {:.3} rad about ({:.3}, {:.3}, {:.3})",
            i,
            angle,
            axis.x,
            axis.y,
            axis.z
        );
    }

    Ok(())
}
