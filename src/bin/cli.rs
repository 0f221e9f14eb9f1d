//! Calibration Client - drive camera/robot calibration sequences
//!
//! This is the CLI entry point for the calibration-client tool.
//! Run with: cargo run --bin calibration-client -- <command>

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use calibration_client::session::{run_session, SessionPlan};
use calibration_client::{
    CalibrationResult, CalibrationSessionClient, ClientSettings, HttpTransport,
    InitializeCalibrationConfig, Pose,
};
use nalgebra::Isometry3;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: calibration-client <command> [args]

Commands:
  init <moving_frame> <fixed_frame> [--camera-moving] [--dump-dir DIR]
                               Start a calibration sequence
  record <x> <y> <z> <qx> <qy> <qz> <qw>
                               Record a sample at the given robot pose
  finalize                     Finish the sequence and print the result
  get                          Print the calibration stored on the camera
  workspace <frame_id> <samples> <x> <y> <z> <qx> <qy> <qz> <qw>
                               Calibrate the workspace to a known pattern pose
  run <plan.json>              Run a complete sequence from a plan file
  save-settings                Write the effective settings to the config directory

Environment:
  CALIBRATION_BASE_URL, CALIBRATION_TIMEOUT_SECS, CALIBRATION_WAIT_FOR_SERVICES,
  CALIBRATION_WAIT_TIMEOUT_SECS, CALIBRATION_STORE, CALIBRATION_NAMESPACE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing, RUST_LOG controls the level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let settings = ClientSettings::load().with_env_overrides();

    if command == "save-settings" {
        let path = settings.save().map_err(|e| anyhow!(e))?;
        println!("Settings written to {}", path.display());
        return Ok(());
    }
    if command == "help" || command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    // Validate the arguments before waiting on the services
    let command = parse_command(command, rest)?;

    let transport = Arc::new(
        HttpTransport::new(settings.http_config()).context("Failed to create HTTP client")?,
    );
    println!("Calibration service: {}", transport.base_url());
    let client = CalibrationSessionClient::connect(
        transport,
        settings.service_names(),
        settings.client_options(),
    )
    .await?;

    match command {
        Command::Init(config) => {
            client.initialize_calibration(&config).await?;
            println!(
                "Calibration sequence initialized (camera {} on '{}', pattern on '{}')",
                if config.camera_moving { "moving" } else { "fixed" },
                config.camera_frame(),
                config.pattern_frame()
            );
        }
        Command::Record(pose) => {
            client.record_calibration(&pose).await?;
            println!("Calibration sample recorded");
        }
        Command::Finalize => {
            let result = client.finalize_calibration().await?;
            print_result(&result);
        }
        Command::Get => {
            let pose = client.get_calibration().await?;
            println!("Stored calibration:");
            print_pose("  pose", &pose);
        }
        Command::Workspace {
            frame_id,
            samples,
            pattern_pose,
        } => {
            let pose = client
                .workspace_calibration(&pattern_pose, &frame_id, samples)
                .await?;
            println!("Workspace calibrated to '{}':", frame_id);
            print_pose("  pose", &pose);
        }
        Command::Run(plan) => {
            println!(
                "Running calibration with {} robot poses ({} -> {})",
                plan.robot_poses.len(),
                plan.moving_frame,
                plan.fixed_frame
            );
            let result = run_session(&client, &plan).await?;
            print_result(&result);
        }
    }

    Ok(())
}

/// A command that talks to the calibration service, with its arguments parsed.
#[derive(Debug)]
enum Command {
    Init(InitializeCalibrationConfig),
    Record(Isometry3<f64>),
    Finalize,
    Get,
    Workspace {
        frame_id: String,
        samples: u32,
        pattern_pose: Isometry3<f64>,
    },
    Run(SessionPlan),
}

fn parse_command(command: &str, args: &[String]) -> anyhow::Result<Command> {
    match command {
        "init" => Ok(Command::Init(parse_init(args)?)),
        "record" => Ok(Command::Record(parse_pose(args)?)),
        "finalize" => Ok(Command::Finalize),
        "get" => Ok(Command::Get),
        "workspace" => {
            if args.len() != 9 {
                bail!("workspace expects <frame_id> <samples> and 7 pose values\n\n{}", USAGE);
            }
            let samples: u32 = args[1]
                .parse()
                .with_context(|| format!("Invalid sample count: {}", args[1]))?;
            Ok(Command::Workspace {
                frame_id: args[0].clone(),
                samples,
                pattern_pose: parse_pose(&args[2..])?,
            })
        }
        "run" => {
            let path = args
                .first()
                .ok_or_else(|| anyhow!("run expects a plan file\n\n{}", USAGE))?;
            let plan = SessionPlan::from_file(path)
                .with_context(|| format!("Failed to load plan {}", path))?;
            Ok(Command::Run(plan))
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn parse_init(args: &[String]) -> anyhow::Result<InitializeCalibrationConfig> {
    let mut frames = Vec::new();
    let mut camera_moving = false;
    let mut dump_dir = String::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--camera-moving" => camera_moving = true,
            "--dump-dir" => {
                dump_dir = iter
                    .next()
                    .ok_or_else(|| anyhow!("--dump-dir expects a directory"))?
                    .clone();
            }
            _ => frames.push(arg.clone()),
        }
    }

    let [moving_frame, fixed_frame]: [String; 2] = frames
        .try_into()
        .map_err(|_| anyhow!("init expects <moving_frame> <fixed_frame>\n\n{}", USAGE))?;

    Ok(InitializeCalibrationConfig::new(camera_moving, moving_frame, fixed_frame).with_dump_dir(dump_dir))
}

/// Parse `x y z qx qy qz qw` into an isometry.
fn parse_pose(args: &[String]) -> anyhow::Result<Isometry3<f64>> {
    if args.len() != 7 {
        bail!("Expected 7 pose values (x y z qx qy qz qw), got {}", args.len());
    }
    let values = args
        .iter()
        .map(|s| s.parse::<f64>().with_context(|| format!("Invalid number: {}", s)))
        .collect::<anyhow::Result<Vec<f64>>>()?;

    let pose = Pose::new(
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5], values[6]],
    );
    Ok(pose.to_isometry())
}

fn print_pose(label: &str, pose: &Isometry3<f64>) {
    let wire = Pose::from_isometry(pose);
    println!(
        "{}: position [{:.6}, {:.6}, {:.6}] orientation [{:.6}, {:.6}, {:.6}, {:.6}]",
        label,
        wire.position.x,
        wire.position.y,
        wire.position.z,
        wire.orientation.x,
        wire.orientation.y,
        wire.orientation.z,
        wire.orientation.w
    );
}

fn print_result(result: &CalibrationResult) {
    println!("Calibration finished");
    print_pose(&format!("  camera ({})", result.camera_frame), &result.camera_pose);
    print_pose(&format!("  pattern ({})", result.pattern_frame), &result.pattern_pose);
    println!("  residual error: {:.6}", result.residual_error);
    if let Some(iterations) = result.iterations {
        println!("  iterations: {}", iterations);
    }
}
