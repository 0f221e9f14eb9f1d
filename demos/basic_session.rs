//! Basic calibration session against a running calibration service.

use std::sync::Arc;

use calibration_client::{
    CalibrationSessionClient, ClientOptions, HttpTransport, HttpTransportConfig,
    InitializeCalibrationConfig, Pose, ServiceNames,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    // Point the transport at the service host
    let transport = Arc::new(HttpTransport::new(
        HttpTransportConfig::default()
            .with_base_url("http://localhost:8090")
            .with_timeout(60),
    )?);

    // Only the required services are configured here
    let options = ClientOptions::default().with_wait_for_services(true);
    let client = CalibrationSessionClient::connect(transport, ServiceNames::default(), options).await?;

    // Camera mounted on the robot flange, pattern somewhere in the cell
    let config = InitializeCalibrationConfig::new(true, "tool0", "base_link")
        .with_dump_dir("/tmp/calibration");
    client.initialize_calibration(&config).await?;

    let robot_poses = [
        Pose::new([0.40, 0.00, 0.50], [0.0, 0.0, 0.0, 1.0]),
        Pose::new([0.40, 0.10, 0.50], [0.0, 0.0, 0.0998, 0.9950]),
        Pose::new([0.35, -0.10, 0.55], [0.0998, 0.0, 0.0, 0.9950]),
        Pose::new([0.45, 0.05, 0.45], [0.0, 0.0998, 0.0, 0.9950]),
    ];

    for (i, pose) in robot_poses.iter().enumerate() {
        println!("Recording sample {}/{}", i + 1, robot_poses.len());
        if let Err(e) = client.record_calibration(&pose.to_isometry()).await {
            eprintln!("Recording failed: {}", e);
            return Ok(());
        }
    }

    match client.finalize_calibration().await {
        Ok(result) => {
            println!("Calibration finished");
            println!("  camera pose ({}): {}", result.camera_frame, result.camera_pose);
            println!("  pattern pose ({}): {}", result.pattern_frame, result.pattern_pose);
            println!("  residual error: {}", result.residual_error);
        }
        Err(e) => {
            eprintln!("Calibration failed: {}", e);
        }
    }

    Ok(())
}
