//! DroidForge - Dependency-Driven APK Build Pipeline
//!
//! Main entry point: initializes logging and dispatches the build,
//! install, and run commands.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use droidforge::commands::{BuildCommand, InstallCommand, RunCommand};
use droidforge::{APP_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("{} v{}", APP_NAME, VERSION);

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("build");
    let project_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = args
        .get(3)
        .cloned()
        .or_else(|| project_name(&project_dir))
        .unwrap_or_else(|| "app".to_string());

    let result = match command {
        "build" => BuildCommand { project_dir, name }.execute().await.map(|_| ()),
        "install" => InstallCommand { project_dir, name }
            .execute()
            .await
            .map(|_| ()),
        "run" => RunCommand { project_dir, name }.execute().await,
        other => {
            error!("Unknown command: {}", other);
            info!("Available commands:");
            info!("  build [project-dir] [name]    Build the APK");
            info!("  install [project-dir] [name]  Build and install on device");
            info!("  run [project-dir] [name]      Build, install, and launch");
            return Ok(());
        }
    };

    if let Err(err) = result {
        error!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

/// Derive an application name from the project directory.
fn project_name(project_dir: &PathBuf) -> Option<String> {
    project_dir
        .canonicalize()
        .ok()?
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
}
