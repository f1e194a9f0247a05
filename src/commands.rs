//! CLI commands for DroidForge
//!
//! Build, install, and run commands for automation and scripting. The
//! install/run glue sits outside the pipeline core but reuses the same
//! tool-invoker seam and error taxonomy.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use droidforge_pipeline::{
    ApkContents, ApkPipeline, BuildConfig, BuildOutcome, ProcessInvoker, ProjectLayout,
    ToolInvocation, ToolInvoker, ToolKind,
};
use droidforge_toolchain::{keys, ConfigurationResolver, SdkTools};

/// Per-project configuration file, optional.
const CONFIG_FILE: &str = "droidforge.toml";

/// Build command options
pub struct BuildCommand {
    pub project_dir: PathBuf,
    pub name: String,
}

impl BuildCommand {
    /// Execute the build command
    pub async fn execute(&self) -> Result<BuildOutcome> {
        info!("Building project: {:?}", self.project_dir);

        let layout = ProjectLayout::conventional(&self.project_dir, &self.name);
        let config = self.load_config().await?;
        let resolver = ConfigurationResolver::from_env();

        let pipeline =
            ApkPipeline::plan(layout, config, &resolver, Arc::new(ProcessInvoker)).await?;
        let outcome = pipeline.build().await?;

        info!(
            "Build successful: {:?} ({} stages run, {} up to date)",
            outcome.apk,
            outcome.executed.len(),
            outcome.skipped.len()
        );

        let contents = ApkContents::read(&outcome.apk)?;
        for (abi, lib) in contents.native_libs() {
            info!("  native: lib/{}/{}", abi, lib);
        }

        Ok(outcome)
    }

    async fn load_config(&self) -> Result<BuildConfig> {
        let path = self.project_dir.join(CONFIG_FILE);
        if path.is_file() {
            info!("Loading build configuration from {:?}", path);
            Ok(BuildConfig::load(&path).await?)
        } else {
            Ok(BuildConfig::default())
        }
    }
}

/// Install command options
pub struct InstallCommand {
    pub project_dir: PathBuf,
    pub name: String,
}

impl InstallCommand {
    /// Build if needed, then install on the connected device
    pub async fn execute(&self) -> Result<PathBuf> {
        let outcome = BuildCommand {
            project_dir: self.project_dir.clone(),
            name: self.name.clone(),
        }
        .execute()
        .await?;

        let resolver = ConfigurationResolver::from_env();
        let sdk = SdkTools::new(resolver.require(keys::ANDROID_SDK)?);

        info!("Installing {:?}", outcome.apk);
        let invocation = ToolInvocation::new(ToolKind::Adb, sdk.adb())
            .args(["install", "-r"])
            .arg(outcome.apk.to_string_lossy())
            .input(outcome.apk.clone());
        ProcessInvoker.invoke(&invocation).await?;

        Ok(outcome.apk)
    }
}

/// Run command options
pub struct RunCommand {
    pub project_dir: PathBuf,
    pub name: String,
}

impl RunCommand {
    /// Build, install, and launch the entry-point activity
    pub async fn execute(&self) -> Result<()> {
        let layout = ProjectLayout::conventional(&self.project_dir, &self.name);
        let config = BuildCommand {
            project_dir: self.project_dir.clone(),
            name: self.name.clone(),
        }
        .load_config()
        .await?;
        let resolver = ConfigurationResolver::from_env();

        let pipeline =
            ApkPipeline::plan(layout, config, &resolver, Arc::new(ProcessInvoker)).await?;
        let outcome = pipeline.build().await?;

        let sdk = SdkTools::new(resolver.require(keys::ANDROID_SDK)?);

        info!("Installing {:?}", outcome.apk);
        let install = ToolInvocation::new(ToolKind::Adb, sdk.adb())
            .args(["install", "-r"])
            .arg(outcome.apk.to_string_lossy())
            .input(outcome.apk.clone());
        ProcessInvoker.invoke(&install).await?;

        let component = pipeline.manifest_info().launch_component();
        info!("Starting {}", component);
        let launch = ToolInvocation::new(ToolKind::Adb, sdk.adb())
            .args(["shell", "am", "start", "-a", "android.intent.action.MAIN", "-n"])
            .arg(component);
        ProcessInvoker.invoke(&launch).await?;

        Ok(())
    }
}
