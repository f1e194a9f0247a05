//! External Tool Invocation
//!
//! Every collaborator runs through the `ToolInvoker` seam: the production
//! implementation spawns the process and captures its output; tests
//! substitute a recording fake to assert exactly which collaborators ran.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{BuildError, Result};

/// Which external collaborator an invocation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Aapt,
    Javac,
    Proguard,
    NativeCompiler,
    NdkBuild,
    Dx,
    ApkBuilder,
    Jarsigner,
    Zipalign,
    Adb,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ToolKind::Aapt => "aapt",
            ToolKind::Javac => "javac",
            ToolKind::Proguard => "proguard",
            ToolKind::NativeCompiler => "native compiler",
            ToolKind::NdkBuild => "ndk-build",
            ToolKind::Dx => "dx",
            ToolKind::ApkBuilder => "apkbuilder",
            ToolKind::Jarsigner => "jarsigner",
            ToolKind::Zipalign => "zipalign",
            ToolKind::Adb => "adb",
        };
        f.write_str(name)
    }
}

/// One collaborator invocation: program, argv, and the inputs/outputs the
/// pipeline attributes to it.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Input paths, for diagnostics
    pub inputs: Vec<PathBuf>,
    /// Declared outputs; parent directories are created before spawning
    pub outputs: Vec<PathBuf>,
}

impl ToolInvocation {
    pub fn new(tool: ToolKind, program: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }
}

/// Captured collaborator output
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The seam through which every collaborator is executed.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Spawns the collaborator as a child process and blocks the invoking
/// stage until it exits. Non-zero exit becomes an `ExternalTool` error
/// carrying the captured diagnostics verbatim.
pub struct ProcessInvoker;

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        for out in &invocation.outputs {
            if let Some(parent) = out.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        debug!(tool = %invocation.tool, program = %invocation.program.display(),
               args = ?invocation.args, "invoking collaborator");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let mut diagnostics = stderr.clone();
            if diagnostics.trim().is_empty() {
                diagnostics = stdout.clone();
            }
            return Err(BuildError::ExternalTool {
                tool: invocation.tool,
                status: output.status.code().unwrap_or(-1),
                diagnostics,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = ToolInvocation::new(ToolKind::Aapt, "/sdk/platform-tools/aapt")
            .arg("package")
            .args(["-f", "-m"])
            .input("/project/res")
            .output("/project/build/Test.ap_");
        assert_eq!(inv.args, vec!["package", "-f", "-m"]);
        assert_eq!(inv.inputs.len(), 1);
        assert_eq!(inv.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_process_invoker_reports_failure() {
        let inv = ToolInvocation::new(ToolKind::Adb, "false");
        let err = ProcessInvoker.invoke(&inv).await.unwrap_err();
        match err {
            BuildError::ExternalTool { tool, status, .. } => {
                assert_eq!(tool, ToolKind::Adb);
                assert_ne!(status, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_process_invoker_captures_stdout() {
        let inv = ToolInvocation::new(ToolKind::Adb, "echo").arg("devices");
        let out = ProcessInvoker.invoke(&inv).await.unwrap();
        assert_eq!(out.stdout.trim(), "devices");
    }
}
