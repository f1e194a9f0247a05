//! Resource Compilation
//!
//! Two invocations of the resource packager sharing argument shape: one
//! generates the package-qualified stub source, one packages the resource
//! archive. Resource roots are ordered; later roots win on identifier
//! collisions, so their `-S` flags are emitted first (the packager gives
//! earlier search paths precedence).

use std::path::PathBuf;

use tracing::info;

use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::Result;

/// Wraps the external resource packager.
pub struct ResourceCompiler {
    aapt: PathBuf,
    manifest: PathBuf,
    /// Ordered resource roots, later wins
    resource_dirs: Vec<PathBuf>,
    platform_jar: PathBuf,
    gen_dir: PathBuf,
    stub_path: PathBuf,
    archive_path: PathBuf,
    extra_flags: Vec<String>,
}

impl ResourceCompiler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aapt: PathBuf,
        manifest: PathBuf,
        resource_dirs: Vec<PathBuf>,
        platform_jar: PathBuf,
        gen_dir: PathBuf,
        stub_path: PathBuf,
        archive_path: PathBuf,
        extra_flags: Vec<String>,
    ) -> Self {
        Self {
            aapt,
            manifest,
            resource_dirs,
            platform_jar,
            gen_dir,
            stub_path,
            archive_path,
            extra_flags,
        }
    }

    pub fn stub_path(&self) -> &PathBuf {
        &self.stub_path
    }

    pub fn archive_path(&self) -> &PathBuf {
        &self.archive_path
    }

    /// Generate the package-qualified stub source.
    pub async fn generate_stub(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        info!(stub = %self.stub_path.display(), "generating resource stub");
        let invocation = self
            .base_invocation()
            .arg("-J")
            .arg(self.gen_dir.to_string_lossy())
            .args(self.source_flags())
            .output(self.stub_path.clone());
        invoker.invoke(&invocation).await?;
        Ok(())
    }

    /// Package the resource archive.
    pub async fn package(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        info!(archive = %self.archive_path.display(), "packaging resources");
        let invocation = self
            .base_invocation()
            .arg("-F")
            .arg(self.archive_path.to_string_lossy())
            .args(self.source_flags())
            .output(self.archive_path.clone());
        invoker.invoke(&invocation).await?;
        Ok(())
    }

    fn base_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(ToolKind::Aapt, self.aapt.clone())
            .arg("package")
            .args(["-f", "-m"])
            .arg("-M")
            .arg(self.manifest.to_string_lossy())
            .arg("-I")
            .arg(self.platform_jar.to_string_lossy())
            .args(self.extra_flags.iter().cloned())
            .input(self.manifest.clone())
    }

    /// `-S` flags in reverse declaration order, plus the inputs they imply.
    fn source_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for dir in self.resource_dirs.iter().rev() {
            flags.push("-S".to_string());
            flags.push(dir.to_string_lossy().to_string());
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> ResourceCompiler {
        ResourceCompiler::new(
            PathBuf::from("/sdk/platform-tools/aapt"),
            PathBuf::from("/p/AndroidManifest.xml"),
            vec![PathBuf::from("/p/res"), PathBuf::from("/p/res-overlay")],
            PathBuf::from("/sdk/platforms/android-10/android.jar"),
            PathBuf::from("/p/build/gen"),
            PathBuf::from("/p/build/gen/com/example/R.java"),
            PathBuf::from("/p/build/Test.ap_"),
            Vec::new(),
        )
    }

    #[test]
    fn test_later_roots_win() {
        let flags = compiler().source_flags();
        // the packager prefers earlier -S entries, so the later-declared
        // overlay root must come first
        assert_eq!(
            flags,
            vec!["-S", "/p/res-overlay", "-S", "/p/res"]
        );
    }

    #[test]
    fn test_shared_argument_shape() {
        let base = compiler().base_invocation();
        assert_eq!(base.args[0], "package");
        assert!(base.args.contains(&"-M".to_string()));
        assert!(base.args.contains(&"-I".to_string()));
    }
}
