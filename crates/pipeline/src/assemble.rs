//! Package Assembly
//!
//! Merges the bytecode archive, the packaged resources, and every
//! per-architecture native library into one unsigned, unaligned package.
//! Each library lands at `lib/<abi>/<libname>` inside the archive. The
//! assembler tool guarantees deterministic entry ordering for identical
//! inputs, which is what makes the no-op rebuild property observable on
//! the final artifact.

use std::path::PathBuf;

use tracing::info;

use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::Result;

/// Assembler tool entry point inside the SDK support jars.
const APKBUILDER_MAIN: &str = "com.android.sdklib.build.ApkBuilderMain";

/// Wraps the external package assembler.
pub struct PackageAssembler {
    java: PathBuf,
    tool_classpath: String,
    dex: PathBuf,
    resource_archive: PathBuf,
    /// Native library root laid out as `<root>/<abi>/<libname>`
    native_root: Option<PathBuf>,
    native_libs: Vec<PathBuf>,
    output: PathBuf,
    /// Leave the package unsigned for a later signing pass
    unsigned: bool,
}

impl PackageAssembler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        java: PathBuf,
        tool_classpath: String,
        dex: PathBuf,
        resource_archive: PathBuf,
        native_root: Option<PathBuf>,
        native_libs: Vec<PathBuf>,
        output: PathBuf,
        unsigned: bool,
    ) -> Self {
        Self {
            java,
            tool_classpath,
            dex,
            resource_archive,
            native_root,
            native_libs,
            output,
            unsigned,
        }
    }

    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    /// Merge everything into the unsigned, unaligned package.
    pub async fn assemble(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        info!(package = %self.output.display(), "assembling package");

        let mut invocation = ToolInvocation::new(ToolKind::ApkBuilder, self.java.clone())
            .arg("-classpath")
            .arg(&self.tool_classpath)
            .arg(APKBUILDER_MAIN)
            .arg(self.output.to_string_lossy());
        if self.unsigned {
            invocation = invocation.arg("-u");
        }
        invocation = invocation
            .arg("-f")
            .arg(self.dex.to_string_lossy())
            .arg("-z")
            .arg(self.resource_archive.to_string_lossy())
            .input(self.dex.clone())
            .input(self.resource_archive.clone());
        if let Some(ref root) = self.native_root {
            invocation = invocation.arg("-nf").arg(root.to_string_lossy());
        }
        for lib in &self.native_libs {
            invocation = invocation.input(lib.clone());
        }
        invocation = invocation.output(self.output.clone());

        invoker.invoke(&invocation).await?;
        Ok(())
    }
}
