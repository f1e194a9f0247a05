//! Native Library Builds
//!
//! One shared library per requested architecture. In direct mode each
//! architecture gets its own toolchain invocation with per-arch flags and
//! an architecture-qualified output path; invocations are independent
//! until package assembly and may run concurrently. In delegated mode the
//! whole build is handed to the external architecture-aware driver and
//! dependency tracking degrades to the entire native source tree.

use std::path::{Path, PathBuf};

use droidforge_toolchain::{Abi, ArchVariant, NdkToolchain};
use tracing::info;

use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::{BuildError, Result};

/// Wraps the native toolchain and the delegated build driver.
pub struct NativeBuilder {
    ndk: NdkToolchain,
    native_dir: PathBuf,
    variants: Vec<ArchVariant>,
    extra_cflags: Vec<String>,
    libs_dir: PathBuf,
    module: String,
    min_sdk: u32,
    jobs: usize,
}

impl NativeBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ndk: NdkToolchain,
        native_dir: PathBuf,
        variants: Vec<ArchVariant>,
        extra_cflags: Vec<String>,
        libs_dir: PathBuf,
        module: String,
        min_sdk: u32,
        jobs: usize,
    ) -> Self {
        Self {
            ndk,
            native_dir,
            variants,
            extra_cflags,
            libs_dir,
            module,
            min_sdk,
            jobs,
        }
    }

    pub fn variants(&self) -> &[ArchVariant] {
        &self.variants
    }

    pub fn variant(&self, abi: Abi) -> Result<&ArchVariant> {
        self.variants
            .iter()
            .find(|v| v.abi == abi)
            .ok_or_else(|| {
                BuildError::Dependency(format!("no variant configured for {}", abi.as_str()))
            })
    }

    pub fn libs_dir(&self) -> &PathBuf {
        &self.libs_dir
    }

    /// Architecture-qualified library path.
    pub fn lib_path(&self, abi: Abi) -> PathBuf {
        self.libs_dir
            .join(abi.as_str())
            .join(format!("lib{}.so", self.module))
    }

    /// Native sources after glob-style expansion, sorted.
    pub fn sources(&self) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for pattern in ["*.c", "*.cc", "*.cpp", "**/*.c", "**/*.cc", "**/*.cpp"] {
            let full = self.native_dir.join(pattern);
            let matches = glob::glob(&full.to_string_lossy())
                .map_err(|e| BuildError::Dependency(format!("bad native glob: {}", e)))?;
            for path in matches.filter_map(|m| m.ok()) {
                sources.push(path);
            }
        }
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    /// Compile and link one architecture's shared library.
    pub async fn build_variant(
        &self,
        variant: &ArchVariant,
        invoker: &dyn ToolInvoker,
    ) -> Result<PathBuf> {
        let sources = self.sources()?;
        let out = self.lib_path(variant.abi);
        info!(abi = variant.abi.as_str(), lib = %out.display(), "building native library");

        let mut invocation =
            ToolInvocation::new(ToolKind::NativeCompiler, self.ndk.clang(variant))
                .args(variant.cflags.iter().cloned())
                .args(self.extra_cflags.iter().cloned())
                .args(variant.ldflags.iter().cloned())
                .arg("-o")
                .arg(out.to_string_lossy())
                .output(out.clone());
        for source in &sources {
            invocation = invocation
                .arg(source.to_string_lossy())
                .input(source.clone());
        }

        invoker.invoke(&invocation).await?;
        self.verify_produced(&out, variant.abi)?;
        Ok(out)
    }

    /// Hand the whole build, all architectures, to the external driver.
    pub async fn build_delegated(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        let abi_list = self
            .variants
            .iter()
            .map(|v| v.abi.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        info!(abis = %abi_list, "delegating native build");

        let invocation = ToolInvocation::new(ToolKind::NdkBuild, self.ndk.ndk_build())
            .arg("V=1")
            .arg(format!("-j{}", self.jobs.max(1)))
            .arg(format!("APP_PLATFORM=android-{}", self.min_sdk))
            .arg(format!("APP_ABI={}", abi_list))
            .arg(format!("NDK_LIBS_OUT={}", self.libs_dir.display()))
            .arg("-C")
            .arg(self.native_dir.to_string_lossy())
            .input(self.native_dir.clone())
            .output(self.libs_dir.clone());
        invoker.invoke(&invocation).await?;

        // the produced set must exactly equal the requested list
        for variant in &self.variants {
            self.verify_produced(&self.lib_path(variant.abi), variant.abi)?;
        }
        Ok(())
    }

    fn verify_produced(&self, lib: &Path, abi: Abi) -> Result<()> {
        if !lib.is_file() {
            return Err(BuildError::Dependency(format!(
                "native build produced no library for {} at {}",
                abi.as_str(),
                lib.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lib_path_is_architecture_qualified() {
        let builder = NativeBuilder::new(
            NdkToolchain::new("/opt/ndk"),
            PathBuf::from("/p/jni"),
            vec![ArchVariant::new(Abi::X86, 9)],
            Vec::new(),
            PathBuf::from("/p/build/libs"),
            "test".to_string(),
            9,
            2,
        );
        assert_eq!(
            builder.lib_path(Abi::X86),
            PathBuf::from("/p/build/libs/x86/libtest.so")
        );
    }

    #[test]
    fn test_sources_glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "int a;").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.cpp"), "int b;").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let builder = NativeBuilder::new(
            NdkToolchain::new("/opt/ndk"),
            dir.path().to_path_buf(),
            vec![ArchVariant::new(Abi::X86, 9)],
            Vec::new(),
            dir.path().join("libs"),
            "test".to_string(),
            9,
            1,
        );
        let sources = builder.sources().unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.extension().unwrap() != "txt"));
    }
}
