//! Obfuscation Pass
//!
//! Optional shrink/rename step between compilation and bytecode
//! conversion. When configured, the obfuscated archive supersedes the raw
//! compiled-unit directory as the converter's input.

use std::path::PathBuf;

use tracing::info;

use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::Result;

/// Wraps the external obfuscator.
pub struct Obfuscator {
    proguard: PathBuf,
    classes_dir: PathBuf,
    platform_jar: PathBuf,
    external_jars: Vec<PathBuf>,
    config_files: Vec<PathBuf>,
    output_jar: PathBuf,
}

impl Obfuscator {
    pub fn new(
        proguard: PathBuf,
        classes_dir: PathBuf,
        platform_jar: PathBuf,
        external_jars: Vec<PathBuf>,
        config_files: Vec<PathBuf>,
        output_jar: PathBuf,
    ) -> Self {
        Self {
            proguard,
            classes_dir,
            platform_jar,
            external_jars,
            config_files,
            output_jar,
        }
    }

    pub fn output_jar(&self) -> &PathBuf {
        &self.output_jar
    }

    pub fn config_files(&self) -> &[PathBuf] {
        &self.config_files
    }

    /// Shrink and rename the compiled units into the obfuscated archive.
    pub async fn run(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        info!(out = %self.output_jar.display(), "obfuscating compiled units");

        let mut invocation = ToolInvocation::new(ToolKind::Proguard, self.proguard.clone());
        for config in &self.config_files {
            invocation = invocation
                .arg(format!("@{}", config.display()))
                .input(config.clone());
        }
        invocation = invocation
            .arg("-injars")
            .arg(self.classes_dir.to_string_lossy())
            .arg("-outjars")
            .arg(self.output_jar.to_string_lossy())
            .arg("-libraryjars")
            .arg(self.platform_jar.to_string_lossy())
            .input(self.classes_dir.clone())
            .output(self.output_jar.clone());
        for jar in &self.external_jars {
            invocation = invocation
                .arg("-libraryjars")
                .arg(jar.to_string_lossy())
                .input(jar.clone());
        }

        invoker.invoke(&invocation).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_files_precede_jar_options() {
        let obfuscator = Obfuscator::new(
            PathBuf::from("proguard"),
            PathBuf::from("/p/build/classes"),
            PathBuf::from("/sdk/android.jar"),
            Vec::new(),
            vec![PathBuf::from("/p/proguard-project.txt")],
            PathBuf::from("/p/build/proguard/Testobfuscated.jar"),
        );
        assert_eq!(obfuscator.config_files().len(), 1);
        assert!(obfuscator
            .output_jar()
            .to_string_lossy()
            .ends_with("Testobfuscated.jar"));
    }
}
