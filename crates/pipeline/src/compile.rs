//! Source Compilation
//!
//! Compiles program sources plus the generated stub against the platform
//! library, with the output naming strategy supplying the compiled-unit
//! paths staleness detection checks.

use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::naming::OutputNamingStrategy;
use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::{BuildError, Result};

/// Wraps the external source compiler.
pub struct SourceCompiler {
    javac: PathBuf,
    source_dirs: Vec<PathBuf>,
    gen_dir: PathBuf,
    stub_path: PathBuf,
    classes_dir: PathBuf,
    /// Platform library jar (bootclasspath)
    platform_jar: PathBuf,
    external_jars: Vec<PathBuf>,
    flags: Vec<String>,
    naming: Box<dyn OutputNamingStrategy>,
}

impl SourceCompiler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        javac: PathBuf,
        source_dirs: Vec<PathBuf>,
        gen_dir: PathBuf,
        stub_path: PathBuf,
        classes_dir: PathBuf,
        platform_jar: PathBuf,
        external_jars: Vec<PathBuf>,
        flags: Vec<String>,
        naming: Box<dyn OutputNamingStrategy>,
    ) -> Self {
        Self {
            javac,
            source_dirs,
            gen_dir,
            stub_path,
            classes_dir,
            platform_jar,
            external_jars,
            flags,
            naming,
        }
    }

    pub fn classes_dir(&self) -> &PathBuf {
        &self.classes_dir
    }

    /// Program sources under the source roots, sorted for stable ordering.
    pub fn source_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for dir in &self.source_dirs {
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|e| e == "java")
                {
                    sources.push(entry.into_path());
                }
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Every compiled-unit path this target owns, per the naming strategy:
    /// program sources plus the generated stub.
    pub fn expected_outputs(&self) -> Result<Vec<PathBuf>> {
        let mut outputs = Vec::new();
        for source in self.source_files()? {
            let root = self.root_of(&source);
            outputs.extend(self.naming.class_outputs(&source, root, &self.classes_dir)?);
        }
        if self.stub_path.is_file() {
            outputs.extend(
                self.naming
                    .class_outputs(&self.stub_path, &self.gen_dir, &self.classes_dir)?,
            );
        }
        outputs.sort();
        Ok(outputs)
    }

    /// Run the compiler over all sources.
    pub async fn compile(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        let sources = self.source_files()?;
        info!(count = sources.len(), "compiling sources");

        let sep = if cfg!(windows) { ";" } else { ":" };
        let classpath = std::iter::once(self.classes_dir.clone())
            .chain(self.external_jars.iter().cloned())
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(sep);

        let mut invocation = ToolInvocation::new(ToolKind::Javac, self.javac.clone())
            .args(self.flags.iter().cloned())
            .arg("-bootclasspath")
            .arg(self.platform_jar.to_string_lossy())
            .arg("-classpath")
            .arg(classpath)
            .arg("-sourcepath")
            .arg(self.gen_dir.to_string_lossy())
            .arg("-d")
            .arg(self.classes_dir.to_string_lossy())
            .output(self.classes_dir.clone());
        for source in &sources {
            invocation = invocation
                .arg(source.to_string_lossy())
                .input(source.clone());
        }
        if self.stub_path.is_file() {
            invocation = invocation
                .arg(self.stub_path.to_string_lossy())
                .input(self.stub_path.clone());
        }

        invoker.invoke(&invocation).await.map_err(|err| match err {
            BuildError::ExternalTool {
                tool: ToolKind::Javac,
                diagnostics,
                ..
            } => BuildError::Compile {
                source_set: self
                    .source_dirs
                    .first()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "<no source roots>".to_string()),
                diagnostics,
            },
            other => other,
        })?;
        Ok(())
    }

    fn root_of<'a>(&'a self, source: &Path) -> &'a Path {
        self.source_dirs
            .iter()
            .find(|root| source.starts_with(root))
            .map(PathBuf::as_path)
            .unwrap_or(&self.gen_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::GeneratedStubStrategy;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_expected_outputs_cover_sources_and_stub() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let gen = dir.path().join("build/gen");
        let classes = dir.path().join("build/classes");

        write(
            &src.join("com/example/android/MyActivity.java"),
            "package com.example.android;\npublic class MyActivity {}\n",
        );
        write(
            &gen.join("com/example/android/R.java"),
            "package com.example.android;\npublic final class R {\n  public static final class drawable {}\n}\n",
        );

        let compiler = SourceCompiler::new(
            PathBuf::from("javac"),
            vec![src.clone()],
            gen.clone(),
            gen.join("com/example/android/R.java"),
            classes.clone(),
            PathBuf::from("/sdk/android.jar"),
            Vec::new(),
            vec!["-g".to_string()],
            Box::new(GeneratedStubStrategy::new("com.example.android")),
        );

        let outputs = compiler.expected_outputs().unwrap();
        assert!(outputs.contains(&classes.join("com/example/android/MyActivity.class")));
        assert!(outputs.contains(&classes.join("com/example/android/R.class")));
        assert!(outputs.contains(&classes.join("com/example/android/R$drawable.class")));
        assert_eq!(outputs.len(), 3);
    }
}
