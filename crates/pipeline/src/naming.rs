//! Compiled-Unit Output Naming
//!
//! Maps each source file to the compiled-unit paths the compiler will
//! produce, so staleness detection can check the real outputs. The default
//! assumes one unit named after the file. The generated resource stub
//! breaks that assumption: it declares many nested types in one file and
//! lives under a package-qualified subdirectory, so a dedicated strategy
//! statically parses such sources and names one output per declared type.
//! An incorrect mapping causes either missed staleness detection or
//! unconditional rebuilds.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::Result;

/// Strategy selected at graph-construction time; never swapped mid-build.
pub trait OutputNamingStrategy: Send + Sync {
    /// Compiled-unit outputs for one source file.
    fn class_outputs(
        &self,
        source: &Path,
        source_root: &Path,
        classes_dir: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// One `.class` per source, same relative path.
#[derive(Debug, Default)]
pub struct FileNameStrategy;

impl OutputNamingStrategy for FileNameStrategy {
    fn class_outputs(
        &self,
        source: &Path,
        source_root: &Path,
        classes_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let rel = source
            .strip_prefix(source_root)
            .unwrap_or_else(|_| Path::new(source.file_name().unwrap_or_default()));
        Ok(vec![classes_dir.join(rel.with_extension("class"))])
    }
}

/// Stub-aware strategy: sources whose declared package falls under the
/// configured generated package are parsed for every declared type, and
/// one output is named per type under the package path. Everything else
/// falls back to the filename-derived mapping.
#[derive(Debug)]
pub struct GeneratedStubStrategy {
    generated_package: String,
    fallback: FileNameStrategy,
}

impl GeneratedStubStrategy {
    pub fn new(generated_package: impl Into<String>) -> Self {
        Self {
            generated_package: generated_package.into(),
            fallback: FileNameStrategy,
        }
    }
}

impl OutputNamingStrategy for GeneratedStubStrategy {
    fn class_outputs(
        &self,
        source: &Path,
        source_root: &Path,
        classes_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let content = std::fs::read_to_string(source)?;
        let scan = scan_java_source(&content);

        let Some(package) = scan.package.as_deref() else {
            return self.fallback.class_outputs(source, source_root, classes_dir);
        };
        if package != self.generated_package
            && !package.starts_with(&format!("{}.", self.generated_package))
        {
            return self.fallback.class_outputs(source, source_root, classes_dir);
        }

        let package_dir: PathBuf = package.split('.').collect();
        Ok(scan
            .types
            .iter()
            .map(|ty| classes_dir.join(&package_dir).join(format!("{}.class", ty)))
            .collect())
    }
}

/// What a static scan of a Java source reveals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaScan {
    pub package: Option<String>,
    /// Declared type names, nested ones as `Outer$Inner`
    pub types: Vec<String>,
}

/// Scan a Java source for its package declaration and every declared
/// top-level and nested type. Comments and literals are blanked first so
/// braces and keywords inside them do not confuse the walk.
pub fn scan_java_source(source: &str) -> JavaScan {
    let cleaned = blank_comments_and_literals(source);

    let package_re = Regex::new(r"(?m)^\s*package\s+([A-Za-z_][\w.]*)\s*;").unwrap();
    let package = package_re
        .captures(&cleaned)
        .map(|c| c[1].to_string());

    let type_re = Regex::new(r"\b(?:class|interface|enum)\s+([A-Za-z_]\w*)").unwrap();
    let decls: Vec<(usize, String)> = type_re
        .captures_iter(&cleaned)
        .map(|c| {
            let m = c.get(1).unwrap();
            (m.start(), m.as_str().to_string())
        })
        .collect();

    // Walk braces to qualify nested declarations as Outer$Inner.
    let mut types = Vec::new();
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut pending: Option<String> = None;
    let mut depth = 0usize;
    let mut next_decl = 0;

    for (i, ch) in cleaned.char_indices() {
        while next_decl < decls.len() && i >= decls[next_decl].0 {
            let name = &decls[next_decl].1;
            next_decl += 1;
            let qualified = match stack.last() {
                Some((outer, _)) => format!("{}${}", outer, name),
                None => name.clone(),
            };
            types.push(qualified.clone());
            pending = Some(qualified);
        }
        match ch {
            '{' => {
                depth += 1;
                if let Some(name) = pending.take() {
                    stack.push((name, depth));
                }
            }
            '}' => {
                if let Some((_, body_depth)) = stack.last() {
                    if *body_depth == depth {
                        stack.pop();
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    JavaScan { package, types }
}

/// Replace comments and string/char literals with spaces, preserving
/// offsets and newlines.
fn blank_comments_and_literals(source: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        Char,
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                '/' if chars.peek() == Some(&'/') => {
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    out.push(' ');
                }
                '"' => {
                    state = State::Str;
                    out.push(' ');
                }
                '\'' => {
                    state = State::Char;
                    out.push(' ');
                }
                _ => out.push(ch),
            },
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
            }
            State::Str => match ch {
                '\\' => {
                    chars.next();
                    out.push_str("  ");
                }
                '"' => {
                    state = State::Code;
                    out.push(' ');
                }
                _ => out.push(' '),
            },
            State::Char => match ch {
                '\\' => {
                    chars.next();
                    out.push_str("  ");
                }
                '\'' => {
                    state = State::Code;
                    out.push(' ');
                }
                _ => out.push(' '),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUB_SOURCE: &str = r#"
/* AUTO-GENERATED FILE. DO NOT MODIFY. */
package com.example.android;

public final class R {
    public static final class attr {
    }
    public static final class drawable {
        public static final int icon = 0x7f020000;
    }
    public static final class string {
        public static final int app_name = 0x7f040000;
    }
}
"#;

    #[test]
    fn test_scan_finds_nested_types() {
        let scan = scan_java_source(STUB_SOURCE);
        assert_eq!(scan.package.as_deref(), Some("com.example.android"));
        assert_eq!(
            scan.types,
            vec!["R", "R$attr", "R$drawable", "R$string"]
        );
    }

    #[test]
    fn test_scan_ignores_comments_and_strings() {
        let source = r#"
package com.example;
// class NotReal
/* class AlsoNotReal */
public class Real {
    String s = "class Fake {";
}
"#;
        let scan = scan_java_source(source);
        assert_eq!(scan.types, vec!["Real"]);
    }

    #[test]
    fn test_scan_sibling_nested_types() {
        let source = r#"
package com.example;
public class Outer {
    class A { class Deep {} }
    class B {}
}
class Second {}
"#;
        let scan = scan_java_source(source);
        assert_eq!(
            scan.types,
            vec!["Outer", "Outer$A", "Outer$A$Deep", "Outer$B", "Second"]
        );
    }

    #[test]
    fn test_filename_strategy() {
        let strategy = FileNameStrategy;
        let outputs = strategy
            .class_outputs(
                Path::new("/p/src/com/example/Main.java"),
                Path::new("/p/src"),
                Path::new("/p/build/classes"),
            )
            .unwrap();
        assert_eq!(
            outputs,
            vec![PathBuf::from("/p/build/classes/com/example/Main.class")]
        );
    }

    #[test]
    fn test_stub_strategy_names_one_output_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let gen = dir.path().join("gen/com/example/android");
        std::fs::create_dir_all(&gen).unwrap();
        let stub = gen.join("R.java");
        std::fs::write(&stub, STUB_SOURCE).unwrap();

        let strategy = GeneratedStubStrategy::new("com.example.android");
        let outputs = strategy
            .class_outputs(&stub, &dir.path().join("gen"), Path::new("/out"))
            .unwrap();
        let names: Vec<String> = outputs
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "/out/com/example/android/R.class",
                "/out/com/example/android/R$attr.class",
                "/out/com/example/android/R$drawable.class",
                "/out/com/example/android/R$string.class",
            ]
        );
    }

    #[test]
    fn test_stub_strategy_falls_back_outside_generated_package() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Main.java");
        std::fs::write(&src, "package com.other;\npublic class Main {}\n").unwrap();

        let strategy = GeneratedStubStrategy::new("com.example.android");
        let outputs = strategy
            .class_outputs(&src, dir.path(), Path::new("/out"))
            .unwrap();
        assert_eq!(outputs, vec![PathBuf::from("/out/Main.class")]);
    }
}
