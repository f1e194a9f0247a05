//! Build Graph
//!
//! Targets and artifacts constructed once per build invocation. Each
//! artifact has exactly one producer and the producer graph is acyclic;
//! both invariants are enforced here, at construction time, so a broken
//! graph is never discovered mid-execution.

use std::collections::VecDeque;
use std::path::PathBuf;

use droidforge_toolchain::Abi;

use crate::{BuildError, Result};

/// Index of an artifact in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(usize);

/// Index of a target in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

/// What kind of build step a target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    ResourceStub,
    ResourcePackage,
    Compile,
    Obfuscate,
    NativeLib(Abi),
    NativeDelegated,
    Dex,
    Assemble,
    Sign,
    Align,
}

/// How an artifact is fingerprinted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A single file
    File,
    /// A whole directory tree
    Tree,
    /// The compiled-unit set enumerated by the output naming strategy
    ClassSet,
}

/// A produced (or source) file with its fingerprinting rule and producer.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Producing target; `None` for source artifacts
    pub producer: Option<TargetId>,
}

/// A named build step with ordered inputs and its owned outputs.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    pub name: String,
    pub kind: TargetKind,
    pub inputs: Vec<ArtifactId>,
    pub outputs: Vec<ArtifactId>,
}

/// The per-invocation dependency graph.
#[derive(Debug, Default)]
pub struct BuildGraph {
    artifacts: Vec<Artifact>,
    targets: Vec<BuildTarget>,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source artifact (no producer).
    pub fn source(&mut self, path: impl Into<PathBuf>, kind: ArtifactKind) -> ArtifactId {
        self.artifacts.push(Artifact {
            path: path.into(),
            kind,
            producer: None,
        });
        ArtifactId(self.artifacts.len() - 1)
    }

    /// Register an artifact to be produced by a later `add_target` call.
    pub fn produced(&mut self, path: impl Into<PathBuf>, kind: ArtifactKind) -> ArtifactId {
        self.source(path, kind)
    }

    /// Add a target, claiming its outputs. Rejects unresolved artifact
    /// references and double-produced artifacts.
    pub fn add_target(
        &mut self,
        name: impl Into<String>,
        kind: TargetKind,
        inputs: Vec<ArtifactId>,
        outputs: Vec<ArtifactId>,
    ) -> Result<TargetId> {
        let name = name.into();
        let id = TargetId(self.targets.len());

        for &ArtifactId(a) in inputs.iter().chain(outputs.iter()) {
            if a >= self.artifacts.len() {
                return Err(BuildError::Dependency(format!(
                    "target {} references unresolved artifact #{}",
                    name, a
                )));
            }
        }
        for &ArtifactId(out) in &outputs {
            if let Some(TargetId(existing)) = self.artifacts[out].producer {
                return Err(BuildError::Dependency(format!(
                    "artifact {} already produced by {}",
                    self.artifacts[out].path.display(),
                    self.targets[existing].name
                )));
            }
            self.artifacts[out].producer = Some(id);
        }

        self.targets.push(BuildTarget {
            name,
            kind,
            inputs,
            outputs,
        });
        Ok(id)
    }

    pub fn artifact(&self, ArtifactId(id): ArtifactId) -> &Artifact {
        &self.artifacts[id]
    }

    pub fn target(&self, TargetId(id): TargetId) -> &BuildTarget {
        &self.targets[id]
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &BuildTarget)> {
        self.targets.iter().enumerate().map(|(i, t)| (TargetId(i), t))
    }

    /// Targets whose outputs feed a target's inputs.
    fn dependencies(&self, target: &BuildTarget) -> Vec<TargetId> {
        let mut deps: Vec<TargetId> = target
            .inputs
            .iter()
            .filter_map(|&a| self.artifact(a).producer)
            .collect();
        deps.sort_by_key(|&TargetId(i)| i);
        deps.dedup();
        deps
    }

    /// Validate acyclicity and return an execution order (dependencies
    /// first). A cycle is a `DependencyError`.
    pub fn execution_order(&self) -> Result<Vec<TargetId>> {
        let n = self.targets.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, target) in self.targets.iter().enumerate() {
            for TargetId(dep) in self.dependencies(target) {
                indegree[i] += 1;
                dependents[dep].push(i);
            }
        }

        let mut queue: VecDeque<usize> =
            (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = queue.pop_front() {
            order.push(TargetId(i));
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    queue.push_back(d);
                }
            }
        }

        if order.len() != n {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.targets[i].name.as_str())
                .collect();
            return Err(BuildError::Dependency(format!(
                "build graph contains a cycle through: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}
