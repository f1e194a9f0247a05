//! Pipeline Runner
//!
//! Constructs the build graph for one invocation, then walks it in
//! dependency order. Each target's combined input digest and recorded
//! output digests are compared against the fingerprint store; an
//! up-to-date target is skipped without touching any collaborator.
//! Direct-mode native targets are the one point of parallelism: they run
//! concurrently on disjoint outputs, bounded by the configured job count,
//! and the first failure aborts the rest.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use droidforge_manifest::ManifestInspector;
use droidforge_toolchain::{keys, ConfigurationResolver, NdkToolchain, SdkTools};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::config::{BuildConfig, NativeMode, ProjectLayout, SigningInfo};
use crate::finalize::FinalizeState;
use crate::fingerprint::{
    fingerprint_file, fingerprint_files, fingerprint_strings, fingerprint_tree, Fingerprint,
    FingerprintStore, TargetRecord,
};
use crate::graph::{Artifact, ArtifactId, ArtifactKind, BuildGraph, TargetId, TargetKind};
use crate::registry::PipelineRegistry;
use crate::tool::ToolInvoker;
use crate::{BuildError, Result};

/// File under the build directory persisting fingerprints across
/// invocations.
const STORE_FILE: &str = "fingerprints.json";

/// What one build invocation produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The externally visible artifact
    pub apk: PathBuf,
    /// Target names that executed, in completion order
    pub executed: Vec<String>,
    /// Target names skipped as up to date
    pub skipped: Vec<String>,
    /// Finalization states the pipeline passes through
    pub finalize_states: Vec<FinalizeState>,
}

/// A planned pipeline: validated graph, constructed registry, loaded
/// store. Planning performs no collaborator invocations; configuration
/// errors surface here, before anything runs.
pub struct ApkPipeline {
    graph: BuildGraph,
    order: Vec<TargetId>,
    registry: PipelineRegistry,
    store: FingerprintStore,
    invoker: Arc<dyn ToolInvoker>,
    config: BuildConfig,
}

impl ApkPipeline {
    /// Resolve configuration, inspect the manifest, and construct the
    /// graph and registry for one invocation.
    pub async fn plan(
        layout: ProjectLayout,
        mut config: BuildConfig,
        resolver: &ConfigurationResolver,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Result<Self> {
        // every required location resolves before any collaborator runs
        let sdk = SdkTools::new(resolver.require(keys::ANDROID_SDK)?);
        let native_requested = layout.native_dir.is_some() && !config.abis.is_empty();
        let ndk = if native_requested {
            Some(NdkToolchain::new(resolver.require(keys::ANDROID_NDK)?))
        } else {
            None
        };
        if config.signing.is_none() {
            if let Some(keystore) = resolver.get(keys::ANDROID_KEY_STORE) {
                let keystore = PathBuf::from(keystore);
                let alias = resolver.require(keys::ANDROID_KEY_NAME)?;
                config.signing = Some(SigningInfo { keystore, alias });
            }
        }

        let mut info = ManifestInspector::inspect(&layout.manifest).await?;
        if let Some(ref package) = config.package_override {
            info.package = package.clone();
        }
        if let Some(ref activity) = config.activity_override {
            info.activity = activity.clone();
        }

        let registry = PipelineRegistry::build(&layout, &config, info, &sdk, ndk)?;
        let (graph, order) = construct_graph(&layout, &config, &registry)?;
        let store = FingerprintStore::load(layout.build_dir.join(STORE_FILE))?;

        Ok(Self {
            graph,
            order,
            registry,
            store,
            invoker,
            config,
        })
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    /// Resolved application metadata, overrides applied.
    pub fn manifest_info(&self) -> &droidforge_manifest::ManifestInfo {
        &self.registry.info
    }

    pub fn final_apk(&self) -> &PathBuf {
        self.registry.finalizer.final_apk()
    }

    /// Run the pipeline, skipping everything that is up to date.
    pub async fn build(&self) -> Result<BuildOutcome> {
        let mut executed = Vec::new();
        let mut skipped = Vec::new();
        let mut done: HashSet<TargetId> = HashSet::new();

        for idx in 0..self.order.len() {
            let tid = self.order[idx];
            if done.contains(&tid) {
                continue;
            }
            let target = self.graph.target(tid);

            if matches!(target.kind, TargetKind::NativeLib(_)) {
                // the whole independent group runs at once
                let group: Vec<TargetId> = self
                    .order
                    .iter()
                    .copied()
                    .filter(|&t| {
                        !done.contains(&t)
                            && matches!(self.graph.target(t).kind, TargetKind::NativeLib(_))
                    })
                    .collect();
                self.run_native_group(&group, &mut executed, &mut skipped)
                    .await?;
                done.extend(group);
                continue;
            }

            done.insert(tid);
            let digest = self.input_digest(tid)?;
            if self.up_to_date(tid, &digest)? {
                debug!(target = %target.name, "up to date");
                skipped.push(target.name.clone());
            } else {
                self.execute(tid).await?;
                self.record(tid, digest)?;
                executed.push(target.name.clone());
            }
        }

        info!(
            executed = executed.len(),
            skipped = skipped.len(),
            apk = %self.final_apk().display(),
            "build finished"
        );
        Ok(BuildOutcome {
            apk: self.final_apk().clone(),
            executed,
            skipped,
            finalize_states: self.registry.finalizer.states(),
        })
    }

    /// Combined digest of a target's inputs plus its stage configuration.
    /// `None` when an input does not exist yet, which always means stale.
    fn input_digest(&self, tid: TargetId) -> Result<Option<Fingerprint>> {
        let target = self.graph.target(tid);
        let mut parts: Vec<String> = vec![self.stage_signature(tid)];
        for &input in &target.inputs {
            match self.artifact_digest(self.graph.artifact(input))? {
                Some(digest) => parts.push(digest.to_string()),
                None => return Ok(None),
            }
        }
        Ok(Some(fingerprint_strings(&parts)))
    }

    /// Current fingerprint of an artifact, `None` if it is absent.
    fn artifact_digest(&self, artifact: &Artifact) -> Result<Option<Fingerprint>> {
        match artifact.kind {
            ArtifactKind::File => match fingerprint_file(&artifact.path) {
                Ok(digest) => Ok(Some(digest)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            ArtifactKind::Tree => Ok(Some(fingerprint_tree(&artifact.path)?)),
            ArtifactKind::ClassSet => {
                let outputs = self.registry.compiler.expected_outputs()?;
                if outputs.iter().any(|p| !p.is_file()) {
                    return Ok(None);
                }
                Ok(Some(fingerprint_files(&outputs)?))
            }
        }
    }

    /// Flag sets and stage options that invalidate a target when changed,
    /// even though no input file did.
    fn stage_signature(&self, tid: TargetId) -> String {
        let config = &self.config;
        match self.graph.target(tid).kind {
            TargetKind::ResourceStub | TargetKind::ResourcePackage => {
                format!("aapt {}", config.aapt_flags.join(" "))
            }
            TargetKind::Compile => format!("javac {}", config.javac_flags.join(" ")),
            TargetKind::Obfuscate => "proguard".to_string(),
            TargetKind::NativeLib(abi) => {
                let flags = self
                    .registry
                    .native
                    .as_ref()
                    .and_then(|n| n.variant(abi).ok())
                    .map(|v| v.flags_signature())
                    .unwrap_or_default();
                format!("{} {}", flags, config.cflags.join(" "))
            }
            TargetKind::NativeDelegated => {
                let abis: Vec<&str> = config.abis.iter().map(|a| a.as_str()).collect();
                format!("ndk-build abis={} min={}", abis.join(","), self.registry.info.min_sdk)
            }
            TargetKind::Dex => "dx --dex".to_string(),
            TargetKind::Assemble => format!("apkbuilder unsigned={}", config.signing.is_some()),
            TargetKind::Sign => config
                .signing
                .as_ref()
                .map(|s| format!("jarsigner {} {}", s.keystore.display(), s.alias))
                .unwrap_or_default(),
            TargetKind::Align => "zipalign -f 4".to_string(),
        }
    }

    fn up_to_date(&self, tid: TargetId, digest: &Option<Fingerprint>) -> Result<bool> {
        let Some(digest) = digest else {
            return Ok(false);
        };
        let target = self.graph.target(tid);
        let Some(record) = self.store.get(&target.name) else {
            return Ok(false);
        };
        if record.input_digest != *digest {
            return Ok(false);
        }
        for &output in &target.outputs {
            let artifact = self.graph.artifact(output);
            let Some(current) = self.artifact_digest(artifact)? else {
                return Ok(false);
            };
            let key = artifact.path.to_string_lossy().to_string();
            if record.outputs.get(&key) != Some(&current) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Record a target's successful run in the durable store.
    fn record(&self, tid: TargetId, digest: Option<Fingerprint>) -> Result<()> {
        let target = self.graph.target(tid);
        let input_digest = match digest {
            Some(d) => d,
            // inputs that were absent at check time exist once upstream ran
            None => self.input_digest(tid)?.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("inputs of {} are missing after execution", target.name),
                )
            })?,
        };

        let mut outputs = BTreeMap::new();
        for &output in &target.outputs {
            let artifact = self.graph.artifact(output);
            let current = self.artifact_digest(artifact)?.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!(
                        "{} did not produce {}",
                        target.name,
                        artifact.path.display()
                    ),
                )
            })?;
            outputs.insert(artifact.path.to_string_lossy().to_string(), current);
        }

        self.store.record(
            &target.name,
            TargetRecord {
                input_digest,
                outputs,
            },
        )
    }

    async fn execute(&self, tid: TargetId) -> Result<()> {
        let target = self.graph.target(tid);
        info!(target = %target.name, "running stage");
        let invoker = self.invoker.as_ref();
        match target.kind {
            TargetKind::ResourceStub => self.registry.resources.generate_stub(invoker).await,
            TargetKind::ResourcePackage => self.registry.resources.package(invoker).await,
            TargetKind::Compile => self.registry.compiler.compile(invoker).await,
            TargetKind::Obfuscate => {
                self.registry
                    .obfuscator
                    .as_ref()
                    .ok_or_else(|| {
                        BuildError::Dependency("obfuscate target without a pass".to_string())
                    })?
                    .run(invoker)
                    .await
            }
            TargetKind::NativeDelegated => {
                self.registry
                    .native
                    .as_ref()
                    .ok_or_else(|| {
                        BuildError::Dependency("native target without a builder".to_string())
                    })?
                    .build_delegated(invoker)
                    .await
            }
            TargetKind::NativeLib(_) => Err(BuildError::Dependency(
                "per-architecture targets run as a group".to_string(),
            )),
            TargetKind::Dex => self.registry.converter.convert(invoker).await,
            TargetKind::Assemble => self.registry.assembler.assemble(invoker).await,
            TargetKind::Sign => self.registry.finalizer.sign(invoker).await,
            TargetKind::Align => self.registry.finalizer.align(invoker).await,
        }
    }

    /// Build every stale architecture concurrently, bounded by the job
    /// count. The first failed architecture aborts the remaining
    /// invocations and the whole build.
    async fn run_native_group(
        &self,
        group: &[TargetId],
        executed: &mut Vec<String>,
        skipped: &mut Vec<String>,
    ) -> Result<()> {
        let native = self.registry.native.as_ref().ok_or_else(|| {
            BuildError::Dependency("native targets without a builder".to_string())
        })?;

        let mut stale = Vec::new();
        for &tid in group {
            let target = self.graph.target(tid);
            let abi = match target.kind {
                TargetKind::NativeLib(abi) => abi,
                _ => continue,
            };
            let digest = self.input_digest(tid)?;
            if self.up_to_date(tid, &digest)? {
                debug!(target = %target.name, "up to date");
                skipped.push(target.name.clone());
            } else {
                stale.push((tid, native.variant(abi)?.clone(), digest));
            }
        }
        if stale.is_empty() {
            return Ok(());
        }

        let jobs = self.config.jobs.max(1);
        let invoker = &self.invoker;
        let mut builds = stream::iter(stale.into_iter().map(|(tid, variant, digest)| async move {
            native
                .build_variant(&variant, invoker.as_ref())
                .await
                .map(|_| (tid, digest))
        }))
        .buffer_unordered(jobs);

        while let Some(result) = builds.next().await {
            let (tid, digest) = result?;
            self.record(tid, digest)?;
            executed.push(self.graph.target(tid).name.clone());
        }
        Ok(())
    }
}

/// Lay the fixed pipeline out as explicit targets and artifacts, then
/// validate it. Construction rejects cyclic or unresolved graphs before
/// anything executes.
fn construct_graph(
    layout: &ProjectLayout,
    config: &BuildConfig,
    registry: &PipelineRegistry,
) -> Result<(BuildGraph, Vec<TargetId>)> {
    let mut g = BuildGraph::new();

    // source artifacts
    let manifest = g.source(layout.manifest.clone(), ArtifactKind::File);
    let resource_dirs: Vec<ArtifactId> = layout
        .resource_dirs
        .iter()
        .map(|d| g.source(d.clone(), ArtifactKind::Tree))
        .collect();
    let source_dirs: Vec<ArtifactId> = layout
        .source_dirs
        .iter()
        .map(|d| g.source(d.clone(), ArtifactKind::Tree))
        .collect();
    let external_jars: Vec<ArtifactId> = layout
        .external_jars
        .iter()
        .map(|j| g.source(j.clone(), ArtifactKind::File))
        .collect();

    // resources
    let stub = g.produced(registry.resources.stub_path().clone(), ArtifactKind::File);
    let mut resource_inputs = vec![manifest];
    resource_inputs.extend(&resource_dirs);
    g.add_target(
        "resources:stub",
        TargetKind::ResourceStub,
        resource_inputs.clone(),
        vec![stub],
    )?;

    let archive = g.produced(
        registry.resources.archive_path().clone(),
        ArtifactKind::File,
    );
    g.add_target(
        "resources:package",
        TargetKind::ResourcePackage,
        resource_inputs,
        vec![archive],
    )?;

    // compile
    let classes = g.produced(
        registry.compiler.classes_dir().clone(),
        ArtifactKind::ClassSet,
    );
    let mut compile_inputs = source_dirs;
    compile_inputs.push(stub);
    compile_inputs.extend(&external_jars);
    g.add_target("compile", TargetKind::Compile, compile_inputs, vec![classes])?;

    // obfuscation supersedes the classes directory as the dex input
    let dex_input = match &registry.obfuscator {
        Some(obfuscator) => {
            let jar = g.produced(obfuscator.output_jar().clone(), ArtifactKind::File);
            let mut inputs = vec![classes];
            for config_file in obfuscator.config_files() {
                inputs.push(g.source(config_file.clone(), ArtifactKind::File));
            }
            g.add_target("obfuscate", TargetKind::Obfuscate, inputs, vec![jar])?;
            jar
        }
        None => classes,
    };

    // native fan-out
    let mut native_libs: Vec<ArtifactId> = Vec::new();
    if let (Some(native), Some(native_dir)) = (&registry.native, &layout.native_dir) {
        let tree = g.source(native_dir.clone(), ArtifactKind::Tree);
        match config.native_mode {
            NativeMode::Direct => {
                for variant in native.variants() {
                    let lib = g.produced(native.lib_path(variant.abi), ArtifactKind::File);
                    g.add_target(
                        format!("native:{}", variant.abi.as_str()),
                        TargetKind::NativeLib(variant.abi),
                        vec![tree],
                        vec![lib],
                    )?;
                    native_libs.push(lib);
                }
            }
            NativeMode::Delegated => {
                // tracking degrades to the whole native source tree
                let libs = g.produced(native.libs_dir().clone(), ArtifactKind::Tree);
                g.add_target(
                    "native",
                    TargetKind::NativeDelegated,
                    vec![tree],
                    vec![libs],
                )?;
                native_libs.push(libs);
            }
        }
    }

    // convert, assemble, finalize
    let dex = g.produced(registry.converter.output().clone(), ArtifactKind::File);
    g.add_target("dex", TargetKind::Dex, vec![dex_input], vec![dex])?;

    let unsigned = g.produced(registry.assembler.output().clone(), ArtifactKind::File);
    let mut assemble_inputs = vec![dex, archive];
    assemble_inputs.extend(&native_libs);
    g.add_target(
        "assemble",
        TargetKind::Assemble,
        assemble_inputs,
        vec![unsigned],
    )?;

    let align_input = if config.signing.is_some() {
        let signed = g.produced(registry.finalizer.signed_apk().clone(), ArtifactKind::File);
        g.add_target("sign", TargetKind::Sign, vec![unsigned], vec![signed])?;
        signed
    } else {
        unsigned
    };

    let final_apk = g.produced(registry.finalizer.final_apk().clone(), ArtifactKind::File);
    g.add_target("align", TargetKind::Align, vec![align_input], vec![final_apk])?;

    let order = g.execution_order()?;
    Ok((g, order))
}
