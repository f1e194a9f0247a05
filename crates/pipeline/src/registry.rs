//! Pipeline Registry
//!
//! The per-invocation set of constructed stage components, built leaf
//! first and passed to the runner. Nothing here persists across builds;
//! the only durable state is the fingerprint store.

use std::path::PathBuf;

use droidforge_manifest::ManifestInfo;
use droidforge_toolchain::{ArchVariant, NdkToolchain, SdkTools};

use crate::assemble::PackageAssembler;
use crate::compile::SourceCompiler;
use crate::config::{BuildConfig, ProjectLayout};
use crate::dex::BytecodeConverter;
use crate::finalize::{final_name, signed_name, unsigned_name, Finalizer};
use crate::naming::GeneratedStubStrategy;
use crate::native::NativeBuilder;
use crate::obfuscate::Obfuscator;
use crate::resources::ResourceCompiler;
use crate::Result;

/// One registry per build invocation.
pub struct PipelineRegistry {
    pub info: ManifestInfo,
    pub resources: ResourceCompiler,
    pub compiler: SourceCompiler,
    pub obfuscator: Option<Obfuscator>,
    pub native: Option<NativeBuilder>,
    pub converter: BytecodeConverter,
    pub assembler: PackageAssembler,
    pub finalizer: Finalizer,
}

impl PipelineRegistry {
    /// Construct every component, leaf first.
    pub fn build(
        layout: &ProjectLayout,
        config: &BuildConfig,
        info: ManifestInfo,
        sdk: &SdkTools,
        ndk: Option<NdkToolchain>,
    ) -> Result<PipelineRegistry> {
        let name = &layout.name;
        let signing = config.signing.is_some();
        let platform_jar = sdk.platform_jar(info.target_sdk);

        let stub_path = layout.gen_dir().join(info.stub_source_path());
        let archive_path = layout.build_dir.join(format!("{}.ap_", name));

        let resources = ResourceCompiler::new(
            sdk.aapt(),
            layout.manifest.clone(),
            layout.resource_dirs.clone(),
            platform_jar.clone(),
            layout.gen_dir(),
            stub_path.clone(),
            archive_path.clone(),
            config.aapt_flags.clone(),
        );

        let compiler = SourceCompiler::new(
            PathBuf::from("javac"),
            layout.source_dirs.clone(),
            layout.gen_dir(),
            stub_path,
            layout.classes_dir(),
            platform_jar.clone(),
            layout.external_jars.clone(),
            config.javac_flags.clone(),
            Box::new(GeneratedStubStrategy::new(info.package.clone())),
        );

        let obfuscator = config.proguard.as_ref().map(|proguard| {
            Obfuscator::new(
                PathBuf::from("proguard"),
                layout.classes_dir(),
                platform_jar,
                layout.external_jars.clone(),
                proguard.config_files.clone(),
                layout
                    .proguard_dir()
                    .join(format!("{}obfuscated.jar", name)),
            )
        });

        let native = match (&layout.native_dir, ndk) {
            (Some(native_dir), Some(ndk)) if !config.abis.is_empty() => {
                let variants = config
                    .abis
                    .iter()
                    .map(|&abi| ArchVariant::new(abi, info.min_sdk))
                    .collect();
                Some(NativeBuilder::new(
                    ndk,
                    native_dir.clone(),
                    variants,
                    config.cflags.clone(),
                    layout.libs_dir(),
                    config.native_module.clone(),
                    info.min_sdk,
                    config.jobs,
                ))
            }
            _ => None,
        };

        // the obfuscated archive supersedes the classes directory
        let dex_input = obfuscator
            .as_ref()
            .map(|o| o.output_jar().clone())
            .unwrap_or_else(|| layout.classes_dir());
        let converter = BytecodeConverter::new(
            sdk.dx(),
            dex_input,
            layout.build_dir.join(format!("{}classes.dex", name)),
        );

        let native_libs: Vec<PathBuf> = native
            .as_ref()
            .map(|n| {
                n.variants()
                    .iter()
                    .map(|v| n.lib_path(v.abi))
                    .collect()
            })
            .unwrap_or_default();
        let unsigned_apk = layout.build_dir.join(unsigned_name(name, signing));
        let assembler = PackageAssembler::new(
            PathBuf::from("java"),
            sdk.apkbuilder_classpath(),
            converter.output().clone(),
            archive_path,
            native.as_ref().map(|n| n.libs_dir().clone()),
            native_libs,
            unsigned_apk.clone(),
            signing,
        );

        let finalizer = Finalizer::new(
            sdk.jarsigner(),
            sdk.zipalign(),
            config.signing.clone(),
            unsigned_apk,
            layout.build_dir.join(signed_name(name)),
            layout.build_dir.join(final_name(name, signing)),
        );

        Ok(PipelineRegistry {
            info,
            resources,
            compiler,
            obfuscator,
            native,
            converter,
            assembler,
            finalizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidforge_manifest::ManifestInspector;

    const MANIFEST: &str = r#"<manifest package="com.example.android">
        <application><activity android:name=".MyActivity"/></application>
        <uses-sdk android:minSdkVersion="4" android:targetSdkVersion="10"/>
    </manifest>"#;

    #[test]
    fn test_registry_names_debug_artifacts_without_credential() {
        let info = ManifestInspector::parse(MANIFEST, None).unwrap();
        let layout = ProjectLayout::conventional("/work/app", "Test");
        let registry = PipelineRegistry::build(
            &layout,
            &BuildConfig::default(),
            info,
            &SdkTools::new("/opt/sdk"),
            None,
        )
        .unwrap();

        assert!(registry
            .finalizer
            .final_apk()
            .ends_with("build/Test-debug.apk"));
        assert!(registry.native.is_none());
        assert!(registry.obfuscator.is_none());
    }
}
