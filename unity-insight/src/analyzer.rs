//! Analysis façade
//!
//! Sequences the pipeline: open containers, gather manifest and metadata
//! inputs, run the two-pass bundle/asset scan that fills the script name
//! table and the evidence sets, fuse the evidence, persist the raw
//! artifacts, and hand back the report. The core is single-threaded;
//! every parse unit is a try-boundary whose failure is logged and
//! dropped, and only container-level problems reach the caller.

use crate::asset::{class_ids, class_name, objects, SerializedAsset};
use crate::bundle::{looks_serialized, BundleFile};
use crate::container::ContainerSet;
use crate::detect;
use crate::error::{InsightError, Result};
use crate::reader::ByteOrder;
use crate::report::{AnalysisReport, ScriptCount};
use crate::resolver::{Evidence, ScriptMap, SCRIPT_FALLBACK};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Well-known entry paths inside the application archives.
pub mod paths {
    pub const GLOBAL_GAME_MANAGERS: &str = "assets/bin/Data/globalgamemanagers";
    pub const DATA_BUNDLE: &str = "assets/bin/Data/data.unity3d";
    pub const SCRIPTING_ASSEMBLIES: &str = "assets/bin/Data/ScriptingAssemblies.json";
    pub const RUNTIME_INITIALIZE: &str = "assets/bin/Data/RuntimeInitializeOnLoads.json";
    pub const GLOBAL_METADATA: &str = "assets/bin/Data/Managed/Metadata/global-metadata.dat";
    pub const LIBUNITY_ARM64: &str = "lib/arm64-v8a/libunity.so";
    pub const LIBUNITY_ARM32: &str = "lib/armeabi-v7a/libunity.so";
}

/// Subdirectory of the download root that receives the raw artifacts.
const LAST_ANALYSIS_DIR: &str = "LastAnalysis";
/// Container region holding the player data files.
const DATA_PREFIX: &str = "assets/bin/data/";
/// Scene files are named `level0`, `level1`, ...
const SCENE_PREFIX: &str = "level";
/// Entry suffixes that are never serialized files.
const SKIPPED_SUFFIXES: [&str; 4] = [".ress", ".resource", ".resourcebatch", ".bundle"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Collect `MonoScript` names only
    ScriptsOnly,
    /// Walk `GameObject`s, resolving component names
    Full,
}

/// The analysis entry point.
///
/// One value can run any number of analyses; each call starts from a
/// fresh script table and evidence set, so results are stable across
/// repeated runs. Calls must not overlap.
#[derive(Debug, Clone)]
pub struct Analyzer {
    download_root: PathBuf,
}

impl Default for Analyzer {
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("unity-insight");
        Self {
            download_root: root,
        }
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `root` instead of the per-user application-data directory for
    /// persisted artifacts.
    pub fn with_download_root(root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: root.into(),
        }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Analyze a build: the primary application archive first, expansion
    /// archives after it.
    pub fn analyze(&self, archives: &[PathBuf]) -> Result<AnalysisReport> {
        let mut containers = ContainerSet::open(archives)?;
        info!(
            archives = containers.archive_count(),
            "analysis started"
        );

        let title = Path::new(containers.archive_label(0))
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| containers.archive_label(0).to_string());

        let assemblies = containers.find_entry_text(paths::SCRIPTING_ASSEMBLIES);
        let runtime_init = containers.find_entry_text(paths::RUNTIME_INITIALIZE);
        let metadata = containers.find_entry(paths::GLOBAL_METADATA);

        let mut scripts = ScriptMap::new();
        let mut evidence = Evidence::default();
        run_pass(&mut containers, Pass::ScriptsOnly, &mut scripts, &mut evidence);
        run_pass(&mut containers, Pass::Full, &mut scripts, &mut evidence);
        info!(
            scripts = scripts.len(),
            scene_components = evidence.scene_components.len(),
            "two-pass scan finished"
        );

        let ggm = containers.find_entry(paths::GLOBAL_GAME_MANAGERS);
        let data_bundle = containers.find_entry(paths::DATA_BUNDLE);
        let lib64 = containers.find_entry(paths::LIBUNITY_ARM64);
        let lib32 = containers.find_entry(paths::LIBUNITY_ARM32);
        let engine_version = detect::detect_engine_version(
            [
                ggm.as_deref(),
                data_bundle.as_deref(),
                lib64.as_deref(),
                lib32.as_deref(),
                metadata.as_deref(),
            ]
            .into_iter()
            .flatten(),
        );

        let addressables = detect::detect_addressables(containers.entry_names().map(|(_, n)| n));
        let major_scripts = detect::rank_major_scripts(evidence.all_scripts.iter().map(|s| s.as_str()))
            .into_iter()
            .map(|(namespace, count)| ScriptCount { namespace, count })
            .collect();

        let (metadata_path, manifest_path) =
            self.persist_artifacts(metadata.as_deref(), &assemblies);

        Ok(AnalysisReport {
            title,
            engine_version,
            render_pipeline: detect::detect_render_pipeline(metadata.as_deref()),
            entities: detect::detect_entities(&evidence, &assemblies, &runtime_init),
            entity_physics: detect::detect_entity_physics(&assemblies),
            havok_physics: detect::detect_havok(&assemblies, &runtime_init, metadata.as_deref()),
            ngui: detect::detect_ngui(&evidence, &assemblies, metadata.as_deref()),
            addressables,
            ui_toolkit: detect::detect_ui_toolkit(&evidence),
            major_scripts,
            metadata_path,
            manifest_path,
        })
    }

    /// Run [`Self::analyze`] on a background thread so a front-end can
    /// keep presenting progress. The pipeline itself stays synchronous.
    pub fn analyze_in_background(
        &self,
        archives: Vec<PathBuf>,
    ) -> JoinHandle<Result<AnalysisReport>> {
        let analyzer = self.clone();
        std::thread::spawn(move || analyzer.analyze(&archives))
    }

    /// Write the raw artifacts under `<root>/LastAnalysis/`. Failures are
    /// logged and swallowed; the in-memory result does not depend on
    /// them.
    fn persist_artifacts(
        &self,
        metadata: Option<&[u8]>,
        assemblies: &str,
    ) -> (Option<PathBuf>, Option<PathBuf>) {
        let dir = self.download_root.join(LAST_ANALYSIS_DIR);
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), %err, "could not create artifact directory");
            return (None, None);
        }
        let metadata_path = metadata.and_then(|bytes| {
            let path = dir.join("global-metadata.dat");
            match fs::write(&path, bytes) {
                Ok(()) => Some(path),
                Err(err) => {
                    warn!(path = %path.display(), %err, "metadata not persisted");
                    None
                }
            }
        });
        let manifest_path = {
            let path = dir.join("ScriptingAssemblies.json");
            match fs::write(&path, assemblies) {
                Ok(()) => Some(path),
                Err(err) => {
                    warn!(path = %path.display(), %err, "manifest not persisted");
                    None
                }
            }
        };
        (metadata_path, manifest_path)
    }
}

/// One sweep over every container entry that can hold serialized assets.
fn run_pass(
    containers: &mut ContainerSet,
    pass: Pass,
    scripts: &mut ScriptMap,
    evidence: &mut Evidence,
) {
    for (archive, index, name) in containers.entry_coords() {
        let lower = name.to_lowercase();
        if !lower.starts_with(DATA_PREFIX) {
            continue;
        }
        if SKIPPED_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            continue;
        }
        let basename = name.rsplit('/').next().unwrap_or(&name).to_string();

        if basename.eq_ignore_ascii_case("data.unity3d") {
            match containers.entry_bytes(archive, index) {
                Ok(bytes) => scan_bundle(&name, bytes, pass, scripts, evidence),
                Err(err) => warn!(entry = %name, %err, "bundle entry unreadable"),
            }
        } else if looks_serialized(&basename) {
            match containers.entry_bytes(archive, index) {
                Ok(bytes) => {
                    if let Err(err) = scan_serialized(&basename, bytes, pass, scripts, evidence) {
                        warn!(entry = %name, %err, "serialized entry skipped");
                    }
                }
                Err(err) => warn!(entry = %name, %err, "entry unreadable"),
            }
        }
    }
}

/// Walk one bundle's serialized nodes. Foreign signatures are skipped
/// quietly; everything else recoverable is logged per node.
fn scan_bundle(
    source: &str,
    bytes: Vec<u8>,
    pass: Pass,
    scripts: &mut ScriptMap,
    evidence: &mut Evidence,
) {
    let bundle = match BundleFile::parse(bytes) {
        Ok(bundle) => bundle,
        Err(InsightError::BadSignature(signature)) => {
            debug!(entry = %source, %signature, "not a bundle, skipped");
            return;
        }
        Err(err) => {
            warn!(entry = %source, %err, "bundle skipped");
            return;
        }
    };
    for node in bundle.serialized_nodes() {
        let outcome = bundle
            .node_bytes(node)
            .and_then(|data| scan_serialized(node.basename(), data, pass, scripts, evidence));
        if let Err(err) = outcome {
            warn!(bundle = %source, node = %node.path, %err, "node skipped");
        }
    }
}

/// Parse one serialized file and collect its evidence for the given pass.
fn scan_serialized(
    file_name: &str,
    data: Vec<u8>,
    pass: Pass,
    scripts: &mut ScriptMap,
    evidence: &mut Evidence,
) -> Result<()> {
    let asset = SerializedAsset::parse(file_name, data)?;
    let byte_order = asset.header.byte_order();
    let version = asset.header.version;

    // Script names first, so same-file behaviour pointers resolve even
    // inside a single pass.
    for object in asset.objects_of_class(class_ids::MONO_SCRIPT) {
        match asset
            .object_slice(object)
            .and_then(|slice| objects::parse_mono_script(slice, byte_order))
        {
            Ok(script) => {
                let qualified = script.qualified_name();
                scripts.insert(&asset.name, object.path_id, qualified.clone());
                evidence.all_scripts.insert(qualified);
            }
            Err(err) => {
                debug!(file = %asset.name, path_id = object.path_id, %err, "MonoScript skipped");
            }
        }
    }

    if pass != Pass::Full {
        return Ok(());
    }

    let is_scene = asset.name.to_lowercase().starts_with(SCENE_PREFIX);
    for object in asset.objects_of_class(class_ids::GAME_OBJECT) {
        let record = match asset
            .object_slice(object)
            .and_then(|slice| objects::parse_game_object(slice, byte_order, version))
        {
            Ok(record) => record,
            Err(err) => {
                debug!(file = %asset.name, path_id = object.path_id, %err, "GameObject skipped");
                continue;
            }
        };
        for pointer in &record.components {
            if let Some(component) = component_name(&asset, pointer, scripts, byte_order, version)
            {
                if is_scene {
                    evidence.scene_components.insert(component);
                }
            }
        }
    }
    Ok(())
}

/// Name one component pointer: scripted components go through the
/// resolver, built-ins through the class-name table.
fn component_name(
    asset: &SerializedAsset,
    pointer: &objects::PPtr,
    scripts: &ScriptMap,
    byte_order: ByteOrder,
    version: i32,
) -> Option<String> {
    if pointer.file_id != 0 {
        // The component lives in another file; its class cannot be read
        // from here. Scripted components are the practical case.
        return Some(scripts.resolve(
            &asset.name,
            &asset.externals,
            pointer.file_id,
            pointer.path_id,
        ));
    }
    match asset.object_class(pointer.path_id) {
        Some(class_ids::MONO_BEHAVIOUR) => {
            let behaviour = asset.object_by_path(pointer.path_id)?;
            let script_ptr = asset
                .object_slice(behaviour)
                .and_then(|slice| objects::parse_mono_behaviour_script(slice, byte_order, version));
            match script_ptr {
                Ok(ptr) => Some(scripts.resolve(
                    &asset.name,
                    &asset.externals,
                    ptr.file_id,
                    ptr.path_id,
                )),
                Err(err) => {
                    debug!(file = %asset.name, path_id = pointer.path_id, %err,
                           "behaviour unreadable, sentinel substituted");
                    Some(SCRIPT_FALLBACK.to_string())
                }
            }
        }
        Some(class_id) => Some(class_name(class_id)),
        None => {
            debug!(file = %asset.name, path_id = pointer.path_id,
                   "component target missing from directory");
            None
        }
    }
}
