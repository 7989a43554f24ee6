//! Evidence fusion
//!
//! Pure detector functions over structural evidence (scene components,
//! script names), textual evidence (printable strings from the IL
//! metadata blob), and manifest evidence (two well-known JSON files read
//! as plain text). Every comparison is case-insensitive.

use crate::resolver::Evidence;
use crate::scanner::{extract_printable_ascii, DEFAULT_MIN_RUN};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

/// Engine version pattern: year-style or four-digit major, then
/// minor.patch and a release-channel suffix.
static ENGINE_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((20[0-9]{2}|[5-9][0-9]{3})\.[0-9]+\.[0-9]+[fpab][0-9]*)").unwrap()
});

/// Reported when a detector has nothing to go on.
pub const UNKNOWN: &str = "Unknown";

/// How many namespace buckets the ranking keeps.
const MAJOR_SCRIPTS_KEPT: usize = 30;

/// Rendering pipeline shipped in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPipeline {
    Universal,
    HighDefinition,
    /// A custom pipeline on the scriptable core package
    Scriptable,
    BuiltIn,
    Unknown,
}

impl fmt::Display for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderPipeline::Universal => "URP",
            RenderPipeline::HighDefinition => "HDRP",
            RenderPipeline::Scriptable => "SRP",
            RenderPipeline::BuiltIn => "Built-in",
            RenderPipeline::Unknown => UNKNOWN,
        })
    }
}

impl Serialize for RenderPipeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Yes/no finding, optionally qualified by the kind of evidence that
/// decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    No,
    Yes,
    /// Decided by a scene-level component
    YesScene,
    /// Decided by an assembly manifest entry
    YesAssembly,
    /// Decided by a serialized script name
    YesScript,
}

impl Usage {
    pub fn is_yes(self) -> bool {
        self != Usage::No
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Usage::No => "no",
            Usage::Yes => "yes",
            Usage::YesScene => "yes (Scene)",
            Usage::YesAssembly => "yes (Assembly)",
            Usage::YesScript => "yes (Script)",
        })
    }
}

impl Serialize for Usage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn any_entry_contains(evidence: &indexmap::IndexSet<String>, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    evidence.iter().any(|e| e.to_lowercase().contains(&needle))
}

/// First engine-version match across the ranked evidence blobs, or
/// `Unknown`. Callers pass the blobs in source preference order.
pub fn detect_engine_version<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    for blob in sources {
        let text = extract_printable_ascii(blob, DEFAULT_MIN_RUN);
        if let Some(found) = ENGINE_VERSION_RE.find(&text) {
            return found.as_str().to_string();
        }
    }
    UNKNOWN.to_string()
}

/// Classify the render pipeline from the metadata blob's strings.
pub fn detect_render_pipeline(metadata: Option<&[u8]>) -> RenderPipeline {
    let Some(metadata) = metadata else {
        return RenderPipeline::Unknown;
    };
    let text = extract_printable_ascii(metadata, DEFAULT_MIN_RUN).to_lowercase();
    const URP_MARKS: [&str; 5] = [
        "com.unity.render-pipelines.universal",
        "unityengine.rendering.universal",
        "universalrenderpipeline",
        "forwardrenderer",
        "renderer2d",
    ];
    const HDRP_MARKS: [&str; 3] = [
        "com.unity.render-pipelines.high-definition",
        "unityengine.rendering.highdefinition",
        "hdrenderpipeline",
    ];
    if URP_MARKS.iter().any(|m| text.contains(m)) {
        RenderPipeline::Universal
    } else if HDRP_MARKS.iter().any(|m| text.contains(m)) {
        RenderPipeline::HighDefinition
    } else if text.contains("com.unity.render-pipelines.core") {
        RenderPipeline::Scriptable
    } else {
        RenderPipeline::BuiltIn
    }
}

/// Data-oriented entity runtime: scene `SubScene` components outrank the
/// manifests.
pub fn detect_entities(evidence: &Evidence, assemblies: &str, runtime_init: &str) -> Usage {
    if any_entry_contains(&evidence.scene_components, "SubScene") {
        return Usage::YesScene;
    }
    for manifest in [assemblies, runtime_init] {
        if contains_ci(manifest, "Unity.Entities") || contains_ci(manifest, "Unity.Entities.Hybrid")
        {
            return Usage::Yes;
        }
    }
    Usage::No
}

/// Entity physics ships as a plain assembly.
pub fn detect_entity_physics(assemblies: &str) -> Usage {
    if contains_ci(assemblies, "Unity.Physics") {
        Usage::Yes
    } else {
        Usage::No
    }
}

/// Third-party (Havok) physics back-end.
pub fn detect_havok(assemblies: &str, runtime_init: &str, metadata: Option<&[u8]>) -> Usage {
    if contains_ci(assemblies, "Havok.Physics") || contains_ci(assemblies, "com.havok.physics") {
        return Usage::YesAssembly;
    }
    if contains_ci(runtime_init, "Havok.Physics") {
        return Usage::Yes;
    }
    if let Some(metadata) = metadata {
        let text = extract_printable_ascii(metadata, DEFAULT_MIN_RUN);
        if contains_ci(&text, "Havok.Physics") {
            return Usage::Yes;
        }
    }
    Usage::No
}

/// Legacy UI library: script names are the strongest signal.
pub fn detect_ngui(evidence: &Evidence, assemblies: &str, metadata: Option<&[u8]>) -> Usage {
    if any_entry_contains(&evidence.all_scripts, "NGUI") {
        return Usage::YesScript;
    }
    if contains_ci(assemblies, "NGUI") {
        return Usage::Yes;
    }
    if let Some(metadata) = metadata {
        let text = extract_printable_ascii(metadata, DEFAULT_MIN_RUN);
        if contains_ci(&text, "NGUI") {
            return Usage::Yes;
        }
    }
    Usage::No
}

/// Runtime UI toolkit, visible only through scene `UIDocument` components.
pub fn detect_ui_toolkit(evidence: &Evidence) -> Usage {
    if any_entry_contains(&evidence.scene_components, "UIDocument") {
        Usage::YesScene
    } else {
        Usage::No
    }
}

/// Asset-delivery content pipeline, recognized from container entry names.
pub fn detect_addressables<'a, I>(entry_names: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    static CATALOG_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"catalog.*\.(json|hash)").unwrap());
    entry_names.into_iter().any(|name| {
        let lower = name.replace('\\', "/").to_lowercase();
        lower.contains("aa/") || lower.contains("addressables") || CATALOG_RE.is_match(&lower)
    })
}

/// Bucket script names by their leading namespace segments and rank the
/// buckets by population.
///
/// Engine-prefixed names (`UnityEngine`, `Unity`, `UnityEditor`) with at
/// least three segments keep two segments; everything else keeps the
/// first. Names with an empty first segment land in `(no namespace)`.
pub fn rank_major_scripts<'a, I>(scripts: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    const ENGINE_PREFIXES: [&str; 3] = ["UnityEngine", "Unity", "UnityEditor"];
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for script in scripts {
        let segments: Vec<&str> = script.split('.').collect();
        let first = segments.first().copied().unwrap_or("");
        let key = if first.is_empty() {
            "(no namespace)".to_string()
        } else if ENGINE_PREFIXES.contains(&first) && segments.len() >= 3 {
            format!("{}.{}", segments[0], segments[1])
        } else {
            first.to_string()
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(MAJOR_SCRIPTS_KEPT);
    ranked
}
