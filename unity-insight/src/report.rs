//! The assembled analysis report

use crate::detect::{RenderPipeline, Usage};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One bucket of the major-scripts ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptCount {
    pub namespace: String,
    pub count: usize,
}

/// Everything one analysis concludes about a build.
///
/// The value is self-contained; the two optional paths point at raw
/// artifacts persisted for follow-up inspection and are `None` when
/// extraction or persistence did not happen.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Display name of the analyzed build (primary archive stem)
    pub title: String,
    pub engine_version: String,
    pub render_pipeline: RenderPipeline,
    /// Data-oriented entity runtime
    pub entities: Usage,
    pub entity_physics: Usage,
    /// Third-party (Havok) physics back-end
    pub havok_physics: Usage,
    /// Legacy NGUI UI library
    pub ngui: Usage,
    /// Asset-delivery content pipeline (Addressables)
    pub addressables: bool,
    /// Runtime UI toolkit
    pub ui_toolkit: Usage,
    /// Namespace buckets ranked by script population
    pub major_scripts: Vec<ScriptCount>,
    /// Persisted raw IL metadata blob, when extracted and written
    pub metadata_path: Option<PathBuf>,
    /// Persisted assembly manifest text, when written
    pub manifest_path: Option<PathBuf>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  engine version:   {}", self.engine_version)?;
        writeln!(f, "  render pipeline:  {}", self.render_pipeline)?;
        writeln!(f, "  entities (DOTS):  {}", self.entities)?;
        writeln!(f, "  entity physics:   {}", self.entity_physics)?;
        writeln!(f, "  havok physics:    {}", self.havok_physics)?;
        writeln!(f, "  NGUI:             {}", self.ngui)?;
        writeln!(
            f,
            "  addressables:     {}",
            if self.addressables { "yes" } else { "no" }
        )?;
        writeln!(f, "  UI toolkit:       {}", self.ui_toolkit)?;
        if !self.major_scripts.is_empty() {
            writeln!(f, "  major scripts:")?;
            for bucket in &self.major_scripts {
                writeln!(f, "    {:5}  {}", bucket.count, bucket.namespace)?;
            }
        }
        if let Some(path) = &self.metadata_path {
            writeln!(f, "  metadata saved:   {}", path.display())?;
        }
        if let Some(path) = &self.manifest_path {
            writeln!(f, "  manifest saved:   {}", path.display())?;
        }
        Ok(())
    }
}
