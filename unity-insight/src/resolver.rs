//! Script-name resolution
//!
//! Pass one registers every `MonoScript` under `(file, path-id)`; pass two
//! dereferences `MonoBehaviour` script pointers through it, hopping files
//! via the externals list. The table is owned by one analysis and handed
//! through the pipeline; nothing here is process-wide.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Substituted when a script pointer cannot be resolved.
pub const SCRIPT_FALLBACK: &str = "MonoBehaviour";

/// The `(file, path-id) → fully-qualified name` table shared by all files
/// of one analysis. File keys are lowercased so bundle node names and
/// externals basenames with differing case still meet.
#[derive(Debug, Default)]
pub struct ScriptMap {
    entries: IndexMap<(String, i64), String>,
}

impl ScriptMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: &str, path_id: i64, name: String) {
        self.entries
            .insert((file.to_ascii_lowercase(), path_id), name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a script pointer seen in `current_file`.
    ///
    /// A positive `file_id` within bounds selects `externals[file_id - 1]`
    /// as the target file; 0 (and out-of-range values) mean the current
    /// file. A missed exact lookup falls back to any entry with the same
    /// path-id, which covers producers omitted from an externals list. A
    /// full miss substitutes [`SCRIPT_FALLBACK`].
    pub fn resolve(
        &self,
        current_file: &str,
        externals: &[String],
        file_id: i32,
        path_id: i64,
    ) -> String {
        let target = if file_id > 0 && (file_id as usize) <= externals.len() {
            externals[file_id as usize - 1].as_str()
        } else {
            current_file
        };
        let key = (target.to_ascii_lowercase(), path_id);
        if let Some(name) = self.entries.get(&key) {
            return name.clone();
        }
        if let Some(name) = self
            .entries
            .iter()
            .find(|((_, pid), _)| *pid == path_id)
            .map(|(_, name)| name)
        {
            return name.clone();
        }
        debug!(
            file = %current_file,
            target = %target,
            path_id,
            "script pointer misses the name table"
        );
        SCRIPT_FALLBACK.to_string()
    }
}

/// Structural evidence collected by the asset scan.
#[derive(Debug, Default)]
pub struct Evidence {
    /// Every fully-qualified `MonoScript` name seen anywhere
    pub all_scripts: IndexSet<String>,
    /// Component names of `GameObject`s in scene files (`level*`)
    pub scene_components: IndexSet<String>,
}
