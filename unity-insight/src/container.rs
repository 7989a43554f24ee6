//! Container index over the input archives
//!
//! An analysis reads one primary application archive plus any expansion
//! archives. Lookups consult the archives in input order and stop at the
//! first hit; stored names are normalized (backslashes to forward
//! slashes) and compared case-insensitively.

use crate::error::{InsightError, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, warn};
use zip::ZipArchive;

#[derive(Debug)]
struct Archive {
    label: String,
    zip: ZipArchive<File>,
    /// Normalized entry names, aligned with ZIP index order
    names: Vec<String>,
}

/// An ordered set of open ZIP containers.
#[derive(Debug)]
pub struct ContainerSet {
    archives: Vec<Archive>,
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

impl ContainerSet {
    /// Open every existing path as a ZIP archive, preserving input order.
    /// Missing or unreadable paths are skipped with a log line; zero
    /// openable archives is fatal.
    pub fn open(paths: &[PathBuf]) -> Result<Self> {
        let mut archives = Vec::new();
        for path in paths {
            if !path.exists() {
                debug!(path = %path.display(), "archive path missing, skipped");
                continue;
            }
            let mut archive = match File::open(path).map_err(InsightError::from).and_then(|f| {
                ZipArchive::new(f).map_err(InsightError::from)
            }) {
                Ok(zip) => zip,
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not open archive, skipped");
                    continue;
                }
            };
            let mut names = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let name = archive
                    .by_index_raw(i)
                    .map(|entry| normalize(entry.name()))
                    .unwrap_or_default();
                names.push(name);
            }
            archives.push(Archive {
                label: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                zip: archive,
                names,
            });
        }
        if archives.is_empty() {
            return Err(InsightError::NoContainers);
        }
        Ok(Self { archives })
    }

    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    /// Label (file name) of one archive.
    pub fn archive_label(&self, archive: usize) -> &str {
        &self.archives[archive].label
    }

    /// Ordered `(archive index, normalized name)` pairs across all
    /// archives.
    pub fn entry_names(&self) -> impl Iterator<Item = (usize, &str)> {
        self.archives
            .iter()
            .enumerate()
            .flat_map(|(i, a)| a.names.iter().map(move |n| (i, n.as_str())))
    }

    /// All entry coordinates, for callers that fetch bytes while
    /// iterating.
    pub fn entry_coords(&self) -> Vec<(usize, usize, String)> {
        self.archives
            .iter()
            .enumerate()
            .flat_map(|(ai, a)| {
                a.names
                    .iter()
                    .enumerate()
                    .map(move |(ei, n)| (ai, ei, n.clone()))
            })
            .collect()
    }

    /// Full uncompressed bytes of the entry at `(archive, index)`.
    pub fn entry_bytes(&mut self, archive: usize, index: usize) -> Result<Vec<u8>> {
        let zip = &mut self.archives[archive].zip;
        let mut entry = zip.by_index(index)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// First matching entry's bytes across archives in open order;
    /// case-insensitive on normalized names. Read errors degrade to a
    /// miss with a log line.
    pub fn find_entry(&mut self, path: &str) -> Option<Vec<u8>> {
        let wanted = normalize(path).to_lowercase();
        for ai in 0..self.archives.len() {
            let hit = self.archives[ai]
                .names
                .iter()
                .position(|n| n.to_lowercase() == wanted);
            if let Some(ei) = hit {
                match self.entry_bytes(ai, ei) {
                    Ok(bytes) => return Some(bytes),
                    Err(err) => {
                        warn!(entry = %path, archive = %self.archives[ai].label, %err,
                              "entry read failed, trying later archives");
                    }
                }
            }
        }
        None
    }

    /// Decode an entry as text, preferring strict UTF-8 and falling back
    /// to lossy decoding. Absent entries come back as the empty string.
    pub fn find_entry_text(&mut self, path: &str) -> String {
        match self.find_entry(path) {
            Some(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            },
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (entry_name, bytes) in entries {
            writer.start_file(*entry_name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_open_skips_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let apk = write_zip(dir.path(), "base.apk", &[("a.txt", b"alpha")]);
        let missing = dir.path().join("obb/none.obb");
        let set = ContainerSet::open(&[missing, apk]).unwrap();
        assert_eq!(set.archive_count(), 1);
    }

    #[test]
    fn test_zero_archives_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContainerSet::open(&[dir.path().join("absent.apk")]).unwrap_err();
        assert!(matches!(err, InsightError::NoContainers));
    }

    #[test]
    fn test_case_insensitive_normalized_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let apk = write_zip(
            dir.path(),
            "base.apk",
            &[("assets\\Bin\\Data\\GlobalGameManagers", b"ggm-bytes")],
        );
        let mut set = ContainerSet::open(&[apk]).unwrap();
        let bytes = set
            .find_entry("assets/bin/data/globalgamemanagers")
            .unwrap();
        assert_eq!(bytes, b"ggm-bytes");
    }

    #[test]
    fn test_first_archive_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_zip(dir.path(), "main.apk", &[("shared.bin", b"first")]);
        let second = write_zip(dir.path(), "patch.obb", &[("shared.bin", b"second")]);
        let mut set = ContainerSet::open(&[first, second]).unwrap();
        assert_eq!(set.find_entry("shared.bin").unwrap(), b"first");
    }

    #[test]
    fn test_entry_names_are_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_zip(dir.path(), "a.apk", &[("one", b"1"), ("two", b"2")]);
        let b = write_zip(dir.path(), "b.obb", &[("three", b"3")]);
        let set = ContainerSet::open(&[a, b]).unwrap();
        let names: Vec<(usize, String)> = set
            .entry_names()
            .map(|(i, n)| (i, n.to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                (0, "one".to_string()),
                (0, "two".to_string()),
                (1, "three".to_string())
            ]
        );
    }

    #[test]
    fn test_text_decoding_falls_back_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let apk = write_zip(dir.path(), "base.apk", &[("m.json", &[0x22, 0xFF, 0x22])]);
        let mut set = ContainerSet::open(&[apk]).unwrap();
        let text = set.find_entry_text("m.json");
        assert!(text.starts_with('"'));
        assert!(text.contains('\u{FFFD}'));
        assert_eq!(set.find_entry_text("absent.json"), "");
    }
}
