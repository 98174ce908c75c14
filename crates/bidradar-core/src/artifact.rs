//! Run artifact: the normalized records of one run as a pretty JSON array.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::normalize::{NormalizedRecord, RecordKind, SourceTag};

/// `collected_<kind>s_<source>_<run_id>.json`
pub fn artifact_file_name(kind: RecordKind, source: SourceTag, run_id: &str) -> String {
    format!("collected_{}_{}_{}.json", kind.plural(), source.as_str(), run_id)
}

pub fn artifact_path(dir: &Path, kind: RecordKind, source: SourceTag, run_id: &str) -> PathBuf {
    dir.join(artifact_file_name(kind, source, run_id))
}

/// Write records to `path` atomically (temp file in the same directory, then rename).
pub fn write_artifact(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create output dir: {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, records).context("serialize artifact")?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("write artifact: {}", path.display()))?;
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read artifact: {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse artifact: {}", path.display()))
}
