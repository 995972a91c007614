//! Build artifact resolution.
//!
//! Build tools embed version strings in their output filenames, so the
//! registry stores a wildcard pattern (`target/famvest-*.jar`) rather than
//! an exact name. Resolution picks the newest match so callers never need
//! to know the current version.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::AppDescriptor;
use crate::error::{Error, Result};

/// Resolve the deployable artifact for one application.
///
/// With a wildcard in the pattern's final segment, matches in the parent
/// directory are ranked by modification time, newest first; equal mtimes
/// are broken by lexicographically greatest file name so the ordering is
/// total and repeated calls agree. Without a wildcard the pattern names
/// the artifact directly and existence is the caller's concern.
///
/// # Errors
///
/// Returns [`Error::NoArtifact`] when a wildcard pattern matches nothing
/// (including a missing parent directory), and [`Error::Fs`] for other
/// filesystem failures while listing candidates.
pub fn resolve_artifact(checkout_dir: &Path, descriptor: &AppDescriptor) -> Result<PathBuf> {
    let no_artifact = || Error::NoArtifact {
        pattern: descriptor.artifact_pattern.clone(),
    };

    let full = checkout_dir.join(&descriptor.artifact_pattern);
    let Some(name) = full.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Err(no_artifact());
    };
    if !name.contains('*') {
        return Ok(full);
    }

    let parent = full.parent().unwrap_or(checkout_dir);
    let entries = match std::fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(no_artifact()),
        Err(e) => return Err(Error::fs("cannot list artifact directory", parent, e)),
    };

    let mut candidates: Vec<(SystemTime, String)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::fs("cannot list artifact directory", parent, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !wildcard_match(&name, &file_name) {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|e| Error::fs("cannot stat artifact candidate", parent.join(&file_name), e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|e| Error::fs("cannot stat artifact candidate", parent.join(&file_name), e))?;
        candidates.push((modified, file_name));
    }

    candidates.sort_by(|a, b| b.cmp(a));
    let Some((_, newest)) = candidates.first() else {
        return Err(no_artifact());
    };
    if candidates.len() > 1 {
        tracing::info!(artifact = %newest, "multiple artifacts matched, using the newest");
    }
    Ok(parent.join(newest))
}

/// Match a file name against a pattern where `*` spans any run of
/// characters. Greedy left-to-right scan; no other metacharacters.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pieces: Vec<&str> = pattern.split('*').collect();
    if pieces.len() == 1 {
        return pattern == name;
    }
    let Some(mut remainder) = name.strip_prefix(pieces[0]) else {
        return false;
    };
    let last = pieces.len() - 1;
    for piece in &pieces[1..last] {
        if piece.is_empty() {
            continue;
        }
        match remainder.find(piece) {
            Some(pos) => remainder = &remainder[pos + piece.len()..],
            None => return false,
        }
    }
    remainder.ends_with(pieces[last])
}
