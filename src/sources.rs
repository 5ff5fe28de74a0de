//! Post-processing of the raw-content artifacts directory.
//!
//! - [`scan_directory`] flags every file containing a keyword
//! - [`rewrite_packages`] turns each Go file into a standalone `main`
//!   package so it can be built on its own

use regex::Regex;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::harvest::traits::contains_keyword;
use crate::report::flag;
use crate::traits::HarvestError;

// ============================================================================
// Keyword scan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordHit {
    /// File name without extension (the input index for harvested sources)
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Contains Keyword", serialize_with = "serialize_flag")]
    pub contains_keyword: bool,
}

fn serialize_flag<S: Serializer>(hit: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(flag(*hit))
}

fn regular_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

/// Checks every file under `dir` for `keyword`.
///
/// Files that cannot be read as UTF-8 count as not containing it.
pub fn scan_directory(dir: &Path, keyword: &str) -> Result<Vec<KeywordHit>, HarvestError> {
    if !dir.is_dir() {
        return Err(HarvestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", dir.display()),
        )));
    }

    let hits: Vec<KeywordHit> = regular_files(dir)
        .map(|path| {
            let contains_keyword = match std::fs::read_to_string(&path) {
                Ok(text) => contains_keyword(&text, keyword),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Unreadable file");
                    false
                }
            };
            KeywordHit {
                file_name: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                contains_keyword,
            }
        })
        .collect();

    info!(
        files = hits.len(),
        matches = hits.iter().filter(|h| h.contains_keyword).count(),
        keyword,
        "Keyword scan completed"
    );
    Ok(hits)
}

/// Writes scan results as `File Name,Contains Keyword` with `1`/`0` flags.
pub fn write_scan(hits: &[KeywordHit], path: &Path) -> Result<(), HarvestError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(["File Name", "Contains Keyword"])?;
    for hit in hits {
        writer.serialize(hit)?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Declaration rewrite
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Go files visited
    pub scanned: usize,
    /// Files whose content changed
    pub rewritten: usize,
    /// Files that could not be read or written
    pub failed: usize,
}

/// Rewrites each line-leading `package <name>` in Go files under `dir`
/// to `package main`.
pub fn rewrite_packages(dir: &Path) -> Result<RewriteSummary, HarvestError> {
    let pattern = Regex::new(r"(?m)^package\s+\w+")?;
    let mut summary = RewriteSummary::default();

    for path in regular_files(dir).filter(|p| p.extension().is_some_and(|e| e == "go")) {
        summary.scanned += 1;
        match rewrite_file(&pattern, &path) {
            Ok(true) => summary.rewritten += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error processing file");
                summary.failed += 1;
            }
        }
    }

    info!(
        scanned = summary.scanned,
        rewritten = summary.rewritten,
        failed = summary.failed,
        "Package rewrite completed"
    );
    Ok(summary)
}

fn rewrite_file(pattern: &Regex, path: &Path) -> std::io::Result<bool> {
    let content = std::fs::read_to_string(path)?;
    let modified = pattern.replace_all(&content, "package main");
    if modified == content {
        return Ok(false);
    }
    std::fs::write(path, modified.as_bytes())?;
    Ok(true)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_directory_flags_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.go"), "stub.GetPrivateData(c, k)").unwrap();
        std::fs::write(dir.path().join("1.go"), "privatedata").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/2.go"), "PutPrivateData").unwrap();
        std::fs::write(dir.path().join("3.bin"), [0xFF, 0xFE, 0x00]).unwrap();

        let hits = scan_directory(dir.path(), "PrivateData").unwrap();
        let flags: Vec<_> = hits
            .iter()
            .map(|h| (h.file_name.as_str(), h.contains_keyword))
            .collect();

        assert_eq!(
            flags,
            vec![("0", true), ("1", false), ("3", false), ("2", true)]
        );
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_directory(&dir.path().join("absent"), "x").is_err());
    }

    #[test]
    fn test_write_scan() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("PDC.csv");
        let hits = vec![
            KeywordHit {
                file_name: "12".to_string(),
                contains_keyword: true,
            },
            KeywordHit {
                file_name: "7".to_string(),
                contains_keyword: false,
            },
        ];

        write_scan(&hits, &out).unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "File Name,Contains Keyword\n12,1\n7,0\n"
        );
    }

    #[test]
    fn test_rewrite_packages() {
        let dir = tempfile::tempdir().unwrap();
        let cc = dir.path().join("0.go");
        let main = dir.path().join("1.go");
        let other = dir.path().join("notes.txt");

        std::fs::write(&cc, "// header\npackage chaincode\n\nimport \"fmt\"\n").unwrap();
        std::fs::write(&main, "package main\n").unwrap();
        std::fs::write(&other, "package ignored\n").unwrap();

        let summary = rewrite_packages(dir.path()).unwrap();

        assert_eq!(
            summary,
            RewriteSummary {
                scanned: 2,
                rewritten: 1,
                failed: 0,
            }
        );
        assert_eq!(
            std::fs::read_to_string(&cc).unwrap(),
            "// header\npackage main\n\nimport \"fmt\"\n"
        );
        assert_eq!(std::fs::read_to_string(&other).unwrap(), "package ignored\n");
    }

    #[test]
    fn test_rewrite_leaves_indented_mentions() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("0.go");
        std::fs::write(&file, "package shim\n\t// package foo is unrelated\n").unwrap();

        rewrite_packages(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "package main\n\t// package foo is unrelated\n"
        );
    }
}
