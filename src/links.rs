//! Line-oriented link lists feeding the harvest input.
//!
//! [`deduplicate`] and [`subtract`] operate on trimmed lines. Search
//! results in `owner/repo:path` form are turned into harvest items by
//! [`parse_links`].

use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::model::HarvestItem;
use crate::traits::HarvestError;

// ============================================================================
// Set operations
// ============================================================================

/// Trimmed, distinct lines of `input`.
///
/// The set has no meaningful iteration order.
pub fn deduplicate<I, S>(input: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    input
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .collect()
}

/// Trimmed lines of `a` that are not trimmed lines of `b`.
///
/// Keeps the order of `a`, including repeated lines.
pub fn subtract<A, B, S, T>(a: A, b: B) -> Vec<String>
where
    A: IntoIterator<Item = S>,
    B: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let excluded = deduplicate(b);
    a.into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !excluded.contains(line))
        .collect()
}

// ============================================================================
// File wrappers
// ============================================================================

fn write_lines<I, S>(lines: I, output: &Path) -> Result<usize, HarvestError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    let mut count = 0;
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
        count += 1;
    }
    std::fs::write(output, text)?;
    Ok(count)
}

/// Writes the distinct lines of `input` to `output`.
pub fn dedup_file(input: &Path, output: &Path) -> Result<usize, HarvestError> {
    let text = std::fs::read_to_string(input)?;
    let written = write_lines(deduplicate(text.lines()), output)?;
    info!(written, output = %output.display(), "Unique links written");
    Ok(written)
}

/// Writes the lines of `input` absent from `exclude` to `output`.
pub fn subtract_files(input: &Path, exclude: &Path, output: &Path) -> Result<usize, HarvestError> {
    let a = std::fs::read_to_string(input)?;
    let b = std::fs::read_to_string(exclude)?;
    let written = write_lines(subtract(a.lines(), b.lines()), output)?;
    info!(written, output = %output.display(), "Filtered links written");
    Ok(written)
}

// ============================================================================
// Link conversion
// ============================================================================

/// Parses `owner/repo:path` lines into items.
///
/// Blank lines are skipped and exact duplicates are dropped, keeping the
/// first occurrence.
pub fn parse_links(text: &str) -> Result<Vec<HarvestItem>, HarvestError> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (repo, path) = line
            .split_once(':')
            .ok_or_else(|| HarvestError::MalformedInput {
                line: idx + 1,
                reason: format!("expected 'owner/repo:path', got '{}'", line),
            })?;

        let item = HarvestItem::file(repo.trim(), path.trim());
        if seen.insert(item.clone()) {
            items.push(item);
        }
    }

    Ok(items)
}

fn undecodable(reason: String) -> HarvestError {
    HarvestError::MalformedInput { line: 0, reason }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, HarvestError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| undecodable(format!("invalid UTF-8 text: {}", e)))
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> Result<String, HarvestError> {
    if bytes.len() % 2 != 0 {
        return Err(undecodable(format!(
            "odd byte length {} for UTF-16 text",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| {
            if little_endian {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|e| undecodable(format!("invalid UTF-16 text: {}", e)))
}

/// Decodes a link file written as UTF-8 or UTF-16.
///
/// UTF-16 is recognized by its BOM or, without one, by a NUL byte next to
/// the first ASCII character.
pub fn decode_text(bytes: &[u8]) -> Result<String, HarvestError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, true),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, false),
        [0xEF, 0xBB, 0xBF, rest @ ..] => decode_utf8(rest),
        [first, 0, ..] if *first != 0 => decode_utf16(bytes, true),
        [0, second, ..] if *second != 0 => decode_utf16(bytes, false),
        _ => decode_utf8(bytes),
    }
}

pub fn read_link_file(path: &Path) -> Result<Vec<HarvestItem>, HarvestError> {
    let bytes = std::fs::read(path)?;
    parse_links(&decode_text(&bytes)?)
}

// ============================================================================
// Tests
// ============================================================================
