//! Tabular input and output.
//!
//! The input list is a CSV with a `Repo` column and an optional `Path`
//! column. [`ReportAssembler`] writes a [`Report`] back out with the
//! identifying columns first and the derived columns after them; failed
//! items keep their row with empty derived cells.

use std::path::Path;
use tracing::info;

use crate::model::{DerivedFields, HarvestItem, Report, ReportRow};
use crate::traits::HarvestError;

pub const REPO_COLUMN: &str = "Repo";
pub const PATH_COLUMN: &str = "Path";

// ============================================================================
// Input
// ============================================================================

/// Reads harvest items from a CSV file with a header row.
pub fn read_items(path: &Path) -> Result<Vec<HarvestItem>, HarvestError> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    parse_items(reader)
}

/// Parses harvest items from any CSV source.
pub fn parse_items<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<HarvestItem>, HarvestError> {
    let headers = reader.headers()?.clone();
    let repo_idx = headers
        .iter()
        .position(|h| h == REPO_COLUMN)
        .ok_or_else(|| HarvestError::MalformedInput {
            line: 1,
            reason: format!("missing '{}' column", REPO_COLUMN),
        })?;
    let path_idx = headers.iter().position(|h| h == PATH_COLUMN);

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let repo = record.get(repo_idx).unwrap_or("");
        if repo.is_empty() {
            return Err(HarvestError::MalformedInput {
                line,
                reason: format!("empty '{}' value", REPO_COLUMN),
            });
        }
        let path = path_idx.and_then(|i| record.get(i)).map(str::to_string);

        items.push(HarvestItem::new(repo, path));
    }

    Ok(items)
}

/// Writes items as a `Repo,Path` table.
pub fn write_items(items: &[HarvestItem], path: &Path) -> Result<(), HarvestError> {
    // Header written up front so an empty list still reads back.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record([REPO_COLUMN, PATH_COLUMN])?;
    for item in items {
        writer.serialize(item)?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

/// Derived column groups present in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Layout {
    lines: bool,
    keyword: bool,
    popularity: bool,
}

impl Layout {
    fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec![REPO_COLUMN, PATH_COLUMN];
        if self.lines {
            headers.push("Lines");
        }
        if self.keyword {
            headers.push("ContainsKeyword");
        }
        if self.popularity {
            headers.extend(["Name", "Watch", "Star", "Fork"]);
        }
        headers
    }

    fn values(&self, row: &ReportRow) -> Vec<String> {
        let mut values = vec![
            row.item.owner_repo.clone(),
            row.item.path.clone().unwrap_or_default(),
        ];
        let fields = row.fields.as_ref();

        if self.lines {
            values.push(match fields {
                Some(DerivedFields::Lines(n)) => n.to_string(),
                _ => String::new(),
            });
        }
        if self.keyword {
            values.push(match fields {
                Some(DerivedFields::Keyword(hit)) => flag(*hit).to_string(),
                _ => String::new(),
            });
        }
        if self.popularity {
            match fields {
                Some(DerivedFields::Popularity(stats)) => values.extend([
                    stats.name.clone(),
                    stats.watchers.to_string(),
                    stats.stars.to_string(),
                    stats.forks.to_string(),
                ]),
                _ => values.extend(std::iter::repeat(String::new()).take(4)),
            }
        }
        values
    }
}

/// Keyword flags are written as `1`/`0`.
pub(crate) fn flag(hit: bool) -> &'static str {
    if hit {
        "1"
    } else {
        "0"
    }
}

/// Serializes a [`Report`] to CSV.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    keyword_column: bool,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `ContainsKeyword` instead of `Lines` for source rows.
    pub fn with_keyword_column(mut self, enabled: bool) -> Self {
        self.keyword_column = enabled;
        self
    }

    fn layout(&self, report: &Report) -> Layout {
        let has_sources = report.rows.iter().any(|r| !r.item.is_metadata_only());
        Layout {
            lines: has_sources && !self.keyword_column,
            keyword: has_sources && self.keyword_column,
            popularity: report.rows.iter().any(|r| r.item.is_metadata_only()),
        }
    }

    /// Writes `report` to `writer` in row order.
    pub fn write<W: std::io::Write>(&self, report: &Report, writer: W) -> Result<(), HarvestError> {
        let layout = self.layout(report);
        let mut writer = csv::Writer::from_writer(writer);

        writer.write_record(layout.headers())?;
        for row in &report.rows {
            writer.write_record(layout.values(row))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `report` to `path`, replacing any existing file.
    pub fn assemble(&self, report: &Report, path: &Path) -> Result<(), HarvestError> {
        let file = std::fs::File::create(path)?;
        self.write(report, std::io::BufWriter::new(file))?;
        info!(rows = report.len(), path = %path.display(), "Report saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
