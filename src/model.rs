use serde::Serialize;

/// One unit of work: a repository and, optionally, a file inside it.
///
/// Items without a path harvest repository metadata only. Serializes as a
/// `Repo,Path` table row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HarvestItem {
    #[serde(rename = "Repo")]
    pub owner_repo: String, // e.g., "hyperledger/fabric-samples"
    #[serde(rename = "Path")]
    pub path: Option<String>,
}

impl HarvestItem {
    pub fn new(owner_repo: impl Into<String>, path: Option<String>) -> Self {
        Self {
            owner_repo: owner_repo.into(),
            path: path.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn repository(owner_repo: impl Into<String>) -> Self {
        Self::new(owner_repo, None)
    }

    pub fn file(owner_repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(owner_repo, Some(path.into()))
    }

    pub fn is_metadata_only(&self) -> bool {
        self.path.is_none()
    }
}

/// Popularity counters of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStats {
    pub name: String,
    pub watchers: u64,
    pub stars: u64,
    pub forks: u64,
}

/// Decoded body of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text of a file.
    Source(String),
    /// Repository metadata.
    Repository(RepoStats),
}

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success(Payload),
    /// Any non-200 answer from the remote API.
    NotFound { status: u16, body: String },
    /// The request never produced a usable answer.
    TransportError { detail: String },
}

/// Values derived from a successful payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedFields {
    Lines(usize),
    Keyword(bool),
    Popularity(RepoStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub item: HarvestItem,
    /// `None` when the item failed.
    pub fields: Option<DerivedFields>,
}

/// Ordered harvest result, one row per input item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: HarvestItem, fields: Option<DerivedFields>) {
        self.rows.push(ReportRow { item, fields });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.rows.iter().filter(|r| r.fields.is_none()).count()
    }
}
