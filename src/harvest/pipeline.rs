//! Sequential harvest loop.
//!
//! [`HarvestLoop`] walks the input in order with a single request in
//! flight at a time:
//! 1. **Gate**: wait out the fixed [`RateGate`] delay
//! 2. **Fetch**: one [`ContentFetcher`] attempt for the item
//! 3. **Derive**: compute [`DerivedFields`] from a successful payload and
//!    optionally save the raw source as `<index>.<extension>`
//!
//! Failed items get a sentinel row, so the returned [`Report`] always has
//! one row per input item in input order.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

use crate::config::HarvestConfig;
use crate::gate::RateGate;
use crate::harvest::traits::{
    derive_fields, FailureReason, HarvestEvent, HarvestObserver, TracingObserver,
};
use crate::model::{DerivedFields, FetchResult, HarvestItem, Payload, Report};
use crate::traits::{ContentFetcher, HarvestError};

pub struct HarvestLoop<F>
where
    F: ContentFetcher,
{
    fetcher: F,
    gate: RateGate,
    config: HarvestConfig,
    observer: Arc<dyn HarvestObserver>,
}

impl<F> HarvestLoop<F>
where
    F: ContentFetcher,
{
    /// Creates a loop paced by `config.delay` that reports through
    /// [`TracingObserver`].
    pub fn new(fetcher: F, config: HarvestConfig) -> Self {
        Self {
            fetcher,
            gate: RateGate::new(config.delay),
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn HarvestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    /// Harvests every item once, in order.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::MissingCredential`] before any request when
    /// no credential (or an empty one) is configured, and
    /// [`HarvestError::Io`] when the artifact directory or a raw-content
    /// artifact cannot be written.
    /// Per-item fetch failures are never errors.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn run(&self, items: &[HarvestItem]) -> Result<Report, HarvestError> {
        let credential = self
            .config
            .credential
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(HarvestError::MissingCredential)?;

        if let Some(dir) = &self.config.artifact_dir {
            tokio::fs::create_dir_all(dir).await?;
        }

        let total = items.len();
        let mut report = Report::with_capacity(total);
        self.observer.on_event(&HarvestEvent::Started { total });

        for (index, item) in items.iter().enumerate() {
            self.gate.wait().await;

            let fields = match self.fetcher.fetch(item, credential).await {
                FetchResult::Success(payload) => Some(self.accept(index, &payload).await?),
                FetchResult::NotFound { status, body } => {
                    self.fail(index, item, FailureReason::NotFound { status, body });
                    None
                }
                FetchResult::TransportError { detail } => {
                    self.fail(index, item, FailureReason::Transport { detail });
                    None
                }
            };

            report.push(item.clone(), fields);
            self.observer.on_event(&HarvestEvent::Progress {
                processed: index + 1,
                total,
            });
        }

        self.observer.on_event(&HarvestEvent::Finished {
            total,
            failed: report.failures(),
        });

        Ok(report)
    }

    async fn accept(&self, index: usize, payload: &Payload) -> Result<DerivedFields, HarvestError> {
        if let (Some(dir), Payload::Source(text)) = (&self.config.artifact_dir, payload) {
            let path = self.artifact_path(dir, index);
            tokio::fs::write(&path, text).await?;
            self.observer
                .on_event(&HarvestEvent::ArtifactWritten { index, path });
        }

        Ok(derive_fields(payload, &self.config.derivation))
    }

    fn fail(&self, index: usize, item: &HarvestItem, reason: FailureReason) {
        self.observer.on_event(&HarvestEvent::ItemFailed {
            index,
            item: item.clone(),
            reason,
        });
    }

    fn artifact_path(&self, dir: &std::path::Path, index: usize) -> PathBuf {
        dir.join(format!("{}.{}", index, self.config.extension))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::traits::Derivation;
    use crate::model::RepoStats;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // Stub fetcher answering from a table keyed by repository name
    struct StubFetcher {
        answers: HashMap<String, FetchResult>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(answers: Vec<(&str, FetchResult)>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|(repo, result)| (repo.to_string(), result))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentFetcher for StubFetcher {
        async fn fetch(&self, item: &HarvestItem, _credential: &str) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(&item.owner_repo)
                .cloned()
                .unwrap_or(FetchResult::NotFound {
                    status: 404,
                    body: "{}".to_string(),
                })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<HarvestEvent>>,
    }

    impl HarvestObserver for RecordingObserver {
        fn on_event(&self, event: &HarvestEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn config() -> HarvestConfig {
        HarvestConfig::default()
            .with_credential("token")
            .with_delay(Duration::ZERO)
    }

    fn source(text: &str) -> FetchResult {
        FetchResult::Success(Payload::Source(text.to_string()))
    }

    #[tokio::test]
    async fn test_failed_item_keeps_its_row() {
        let fetcher = StubFetcher::new(vec![
            ("org/repoA", source("abc\ndef")),
            (
                "org/repoB",
                FetchResult::TransportError {
                    detail: "connection reset".to_string(),
                },
            ),
        ]);
        let items = vec![
            HarvestItem::file("org/repoA", "x.go"),
            HarvestItem::new("org/repoB", Some(String::new())),
        ];

        let report = HarvestLoop::new(fetcher, config()).run(&items).await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report.rows[0].item, items[0]);
        assert_eq!(report.rows[0].fields, Some(DerivedFields::Lines(2)));
        assert_eq!(report.rows[1].item, items[1]);
        assert_eq!(report.rows[1].fields, None);
    }

    #[tokio::test]
    async fn test_not_found_does_not_stop_the_run() {
        let fetcher = StubFetcher::new(vec![("org/last", source("x"))]);
        let items = vec![
            HarvestItem::file("org/missing", "a.go"),
            HarvestItem::file("org/missing", "b.go"),
            HarvestItem::file("org/last", "c.go"),
        ];

        let harvest = HarvestLoop::new(fetcher, config());
        let report = harvest.run(&items).await.unwrap();

        assert_eq!(harvest.fetcher.calls.load(Ordering::SeqCst), 3);
        let fields: Vec<_> = report.rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(fields, vec![None, None, Some(DerivedFields::Lines(1))]);
        let order: Vec<_> = report.rows.iter().map(|r| r.item.clone()).collect();
        assert_eq!(order, items);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_fetching() {
        let fetcher = StubFetcher::new(vec![]);
        let harvest = HarvestLoop::new(fetcher, HarvestConfig::default());

        let result = harvest.run(&[HarvestItem::repository("org/repo")]).await;

        assert!(matches!(result, Err(HarvestError::MissingCredential)));
        assert_eq!(harvest.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_credential_fails_before_fetching() {
        let fetcher = StubFetcher::new(vec![("org/repo", source("x"))]);
        let harvest = HarvestLoop::new(fetcher, config().with_credential(""));

        let result = harvest.run(&[HarvestItem::repository("org/repo")]).await;

        assert!(matches!(result, Err(HarvestError::MissingCredential)));
        assert_eq!(harvest.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_paces_every_request() {
        let fetcher = StubFetcher::new(vec![]);
        let items = vec![
            HarvestItem::repository("org/a"),
            HarvestItem::repository("org/b"),
            HarvestItem::repository("org/c"),
        ];
        let start = tokio::time::Instant::now();

        let report = HarvestLoop::new(fetcher, config())
            .with_gate(RateGate::new(Duration::from_millis(500)))
            .run(&items)
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_keyword_and_popularity_derivations() {
        let stats = RepoStats {
            name: "repoB".to_string(),
            watchers: 1,
            stars: 10,
            forks: 2,
        };
        let fetcher = StubFetcher::new(vec![
            ("org/repoA", source("stub.GetPrivateData(c, k)")),
            ("org/repoB", FetchResult::Success(Payload::Repository(stats.clone()))),
        ]);
        let items = vec![
            HarvestItem::file("org/repoA", "cc.go"),
            HarvestItem::repository("org/repoB"),
        ];

        let harvest = HarvestLoop::new(
            fetcher,
            config().with_derivation(Derivation::Keyword("PrivateData".to_string())),
        );
        let report = harvest.run(&items).await.unwrap();

        assert_eq!(report.rows[0].fields, Some(DerivedFields::Keyword(true)));
        assert_eq!(report.rows[1].fields, Some(DerivedFields::Popularity(stats)));
    }

    #[tokio::test]
    async fn test_sources_saved_by_input_index() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().join("code");
        let fetcher = StubFetcher::new(vec![
            ("org/a", source("package a\n")),
            ("org/c", source("package c\n")),
        ]);
        let items = vec![
            HarvestItem::file("org/a", "a.go"),
            HarvestItem::file("org/b", "b.go"),
            HarvestItem::file("org/c", "c.go"),
        ];

        HarvestLoop::new(fetcher, config().with_artifacts(&artifacts))
            .run(&items)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(artifacts.join("0.go")).unwrap(),
            "package a\n"
        );
        assert!(!artifacts.join("1.go").exists());
        assert_eq!(
            std::fs::read_to_string(artifacts.join("2.go")).unwrap(),
            "package c\n"
        );
    }

    #[tokio::test]
    async fn test_events_report_progress_and_failures() {
        let observer = Arc::new(RecordingObserver::default());
        let fetcher = StubFetcher::new(vec![("org/ok", source("1\n2"))]);
        let items = vec![
            HarvestItem::file("org/ok", "a.go"),
            HarvestItem::file("org/gone", "b.go"),
        ];

        HarvestLoop::new(fetcher, config())
            .with_observer(observer.clone())
            .run(&items)
            .await
            .unwrap();

        let events = observer.events.lock().unwrap();
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                HarvestEvent::Progress { processed, total } => Some((*processed, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(1, 2), (2, 2)]);

        assert!(events.iter().any(|e| matches!(
            e,
            HarvestEvent::ItemFailed {
                index: 1,
                reason: FailureReason::NotFound { status: 404, .. },
                ..
            }
        )));
        assert_eq!(
            events.last(),
            Some(&HarvestEvent::Finished { total: 2, failed: 1 })
        );
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_report() {
        let report = HarvestLoop::new(StubFetcher::new(vec![]), config())
            .run(&[])
            .await
            .unwrap();
        assert!(report.is_empty());
    }
}
