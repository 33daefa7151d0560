//! Ingestion Pipeline Implementation

use alerting::{encode_record, normalize, AlertBatch, AlertRecord, LocalClock, TimestampProvider};
use metrics::counter;
use notifier::{NotificationSink, SendError};
use std::sync::Arc;
use storage::{AlertStore, StoreError};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::result::{AlertError, BatchResult};
use crate::PipelineError;

/// Coordinates codec, store and sink for inbound batches.
///
/// Stateless between calls; concurrent `process` calls are safe because
/// the store serializes appends per key.
pub struct IngestionPipeline {
    store: Arc<AlertStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn TimestampProvider>,
    /// Chat id handed to the sink
    destination: String,
    config: PipelineConfig,
}

impl IngestionPipeline {
    /// Create a pipeline using the local wall clock.
    ///
    /// Fails if the destination is empty or a timeout is zero, so a
    /// misconfigured service never starts accepting requests.
    pub fn new(
        store: Arc<AlertStore>,
        sink: Arc<dyn NotificationSink>,
        destination: impl Into<String>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let destination = destination.into();
        if destination.trim().is_empty() {
            return Err(PipelineError::MissingDestination);
        }
        config.validate()?;

        info!(
            "Creating ingestion pipeline: sink={}, store={}, store_timeout={}ms, send_timeout={}ms",
            sink.name(),
            store.root().display(),
            config.store_timeout_ms,
            config.send_timeout_ms
        );

        Ok(Self {
            store,
            sink,
            clock: Arc::new(LocalClock),
            destination,
            config,
        })
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Arc<dyn TimestampProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    /// Process one batch.
    ///
    /// Alerts are handled strictly in order. A failing alert is recorded in
    /// the result and never stops the ones after it; a persisted alert is
    /// never rolled back because its notification failed.
    pub async fn process(&self, batch: &AlertBatch) -> BatchResult {
        let mut result = BatchResult::default();
        if batch.is_empty() {
            debug!("Empty batch, nothing to do");
            return result;
        }

        let timestamp = self.clock.now();
        debug!("Processing batch of {} alerts at {}", batch.len(), timestamp);

        for (index, raw) in batch.alerts.iter().enumerate() {
            let record = match normalize(raw, &timestamp) {
                Ok(record) => record,
                Err(skip) => {
                    debug!(alert_index = index, reason = %skip, "Alert skipped");
                    counter!("alert_relay_alerts_skipped_total").increment(1);
                    result.skipped += 1;
                    continue;
                }
            };

            let text = match encode_record(&record) {
                Ok(text) => text,
                Err(e) => {
                    result.errors.push(AlertError::store(index, e));
                    continue;
                }
            };

            if let Err(e) = self.persist(record).await {
                warn!(alert_index = index, error = %e, "Failed to persist alert");
                counter!("alert_relay_alert_errors_total", "kind" => "store").increment(1);
                result.errors.push(AlertError::store(index, e));
                continue;
            }

            if let Err(e) = self.notify(&text).await {
                warn!(alert_index = index, error = %e, "Failed to notify alert");
                counter!("alert_relay_alert_errors_total", "kind" => "notify").increment(1);
                result.errors.push(AlertError::notify(index, e));
            }

            counter!("alert_relay_alerts_processed_total").increment(1);
            result.processed += 1;
        }

        info!(
            "Batch done: processed={}, skipped={}, errors={}",
            result.processed,
            result.skipped,
            result.errors.len()
        );
        result
    }

    /// Append on the blocking pool, bounded by `store_timeout`.
    ///
    /// A timed-out append keeps running in the background and cannot be
    /// cancelled; once it holds its key lock, later appends to the key wait
    /// for it. If it times out while still queued for the lock, a later
    /// alert for the same key may be appended first, since the key mutex
    /// is not fair.
    async fn persist(&self, record: AlertRecord) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            let (team, severity) = (record.team.clone(), record.severity.clone());
            store.append(&team, &severity, record)
        });

        match timeout(self.config.store_timeout(), task).await {
            Ok(Ok(appended)) => appended.map(|_| ()),
            Ok(Err(join)) => Err(StoreError::IoFailure(format!("append task failed: {join}"))),
            Err(_) => Err(StoreError::Timeout(self.config.store_timeout_ms)),
        }
    }

    async fn notify(&self, text: &str) -> Result<(), SendError> {
        match timeout(
            self.config.send_timeout(),
            self.sink.send(&self.destination, text),
        )
        .await
        {
            Ok(sent) => sent,
            Err(_) => Err(SendError::Timeout(self.config.send_timeout_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;
    use alerting::FixedClock;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    const TS: &str = "20240101-12:00:00";

    /// Sink that records every call and can be told to fail or stall
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, destination: &str, text: &str) -> Result<(), SendError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.sent
                .lock()
                .unwrap()
                .push((destination.to_string(), text.to_string()));
            if self.fail {
                return Err(SendError::Rejected {
                    status: 400,
                    description: "chat not found".to_string(),
                });
            }
            Ok(())
        }
    }

    fn pipeline(
        dir: &tempfile::TempDir,
        sink: Arc<RecordingSink>,
        config: PipelineConfig,
    ) -> IngestionPipeline {
        let store = Arc::new(AlertStore::new(dir.path().join("alerts")));
        IngestionPipeline::new(store, sink, "-1001", config)
            .unwrap()
            .with_clock(Arc::new(FixedClock::new(TS)))
    }

    fn batch(json: &str) -> AlertBatch {
        AlertBatch::from_slice(json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_single_alert_persisted_and_sent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let result = pipeline
            .process(&batch(
                r#"{"alerts":[{"labels":{"team":"sre","severity":"critical"},"annotations":{"summary":"disk full","description":"d1"}}]}"#,
            ))
            .await;

        assert_eq!(result, BatchResult { processed: 1, skipped: 0, errors: vec![] });

        let expected = r#"{"team":"sre","severity":"critical","summary":"disk full","description":"d1","time_stamp":"20240101-12:00:00"}"#;
        let on_disk = fs::read_to_string(dir.path().join("alerts/sre/critical.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
        let want: serde_json::Value = serde_json::from_str(&format!("[{expected}]")).unwrap();
        assert_eq!(parsed, want);
        assert!(on_disk.starts_with("[\n  {\n    \"team\""));

        assert_eq!(sink.sent(), vec![("-1001".to_string(), expected.to_string())]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let result = pipeline.process(&batch(r#"{"alerts":[]}"#)).await;

        assert_eq!(result, BatchResult::default());
        assert!(sink.sent().is_empty());
        assert!(!dir.path().join("alerts").exists());
    }

    #[tokio::test]
    async fn test_skipped_alerts_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let result = pipeline
            .process(&batch(
                r#"{"alerts":[
                    {"labels":{"severity":"critical"}},
                    {"labels":{"team":"sre"}},
                    {"labels":{"team":"","severity":"critical"}},
                    {}
                ]}"#,
            ))
            .await;

        assert_eq!(result, BatchResult { processed: 0, skipped: 4, errors: vec![] });
        assert!(sink.sent().is_empty());
        assert!(!dir.path().join("alerts").exists());
    }

    #[tokio::test]
    async fn test_store_failure_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let result = pipeline
            .process(&batch(
                r#"{"alerts":[
                    {"labels":{"team":"sre","severity":"critical"},"annotations":{"summary":"one"}},
                    {"labels":{"team":"../../etc","severity":"critical"},"annotations":{"summary":"two"}},
                    {"labels":{"team":"sre","severity":"critical"},"annotations":{"summary":"three"}}
                ]}"#,
            ))
            .await;

        assert_eq!(result.processed, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].alert_index, 1);
        assert_eq!(result.errors[0].kind, ErrorKind::StoreError);

        let log = pipeline.store().load("sre", "critical").unwrap();
        let summaries: Vec<_> = log.iter().filter_map(|r| r.summary.as_deref()).collect();
        assert_eq!(summaries, vec!["one", "three"]);
        assert_eq!(sink.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_log_reported_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let team_dir = dir.path().join("alerts/sre");
        fs::create_dir_all(&team_dir).unwrap();
        fs::write(team_dir.join("critical.json"), b"[{\"team\":").unwrap();

        let result = pipeline
            .process(&batch(
                r#"{"alerts":[
                    {"labels":{"team":"sre","severity":"critical"}},
                    {"labels":{"team":"sre","severity":"warning"}}
                ]}"#,
            ))
            .await;

        assert_eq!(result.processed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].alert_index, 0);
        assert_eq!(result.errors[0].kind, ErrorKind::StoreError);
        assert!(result.errors[0].detail.contains("Corrupt log"));
        assert_eq!(fs::read(team_dir.join("critical.json")).unwrap(), b"[{\"team\":");
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_notify_failure_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        let result = pipeline
            .process(&batch(r#"{"alerts":[{"labels":{"team":"sre","severity":"info"}}]}"#))
            .await;

        assert_eq!(result.processed, 1);
        assert_eq!(result.count(ErrorKind::NotifyError), 1);
        assert_eq!(pipeline.store().load("sre", "info").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_timeout_is_notify_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let config = PipelineConfig {
            send_timeout_ms: 20,
            ..Default::default()
        };
        let pipeline = pipeline(&dir, Arc::clone(&sink), config);

        let result = pipeline
            .process(&batch(r#"{"alerts":[{"labels":{"team":"sre","severity":"info"}}]}"#))
            .await;

        assert_eq!(result.processed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::NotifyError);
        assert!(result.errors[0].detail.contains("timed out"));
        assert_eq!(pipeline.store().load("sre", "info").unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_timeout_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let config = PipelineConfig {
            store_timeout_ms: 50,
            ..Default::default()
        };
        let pipeline = pipeline(&dir, Arc::clone(&sink), config);

        // Reading a FIFO with no writer blocks the append indefinitely
        let log = dir.path().join("alerts/sre/critical.json");
        fs::create_dir_all(log.parent().unwrap()).unwrap();
        let made = std::process::Command::new("mkfifo").arg(&log).status().unwrap();
        assert!(made.success());

        let result = pipeline
            .process(&batch(
                r#"{"alerts":[
                    {"labels":{"team":"sre","severity":"critical"},"annotations":{"summary":"stuck"}},
                    {"labels":{"team":"db","severity":"page"},"annotations":{"summary":"next"}}
                ]}"#,
            ))
            .await;

        assert_eq!(result.processed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].alert_index, 0);
        assert_eq!(result.errors[0].kind, ErrorKind::StoreError);
        assert!(result.errors[0].detail.contains("timed out"));

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("\"summary\":\"next\""));

        // Unblock the abandoned append; it still completes under its lock
        fs::write(&log, b"[]").unwrap();
        let stored = pipeline.store().load("sre", "critical").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].summary.as_deref(), Some("stuck"));
    }

    #[tokio::test]
    async fn test_batch_shares_timestamp_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(&dir, Arc::clone(&sink), PipelineConfig::default());

        pipeline
            .process(&batch(
                r#"{"alerts":[
                    {"labels":{"team":"sre","severity":"warning"},"annotations":{"summary":"a"}},
                    {"labels":{"team":"db","severity":"warning"},"annotations":{"summary":"b"}},
                    {"labels":{"team":"sre","severity":"warning"},"annotations":{"summary":"c"}}
                ]}"#,
            ))
            .await;

        let log = pipeline.store().load("sre", "warning").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].summary.as_deref(), Some("a"));
        assert_eq!(log[1].summary.as_deref(), Some("c"));
        assert!(log.iter().all(|r| r.timestamp == TS));

        let texts: Vec<_> = sink.sent().into_iter().map(|(_, t)| t).collect();
        assert!(texts[0].contains("\"summary\":\"a\""));
        assert!(texts[1].contains("\"summary\":\"b\""));
        assert!(texts[2].contains("\"summary\":\"c\""));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Arc::new(pipeline(&dir, Arc::clone(&sink), PipelineConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                pipeline
                    .process(&batch(
                        r#"{"alerts":[
                            {"labels":{"team":"sre","severity":"critical"}},
                            {"labels":{"team":"sre","severity":"critical"}}
                        ]}"#,
                    ))
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_clean());
        }

        assert_eq!(pipeline.store().load("sre", "critical").unwrap().len(), 16);
        assert_eq!(sink.sent().len(), 16);
    }

    #[test]
    fn test_missing_destination_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AlertStore::new(dir.path()));
        let sink: Arc<dyn NotificationSink> = Arc::new(RecordingSink::default());

        assert!(matches!(
            IngestionPipeline::new(store, sink, " ", PipelineConfig::default()),
            Err(PipelineError::MissingDestination)
        ));
    }
}
