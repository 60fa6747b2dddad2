//! MetricSink - Gauges collected during one verification run
//!
//! | Metric | Labels | Value |
//! |--------|--------|-------|
//! | `borg_last_verify` | `repo`, `result` | Epoch seconds when the outcome was recorded |
//! | `borg_snapshot_creation_time` | `repo`, `snapshot` | Archive creation time, epoch seconds |
//! | `borg_repository_size` | `repo`, `kind` | Bytes |
//!
//! Every series is keyed by its repository, so verifiers running in parallel
//! never write the same series. Gauges store their value atomically and the
//! sink is a cheap clone over shared state.

use chrono::{DateTime, Utc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use shared::{CheckOutcome, RepositoryTarget, SizeKind, SizeObservation, SnapshotObservation};

use crate::error::{MetricsError, MetricsResult};

pub const LAST_VERIFY_METRIC: &str = "borg_last_verify";
pub const SNAPSHOT_CREATION_METRIC: &str = "borg_snapshot_creation_time";
pub const REPOSITORY_SIZE_METRIC: &str = "borg_repository_size";

/// Run-scoped collection of verification gauges
#[derive(Clone)]
pub struct MetricSink {
    registry: Registry,
    last_verify: GaugeVec,
    snapshot_created: GaugeVec,
    repository_size: GaugeVec,
}

impl MetricSink {
    /// Creates a fresh registry holding the three verification gauges.
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();

        let last_verify = register_gauge(
            &registry,
            LAST_VERIFY_METRIC,
            "Last time the repository was checked",
            &["repo", "result"],
        )?;
        let snapshot_created = register_gauge(
            &registry,
            SNAPSHOT_CREATION_METRIC,
            "Time each snapshot in the repository was created",
            &["repo", "snapshot"],
        )?;
        let repository_size = register_gauge(
            &registry,
            REPOSITORY_SIZE_METRIC,
            "Size of the repository, in bytes",
            &["repo", "kind"],
        )?;

        Ok(Self {
            registry,
            last_verify,
            snapshot_created,
            repository_size,
        })
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Marks `target` as having reached `outcome` at time `at`.
    pub fn record_outcome(&self, target: &RepositoryTarget, outcome: CheckOutcome, at: DateTime<Utc>) {
        let seconds = at.timestamp_millis() as f64 / 1000.0;
        self.last_verify
            .with_label_values(&[target.as_str(), outcome.as_label()])
            .set(seconds);
    }

    pub fn record_snapshot(&self, target: &RepositoryTarget, snapshot_id: &str, created_at: i64) {
        self.snapshot_created
            .with_label_values(&[target.as_str(), snapshot_id])
            .set(created_at as f64);
    }

    pub fn record_size(&self, target: &RepositoryTarget, kind: SizeKind, bytes: u64) {
        self.repository_size
            .with_label_values(&[target.as_str(), kind.as_label()])
            .set(bytes as f64);
    }

    pub fn record_size_observation(&self, observation: &SizeObservation) {
        self.record_size(&observation.target, observation.kind, observation.bytes);
    }

    pub fn record_snapshot_observation(&self, observation: &SnapshotObservation) {
        self.record_snapshot(
            &observation.target,
            &observation.snapshot_id,
            observation.created_at,
        );
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Snapshot of every series, in the form the Pushgateway client takes.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of the current state.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    // ========================================================================
    // Inspection
    //
    // These read gathered state so that looking a series up never creates it.
    // ========================================================================

    pub fn outcome_time(&self, target: &RepositoryTarget, outcome: CheckOutcome) -> Option<f64> {
        self.find(LAST_VERIFY_METRIC, target, "result", outcome.as_label())
    }

    pub fn snapshot_time(&self, target: &RepositoryTarget, snapshot_id: &str) -> Option<f64> {
        self.find(SNAPSHOT_CREATION_METRIC, target, "snapshot", snapshot_id)
    }

    pub fn size(&self, target: &RepositoryTarget, kind: SizeKind) -> Option<f64> {
        self.find(REPOSITORY_SIZE_METRIC, target, "kind", kind.as_label())
    }

    /// Outcomes recorded for `target`, in label order.
    pub fn outcomes(&self, target: &RepositoryTarget) -> Vec<String> {
        self.series_for(LAST_VERIFY_METRIC, target)
            .into_iter()
            .filter_map(|labels| label_value(&labels, "result"))
            .collect()
    }

    pub fn snapshot_count(&self, target: &RepositoryTarget) -> usize {
        self.series_for(SNAPSHOT_CREATION_METRIC, target).len()
    }

    pub fn size_count(&self, target: &RepositoryTarget) -> usize {
        self.series_for(REPOSITORY_SIZE_METRIC, target).len()
    }

    fn find(&self, metric: &str, target: &RepositoryTarget, label: &str, value: &str) -> Option<f64> {
        let family = self.gather().into_iter().find(|f| f.get_name() == metric)?;
        family
            .get_metric()
            .iter()
            .find(|m| {
                let labels = m.get_label();
                labels.iter().any(|l| l.get_name() == "repo" && l.get_value() == target.as_str())
                    && labels.iter().any(|l| l.get_name() == label && l.get_value() == value)
            })
            .map(|m| m.get_gauge().get_value())
    }

    fn series_for(&self, metric: &str, target: &RepositoryTarget) -> Vec<Vec<(String, String)>> {
        self.gather()
            .into_iter()
            .filter(|f| f.get_name() == metric)
            .flat_map(|f| f.get_metric().to_vec())
            .map(|m| {
                m.get_label()
                    .iter()
                    .map(|l| (l.get_name().to_string(), l.get_value().to_string()))
                    .collect::<Vec<_>>()
            })
            .filter(|labels| label_value(labels, "repo").as_deref() == Some(target.as_str()))
            .collect()
    }
}

impl std::fmt::Debug for MetricSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSink")
            .field("families", &self.gather().len())
            .finish()
    }
}

fn register_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> MetricsResult<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels).map_err(MetricsError::Registration)?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(MetricsError::Registration)?;
    Ok(gauge)
}

fn label_value(labels: &[(String, String)], name: &str) -> Option<String> {
    labels
        .iter()
        .find(|(label, _)| label == name)
        .map(|(_, value)| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    fn sink() -> MetricSink {
        MetricSink::new().unwrap()
    }

    // ============== Outcome Tests ==============

    #[test]
    fn test_record_outcome_sets_time() {
        let sink = sink();
        let repo = RepositoryTarget::new("/srv/repo");
        let at = Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap();

        sink.record_outcome(&repo, CheckOutcome::Ok, at);

        assert_eq!(sink.outcome_time(&repo, CheckOutcome::Ok), Some(1680350400.0));
        assert_eq!(sink.outcome_time(&repo, CheckOutcome::Bad), None);
        assert_eq!(sink.outcomes(&repo), vec!["OK".to_string()]);
    }

    #[test]
    fn test_record_outcome_keeps_fractional_seconds() {
        let sink = sink();
        let repo = RepositoryTarget::new("repo");
        let at = Utc.timestamp_millis_opt(1_680_350_400_250).unwrap();

        sink.record_outcome(&repo, CheckOutcome::Bad, at);

        assert_eq!(sink.outcome_time(&repo, CheckOutcome::Bad), Some(1680350400.25));
    }

    // ============== Snapshot and Size Tests ==============

    #[test]
    fn test_record_snapshot() {
        let sink = sink();
        let repo = RepositoryTarget::new("repo");

        sink.record_snapshot(&repo, "a1b2", 1680350400);
        sink.record_snapshot(&repo, "c3d4", 1680436800);

        assert_eq!(sink.snapshot_count(&repo), 2);
        assert_eq!(sink.snapshot_time(&repo, "c3d4"), Some(1680436800.0));
    }

    #[test]
    fn test_rerecording_overwrites() {
        let sink = sink();
        let repo = RepositoryTarget::new("repo");

        sink.record_size(&repo, SizeKind::Unique, 10);
        sink.record_size(&repo, SizeKind::Unique, 20);

        assert_eq!(sink.size_count(&repo), 1);
        assert_eq!(sink.size(&repo, SizeKind::Unique), Some(20.0));
    }

    #[test]
    fn test_record_observations() {
        let sink = sink();
        let repo = RepositoryTarget::new("repo");

        sink.record_size_observation(&SizeObservation {
            target: repo.clone(),
            kind: SizeKind::CompressedRaw,
            bytes: 4096,
        });
        sink.record_snapshot_observation(&SnapshotObservation {
            target: repo.clone(),
            snapshot_id: "snap".to_string(),
            created_at: 42,
        });

        assert_eq!(sink.size(&repo, SizeKind::CompressedRaw), Some(4096.0));
        assert_eq!(sink.snapshot_time(&repo, "snap"), Some(42.0));
    }

    // ============== Label Isolation Tests ==============

    #[test]
    fn test_targets_do_not_share_series() {
        let sink = sink();
        let a = RepositoryTarget::new("a");
        let b = RepositoryTarget::new("b");
        let now = Utc::now();

        sink.record_outcome(&a, CheckOutcome::Ok, now);
        sink.record_outcome(&b, CheckOutcome::Bad, now);
        sink.record_size(&a, SizeKind::Raw, 1);

        assert_eq!(sink.outcomes(&a), vec!["OK".to_string()]);
        assert_eq!(sink.outcomes(&b), vec!["BAD".to_string()]);
        assert_eq!(sink.size_count(&a), 1);
        assert_eq!(sink.size_count(&b), 0);
    }

    #[test]
    fn test_inspection_does_not_create_series() {
        let sink = sink();
        let repo = RepositoryTarget::new("repo");

        assert_eq!(sink.size(&repo, SizeKind::Raw), None);
        assert_eq!(sink.snapshot_time(&repo, "x"), None);
        assert!(sink.gather().is_empty());
    }

    #[test]
    fn test_concurrent_recording() {
        let sink = sink();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                thread::spawn(move || {
                    let repo = RepositoryTarget::new(format!("repo-{i}"));
                    for n in 0..50 {
                        sink.record_snapshot(&repo, &format!("snap-{n}"), n);
                    }
                    sink.record_outcome(&repo, CheckOutcome::Ok, Utc::now());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..8 {
            let repo = RepositoryTarget::new(format!("repo-{i}"));
            assert_eq!(sink.snapshot_count(&repo), 50);
            assert_eq!(sink.outcomes(&repo), vec!["OK".to_string()]);
        }
    }

    // ============== Export Tests ==============

    #[test]
    fn test_encode_text_uses_exposed_names() {
        let sink = sink();
        let repo = RepositoryTarget::new("/srv/repo");

        sink.record_outcome(&repo, CheckOutcome::Internal, Utc::now());
        sink.record_snapshot(&repo, "abc", 1680350400);
        sink.record_size(&repo, SizeKind::CompressedUnique, 123);

        let text = sink.encode_text().unwrap();
        assert!(text.contains("# HELP borg_last_verify Last time the repository was checked"));
        assert!(text.contains(r#"borg_last_verify{repo="/srv/repo",result="INTERNAL"}"#));
        assert!(text.contains(r#"borg_snapshot_creation_time{repo="/srv/repo",snapshot="abc"} 1680350400"#));
        assert!(text.contains(r#"borg_repository_size{kind="compressed_unique",repo="/srv/repo"} 123"#));
    }

    #[test]
    fn test_sinks_are_independent() {
        let first = sink();
        let second = sink();
        first.record_size(&"repo".into(), SizeKind::Raw, 1);

        assert!(second.gather().is_empty());
    }
}
