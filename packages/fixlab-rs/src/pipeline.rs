use crate::detector::FixationDetector;
use crate::error::{FixlabError, Result};
use crate::options::DetectorOptions;
use crate::quality;
use crate::results::ResultTable;
use crate::session::{check_label_collisions, partition, Session, SessionOrder};
use crate::snapshot::SnapshotSink;
use crate::types::{Eye, RawSample, SessionKey};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Sessions between intermediate snapshots
pub const DEFAULT_CHECKPOINT_EVERY: usize = 20;

/// What to do when the detector fails on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run and return the error
    #[default]
    Abort,
    /// Log the failure, record it in the report and go on
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Persist the table after every session whose 0-based index is a
    /// multiple of this value; 0 writes only the final snapshot
    pub checkpoint_every: usize,
    pub failure_policy: FailurePolicy,
    pub session_order: SessionOrder,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            failure_policy: FailurePolicy::Abort,
            session_order: SessionOrder::FirstSeen,
        }
    }
}

impl PipelineConfig {
    fn is_checkpoint(&self, index: usize) -> bool {
        self.checkpoint_every > 0 && index % self.checkpoint_every == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSession {
    pub key: SessionKey,
    pub label: String,
    pub reason: String,
}

/// Outcome of a full run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(skip)]
    pub table: ResultTable,
    pub sessions_total: usize,
    pub sessions_processed: usize,
    pub fixations: usize,
    pub skipped: Vec<SkippedSession>,
    /// Checkpoints plus the final snapshot
    pub snapshots_written: usize,
    pub started_at: String,
    pub finished_at: String,
}

/// Passed to the progress callback before each session
#[derive(Debug, Clone, Copy)]
pub struct SessionProgress<'a> {
    /// 0-based position in processing order
    pub index: usize,
    pub total: usize,
    pub key: &'a SessionKey,
}

type ProgressFn = Box<dyn FnMut(&SessionProgress<'_>) + Send>;

/// Session orchestrator.
///
/// Runs each session through the quality filter and the detector, one at a
/// time and in order, accumulating labeled fixations and handing table
/// snapshots to the sink.
pub struct Pipeline<D, S> {
    detector: D,
    sink: S,
    options: DetectorOptions,
    config: PipelineConfig,
    progress: Option<ProgressFn>,
}

impl<D: FixationDetector, S: SnapshotSink> Pipeline<D, S> {
    pub fn new(detector: D, sink: S, options: DetectorOptions, config: PipelineConfig) -> Self {
        Self {
            detector,
            sink,
            options,
            config,
            progress: None,
        }
    }

    /// Call `f` before each session is processed
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&SessionProgress<'_>) + Send + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Group `raw` into sessions and process all of them
    pub async fn run(&mut self, raw: Vec<RawSample>) -> Result<RunReport> {
        self.options.validate()?;
        let sessions = partition(raw, self.config.session_order);
        self.run_sessions(sessions).await
    }

    /// Process already partitioned sessions in the given order
    pub async fn run_sessions(&mut self, sessions: Vec<Session>) -> Result<RunReport> {
        check_label_collisions(&sessions)?;

        let started_at = chrono::Utc::now().to_rfc3339();
        let run_start = Instant::now();
        let bounds = self.options.resolution();
        let total = sessions.len();

        let mut table = ResultTable::new();
        let mut skipped: Vec<SkippedSession> = Vec::new();
        let mut snapshots_written = 0usize;

        log::info!(
            "Processing {} sessions (checkpoint every {})",
            total,
            self.config.checkpoint_every
        );

        for (index, session) in sessions.iter().enumerate() {
            if let Some(progress) = self.progress.as_mut() {
                progress(&SessionProgress {
                    index,
                    total,
                    key: &session.key,
                });
            }
            log::info!("Processing {}", session.key);

            let label = session.label();
            let cleaned = quality::filter(&session.samples, bounds);
            log::debug!(
                "{}: {} samples, missing left {:.1}%, right {:.1}%",
                label,
                cleaned.len(),
                quality::missing_fraction(&cleaned, Eye::Left) * 100.0,
                quality::missing_fraction(&cleaned, Eye::Right) * 100.0
            );

            match self.detector.detect(&cleaned, &self.options).await {
                Ok(fixations) => {
                    log::debug!("{}: {} fixations", label, fixations.len());
                    table.append_session(&label, fixations);
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        log::error!("Detection failed for {}: {}", session.key, e);
                        return Err(FixlabError::SessionFailed {
                            session: session.key.to_string(),
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::Skip => {
                        log::warn!("Skipping {} after detection failure: {}", session.key, e);
                        skipped.push(SkippedSession {
                            key: session.key.clone(),
                            label,
                            reason: e.to_string(),
                        });
                    }
                },
            }

            if self.config.is_checkpoint(index) {
                self.sink.persist(&table)?;
                snapshots_written += 1;
                log::info!(
                    "Checkpoint after {} of {} sessions: {} fixations",
                    index + 1,
                    total,
                    table.len()
                );
            }
        }

        self.sink.persist(&table)?;
        snapshots_written += 1;

        log::info!(
            "Finished {} sessions in {:.2}s: {} fixations, {} skipped",
            total,
            run_start.elapsed().as_secs_f64(),
            table.len(),
            skipped.len()
        );

        Ok(RunReport {
            sessions_total: total,
            sessions_processed: table.sessions(),
            fixations: table.len(),
            skipped,
            snapshots_written,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanedSample, EyeSample, Fixation, GazeSample, LabeledFixation};
    use std::sync::{Arc, Mutex};

    /// Returns one fixation per sample and remembers what it was given
    #[derive(Default)]
    struct RecordingDetector {
        calls: Mutex<Vec<Vec<CleanedSample>>>,
        fail_on_call: Option<usize>,
    }

    impl FixationDetector for RecordingDetector {
        async fn detect(
            &self,
            samples: &[CleanedSample],
            _options: &DetectorOptions,
        ) -> Result<Vec<Fixation>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(samples.to_vec());
                calls.len() - 1
            };
            if self.fail_on_call == Some(call) {
                return Err(FixlabError::DetectionFailed(
                    "too many clustering errors".to_string(),
                ));
            }
            Ok(samples
                .iter()
                .enumerate()
                .map(|(i, s)| Fixation {
                    start: i,
                    end: i,
                    start_time: s.time,
                    end_time: s.time,
                    duration: 0.0,
                    x: s.left.x.unwrap_or(f64::NAN),
                    y: s.left.y.unwrap_or(f64::NAN),
                    cutoff: None,
                    flank_data_loss: None,
                    frac_interped: None,
                    rms_xy: None,
                    bcea: None,
                    range_x: None,
                    range_y: None,
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        snapshots: Vec<Vec<LabeledFixation>>,
    }

    impl SnapshotSink for MemorySink {
        fn persist(&mut self, table: &ResultTable) -> Result<()> {
            self.snapshots.push(table.rows().to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn persist(&mut self, _table: &ResultTable) -> Result<()> {
            Err(FixlabError::PersistFailed {
                path: "/full/disk.csv".to_string(),
                reason: "No space left on device".to_string(),
            })
        }
    }

    fn raw(participant: &str, recording: &str, time: f64, left: EyeSample) -> RawSample {
        RawSample {
            participant_id: participant.to_string(),
            recording_id: recording.to_string(),
            sample: GazeSample {
                time,
                left,
                right: EyeSample::new(500.0, 500.0),
            },
        }
    }

    fn sessions_input(count: usize) -> Vec<RawSample> {
        // Session s has s + 1 samples
        (0..count)
            .flat_map(|s| {
                (0..=s).map(move |i| {
                    raw(
                        &format!("P{}", s),
                        &format!("Recording{}", s),
                        i as f64,
                        EyeSample::new(100.0, 100.0),
                    )
                })
            })
            .collect()
    }

    fn config(checkpoint_every: usize) -> PipelineConfig {
        PipelineConfig {
            checkpoint_every,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_two_session_scenario() {
        let xres = 1920.0;
        let mut input = Vec::new();
        for i in 0..3 {
            input.push(raw("A", "Recording1", i as f64, EyeSample::new(100.0 + i as f64, 200.0)));
        }
        for i in 0..3 {
            input.push(raw("B", "Recording2", i as f64, EyeSample::new(3.0 * xres, 200.0)));
        }

        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            PipelineConfig::default(),
        );
        let report = pipeline.run(input.clone()).await.unwrap();

        let calls = pipeline.detector().calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let raw_a: Vec<GazeSample> = input[..3].iter().map(|r| r.sample.clone()).collect();
        assert_eq!(calls[0], raw_a);
        for (cleaned, original) in calls[1].iter().zip(&input[3..]) {
            assert!(cleaned.left.is_missing());
            assert_eq!(cleaned.time, original.sample.time);
            assert_eq!(cleaned.right, original.sample.right);
        }

        let labels: Vec<&str> = report
            .table
            .rows()
            .iter()
            .map(|r| r.session_label.as_str())
            .collect();
        assert_eq!(labels, vec!["a_1", "a_1", "a_1", "b_2", "b_2", "b_2"]);
        assert_eq!(report.sessions_total, 2);
        assert_eq!(report.sessions_processed, 2);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_one_row_per_fixation() {
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            config(0),
        );
        let report = pipeline.run(sessions_input(4)).await.unwrap();
        // 1 + 2 + 3 + 4 fixations
        assert_eq!(report.fixations, 10);
        assert_eq!(report.table.len(), 10);
        assert!(report.table.rows().iter().all(|r| !r.session_label.is_empty()));
    }

    #[tokio::test]
    async fn test_checkpoints_are_session_prefixes() {
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            config(2),
        );
        let report = pipeline.run(sessions_input(5)).await.unwrap();
        let sink = pipeline.into_sink();

        // After sessions 0, 2 and 4, then the final write
        assert_eq!(report.snapshots_written, 4);
        let sizes: Vec<usize> = sink.snapshots.iter().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![1, 6, 15, 15]);

        let last_labels = |snapshot: &Vec<LabeledFixation>| {
            snapshot.last().map(|r| r.session_label.clone()).unwrap()
        };
        assert_eq!(last_labels(&sink.snapshots[0]), "p0_0");
        assert_eq!(last_labels(&sink.snapshots[1]), "p2_2");
        assert_eq!(last_labels(&sink.snapshots[2]), "p4_4");

        let final_rows = report.table.rows();
        for snapshot in &sink.snapshots {
            assert_eq!(snapshot.as_slice(), &final_rows[..snapshot.len()]);
        }
    }

    #[tokio::test]
    async fn test_checkpoint_disabled_writes_final_only() {
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            config(0),
        );
        pipeline.run(sessions_input(3)).await.unwrap();
        assert_eq!(pipeline.sink().snapshots.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_still_persists() {
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            PipelineConfig::default(),
        );
        let report = pipeline.run(Vec::new()).await.unwrap();
        assert_eq!(report.sessions_total, 0);
        assert_eq!(pipeline.sink().snapshots, vec![Vec::new()]);
    }

    #[tokio::test]
    async fn test_detector_failure_aborts_by_default() {
        let detector = RecordingDetector {
            fail_on_call: Some(1),
            ..RecordingDetector::default()
        };
        let mut pipeline = Pipeline::new(
            detector,
            MemorySink::default(),
            DetectorOptions::default(),
            config(1),
        );
        let err = pipeline.run(sessions_input(4)).await.unwrap_err();
        match err {
            FixlabError::SessionFailed { session, source } => {
                assert_eq!(session, "P1, Recording1");
                assert!(matches!(*source, FixlabError::DetectionFailed(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(pipeline.detector().calls.lock().unwrap().len(), 2);
        // Only the checkpoint after the first session was written
        assert_eq!(pipeline.sink().snapshots.len(), 1);
    }

    #[tokio::test]
    async fn test_skip_policy_continues() {
        let detector = RecordingDetector {
            fail_on_call: Some(1),
            ..RecordingDetector::default()
        };
        let mut pipeline = Pipeline::new(
            detector,
            MemorySink::default(),
            DetectorOptions::default(),
            PipelineConfig {
                failure_policy: FailurePolicy::Skip,
                ..config(0)
            },
        );
        let report = pipeline.run(sessions_input(3)).await.unwrap();
        assert_eq!(report.sessions_processed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].label, "p1_1");
        assert!(report.skipped[0].reason.contains("clustering"));
        // Sessions 0 and 2 only: 1 + 3 fixations
        assert_eq!(report.fixations, 4);
    }

    #[tokio::test]
    async fn test_label_collision_rejected_before_detection() {
        let input = vec![
            raw("A", "Recording1", 0.0, EyeSample::new(1.0, 1.0)),
            raw("a", "1", 0.0, EyeSample::new(1.0, 1.0)),
        ];
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            PipelineConfig::default(),
        );
        let err = pipeline.run(input).await.unwrap_err();
        assert!(matches!(err, FixlabError::LabelCollision { .. }));
        assert!(pipeline.detector().calls.lock().unwrap().is_empty());
        assert!(pipeline.sink().snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let options = DetectorOptions {
            freq: -1.0,
            ..DetectorOptions::default()
        };
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            options,
            PipelineConfig::default(),
        );
        let err = pipeline.run(sessions_input(1)).await.unwrap_err();
        assert!(matches!(err, FixlabError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_persist_failure_is_fatal() {
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            FailingSink,
            DetectorOptions::default(),
            config(1),
        );
        let err = pipeline.run(sessions_input(3)).await.unwrap_err();
        assert!(matches!(err, FixlabError::PersistFailed { .. }));
        assert_eq!(pipeline.detector().calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_session() {
        let seen: Arc<Mutex<Vec<(usize, usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut pipeline = Pipeline::new(
            RecordingDetector::default(),
            MemorySink::default(),
            DetectorOptions::default(),
            PipelineConfig {
                session_order: SessionOrder::Sorted,
                ..PipelineConfig::default()
            },
        )
        .with_progress(move |p| {
            recorder
                .lock()
                .unwrap()
                .push((p.index, p.total, p.key.to_string()));
        });

        let input = vec![
            raw("B", "Recording1", 0.0, EyeSample::new(1.0, 1.0)),
            raw("A", "Recording1", 0.0, EyeSample::new(1.0, 1.0)),
        ];
        pipeline.run(input).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (0, 2, "A, Recording1".to_string()),
                (1, 2, "B, Recording1".to_string()),
            ]
        );
    }
}
