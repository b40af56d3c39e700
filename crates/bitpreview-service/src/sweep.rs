//! Batch generation of missing previews.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;

use bitpreview_core::{Bitstream, BitstreamId};
use bitpreview_extract::ScratchSpace;

use crate::access::AccessPolicy;
use crate::service::{PreviewOutcome, PreviewService};
use crate::source::ContentSource;
use crate::store::PreviewStore;

/// Bitstreams between progress reports.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Progress of a running sweep.
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Bitstreams visited so far.
    pub processed: u64,
    /// Previews stored so far.
    pub generated: u64,
    /// Failures so far.
    pub failed: u64,
    /// Bitstream most recently visited.
    pub current: BitstreamId,
    /// Time since the sweep started.
    pub elapsed: Duration,
}

/// One bitstream the sweep could not preview.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    /// The bitstream that failed.
    pub bitstream: BitstreamId,
    /// Rendered error.
    pub error: String,
}

/// Totals of a finished sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Bitstreams visited.
    pub processed: u64,
    /// Previews newly stored.
    pub generated: u64,
    /// Nodes written for new previews.
    pub nodes_stored: u64,
    /// Bitstreams that already had a preview.
    pub existing: u64,
    /// Bitstreams the caller may not preview.
    pub denied: u64,
    /// Previews generated but not stored (HTML).
    pub transient: u64,
    /// Bitstreams with nothing to preview.
    pub empty: u64,
    /// Per-bitstream failures; the sweep continued past each.
    pub failures: Vec<SweepFailure>,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
}

impl SweepReport {
    /// Whether every bitstream was handled without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: PreviewOutcome) {
        match outcome {
            PreviewOutcome::Denied => self.denied += 1,
            PreviewOutcome::Existing => self.existing += 1,
            PreviewOutcome::Stored { nodes } => {
                self.generated += 1;
                self.nodes_stored += nodes as u64;
            }
            PreviewOutcome::Transient => self.transient += 1,
            PreviewOutcome::Empty => self.empty += 1,
        }
    }
}

/// Walks a set of bitstreams and stores every missing preview.
pub struct PreviewSweeper {
    progress_tx: broadcast::Sender<SweepProgress>,
}

impl PreviewSweeper {
    /// Create a new sweeper.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to sweep progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SweepProgress> {
        self.progress_tx.subscribe()
    }

    /// Generate and store previews for every bitstream that lacks one.
    ///
    /// A failure on one bitstream is logged and recorded; the sweep moves on.
    pub fn run<S, P, X, C, I>(
        &self,
        service: &PreviewService<S, P, X>,
        source: &C,
        bitstreams: I,
    ) -> SweepReport
    where
        S: PreviewStore,
        P: AccessPolicy,
        X: ScratchSpace,
        C: ContentSource + ?Sized,
        I: IntoIterator<Item = Bitstream>,
    {
        let start = Instant::now();
        let mut report = SweepReport::default();

        for bitstream in bitstreams {
            match service.ensure_preview(&bitstream, source) {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    tracing::error!(bitstream = %bitstream.id, error = %err, "preview generation failed");
                    report.failures.push(SweepFailure {
                        bitstream: bitstream.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
            report.processed += 1;

            if report.processed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    processed = report.processed,
                    generated = report.generated,
                    failed = report.failures.len(),
                    "sweep progress"
                );
                let _ = self.progress_tx.send(SweepProgress {
                    processed: report.processed,
                    generated: report.generated,
                    failed: report.failures.len() as u64,
                    current: bitstream.id.clone(),
                    elapsed: start.elapsed(),
                });
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            processed = report.processed,
            generated = report.generated,
            failed = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "sweep finished"
        );
        report
    }
}

impl Default for PreviewSweeper {
    fn default() -> Self {
        Self::new()
    }
}
