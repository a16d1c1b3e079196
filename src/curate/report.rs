// Run report assembly

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ImageScore;

/// Final disposition of one image in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Copied (or would be, in dry-run) to its destination
    Selected,
    /// Scored but not selected (explicit or below the cut)
    Rejected,
    /// Destination already existed; skipped without scoring
    AlreadyProcessed,
    /// Scoring or materialization failed; will be retried next run
    Errored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub source_path: PathBuf,
    pub status: OutcomeStatus,
    pub score: Option<ImageScore>,
    pub destination: Option<PathBuf>,
    pub error: Option<String>,
}

/// Execution summary for one folder.
/// Images the circuit breaker never reached are absent from `results`
/// entirely; they have no outcome and are not counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationReport {
    pub timestamp: DateTime<Utc>,
    pub source_folder: String,
    /// Folder-level short-circuit hit: nothing was touched
    pub skipped_folder: bool,
    pub total_images: usize,
    pub selected: usize,
    pub already_processed: usize,
    pub rejected_explicit: usize,
    pub rejected_low_score: usize,
    pub errors: usize,
    /// Mean combined score over images that received a score
    pub avg_score: f64,
    pub results: Vec<ImageOutcome>,
}

impl CurationReport {
    pub fn skipped(source_folder: &std::path::Path) -> Self {
        CurationReport {
            timestamp: Utc::now(),
            source_folder: source_folder.display().to_string(),
            skipped_folder: true,
            total_images: 0,
            selected: 0,
            already_processed: 0,
            rejected_explicit: 0,
            rejected_low_score: 0,
            errors: 0,
            avg_score: 0.0,
            results: Vec::new(),
        }
    }

    pub fn from_outcomes(source_folder: &std::path::Path, results: Vec<ImageOutcome>) -> Self {
        let mut selected = 0;
        let mut already_processed = 0;
        let mut rejected_explicit = 0;
        let mut rejected_low_score = 0;
        let mut errors = 0;
        let mut score_sum = 0.0;
        let mut scored = 0usize;

        for outcome in &results {
            match outcome.status {
                OutcomeStatus::Selected => selected += 1,
                OutcomeStatus::AlreadyProcessed => already_processed += 1,
                OutcomeStatus::Errored => errors += 1,
                OutcomeStatus::Rejected => {
                    match &outcome.score {
                        Some(s) if s.is_explicit => rejected_explicit += 1,
                        _ => rejected_low_score += 1,
                    }
                }
            }
            if let Some(score) = &outcome.score {
                scored += 1;
                score_sum += score.combined();
            }
        }

        let avg_score = if scored > 0 {
            (score_sum / scored as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        CurationReport {
            timestamp: Utc::now(),
            source_folder: source_folder.display().to_string(),
            skipped_folder: false,
            total_images: results.len(),
            selected,
            already_processed,
            rejected_explicit,
            rejected_low_score,
            errors,
            avg_score,
            results,
        }
    }
}
