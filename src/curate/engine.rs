// Curation selection engine
// Scores a post folder's images in batches and materializes the winners.
// Safe to re-invoke: existing destinations are skipped, score rows are
// insert-if-absent, and the processed flag is only ever flipped forward.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use walkdir::WalkDir;

use crate::constants::{
    DATA_FOLDER, CURATED_FOLDER, DEFAULT_BATCH_SIZE, DEFAULT_MIN_SELECTION, DEFAULT_THRESHOLD,
    IMAGE_EXTENSIONS, INCOMING_FOLDER, MAX_CONSECUTIVE_ERRORS, UNKNOWN_MODEL,
};
use crate::db::schema;
use crate::error::{CuratorError, Result};
use crate::scoring::{ImageScore, ScoreSource};

use super::report::{CurationReport, ImageOutcome, OutcomeStatus};
use super::resolve::{PathResolver, PostKey};

#[derive(Debug, Clone)]
pub struct CurationConfig {
    /// Minimum combined score to auto-qualify
    pub threshold: f64,
    /// Images per scoring request
    pub batch_size: usize,
    /// Fill the selection up to this many images when too few clear
    /// the threshold
    pub min_selection: usize,
    /// Bypass both idempotency layers and rescore everything
    pub force: bool,
    /// Compute selection and destinations but copy nothing and flip no flags
    pub dry_run: bool,
    pub incoming_root: PathBuf,
    pub curated_root: PathBuf,
}

impl Default for CurationConfig {
    fn default() -> Self {
        CurationConfig {
            threshold: DEFAULT_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            min_selection: DEFAULT_MIN_SELECTION,
            force: false,
            dry_run: false,
            incoming_root: Path::new(DATA_FOLDER).join(INCOMING_FOLDER),
            curated_root: Path::new(DATA_FOLDER).join(CURATED_FOLDER),
        }
    }
}

/// A discovered image awaiting a decision this run
struct Candidate {
    /// Position in sorted discovery order; ties in the selection sort
    /// fall back to this
    index: usize,
    path: PathBuf,
    destination: PathBuf,
    post_key: Option<PostKey>,
}

pub struct CurationEngine<'a, S: ScoreSource> {
    config: CurationConfig,
    scorer: &'a S,
    conn: Option<&'a Connection>,
    resolver: PathResolver,
}

impl<'a, S: ScoreSource> CurationEngine<'a, S> {
    pub fn new(config: CurationConfig, scorer: &'a S, conn: Option<&'a Connection>) -> Self {
        let resolver = PathResolver::new(
            config.incoming_root.clone(),
            config.curated_root.clone(),
        );
        Self { config, scorer, conn, resolver }
    }

    /// Run the full selection pass for one post folder.
    ///
    /// Only an unenumerable folder is fatal; scoring, persistence and copy
    /// failures are recorded per image and the run continues.
    pub fn curate_folder(&self, folder: &Path) -> Result<CurationReport> {
        // Cheap folder-level skip. The per-image destination check below is
        // the correctness layer; this one just avoids rescoring a post whose
        // curated folder already exists.
        if !self.config.force {
            let post_dir = self.resolver.resolve_post_dir(self.conn, folder);
            if post_dir != self.config.curated_root && post_dir.is_dir() {
                log::info!(
                    "Skipping {}: curated folder {} already exists",
                    folder.display(),
                    post_dir.display()
                );
                return Ok(CurationReport::skipped(folder));
            }
        }

        let images = self.find_images(folder)?;
        let mut outcomes: Vec<Option<ImageOutcome>> = (0..images.len()).map(|_| None).collect();

        // Per-image idempotency: an existing destination means a prior run
        // already decided this image.
        let mut pending: Vec<Candidate> = Vec::new();
        for (index, path) in images.into_iter().enumerate() {
            let resolved = self.resolver.resolve(self.conn, &path);
            if !self.config.force && resolved.destination.exists() {
                outcomes[index] = Some(ImageOutcome {
                    source_path: path,
                    status: OutcomeStatus::AlreadyProcessed,
                    score: None,
                    destination: Some(resolved.destination),
                    error: None,
                });
                continue;
            }
            pending.push(Candidate {
                index,
                path,
                destination: resolved.destination,
                post_key: resolved.post_key,
            });
        }

        let (scored, truncated, batches_sent) = self.score_pending(&pending, &mut outcomes);

        self.apply_selection(&pending, &scored, &mut outcomes);

        if !self.config.dry_run && batches_sent > 0 && !truncated {
            self.mark_folder_processed(folder);
        }

        let results: Vec<ImageOutcome> = outcomes.into_iter().flatten().collect();
        Ok(CurationReport::from_outcomes(folder, results))
    }

    /// Score pending candidates batch by batch.
    /// Returns (scores by pending position, breaker-truncated, batches sent).
    /// Images in unattempted batches keep no outcome at all so a later run
    /// retries them from scratch.
    fn score_pending(
        &self,
        pending: &[Candidate],
        outcomes: &mut [Option<ImageOutcome>],
    ) -> (Vec<Option<ImageScore>>, bool, usize) {
        let mut scored: Vec<Option<ImageScore>> = (0..pending.len()).map(|_| None).collect();
        let mut consecutive_errors: u32 = 0;
        let mut truncated = false;
        let mut batches_sent = 0usize;

        let batch_size = self.config.batch_size.max(1);
        let mut chunks = pending.chunks(batch_size).enumerate().peekable();

        while let Some((chunk_index, batch)) = chunks.next() {
            if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                log::error!(
                    "Circuit breaker open after {} consecutive failures; {} image(s) left unattempted",
                    consecutive_errors,
                    pending.len() - chunk_index * batch_size
                );
                truncated = true;
                break;
            }

            let paths: Vec<PathBuf> = batch.iter().map(|c| c.path.clone()).collect();
            batches_sent += 1;

            let batch_result = self.scorer.score_batch(&paths).and_then(|scores| {
                if scores.len() != paths.len() {
                    Err(CuratorError::Scoring(format!(
                        "batch mismatch: sent {}, got {}", paths.len(), scores.len()
                    )))
                } else {
                    Ok(scores)
                }
            });

            match batch_result {
                Ok(scores) => {
                    consecutive_errors = 0;
                    let offset = chunk_index * batch_size;
                    for (i, (candidate, score)) in batch.iter().zip(scores).enumerate() {
                        self.persist_score(candidate, &score);
                        scored[offset + i] = Some(score);
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    log::error!("Batch scoring failed: {}", e);
                    for candidate in batch {
                        outcomes[candidate.index] = Some(ImageOutcome {
                            source_path: candidate.path.clone(),
                            status: OutcomeStatus::Errored,
                            score: None,
                            destination: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }

        // A failure streak that ends exactly on the last batch opens the
        // breaker without leaving anything unattempted.
        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS && chunks.peek().is_some() {
            truncated = true;
        }

        (scored, truncated, batches_sent)
    }

    /// Persist a non-explicit score, keyed by incoming-relative path.
    /// Best-effort: a write failure must not change the selection outcome.
    fn persist_score(&self, candidate: &Candidate, score: &ImageScore) {
        if score.is_explicit {
            return;
        }
        let Some(conn) = self.conn else { return };

        let rel_path = candidate
            .path
            .strip_prefix(&self.config.incoming_root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| candidate.path.to_string_lossy().to_string());

        let owner = self.lookup_owner(candidate.post_key.as_ref());

        match schema::insert_score_if_absent(conn, &rel_path, score, owner.as_deref()) {
            Ok(schema::ScoreInsert::Inserted) => {}
            Ok(schema::ScoreInsert::Duplicate) => {
                log::debug!("Score already stored for {}", rel_path);
            }
            Err(e) => {
                log::warn!("Failed to persist score for {}: {}", rel_path, e);
            }
        }
    }

    fn lookup_owner(&self, post_key: Option<&PostKey>) -> Option<String> {
        let conn = self.conn?;
        let key = post_key?;
        match schema::get_model_by_path(conn, key.as_db_path()) {
            Ok(Some(name)) if name != UNKNOWN_MODEL => Some(name),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Owner lookup failed for {}: {}", key.as_db_path(), e);
                None
            }
        }
    }

    /// Folder-level selection across everything scored this run.
    ///
    /// Explicit images are rejected outright. The rest are ranked by
    /// combined score (ties keep discovery order); everything at or above
    /// the threshold is taken, topped up with the best of the remainder
    /// until min_selection images are selected or candidates run out.
    fn apply_selection(
        &self,
        pending: &[Candidate],
        scored: &[Option<ImageScore>],
        outcomes: &mut [Option<ImageOutcome>],
    ) {
        let mut ranked: Vec<usize> = Vec::new();

        for (pos, score) in scored.iter().enumerate() {
            let Some(score) = score else { continue };
            if score.is_explicit {
                let candidate = &pending[pos];
                outcomes[candidate.index] = Some(ImageOutcome {
                    source_path: candidate.path.clone(),
                    status: OutcomeStatus::Rejected,
                    score: Some(score.clone()),
                    destination: None,
                    error: None,
                });
            } else {
                ranked.push(pos);
            }
        }

        // Stable sort: equal scores keep discovery order
        ranked.sort_by(|&a, &b| {
            let sa = scored[a].as_ref().map(|s| s.combined()).unwrap_or(0.0);
            let sb = scored[b].as_ref().map(|s| s.combined()).unwrap_or(0.0);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });

        let above = ranked
            .iter()
            .take_while(|&&pos| {
                scored[pos]
                    .as_ref()
                    .map(|s| s.combined() >= self.config.threshold)
                    .unwrap_or(false)
            })
            .count();

        let take = if above >= self.config.min_selection {
            above
        } else {
            self.config.min_selection.min(ranked.len())
        };

        for (rank, &pos) in ranked.iter().enumerate() {
            let candidate = &pending[pos];
            let score = scored[pos].clone();

            let outcome = if rank < take {
                self.materialize(candidate, score)
            } else {
                ImageOutcome {
                    source_path: candidate.path.clone(),
                    status: OutcomeStatus::Rejected,
                    score,
                    destination: None,
                    error: None,
                }
            };
            outcomes[candidate.index] = Some(outcome);
        }
    }

    /// Copy one selected image to its destination. The destination is
    /// reported even in dry-run; a copy failure downgrades the image to an
    /// errored outcome.
    fn materialize(&self, candidate: &Candidate, score: Option<ImageScore>) -> ImageOutcome {
        if !self.config.dry_run {
            if let Err(e) = copy_to_destination(&candidate.path, &candidate.destination) {
                log::error!(
                    "Failed to copy {} to {}: {}",
                    candidate.path.display(),
                    candidate.destination.display(),
                    e
                );
                return ImageOutcome {
                    source_path: candidate.path.clone(),
                    status: OutcomeStatus::Errored,
                    score,
                    destination: Some(candidate.destination.clone()),
                    error: Some(e.to_string()),
                };
            }
        }

        ImageOutcome {
            source_path: candidate.path.clone(),
            status: OutcomeStatus::Selected,
            score,
            destination: Some(candidate.destination.clone()),
            error: None,
        }
    }

    /// Best-effort completion marking; a failure here never fails the run.
    fn mark_folder_processed(&self, folder: &Path) {
        let Some(conn) = self.conn else { return };
        let Ok(rel) = folder.strip_prefix(&self.config.incoming_root) else { return };
        let Some(key) = PostKey::from_relative_dir(rel) else { return };

        if let Err(e) = schema::mark_processed(conn, key.as_db_path()) {
            log::warn!("Failed to mark {} processed: {}", key.as_db_path(), e);
        }
    }

    /// Recursively enumerate image files, sorted by path. Deterministic
    /// ordering is a correctness requirement: it fixes batch composition
    /// and selection tie-breaks across runs.
    fn find_images(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        if !folder.is_dir() {
            return Err(CuratorError::FolderAccess(folder.display().to_string()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(folder)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
            .map(|e| e.into_path())
            .collect();

        files.sort();
        Ok(files)
    }
}

/// Check if a file is a candidate image based on extension
pub fn is_image_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

fn copy_to_destination(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}
