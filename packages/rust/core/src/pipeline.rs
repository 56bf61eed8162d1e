//! Daily run: checkpoint check → existing words → generate → enrich →
//! checkpoint → append → clear.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{error, info, instrument, warn};

use dailyvocab_shared::{
    Batch, Result, RunConfig, StoreRow, VocabError, VocabularyItem, canonical_headers,
};
use dailyvocab_storage::TabularStore;

use crate::checkpoint::Checkpoint;
use crate::completion::TextCompletion;
use crate::dedup::{self, normalize};
use crate::enrichment::{self, EnrichmentSummary};
use crate::generator;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A fresh batch was generated and appended.
    Saved,
    /// A pending checkpoint was appended; nothing was generated.
    Resumed,
    /// No new unique words came back; nothing was saved.
    NothingGenerated,
}

/// Result of [`run_daily`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Words requested (fresh runs) or found in the checkpoint (resumes).
    pub requested: usize,
    /// Words appended to the store, in order.
    pub saved_words: Vec<String>,
    /// Checkpointed words skipped on resume because the store already had them.
    pub already_stored: usize,
    /// Generation attempts made.
    pub attempts: u32,
    pub enrichment: EnrichmentSummary,
    pub checkpoint_path: PathBuf,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(outcome: RunOutcome, config: &RunConfig, start: Instant) -> Self {
        Self {
            outcome,
            requested: config.target_count,
            saved_words: Vec::new(),
            already_stored: 0,
            attempts: 0,
            enrichment: EnrichmentSummary::default(),
            checkpoint_path: config.checkpoint_path.clone(),
            elapsed: start.elapsed(),
        }
    }

    /// Requested words that were not produced.
    pub fn shortfall(&self) -> usize {
        match self.outcome {
            RunOutcome::Resumed => 0,
            _ => self.requested.saturating_sub(self.saved_words.len()),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Item-level progress within the current phase.
    fn item(&self, current: usize, total: usize, detail: &str);
    /// Called when the run completes without error.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the daily pipeline once.
///
/// With a pending checkpoint, only the persistence step runs. Otherwise:
/// 1. Ensure headers and load existing words
/// 2. Generate new unique words
/// 3. Enrich each word
/// 4. Checkpoint the batch
/// 5. Append to the store, then clear the checkpoint
///
/// A failed append returns [`VocabError::Persist`] and leaves the checkpoint
/// on disk for the next run.
#[instrument(skip_all, fields(target = config.target_count, checkpoint = %config.checkpoint_path.display()))]
pub async fn run_daily<S, C>(
    config: &RunConfig,
    store: &S,
    completion: &C,
    progress: &dyn ProgressReporter,
) -> Result<RunReport>
where
    S: TabularStore,
    C: TextCompletion,
{
    let start = Instant::now();

    // --- Phase 0: Resume? ---
    if let Some(report) = resume_pending(config, store, progress).await? {
        return Ok(report);
    }
    let checkpoint = Checkpoint::new(&config.checkpoint_path);

    // --- Phase 1: Store + existing words ---
    progress.phase("Preparing store");
    store.ensure_headers(&canonical_headers()).await?;

    progress.phase("Loading existing words");
    let mut existing = dedup::load_existing(store, config.lenient_existing_load).await?;

    // --- Phase 2: Generate ---
    let generation =
        generator::generate_vocabulary(config, &mut existing, completion, progress).await;

    if generation.items.is_empty() {
        info!(attempts = generation.attempts, "no new unique words were generated");
        let mut report = RunReport::new(RunOutcome::NothingGenerated, config, start);
        report.attempts = generation.attempts;
        progress.done(&report);
        return Ok(report);
    }

    let attempts = generation.attempts;
    let mut batch = generation.items;
    info!(count = batch.len(), "generated unique words");

    // --- Phase 3: Enrich ---
    progress.phase("Generating video prompts and captions");
    let enrichment = enrichment::enrich_batch(config, &mut batch, completion, progress).await;

    // --- Phase 4: Checkpoint ---
    progress.phase("Saving checkpoint");
    let checkpoint_written = match checkpoint.save(&batch) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "could not save checkpoint, continuing without a backup");
            false
        }
    };

    // --- Phase 5: Persist ---
    progress.phase("Saving to store");
    persist(store, &checkpoint, checkpoint_written, &batch).await?;

    let mut report = RunReport::new(RunOutcome::Saved, config, start);
    report.saved_words = words(&batch);
    report.attempts = attempts;
    report.enrichment = enrichment;
    report.elapsed = start.elapsed();

    progress.done(&report);
    info!(
        saved = report.saved_words.len(),
        shortfall = report.shortfall(),
        enrichment_failures = report.enrichment.failures(),
        elapsed_ms = report.elapsed.as_millis(),
        "daily run complete"
    );
    Ok(report)
}

/// Save a pending checkpoint, if there is one, without generating anything.
///
/// Returns `Ok(None)` when no usable checkpoint exists. Needs no completion
/// client, so a batch can be saved even when the model is unreachable.
#[instrument(skip_all, fields(checkpoint = %config.checkpoint_path.display()))]
pub async fn resume_pending<S: TabularStore>(
    config: &RunConfig,
    store: &S,
    progress: &dyn ProgressReporter,
) -> Result<Option<RunReport>> {
    config.validate()?;
    let start = Instant::now();
    let checkpoint = Checkpoint::new(&config.checkpoint_path);

    progress.phase("Checking for a pending checkpoint");
    match checkpoint.load() {
        Some(batch) => resume(config, store, &checkpoint, batch, progress, start)
            .await
            .map(Some),
        None => Ok(None),
    }
}

/// Persist a checkpointed batch without generating anything.
///
/// Words the store already holds are dropped first, so a run that crashed
/// after appending but before clearing does not append them twice.
async fn resume<S: TabularStore>(
    config: &RunConfig,
    store: &S,
    checkpoint: &Checkpoint,
    batch: Batch,
    progress: &dyn ProgressReporter,
    start: Instant,
) -> Result<RunReport> {
    info!(
        items = batch.len(),
        path = %checkpoint.path().display(),
        "found checkpoint, resuming from previous failed run"
    );
    progress.phase(&format!("Resuming {} words from checkpoint", batch.len()));

    store
        .ensure_headers(&canonical_headers())
        .await
        .map_err(|e| fail_persist(&e, Some(checkpoint)))?;

    let existing = match dedup::load_existing(store, false).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!(error = %e, "could not read stored words, appending the whole checkpoint");
            dedup::ExistingKeySet::new()
        }
    };

    let requested = batch.len();
    let (pending, stored): (Vec<_>, Vec<_>) = batch
        .into_iter()
        .partition(|item| !existing.contains(&normalize(&item.word)));
    if !stored.is_empty() {
        info!(count = stored.len(), "checkpointed words already in store, skipping them");
    }

    progress.phase("Saving to store");
    persist(store, checkpoint, true, &pending).await?;

    let mut report = RunReport::new(RunOutcome::Resumed, config, start);
    report.requested = requested;
    report.saved_words = words(&pending);
    report.already_stored = stored.len();
    report.elapsed = start.elapsed();

    progress.done(&report);
    info!(saved = report.saved_words.len(), "checkpoint restored and saved");
    Ok(report)
}

/// Append `batch`, then clear the checkpoint. The checkpoint is only touched
/// after a confirmed append.
async fn persist<S: TabularStore>(
    store: &S,
    checkpoint: &Checkpoint,
    checkpoint_written: bool,
    batch: &[VocabularyItem],
) -> Result<()> {
    let rows = to_rows(batch, Local::now().date_naive());

    if let Err(e) = store.append_rows(&rows).await {
        return Err(fail_persist(&e, checkpoint_written.then_some(checkpoint)));
    }
    info!(rows = rows.len(), "saved vocabulary to store");

    if checkpoint_written {
        if let Err(e) = checkpoint.clear() {
            warn!(error = %e, "batch saved but the checkpoint could not be removed");
        }
    }
    Ok(())
}

fn fail_persist(cause: &VocabError, checkpoint: Option<&Checkpoint>) -> VocabError {
    error!(
        error = %cause,
        checkpoint = ?checkpoint.map(Checkpoint::path),
        "saving to store failed"
    );
    VocabError::persist(cause, checkpoint.map(Checkpoint::path))
}

fn to_rows(batch: &[VocabularyItem], date: NaiveDate) -> Vec<StoreRow> {
    batch
        .iter()
        .map(|item| StoreRow::from_item(item, date))
        .collect()
}

fn words(batch: &[VocabularyItem]) -> Vec<String> {
    batch.iter().map(|item| item.word.clone()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
