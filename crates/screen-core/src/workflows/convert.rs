use super::{create_dir, worker_pool};
use crate::core::io::archive::{ArchiveError, Record, RecordSplitter, count_records};
use crate::core::models::candidate::Candidate;
use crate::engine::config::ConversionJob;
use crate::engine::error::{CandidateFailure, EngineError};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{ConversionSummary, FailureRecord, StopSignal};
use crate::engine::tasks::convert::LigandConverter;
use dashmap::DashSet;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Collaborators of a conversion-only run.
pub struct ConversionServices {
    pub converter: LigandConverter,
    pub stop: StopSignal,
    pub parallelism: usize,
}

/// Converts every record of `job.archive` into `job.output_dir`.
///
/// Nothing is recorded in the ledger: converting the same archive again redoes the work
/// and overwrites earlier outputs. Only an unreadable archive or an unusable output
/// directory fails the job.
#[instrument(skip_all, name = "conversion_workflow", fields(archive = %job.archive.display()))]
pub fn run(
    job: &ConversionJob,
    services: &ConversionServices,
    reporter: &ProgressReporter,
) -> Result<ConversionSummary, EngineError> {
    let archive_error = |source| EngineError::ArchiveRead {
        path: job.archive.clone(),
        source,
    };

    reporter.report(Progress::PhaseStart {
        name: "Preparation".to_string(),
    });
    create_dir(&job.output_dir)?;
    let total = count_records(&job.archive, &job.record_marker).map_err(archive_error)?;
    info!("There are {} candidates in {:?}.", total, job.archive);
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Converting".to_string(),
    });
    reporter.report(Progress::TaskStart {
        total: total as u64,
    });

    let mut splitter =
        RecordSplitter::open(&job.archive, &job.record_marker).map_err(archive_error)?;
    let pool = worker_pool(services.parallelism, "convert")?;

    let context = ConversionContext {
        job,
        services,
        reporter,
        seen: DashSet::new(),
        converted: AtomicUsize::new(0),
        duplicates: AtomicUsize::new(0),
        failures: Mutex::new(Vec::new()),
        read_error: Mutex::new(None),
        exhausted: AtomicBool::new(false),
    };
    let ctx = &context;

    let records = std::iter::from_fn(move || {
        let item = splitter.next();
        if item.is_some() && ctx.services.stop.is_requested() {
            return None;
        }
        match item {
            Some(Ok(record)) => Some(record),
            Some(Err(source)) => {
                *lock(&ctx.read_error) = Some(source);
                None
            }
            None => {
                ctx.exhausted.store(true, Ordering::SeqCst);
                None
            }
        }
    });
    pool.install(|| {
        records
            .par_bridge()
            .for_each(|record| convert_record(ctx, record));
    });

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let ConversionContext {
        converted,
        duplicates,
        failures,
        read_error,
        exhausted,
        ..
    } = context;
    if let Some(source) = read_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(archive_error(source));
    }

    let summary = ConversionSummary {
        archive: job.archive.clone(),
        output_dir: job.output_dir.clone(),
        converted: converted.into_inner(),
        duplicates: duplicates.into_inner(),
        failures: failures.into_inner().unwrap_or_else(PoisonError::into_inner),
        stopped_early: services.stop.is_requested() && !exhausted.into_inner(),
    };
    info!(
        "Converted {} of {} candidates from {:?} into {:?}.",
        summary.converted, total, job.archive, job.output_dir
    );
    Ok(summary)
}

struct ConversionContext<'a> {
    job: &'a ConversionJob,
    services: &'a ConversionServices,
    reporter: &'a ProgressReporter<'a>,
    /// File stems claimed by this job; a repeated identifier is converted once.
    seen: DashSet<String>,
    converted: AtomicUsize,
    duplicates: AtomicUsize,
    failures: Mutex<Vec<FailureRecord>>,
    read_error: Mutex<Option<ArchiveError>>,
    exhausted: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn convert_record(ctx: &ConversionContext, record: Record) {
    let index = record.index;
    match Candidate::from_record(record) {
        Err(e) => record_failure(ctx, &format!("record #{}", index), e.into()),
        Ok(candidate) if !ctx.seen.insert(candidate.file_stem()) => {
            debug!(candidate = %candidate.id, "Duplicate identifier; already converted.");
            ctx.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        Ok(candidate) => match ctx.services.converter.convert(&candidate, &ctx.job.output_dir) {
            Ok(paths) => {
                debug!(candidate = %candidate.id, "Converted into {:?}.", paths.ligand);
                ctx.converted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => record_failure(ctx, &candidate.id, e.into()),
        },
    }
    ctx.reporter.report(Progress::TaskIncrement);
}

fn record_failure(ctx: &ConversionContext, id: &str, failure: CandidateFailure) {
    warn!(candidate = id, "Conversion failed: {}", failure);
    lock(&ctx.failures).push(FailureRecord {
        candidate: id.to_string(),
        reason: failure.to_string(),
    });
}
