use crate::core::io::archive::{Record, RecordSplitter, count_records};
use crate::core::io::report::{SCORES_FILE_NAME, append_results};
use crate::core::models::candidate::Candidate;
use crate::core::models::result::{AffinityResult, Verdict};
use crate::engine::config::ScreeningJob;
use crate::engine::delivery::Delivery;
use crate::engine::error::{CandidateFailure, EngineError};
use crate::engine::ledger::Ledger;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{
    CandidateState, FailureRecord, ScreeningSummary, StopSignal, Tally,
};
use crate::engine::tasks::convert::LigandConverter;
use crate::engine::tasks::dock::DockingEngine;
use crate::engine::tasks::triage::TriagePolicy;
use super::{create_dir, worker_pool};
use dashmap::DashSet;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};

const CLAIM_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Collaborators shared by every job of a run.
///
/// Built once by the caller and lent to each job, so a single ledger connection pool
/// and delivery client serve all archives.
pub struct ScreeningServices {
    pub ledger: Ledger,
    pub converter: LigandConverter,
    pub docker: DockingEngine,
    pub delivery: Box<dyn Delivery>,
    pub stop: StopSignal,
    /// Number of candidates screened concurrently.
    pub parallelism: usize,
}

/// Per-job state shared by the workers.
struct JobContext<'a> {
    job: &'a ScreeningJob,
    services: &'a ScreeningServices,
    reporter: &'a ProgressReporter<'a>,
    policy: TriagePolicy,
    tally: Tally,
    in_flight: DashSet<String>,
    results: Mutex<Vec<AffinityResult>>,
    failures: Mutex<Vec<FailureRecord>>,
    triage_errors: AtomicUsize,
    delivery_failures: AtomicUsize,
    fatal: Mutex<Option<EngineError>>,
    aborted: AtomicBool,
    exhausted: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobContext<'_> {
    fn should_stop(&self) -> bool {
        self.aborted.load(Ordering::SeqCst) || self.services.stop.is_requested()
    }

    /// Records the first job-fatal error and stops the pool from taking new candidates.
    fn abort(&self, err: EngineError) {
        error!("Aborting screening job: {}", err);
        let mut fatal = lock(&self.fatal);
        if fatal.is_none() {
            *fatal = Some(err);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }
}

/// Releases an in-flight claim when the worker is done with the candidate.
struct Claim<'a> {
    in_flight: &'a DashSet<String>,
    key: String,
}

impl<'a> Claim<'a> {
    /// Blocks until no other worker holds a candidate with the same file stem.
    fn acquire(in_flight: &'a DashSet<String>, key: String) -> Self {
        while !in_flight.insert(key.clone()) {
            thread::sleep(CLAIM_RETRY_INTERVAL);
        }
        Self { in_flight, key }
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// Screens every candidate of `job.archive`.
///
/// Returns once the archive is exhausted (or a stop was requested) and every in-flight
/// candidate has finished. Per-candidate failures are tallied in the summary; only an
/// unreachable ledger, an unreadable archive or unusable output directories fail the
/// job.
#[instrument(skip_all, name = "screening_workflow", fields(archive = %job.archive.display()))]
pub fn run(
    job: &ScreeningJob,
    services: &ScreeningServices,
    reporter: &ProgressReporter,
) -> Result<ScreeningSummary, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation".to_string(),
    });
    services.ledger.ensure_available()?;
    info!("Using checkpoint ledger at {}.", services.ledger.describe());

    let binders_dir = job.binders_dir();
    create_dir(&job.output_dir)?;
    create_dir(&binders_dir)?;

    let total = count_records(&job.archive, &job.record_marker).map_err(|source| {
        EngineError::ArchiveRead {
            path: job.archive.clone(),
            source,
        }
    })?;
    info!("There are {} candidates in {:?}.", total, job.archive);
    reporter.report(Progress::Message(format!(
        "{} candidates in {}",
        total,
        job.archive.display()
    )));
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Screening ===
    reporter.report(Progress::PhaseStart {
        name: "Screening".to_string(),
    });
    reporter.report(Progress::TaskStart {
        total: total as u64,
    });

    let mut splitter = RecordSplitter::open(&job.archive, &job.record_marker).map_err(|source| {
        EngineError::ArchiveRead {
            path: job.archive.clone(),
            source,
        }
    })?;
    let parallelism = services.parallelism.max(1);
    let pool = worker_pool(parallelism, "screen")?;

    let context = JobContext {
        job,
        services,
        reporter,
        policy: TriagePolicy::new(job.affinity_cutoff, binders_dir),
        tally: Tally::default(),
        in_flight: DashSet::new(),
        results: Mutex::new(Vec::new()),
        failures: Mutex::new(Vec::new()),
        triage_errors: AtomicUsize::new(0),
        delivery_failures: AtomicUsize::new(0),
        fatal: Mutex::new(None),
        aborted: AtomicBool::new(false),
        exhausted: AtomicBool::new(false),
    };

    info!(
        parallelism,
        cutoff = job.affinity_cutoff,
        "Screening with {} worker(s).",
        parallelism
    );
    let ctx = &context;
    // The splitter is polled before the stop check so a stop that arrives after the last
    // record still counts as a finished archive.
    let records = std::iter::from_fn(move || {
        let item = splitter.next();
        if item.is_some() && ctx.should_stop() {
            return None;
        }
        match item {
            Some(Ok(record)) => Some(record),
            Some(Err(source)) => {
                ctx.abort(EngineError::ArchiveRead {
                    path: ctx.job.archive.clone(),
                    source,
                });
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
            .for_each(|record| screen_record(ctx, record));
    });

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let JobContext {
        tally,
        results,
        failures,
        triage_errors,
        delivery_failures,
        fatal,
        exhausted,
        ..
    } = context;
    let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    let fatal = fatal.into_inner().unwrap_or_else(PoisonError::into_inner);

    // Scored candidates are already in the ledger; report them even if the job failed.
    let report_error = append_results(&job.output_dir.join(SCORES_FILE_NAME), &results)
        .err()
        .map(|e| {
            warn!("Failed to write score report: {}", e);
            e.to_string()
        });
    if let Some(err) = fatal {
        return Err(err);
    }

    let summary = ScreeningSummary {
        archive: job.archive.clone(),
        tally: tally.snapshot(),
        results,
        failures: failures.into_inner().unwrap_or_else(PoisonError::into_inner),
        triage_errors: triage_errors.into_inner(),
        delivery_failures: delivery_failures.into_inner(),
        report_error,
        stopped_early: services.stop.is_requested() && !exhausted.into_inner(),
    };
    info!("Finished {:?}: {}.", job.archive, summary.tally);
    Ok(summary)
}

fn screen_record(ctx: &JobContext, record: Record) {
    let index = record.index;
    let mut candidate = match Candidate::from_record(record) {
        Ok(candidate) => candidate,
        Err(e) => {
            finish(ctx, &format!("record #{}", index), None, CandidateState::Failed(e.into()));
            return;
        }
    };

    let _claim = Claim::acquire(&ctx.in_flight, candidate.file_stem());
    let services = ctx.services;
    let mut state = CandidateState::Pending;

    while !state.is_terminal() {
        state = match state {
            CandidateState::Pending => match services.ledger.has(&candidate.id) {
                Ok(true) => CandidateState::SkippedAlreadyDone,
                Ok(false) => CandidateState::Converting,
                Err(e) => {
                    ctx.abort(e.into());
                    return;
                }
            },
            CandidateState::Converting => {
                match services.converter.convert(&candidate, &ctx.job.output_dir) {
                    Ok(paths) => {
                        candidate.artifacts.ligand = Some(paths.ligand.clone());
                        CandidateState::Converted(paths)
                    }
                    Err(e) => CandidateState::Failed(e.into()),
                }
            }
            CandidateState::Converted(paths) => {
                candidate.artifacts.docking_output =
                    Some(services.docker.output_path(&paths.ligand));
                CandidateState::Docking(paths)
            }
            CandidateState::Docking(paths) => {
                match services.docker.dock(&ctx.job.docking_config, &paths) {
                    Ok(report) => CandidateState::Scored(report),
                    Err(e) => CandidateState::Failed(e.into()),
                }
            }
            CandidateState::Scored(report) => {
                // The docking work is not worth repeating, so the ledger entry comes first.
                if let Err(e) = services.ledger.record(&candidate.id, report.affinity) {
                    ctx.abort(e.into());
                    return;
                }
                let verdict = ctx.policy.decide(report.affinity);
                match ctx.policy.apply(verdict, &report) {
                    Ok(retained) => {
                        if verdict == Verdict::Promoted {
                            deliver(ctx, &candidate.id, &retained);
                        }
                        CandidateState::Triaged(AffinityResult {
                            id: candidate.id.clone(),
                            affinity: report.affinity,
                            outcome: verdict,
                        })
                    }
                    Err(source) => {
                        ctx.triage_errors.fetch_add(1, Ordering::Relaxed);
                        CandidateState::Failed(CandidateFailure::Triage {
                            affinity: report.affinity,
                            source,
                        })
                    }
                }
            }
            terminal => terminal,
        };
        trace!(candidate = %candidate.id, state = state.name(), "Candidate advanced.");
    }

    let id = candidate.id.clone();
    finish(ctx, &id, Some(&candidate), state);
}

fn deliver(ctx: &JobContext, id: &str, files: &[PathBuf]) {
    let delivery = &ctx.services.delivery;
    let files: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
    match delivery.deliver(&files) {
        Ok(()) => debug!(candidate = id, "Delivered through {}.", delivery.name()),
        Err(e) => {
            warn!(candidate = id, "Delivery through {} failed: {}", delivery.name(), e);
            ctx.delivery_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn finish(ctx: &JobContext, id: &str, candidate: Option<&Candidate>, state: CandidateState) {
    let Some(outcome) = state.outcome() else {
        return;
    };

    match state {
        CandidateState::Triaged(result) => {
            info!(
                candidate = id,
                affinity = result.affinity,
                "Candidate {}.",
                result.outcome
            );
            lock(&ctx.results).push(result);
        }
        CandidateState::Failed(failure) => {
            // Triage failures keep their files for the operator; the score is already recorded.
            if let (Some(candidate), false) = (candidate, failure.is_recorded()) {
                reclaim_artifacts(candidate);
            }
            report_failure(ctx, id, &failure);
        }
        CandidateState::SkippedAlreadyDone => {
            debug!(candidate = id, "Already in the ledger; skipping.");
        }
        _ => {}
    }

    let tally = ctx.tally.record(outcome);
    ctx.reporter.report(Progress::CandidateFinished {
        id: id.to_string(),
        outcome,
        tally,
    });
}

fn report_failure(ctx: &JobContext, id: &str, failure: &CandidateFailure) {
    warn!(candidate = id, "Candidate failed: {}", failure);
    lock(&ctx.failures).push(FailureRecord {
        candidate: id.to_string(),
        reason: failure.to_string(),
    });
}

/// Removes whatever a failed candidate left on disk; it is regenerated on retry.
fn reclaim_artifacts(candidate: &Candidate) {
    for path in candidate.artifacts.paths() {
        match fs::remove_file(path) {
            Ok(()) => trace!("Removed {:?}.", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {:?}: {}", path, e),
        }
    }
}
