use super::{watch_for_interrupt, write_failures};
use crate::cli::RunArgs;
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use dockscreen::core::process::{ProcessRunner, SystemProcessRunner};
use dockscreen::engine::delivery;
use dockscreen::engine::error::EngineError;
use dockscreen::engine::ledger::Ledger;
use dockscreen::engine::ledger::remote::{self, RedisStore, SERVER_CONFIG_FILE_NAME};
use dockscreen::engine::progress::ProgressReporter;
use dockscreen::engine::state::{ScreeningSummary, StopSignal};
use dockscreen::engine::tasks::convert::LigandConverter;
use dockscreen::engine::tasks::dock::DockingEngine;
use dockscreen::workflows::{self, screen::ScreeningServices};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run(args: RunArgs, jobs: Option<usize>, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from settings file and CLI arguments...");
    let config = config::build_run_config(&args, jobs)?;

    let stop = StopSignal::new();
    let ctrl_c_task = watch_for_interrupt(stop.clone());

    let result = screen_off_runtime(&config, stop, ui_sender);
    ctrl_c_task.abort();
    result
}

/// Runs every job on the current thread with the async runtime moved aside.
///
/// The ledger pool, the blocking HTTP client and the workflow itself all block, so they
/// are built, used and dropped inside one blocking region.
fn screen_off_runtime(
    config: &AppConfig,
    stop: StopSignal,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    tokio::task::block_in_place(|| screen_archives(config, stop, ui_sender))
}

fn screen_archives(
    config: &AppConfig,
    stop: StopSignal,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let services = build_services(config, stop.clone())?;
    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let total = config.archives.len();
    let mut failed_archives = 0;
    for (index, archive) in config.archives.iter().enumerate() {
        if stop.is_requested() {
            warn!(
                "Stop requested; {} archive(s) left unscreened.",
                total - index
            );
            break;
        }

        let job = config
            .job_for(archive)
            .map_err(|e| CliError::Config(e.to_string()))?;
        println!(
            "Screening archive {}/{}: {}",
            index + 1,
            total,
            archive.display()
        );

        match workflows::screen::run(&job, &services, &reporter) {
            Ok(summary) => println!("{}", render_summary(&summary)),
            Err(e @ EngineError::ArchiveRead { .. }) => {
                error!("Skipping archive: {}", e);
                eprintln!("Skipping archive: {}", e);
                failed_archives += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if failed_archives > 0 {
        return Err(CliError::ArchivesFailed {
            failed: failed_archives,
            total,
        });
    }
    Ok(())
}

fn build_services(config: &AppConfig, stop: StopSignal) -> Result<ScreeningServices> {
    let delivery = delivery::from_config(&config.delivery)?;
    info!("Delivering promoted binders via '{}'.", delivery.name());

    let max_connections = u32::try_from(config.parallelism).unwrap_or(u32::MAX);
    let store = match RedisStore::connect(&config.ledger, max_connections) {
        Ok(store) => store,
        Err(source) => {
            let server_config = config.output_dir.join(SERVER_CONFIG_FILE_NAME);
            if !server_config.exists() {
                remote::write_server_config(&config.output_dir, &config.ledger)?;
                info!(
                    "Wrote ledger store configuration to {}.",
                    server_config.display()
                );
            }
            return Err(CliError::LedgerSetupRequired {
                source,
                server_config,
            });
        }
    };

    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
    Ok(ScreeningServices {
        ledger: Ledger::new(store),
        converter: LigandConverter::new(runner.clone(), config.converter.clone()),
        docker: DockingEngine::new(runner, config.docking.clone()),
        delivery,
        stop,
        parallelism: config.parallelism,
    })
}

fn render_summary(summary: &ScreeningSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "✓ {}: {}",
        summary.archive.display(),
        summary.tally
    );

    let promoted = summary.promoted_ids();
    if !promoted.is_empty() {
        let ids: Vec<&str> = promoted.iter().map(String::as_str).collect();
        let _ = writeln!(out, "  Promoted: {}", ids.join(", "));
    }

    write_failures(&mut out, "Failed candidates", &summary.failures);

    if summary.triage_errors > 0 {
        let _ = writeln!(
            out,
            "  {} promotion(s) could not be moved into the binders directory",
            summary.triage_errors
        );
    }
    if summary.delivery_failures > 0 {
        let _ = writeln!(
            out,
            "  {} binder(s) could not be delivered",
            summary.delivery_failures
        );
    }
    if let Some(reason) = &summary.report_error {
        let _ = writeln!(out, "  Score report not updated: {}", reason);
    }
    if summary.stopped_early {
        let _ = writeln!(out, "  Stopped before the archive was exhausted.");
    }

    out.trim_end().to_string()
}
