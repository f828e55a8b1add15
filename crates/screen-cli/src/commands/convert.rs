use super::{watch_for_interrupt, write_failures};
use crate::cli::ConvertArgs;
use crate::config::{self, ConvertConfig};
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use dockscreen::core::process::{ProcessRunner, SystemProcessRunner};
use dockscreen::engine::error::EngineError;
use dockscreen::engine::progress::ProgressReporter;
use dockscreen::engine::state::{ConversionSummary, StopSignal};
use dockscreen::engine::tasks::convert::LigandConverter;
use dockscreen::workflows::{self, convert::ConversionServices};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run(
    args: ConvertArgs,
    jobs: Option<usize>,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    info!("Merging configuration from settings file and CLI arguments...");
    let config = config::build_convert_config(&args, jobs)?;

    let stop = StopSignal::new();
    let ctrl_c_task = watch_for_interrupt(stop.clone());

    let result =
        tokio::task::block_in_place(|| convert_archives(&config, stop, ui_sender));
    ctrl_c_task.abort();
    result
}

fn convert_archives(
    config: &ConvertConfig,
    stop: StopSignal,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
    let services = ConversionServices {
        converter: LigandConverter::new(runner, config.converter.clone()),
        stop: stop.clone(),
        parallelism: config.parallelism,
    };
    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let total = config.archives.len();
    let mut failed_archives = 0;
    for (index, archive) in config.archives.iter().enumerate() {
        if stop.is_requested() {
            warn!(
                "Stop requested; {} archive(s) left unconverted.",
                total - index
            );
            break;
        }

        let job = config.job_for(archive);
        println!(
            "Converting archive {}/{}: {}",
            index + 1,
            total,
            archive.display()
        );

        match workflows::convert::run(&job, &services, &reporter) {
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

fn render_summary(summary: &ConversionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "✓ {}: {} converted into {}",
        summary.archive.display(),
        summary.converted,
        summary.output_dir.display()
    );
    if summary.duplicates > 0 {
        let _ = writeln!(
            out,
            "  {} repeated identifier(s) converted once",
            summary.duplicates
        );
    }
    write_failures(&mut out, "Not converted", &summary.failures);
    if summary.stopped_early {
        let _ = writeln!(out, "  Stopped before the archive was exhausted.");
    }
    out.trim_end().to_string()
}
