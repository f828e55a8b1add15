pub mod convert;
pub mod ledger;
pub mod run;

use dockscreen::engine::state::{FailureRecord, StopSignal};
use std::fmt::Write as _;
use tokio::task::JoinHandle;
use tracing::warn;

const MAX_LISTED_FAILURES: usize = 10;

/// Turns the first Ctrl-C into a stop request. Abort the handle once the work is done.
fn watch_for_interrupt(stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight candidates before stopping.");
            stop.request();
        }
    })
}

fn write_failures(out: &mut String, heading: &str, failures: &[FailureRecord]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", heading);
    for failure in failures.iter().take(MAX_LISTED_FAILURES) {
        let _ = writeln!(out, "    {}: {}", failure.candidate, failure.reason);
    }
    if failures.len() > MAX_LISTED_FAILURES {
        let _ = writeln!(
            out,
            "    ... and {} more (see the log for details)",
            failures.len() - MAX_LISTED_FAILURES
        );
    }
}
