use crate::cli::{LedgerArgs, LedgerCommands};
use crate::config::{self, LedgerTarget};
use crate::error::Result;
use dockscreen::engine::ledger::remote::{self, RedisStore};
use dockscreen::engine::ledger::{Ledger, LedgerEntry};
use tracing::info;

pub async fn run(args: LedgerArgs) -> Result<()> {
    let target = config::build_ledger_target(&args)?;

    match args.command {
        LedgerCommands::Setup { .. } => setup(&target),
        LedgerCommands::Show { ids } => {
            let ledger = connect(&target)?;
            for id in &ids {
                let entry = tokio::task::block_in_place(|| ledger.entry(id))?;
                println!("{}", render_entry(id, entry));
            }
            Ok(())
        }
        LedgerCommands::Ping => {
            let ledger = connect(&target)?;
            println!("✓ Ledger store at {} is reachable.", ledger.describe());
            Ok(())
        }
    }
}

fn setup(target: &LedgerTarget) -> Result<()> {
    let path = remote::write_server_config(&target.output_dir, &target.ledger)?;
    info!("Wrote ledger store configuration to {}.", path.display());
    println!("✓ Ledger store configuration written to {}", path.display());
    println!("  Start the store with: redis-server {}", path.display());
    Ok(())
}

fn connect(target: &LedgerTarget) -> Result<Ledger> {
    let store = tokio::task::block_in_place(|| RedisStore::connect(&target.ledger, 1))?;
    Ok(Ledger::new(store))
}

fn render_entry(id: &str, entry: Option<LedgerEntry>) -> String {
    match entry {
        Some(LedgerEntry::Affinity(affinity)) => format!("{}: docked, affinity {}", id, affinity),
        Some(LedgerEntry::Done) => format!("{}: done (no affinity recorded)", id),
        Some(LedgerEntry::InProgress) => {
            format!("{}: in progress (claimed, no result yet; skipped by new runs)", id)
        }
        None => format!("{}: not recorded", id),
    }
}
