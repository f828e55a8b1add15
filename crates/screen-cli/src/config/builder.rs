use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileConverterConfig, FileDockingConfig, FileLedgerConfig};
use super::models::{AppConfig, ConvertConfig, LedgerTarget};
use crate::cli::{ConvertArgs, LedgerArgs, LedgerCommands, LedgerConnectionArgs, RunArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use dockscreen::engine::config::{
    ConverterConfig, DeliveryConfig, DockingEngineConfig, LedgerConfig,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub fn build_run_config(args: &RunArgs, jobs: Option<usize>) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file_config(args.settings.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    if !args.docking_config.is_file() {
        return Err(CliError::Argument(format!(
            "Docking configuration '{}' does not exist or is not a file.",
            args.docking_config.display()
        )));
    }

    let parallelism = resolve_parallelism(jobs, file_config.parallelism, &defaults)?;

    let affinity_cutoff = args
        .cutoff
        .or(file_config.affinity_cutoff)
        .unwrap_or(defaults.affinity_cutoff);
    let output_dir = args
        .output_dir
        .clone()
        .or(file_config.output_dir.take())
        .unwrap_or(defaults.output_dir);

    let delivery = if args.no_delivery {
        DeliveryConfig::Disabled
    } else {
        file_config
            .delivery
            .take()
            .map(Into::into)
            .unwrap_or_default()
    };

    Ok(AppConfig {
        docking_config: args.docking_config.clone(),
        archives: args.archives.clone(),
        output_dir,
        affinity_cutoff,
        record_marker: file_config.record_marker.take(),
        parallelism,
        converter: merge_converter(file_config.converter.take()),
        docking: merge_docking(file_config.docking.take()),
        ledger: merge_ledger(&args.ledger, file_config.ledger.take())?,
        delivery,
    })
}

pub fn build_convert_config(args: &ConvertArgs, jobs: Option<usize>) -> Result<ConvertConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file_config(args.settings.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let parallelism = resolve_parallelism(jobs, file_config.parallelism, &defaults)?;
    let record_marker = file_config.record_marker.take();
    if record_marker.as_deref() == Some("") {
        return Err(CliError::Config(
            "The record marker must not be empty.".to_string(),
        ));
    }

    Ok(ConvertConfig {
        archives: args.archives.clone(),
        output_parent: args.output_dir.clone(),
        record_marker,
        parallelism,
        converter: merge_converter(file_config.converter.take()),
    })
}

pub fn build_ledger_target(args: &LedgerArgs) -> Result<LedgerTarget> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.settings.as_deref())?;
    let mut ledger = merge_ledger(&args.connection, file_config.ledger.take())?;

    let cli_output_dir = match &args.command {
        LedgerCommands::Setup {
            output_dir,
            save_interval,
        } => {
            if let Some(secs) = save_interval {
                ledger.save_interval = Duration::from_secs(*secs);
            }
            output_dir.clone()
        }
        _ => None,
    };
    let output_dir = cli_output_dir
        .or(file_config.output_dir.take())
        .unwrap_or(defaults.output_dir);

    Ok(LedgerTarget { ledger, output_dir })
}

fn resolve_parallelism(
    cli: Option<usize>,
    file_val: Option<usize>,
    defaults: &DefaultsConfig,
) -> Result<usize> {
    let parallelism = cli.or(file_val).unwrap_or(defaults.parallelism);
    if parallelism == 0 {
        return Err(CliError::Config(
            "Parallelism must be at least 1.".to_string(),
        ));
    }
    Ok(parallelism)
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => FileConfig::from_file(path),
        None => Ok(FileConfig::default()),
    }
}

fn merge_converter(file_val: Option<FileConverterConfig>) -> ConverterConfig {
    let file_val = file_val.unwrap_or_default();
    let defaults = ConverterConfig::default();
    ConverterConfig {
        program: file_val.program.unwrap_or(defaults.program),
        input_format: file_val.input_format.unwrap_or(defaults.input_format),
        output_format: file_val.output_format.unwrap_or(defaults.output_format),
        partial_charge: file_val.partial_charge.unwrap_or(defaults.partial_charge),
        add_polar_hydrogens: file_val
            .add_polar_hydrogens
            .unwrap_or(defaults.add_polar_hydrogens),
    }
}

fn merge_docking(file_val: Option<FileDockingConfig>) -> DockingEngineConfig {
    let file_val = file_val.unwrap_or_default();
    let defaults = DockingEngineConfig::default();
    DockingEngineConfig {
        program: file_val.program.unwrap_or(defaults.program),
        completion_marker: file_val
            .completion_marker
            .unwrap_or(defaults.completion_marker),
        output_suffix: file_val.output_suffix.unwrap_or(defaults.output_suffix),
    }
}

fn merge_ledger(
    cli: &LedgerConnectionArgs,
    file_val: Option<FileLedgerConfig>,
) -> Result<LedgerConfig> {
    let file_val = file_val.unwrap_or_default();
    let mut config = LedgerConfig::default();

    if let Some(address) = cli.address.as_deref().or(file_val.address.as_deref()) {
        let parsed =
            parser::parse_ledger_address(address).map_err(|e| CliError::Argument(e.to_string()))?;
        config.host = parsed.host;
        config.port = parsed.port.unwrap_or(config.port);
        config.db = parsed.db.unwrap_or(config.db);
    }
    config.password = cli.password.clone().or(file_val.password);
    if let Some(secs) = file_val.connect_timeout_secs {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file_val.save_interval_secs {
        config.save_interval = Duration::from_secs(secs);
    }
    if let Some(changes) = file_val.save_min_changes {
        config.save_min_changes = changes;
    }
    Ok(config)
}

fn parse_set_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "affinity-cutoff" => {
                config.affinity_cutoff = Some(parse_set_value(key, value_str, "float")?);
            }
            "output-dir" => config.output_dir = Some(PathBuf::from(value_str)),
            "record-marker" => config.record_marker = Some(value_str.to_string()),
            "parallelism" => {
                config.parallelism = Some(parse_set_value(key, value_str, "integer")?);
            }
            "converter.program" => {
                config.converter.get_or_insert_with(Default::default).program =
                    Some(value_str.to_string());
            }
            "converter.partial-charge" => {
                config
                    .converter
                    .get_or_insert_with(Default::default)
                    .partial_charge = Some(value_str.to_string());
            }
            "converter.add-polar-hydrogens" => {
                config
                    .converter
                    .get_or_insert_with(Default::default)
                    .add_polar_hydrogens = Some(parse_set_value(key, value_str, "boolean")?);
            }
            "docking.program" => {
                config.docking.get_or_insert_with(Default::default).program =
                    Some(value_str.to_string());
            }
            "docking.completion-marker" => {
                config
                    .docking
                    .get_or_insert_with(Default::default)
                    .completion_marker = Some(value_str.to_string());
            }
            "ledger.address" => {
                config.ledger.get_or_insert_with(Default::default).address =
                    Some(value_str.to_string());
            }
            "ledger.save-interval-secs" => {
                config
                    .ledger
                    .get_or_insert_with(Default::default)
                    .save_interval_secs = Some(parse_set_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
