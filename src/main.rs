//! LabStat command-line shell.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDateTime};
use clap::Parser;

use labstat_lib::config;
use labstat_lib::controller::{ControllerError, LabController};
use labstat_lib::models::TimeWindow;

mod cli;
mod render;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    labstat_lib::init_tracing(cli.verbose);
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn run(cli: Cli) -> Result<(), ControllerError> {
    let settings_path = cli.settings.unwrap_or_else(config::settings_path);
    let mapping_path = cli
        .mapping
        .unwrap_or_else(|| config::resource_path(config::DEFAULT_MAPPING_RESOURCE));
    let mut ctl = LabController::new(&settings_path, &mapping_path)?;

    match cli.command {
        Command::Analytes { included } => {
            let codes = if included {
                ctl.included_analytes()
            } else {
                ctl.list_all_analytes()
            };
            render::print_codes(&codes);
        }
        Command::Exclude { codes } => {
            let mut set: BTreeSet<String> = ctl.excluded_analytes().into_iter().collect();
            set.extend(codes.iter().map(|c| c.trim().to_string()));
            ctl.update_excluded_analytes(&set)?;
            render::print_codes(&ctl.excluded_analytes());
        }
        Command::Include { codes } => {
            let remove: BTreeSet<&str> = codes.iter().map(|c| c.trim()).collect();
            let kept: Vec<String> = ctl
                .excluded_analytes()
                .into_iter()
                .filter(|c| !remove.contains(c.as_str()))
                .collect();
            ctl.update_excluded_analytes(&kept)?;
            render::print_codes(&ctl.excluded_analytes());
        }
        Command::Counts(args) => {
            let window = TimeWindow::from_dates(args.from, args.to);
            let report = ctl.counts_report(
                &window,
                &args.analytes,
                args.status,
                args.weekday_analyte.as_deref(),
                &now(),
            );
            render::print_counts_report(&report);
        }
        Command::Open { since, analytes } => {
            render::print_analyte_counts(&ctl.open_counts_since(&analytes, &since, &now()));
        }
        Command::Suspects => {
            render::print_suspects(&ctl.suspected_missing_draw(&now()));
        }
        Command::Delete { ids, suspects } => {
            let now = now();
            let ids = if suspects {
                ctl.suspected_missing_draw(&now)
                    .into_iter()
                    .map(|s| s.sample_id)
                    .collect()
            } else {
                ids
            };
            let removed = ctl.delete_samples_with_audit(&ids, &now)?;
            println!("Deleted {removed} rows for {} sample id(s).", ids.len());
        }
        Command::Combos { since, max_k, top } => {
            render::print_combos(&ctl.combo_stats_since(&since, max_k, top));
        }
        Command::MonthlyExport { force } => match ctl.monthly_export_if_first(&now(), force)? {
            Some(path) => println!("Monthly rollup written to {}", path.display()),
            None => println!("Not the first of the month; nothing written (use --force)."),
        },
        Command::SetPath { key, value } => {
            ctl.set_path(key, &value)?;
            println!("{key} = {}", value.trim());
        }
    }
    Ok(())
}
