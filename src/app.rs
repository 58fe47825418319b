//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the parameter table (file or built-in default)
//! - runs calibration for `gc fit`
//! - prints reports/plots
//! - launches the TUI

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, ShowArgs};
use crate::domain::CurveRange;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `gc` binary.
pub fn run() -> Result<(), AppError> {
    // We want `gc` and `gc -r Angus` to behave like `gc tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let run = pipeline::run_calibration(&args)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.region, &run.before, &run.fitted, &run.residuals)
    );

    if args.plot.plot && !args.plot.no_plot {
        let plot = crate::plot::render_ascii_plot(
            &run.fitted,
            &args.observations,
            curve_range(&args.plot),
            args.plot.width,
            args.plot.height,
        );
        println!("{plot}");
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let table = pipeline::load_table(args.table.params.as_deref())?;

    if args.list {
        println!("{}", crate::report::format_table_overview(&table));
        return Ok(());
    }

    let record = pipeline::select_record(&table, args.table.region.as_deref())?;
    println!(
        "{}",
        crate::report::format_curve_summary(&record.id, &record.params)
    );

    if args.plot.plot && !args.plot.no_plot {
        let plot = crate::plot::render_ascii_plot(
            &record.params,
            &[],
            curve_range(&args.plot),
            args.plot.width,
            args.plot.height,
        );
        println!("{plot}");
    }

    Ok(())
}

fn curve_range(plot: &PlotArgs) -> CurveRange {
    CurveRange {
        start: plot.age_start,
        stop: plot.age_stop,
        count: plot.curve_points.max(2),
    }
}

/// Rewrite argv so `gc` defaults to `gc tui`.
///
/// Rules:
/// - `gc`                      -> `gc tui`
/// - `gc -r Angus ...`         -> `gc tui -r Angus ...`
/// - `gc --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "show" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_becomes_tui() {
        assert_eq!(rewrite_args(args(&["gc"])), args(&["gc", "tui"]));
        assert_eq!(
            rewrite_args(args(&["gc", "-r", "Angus"])),
            args(&["gc", "tui", "-r", "Angus"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(args(&["gc", "fit", "-o", "100:45.2"])),
            args(&["gc", "fit", "-o", "100:45.2"])
        );
        assert_eq!(rewrite_args(args(&["gc", "--help"])), args(&["gc", "--help"]));
    }
}
