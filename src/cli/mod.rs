//! Command-line parsing for the growth-curve tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Observation;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gc", version, about = "Gompertz growth-curve dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calibrate a region's coefficients against observed weights and print the result.
    Fit(FitArgs),
    /// Print the loaded curve for a region without fitting.
    Show(ShowArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `gc fit`, but renders the
    /// curve and entry form in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Options shared by every command that loads a table.
#[derive(Debug, Parser, Clone)]
pub struct TableArgs {
    /// Parameter file (CSV with ID,b0,b1,b2 columns, or a JSON array).
    /// Falls back to the built-in default table.
    #[arg(short = 'p', long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Region/group identifier to operate on (defaults to the table's first row).
    #[arg(short = 'r', long)]
    pub region: Option<String>,
}

/// Options for `gc fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Observed weighing as `AGE:WEIGHT` (days:kg). Repeatable; the
    /// dashboard form carries up to 5 of these.
    #[arg(short = 'o', long = "obs", value_name = "AGE:WEIGHT", value_parser = parse_observation)]
    pub observations: Vec<Observation>,

    /// Optimizer seed for the asymptotic weight (kg).
    #[arg(long, default_value_t = 400.0)]
    pub seed_b0: f64,

    /// Optimizer seed for the shape constant.
    #[arg(long, default_value_t = 3.0)]
    pub seed_b1: f64,

    /// Optimizer seed for the growth-rate constant (1/days).
    #[arg(long, default_value_t = 0.01)]
    pub seed_b2: f64,

    /// Maximum solver iterations.
    #[arg(long, default_value_t = 200)]
    pub max_iter: usize,

    #[command(flatten)]
    pub plot: PlotArgs,
}

/// Options for `gc show`.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// List every region in the table instead of plotting one.
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub plot: PlotArgs,
}

/// Options for `gc tui`.
#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub table: TableArgs,
}

/// Display-range and plot-size flags.
#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// First plotted age (days).
    #[arg(long, default_value_t = 0.0)]
    pub age_start: f64,

    /// Last plotted age (days).
    #[arg(long, default_value_t = 800.0)]
    pub age_stop: f64,

    /// Number of curve samples.
    #[arg(long, default_value_t = 200)]
    pub curve_points: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Parse `AGE:WEIGHT` into an [`Observation`].
///
/// A comma separator is accepted too, so `--obs 100,45.2` works when
/// pasted from a spreadsheet.
pub fn parse_observation(raw: &str) -> Result<Observation, String> {
    let (age_raw, weight_raw) = raw
        .split_once(':')
        .or_else(|| raw.split_once(','))
        .ok_or_else(|| format!("expected AGE:WEIGHT, got '{raw}'"))?;

    let age_days: f64 = age_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid age '{}'", age_raw.trim()))?;
    let weight_kg: f64 = weight_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{}'", weight_raw.trim()))?;

    if !age_days.is_finite() || !weight_kg.is_finite() {
        return Err(format!("non-finite observation '{raw}'"));
    }
    if age_days < 0.0 || weight_kg < 0.0 {
        return Err(format!("negative age or weight in '{raw}'"));
    }

    Ok(Observation::new(age_days, weight_kg))
}
