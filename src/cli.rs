//! CLI argument parsing for time-analytics

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use time_analytics::{Granularity, TrendMode};

/// Series grouping for the trends command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    /// One series per team (from the entry or the team mapping)
    Team,
    /// One series per person
    Person,
    /// One series per technical domain category
    Category,
    /// One series per activity type category
    Activity,
}

#[derive(Parser, Debug)]
#[command(name = "time-analytics")]
#[command(version)]
#[command(about = "Categorize, aggregate and trend time-tracking entries", long_about = None)]
pub struct Cli {
    /// JSON configuration (category rules, team mapping, windows)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Role profile of one person
    Profile {
        /// Time entries CSV export
        csv: PathBuf,

        #[arg(short, long)]
        person: String,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Write distribution/keyword CSVs and the summary text here
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },

    /// Normalized time series per group
    Trends {
        csv: PathBuf,

        #[arg(long, value_enum, default_value = "team")]
        by: GroupArg,

        #[arg(long, default_value = "month")]
        granularity: Granularity,

        /// absolute, percentage or moving-average
        #[arg(long, default_value = "absolute")]
        mode: TrendMode,

        /// Moving-average window in buckets (defaults from config)
        #[arg(long)]
        window: Option<usize>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Only entries in the mapping's enablement categories
        #[arg(long)]
        enablement_only: bool,

        /// Write the series as CSV to this file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Team coverage of enablement work
    Teams {
        csv: PathBuf,

        /// Team mapping JSON (overrides the config's mapping)
        #[arg(long, value_name = "FILE")]
        mapping: Option<PathBuf>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },
}
