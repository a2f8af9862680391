mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, GroupArg};
use time_analytics::{
    build_profile, classify, group_label, load_csv, normalize, series_from_aggregation,
    AnalyticsConfig, Dimension, DomainType, GroupBy, PersonProfile, TeamMapping, TimeEntry,
    TimeSeries, TrendQuery,
};

/// Logs go to stderr; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)?,
        None => AnalyticsConfig::default(),
    };

    match args.command {
        Command::Profile { csv, person, start, end, export_dir } => {
            run_profile(&config, &csv, &person, start, end, export_dir.as_deref())
        }
        Command::Trends { csv, by, granularity, mode, window, start, end, enablement_only, export } => {
            let query = TrendQuery::new(granularity, mode)
                .with_window(window.unwrap_or_else(|| config.window_for(granularity)))
                .with_range(start, end);
            run_trends(&config, &csv, by, &query, enablement_only, export.as_deref())
        }
        Command::Teams { csv, mapping, start, end } => run_teams(&config, &csv, mapping.as_deref(), start, end),
    }
}

fn load_entries(csv: &Path) -> Result<Vec<TimeEntry>> {
    let loaded = load_csv(csv)?;
    info!(
        entries = loaded.entries.len(),
        rejected = loaded.rejected_rows.len(),
        "loaded time entries"
    );
    Ok(loaded.entries)
}

// ============================================================================
// PROFILE
// ============================================================================

fn run_profile(
    config: &AnalyticsConfig,
    csv: &Path,
    person: &str,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
    export_dir: Option<&Path>,
) -> Result<()> {
    let entries = load_entries(csv)?;
    let lexicon = config.lexicon()?;
    let profile = build_profile(&entries, &lexicon, person, start, end)?;

    print_profile(&profile);

    if let Some(dir) = export_dir {
        let written = time_analytics::export_profile(&profile, dir)?;
        println!("\n📤 Exported:");
        for path in written {
            println!("   {}", path.display());
        }
    }

    Ok(())
}

fn print_profile(profile: &PersonProfile) {
    println!("👤 {}", profile.person);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:.1} hours across {} tasks ({} with comments)",
        profile.total_hours, profile.task_count, profile.tasks_with_comments
    );
    if let Some((first, last)) = profile.observed_range {
        println!("Observed: {} → {}", first, last);
    }
    if profile.skipped_entries > 0 {
        println!("⚠️  {} malformed entries skipped", profile.skipped_entries);
    }

    for domain_type in DomainType::ALL {
        let rows = profile.distribution(domain_type);
        if rows.is_empty() {
            continue;
        }
        println!("\n📊 {}", domain_type);
        for row in rows {
            println!("   {:<28} {:>7.1}h {:>6.1}%", row.category, row.hours, row.percentage);
        }
    }

    if !profile.keyword_frequency.is_empty() {
        println!("\n🔑 Keywords");
        for keyword in &profile.keyword_frequency {
            println!("   {:<28} {:>7.1}h {:>4}x", keyword.term, keyword.hours, keyword.count);
        }
    }

    println!("\n📝 Summary");
    print!("{}", time_analytics::summary_text(profile));
}

// ============================================================================
// TRENDS
// ============================================================================

fn run_trends(
    config: &AnalyticsConfig,
    csv: &Path,
    by: GroupArg,
    query: &TrendQuery,
    enablement_only: bool,
    export: Option<&Path>,
) -> Result<()> {
    let mut entries = load_entries(csv)?;
    let lexicon = config.lexicon()?;

    if let Some(teams) = &config.teams {
        entries = if enablement_only {
            teams.enablement_only(&entries)
        } else {
            teams.assign_teams(&entries)
        };
    } else if enablement_only {
        anyhow::bail!("--enablement-only needs a team mapping in the configuration");
    }

    let group_dimension = match by {
        GroupArg::Team => Dimension::Team,
        GroupArg::Person => Dimension::Person,
        GroupArg::Category => Dimension::Category(DomainType::TechnicalDomain),
        GroupArg::Activity => Dimension::Category(DomainType::ActivityType),
    };
    let group_by = GroupBy::new(vec![group_dimension, Dimension::Bucket(query.granularity)]);
    let classify_fn = |entry: &TimeEntry| classify(entry.comment_text(), &lexicon);

    #[cfg(feature = "parallel")]
    let aggregation = time_analytics::aggregate_parallel(&entries, classify_fn, &group_by);
    #[cfg(not(feature = "parallel"))]
    let aggregation = time_analytics::aggregate(&entries, classify_fn, &group_by);

    if aggregation.skipped() > 0 {
        println!("⚠️  {} malformed entries skipped", aggregation.skipped());
    }

    let series = match series_from_aggregation(&aggregation) {
        Some((series, _)) => series,
        None => BTreeMap::new(),
    };
    let normalized = normalize(&series, query)?;

    print_series(&normalized, query);

    if let Some(path) = export {
        let file = fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        time_analytics::write_series_csv(&normalized, file)?;
        println!("\n📤 Exported: {}", path.display());
    }

    Ok(())
}

fn print_series(series: &BTreeMap<time_analytics::GroupKey, TimeSeries>, query: &TrendQuery) {
    println!(
        "📈 {} trends ({:?}, window {})",
        query.granularity.as_str(),
        query.mode,
        query.effective_window()
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if series.is_empty() {
        println!("No entries in the selected period");
        return;
    }

    for (key, timeseries) in series {
        println!("\n{}", group_label(key));
        for point in &timeseries.points {
            println!("   {}  {:>8.2}", point.bucket_start, point.value);
        }
    }
}

// ============================================================================
// TEAMS
// ============================================================================

fn run_teams(
    config: &AnalyticsConfig,
    csv: &Path,
    mapping: Option<&Path>,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> Result<()> {
    let teams = match mapping {
        Some(path) => TeamMapping::from_file(path)?,
        None => config
            .teams
            .clone()
            .context("No team mapping: pass --mapping or add \"teams\" to the configuration")?,
    };

    let entries = load_entries(csv)?;
    let by_team = teams.hours_by_team(&entries, start, end)?;
    let by_person = teams.hours_by_person(&entries, start, end)?;

    println!("👥 Enablement hours by team");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for team in teams.teams.keys() {
        let (hours, sessions) = by_team
            .iter()
            .find(|row| &row.team == team)
            .map_or((0.0, 0), |row| (row.hours, row.sessions));
        println!("   {:<28} {:>7.1}h {:>5} sessions", team, hours, sessions);
    }

    if !by_person.is_empty() {
        println!("\n🧑 By person");
        for row in &by_person {
            println!(
                "   {:<20} {:<16} {:>7.1}h {:>5} sessions",
                row.person, row.team, row.hours, row.sessions
            );
        }
    }

    let unassigned = teams.unassigned_people(&entries);
    if unassigned.is_empty() {
        println!("\n✓ Every person with enablement entries belongs to a team");
    } else {
        println!("\n⚠️  Not in any team:");
        for person in unassigned {
            println!("   {}", person);
        }
    }

    Ok(())
}
