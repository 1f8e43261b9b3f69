use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use stridelog::config::AppConfig;
use stridelog::error::StrideError;
use stridelog::import::ImportManager;
use stridelog::logging::{self, LogFormat, LogLevel};
use stridelog::models::{AthleteProfile, DailyLoad, PlannedWorkout};
use stridelog::pace;
use stridelog::plan;
use stridelog::readiness::ReadinessBand;
use stridelog::services::coach::CoachClient;
use stridelog::services::weather::{DailyForecast, WeatherClient};
use stridelog::session::TrainingSession;
use stridelog::store::{SqliteStore, TrainingStore};
use stridelog::stress;

/// stridelog - Running Training Load CLI
///
/// Ingests workout files, scores training stress, and tracks fitness,
/// fatigue and form (CTL, ATL, TSB) against a structured training plan.
#[derive(Parser)]
#[command(name = "stridelog")]
#[command(version = "0.1.0")]
#[command(about = "Running training load tracker", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import workout files (CSV, GPX, FIT) and rebuild the daily table
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Load a training plan and project the planned trajectory
    Plan {
        /// Plan file (CSV)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the recent daily load table
    Status {
        /// Number of trailing days to show
        #[arg(short, long, default_value = "14")]
        limit: usize,
    },

    /// Evaluate readiness for the upcoming plan and plan adherence
    Readiness {
        /// Plan file to recompute against before evaluating
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Show weather-adjusted training pace targets
    Paces {
        /// Intensity codes to show (default: all configured)
        #[arg(short = 'C', long)]
        codes: Vec<String>,

        /// Forecast date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Ask the AI coach for commentary on recent training
    Coach {
        /// Plan file supplying the upcoming workouts
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Show or edit the athlete profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Display the current profile
    Show,

    /// Set profile values
    Set {
        /// Lactate threshold heart rate in bpm
        #[arg(long)]
        lthr: Option<u16>,

        /// VDOT score
        #[arg(long)]
        vdot: Option<u8>,
    },

    /// Estimate LTHR from imported workout history
    EstimateLthr,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level, cli.log_format)?;

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let mut store = SqliteStore::open(config.database_path()?)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Import { files } => cmd_import(&config, &mut store, &files, today),
        Commands::Plan { file } => cmd_plan(&config, &mut store, &file, today),
        Commands::Status { limit } => cmd_status(&store, limit),
        Commands::Readiness { plan } => cmd_readiness(&config, &mut store, plan.as_deref(), today),
        Commands::Paces { codes, date } => cmd_paces(&config, &store, &codes, date, today),
        Commands::Coach { plan } => cmd_coach(&config, &store, plan.as_deref()),
        Commands::Profile { action } => cmd_profile(&mut store, action),
    }
}

fn session_for(config: &AppConfig, store: &dyn TrainingStore) -> Result<TrainingSession> {
    let profile = store.load_profile()?.unwrap_or_default();
    Ok(TrainingSession::new(
        profile,
        config.pmc.clone(),
        config.readiness.bands,
        config.readiness.adherence_tolerance,
    ))
}

/// Recompute the daily table from stored workouts plus an in-memory plan
/// and persist it wholesale.
fn recompute_and_persist(
    config: &AppConfig,
    store: &mut dyn TrainingStore,
    plan: &[PlannedWorkout],
    today: NaiveDate,
) -> Result<Vec<DailyLoad>> {
    let session = session_for(config, store)?;
    let workouts = store.load_workouts(None)?;
    let recompute = session.recompute(&workouts, plan, today)?;

    for warning in &recompute.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    store.replace_daily_loads(&recompute.table)?;
    Ok(recompute.table)
}

fn cmd_import(
    config: &AppConfig,
    store: &mut SqliteStore,
    files: &[PathBuf],
    today: NaiveDate,
) -> Result<()> {
    println!("{}", "Importing workout files...".green().bold());

    let manager = ImportManager::new();
    let outcome = manager.import_batch(files);

    for warning in &outcome.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
    for (file, reason) in &outcome.failed_files {
        eprintln!(
            "{} {}: {}",
            "failed:".red().bold(),
            file.display(),
            reason
        );
    }

    let inserted = store.append_workouts(&outcome.records)?;
    let duplicates = outcome.records.len() - inserted;
    println!(
        "  {} new workouts ({} duplicates skipped, {} files failed)",
        inserted,
        duplicates,
        outcome.failed_files.len()
    );

    if inserted > 0 {
        match recompute_and_persist(config, store, &[], today) {
            Ok(table) => {
                println!("  daily table rebuilt over {} days", table.len());
            }
            // First import with nothing usable is not an error state.
            Err(e) if matches!(e.downcast_ref(), Some(StrideError::DataGap(_))) => {}
            Err(e) => return Err(e),
        }
    }

    println!("{}", "✓ Import completed".green());
    Ok(())
}

fn cmd_plan(
    config: &AppConfig,
    store: &mut SqliteStore,
    file: &PathBuf,
    today: NaiveDate,
) -> Result<()> {
    println!("{}", "Loading training plan...".blue().bold());

    let parsed = plan::parse_plan_file(file)?;
    for warning in &parsed.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    let table = recompute_and_persist(config, store, &parsed.workouts, today)?;

    let upcoming: Vec<&PlannedWorkout> = parsed
        .workouts
        .iter()
        .filter(|w| w.date >= today)
        .take(7)
        .collect();

    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Workout")]
        description: String,
        #[tabled(rename = "Planned stress")]
        stress: String,
    }

    let rows: Vec<PlanRow> = upcoming
        .iter()
        .map(|w| {
            let stress = table
                .iter()
                .find(|d| d.date == w.date)
                .and_then(|d| d.planned_stress)
                .map(|s| format!("{s:.0}"))
                .unwrap_or_else(|| "-".to_string());
            PlanRow {
                date: w.date.to_string(),
                description: w.description.clone(),
                stress,
            }
        })
        .collect();

    if rows.is_empty() {
        println!("  plan has no upcoming workouts");
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    println!(
        "{}",
        format!(
            "✓ Plan loaded: {} workouts, projection through {}",
            parsed.workouts.len(),
            table.last().map(|d| d.date.to_string()).unwrap_or_default()
        )
        .blue()
    );
    Ok(())
}

fn cmd_status(store: &SqliteStore, limit: usize) -> Result<()> {
    let table = store.load_daily_loads()?;
    if table.is_empty() {
        println!("No daily table yet; run `stridelog import` first.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct StatusRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Stress")]
        stress: String,
        #[tabled(rename = "Plan")]
        plan: String,
        #[tabled(rename = "CTL")]
        ctl: String,
        #[tabled(rename = "ATL")]
        atl: String,
        #[tabled(rename = "TSB")]
        tsb: String,
    }

    let start = table.len().saturating_sub(limit);
    let rows: Vec<StatusRow> = table[start..]
        .iter()
        .map(|d| StatusRow {
            date: d.date.to_string(),
            stress: format!("{:.0}", d.actual_stress),
            plan: d
                .planned_stress
                .map(|s| format!("{s:.0}"))
                .unwrap_or_else(|| "-".to_string()),
            ctl: format!("{:.1}", d.ctl),
            atl: format!("{:.1}", d.atl),
            tsb: format!("{:.1}", d.tsb),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn cmd_readiness(
    config: &AppConfig,
    store: &mut SqliteStore,
    plan_file: Option<&std::path::Path>,
    today: NaiveDate,
) -> Result<()> {
    let plan = match plan_file {
        Some(path) => {
            let parsed = plan::parse_plan_file(path)?;
            for warning in &parsed.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }
            parsed.workouts
        }
        None => Vec::new(),
    };

    let table = if plan.is_empty() {
        store.load_daily_loads()?
    } else {
        recompute_and_persist(config, store, &plan, today)?
    };

    let session = session_for(config, store)?;
    let report = session
        .readiness(&table, today)
        .ok_or_else(|| anyhow!("no upcoming plan in the daily table to evaluate against"))?;

    let band = match report.band {
        ReadinessBand::Fresh => "Fresh".green().bold(),
        ReadinessBand::Neutral => "Neutral".normal().bold(),
        ReadinessBand::Fatigued => "Fatigued".yellow().bold(),
        ReadinessBand::Overreached => "Overreached".red().bold(),
    };

    println!("{}", "Readiness".bold());
    println!("  as of:              {}", report.as_of);
    println!("  plan starts:        {}", report.plan_start);
    println!("  current TSB:        {:.1}", report.current_tsb);
    println!("  projected at start: {:.1}", report.projected_tsb_at_start);
    println!("  delta:              {:.1}", report.delta);
    println!("  band:               {} ({})", band, report.band.description());

    if let Some(adherence) = session.adherence(&table, today) {
        let fmt = |status| match status {
            stridelog::readiness::MetricStatus::Ahead => "ahead".green(),
            stridelog::readiness::MetricStatus::OnTrack => "on track".normal(),
            stridelog::readiness::MetricStatus::Behind => "behind".yellow(),
        };
        println!("{}", "Adherence (today vs plan)".bold());
        println!(
            "  CTL: {:+.1} ({})  ATL: {:+.1} ({})  TSB: {:+.1} ({})",
            adherence.ctl_delta,
            fmt(adherence.ctl_status),
            adherence.atl_delta,
            fmt(adherence.atl_status),
            adherence.tsb_delta,
            fmt(adherence.tsb_status),
        );
    }

    Ok(())
}

fn cmd_paces(
    config: &AppConfig,
    store: &SqliteStore,
    codes: &[String],
    date: Option<String>,
    today: NaiveDate,
) -> Result<()> {
    let profile = store.load_profile()?.unwrap_or_default();

    let date = match date {
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{text}'"))?,
        None => today,
    };

    let forecast = fetch_forecast(config, date);
    match &forecast {
        Some(day) => println!(
            "Forecast {}: {:.0}-{:.0}°F, {:.0}% humidity",
            day.date, day.low_f, day.high_f, day.humidity_pct
        ),
        None => println!("{}", "No forecast available; showing baseline paces.".dimmed()),
    }

    let codes: Vec<String> = if codes.is_empty() {
        profile.intensity_factors.keys().cloned().collect()
    } else {
        codes.to_vec()
    };

    #[derive(Tabled)]
    struct PaceRow {
        #[tabled(rename = "Code")]
        code: String,
        #[tabled(rename = "Base /mi")]
        base: String,
        #[tabled(rename = "Adjusted /mi")]
        adjusted: String,
    }

    let mut rows = Vec::new();
    for code in &codes {
        let range = pace::adjusted_range(profile.vdot, code, forecast.as_ref())?;
        let adjusted = if range.low_seconds_per_mile == range.high_seconds_per_mile {
            pace::format_pace(range.low_seconds_per_mile)
        } else {
            format!(
                "{} - {}",
                pace::format_pace(range.low_seconds_per_mile),
                pace::format_pace(range.high_seconds_per_mile)
            )
        };
        rows.push(PaceRow {
            code: code.clone(),
            base: pace::format_pace(range.base_seconds_per_mile),
            adjusted,
        });
    }

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

/// Best-effort forecast lookup; any failure degrades to no forecast.
fn fetch_forecast(config: &AppConfig, date: NaiveDate) -> Option<DailyForecast> {
    let (latitude, longitude) = match (config.weather.latitude, config.weather.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return None,
    };

    let client = WeatherClient::new(
        config.weather.endpoint.clone(),
        config.weather.timeout_seconds,
    )
    .ok()?;

    match client.forecast(latitude, longitude, date) {
        Ok(forecast) => Some(forecast),
        Err(e) => {
            eprintln!("{} forecast unavailable: {}", "warning:".yellow().bold(), e);
            None
        }
    }
}

fn cmd_coach(
    config: &AppConfig,
    store: &SqliteStore,
    plan_file: Option<&std::path::Path>,
) -> Result<()> {
    let table = store.load_daily_loads()?;
    if table.is_empty() {
        println!("No training data yet; run `stridelog import` first.");
        return Ok(());
    }

    let upcoming = match plan_file {
        Some(path) => plan::parse_plan_file(path)?.workouts,
        None => Vec::new(),
    };

    let api_key = config
        .coach_api_key()
        .ok_or_else(|| anyhow!("no coach API key configured (set {})", stridelog::config::COACH_API_KEY_VAR))?;

    let client = CoachClient::new(
        config.coach.endpoint.clone(),
        api_key,
        config.coach.timeout_seconds,
    )?;

    println!("{}", "Asking the coach...".cyan().bold());
    match client.commentary(&table, &upcoming) {
        Ok(text) => println!("\n{text}"),
        Err(e) => {
            // Commentary is decoration; its failure is not a command failure.
            eprintln!("{} {}", "warning:".yellow().bold(), e);
            println!("{}", "Coach commentary unavailable right now.".dimmed());
        }
    }

    Ok(())
}

fn cmd_profile(store: &mut SqliteStore, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let profile = store.load_profile()?.unwrap_or_default();
            print_profile(&profile);
        }
        ProfileAction::Set { lthr, vdot } => {
            let mut profile = store.load_profile()?.unwrap_or_default();
            if let Some(lthr) = lthr {
                profile.lthr = Some(lthr);
            }
            if let Some(vdot) = vdot {
                profile.vdot = Some(vdot);
            }
            profile.touch();
            store.save_profile(&profile)?;
            println!("{}", "✓ Profile updated".green());
            print_profile(&profile);
        }
        ProfileAction::EstimateLthr => {
            let workouts = store.load_workouts(None)?;
            let estimate = stress::estimate_lthr(&workouts)?;
            let mut profile = store.load_profile()?.unwrap_or_default();
            profile.lthr = Some(estimate);
            profile.touch();
            store.save_profile(&profile)?;
            println!(
                "{}",
                format!("✓ LTHR estimated from history: {estimate} bpm").green()
            );
        }
    }
    Ok(())
}

fn print_profile(profile: &AthleteProfile) {
    println!("{}", "Athlete profile".bold());
    println!(
        "  LTHR: {}",
        profile
            .lthr
            .map(|v| format!("{v} bpm"))
            .unwrap_or_else(|| "unset".to_string())
    );
    println!(
        "  VDOT: {}",
        profile
            .vdot
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unset".to_string())
    );
    println!("  Intensity factors:");
    for (code, factor) in &profile.intensity_factors {
        println!("    {code}: {factor}");
    }
}
