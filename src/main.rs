use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn, Level};

use recoverrs::export::text::{assessment_table, metric_table, rules_table, summary_lines};
use recoverrs::export::{export_report, ExportFormat, TeamReport};
use recoverrs::import::{CsvDirectorySource, DatasetCache, DatasetSource, RecoveryDataset};
use recoverrs::logging::init_logging;
use recoverrs::readiness::ReadinessForecast;
use recoverrs::summary::{assess_athlete, assess_team, AthleteAssessment, TeamSummary};
use recoverrs::{AlertClassifier, AlertPriority, AppConfig, RecoveryError};

/// RecoverRS - Athlete Recovery Alert CLI
///
/// Classifies each athlete's latest night of biometric data into a recovery
/// alert, with genotype-specific recommendations and a readiness forecast.
#[derive(Parser)]
#[command(name = "recoverrs")]
#[command(author = "RecoverRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete Recovery Alert CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Dataset directory (overrides the config file)
    #[arg(short, long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Team dashboard: summary counts and one row per athlete
    Team,

    /// Detailed view of a single athlete
    Athlete {
        /// Athlete identifier
        id: String,
    },

    /// Export all assessments
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, csv, text)
        #[arg(short = 'f', long, default_value = "json")]
        format: String,
    },

    /// Re-run the team view whenever the dataset changes
    Watch {
        /// Seconds between checks
        #[arg(short, long, default_value = "60")]
        interval: u64,

        /// Stop after this many refreshes
        #[arg(short = 'n', long)]
        iterations: Option<u32>,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default().map_err(|e| anyhow::anyhow!(e.user_message()))?,
    };
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }
    config.logging.level = config.logging.level.raised_by(cli.verbose);
    init_logging(&config.logging)?;

    let source = CsvDirectorySource::with_files(&config.data.data_dir, config.data.files.clone());
    let classifier = AlertClassifier::new(config.engine.trends.clone());

    match cli.command {
        Commands::Team => {
            let dataset = load_dataset(&source)?;
            let assessments = assess_team(&classifier, &dataset);
            print_team(&assessments);
        }

        Commands::Athlete { id } => {
            let dataset = load_dataset(&source)?;
            let profile = dataset
                .athlete(&id)
                .with_context(|| format!("Athlete '{}' not found in {}", id, source.describe()))?;
            let assessment = assess_athlete(&classifier, profile, &dataset);
            print_athlete(&dataset, &assessment);
        }

        Commands::Export { output, format } => {
            let format: ExportFormat = format.parse()?;
            let dataset = load_dataset(&source)?;
            let report = TeamReport::new(assess_team(&classifier, &dataset)).with_rules(dataset.rules.clone());

            export_report(&report, format, &output)?;
            println!(
                "{}",
                format!("✓ Exported {} athletes to {}", report.athletes.len(), output.display()).green()
            );
        }

        Commands::Watch { interval, iterations } => {
            let mut cache = DatasetCache::new();
            let mut refreshes = 0u32;

            loop {
                match cache.get_or_load(&source) {
                    Ok(dataset) => {
                        let assessments = assess_team(&classifier, &dataset);
                        println!("{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string().dimmed());
                        print_team(&assessments);
                    }
                    Err(e) => {
                        warn!(error = %e, "Dataset refresh failed");
                        eprintln!("{}", e.user_message().red());
                    }
                }

                refreshes += 1;
                if iterations.is_some_and(|n| refreshes >= n) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(interval));
            }

            let metrics = cache.metrics();
            println!(
                "{}",
                format!(
                    "{} refreshes, {} reloads, cache hit rate {:.0}%",
                    metrics.total_lookups,
                    metrics.cache_misses,
                    metrics.hit_rate()
                )
                .dimmed()
            );
        }

        Commands::Config { init, show } => {
            if init {
                if config_path.exists() {
                    println!("Config already exists at {}", config_path.display());
                } else {
                    AppConfig::default().save_to_file(&config_path)?;
                    println!("{}", format!("✓ Wrote {}", config_path.display()).green());
                }
            }
            if show || !init {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn load_dataset(source: &CsvDirectorySource) -> Result<RecoveryDataset> {
    source.load().map_err(|e: RecoveryError| {
        if e.severity().to_tracing_level() == Level::WARN {
            warn!(error = %e, "Failed to load dataset");
        } else {
            error!(error = %e, severity = ?e.severity(), "Failed to load dataset");
        }
        anyhow::anyhow!(e.user_message())
    })
}

fn paint(priority: AlertPriority, text: &str) -> ColoredString {
    match priority {
        AlertPriority::High => text.red().bold(),
        AlertPriority::Monitor => text.yellow().bold(),
        AlertPriority::Optimal => text.green().bold(),
        AlertPriority::Unknown => text.bright_black(),
    }
}

fn print_team(assessments: &[AthleteAssessment]) {
    let summary = TeamSummary::from_assessments(assessments);

    println!("{}", "Team Performance Dashboard".blue().bold());
    if summary.athletes_with_data == 0 {
        println!("{}", "No biometric data available for any athletes.".yellow());
    }
    for line in summary_lines(&summary) {
        println!("  {}", line);
    }
    println!();

    println!("{}", assessment_table(assessments));
    println!();

    for a in assessments {
        println!(
            "{} {} - {}",
            paint(a.priority, &format!("[{}]", a.priority)),
            a.name.bold(),
            a.alert.cause
        );
    }
}

fn print_athlete(dataset: &RecoveryDataset, assessment: &AthleteAssessment) {
    if let Some(profile) = dataset.athlete(&assessment.athlete_id) {
        println!("{}", format!("{} ({})", profile.name, profile.athlete_id).bold());
        println!("  Sport: {}  Team: {}  Age: {}", profile.sport, profile.team, profile.age);
        if let Some(sex) = &profile.sex {
            println!("  Sex: {}", sex);
        }
        if let Some(date) = profile.baseline_start_date {
            println!("  Baseline since: {}", date);
        }
        if let Some(notes) = &profile.notes {
            println!("  Notes: {}", notes);
        }
    }
    println!();

    println!("{}", "Genetic Profile".cyan().bold());
    match dataset.genotype(&assessment.athlete_id) {
        Some(genotype) if !genotype.is_empty() => {
            for (gene, variant) in genotype.iter() {
                println!("  {}: {}", gene, variant);
            }
        }
        _ => println!("  Genetic data not available."),
    }
    println!();

    let alert = &assessment.alert;
    println!("{}", paint(assessment.priority, &alert.title));
    println!("  Cause: {}", alert.cause);
    println!("  Action: {}", alert.recommendation);
    println!();

    println!("{}", "Latest Metrics".cyan().bold());
    match assessment.latest_date {
        Some(date) => {
            println!("  Night of {}", date);
            println!("{}", metric_table(&assessment.metrics));
        }
        None => println!("  No recent biometric data available."),
    }
    println!();

    if !assessment.annotations.is_empty() {
        println!("{}", "Genotype-Specific Recommendations".cyan().bold());
        for annotation in &assessment.annotations {
            println!("  {} - {}", annotation.gene.bold(), annotation.trait_name);
            println!("    {}", annotation.recommendation);
        }
        println!();
    }

    println!("{}", "Performance Readiness Forecast".cyan().bold());
    match &assessment.readiness {
        Some(forecast) => print_forecast(forecast),
        None => println!("  Need at least 3 days of data for performance forecasting."),
    }

    if !dataset.rules.is_empty() {
        println!();
        println!("{}", "Rules Reference".cyan().bold());
        println!("{}", rules_table(&dataset.rules));
    }
}

fn print_forecast(forecast: &ReadinessForecast) {
    let indicator = |label: &str, mean: Option<f64>, unit: &str, arrow: &str| match mean {
        Some(v) => println!("  {}: {:.1} {} {}", label, v, unit, arrow),
        None => println!("  {}: - {}", label, arrow),
    };
    indicator("HRV Trend", forecast.hrv.recent_mean, "ms", forecast.hrv.direction.arrow());
    indicator("RHR Trend", forecast.resting_hr.recent_mean, "bpm", forecast.resting_hr.direction.arrow());
    indicator(
        "Sleep Trend",
        forecast.sleep_duration.recent_mean,
        "h",
        forecast.sleep_duration.direction.arrow(),
    );

    let score = format!("{:.0}% ({})", forecast.overall_score, forecast.band);
    let score = if forecast.overall_score > 75.0 {
        score.green().bold()
    } else if forecast.overall_score > 50.0 {
        score.yellow().bold()
    } else {
        score.red().bold()
    };
    println!("  Readiness Score: {}", score);
}
