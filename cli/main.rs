#![deny(unused_variables)]
#![deny(dead_code)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use neurorisk::cohort::config::DashboardConfig;
use neurorisk::cohort::data::load_cohort;
use neurorisk::cohort::export::write_scored_csv;
use neurorisk::cohort::filter::FilterConfig;
use neurorisk::cohort::insight::{risk_drivers, strongest_pair};
use neurorisk::cohort::pipeline::{Assessment, PassOutcome, run_pass};
use neurorisk::cohort::summary::{CohortSummary, Correlation};
use neurorisk::flag::EarlyDetection;
use neurorisk::scorer::{score_breakdown, score_patient};
use neurorisk::types::ScoringModel;

#[derive(Clone, Copy, ValueEnum)]
pub enum ModelCli {
    Legacy,
    Extended,
}

impl From<ModelCli> for ScoringModel {
    fn from(model: ModelCli) -> Self {
        match model {
            ModelCli::Legacy => ScoringModel::Legacy,
            ModelCli::Extended => ScoringModel::Extended,
        }
    }
}

#[derive(Args)]
pub struct AssessArgs {
    /// Path to the patient CSV file
    pub data: PathBuf,

    /// Dashboard configuration (TOML) with scoring model and filters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the scoring model of the configuration
    #[arg(long, value_enum)]
    pub model: Option<ModelCli>,

    /// Write the summary as TOML to this file
    #[arg(long, value_name = "FILE")]
    pub summary_out: Option<PathBuf>,

    /// Write the scored population as CSV to this file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "neurorisk",
    version,
    about = "Alzheimer's risk scoring and cohort analytics",
    long_about = "Scores patient records for Alzheimer's risk, flags candidates for early \
                 detection and summarizes filtered populations."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score, filter and summarize a patient dataset
    Assess(AssessArgs),

    /// Write a configuration whose filters span the dataset's observed ranges
    Template {
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Output file; printed to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Explain one patient's score factor by factor
    Explain {
        #[arg(value_name = "DATA")]
        data: PathBuf,

        #[arg(long)]
        patient: String,

        #[arg(long, value_enum, default_value_t = ModelCli::Legacy)]
        model: ModelCli,
    },
}

pub fn assess(args: AssessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            println!("Loading configuration from: {}", path.display());
            DashboardConfig::load(path)?
        }
        None => DashboardConfig::default(),
    };
    if let Some(model) = args.model {
        config.scoring_model = model.into();
    }

    println!("Loading patient data from: {}", args.data.display());
    let cohort = load_cohort(&args.data)?;
    println!("Loaded {} patients", cohort.len());

    match run_pass(&cohort, &config)? {
        PassOutcome::Assessed(assessment) => {
            print_assessment(&assessment);
            if let Some(path) = &args.summary_out {
                write_summary(path, &assessment.summary)?;
            }
            if let Some(path) = &args.export {
                write_scored_csv(path, &assessment)?;
                println!("Scored population saved to: {}", path.display());
            }
        }
        PassOutcome::NoMatches {
            active_filters,
            empty,
            fallback,
        } => {
            println!();
            println!(
                "No patients match your filters ({active_filters} active). Try widening the ranges."
            );
            println!("Showing the unfiltered population instead.");
            print_assessment(&fallback);
            if let Some(path) = &args.summary_out {
                write_summary(path, &empty)?;
            }
            if args.export.is_some() {
                println!("Nothing to export: the filtered population is empty.");
            }
        }
    }
    Ok(())
}

pub fn template(data: PathBuf, out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let cohort = load_cohort(&data)?;
    let config = DashboardConfig {
        filters: FilterConfig::spanning(&cohort),
        ..Default::default()
    };
    match out {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration template saved to: {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

pub fn explain(
    data: PathBuf,
    patient: String,
    model: ModelCli,
) -> Result<(), Box<dyn std::error::Error>> {
    let model: ScoringModel = model.into();
    let cohort = load_cohort(&data)?;
    let record = cohort
        .records()
        .iter()
        .find(|r| r.patient_id == patient)
        .ok_or_else(|| format!("patient '{patient}' not found in {}", data.display()))?;

    let contributions = score_breakdown(record, model)?;
    println!("Patient {} ({} model)", record.patient_id, model);
    for c in &contributions {
        println!("  {:<30} {:>5.2}", c.factor, c.points);
    }
    let score = score_patient(record, model)?;
    let tier = score.tier();
    println!("  {:<30} {:>5}", "total", score.to_string());
    println!("Tier: {} ({})", tier, tier.recommendation());

    let early = EarlyDetection::assess(record);
    let triggered: Vec<&str> = [
        (early.cognitive_impairment, "cognitive score below 18"),
        (early.advanced_age, "age above 75"),
        (early.severe_obesity, "BMI above 35"),
        (early.functional_dependency, "functional assessment at most 3"),
    ]
    .into_iter()
    .filter_map(|(hit, reason)| hit.then_some(reason))
    .collect();
    if triggered.is_empty() {
        println!("Early detection: not flagged");
    } else {
        println!("Early detection: flagged ({})", triggered.join(", "));
    }
    Ok(())
}

fn print_assessment(assessment: &Assessment<'_>) {
    let summary = &assessment.summary;
    println!();
    println!("Scoring model: {}", assessment.model);
    println!("Patients assessed: {}", summary.total);
    match summary.mean_risk_score {
        Some(mean) => println!("Mean risk score: {mean:.2}"),
        None => println!("Mean risk score: n/a"),
    }
    println!("Early detection candidates: {}", summary.early_detection_count);

    println!();
    println!(
        "{:<12} {:>6} {:>8} {:>10} {:>8} {:>8} {:>7}",
        "Tier", "Count", "Percent", "Cognitive", "Age", "BMI", "Early"
    );
    let fmt_mean = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
    for tier in &summary.tiers {
        println!(
            "{:<12} {:>6} {:>7.1}% {:>10} {:>8} {:>8} {:>7}",
            tier.tier.label(),
            tier.count,
            tier.percentage,
            fmt_mean(tier.mean_cognitive_score),
            fmt_mean(tier.mean_age),
            fmt_mean(tier.mean_bmi),
            tier.early_detection_count
        );
    }

    if !assessment.excluded.is_empty() {
        println!();
        println!("Excluded records: {}", assessment.excluded.len());
        for excluded in &assessment.excluded {
            println!("  {}: {}", excluded.patient_id, excluded.reason);
        }
    }

    println!();
    print_insight(summary);

    if !summary.high_risk.is_empty() {
        println!();
        println!("High-risk patients (first {}):", summary.high_risk.len());
        for entry in &summary.high_risk {
            println!(
                "  {:<10} age {:>5} cognitive {:>5} BMI {:>5} score {:>5.2} early {}",
                entry.patient_id,
                fmt_mean(entry.age),
                fmt_mean(entry.cognitive_score),
                fmt_mean(entry.bmi),
                entry.risk_score,
                if entry.early_detection { "yes" } else { "no" }
            );
        }
    }
}

fn print_insight(summary: &CohortSummary) {
    match &summary.correlation {
        Correlation::Matrix(matrix) => {
            println!(
                "Correlations over {} variables (pairwise, up to {} records per pair)",
                matrix.variables.len(),
                matrix.observations.iter().max().copied().unwrap_or(0)
            );
            if let Some(pair) = strongest_pair(matrix) {
                println!(
                    "  Strongest: {} and {} ({} correlation, r = {:.2})",
                    pair.first,
                    pair.second,
                    pair.direction(),
                    pair.coefficient
                );
            }
            for (name, r) in risk_drivers(matrix).iter().take(3) {
                println!("  Risk driver: {name:<24} r = {r:>5.2}");
            }
        }
        Correlation::Insufficient(reason) => println!("Correlations unavailable: {reason}"),
    }
}

fn write_summary(path: &Path, summary: &CohortSummary) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, toml::to_string_pretty(summary)?)?;
    println!("Summary saved to: {}", path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Assess(args)) => assess(args),
        Some(Commands::Template { data, out }) => template(data, out),
        Some(Commands::Explain {
            data,
            patient,
            model,
        }) => explain(data, patient, model),
        None => {
            let _ = Cli::command().print_help();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
