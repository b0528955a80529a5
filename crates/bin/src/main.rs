//! Hobart CLI binary.
//!
//! Wires the data, feature, pipeline, and decision crates into three
//! batch-oriented commands: feature-matrix construction, single-PD scoring,
//! and decision explanation.

use clap::{Parser, Subcommand};
use hobart::{GradePolicy, ScorePolicy};
use hobart_data::{ID_COL, SourceBundle, unique_ids};
use hobart_decision::{AttributionAggregator, Band, DecisionError, RiskTypeClassifier, ScoreEngine};
use hobart_features::{
    ApplicationDeriver, BureauDeriver, CardDeriver, IdSet, InstallmentDeriver, PosDeriver,
    PreviousDeriver, SourceDeriver,
};
use hobart_output::DecisionReport;
use hobart_pipeline::{
    ApplicantFeatureMerger, CasePartition, CleanerConfig, FeatureCleaner, MergeInputs,
    SourcePresence,
};
use log::info;
use polars::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: credit feature derivation and scorecard decisions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cleaned feature matrix from a directory of raw tables
    Features {
        /// Directory holding application.parquet/csv and the optional
        /// source tables
        #[arg(long)]
        data_dir: PathBuf,

        /// Output Parquet path for the cleaned matrix
        #[arg(long)]
        out: PathBuf,
    },

    /// Score a single PD against the policy
    Score {
        /// Calibrated probability of default in [0, 1]
        #[arg(long)]
        pd: f64,

        /// Applicant identifier to stamp on the record
        #[arg(long, default_value = "0")]
        id: i64,

        /// Override the score at even odds
        #[arg(long)]
        offset: Option<f64>,

        /// Override the points-to-double-odds scaling
        #[arg(long)]
        pdo: Option<f64>,

        /// Override the reject cutoff
        #[arg(long)]
        t_low: Option<f64>,

        /// Override the approve cutoff
        #[arg(long)]
        t_high: Option<f64>,
    },

    /// Explain a decision from a JSON payload of attribution values
    Explain {
        /// Path to the JSON payload (id, pd, features, values, raw_values)
        #[arg(long)]
        input: PathBuf,

        /// Render Markdown instead of the ASCII table
        #[arg(long)]
        markdown: bool,
    },
}

/// Input payload for `hobart explain`.
#[derive(Debug, Deserialize)]
struct ExplainPayload {
    id: i64,
    pd: f64,
    features: Vec<String>,
    values: Vec<f64>,
    #[serde(default)]
    raw_values: Option<Vec<Option<f64>>>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Features { data_dir, out } => build_features(&data_dir, &out),
        Commands::Score {
            pd,
            id,
            offset,
            pdo,
            t_low,
            t_high,
        } => {
            let mut policy = ScorePolicy::default();
            if let Some(offset) = offset {
                policy.offset = offset;
            }
            if let Some(pdo) = pdo {
                policy.pdo = pdo;
            }
            if let Some(t_low) = t_low {
                policy.t_low = t_low;
            }
            if let Some(t_high) = t_high {
                policy.t_high = t_high;
            }
            let engine = ScoreEngine::new(policy, GradePolicy::default());
            let record = engine.decide(id, pd)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Explain { input, markdown } => explain(&input, markdown),
    }
}

fn build_features(data_dir: &std::path::Path, out: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = SourceBundle::load_dir(data_dir)?;
    let ids: IdSet = bundle.applicant_ids()?.into_iter().collect();
    info!("loaded {} applicants from {}", ids.len(), data_dir.display());

    let base = ApplicationDeriver::default()
        .derive(bundle.application.clone().lazy(), &ids)?
        .collect()?;

    let inputs = MergeInputs {
        pos: derive_optional(&PosDeriver, bundle.pos.as_ref(), &ids)?,
        card: derive_optional(&CardDeriver::default(), bundle.card.as_ref(), &ids)?,
        installment: derive_optional(&InstallmentDeriver, bundle.installment.as_ref(), &ids)?,
        previous: derive_optional(&PreviousDeriver, bundle.previous.as_ref(), &ids)?,
        bureau: match &bundle.bureau {
            Some(bureau) => {
                let balance = bundle
                    .bureau_balance
                    .clone()
                    .map_or_else(empty_balance, Ok)?;
                let deriver = BureauDeriver::new(balance);
                Some(deriver.derive(bureau.clone().lazy(), &ids)?.collect()?)
            }
            None => None,
        },
    };

    // Case routing keys off rows that survive each deriver's point-in-time
    // filter, not raw table membership: an applicant whose statements all
    // fall on or after origination has no usable history in that source.
    let presence = SourcePresence {
        prior: optional_ids(inputs.previous.as_ref())?,
        card: optional_ids(inputs.card.as_ref())?,
        installment: optional_ids(inputs.installment.as_ref())?,
    };
    let partition = CasePartition::compute(&ids, &presence);
    for (label, count) in partition.counts() {
        info!("case '{label}': {count} applicants");
    }

    let merged = ApplicantFeatureMerger.merge(base, &inputs)?;
    info!(
        "merged matrix: {} rows, {} columns",
        merged.height(),
        merged.width()
    );

    let matrix = FeatureCleaner::new(CleanerConfig::default()).clean(&merged)?;
    let mut frame = matrix.features;
    frame.insert_column(0, matrix.ids)?;

    ParquetWriter::new(File::create(out)?).finish(&mut frame)?;
    println!(
        "wrote {} rows x {} columns to {}",
        frame.height(),
        frame.width(),
        out.display()
    );
    Ok(())
}

fn explain(input: &std::path::Path, markdown: bool) -> Result<(), Box<dyn std::error::Error>> {
    let payload: ExplainPayload = serde_json::from_reader(File::open(input)?)?;
    println!("{}", render_explanation(&payload, markdown)?);
    Ok(())
}

/// Renders the decision plus its attribution drivers.
///
/// A length mismatch between the attribution lists is fatal for the
/// explanation only: the decision record is already computed and still
/// prints, with the driver section replaced by the error.
fn render_explanation(
    payload: &ExplainPayload,
    markdown: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let raw_values = payload
        .raw_values
        .clone()
        .unwrap_or_else(|| vec![None; payload.features.len()]);

    let engine = ScoreEngine::default();
    let record = engine.decide(payload.id, payload.pd)?;

    let bundle = match AttributionAggregator::default().aggregate(
        &payload.features,
        &payload.values,
        &raw_values,
    ) {
        Ok(bundle) => bundle,
        Err(e @ DecisionError::AttributionMismatch { .. }) => {
            return Ok(format!(
                "attribution unavailable: {e}\n{}",
                serde_json::to_string_pretty(&record)?
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let risk_type = if record.band == Band::Review {
        let (risk_type, signals) = RiskTypeClassifier::default().classify(&bundle);
        info!("risk signals: {signals:?}");
        Some(risk_type)
    } else {
        None
    };

    let report = DecisionReport::new(record, bundle, risk_type);
    Ok(if markdown {
        report.to_markdown()
    } else {
        report.to_ascii_table()
    })
}

/// Distinct applicant IDs of an optional source table.
fn optional_ids(table: Option<&DataFrame>) -> Result<std::collections::HashSet<i64>, Box<dyn std::error::Error>> {
    match table {
        Some(df) => Ok(unique_ids(df, ID_COL)?.into_iter().collect()),
        None => Ok(std::collections::HashSet::new()),
    }
}

/// Run a deriver over an optional source, collecting to applicant grain.
fn derive_optional<D: SourceDeriver>(
    deriver: &D,
    table: Option<&DataFrame>,
    ids: &IdSet,
) -> Result<Option<DataFrame>, Box<dyn std::error::Error>> {
    match table {
        Some(df) => Ok(Some(deriver.derive(df.clone().lazy(), ids)?.collect()?)),
        None => Ok(None),
    }
}

/// Schema-correct empty balance table for bureaus reported without history.
fn empty_balance() -> PolarsResult<DataFrame> {
    df!(
        "sk_id_bureau" => Vec::<i64>::new(),
        "months_balance" => Vec::<i32>::new(),
        "status" => Vec::<String>::new(),
    )
}
