use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cardio_core::{FeatureSet, PredictionRequest, RiskClassifier, RiskPolicy, RiskThresholds};
use cardio_ml::{ArtifactPaths, ArtifactSummary, CardioMlStack, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};
use cardio_observability::init_tracing;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "cardio")]
#[command(about = "Cardiovascular risk prediction CLI")]
struct Cli {
    #[arg(long, env = "CARDIO_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    #[arg(long, env = "CARDIO_SCALER_PATH", default_value = DEFAULT_SCALER_PATH)]
    scaler: PathBuf,

    #[arg(long, env = "CARDIO_FEATURE_SET", default_value = "with_bmi", value_parser = parse_feature_set)]
    feature_set: FeatureSet,

    #[arg(long, env = "CARDIO_BMI_OVERRIDES", default_value = "true", value_parser = BoolishValueParser::new())]
    bmi_overrides: bool,

    #[arg(long, env = "CARDIO_SEVERE_OBESITY_BMI")]
    severe_obesity_bmi: Option<f64>,

    #[arg(long, env = "CARDIO_OBESITY_BMI")]
    obesity_bmi: Option<f64>,

    #[arg(long, env = "CARDIO_HIGH_SYSTOLIC")]
    high_systolic: Option<f64>,

    #[arg(long, env = "CARDIO_HIGH_PROBABILITY")]
    high_probability: Option<f64>,

    #[arg(long, env = "CARDIO_MODERATE_PROBABILITY")]
    moderate_probability: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assess one JSON request and print the result.
    Predict {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Print the raw and scaled feature vectors, class probabilities and result.
    Inspect {
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Load the artifacts, run the startup checks and a reference transform.
    Check,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    artifacts: ArtifactSummary,
    feature_set: FeatureSet,
    columns: &'static [&'static str],
    policy: RiskPolicy,
    reference: cardio_core::Evaluation,
}

fn main() -> Result<()> {
    init_tracing("cardio_cli");
    let cli = Cli::parse();

    let stack = CardioMlStack::load(&ArtifactPaths::new(&cli.model, &cli.scaler))?;
    let summary = stack.summary();
    let classifier = stack.into_classifier(cli.feature_set, cli.policy())?;

    match &cli.command {
        Command::Predict { input } => {
            let request = read_request(input)?;
            let result = classifier.assess(&request)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Inspect { input } => {
            let request = read_request(input)?;
            let evaluation = classifier.evaluate(&request)?;
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        Command::Check => {
            let report = check(&classifier, summary)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

impl Cli {
    fn policy(&self) -> RiskPolicy {
        let defaults = RiskThresholds::default();
        RiskPolicy::new(
            RiskThresholds {
                severe_obesity_bmi: self.severe_obesity_bmi.unwrap_or(defaults.severe_obesity_bmi),
                obesity_bmi: self.obesity_bmi.unwrap_or(defaults.obesity_bmi),
                high_systolic: self.high_systolic.unwrap_or(defaults.high_systolic),
                high_probability: self.high_probability.unwrap_or(defaults.high_probability),
                moderate_probability: self
                    .moderate_probability
                    .unwrap_or(defaults.moderate_probability),
            },
            self.bmi_overrides,
        )
    }
}

fn check(classifier: &RiskClassifier, artifacts: ArtifactSummary) -> Result<CheckReport> {
    let reference = PredictionRequest {
        gender: 1,
        height: 170.0,
        weight: 70.0,
        ap_hi: 120.0,
        ap_lo: 80.0,
        cholesterol: 1,
        gluc: 1,
        smoke: 0,
        alco: 0,
        active: 1,
        age_years: 30.0,
    };
    let evaluation = classifier
        .evaluate(&reference)
        .context("reference transform failed")?;

    Ok(CheckReport {
        artifacts,
        feature_set: classifier.feature_set(),
        columns: classifier.feature_set().columns(),
        policy: *classifier.policy(),
        reference: evaluation,
    })
}

fn read_request(input: &str) -> Result<PredictionRequest> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed reading request from stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("failed reading request file {input}"))?
    };

    let payload: serde_json::Value =
        serde_json::from_str(&raw).context("request is not valid JSON")?;
    Ok(PredictionRequest::from_json(&payload)?)
}

fn parse_feature_set(raw: &str) -> Result<FeatureSet, String> {
    FeatureSet::parse(raw).ok_or_else(|| format!("unknown feature set '{raw}', expected base or with_bmi"))
}
