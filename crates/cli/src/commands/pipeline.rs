//! Pipeline CLI commands: status, catalog load, training and predictions

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use forecast_lib::predictor::{
    Activation, ClassifierSummary, LayerSpec, ReorderDecision, TrainingConfig,
};
use forecast_lib::{CatalogPredictions, LoadOutcome, PipelineSnapshot};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_decision, color_status, format_percent, format_quantity, print_info, print_json,
    print_success, print_warning, OutputFormat,
};

/// Training options; anything not given uses the service defaults
#[derive(Debug, Clone, Default, Args)]
pub struct TrainArgs {
    /// Number of passes over the catalog
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Keep catalog order instead of shuffling each epoch
    #[arg(long)]
    pub no_shuffle: bool,

    /// Optimizer (adam, sgd)
    #[arg(long)]
    pub optimizer: Option<String>,

    /// Loss function (binaryCrossentropy, meanSquaredError)
    #[arg(long)]
    pub loss: Option<String>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seed for reproducible training
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hidden layers as units:activation pairs, e.g. 12:relu,8:relu
    #[arg(long)]
    pub hidden: Option<String>,
}

impl TrainArgs {
    pub fn to_config(&self) -> Result<TrainingConfig> {
        let mut config = TrainingConfig::default();
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if self.no_shuffle {
            config.shuffle_each_epoch = false;
        }
        if let Some(optimizer) = &self.optimizer {
            config.optimizer = optimizer.clone();
        }
        if let Some(loss) = &self.loss {
            config.loss_function = loss.clone();
        }
        if let Some(rate) = self.learning_rate {
            config.learning_rate = rate;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(hidden) = &self.hidden {
            config.hidden_layers = parse_hidden(hidden)?;
        }
        config.seed = self.seed;
        Ok(config)
    }
}

/// Parse `12:relu,8:relu`; the activation defaults to relu when omitted
pub fn parse_hidden(layers: &str) -> Result<Vec<LayerSpec>> {
    layers
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (units, activation) = match part.split_once(':') {
                Some((units, activation)) => (units, Some(activation)),
                None => (part, None),
            };
            let units: usize = units
                .trim()
                .parse()
                .with_context(|| format!("Invalid unit count in layer '{}'", part))?;
            let activation = match activation.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
                None | Some("relu") => Activation::Relu,
                Some("sigmoid") => Activation::Sigmoid,
                Some("linear") => Activation::Linear,
                Some(other) => bail!("Unknown activation '{}' in layer '{}'", other, part),
            };
            Ok(LayerSpec::new(units, activation))
        })
        .collect()
}

/// Row for the predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Inventory")]
    inventory: String,
    #[tabled(rename = "Avg Sales")]
    average_sales: String,
    #[tabled(rename = "Lead Time")]
    lead_time: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
}

/// Show pipeline status
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: PipelineSnapshot = client.get("api/v1/status").await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            println!("{}", "Pipeline Status".bold());
            println!("  Status:   {}", color_status(&snapshot.status.to_string()));
            println!("  Message:  {}", snapshot.message);
            println!("  Products: {}", snapshot.record_count);
            if snapshot.degraded {
                print_warning("Catalog is synthetic (degraded mode)");
            }
            print_classifier(snapshot.classifier.as_ref());
        }
    }

    Ok(())
}

fn print_classifier(classifier: Option<&ClassifierSummary>) {
    let Some(classifier) = classifier else {
        println!("  Model:    {}", "not trained".dimmed());
        return;
    };

    let state = serde_json::to_value(classifier.state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    println!(
        "  Model:    generation {} ({})",
        classifier.generation,
        color_status(&state)
    );
    if let Some(report) = &classifier.report {
        println!(
            "  Trained:  {} rows, {} epochs, loss {:.4}, accuracy {}",
            report.rows,
            report.epochs,
            report.final_loss,
            format_percent(report.training_accuracy)
        );
        if let Some(at) = chrono::DateTime::from_timestamp(report.trained_at, 0) {
            println!("  At:       {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    if let Some(failure) = &classifier.failure {
        println!("  Failure:  {}", failure.red());
    }
}

/// Load the product catalog
pub async fn load_catalog(client: &ApiClient, format: OutputFormat) -> Result<()> {
    print_info("Loading products...");
    let outcome: LoadOutcome = client
        .post("api/v1/catalog/load", &serde_json::json!({}))
        .await?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => match &outcome {
            LoadOutcome::Live { .. } => print_success(&outcome.message()),
            LoadOutcome::Degraded { .. } => print_warning(&outcome.message()),
        },
    }

    Ok(())
}

/// Train the reorder classifier
pub async fn train(client: &ApiClient, args: &TrainArgs, format: OutputFormat) -> Result<()> {
    let config = args.to_config()?;
    print_info("Training model, please wait...");
    let summary: ClassifierSummary = client.post("api/v1/train", &config).await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success("Model trained!");
            print_classifier(Some(&summary));
        }
    }

    Ok(())
}

/// Show per-product predictions
pub async fn show_predictions(
    client: &ApiClient,
    reorder_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let list: CatalogPredictions = client.get("api/v1/predictions").await?;

    let predictions: Vec<_> = list
        .predictions
        .into_iter()
        .filter(|p| !reorder_only || p.decision == Some(ReorderDecision::Reorder))
        .collect();

    match format {
        OutputFormat::Json => print_json(&predictions)?,
        OutputFormat::Table => {
            if predictions.is_empty() {
                print_warning("No products found");
                return Ok(());
            }
            if list.generation.is_none() {
                print_warning("No trained model; run `forecast train` first");
            }

            let rows: Vec<PredictionRow> = predictions
                .iter()
                .map(|p| PredictionRow {
                    id: p.id.to_string(),
                    name: p.name.clone(),
                    inventory: format_quantity(p.inventory_level),
                    average_sales: format_quantity(p.average_sales),
                    lead_time: format_quantity(p.lead_time_days),
                    prediction: color_decision(p.probability),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            let reorders = predictions
                .iter()
                .filter(|p| p.decision == Some(ReorderDecision::Reorder))
                .count();
            println!("\nTotal: {} products, {} to reorder", predictions.len(), reorders);
        }
    }

    Ok(())
}
