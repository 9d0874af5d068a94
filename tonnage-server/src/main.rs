use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use tonnage_pipeline::calibration::CalibrationStatus;
use tonnage_pipeline::components::csv_movement_source::CsvMovementSource;
use tonnage_pipeline::components::json_file_sink::JsonFileSink;
use tonnage_pipeline::components::logging_sink::LoggingSink;
use tonnage_pipeline::loader::{load_reference_file, read_to_string};
use tonnage_pipeline::sink::{publish_all, ResultSink, SinkInput};
use tonnage_pipeline::source::MovementSource;
use tonnage_pipeline::{
    aggregate, CalibrationEngine, CalibrationPlan, CancelToken, FilterPolicy, Grouping,
    MovementBatch, PeriodGranularity, StoppingRule,
};
use tonnage_rules::{Classification, Classifier, ProductDescriptor, RuleCatalog};

mod render;

/// Exit code for a calibration that finished without an accepted candidate.
const EXIT_NOT_ACCEPTED: u8 = 2;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "tonnage",
    version,
    about = "Infer shipped tonnage from sales movements and calibrate weight rules"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every product seen in a movements file.
    Classify(ClassifyArgs),
    /// Aggregate movements into period buckets under one rule set and policy.
    Aggregate(AggregateArgs),
    /// Search rule-set and policy candidates against audited targets.
    Calibrate(CalibrateArgs),
}

#[derive(Args)]
struct RuleArgs {
    /// Rule catalog (TOML).
    #[arg(long, env = "TONNAGE_RULES")]
    rules: PathBuf,
    /// Rule set to use instead of the catalog's active one.
    #[arg(long)]
    rule_set: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Print JSON instead of tables.
    #[arg(long)]
    json: bool,
    /// Also write the JSON result to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ClassifyArgs {
    #[command(flatten)]
    rules: RuleArgs,
    /// Movements CSV whose products are classified.
    #[arg(long)]
    movements: PathBuf,
    /// Only list products no weight rule matches.
    #[arg(long)]
    unclassified_only: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AggregateArgs {
    #[command(flatten)]
    rules: RuleArgs,
    /// Movements CSV.
    #[arg(long)]
    movements: PathBuf,
    /// Preset (sales-only, netted-sales, never-returned-sales) or a policy TOML file.
    #[arg(long, default_value = "sales-only")]
    policy: String,
    /// Override the policy's period granularity.
    #[arg(long, value_enum)]
    granularity: Option<Granularity>,
    /// Split buckets by agent.
    #[arg(long)]
    by_agent: bool,
    /// Split buckets by product category.
    #[arg(long)]
    by_category: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct CalibrateArgs {
    /// Rule catalog (TOML).
    #[arg(long, env = "TONNAGE_RULES")]
    rules: PathBuf,
    /// Movements CSV.
    #[arg(long)]
    movements: PathBuf,
    /// Reference targets CSV (period, expected_total_mass).
    #[arg(long)]
    targets: PathBuf,
    /// Calibration plan (TOML). Without one, the active rule set is tried
    /// under each preset policy.
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Override the plan's acceptance threshold (percent).
    #[arg(long)]
    threshold: Option<f64>,
    /// Evaluate every candidate instead of stopping at the first accepted one.
    #[arg(long)]
    exhaustive: bool,
    /// Evaluate candidates on all cores.
    #[arg(long)]
    parallel: bool,
    /// Number of candidates listed in the ranking.
    #[arg(long, default_value_t = 10)]
    top: usize,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Clone, Copy, ValueEnum)]
enum Granularity {
    Day,
    Month,
    Year,
    MonthOfYear,
}

impl From<Granularity> for PeriodGranularity {
    fn from(value: Granularity) -> Self {
        match value {
            Granularity::Day => PeriodGranularity::Day,
            Granularity::Month => PeriodGranularity::Month,
            Granularity::Year => PeriodGranularity::Year,
            Granularity::MonthOfYear => PeriodGranularity::MonthOfYear,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn load_catalog(path: &Path) -> Result<RuleCatalog> {
    let text = read_to_string(path)?;
    RuleCatalog::from_toml_str(&text)
        .with_context(|| format!("invalid rule catalog {}", path.display()))
}

fn classifier_for(catalog: &RuleCatalog, rule_set: Option<&str>) -> Result<Classifier> {
    let classifier = match rule_set {
        Some(id) => catalog.classifier(id)?,
        None => catalog.active_classifier()?,
    };
    info!(
        "rule_set={} version={} weight_rules={}",
        classifier.rule_set_id(),
        classifier.version(),
        classifier.weight_rule_count()
    );
    Ok(classifier)
}

async fn load_batch(path: &Path) -> Result<MovementBatch> {
    CsvMovementSource::new(path)
        .fetch()
        .await
        .with_context(|| format!("failed to load movements from {}", path.display()))
}

fn resolve_policy(name_or_path: &str) -> Result<FilterPolicy> {
    match name_or_path {
        "sales-only" => Ok(FilterPolicy::sales_only()),
        "netted-sales" => Ok(FilterPolicy::netted_sales()),
        "never-returned-sales" => Ok(FilterPolicy::never_returned_sales()),
        path => {
            let text = read_to_string(path)?;
            toml::from_str(&text).with_context(|| format!("invalid policy file {path}"))
        }
    }
}

fn run_id(command: &str) -> String {
    format!("{command}-{}", Utc::now().format("%Y%m%dT%H%M%S"))
}

/// Publish to the log and, when asked, a JSON file. A failed file write
/// fails the command.
async fn publish<R>(run_id: String, result: R, out: Option<&Path>) -> Result<()>
where
    R: Serialize + Send + Sync + 'static,
    LoggingSink: ResultSink<R>,
{
    let mut sinks: Vec<Box<dyn ResultSink<R>>> = vec![Box::new(LoggingSink)];
    if let Some(path) = out {
        sinks.push(Box::new(JsonFileSink::new(path)));
    }
    match publish_all(&sinks, SinkInput::new(run_id, result)).await.pop() {
        Some((sink, error)) => Err(anyhow!(error).context(format!("sink {sink} failed"))),
        None => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ClassifiedProduct<'a> {
    product_code: &'a str,
    product_name: &'a str,
    classification: &'a Classification,
}

#[derive(Serialize)]
struct ClassifyJson<'a> {
    generated_at: String,
    rule_set_id: &'a str,
    rule_set_version: u32,
    products: Vec<ClassifiedProduct<'a>>,
}

async fn classify(args: ClassifyArgs) -> Result<ExitCode> {
    let catalog = load_catalog(&args.rules.rules)?;
    let classifier = classifier_for(&catalog, args.rules.rule_set.as_deref())?;
    let batch = load_batch(&args.movements).await?;

    let mut products: Vec<ProductDescriptor> = batch.products.iter().cloned().collect();
    products.sort_by(|a, b| a.code.cmp(&b.code));
    let classifications = classifier.classify_batch(&products);

    let rows: Vec<(&ProductDescriptor, Classification)> = products
        .iter()
        .zip(classifications)
        .filter(|(_, c)| !args.unclassified_only || !c.is_classified())
        .collect();

    if args.json {
        print_json(&ClassifyJson {
            generated_at: Utc::now().to_rfc3339(),
            rule_set_id: classifier.rule_set_id(),
            rule_set_version: classifier.version(),
            products: rows
                .iter()
                .map(|(p, c)| ClassifiedProduct {
                    product_code: &p.code,
                    product_name: &p.name,
                    classification: c,
                })
                .collect(),
        })?;
    } else {
        render::print_classifications(classifier.rule_set_id(), &rows, products.len());
    }
    Ok(ExitCode::SUCCESS)
}

async fn aggregate_command(args: AggregateArgs) -> Result<ExitCode> {
    let catalog = load_catalog(&args.rules.rules)?;
    let classifier = classifier_for(&catalog, args.rules.rule_set.as_deref())?;
    let batch = load_batch(&args.movements).await?;

    let mut policy = resolve_policy(&args.policy)?;
    policy.grouping = Grouping {
        granularity: args
            .granularity
            .map_or(policy.grouping.granularity, Into::into),
        by_agent: policy.grouping.by_agent || args.by_agent,
        by_category: policy.grouping.by_category || args.by_category,
    };

    let started = Instant::now();
    let report = aggregate(&batch.movements, &batch.products, &classifier, &policy)
        .with_context(|| format!("aggregation under policy '{}' failed", policy.name))?;
    let elapsed_ms = started.elapsed().as_millis();

    if args.output.json {
        print_json(&report)?;
    } else {
        render::print_aggregation(&report, &batch, elapsed_ms);
    }
    publish(run_id("aggregate"), report, args.output.out.as_deref()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn calibrate(args: CalibrateArgs) -> Result<ExitCode> {
    let catalog = load_catalog(&args.rules)?;
    let batch = load_batch(&args.movements).await?;
    let reference = load_reference_file(&args.targets)
        .with_context(|| format!("failed to load targets from {}", args.targets.display()))?;

    let mut plan = match &args.plan {
        Some(path) => {
            let text = read_to_string(path)?;
            CalibrationPlan::from_toml_str(&text)
                .with_context(|| format!("invalid calibration plan {}", path.display()))?
        }
        None => CalibrationPlan {
            policies: vec![
                FilterPolicy::sales_only(),
                FilterPolicy::netted_sales(),
                FilterPolicy::never_returned_sales(),
            ],
            ..CalibrationPlan::default()
        },
    };
    if let Some(threshold) = args.threshold {
        plan.threshold = threshold;
    }
    if args.exhaustive {
        plan.stopping = StoppingRule::Exhaustive;
    }
    plan.parallel |= args.parallel;

    let candidates = plan.candidates(&catalog)?;
    let config = plan.config();

    let cancel = CancelToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current candidate");
            watcher.cancel();
        }
    });

    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        CalibrationEngine::new(&batch.products, config)
            .with_cancel_token(cancel)
            .run(&candidates, &batch.movements, &reference)
    })
    .await
    .context("calibration task aborted")??;
    let elapsed_ms = started.elapsed().as_millis();

    if args.output.json {
        print_json(&result)?;
    } else {
        render::print_calibration(&result, args.top, elapsed_ms);
    }

    let accepted = result.status == CalibrationStatus::Accepted;
    publish(run_id("calibrate"), result, args.output.out.as_deref()).await?;
    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NOT_ACCEPTED)
    })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Classify(args) => classify(args).await,
        Command::Aggregate(args) => aggregate_command(args).await,
        Command::Calibrate(args) => calibrate(args).await,
    }
}
