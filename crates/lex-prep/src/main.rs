//! CLI entry point for dataset preprocessing and column analysis.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use lex_prep::profiler::DataProfiler;
use lex_prep::store::{read_csv, write_csv};
use lex_prep::utils::format_optional;
use lex_prep::{
    AnalysisEngine, AnalysisRequest, AnalysisResult, ChartSpec, ColumnClassifier, ColumnTyping,
    DatasetInsights, DatasetPreview, EngineConfig, EngineError, MissingValueMethod, PlotType,
    PreprocessReport, PreprocessingActions, PreprocessingPipeline,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CLI-compatible plot type enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPlotType {
    /// Equal-width histogram (numeric columns)
    Histogram,
    /// Five-number summary with outliers (numeric columns)
    Boxplot,
    /// Category frequencies (categorical columns)
    Count,
}

impl From<CliPlotType> for PlotType {
    fn from(cli: CliPlotType) -> Self {
        match cli {
            CliPlotType::Histogram => PlotType::Histogram,
            CliPlotType::Boxplot => PlotType::Boxplot,
            CliPlotType::Count => PlotType::Count,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Dataset preprocessing and column analysis",
    long_about = "Clean a CSV dataset with per-column rules and describe single columns.\n\n\
                  EXAMPLES:\n  \
                  # Column types, missing values and a preview\n  \
                  lex-prep inspect data.csv\n\n  \
                  # Fill, remove outliers, normalize\n  \
                  lex-prep preprocess data.csv --mean age --mode city --outliers income --normalize age\n\n  \
                  # Statistics and a chart specification as JSON\n  \
                  lex-prep --json analyze data.csv --column income --plot boxplot"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long, global = true)]
    json: bool,

    /// JSON file with engine settings (histogram_bins, iqr_multiplier, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show column types, missing values and the first rows
    Inspect {
        /// Path to the CSV file
        input: PathBuf,
    },

    /// Apply cleaning actions and write the cleaned dataset
    Preprocess(PreprocessArgs),

    /// Compute statistics and a chart specification for one column
    Analyze {
        /// Path to the CSV file
        input: PathBuf,

        /// Column to analyze
        #[arg(short, long)]
        column: String,

        /// Chart kind
        #[arg(short, long, value_enum, default_value = "histogram")]
        plot: CliPlotType,
    },
}

#[derive(ClapArgs, Debug)]
struct PreprocessArgs {
    /// Path to the CSV file
    input: PathBuf,

    /// Fill missing cells with the column mean
    #[arg(long, value_name = "COLUMN")]
    mean: Vec<String>,

    /// Fill missing cells with the column median
    #[arg(long, value_name = "COLUMN")]
    median: Vec<String>,

    /// Fill missing cells with the most frequent value
    #[arg(long, value_name = "COLUMN")]
    mode: Vec<String>,

    /// Drop rows where the column is missing
    #[arg(long, value_name = "COLUMN")]
    remove: Vec<String>,

    /// Drop rows outside the column's IQR fences
    #[arg(long, value_name = "COLUMN")]
    outliers: Vec<String>,

    /// Min-max scale the column to [0, 1]
    #[arg(long, value_name = "COLUMN")]
    normalize: Vec<String>,

    /// JSON file with the full action set, merged with the flags above
    #[arg(long)]
    actions: Option<PathBuf>,

    /// Output CSV path
    ///
    /// If not specified, writes cleaned_<input name> next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl PreprocessArgs {
    fn to_actions(&self) -> Result<PreprocessingActions> {
        let mut actions = match &self.actions {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<PreprocessingActions>(&content)
                    .with_context(|| format!("Invalid action file {}", path.display()))?
            }
            None => PreprocessingActions::new(),
        };

        let flags = [
            (MissingValueMethod::Mean, &self.mean),
            (MissingValueMethod::Median, &self.median),
            (MissingValueMethod::Mode, &self.mode),
            (MissingValueMethod::Remove, &self.remove),
        ];
        for (method, columns) in flags {
            for column in columns {
                if let Some(previous) = actions.missing_values.insert(column.clone(), method)
                    && previous != method
                {
                    bail!(
                        "Column '{}' has two missing-value methods: {} and {}",
                        column,
                        previous,
                        method
                    );
                }
            }
        }
        actions.outliers.extend(self.outliers.iter().cloned());
        actions.normalize.extend(self.normalize.iter().cloned());

        Ok(actions)
    }

    fn output_path(&self) -> Result<PathBuf> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let name = self
            .input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Cannot derive an output name from {}", self.input.display()))?;
        Ok(self.input.with_file_name(format!("cleaned_{}", name)))
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config.validate()?;
    debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}

fn load_dataset(path: &Path) -> Result<DataFrame> {
    info!("Loading dataset from: {}", path.display());
    let df = read_csv(path)?;
    info!("Dataset loaded: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet, cli.json);

    if let Err(err) = run(&cli) {
        if cli.json {
            let payload = match err.downcast_ref::<EngineError>() {
                Some(engine_err) => serde_json::json!({ "error": engine_err }),
                None => serde_json::json!({
                    "error": { "code": "CLI_ERROR", "message": format!("{:#}", err) }
                }),
            };
            println!("{}", payload);
        } else {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Inspect { input } => run_inspect(cli, &config, input),
        Command::Preprocess(args) => run_preprocess(cli, &config, args),
        Command::Analyze {
            input,
            column,
            plot,
        } => run_analyze(cli, &config, input, column, (*plot).into()),
    }
}

fn run_inspect(cli: &Cli, config: &EngineConfig, input: &Path) -> Result<()> {
    let df = load_dataset(input)?;
    let columns = ColumnClassifier::classify(&df);
    let insights = DataProfiler::insights(&df)?;
    let preview = DataProfiler::preview(&df, config.preview_rows)?;

    if cli.json {
        #[derive(Serialize)]
        struct InspectOutput<'a> {
            input: String,
            columns: &'a ColumnTyping,
            insights: &'a DatasetInsights,
            preview: &'a DatasetPreview,
        }
        let output = InspectOutput {
            input: input.display().to_string(),
            columns: &columns,
            insights: &insights,
            preview: &preview,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("{}", "=".repeat(80));
    println!("DATASET: {}", input.display());
    println!("{}", "=".repeat(80));
    println!("Shape: {} rows x {} columns", insights.rows, insights.columns);
    println!();
    println!("Columns:");
    for name in &columns.all {
        let kind = columns
            .kind_of(name)
            .map(|k| k.to_string())
            .unwrap_or_default();
        let dtype = insights.column_dtypes.get(name).map(String::as_str).unwrap_or("");
        let missing = insights.missing_values.get(name).copied().unwrap_or(0);
        println!(
            "  {:<30} {:<12} {:<10} missing: {}",
            truncate_str(name, 30),
            kind,
            dtype,
            missing
        );
    }
    if !insights.describe.is_empty() {
        println!();
        println!("Numeric summary:");
        println!(
            "  {:<20} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        let precision = config.stat_precision;
        for (name, d) in &insights.describe {
            let values = [d.mean, d.std, d.min, d.q1, d.median, d.q3, d.max]
                .map(|v| format!("{:>12}", format_optional(v, precision)));
            println!(
                "  {:<20} {:>8} {}",
                truncate_str(name, 20),
                d.count,
                values.join(" ")
            );
        }
    }
    println!();
    print_preview(&preview);
    Ok(())
}

fn run_preprocess(cli: &Cli, config: &EngineConfig, args: &PreprocessArgs) -> Result<()> {
    let actions = args.to_actions()?;
    let df = load_dataset(&args.input)?;

    let pipeline = PreprocessingPipeline::new(config.clone());
    let (cleaned, report) = pipeline.apply(&df, &actions)?;

    let output_path = args.output_path()?;
    write_csv(&cleaned, &output_path)?;
    info!("Cleaned dataset written to {}", output_path.display());

    let preview = DataProfiler::preview(&cleaned, config.preview_rows)?;

    if cli.json {
        #[derive(Serialize)]
        struct PreprocessOutput<'a> {
            output: String,
            columns: ColumnTyping,
            report: &'a PreprocessReport,
            preview: &'a DatasetPreview,
        }
        let output = PreprocessOutput {
            output: output_path.display().to_string(),
            columns: ColumnClassifier::classify(&cleaned),
            report: &report,
            preview: &preview,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_preprocess_summary(&report, &output_path);
    print_preview(&preview);
    Ok(())
}

fn run_analyze(
    cli: &Cli,
    config: &EngineConfig,
    input: &Path,
    column: &str,
    plot_type: PlotType,
) -> Result<()> {
    let df = load_dataset(input)?;
    let engine = AnalysisEngine::new(config.clone());
    let result = engine.analyze(&df, &AnalysisRequest::new(column, plot_type))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_analysis(&result);
    Ok(())
}

/// Note: printing uses `println!` intentionally, this is the command's output
/// and must show regardless of log level.
fn print_preprocess_summary(report: &PreprocessReport, output_path: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!("Output: {}", output_path.display());
    println!(
        "Rows: {} -> {} ({} removed, {:.1}%)",
        report.rows_before,
        report.rows_after,
        report.rows_removed,
        report.rows_removed_percentage()
    );
    println!("Cells filled: {}", report.cells_filled);
    println!("Columns normalized: {}", report.columns_normalized);
    println!();

    println!("Log:");
    for entry in &report.log {
        println!("  - {}", entry);
    }
    println!();

    if !report.skipped.is_empty() {
        println!("Skipped:");
        for skip in &report.skipped {
            println!("  ! {} on '{}' [{}]: {}", skip.action, skip.column, skip.code, skip.reason);
        }
        println!();
    }
}

fn print_analysis(result: &AnalysisResult) {
    println!();
    println!("{}", "=".repeat(80));
    println!("{}", result.chart.title().to_uppercase());
    println!("{}", "=".repeat(80));
    println!("Column: {} ({})", result.column, result.kind);
    println!();

    let width = result.stats.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &result.stats {
        println!("  {:<width$}  {}", name, value, width = width);
    }
    println!();

    match &result.chart {
        ChartSpec::Histogram { bins, .. } => {
            println!("Bins:");
            for bin in bins {
                println!("  [{:>12.4}, {:>12.4}]  {}", bin.start, bin.end, bin.count);
            }
        }
        ChartSpec::BoxPlot {
            summary, outliers, ..
        } => match summary {
            Some(s) => {
                println!(
                    "  min {:.4} | q1 {:.4} | median {:.4} | q3 {:.4} | max {:.4}",
                    s.min, s.q1, s.median, s.q3, s.max
                );
                println!("  fences [{:.4}, {:.4}]", s.lower_fence, s.upper_fence);
                println!("  outliers: {}", outliers.len());
            }
            None => println!("  no values"),
        },
        ChartSpec::Count {
            categories,
            total_categories,
            ..
        } => {
            for category in categories {
                println!(
                    "  {:<30} {:>8} ({:.1}%)",
                    truncate_str(&category.value, 30),
                    category.count,
                    category.percentage
                );
            }
            if *total_categories > categories.len() {
                println!(
                    "  ... and {} more categories",
                    total_categories - categories.len()
                );
            }
        }
    }
    println!();
}

fn print_preview(preview: &DatasetPreview) {
    println!("Preview ({} of {} rows):", preview.rows.len(), preview.total_rows);
    let header: Vec<String> = preview.columns.iter().map(|c| truncate_str(c, 14)).collect();
    println!("  {}", header.iter().map(|h| format!("{:<14}", h)).collect::<Vec<_>>().join(" "));
    for row in &preview.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| format!("{:<14}", truncate_str(cell.as_deref().unwrap_or("null"), 14)))
            .collect();
        println!("  {}", cells.join(" "));
    }
    println!();
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
