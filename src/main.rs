use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

mod aggregate;
mod config;
mod db;
mod eligibility;
mod error;
mod logging;
mod models;
mod pipeline;
mod publish;
mod report;
mod standardize;
mod trajectory;
mod window;

use db::Source;
use pipeline::{Pipeline, PipelineConfig, RunOutcome};
use publish::{CsvWorkbook, MarkdownReport, PublishSink};

#[derive(Parser)]
#[command(name = "growth-trajectory")]
#[command(about = "Ranks clients by z-scored lead growth over trailing intervals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read activity from a CSV snapshot instead of the warehouse
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Anchor date (YYYY-MM-DD); defaults to the latest date in the data
    #[arg(long)]
    anchor: Option<NaiveDate>,
}

impl SourceArgs {
    fn source(&self) -> anyhow::Result<Source> {
        match &self.csv {
            Some(path) => Ok(Source::Csv(path.clone())),
            None => Ok(Source::Warehouse {
                database_url: config::database_url()?,
            }),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every interval and publish one sheet per interval
    Publish {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_delimiter = ',', default_value = config::DEFAULT_INTERVALS)]
        intervals: Vec<i64>,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Output directory for CSV sheets, or the markdown file
        #[arg(long, default_value = "growth-report")]
        out: PathBuf,
        /// JSON object of manager name to picture URL
        #[arg(long)]
        manager_images: Option<PathBuf>,
    },
    /// Print the top clients for a single interval
    Score {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 30)]
        interval: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Snapshot warehouse activity to a CSV file
    Export {
        #[arg(long, default_value = "activity.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Publish {
            source,
            intervals,
            format,
            out,
            manager_images,
        } => {
            let config = PipelineConfig::new(intervals, source.anchor)?;
            let images = config::load_manager_images(manager_images.as_deref())?;
            let records = source.source()?.load().await?;
            let pipeline = Pipeline::new(&records, config, today);

            let (outcomes, finished) = match format {
                Format::Csv => {
                    let mut workbook = CsvWorkbook::new(&out, images)?;
                    (publish_intervals(&pipeline, &mut workbook, today), Ok(()))
                }
                Format::Markdown => {
                    let mut report = MarkdownReport::new(&out, images);
                    let outcomes = publish_intervals(&pipeline, &mut report, today);
                    let finished = report.finish(today).map(|_| ());
                    (outcomes, finished)
                }
            };

            for line in summary_lines(&outcomes) {
                println!("{line}");
            }
            conclude(&outcomes, finished)?;
            println!("Published {} interval(s) to {}.", outcomes.len(), out.display());
        }
        Commands::Score {
            source,
            interval,
            limit,
        } => {
            let config = PipelineConfig::new(vec![interval], source.anchor)?;
            let records = source.source()?.load().await?;
            let pipeline = Pipeline::new(&records, config, today);
            let run = pipeline.run(interval)?;

            if run.rows.is_empty() {
                println!("No clients with enough history for a {interval} day interval.");
                return Ok(());
            }

            println!(
                "Top clients by {interval} day growth (anchored on {}):",
                run.anchor
            );
            for row in run.rows.iter().take(limit) {
                println!(
                    "- {} ({}) leads {} vs {} change {} z {}",
                    row.client_name,
                    row.manager_name,
                    row.current.unique_goals,
                    row.previous.unique_goals,
                    row.ratio
                        .map(publish::format_percent)
                        .unwrap_or_else(|| "n/a".to_string()),
                    row.z_score
                        .map(|z| format!("{z:.2}"))
                        .unwrap_or_else(|| "n/a".to_string()),
                );
            }
        }
        Commands::Export { out } => {
            let source = Source::Warehouse {
                database_url: config::database_url()?,
            };
            let records = source.load().await?;
            let written = db::write_csv(&out, &records)
                .with_context(|| format!("failed to export to {}", out.display()))?;
            println!("Exported {written} activity rows to {}.", out.display());
        }
    }

    Ok(())
}

fn publish_intervals(
    pipeline: &Pipeline<'_>,
    sink: &mut dyn PublishSink,
    as_of: NaiveDate,
) -> Vec<RunOutcome> {
    info!(anchor = %pipeline.anchor(), "publishing intervals");
    pipeline.publish_all(sink, as_of)
}

fn summary_lines(outcomes: &[RunOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(rows) => format!(
                "- sheet {}: {} day interval, {} rows",
                outcome.ordinal, outcome.interval_days, rows
            ),
            Err(err) => {
                error!(run_id = %outcome.run_id, error = ?err, "interval run failed");
                format!(
                    "- sheet {}: {} day interval FAILED: {}",
                    outcome.ordinal, outcome.interval_days, err
                )
            }
        })
        .collect()
}

/// Fails when any run failed or the destination could not be finalized.
fn conclude(outcomes: &[RunOutcome], finished: anyhow::Result<()>) -> anyhow::Result<()> {
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    match (failed, finished) {
        (0, finished) => finished,
        (failed, Ok(())) => {
            anyhow::bail!("{failed} of {} interval run(s) failed", outcomes.len())
        }
        (failed, Err(err)) => Err(err.context(format!(
            "{failed} of {} interval run(s) failed",
            outcomes.len()
        ))),
    }
}
