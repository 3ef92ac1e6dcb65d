use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use failsight::{AnalysisConfig, AnalysisEngine, JsonlLogSource};

#[derive(Parser)]
#[command(name = "failsight")]
#[command(about = "Test failure similarity search and pattern analysis")]
struct Args {
    /// Path to the JSONL test-events log
    #[arg(short, long, default_value = "target/analytics-logs/test-events.jsonl")]
    log: PathBuf,

    /// Emit machine-readable JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Index the log and print summary plus per-failure analysis
    Analyze,
    /// Find past failures similar to a query
    Search {
        /// Free-text failure description or error message
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Print corpus-wide failure statistics
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = AnalysisConfig::from_env()?;

    info!(log = %args.log.display(), "failsight starting");

    let source = Arc::new(JsonlLogSource::new(&args.log));
    let engine = AnalysisEngine::from_config(config, source.clone());
    info!(
        collection = %engine.config().collection_name,
        top_k = engine.config().top_k,
        threshold = engine.config().similarity_threshold,
        "engine ready"
    );

    match args.command.unwrap_or(Command::Analyze) {
        Command::Analyze => run_analyze(&engine, &source, args.json).await?,
        Command::Search { query, top_k } => run_search(&engine, &query, top_k, args.json).await?,
        Command::Summary => run_summary(&engine, args.json).await?,
    }

    Ok(())
}

async fn run_analyze(
    engine: &AnalysisEngine,
    source: &Arc<JsonlLogSource>,
    json: bool,
) -> Result<()> {
    use failsight::EventSource;

    let stats = engine.load_and_index().await?;
    let summary = engine.summary().await?;

    let failures: Vec<_> = source
        .events()?
        .into_iter()
        .filter(|e| e.is_failure())
        .collect();

    let mut reports = Vec::with_capacity(failures.len());
    for failure in &failures {
        reports.push(engine.analyze(failure).await?);
    }

    if json {
        let out = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "stats": stats,
            "summary": summary,
            "reports": reports,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Index statistics:");
    println!("  Total events:     {}", stats.total_events);
    println!("  Tests passed:     {}", stats.passed);
    println!("  Failures indexed: {}", stats.failures_indexed);
    if stats.index_errors > 0 {
        println!("  Index errors:     {}", stats.index_errors);
    }

    println!("\nFailure summary:");
    println!("  Total tests:    {}", summary.total_tests);
    println!("  Total failures: {}", summary.total_failures);
    println!("  Failure rate:   {:.1}%", summary.failure_rate);

    if !summary.failures_by_test.is_empty() {
        println!("\nFailures by test:");
        for (test, count) in &summary.failures_by_test {
            println!("  - {test}: {count}");
        }
    }

    for report in &reports {
        println!("\n{}", "-".repeat(50));
        println!("Test:  {}", report.test_name);
        println!("Class: {}", report.class_name);
        println!("Error: {}", report.error_message);
        println!("Recommendation: {}", report.recommendation);
        if !report.similar_failures.is_empty() {
            println!("Similar failures: {}", report.similar_failures.len());
        }
    }

    Ok(())
}

async fn run_search(
    engine: &AnalysisEngine,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let results = engine.find_similar(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No similar failures found.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            result.score,
            result.test_name,
            result.class_name
        );
        println!("   {}", result.message);
    }

    Ok(())
}

async fn run_summary(engine: &AnalysisEngine, json: bool) -> Result<()> {
    let summary = engine.summary().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Total tests:    {}", summary.total_tests);
    println!("Total failures: {}", summary.total_failures);
    println!("Failure rate:   {:.1}%", summary.failure_rate);
    println!(
        "Index: {} ({} entries)",
        summary.index.name, summary.index.points_count
    );

    if !summary.failures_by_class.is_empty() {
        println!("\nFailures by class:");
        for (class, count) in &summary.failures_by_class {
            println!("  - {class}: {count}");
        }
    }

    Ok(())
}
