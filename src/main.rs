//! Gradebox - Command line entry point
//!
//! Grades one source file against one input/expected-output pair.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gradebox::constants::languages;
use gradebox::{Grader, GraderConfig, GradingResult, Language, SubmissionRequest};

#[derive(Debug, Parser)]
#[command(
    name = "gradebox",
    version,
    about = "Compile, run and judge a single C/C++ submission"
)]
struct Cli {
    /// Source file to grade
    source: PathBuf,

    /// Language variant (c or cpp); guessed from the file extension if omitted
    #[arg(short, long)]
    lang: Option<String>,

    /// File whose contents are fed to the program on stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File holding the expected output
    #[arg(short, long)]
    expected: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = GraderConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let language = resolve_language(&cli)?;
    let source = tokio::fs::read_to_string(&cli.source)
        .await
        .with_context(|| format!("Failed to read source {}", cli.source.display()))?;
    let input = match &cli.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input {}", path.display()))?,
        None => String::new(),
    };
    let expected = tokio::fs::read_to_string(&cli.expected)
        .await
        .with_context(|| format!("Failed to read expected output {}", cli.expected.display()))?;

    tracing::debug!(
        time_limit_ms = config.execution.time_limit_ms,
        memory_limit_mb = config.execution.memory_limit_mb,
        "Limits loaded"
    );

    let grader = Grader::new(config);
    grader.compiler().check_environment(language)?;

    let request = SubmissionRequest::new(source, language, input, expected);
    let result = grader.grade(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

fn resolve_language(cli: &Cli) -> anyhow::Result<Language> {
    let raw = match &cli.lang {
        Some(lang) => lang.clone(),
        None => cli
            .source
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Language::parse(&raw).with_context(|| {
        format!(
            "Unsupported language: {:?} (expected one of {})",
            raw,
            languages::ALL.join(", ")
        )
    })
}

fn print_result(result: &GradingResult) {
    println!("Status: {}", result.status());
    if let Some(usage) = result.usage() {
        println!("Time:   {} ms", usage.wall_time_ms);
        println!("Memory: {} KB", usage.peak_memory_kb);
    }
    if let Some(output) = result.output() {
        println!("Output:\n{}", output);
    }
    if let Some(error) = result.error() {
        println!("Error:\n{}", error);
    }
}
