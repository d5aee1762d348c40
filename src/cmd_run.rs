//! `run` command: drive one pipeline run and export its records.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pagecase_config::{Config, ConfigError, ConfigValidator};
use pagecase_export_json::JsonExportSink;
use pagecase_page_http::HttpPageSource;
use pagecase_protocols::{ExportRecords, ExportSink, PipelineRun, RunRequest, ScriptStatus};
use pagecase_provider_openai::OpenAIGenerator;
use pagecase_runtime::Pipeline;

use crate::adapters::{pipeline_config, resolve_api_key, ConsoleProgress, API_KEY_ENV};
use crate::cli::RunArgs;

/// Run the pipeline for `args.url`, export the records, print a summary.
pub(crate) async fn run(config: Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_overrides(config, &args)?;
    let request = RunRequest::new(args.url, args.count)?;

    let api_key = resolve_api_key(&config).ok_or_else(|| {
        format!("No API key configured: set provider.api_key or {}", API_KEY_ENV)
    })?;
    let generator = OpenAIGenerator::with_url(
        api_key,
        config.provider.base_url.as_str(),
        Duration::from_secs(config.provider.request_timeout_seconds),
    )?;
    let source = HttpPageSource::new(
        Duration::from_secs(config.fetch.timeout_seconds),
        &config.fetch.user_agent,
    )?
    .with_load_wait(Duration::from_millis(config.fetch.load_wait_ms));

    let pipeline = Pipeline::new(
        Arc::new(source),
        Arc::new(generator),
        pipeline_config(&config.generation, &config.provider.model),
    )
    .with_progress(Arc::new(ConsoleProgress));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            interrupt.cancel();
        }
    });

    println!("Generating {} test cases for {}", request.desired_count(), request.url());
    let run = pipeline.run_with_cancel(request, cancel).await;

    let sink = JsonExportSink::new(&config.export.output_dir);
    match sink.write(&ExportRecords::from(&run)) {
        Ok(dir) => info!("Records exported to {:?}", dir),
        Err(e) => error!("Export failed: {}", e),
    }

    print_summary(&run);

    match run.failure {
        Some(failure) => Err(format!("Run failed at {}: {}", failure.stage, failure.reason).into()),
        None => Ok(()),
    }
}

/// Apply command-line overrides, then validate the result so overridden
/// values obey the same bounds as configured ones.
fn apply_overrides(mut config: Config, args: &RunArgs) -> Result<Config, ConfigError> {
    if let Some(model) = &args.model {
        config.provider.model = model.clone();
    }
    if let Some(output) = &args.output {
        config.export.output_dir = output.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.generation.script_concurrency = concurrency;
    }

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    Ok(config)
}

fn print_summary(run: &PipelineRun) {
    if run.test_cases.is_empty() {
        println!("\nNo test cases generated.");
        return;
    }

    println!();
    println!("{:<4} {:<50} {:<6} {}", "ID", "TITLE", "STEPS", "SCRIPT");
    println!("{}", "-".repeat(80));
    for case in &run.test_cases {
        let status = run
            .scripts
            .iter()
            .find(|s| s.test_case_id == case.id)
            .map(|s| match s.status {
                ScriptStatus::Ok => "ok",
                ScriptStatus::GenerationFailed => "failed",
            })
            .unwrap_or("-");
        println!(
            "{:<4} {:<50} {:<6} {}",
            case.id,
            truncate(&case.title, 50),
            case.steps.len(),
            status
        );
    }
    println!(
        "\n{} elements, {} test cases, {}/{} scripts generated",
        run.elements.len(),
        run.test_cases.len(),
        run.scripts_ok(),
        run.test_cases.len()
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
