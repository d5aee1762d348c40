//! Pipeline orchestrator.
//!
//! Sequences extraction, test-case generation and per-case script
//! generation for one URL. Whole-run failures end in [`RunState::Failed`]
//! with the aborting stage recorded; script failures stay local to their
//! test case.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pagecase_protocols::error::{GenerationError, ParseError, PipelineError};
use pagecase_protocols::generator::TextGenerator;
use pagecase_protocols::page::PageSource;
use pagecase_protocols::sink::ProgressSink;
use pagecase_protocols::types::{
    PipelineRun, RunFailure, RunRequest, RunState, ScriptResult, Stage, TestCase,
};

use crate::extract::ElementExtractor;
use crate::parser::{parse_script, parse_test_cases};
use crate::prompt::{
    build_prompt, serialize_elements, Prompt, PromptContext, PromptStage, CASE_TEMPERATURE,
    SCRIPT_TEMPERATURE,
};
use crate::retry::{GenerationClient, RetryConfig, RetryNotice};

/// Diagnostic left in script slots a cancelled run never reached.
const CANCELLED_DIAGNOSTIC: &str = "Script generation cancelled";

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub retry: RetryConfig,
    /// Times the test-case stage is prompted when its reply cannot be parsed.
    pub case_stage_attempts: u32,
    /// Script generations in flight at once.
    pub script_concurrency: usize,
    /// Elements serialized into prompts.
    pub max_elements: usize,
    pub case_max_tokens: u32,
    pub script_max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            retry: RetryConfig::default(),
            case_stage_attempts: 2,
            script_concurrency: 1,
            max_elements: 100,
            case_max_tokens: 1500,
            script_max_tokens: 2000,
        }
    }
}

/// The generation pipeline.
pub struct Pipeline {
    source: Arc<dyn PageSource>,
    client: GenerationClient,
    config: PipelineConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

/// Outcome of one script item.
enum ItemOutcome {
    Finished {
        result: ScriptResult,
        retries: Vec<String>,
        entry: String,
    },
    Cancelled,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn PageSource>,
        generator: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Self {
        let client = GenerationClient::new(generator, config.model.clone())
            .with_retry(config.retry.clone())
            .with_max_tokens(PromptStage::TestCases, config.case_max_tokens)
            .with_max_tokens(PromptStage::Script, config.script_max_tokens);
        Self {
            source,
            client,
            config,
            progress: None,
        }
    }

    /// Forward run-log entries to a progress sink as they are produced.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, request: RunRequest) -> PipelineRun {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run the pipeline, abandoning it when `cancel` fires.
    ///
    /// Always returns a run: on failure it holds whatever completed before
    /// the aborting stage, with [`PipelineRun::failure`] naming that stage.
    pub async fn run_with_cancel(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> PipelineRun {
        let mut run = PipelineRun::new(request.url());
        info!(url = %request.url(), count = request.desired_count(), "Starting pipeline run");

        match self.drive(&request, &cancel, &mut run).await {
            Ok(()) => {
                run.state = RunState::Done;
                let entry = format!(
                    "done: {}/{} scripts generated",
                    run.scripts_ok(),
                    run.test_cases.len()
                );
                self.record(&mut run, entry);
            }
            Err((stage, error)) => {
                run.state = RunState::Failed;
                let reason = error.to_string();
                self.record(&mut run, format!("failed at {}: {}", stage, reason));
                run.failure = Some(RunFailure { stage, reason });
            }
        }

        run
    }

    async fn drive(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        run: &mut PipelineRun,
    ) -> Result<(), (Stage, PipelineError)> {
        run.state = RunState::Extracting;
        self.extract_stage(request.url(), cancel, run)
            .await
            .map_err(|e| (Stage::Extraction, e))?;

        let elements = serialize_elements(&run.elements, self.config.max_elements);

        run.state = RunState::GeneratingCases;
        self.case_stage(request, &elements, cancel, run)
            .await
            .map_err(|e| (Stage::TestCases, e))?;

        run.state = RunState::GeneratingScripts;
        self.script_stage(request.url(), &elements, cancel, run)
            .await
            .map_err(|e| (Stage::Scripts, e))
    }

    async fn extract_stage(
        &self,
        url: &str,
        cancel: &CancellationToken,
        run: &mut PipelineRun,
    ) -> Result<(), PipelineError> {
        check_cancelled(cancel)?;
        self.record(run, format!("extracting: {}", url));

        let markup = until_cancelled(cancel, self.source.fetch(url)).await??;
        run.elements = ElementExtractor::extract(url, &markup)?;
        self.record(run, format!("extracted {} elements", run.elements.len()));

        if run.elements.len() > self.config.max_elements {
            let entry = format!(
                "using the first {} of {} elements in prompts",
                self.config.max_elements,
                run.elements.len()
            );
            self.record(run, entry);
        }
        Ok(())
    }

    async fn case_stage(
        &self,
        request: &RunRequest,
        elements: &str,
        cancel: &CancellationToken,
        run: &mut PipelineRun,
    ) -> Result<(), PipelineError> {
        check_cancelled(cancel)?;
        let desired = request.desired_count();
        self.record(run, format!("generating test cases (requested {})", desired));

        let prompt = build_prompt(&PromptContext::TestCases {
            url: request.url(),
            elements,
            desired_count: desired,
        });
        let attempts = self.config.case_stage_attempts.max(1);
        let mut last_error = ParseError::NoArray;

        for attempt in 1..=attempts {
            let (reply, retries) =
                until_cancelled(cancel, self.invoke_logged(&prompt, CASE_TEMPERATURE)).await?;
            run.log.extend(retries);
            let raw = reply?;

            match parse_test_cases(&raw, desired) {
                Ok(parsed) => {
                    for skipped in &parsed.skipped {
                        self.record(run, format!("discarded {}", skipped));
                    }
                    let entry = format!(
                        "generated {} test cases ({} discarded)",
                        parsed.cases.len(),
                        parsed.skipped.len()
                    );
                    run.test_cases = parsed.cases;
                    self.record(run, entry);
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, raw_len = raw.len(), "Unusable test case reply");
                    if attempt < attempts {
                        self.record(
                            run,
                            format!(
                                "test case reply unusable ({}), re-prompting (attempt {}/{})",
                                e,
                                attempt + 1,
                                attempts
                            ),
                        );
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error.into())
    }

    async fn script_stage(
        &self,
        url: &str,
        elements: &str,
        cancel: &CancellationToken,
        run: &mut PipelineRun,
    ) -> Result<(), PipelineError> {
        let cases: Vec<TestCase> = run.test_cases.clone();
        let concurrency = self.config.script_concurrency.max(1);

        let mut outcomes = stream::iter(cases.iter())
            .map(|case| self.script_item(case, url, elements, cancel))
            .buffered(concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                ItemOutcome::Finished {
                    result,
                    retries,
                    entry,
                } => {
                    run.log.extend(retries);
                    run.scripts.push(result);
                    self.record(run, entry);
                }
                ItemOutcome::Cancelled => {
                    // Every test case keeps its slot, even on a cancelled run.
                    for case in &cases[run.scripts.len()..] {
                        run.scripts
                            .push(ScriptResult::failed(case.id, CANCELLED_DIAGNOSTIC));
                    }
                    return Err(PipelineError::Cancelled);
                }
            }
        }
        Ok(())
    }

    /// Generate the script for one test case. Never fails the run.
    async fn script_item(
        &self,
        case: &TestCase,
        url: &str,
        elements: &str,
        cancel: &CancellationToken,
    ) -> ItemOutcome {
        if cancel.is_cancelled() {
            return ItemOutcome::Cancelled;
        }

        let prompt = build_prompt(&PromptContext::Script {
            url,
            elements,
            test_case: case,
        });
        let Ok((reply, retries)) =
            until_cancelled(cancel, self.invoke_logged(&prompt, SCRIPT_TEMPERATURE)).await
        else {
            return ItemOutcome::Cancelled;
        };

        let outcome = reply
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_script(&raw).map_err(|e| e.to_string()));

        let (result, entry) = match outcome {
            Ok(script) => (
                ScriptResult::ok(case.id, script),
                format!("script for test case {}: ok", case.id),
            ),
            Err(reason) => (
                ScriptResult::failed(case.id, format!("Script generation failed: {}", reason)),
                format!("script for test case {}: failed ({})", case.id, reason),
            ),
        };

        ItemOutcome::Finished {
            result,
            retries,
            entry,
        }
    }

    /// Invoke the client, emitting a run-log entry for every retry.
    ///
    /// The entries are returned so the caller can append them to the run log
    /// in order.
    async fn invoke_logged(
        &self,
        prompt: &Prompt,
        temperature: f32,
    ) -> (Result<String, GenerationError>, Vec<String>) {
        let retries = Mutex::new(Vec::new());
        let on_retry = |notice: &RetryNotice| {
            let entry = notice.to_string();
            self.emit(&entry);
            retries.lock().push(entry);
        };
        let reply = self.client.invoke(prompt, temperature, &on_retry).await;
        (reply, retries.into_inner())
    }

    /// Append an entry to the run log and publish it.
    fn record(&self, run: &mut PipelineRun, entry: String) {
        self.emit(&entry);
        run.append_log(entry);
    }

    fn emit(&self, entry: &str) {
        info!("{}", entry);
        if let Some(progress) = &self.progress {
            progress.on_entry(entry);
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Drive `future` unless `cancel` fires first. Dropping the future releases
/// whatever it holds.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        output = future => Ok(output),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
