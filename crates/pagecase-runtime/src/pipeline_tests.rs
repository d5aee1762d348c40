use super::*;
use async_trait::async_trait;
use pagecase_protocols::error::FetchError;
use pagecase_protocols::generator::GenerationRequest;
use pagecase_protocols::types::{ScriptStatus, MAX_TEST_CASES};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

const PAGE: &str = r#"
<form id="search">
  <input id="q" name="q" placeholder="Search">
  <button id="go" type="submit">Go</button>
</form>
<a href="/about" id="about">About</a>
"#;

type Reply = Result<String, GenerationError>;

/// Replays queued replies: test-case replies in order, script replies per
/// test case id. Unqueued script requests get a fenced one-line script.
#[derive(Default)]
struct FixtureGenerator {
    case_replies: Mutex<VecDeque<Reply>>,
    script_replies: Mutex<HashMap<u32, VecDeque<Reply>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    cancel_on_script: Option<CancellationToken>,
    stagger_scripts: bool,
}

impl FixtureGenerator {
    fn with_cases(replies: Vec<Reply>) -> Self {
        Self {
            case_replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn script_reply(self, id: u32, reply: Reply) -> Self {
        self.script_replies
            .lock()
            .entry(id)
            .or_default()
            .push_back(reply);
        self
    }

    fn script_requests(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.temperature == SCRIPT_TEMPERATURE)
            .count()
    }
}

fn test_case_id(prompt: &str) -> u32 {
    let rest = prompt
        .split("Test case ")
        .nth(1)
        .expect("script prompt names its test case");
    rest.split(':').next().unwrap().parse().unwrap()
}

#[async_trait]
impl TextGenerator for FixtureGenerator {
    fn id(&self) -> &str {
        "fixture"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().push(request.clone());
        let is_script = request
            .system
            .as_deref()
            .is_some_and(|s| s.contains("automation"));

        if !is_script {
            return self
                .case_replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Transport("no reply queued".to_string())));
        }

        let id = test_case_id(&request.prompt);
        if let Some(token) = &self.cancel_on_script {
            token.cancel();
        }
        if self.stagger_scripts {
            tokio::time::sleep(Duration::from_millis(u64::from(10 - id) * 10)).await;
        }
        let queued = self
            .script_replies
            .lock()
            .get_mut(&id)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| Ok(format!("```python\nprint('case {}')\n```", id)))
    }
}

struct StaticPage {
    result: Result<String, FetchError>,
}

impl StaticPage {
    fn markup(markup: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(markup.to_string()),
        })
    }
}

#[async_trait]
impl PageSource for StaticPage {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.result.clone()
    }
}

#[derive(Default)]
struct RecordingProgress {
    entries: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingProgress {
    fn on_entry(&self, entry: &str) {
        self.entries.lock().push(entry.to_string());
    }
}

fn cases_reply(count: u32) -> Reply {
    let records: Vec<String> = (1..=count)
        .map(|i| {
            format!(
                r#"{{"title": "Case {i}", "steps": ["Type into #q", "Click #go"], "expected_result": "Result {i}"}}"#
            )
        })
        .collect();
    Ok(format!("Here are the cases:\n```json\n[{}]\n```", records.join(", ")))
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        retry: RetryConfig {
            base_delay: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn pipeline(generator: Arc<FixtureGenerator>, config: PipelineConfig) -> Pipeline {
    Pipeline::new(StaticPage::markup(PAGE), generator, config)
}

fn request(count: u32) -> RunRequest {
    RunRequest::new("https://shop.example.com", count).unwrap()
}

fn assert_slots_match(run: &PipelineRun) {
    assert_eq!(run.scripts.len(), run.test_cases.len());
    for (script, case) in run.scripts.iter().zip(&run.test_cases) {
        assert_eq!(script.test_case_id, case.id);
    }
}

#[tokio::test]
async fn test_successful_run() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![cases_reply(3)]));
    let progress = Arc::new(RecordingProgress::default());
    let pipeline = pipeline(generator.clone(), fast_config()).with_progress(progress.clone());

    let run = pipeline.run(request(3)).await;

    assert!(run.is_done());
    assert!(run.failure.is_none());
    assert_eq!(run.elements.len(), 4);
    assert_eq!(run.test_cases.len(), 3);
    assert_slots_match(&run);
    assert!(run.scripts.iter().all(ScriptResult::is_ok));
    assert_eq!(run.scripts[1].script, "print('case 2')");

    assert_eq!(
        run.log,
        vec![
            "extracting: https://shop.example.com",
            "extracted 4 elements",
            "generating test cases (requested 3)",
            "generated 3 test cases (0 discarded)",
            "script for test case 1: ok",
            "script for test case 2: ok",
            "script for test case 3: ok",
            "done: 3/3 scripts generated",
        ]
    );
    assert_eq!(*progress.entries.lock(), run.log);
}

#[tokio::test]
async fn test_script_failure_is_isolated() {
    let generator = Arc::new(
        FixtureGenerator::with_cases(vec![cases_reply(3)]).script_reply(
            2,
            Err(GenerationError::Upstream {
                status: Some(400),
                message: "context length exceeded".to_string(),
            }),
        ),
    );
    let run = pipeline(generator, fast_config()).run(request(3)).await;

    assert_eq!(run.state, RunState::Done);
    assert_slots_match(&run);
    assert_eq!(run.scripts[0].status, ScriptStatus::Ok);
    assert_eq!(run.scripts[1].status, ScriptStatus::GenerationFailed);
    assert_eq!(run.scripts[2].status, ScriptStatus::Ok);
    assert!(run.scripts[1].script.contains("context length exceeded"));
    assert!(run
        .log
        .iter()
        .any(|e| e.starts_with("script for test case 2: failed (")));
    assert_eq!(run.log.last().unwrap(), "done: 2/3 scripts generated");
}

#[tokio::test]
async fn test_script_refusal_is_generation_failed() {
    let generator = Arc::new(
        FixtureGenerator::with_cases(vec![cases_reply(1)])
            .script_reply(1, Ok("I'm sorry, I can't write that script.".to_string())),
    );
    let run = pipeline(generator, fast_config()).run(request(1)).await;

    assert!(run.is_done());
    assert_eq!(run.scripts[0].status, ScriptStatus::GenerationFailed);
    assert!(run.scripts[0].script.contains("No plausible source code"));
}

#[tokio::test]
async fn test_rate_limited_case_stage_retried() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![
        Err(GenerationError::RateLimited {
            retry_after_seconds: None,
        }),
        cases_reply(2),
    ]));
    let run = pipeline(generator, fast_config()).run(request(2)).await;

    assert!(run.is_done());
    assert_eq!(run.test_cases.len(), 2);
    let retry_pos = run
        .log
        .iter()
        .position(|e| e.starts_with("retry: attempt 1/3 failed (Rate limited)"))
        .expect("retry is logged");
    let generated_pos = run
        .log
        .iter()
        .position(|e| e.starts_with("generated 2 test cases"))
        .unwrap();
    assert!(retry_pos < generated_pos);
}

#[tokio::test]
async fn test_zero_elements_fails_extraction() {
    let generator = Arc::new(FixtureGenerator::default());
    let pipeline = Pipeline::new(
        StaticPage::markup("<p>No controls</p>"),
        generator.clone(),
        fast_config(),
    );
    let run = pipeline.run(request(3)).await;

    assert_eq!(run.state, RunState::Failed);
    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::Extraction);
    assert!(failure.reason.contains("No interactive elements"));
    assert!(generator.requests.lock().is_empty());
    assert!(run.log.last().unwrap().starts_with("failed at extraction: "));
}

#[tokio::test]
async fn test_fetch_error_fails_extraction() {
    let source = Arc::new(StaticPage {
        result: Err(FetchError::Network("connection refused".to_string())),
    });
    let pipeline = Pipeline::new(source, Arc::new(FixtureGenerator::default()), fast_config());
    let run = pipeline.run(request(3)).await;

    assert_eq!(run.failure.unwrap().stage, Stage::Extraction);
    assert!(run.elements.is_empty());
}

#[tokio::test]
async fn test_upstream_error_fails_case_stage() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![Err(
        GenerationError::Upstream {
            status: Some(401),
            message: "invalid api key".to_string(),
        },
    )]));
    let run = pipeline(generator.clone(), fast_config()).run(request(3)).await;

    assert_eq!(run.state, RunState::Failed);
    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Stage::TestCases);
    assert!(failure.reason.contains("invalid api key"));
    assert_eq!(run.elements.len(), 4);
    assert!(run.test_cases.is_empty());
    assert!(run.scripts.is_empty());
    assert_eq!(generator.requests.lock().len(), 1);
}

#[tokio::test]
async fn test_unparsable_cases_after_reprompt_fail() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![
        Ok("I cannot see any test cases.".to_string()),
        Ok("[]".to_string()),
    ]));
    let run = pipeline(generator, fast_config()).run(request(3)).await;

    assert_eq!(run.state, RunState::Failed);
    assert_eq!(run.failure.as_ref().unwrap().stage, Stage::TestCases);
    assert!(run.failure.unwrap().reason.contains("No valid test cases"));
    assert!(run
        .log
        .iter()
        .any(|e| e.starts_with("test case reply unusable (No JSON array found in response), re-prompting")));
}

#[tokio::test]
async fn test_reprompt_recovers() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![
        Ok("[{\"title\": \"truncated".to_string()),
        cases_reply(1),
    ]));
    let run = pipeline(generator, fast_config()).run(request(1)).await;

    assert!(run.is_done());
    assert_eq!(run.test_cases.len(), 1);
}

#[tokio::test]
async fn test_discarded_candidates_logged_and_ids_contiguous() {
    let raw = r#"[
        {"title": "Missing steps", "expected_result": "x"},
        {"title": "Valid one", "steps": ["Click #go"], "expected_result": "ok"},
        {"title": "Valid two", "steps": "1. Click #about", "expected_result": "ok"}
    ]"#;
    let generator = Arc::new(FixtureGenerator::with_cases(vec![Ok(raw.to_string())]));
    let run = pipeline(generator, fast_config()).run(request(5)).await;

    assert!(run.is_done());
    let ids: Vec<u32> = run.test_cases.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_slots_match(&run);
    assert!(run
        .log
        .contains(&"discarded candidate #1: steps is missing".to_string()));
    assert!(run
        .log
        .contains(&"generated 2 test cases (1 discarded)".to_string()));
}

#[tokio::test]
async fn test_stage_temperatures_and_budgets() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![cases_reply(1)]));
    pipeline(generator.clone(), fast_config()).run(request(1)).await;

    let requests = generator.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].temperature, CASE_TEMPERATURE);
    assert_eq!(requests[0].max_tokens, Some(1500));
    assert_eq!(requests[1].temperature, SCRIPT_TEMPERATURE);
    assert_eq!(requests[1].max_tokens, Some(2000));
    assert_eq!(requests[1].model, "gpt-4o");
}

#[tokio::test]
async fn test_element_cap_logged() {
    let generator = Arc::new(FixtureGenerator::with_cases(vec![cases_reply(1)]));
    let config = PipelineConfig {
        max_elements: 2,
        ..fast_config()
    };
    let run = pipeline(generator.clone(), config).run(request(1)).await;

    assert!(run
        .log
        .contains(&"using the first 2 of 4 elements in prompts".to_string()));
    let requests = generator.requests.lock();
    assert!(requests[0].prompt.contains("\"search\""));
    assert!(!requests[0].prompt.contains("\"about\""));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let generator = Arc::new(FixtureGenerator::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = pipeline(generator.clone(), fast_config())
        .run_with_cancel(request(2), cancel)
        .await;

    assert_eq!(run.state, RunState::Failed);
    let failure = run.failure.unwrap();
    assert_eq!(failure.stage, Stage::Extraction);
    assert_eq!(failure.reason, "Run cancelled");
    assert!(generator.requests.lock().is_empty());
}

#[tokio::test]
async fn test_cancelled_between_script_items() {
    let cancel = CancellationToken::new();
    let generator = Arc::new(FixtureGenerator {
        cancel_on_script: Some(cancel.clone()),
        ..FixtureGenerator::with_cases(vec![cases_reply(3)])
    });

    let run = pipeline(generator.clone(), fast_config())
        .run_with_cancel(request(3), cancel)
        .await;

    assert_eq!(run.state, RunState::Failed);
    assert_eq!(run.failure.as_ref().unwrap().stage, Stage::Scripts);
    assert_eq!(run.test_cases.len(), 3);
    assert_eq!(run.scripts.len(), 3);
    assert!(run.scripts[0].is_ok());
    for (slot, case) in run.scripts.iter().zip(&run.test_cases) {
        assert_eq!(slot.test_case_id, case.id);
    }
    assert_eq!(run.scripts[1].status, ScriptStatus::GenerationFailed);
    assert_eq!(run.scripts[2].script, "Script generation cancelled");
    assert_eq!(generator.script_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_scripts_keep_case_order() {
    let generator = Arc::new(FixtureGenerator {
        stagger_scripts: true,
        ..FixtureGenerator::with_cases(vec![cases_reply(MAX_TEST_CASES)])
    });
    let config = PipelineConfig {
        script_concurrency: 4,
        ..fast_config()
    };
    let run = pipeline(generator, config).run(request(MAX_TEST_CASES)).await;

    assert!(run.is_done());
    assert_slots_match(&run);
    for script in &run.scripts {
        assert_eq!(script.script, format!("print('case {}')", script.test_case_id));
    }
    let item_entries: Vec<&String> = run
        .log
        .iter()
        .filter(|e| e.starts_with("script for test case"))
        .collect();
    assert_eq!(item_entries[0], "script for test case 1: ok");
    assert_eq!(item_entries[9], "script for test case 10: ok");
}
