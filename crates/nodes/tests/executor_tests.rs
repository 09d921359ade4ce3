mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artifacts::MemoryArtifactStore;
use common::*;
use nodes::{PipelineExecutor, RetryConfig};
use pipeline::{
    ArtifactStore, ErrorKind, GenerationResponse, OutputContract, PipelineError, ProviderError,
    RetryPolicy,
};

fn executor(
    definition: Arc<pipeline::PipelineDefinition>,
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn ArtifactStore>,
) -> PipelineExecutor {
    PipelineExecutor::new(definition, provider, store).with_retry(fast_retry(3))
}

#[tokio::test]
async fn successful_run_yields_one_result_per_stage_in_order() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(5, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let run = executor.run("Open source LLMs").await.unwrap();

    let stages: Vec<&str> = run.results().iter().map(|r| r.stage().as_str()).collect();
    assert_eq!(stages, ["s1", "s2", "s3", "s4", "s5"]);
    assert!(run.results().iter().all(|r| r.is_success()));
    assert_eq!(run.topic().as_str(), "Open source LLMs");
    assert_eq!(provider.call_count(), 5);
    assert_eq!(run.final_result().stage().as_str(), "s5");
}

#[tokio::test]
async fn each_stage_receives_previous_output_as_context() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(4, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let run = executor.run("Quantum networking").await.unwrap();

    assert!(run.results()[0].context().is_empty());
    for pair in run.results().windows(2) {
        assert_eq!(pair[1].context(), [pair[0].text().to_string()]);
    }
    for (request, result) in provider.requests().iter().zip(run.results()) {
        assert_eq!(request.context, result.context());
    }
}

#[tokio::test]
async fn topic_is_bound_into_every_prompt_and_instruction() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(3, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    executor.run("  Edge AI  ").await.unwrap();

    for request in provider.requests() {
        assert!(prompt_of(&request).contains("on Edge AI"));
        assert!(request
            .system_instruction
            .as_deref()
            .unwrap()
            .contains("Do Edge AI well"));
    }
}

#[tokio::test]
async fn same_topic_twice_gives_identical_results() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(5, true), provider, Arc::new(MemoryArtifactStore::new()));

    let first = executor.run("Robotics").await.unwrap();
    let second = executor.run("Robotics").await.unwrap();

    let texts = |run: &pipeline::CompletedRun| -> Vec<(String, String)> {
        run.results()
            .iter()
            .map(|r| (r.stage().to_string(), r.text().to_string()))
            .collect()
    };
    assert_eq!(texts(&first), texts(&second));
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn blank_topic_is_rejected_before_any_provider_call() {
    let provider = Arc::new(ScriptedProvider::echo());
    let store = Arc::new(MemoryArtifactStore::new());
    store.write(&key("s1.md"), "previous").await.unwrap();
    let executor = executor(chain(3, true), provider.clone(), store.clone());

    for topic in ["", "   ", "\n\t"] {
        let err = executor.run(topic).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }), "{err:?}");
    }
    assert_eq!(provider.call_count(), 0);
    assert_eq!(store.read(&key("s1.md")).await.unwrap().as_deref(), Some("previous"));
}

#[tokio::test]
async fn persistence_targets_hold_exactly_their_stage_text() {
    let provider = Arc::new(ScriptedProvider::echo());
    let store = Arc::new(MemoryArtifactStore::new());
    let executor = executor(chain(3, true), provider, store.clone());

    let run = executor.run("Batteries").await.unwrap();

    for result in run.results() {
        let stored = store
            .read(&key(&format!("{}.md", result.stage())))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(result.text()));
    }
    assert_eq!(store.keys().await.len(), 3);
}

#[tokio::test]
async fn failing_third_stage_halts_the_run() {
    let provider = Arc::new(ScriptedProvider::new(|req| {
        if role_of(req) == "role-3" {
            Err(ProviderError::transient("503 Service Unavailable"))
        } else {
            Ok(GenerationResponse::text(echo_text(req)))
        }
    }));
    let store = Arc::new(MemoryArtifactStore::new());
    store.write(&key("s4.md"), "stale draft").await.unwrap();
    store.write(&key("s5.md"), "stale kit").await.unwrap();
    let executor = executor(chain(5, true), provider.clone(), store.clone());

    let err = executor.run("Fusion").await.unwrap_err();

    match err {
        PipelineError::StageFailed {
            stage,
            kind,
            attempts,
            ..
        } => {
            assert_eq!(stage.as_str(), "s3");
            assert_eq!(kind, ErrorKind::CapabilityUnavailable);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.calls_for("role-3"), 3);
    assert_eq!(provider.calls_for("role-4"), 0);
    assert_eq!(provider.calls_for("role-5"), 0);

    let keys: Vec<String> = store.keys().await.iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, ["s1.md", "s2.md"]);
}

#[tokio::test]
async fn retryable_failure_then_success_completes() {
    let failures = Arc::new(AtomicUsize::new(2));
    let remaining = failures.clone();
    let provider = Arc::new(ScriptedProvider::new(move |req| {
        if role_of(req) == "role-2" && remaining.load(Ordering::SeqCst) > 0 {
            remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(ProviderError {
                message: "429 Too Many Requests".to_string(),
                retry: RetryPolicy::Retryable {
                    after: Some(Duration::from_millis(2)),
                },
            });
        }
        Ok(GenerationResponse::text(echo_text(req)))
    }));
    let executor = executor(chain(3, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let run = executor.run("Solar").await.unwrap();

    assert_eq!(run.results().len(), 3);
    assert_eq!(provider.calls_for("role-2"), 3);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_retryable_failure_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(|_| {
        Err(ProviderError::permanent("401 Unauthorized"))
    }));
    let executor = executor(chain(2, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let err = executor.run("Anything").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed { attempts: 1, kind: ErrorKind::CapabilityUnavailable, .. }
    ));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn disabled_retry_executes_each_stage_once() {
    let provider = Arc::new(ScriptedProvider::new(|_| Err(ProviderError::transient("timeout"))));
    let executor = PipelineExecutor::new(chain(2, false), provider.clone(), Arc::new(MemoryArtifactStore::new()))
        .with_retry(RetryConfig::disabled());

    let err = executor.run("Anything").await.unwrap_err();

    assert!(matches!(err, PipelineError::StageFailed { attempts: 1, .. }));
    assert_eq!(provider.call_count(), 1);
}

struct RejectEverything;

impl OutputContract for RejectEverything {
    fn name(&self) -> &str {
        "reject-everything"
    }

    fn check(&self, _output: &str) -> Result<(), String> {
        Err("never good enough".to_string())
    }
}

#[tokio::test]
async fn contract_violation_is_retried_then_reported() {
    let provider = Arc::new(ScriptedProvider::echo());
    let store = Arc::new(MemoryArtifactStore::new());
    let stage = task("only", role("critic"))
        .persist_to(key("only.md"))
        .with_contract(Arc::new(RejectEverything));
    let executor = executor(definition(vec![stage]), provider.clone(), store.clone());

    let err = executor.run("Poetry").await.unwrap_err();

    match err {
        PipelineError::StageFailed {
            kind,
            attempts,
            message,
            ..
        } => {
            assert_eq!(kind, ErrorKind::OutputContractViolation);
            assert_eq!(attempts, 3);
            assert!(message.contains("never good enough"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.call_count(), 3);
    assert!(store.read(&key("only.md")).await.unwrap().is_none());
}

#[tokio::test]
async fn persistence_failure_fails_the_stage_without_retry() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(2, true), provider.clone(), Arc::new(FailingStore));

    let err = executor.run("Storage").await.unwrap_err();

    match err {
        PipelineError::StageFailed {
            stage,
            kind,
            attempts,
            message,
        } => {
            assert_eq!(stage.as_str(), "s1");
            assert_eq!(kind, ErrorKind::PersistenceError);
            assert_eq!(attempts, 1);
            assert!(message.contains("disk full"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn run_final_returns_last_stage_result() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(3, false), provider, Arc::new(MemoryArtifactStore::new()));

    let last = executor.run_final("Chips").await.unwrap();

    assert_eq!(last.stage().as_str(), "s3");
    assert!(last.text().starts_with("role-3 on Stage s3 on Chips"));
}

#[tokio::test]
async fn concurrent_runs_do_not_interfere() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(3, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let (a, b) = tokio::join!(executor.run("Biotech"), executor.run("Space"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.results().iter().all(|r| r.text().contains("Biotech")));
    assert!(a.results().iter().all(|r| !r.text().contains("Space")));
    assert!(b.results().iter().all(|r| r.text().contains("Space")));
    assert!(b.results().iter().all(|r| !r.text().contains("Biotech")));
    assert_eq!(provider.call_count(), 6);
}

#[tokio::test]
async fn topic_with_placeholder_text_is_bound_verbatim() {
    let provider = Arc::new(ScriptedProvider::echo());
    let executor = executor(chain(2, false), provider.clone(), Arc::new(MemoryArtifactStore::new()));

    let run = executor.run("Templating {context} engines").await.unwrap();

    for request in provider.requests() {
        assert!(prompt_of(&request).contains("on Templating {context} engines"));
    }
    assert!(run.results()[0]
        .text()
        .starts_with("role-1 on Stage s1 on Templating {context} engines"));
}

/// Fails `role-1` once with a server-supplied retry delay, then echoes.
fn retry_after_once(after: Duration) -> ScriptedProvider {
    let failed = Arc::new(AtomicUsize::new(0));
    ScriptedProvider::new(move |req| {
        if failed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProviderError {
                message: "429 Too Many Requests".to_string(),
                retry: RetryPolicy::Retryable { after: Some(after) },
            });
        }
        Ok(GenerationResponse::text(echo_text(req)))
    })
}

#[tokio::test(start_paused = true)]
async fn server_retry_delay_is_honoured() {
    let provider = Arc::new(retry_after_once(Duration::from_secs(2)));
    let executor = PipelineExecutor::new(chain(1, false), provider.clone(), Arc::new(MemoryArtifactStore::new()))
        .with_retry(RetryConfig::default().with_initial_delay(Duration::from_millis(1)));

    let started = tokio::time::Instant::now();
    executor.run("Backpressure").await.unwrap();

    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(2), "{waited:?}");
    assert!(waited < Duration::from_secs(3), "{waited:?}");
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn server_retry_delay_is_capped_by_max_delay() {
    let provider = Arc::new(retry_after_once(Duration::from_secs(86_400)));
    let executor = PipelineExecutor::new(chain(1, false), provider.clone(), Arc::new(MemoryArtifactStore::new()))
        .with_retry(RetryConfig::default().with_max_delay(Duration::from_secs(10)));

    let started = tokio::time::Instant::now();
    executor.run("Backpressure").await.unwrap();

    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(10), "{waited:?}");
    assert!(waited < Duration::from_secs(11), "{waited:?}");
    assert_eq!(provider.call_count(), 2);
}
