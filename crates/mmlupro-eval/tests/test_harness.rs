//! Integration tests for harness invocation using a shell stand-in
#![cfg(unix)]

use mmlupro_eval::{aggregate, HarnessConfig, HarnessError, HarnessRunner, RunRequest};
use std::path::Path;
use tempfile::TempDir;

fn request() -> RunRequest {
    RunRequest {
        model_args: "pretrained=test-model".to_string(),
        task: "mmlu_pro".to_string(),
        num_fewshot: 5,
        gen_kwargs: None,
    }
}

/// A harness that runs `script` under `sh` and writes into `<dir>/out`
fn shell_harness(dir: &Path, script: &str) -> HarnessRunner {
    HarnessRunner::new(HarnessConfig {
        program: "sh".to_string(),
        base_args: vec!["-c".to_string(), script.to_string(), "harness".to_string()],
        output_dir: dir.join("out"),
        ..HarnessConfig::default()
    })
}

#[test]
fn test_successful_run_reads_results_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let out = temp_dir.path().join("out");
    let script = format!(
        r#"mkdir -p '{out}' && printf '%s' '{{"results": {{"mmlu_pro": {{"exact_match": 0.75}}, "mmlu_pro_law": {{"acc": 0.1}}}}}}' > '{out}/results.json'"#,
        out = out.display()
    );

    let scores = shell_harness(temp_dir.path(), &script)
        .run_once(&request())
        .expect("run should succeed");

    assert_eq!(scores.len(), 1);
    assert_eq!(scores["mmlu_pro"], 0.75);
}

#[test]
fn test_non_zero_exit_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let runner = shell_harness(temp_dir.path(), "echo 'CUDA out of memory' >&2; exit 3");

    match runner.run_once(&request()) {
        Err(HarnessError::NonZeroExit { stderr, .. }) => {
            assert!(stderr.contains("CUDA out of memory"))
        }
        other => panic!("expected NonZeroExit, got {:?}", other),
    }
}

#[test]
fn test_missing_results_file_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let runner = shell_harness(temp_dir.path(), "exit 0");

    assert!(matches!(
        runner.run_once(&request()),
        Err(HarnessError::MissingOutput(_))
    ));
}

#[test]
fn test_malformed_results_file_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let out = temp_dir.path().join("out");
    let script = format!(
        "mkdir -p '{out}' && echo 'not json' > '{out}/results.json'",
        out = out.display()
    );

    assert!(matches!(
        shell_harness(temp_dir.path(), &script).run_once(&request()),
        Err(HarnessError::Malformed { .. })
    ));
}

#[test]
fn test_missing_program_is_a_spawn_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let runner = HarnessRunner::new(HarnessConfig {
        program: "definitely-not-a-real-harness-binary".to_string(),
        output_dir: temp_dir.path().join("out"),
        ..HarnessConfig::default()
    });

    assert!(matches!(
        runner.run_once(&request()),
        Err(HarnessError::Spawn { .. })
    ));
}

#[test]
fn test_child_receives_arguments_and_environment() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let out = temp_dir.path().join("out");
    // Only succeed when the detection variables and arguments arrive intact.
    let script = format!(
        r#"[ "$MODEL_NAME" = deepseek-r1-0528 ] || exit 4
[ "$FORCE_THINKING" = true ] || exit 5
[ "$2" = pretrained=test-model ] || exit 6
[ "$4" = mmlu_pro ] || exit 7
mkdir -p '{out}' && printf '%s' '{{"results": {{"mmlu_pro": {{"exact_match": 1.0}}}}}}' > '{out}/results.json'"#,
        out = out.display()
    );

    let runner = shell_harness(temp_dir.path(), &script)
        .env("MODEL_NAME", "deepseek-r1-0528")
        .env("FORCE_THINKING", "true");

    let scores = runner.run_once(&request()).expect("run should succeed");
    assert_eq!(scores["mmlu_pro"], 1.0);
}

#[test]
fn test_stale_results_do_not_leak_into_failed_run() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let out = temp_dir.path().join("out");
    std::fs::create_dir_all(&out).expect("Failed to create output dir");
    std::fs::write(
        out.join("results.json"),
        r#"{"results": {"mmlu_pro": {"exact_match": 0.5}}}"#,
    )
    .expect("Failed to write stale results");

    let runner = shell_harness(temp_dir.path(), "exit 0");
    assert!(matches!(
        runner.run_once(&request()),
        Err(HarnessError::MissingOutput(_))
    ));
}

#[test]
fn test_aggregate_over_flaky_harness() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dir = temp_dir.path();
    let out = dir.join("out");
    // Scores 0.8 then 1.0, then fails on every later run.
    let script = format!(
        r#"n=$(cat '{dir}/count' 2>/dev/null || echo 0)
n=$((n + 1))
echo $n > '{dir}/count'
case $n in 1) s=0.8 ;; 2) s=1.0 ;; *) exit 1 ;; esac
mkdir -p '{out}' && printf '{{"results": {{"t": {{"exact_match": %s}}}}}}' $s > '{out}/results.json'"#,
        dir = dir.display(),
        out = out.display()
    );
    let runner = shell_harness(dir, &script);

    let outcome = aggregate(3, |_| runner.run_once(&request())).expect("two runs succeeded");
    let stats = &outcome.averaged_results["t"];

    assert_eq!(stats.runs, 2);
    assert!((stats.mean - 0.9).abs() < 1e-12);
    assert_eq!(outcome.failed, 1);
}
