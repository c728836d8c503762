mod common;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use service_supervisor::{ChildFailure, Severity, ShutdownSignal, SupervisorOutcome};
use tokio::time::{pause, Instant};

use common::{scripted_supervisor, RecordingReporter, ScriptedRunner, SignallingRunner};

#[tokio::test]
async fn test_always_failing_child_is_launched_exactly_threshold_times() {
    let runner = ScriptedRunner::always(1);
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter);

    let outcome = supervisor.run(&ShutdownSignal::new()).await;

    assert!(matches!(
        outcome,
        SupervisorOutcome::Failed { failures: 6, .. }
    ));
    assert!(!outcome.is_clean());
    assert_eq!(runner.calls(), 6);
    assert_eq!(reporter.count(Severity::Warning), 6);
}

#[tokio::test]
async fn test_launch_failures_count_toward_threshold() {
    let runner = ScriptedRunner::failing_to_launch();
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter);

    let outcome = supervisor.run(&ShutdownSignal::new()).await;

    match outcome {
        SupervisorOutcome::Failed {
            failures,
            last_failure: ChildFailure::Launch(err),
        } => {
            assert_eq!(failures, 6);
            assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected launch failures to exhaust the threshold, got {other:?}"),
    }
    assert_eq!(runner.calls(), 6);
    assert_eq!(reporter.count(Severity::Warning), 6);
}

#[tokio::test]
async fn test_clean_exit_on_third_attempt() {
    let runner = ScriptedRunner::sequence(&[1, 1, 0]);
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter);

    let outcome = supervisor.run(&ShutdownSignal::new()).await;

    assert!(matches!(outcome, SupervisorOutcome::Completed { attempts: 3 }));
    assert!(outcome.is_clean());
    assert_eq!(runner.calls(), 3);
}

#[tokio::test]
async fn test_clean_exit_ends_loop_regardless_of_prior_failures() {
    for failures in 0..6 {
        let mut codes = vec![1; failures];
        codes.push(0);
        let runner = ScriptedRunner::sequence(&codes);
        let reporter = RecordingReporter::default();
        let supervisor = scripted_supervisor(runner.clone(), &reporter);

        let outcome = supervisor.run(&ShutdownSignal::new()).await;

        assert!(outcome.is_clean(), "{failures} failures then success");
        assert_eq!(runner.calls(), failures + 1);
        assert_eq!(reporter.count(Severity::Warning), failures);
    }
}

#[tokio::test]
async fn test_custom_threshold() {
    let runner = ScriptedRunner::always(2);
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter).with_max_failures(2);

    let outcome = supervisor.run(&ShutdownSignal::new()).await;

    match outcome {
        SupervisorOutcome::Failed {
            failures,
            last_failure,
        } => {
            assert_eq!(failures, 2);
            assert!(last_failure.to_string().contains("code 2"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(runner.calls(), 2);
}

#[tokio::test]
async fn test_no_launch_once_signal_is_set() {
    let runner = ScriptedRunner::always(1);
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter);

    let signal = ShutdownSignal::new();
    signal.signal();
    let outcome = supervisor.run(&signal).await;

    assert!(matches!(outcome, SupervisorOutcome::Cancelled { attempts: 0 }));
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_signal_during_run_prevents_next_launch() {
    let signal = ShutdownSignal::new();
    let runner = SignallingRunner {
        signal: signal.clone(),
        signal_on_attempt: 2,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter);

    let outcome = supervisor.run(&signal).await;

    assert!(matches!(outcome, SupervisorOutcome::Cancelled { attempts: 2 }));
    assert_eq!(runner.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_restart_backoff_grows() {
    pause();
    let runner = ScriptedRunner::always(1);
    let reporter = RecordingReporter::default();
    let supervisor = scripted_supervisor(runner.clone(), &reporter)
        .with_max_failures(3)
        .with_restart_backoff(Duration::from_millis(100));

    let started = Instant::now();
    let outcome = supervisor.run(&ShutdownSignal::new()).await;

    // 100ms after the first failure, 200ms after the second, none after the last.
    assert!(!outcome.is_clean());
    assert_eq!(runner.calls(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
}

#[tokio::test]
async fn test_signal_interrupts_backoff() {
    pause();
    let runner = ScriptedRunner::always(1);
    let reporter = RecordingReporter::default();
    let supervisor =
        scripted_supervisor(runner.clone(), &reporter).with_restart_backoff(Duration::from_secs(10));

    let signal = ShutdownSignal::new();
    let task_signal = signal.clone();
    let started = Instant::now();
    let join = tokio::spawn(async move { supervisor.run(&task_signal).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    signal.signal();
    let outcome = join.await.unwrap();

    assert!(matches!(outcome, SupervisorOutcome::Cancelled { attempts: 1 }));
    assert_eq!(runner.calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}
