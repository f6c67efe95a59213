//! Retry, backoff and cancellation behavior of the request executor.

use async_trait::async_trait;
use bridge_traits::time::Sleeper;
use core_async::sync::CancellationToken;
use core_drive::{DriveError, ErrorKind, RemoteFailure, RequestContext, RequestExecutor, RequestKind};
use core_runtime::config::RetryConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records requested delays and returns immediately.
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

/// Cancels the operation as soon as a backoff starts, then never wakes.
struct CancellingSleeper {
    cancel: CancellationToken,
    calls: AtomicU32,
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        std::future::pending::<()>().await;
    }
}

fn retry_config(max_retries: u32) -> RetryConfig {
    RetryConfig::default()
        .with_max_retries(max_retries)
        .with_base_delay(Duration::from_millis(100))
        .with_backoff_factor(2.0)
        .with_max_delay(Duration::from_secs(32))
}

fn backend_error() -> RemoteFailure {
    RemoteFailure::http(503, "backendError", "Backend Error")
}

fn executor(config: RetryConfig) -> (RequestExecutor, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    (
        RequestExecutor::with_sleeper(config, sleeper.clone()),
        sleeper,
    )
}

#[core_async::test]
async fn test_backend_errors_then_success_backs_off_three_times() {
    let (executor, sleeper) = executor(retry_config(3));
    let ctx = RequestContext::new("default", RequestKind::ListOrSearch);
    let cancel = CancellationToken::new();
    let attempts = AtomicU32::new(0);

    let result = executor
        .execute(&cancel, &ctx, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt <= 3 {
                    Err(backend_error())
                } else {
                    Ok("listing")
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "listing");
    assert_eq!(attempts.load(Ordering::SeqCst), 4);

    let delays = sleeper.delays();
    assert_eq!(delays.len(), 3);
    assert!(delays[0] < delays[1] && delays[1] < delays[2], "{:?}", delays);
    assert!(delays[0] >= Duration::from_millis(75) && delays[0] <= Duration::from_millis(125));
}

#[core_async::test]
async fn test_backoff_without_jitter_doubles() {
    let (executor, sleeper) = executor(retry_config(3).with_jitter_ratio(0.0));
    let ctx = RequestContext::new("default", RequestKind::GetById);
    let cancel = CancellationToken::new();

    let _ = executor
        .execute(&cancel, &ctx, || async { Err::<(), _>(backend_error()) })
        .await;

    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400)
        ]
    );
}

#[core_async::test]
async fn test_always_retryable_makes_max_retries_plus_one_attempts() {
    for max_retries in [0u32, 1, 3, 5] {
        let (executor, sleeper) = executor(retry_config(max_retries));
        let ctx = RequestContext::new("default", RequestKind::GetById);
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let err = executor
            .execute(&cancel, &ctx, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RemoteFailure::http(429, "", "Too Many Requests")) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), max_retries + 1);
        assert_eq!(sleeper.delays().len(), max_retries as usize);

        let classified = err.classified().expect("classified error");
        assert_eq!(classified.kind, ErrorKind::RateLimited);
        assert!(classified.retryable);
        assert_eq!(classified.attempts, max_retries + 1);
        assert_eq!(err.trace_id(), Some(ctx.trace_id()));
    }
}

#[core_async::test]
async fn test_single_transient_failure_then_success_takes_two_attempts() {
    let (executor, sleeper) = executor(retry_config(3));
    let ctx = RequestContext::new("default", RequestKind::DownloadOrExport);
    let cancel = CancellationToken::new();
    let attempts = AtomicU32::new(0);

    let value = executor
        .execute(&cancel, &ctx, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt == 1 {
                    Err(RemoteFailure::Transport("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(sleeper.delays().len(), 1);
}

#[core_async::test]
async fn test_non_retryable_failure_makes_one_attempt() {
    let failures = [
        RemoteFailure::http(404, "notFound", "File not found"),
        RemoteFailure::http(403, "storageQuotaExceeded", "Quota"),
        RemoteFailure::http(400, "badRequest", "Invalid query"),
        RemoteFailure::http(401, "authError", "Invalid Credentials"),
        RemoteFailure::Decode("unexpected end of input".to_string()),
    ];

    for failure in failures {
        let (executor, sleeper) = executor(retry_config(3));
        let ctx = RequestContext::new("default", RequestKind::Mutation);
        let cancel = CancellationToken::new();
        let attempts = AtomicU32::new(0);

        let err = executor
            .execute(&cancel, &ctx, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                let failure = failure.clone();
                async move { Err::<(), _>(failure) }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1, "{:?}", failure);
        assert!(sleeper.delays().is_empty());
        assert!(!err.classified().unwrap().retryable);
    }
}

#[core_async::test]
async fn test_retry_after_hint_drives_delay() {
    let (executor, sleeper) = executor(retry_config(1));
    let ctx = RequestContext::new("default", RequestKind::GetById);
    let cancel = CancellationToken::new();

    let _ = executor
        .execute(&cancel, &ctx, || async {
            Err::<(), _>(
                RemoteFailure::http(429, "rateLimitExceeded", "slow down")
                    .with_retry_after(Duration::from_secs(5)),
            )
        })
        .await;

    assert_eq!(sleeper.delays(), vec![Duration::from_secs(5)]);
}

#[core_async::test]
async fn test_cancel_mid_backoff_stops_before_next_attempt() {
    let cancel = CancellationToken::new();
    let sleeper = Arc::new(CancellingSleeper {
        cancel: cancel.clone(),
        calls: AtomicU32::new(0),
    });
    let executor = RequestExecutor::with_sleeper(retry_config(5), sleeper.clone());
    let ctx = RequestContext::new("default", RequestKind::ListOrSearch);
    let attempts = AtomicU32::new(0);

    let err = executor
        .execute(&cancel, &ctx, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(backend_error()) }
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err, DriveError::Cancelled { attempts: 1, .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.exit_code(), 130);
}

#[core_async::test]
async fn test_cancel_during_in_flight_attempt() {
    let (executor, _sleeper) = executor(retry_config(3));
    let ctx = RequestContext::new("default", RequestKind::DownloadOrExport);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let err = executor
        .execute(&cancel, &ctx, || {
            let trigger = trigger.clone();
            async move {
                trigger.cancel();
                std::future::pending::<Result<(), RemoteFailure>>().await
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Cancelled { attempts: 1, .. }));
    assert_eq!(err.trace_id(), Some(ctx.trace_id()));
}

#[core_async::test]
async fn test_real_sleeper_honors_cancellation() {
    let executor = RequestExecutor::new(
        retry_config(3).with_base_delay(Duration::from_secs(10)),
    );
    let ctx = RequestContext::new("default", RequestKind::GetById);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    core_async::spawn(async move {
        core_async::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = executor
        .execute(&cancel, &ctx, || async { Err::<(), _>(backend_error()) })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}
