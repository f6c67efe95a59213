//! Request executor
//!
//! Runs a single-attempt thunk under the configured retry policy. Each failed
//! attempt is classified; retryable kinds back off exponentially (or by the
//! server's `Retry-After`) until the budget runs out. Both the attempt and the
//! backoff sleep race the caller's cancellation token.
//!
//! ```ignore
//! let file = executor
//!     .execute(&cancel, &ctx, || api.get_file(shaper.shape(call.clone(), &ctx)))
//!     .await?;
//! ```

use bridge_traits::time::{Sleeper, TokioSleeper};
use core_async::sync::CancellationToken;
use core_async::time::{Duration, Instant};
use core_runtime::config::RetryConfig;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::classifier::{classify_failure, to_classified, Classification};
use crate::context::RequestContext;
use crate::error::{DriveError, RemoteFailure, Result};

/// Bookkeeping for one `execute` call.
struct RetryState {
    attempts: u32,
    started: Instant,
    last: Option<Classification>,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last: None,
        }
    }

    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.config)
            .field("sleeper", &"Sleeper { ... }")
            .finish()
    }
}

impl RequestExecutor {
    /// Executor that waits on the runtime timer.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let max_delay = self.config.max_delay;

        if let Some(hint) = retry_after {
            return hint.min(max_delay);
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.config.base_delay.as_secs_f64() * self.config.backoff_factor.powi(exponent);
        let capped = if scaled.is_finite() {
            scaled.min(max_delay.as_secs_f64())
        } else {
            max_delay.as_secs_f64()
        };

        let ratio = self.config.jitter_ratio;
        let jittered = if ratio > 0.0 {
            let spread = rand::thread_rng().gen_range(-ratio..=ratio);
            (capped * (1.0 + spread)).min(max_delay.as_secs_f64())
        } else {
            capped
        };

        // An unvalidated max_delay near Duration::MAX does not survive the
        // round trip through f64
        Duration::try_from_secs_f64(jittered.max(0.0)).unwrap_or(max_delay)
    }

    /// Run `thunk` until it succeeds, fails permanently, exhausts the retry
    /// budget, or `cancel` fires.
    ///
    /// `thunk` must perform exactly one remote attempt per call and be safe to
    /// call again; nothing from a failed attempt is reused.
    ///
    /// # Errors
    ///
    /// - [`DriveError::Api`] with the classified kind, trace id and attempt
    ///   count on a permanent failure or when retries are exhausted
    /// - [`DriveError::Cancelled`] when the token fires before or during an
    ///   attempt or during a backoff sleep
    #[instrument(
        name = "drive.execute",
        skip_all,
        fields(trace_id = %ctx.trace_id(), kind = %ctx.kind())
    )]
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        ctx: &RequestContext,
        mut thunk: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RemoteFailure>>,
    {
        let mut state = RetryState::new();
        let max_attempts = self.config.max_attempts();

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(ctx, &state));
            }

            state.attempts += 1;

            let outcome = match core_async::select_cancelled(cancel, thunk()).await {
                Some(outcome) => outcome,
                None => return Err(self.cancelled(ctx, &state)),
            };

            let failure = match outcome {
                Ok(value) => {
                    debug!(
                        attempts = state.attempts,
                        elapsed_ms = state.elapsed_ms() as u64,
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let classification = classify_failure(&failure);
            state.last = Some(classification);

            if !classification.retryable || state.attempts >= max_attempts {
                return Err(self.give_up(ctx, &state, &failure, classification));
            }

            let delay = self.backoff_delay(state.attempts, failure.retry_after());
            warn!(
                attempt = state.attempts,
                max_attempts,
                error_kind = %classification.kind,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Transient failure, backing off"
            );

            if core_async::select_cancelled(cancel, self.sleeper.sleep(delay))
                .await
                .is_none()
            {
                return Err(self.cancelled(ctx, &state));
            }
        }
    }

    fn give_up(
        &self,
        ctx: &RequestContext,
        state: &RetryState,
        failure: &RemoteFailure,
        classification: Classification,
    ) -> DriveError {
        let mut err = to_classified(failure, classification)
            .with_trace_id(ctx.trace_id())
            .with_attempts(state.attempts)
            .with_context("request_kind", ctx.kind().as_str());

        let involved = ctx.involved_ids();
        if !involved.is_empty() {
            err = err.with_context("ids", involved.join(","));
        }
        if let Some(drive_id) = ctx.drive_id() {
            err = err.with_context("drive_id", drive_id);
        }

        if classification.retryable {
            error!(
                attempts = state.attempts,
                elapsed_ms = state.elapsed_ms() as u64,
                error_kind = %classification.kind,
                error = %failure,
                "Retries exhausted"
            );
        } else {
            warn!(
                attempts = state.attempts,
                error_kind = %classification.kind,
                error = %failure,
                "Request failed permanently"
            );
        }

        DriveError::Api(err)
    }

    fn cancelled(&self, ctx: &RequestContext, state: &RetryState) -> DriveError {
        debug!(
            attempts = state.attempts,
            last_kind = ?state.last.map(|c| c.kind),
            "Request cancelled"
        );
        DriveError::Cancelled {
            trace_id: ctx.trace_id(),
            attempts: state.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestKind;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4))
            .with_jitter_ratio(0.0)
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let executor = RequestExecutor::new(
            RetryConfig::default()
                .with_base_delay(Duration::from_millis(100))
                .with_max_delay(Duration::from_millis(500))
                .with_jitter_ratio(0.0),
        );

        let delays: Vec<u128> = (1..=5)
            .map(|attempt| executor.backoff_delay(attempt, None).as_millis())
            .collect();

        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn test_backoff_jitter_stays_in_band() {
        let executor = RequestExecutor::new(
            RetryConfig::default().with_base_delay(Duration::from_millis(1000)),
        );

        for _ in 0..200 {
            let delay = executor.backoff_delay(1, None).as_millis();
            assert!((750..=1250).contains(&delay), "delay {} out of band", delay);
        }
    }

    #[test]
    fn test_backoff_with_unbounded_max_delay() {
        let executor = RequestExecutor::new(
            RetryConfig::default()
                .with_base_delay(Duration::from_secs(1))
                .with_max_delay(Duration::MAX)
                .with_jitter_ratio(0.0),
        );

        assert_eq!(executor.backoff_delay(3, None), Duration::from_secs(4));
        assert_eq!(executor.backoff_delay(90, None), Duration::MAX);
        assert_eq!(executor.backoff_delay(u32::MAX, None), Duration::MAX);

        let jittered = RequestExecutor::new(
            RetryConfig::default()
                .with_base_delay(Duration::from_secs(1))
                .with_max_delay(Duration::MAX),
        );
        for _ in 0..50 {
            assert!(jittered.backoff_delay(90, None) > Duration::from_secs(1 << 40));
        }
    }

    #[test]
    fn test_retry_after_wins_but_is_capped() {
        let executor = RequestExecutor::new(RetryConfig::default());

        assert_eq!(
            executor.backoff_delay(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            executor.backoff_delay(1, Some(Duration::from_secs(600))),
            Duration::from_secs(32)
        );
    }

    #[core_async::test]
    async fn test_success_on_first_attempt() {
        let executor = RequestExecutor::new(fast_config());
        let ctx = RequestContext::new("p", RequestKind::GetById);
        let cancel = CancellationToken::new();

        let calls = AtomicU32::new(0);
        let result = executor
            .execute(&cancel, &ctx, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RemoteFailure>("file") }
            })
            .await
            .unwrap();

        assert_eq!(result, "file");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[core_async::test]
    async fn test_permanent_failure_carries_context() {
        let executor = RequestExecutor::new(fast_config());
        let mut ctx = RequestContext::new("p", RequestKind::Mutation).with_drive_id("0AD");
        ctx.add_file_id("f1");
        let cancel = CancellationToken::new();

        let err = executor
            .execute(&cancel, &ctx, || async {
                Err::<(), _>(RemoteFailure::http(
                    403,
                    "insufficientFilePermissions",
                    "The user does not have sufficient permissions",
                ))
            })
            .await
            .unwrap_err();

        let classified = err.classified().unwrap();
        assert_eq!(classified.kind, ErrorKind::PermissionDenied);
        assert_eq!(classified.attempts, 1);
        assert_eq!(classified.trace_id, Some(ctx.trace_id()));
        assert_eq!(classified.context.get("request_kind").unwrap(), "mutation");
        assert_eq!(classified.context.get("ids").unwrap(), "f1");
        assert_eq!(classified.context.get("drive_id").unwrap(), "0AD");
    }

    #[core_async::test]
    async fn test_pre_cancelled_token_makes_no_attempt() {
        let executor = RequestExecutor::new(fast_config());
        let ctx = RequestContext::new("p", RequestKind::GetById);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let calls = AtomicU32::new(0);
        let err = executor
            .execute(&cancel, &ctx, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RemoteFailure>(()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Cancelled { attempts: 0, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
