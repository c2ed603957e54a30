//! Retrying execution of database units of work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::context::ExecutionContext;
use super::detector::{DefaultTransientErrorDetector, TransientErrorDetector};
use super::policy::RetryPolicy;
use crate::error::{QueryError, Result};

/// Result of a successful execution and the transient failures retried on
/// the way to it, oldest first.
#[derive(Debug)]
pub struct Executed<T> {
    pub value: T,
    pub exceptions_encountered: Vec<QueryError>,
}

impl<T> Executed<T> {
    fn first_try(value: T) -> Self {
        Self {
            value,
            exceptions_encountered: Vec::new(),
        }
    }
}

/// Runs units of work, retrying the ones that fail transiently.
///
/// Every entry point takes the caller's [`ExecutionContext`] and hands the
/// unit of work a nested copy. When the incoming context already carries an
/// active strategy the operation runs once, unwrapped, so retries never
/// compound.
#[derive(Clone)]
pub struct ExecutionStrategy {
    policy: RetryPolicy,
    detector: Arc<dyn TransientErrorDetector>,
}

impl std::fmt::Debug for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStrategy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExecutionStrategy {
    pub fn new(policy: RetryPolicy, detector: Arc<dyn TransientErrorDetector>) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy, detector })
    }

    /// Default policy with the provider's built-in transient codes.
    pub fn for_provider(provider: &str) -> Self {
        Self {
            policy: RetryPolicy::default(),
            detector: Arc::new(DefaultTransientErrorDetector::for_provider(provider)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn should_retry_on(&self, error: &QueryError) -> bool {
        self.detector.should_retry_on(error)
    }

    /// Run `operation`, retrying transient failures with backoff.
    pub fn execute<T, F>(&self, ctx: &ExecutionContext, operation: F) -> Result<T>
    where
        F: FnMut(&ExecutionContext) -> Result<T>,
    {
        self.execute_recorded(ctx, operation).map(|executed| executed.value)
    }

    /// Like [`execute`](Self::execute), also returning the transient
    /// failures that were retried before the operation succeeded.
    pub fn execute_recorded<T, F>(
        &self,
        ctx: &ExecutionContext,
        mut operation: F,
    ) -> Result<Executed<T>>
    where
        F: FnMut(&ExecutionContext) -> Result<T>,
    {
        if ctx.is_strategy_active() {
            return operation(ctx).map(Executed::first_try);
        }
        self.check_transaction(ctx)?;
        self.retry_loop(&ctx.nested(), &mut operation)
    }

    /// Like [`execute`](Self::execute), but on a transient failure first asks
    /// `verify_succeeded` whether the work took effect anyway.
    ///
    /// The hook runs through the same retry loop without further verification.
    /// `Some(value)` ends the execution successfully; `None` lets the original
    /// failure be retried.
    pub fn execute_verified<T, F, V>(
        &self,
        ctx: &ExecutionContext,
        mut operation: F,
        mut verify_succeeded: V,
    ) -> Result<T>
    where
        F: FnMut(&ExecutionContext) -> Result<T>,
        V: FnMut(&ExecutionContext) -> Result<Option<T>>,
    {
        if ctx.is_strategy_active() {
            return operation(ctx);
        }
        self.check_transaction(ctx)?;

        let nested = ctx.nested();
        let mut history = Vec::new();
        loop {
            check_cancelled(&nested)?;
            let error = match operation(&nested) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if self.detector.should_retry_on(&error) {
                debug!("Verifying whether the failed operation succeeded: {}", error);
                if let Some(value) = self.retry_loop(&nested, &mut verify_succeeded)?.value {
                    return Ok(value);
                }
            }
            let delay = self.on_failure(error, &mut history)?;
            sleep_blocking(&nested, delay)?;
        }
    }

    /// Async counterpart of [`execute`](Self::execute). The backoff wait
    /// suspends the task and wakes early on cancellation.
    pub async fn execute_async<T, F, Fut>(&self, ctx: &ExecutionContext, operation: F) -> Result<T>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_async_recorded(ctx, operation)
            .await
            .map(|executed| executed.value)
    }

    /// Async counterpart of [`execute_recorded`](Self::execute_recorded).
    pub async fn execute_async_recorded<T, F, Fut>(
        &self,
        ctx: &ExecutionContext,
        mut operation: F,
    ) -> Result<Executed<T>>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if ctx.is_strategy_active() {
            return operation(ctx.clone()).await.map(Executed::first_try);
        }
        self.check_transaction(ctx)?;
        self.retry_loop_async(&ctx.nested(), &mut operation).await
    }

    /// Async counterpart of [`execute_verified`](Self::execute_verified).
    pub async fn execute_async_verified<T, F, Fut, V, VFut>(
        &self,
        ctx: &ExecutionContext,
        mut operation: F,
        mut verify_succeeded: V,
    ) -> Result<T>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
        V: FnMut(ExecutionContext) -> VFut,
        VFut: Future<Output = Result<Option<T>>>,
    {
        if ctx.is_strategy_active() {
            return operation(ctx.clone()).await;
        }
        self.check_transaction(ctx)?;

        let nested = ctx.nested();
        let mut history = Vec::new();
        loop {
            check_cancelled(&nested)?;
            let error = match operation(nested.clone()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if self.detector.should_retry_on(&error) {
                debug!("Verifying whether the failed operation succeeded: {}", error);
                if let Some(value) = self.retry_loop_async(&nested, &mut verify_succeeded).await?.value {
                    return Ok(value);
                }
            }
            let delay = self.on_failure(error, &mut history)?;
            sleep_async(&nested, delay).await?;
        }
    }

    fn retry_loop<T, F>(&self, ctx: &ExecutionContext, operation: &mut F) -> Result<Executed<T>>
    where
        F: FnMut(&ExecutionContext) -> Result<T>,
    {
        let mut history = Vec::new();
        loop {
            check_cancelled(ctx)?;
            match operation(ctx) {
                Ok(value) => {
                    return Ok(Executed {
                        value,
                        exceptions_encountered: history,
                    })
                }
                Err(error) => {
                    let delay = self.on_failure(error, &mut history)?;
                    sleep_blocking(ctx, delay)?;
                }
            }
        }
    }

    async fn retry_loop_async<T, F, Fut>(
        &self,
        ctx: &ExecutionContext,
        operation: &mut F,
    ) -> Result<Executed<T>>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut history = Vec::new();
        loop {
            check_cancelled(ctx)?;
            match operation(ctx.clone()).await {
                Ok(value) => {
                    return Ok(Executed {
                        value,
                        exceptions_encountered: history,
                    })
                }
                Err(error) => {
                    let delay = self.on_failure(error, &mut history)?;
                    sleep_async(ctx, delay).await?;
                }
            }
        }
    }

    fn check_transaction(&self, ctx: &ExecutionContext) -> Result<()> {
        if ctx.has_open_transaction() {
            return Err(QueryError::TransactionConflict);
        }
        Ok(())
    }

    /// Record a failure and decide what happens next: `Ok(delay)` to retry,
    /// or the error that ends the execution.
    fn on_failure(&self, error: QueryError, history: &mut Vec<QueryError>) -> Result<Duration> {
        if !self.detector.should_retry_on(&error) {
            return Err(error);
        }

        let attempt = history.len();
        if attempt + 1 >= self.policy.max_retry_count {
            warn!(
                "Giving up after {} transient failures: {}",
                attempt + 1,
                error
            );
            return Err(QueryError::RetryLimitExceeded {
                retries: self.policy.max_retry_count,
                source: Box::new(error),
                history: std::mem::take(history),
            });
        }

        let delay = self.policy.next_delay(attempt);
        warn!(
            "Transient failure, retry {}/{} in {:?}: {}",
            attempt + 1,
            self.policy.max_retry_count,
            delay,
            error
        );
        history.push(error);
        Ok(delay)
    }
}

fn check_cancelled(ctx: &ExecutionContext) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(QueryError::Cancelled);
    }
    Ok(())
}

fn sleep_blocking(ctx: &ExecutionContext, delay: Duration) -> Result<()> {
    check_cancelled(ctx)?;
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
    Ok(())
}

async fn sleep_async(ctx: &ExecutionContext, delay: Duration) -> Result<()> {
    check_cancelled(ctx)?;
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = ctx.cancellation_token().cancelled() => Err(QueryError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    fn deadlock() -> QueryError {
        QueryError::database("deadlock victim", Some("1205"))
    }

    fn fast_strategy(max_retry_count: i64) -> ExecutionStrategy {
        ExecutionStrategy::new(
            RetryPolicy::new(max_retry_count, 0).unwrap(),
            Arc::new(DefaultTransientErrorDetector::for_provider("mssql")),
        )
        .unwrap()
    }

    #[test]
    fn test_succeeds_after_fewer_failures_than_limit() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let result = strategy.execute(&ExecutionContext::new(), |_| {
            calls += 1;
            if calls <= 5 {
                Err(deadlock())
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 6);
    }

    #[test]
    fn test_records_each_transient_failure_before_success() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let executed = strategy
            .execute_recorded(&ExecutionContext::new(), |_| {
                calls += 1;
                if calls <= 2 {
                    Err(QueryError::database(format!("failure {}", calls), Some("1205")))
                } else {
                    Ok(3)
                }
            })
            .unwrap();

        assert_eq!(executed.value, 3);
        assert_eq!(executed.exceptions_encountered.len(), 2);
        assert!(executed.exceptions_encountered[0].to_string().contains("failure 1"));
        assert!(executed.exceptions_encountered[1].to_string().contains("failure 2"));
    }

    #[test]
    fn test_first_try_success_records_nothing() {
        let strategy = fast_strategy(6);
        let executed = strategy
            .execute_recorded(&ExecutionContext::new(), |_| Ok("done"))
            .unwrap();
        assert_eq!(executed.value, "done");
        assert!(executed.exceptions_encountered.is_empty());
    }

    #[test]
    fn test_gives_up_at_limit() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let result: Result<()> = strategy.execute(&ExecutionContext::new(), |_| {
            calls += 1;
            Err(QueryError::database(format!("failure {}", calls), Some("1205")))
        });

        assert_eq!(calls, 6);
        match result {
            Err(QueryError::RetryLimitExceeded { retries, source, history }) => {
                assert_eq!(retries, 6);
                assert_eq!(history.len(), 5);
                assert!(source.to_string().contains("failure 6"));
                assert!(history[0].to_string().contains("failure 1"));
            }
            other => panic!("expected retry limit, got {:?}", other),
        }
    }

    #[test]
    fn test_non_transient_error_not_retried() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let result: Result<()> = strategy.execute(&ExecutionContext::new(), |_| {
            calls += 1;
            Err(QueryError::database("syntax error", Some("102")))
        });

        assert_eq!(calls, 1);
        assert_eq!(result.unwrap_err().database_code(), Some("102"));
    }

    #[test]
    fn test_nested_execution_runs_once() {
        let outer = fast_strategy(3);
        let inner = fast_strategy(6);
        let mut inner_calls = 0;

        let result: Result<()> = outer.execute(&ExecutionContext::new(), |ctx| {
            inner.execute(ctx, |_| {
                inner_calls += 1;
                Err(deadlock())
            })
        });

        assert!(matches!(result, Err(QueryError::RetryLimitExceeded { .. })));
        assert_eq!(inner_calls, 3);
    }

    #[test]
    fn test_open_transaction_rejected() {
        let strategy = fast_strategy(3);
        let ctx = ExecutionContext::new().with_open_transaction(true);
        let mut calls = 0;
        let result = strategy.execute(&ctx, |_| {
            calls += 1;
            Ok(())
        });

        assert!(matches!(result, Err(QueryError::TransactionConflict)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_verification_short_circuits_retry() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let mut verifications = 0;
        let result = strategy.execute_verified(
            &ExecutionContext::new(),
            |_| {
                calls += 1;
                Err(deadlock())
            },
            |_| {
                verifications += 1;
                Ok(Some("committed"))
            },
        );

        assert_eq!(result.unwrap(), "committed");
        assert_eq!(calls, 1);
        assert_eq!(verifications, 1);
    }

    #[test]
    fn test_verification_none_retries_original() {
        let strategy = fast_strategy(6);
        let mut calls = 0;
        let result = strategy.execute_verified(
            &ExecutionContext::new(),
            |_| {
                calls += 1;
                if calls == 1 {
                    Err(deadlock())
                } else {
                    Ok(7)
                }
            },
            |_| Ok(None),
        );

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_cancelled_before_first_call() {
        let strategy = fast_strategy(3);
        let token = CancellationToken::new();
        token.cancel();
        let mut calls = 0;
        let result = strategy.execute(&ExecutionContext::with_cancellation(token), |_| {
            calls += 1;
            Ok(())
        });

        assert!(matches!(result, Err(QueryError::Cancelled)));
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_retries_with_backoff() {
        let strategy = ExecutionStrategy::for_provider("postgres");
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        let result = strategy
            .execute_async(&ExecutionContext::new(), |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 3 {
                        Err(QueryError::database("serialization failure", Some("40001")))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        // Delays for attempts 0, 1 and 2 are 0s, ~1s and ~3s.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_records_each_transient_failure() {
        let strategy = fast_strategy(6);
        let calls = Arc::new(AtomicUsize::new(0));
        let executed = strategy
            .execute_async_recorded(&ExecutionContext::new(), |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 4 {
                        Err(deadlock())
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(executed.exceptions_encountered.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_gives_up_at_limit() {
        let strategy = ExecutionStrategy::for_provider("postgres");
        let calls = AtomicUsize::new(0);

        let result: Result<()> = strategy
            .execute_async(&ExecutionContext::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(QueryError::database("deadlock", Some("40P01"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(matches!(
            result,
            Err(QueryError::RetryLimitExceeded { retries: 6, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_cancellation_interrupts_backoff() {
        let strategy = ExecutionStrategy::for_provider("postgres");
        let token = CancellationToken::new();
        let ctx = ExecutionContext::with_cancellation(token.clone());
        let calls = AtomicUsize::new(0);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel();
        });

        let result: Result<()> = strategy
            .execute_async(&ctx, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(QueryError::database("deadlock", Some("40P01"))) }
            })
            .await;

        canceller.await.unwrap();
        assert!(matches!(result, Err(QueryError::Cancelled)));
        // First delay is zero, the second (~1s) is interrupted.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_nested_runs_once() {
        let outer = ExecutionStrategy::for_provider("postgres");
        let inner = ExecutionStrategy::for_provider("postgres");
        let inner_calls = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = outer
            .execute_async(&ExecutionContext::new(), |ctx| {
                let inner = inner.clone();
                let inner_calls = inner_calls.clone();
                async move {
                    inner
                        .execute_async(&ctx, |_| {
                            inner_calls.fetch_add(1, Ordering::SeqCst);
                            async { Err(QueryError::database("deadlock", Some("40P01"))) }
                        })
                        .await
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(inner_calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_verified_success() {
        let strategy = ExecutionStrategy::for_provider("mssql");
        let result = strategy
            .execute_async_verified(
                &ExecutionContext::new(),
                |_| async { Err(QueryError::database("connection dropped", Some("10054"))) },
                |_| async { Ok(Some(1_u64)) },
            )
            .await;

        assert_eq!(result.unwrap(), 1);
    }
}
