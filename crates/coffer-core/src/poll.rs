//! Bounded polling for eventually consistent mutations.
//!
//! Deleting or recovering a vault resource returns before the new state is
//! visible to reads. `perform_and_wait` runs the mutation exactly once,
//! then retries a read probe while it reports not-found, with a fixed
//! delay between attempts and a hard attempt budget.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time;
use tracing::debug;

/// Splits probe errors into the one retriable condition.
///
/// Not-found means propagation has not caught up yet and another attempt
/// may succeed. Every other error is final.
pub trait Classify {
    fn is_not_found(&self) -> bool;
}

/// Attempt budget and inter-attempt delay for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Maximum number of probe attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between consecutive probe attempts.
    pub retry_delay: Duration,
}

impl PollSettings {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }
}

impl Default for PollSettings {
    /// 15 attempts, 3 seconds apart. Covers the propagation window of
    /// vault soft-delete and recovery transitions with room to spare.
    fn default() -> Self {
        Self {
            max_attempts: 15,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Why a polling call gave up.
#[derive(Debug, Error)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    /// The mutating operation itself failed. No probe was attempted.
    #[error("operation failed before polling started")]
    Operation(#[source] E),

    /// A probe failed with something other than not-found.
    #[error("probe failed with a non-retriable error")]
    Probe(#[source] E),

    /// Every attempt in the budget reported not-found.
    #[error("still not visible after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    /// The shutdown signal fired while waiting.
    #[error("polling cancelled")]
    Cancelled,
}

/// Run `operation` once, then poll `probe` until its target is visible.
///
/// The operation is never retried; if it fails, its error is returned and
/// no probe runs. On success the operation's result is discarded and the
/// first successful probe result is returned instead.
pub async fn perform_and_wait<OpFut, P, Fut, R, T, E>(
    operation: OpFut,
    probe: P,
    settings: PollSettings,
) -> Result<T, PollError<E>>
where
    OpFut: Future<Output = Result<R, E>>,
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::error::Error + 'static,
{
    perform_and_wait_cancellable(operation, probe, settings, std::future::pending::<()>()).await
}

/// `perform_and_wait` with a shutdown future.
///
/// When `shutdown` completes first, the pending sleep or probe is dropped
/// and `Cancelled` is returned. The operation itself is not interrupted;
/// it either runs to completion or was never started.
pub async fn perform_and_wait_cancellable<OpFut, P, Fut, R, T, E>(
    operation: OpFut,
    probe: P,
    settings: PollSettings,
    shutdown: impl Future<Output = ()>,
) -> Result<T, PollError<E>>
where
    OpFut: Future<Output = Result<R, E>>,
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::error::Error + 'static,
{
    operation.await.map_err(PollError::Operation)?;
    poll_until_visible_cancellable(probe, settings, shutdown).await
}

/// Poll `probe` until it stops reporting not-found.
///
/// The budget is spent only on not-found outcomes; any other probe error
/// ends the loop immediately. The delay runs strictly between attempts:
/// never before the first probe, never after the last.
pub async fn poll_until_visible<P, Fut, T, E>(
    probe: P,
    settings: PollSettings,
) -> Result<T, PollError<E>>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::error::Error + 'static,
{
    poll_until_visible_cancellable(probe, settings, std::future::pending::<()>()).await
}

/// `poll_until_visible` with a shutdown future.
pub async fn poll_until_visible_cancellable<P, Fut, T, E>(
    mut probe: P,
    settings: PollSettings,
    shutdown: impl Future<Output = ()>,
) -> Result<T, PollError<E>>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + std::error::Error + 'static,
{
    tokio::pin!(shutdown);

    let mut attempt = 0;
    loop {
        if attempt == settings.max_attempts {
            return Err(PollError::AttemptsExhausted { attempts: attempt });
        }
        attempt += 1;

        // select! evaluates branch expressions before polling anything, so
        // the probe call sits inside an async block: it only runs once the
        // shutdown branch has been checked and found pending.
        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => return Err(PollError::Cancelled),
            outcome = async { probe().await } => outcome,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_not_found() => {
                if attempt == settings.max_attempts {
                    return Err(PollError::AttemptsExhausted { attempts: attempt });
                }
                debug!(attempt, max = settings.max_attempts, "not visible yet, retrying");
                tokio::select! {
                    biased;
                    _ = &mut shutdown => return Err(PollError::Cancelled),
                    _ = time::sleep(settings.retry_delay) => {}
                }
            }
            Err(err) => return Err(PollError::Probe(err)),
        }
    }
}
