//! Exponential backoff for transient upstream failures.
//!
//! Shape mirrors the document store's lock-contention backoff: attempt
//! counter, doubling base delay, +/-25% jitter. Schema-validation failures
//! are never retried: callers classify their own errors via
//! [`Attempt`] and only `Attempt::Transient` triggers another round.

use std::time::Duration;

use rand::Rng;

/// Classification of a single gateway call's outcome, used to decide
/// whether [`retry_transient`] should try again.
pub enum Attempt<T, E> {
    /// Call succeeded.
    Ok(T),
    /// Call failed in a way that's worth retrying (network error, 5xx,
    /// rate-limit).
    Transient(E),
    /// Call failed in a way retrying cannot fix (schema mismatch).
    Permanent(E),
}

/// Retry `f` up to `max_attempts` times (the first call counts as attempt
/// 1) with exponential backoff between transient failures. Permanent
/// failures return immediately without retrying.
///
/// # Errors
/// Returns the last error seen, whether from exhausting transient retries
/// or from a permanent failure.
pub async fn retry_transient<F, Fut, T, E>(
    max_attempts: u32,
    base_delay: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Attempt<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match f().await {
            Attempt::Ok(value) => return Ok(value),
            Attempt::Permanent(err) => return Err(err),
            Attempt::Transient(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(attempt, "transient gateway failure, retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let exp = base_delay.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(8));
    let jitter_frac = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_secs_f64(exp.as_secs_f64() * jitter_frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_call_ok() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_transient(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Ok(42u32)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_up_to_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_transient(3, Duration::from_millis(1), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Attempt::Transient("boom")
            } else {
                Attempt::Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_transient(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Transient("still broken")
        })
        .await;
        assert_eq!(result, Err("still broken"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_never_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_transient(3, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Permanent("bad schema")
        })
        .await;
        assert_eq!(result, Err("bad schema"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
