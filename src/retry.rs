// src/retry.rs
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff parameters for transient sink failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    // Doubles per attempt, plus sub-second jitter so simultaneous
    // workers do not retry in lockstep.
    fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let jitter: f64 = rand::thread_rng().gen_range(0.1..1.0);
        Duration::from_secs_f64(backoff + jitter)
    }
}

/// Run `op`, retrying while `is_retryable` holds, up to the policy's
/// attempt budget. Non-retryable errors and the final attempt's error
/// are returned as-is.
pub async fn retry<T, E, Fut, Op, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: Op,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
    Op: FnMut() -> Fut,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < policy.max_attempts && is_retryable(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed ({}); retrying in {:.1}s",
                    attempt + 1,
                    policy.max_attempts,
                    err,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
