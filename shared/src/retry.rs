use crate::error::BenchmarkError;
use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Linear backoff with jitter: retry `n` waits `n * step` plus up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub step: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Nine retries, ten attempts in total.
    pub const fn standard() -> Self {
        Self {
            max_retries: 9,
            step: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
        }
    }

    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            step: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        let jitter = self.jitter.mul_f64(rand::thread_rng().gen::<f64>());
        self.step * retry + jitter
    }

    /// Runs `operation` until it succeeds or the retries are used up, at which
    /// point the last error is wrapped in `BenchmarkError::RetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, call: &str, region: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.delay(retries);
                    warn!(
                        call,
                        region,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Call failed, retrying: {:#}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(BenchmarkError::RetriesExhausted {
                        call: call.to_string(),
                        region: region.to_string(),
                        attempts: retries + 1,
                        last_error: format!("{:#}", err),
                    }
                    .into())
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
