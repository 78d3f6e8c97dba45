//! A single shared bounded-exponential-backoff helper, parameterized so
//! every retry class (connect, query/S3, queue-loop reconnect) in the
//! worker is built from the same primitive.

use std::future::Future;
use std::time::Duration;

use exponential_backoff::Backoff;

/// One of the three retry classes: connect (0.2s base, 10 tries), query/S3
/// (0.5s base, 3 tries), queue-loop reconnect (0.5s base, 5 tries).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base: Duration,
    tries: u32,
}

impl RetryPolicy {
    pub const fn new(base: Duration, tries: u32) -> Self {
        Self { base, tries }
    }

    pub const fn connect() -> Self {
        Self::new(Duration::from_millis(200), 10)
    }

    pub const fn query() -> Self {
        Self::new(Duration::from_millis(500), 3)
    }

    pub const fn queue_reconnect() -> Self {
        Self::new(Duration::from_millis(500), 5)
    }

    fn backoff(self) -> Backoff {
        Backoff::new(self.tries, self.base, Some(self.base * 64))
    }

    /// Run `op` until it succeeds or the policy's attempt budget is spent.
    /// `op` is called fresh on every attempt since futures aren't `Clone`.
    pub async fn run<T, E, F, Fut>(self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let backoff = self.backoff();
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    match backoff.next(attempt) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(Duration::from_millis(1), 5);
        let result: Result<u32, &str> = policy
            .run(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("not yet")
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn gives_up_after_budget_exhausted() {
        let policy = RetryPolicy::new(Duration::from_millis(1), 2);
        let result: Result<(), &str> = policy.run(|| async { Err("still broken") }).await;
        assert_eq!(result, Err("still broken"));
    }
}
