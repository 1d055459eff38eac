//! Upper bound on every storage round-trip made by the services.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::application::repos::RepoError;

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct StorageDeadline {
    limit: Duration,
}

impl StorageDeadline {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// Await `call`, turning an elapsed deadline into [`RepoError::Timeout`].
    pub async fn run<T, F>(&self, op: &'static str, call: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                counter!("pressroom_storage_timeout_total", "op" => op).increment(1);
                warn!(
                    target = "application::storage",
                    op,
                    limit_ms = self.limit.as_millis() as u64,
                    "storage call exceeded deadline"
                );
                Err(RepoError::Timeout)
            }
        }
    }
}

impl Default for StorageDeadline {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let deadline = StorageDeadline::new(Duration::from_millis(50));
        let result: Result<(), RepoError> = deadline
            .run("test.slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(RepoError::Timeout)));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let deadline = StorageDeadline::default();
        let value = deadline.run("test.fast", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
