use crate::error::{BlockError, BlockResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-request execution context for storage calls.
///
/// Every store and registry operation runs through [`RequestContext::run`],
/// which aborts the database future when the token is cancelled or the
/// timeout elapses. Dropping the future drops any open `sqlx::Transaction`,
/// so an aborted operation is rolled back rather than partially applied.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tie this context to a caller-owned token (e.g. the request's).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run one unit of storage work under this context.
    pub async fn run<T, F>(&self, work: F) -> BlockResult<T>
    where
        F: Future<Output = BlockResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(BlockError::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, work)
                    .await
                    .map_err(|_| BlockError::Timeout(limit))?,
                None => work.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BlockError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { Ok::<_, BlockError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_work() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        token.cancel();

        let mut ran = false;
        let result = ctx
            .run(async {
                ran = true;
                Ok::<_, BlockError>(())
            })
            .await;

        assert!(matches!(result, Err(BlockError::Cancelled)));
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_work() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, BlockError>(())
            })
            .await;

        canceller.await.unwrap();
        assert!(matches!(result, Err(BlockError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout_elapses() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, BlockError>(())
            })
            .await;

        assert!(matches!(result, Err(BlockError::Timeout(d)) if d == Duration::from_millis(10)));
    }
}
