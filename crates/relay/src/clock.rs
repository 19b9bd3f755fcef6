use std::time::Duration;

use async_trait::async_trait;

/// Time source for the orchestrator's fixed delays (warm-up, drain window),
/// injectable so tests can observe requested sleeps instead of serving them.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
