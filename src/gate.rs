use std::time::Duration;
use tracing::{debug, instrument};

/// Fixed pacing between consecutive requests.
///
/// Every call to [`RateGate::wait`] sleeps for the full configured delay;
/// there is no burst allowance and no reaction to rate-limit responses.
#[derive(Debug, Clone)]
pub struct RateGate {
    delay: Duration,
}

impl RateGate {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[instrument(skip(self), fields(delay_ms = self.delay.as_millis() as u64))]
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        debug!("Pacing before next request");
        tokio::time::sleep(self.delay).await;
    }
}
