//! Bounded polling for eventually consistent state.
//!
//! After a delete the read path may keep reporting the object for a while, and
//! a freshly created bucket may not be visible yet. [`ConsistencyWaiter`] polls
//! an existence probe until it reports the expected state, and fails with
//! [`HarnessError::ConsistencyTimeout`] once its attempt budget is spent.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::{Backoff, WaitConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::store::ObjectStore;

/// The existence state a waiter polls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedState {
    /// The resource must be observable.
    Present,
    /// The resource must no longer be observable.
    Absent,
}

impl ExpectedState {
    fn is_met_by(self, exists: bool) -> bool {
        match self {
            Self::Present => exists,
            Self::Absent => !exists,
        }
    }
}

impl fmt::Display for ExpectedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::Absent => "absent",
        })
    }
}

/// Polls existence probes with a fixed or exponentially growing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyWaiter {
    interval: Duration,
    max_interval: Duration,
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for ConsistencyWaiter {
    fn default() -> Self {
        Self::new(&WaitConfig::default())
    }
}

impl ConsistencyWaiter {
    /// Build a waiter from its configuration block.
    #[must_use]
    pub fn new(config: &WaitConfig) -> Self {
        Self {
            interval: config.interval(),
            max_interval: config.max_interval(),
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
        }
    }

    /// Probes issued before giving up.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep after the `attempt`-th unsuccessful probe (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let factor = 1u32
                    .checked_shl(attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                self.interval.saturating_mul(factor).min(self.max_interval)
            }
        }
    }

    /// Poll `probe` until it reports `expected`.
    ///
    /// `probe` answers whether the resource currently exists. The first probe
    /// runs immediately. A probe error ends the wait and is returned as is.
    /// Returns the number of probes issued.
    pub async fn wait_until<F, Fut>(
        &self,
        target: &str,
        expected: ExpectedState,
        mut probe: F,
    ) -> HarnessResult<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = HarnessResult<bool>>,
    {
        let start = Instant::now();
        for attempt in 1..=self.max_attempts {
            let exists = probe().await?;
            if expected.is_met_by(exists) {
                debug!(target, %expected, attempt, "consistency reached");
                return Ok(attempt);
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay_after(attempt)).await;
            }
        }

        Err(HarnessError::ConsistencyTimeout {
            target: target.to_owned(),
            expected,
            attempts: self.max_attempts,
            elapsed: start.elapsed(),
        })
    }

    /// Wait until `HeadObject` stops finding `bucket/key`.
    pub async fn until_object_absent(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> HarnessResult<u32> {
        self.wait_until(&format!("{bucket}/{key}"), ExpectedState::Absent, move || {
            store.head_object(bucket, key)
        })
        .await
    }

    /// Wait until `HeadBucket` finds `bucket`.
    pub async fn until_bucket_exists(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
    ) -> HarnessResult<u32> {
        self.wait_until(bucket, ExpectedState::Present, move || store.head_bucket(bucket))
            .await
    }
}
