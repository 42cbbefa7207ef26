//! Fan-out coordinator.
//!
//! [`fan_out`] launches one task per worker index, waits for every task to
//! finish, and returns a [`FanOutReport`] holding exactly one
//! [`WorkerOutcome`] per index. Workers are never cancelled: a failure in one
//! worker is reported only after its siblings have run to completion.

use std::future::Future;
use std::num::NonZeroUsize;

use futures::future::join_all;
use tracing::{Instrument, info_span, warn};

use crate::error::{HarnessError, HarnessResult};

/// Fan-out width: the positive number of concurrent workers per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    /// A single worker.
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    /// Create a width, returning `None` for zero.
    #[must_use]
    pub fn new(width: usize) -> Option<Self> {
        NonZeroUsize::new(width).map(Self)
    }

    /// The width as a plain count.
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for Concurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one worker reported.
#[derive(Debug)]
pub enum WorkerOutcome<T> {
    /// The worker's operation succeeded.
    Success(T),
    /// The worker's operation failed.
    Failure(HarnessError),
}

impl<T> WorkerOutcome<T> {
    /// Whether the worker succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<T> From<HarnessResult<T>> for WorkerOutcome<T> {
    fn from(result: HarnessResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Outcomes of one fanned-out step, indexed by worker.
#[derive(Debug)]
pub struct FanOutReport<T> {
    outcomes: Vec<WorkerOutcome<T>>,
}

impl<T> FanOutReport<T> {
    /// Number of workers that reported; always the fan-out width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.outcomes.len()
    }

    /// Per-worker outcomes in index order.
    #[must_use]
    pub fn outcomes(&self) -> &[WorkerOutcome<T>] {
        &self.outcomes
    }

    /// Number of successful workers.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// The failure of the lowest-indexed failing worker, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<(usize, &HarnessError)> {
        self.outcomes.iter().enumerate().find_map(|(i, o)| match o {
            WorkerOutcome::Failure(err) => Some((i, err)),
            WorkerOutcome::Success(_) => None,
        })
    }

    /// Reduce to a single result: every value in index order, or the first
    /// error by worker index.
    pub fn into_result(self) -> HarnessResult<Vec<T>> {
        let mut values = Vec::with_capacity(self.outcomes.len());
        for outcome in self.outcomes {
            match outcome {
                WorkerOutcome::Success(value) => values.push(value),
                WorkerOutcome::Failure(err) => return Err(err),
            }
        }
        Ok(values)
    }
}

/// Run `task(index)` for every index in `0..width` concurrently and wait for
/// all of them.
///
/// Each worker runs in its own tokio task inside a `worker` span. A worker
/// that panics is reported as [`HarnessError::WorkerPanicked`].
///
/// # Examples
///
/// ```
/// use s3verify_core::fanout::{Concurrency, fan_out};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let report = rt.block_on(fan_out(Concurrency::new(3).unwrap(), |i| async move {
///     Ok(i * 10)
/// }));
/// assert_eq!(report.into_result().unwrap(), vec![0, 10, 20]);
/// ```
pub async fn fan_out<T, F, Fut>(width: Concurrency, task: F) -> FanOutReport<T>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = HarnessResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = (0..width.get())
        .map(|index| tokio::spawn(task(index).instrument(info_span!("worker", index))))
        .collect();

    let outcomes = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| {
            let result = joined.unwrap_or_else(|e| {
                Err(HarnessError::WorkerPanicked {
                    index,
                    message: e.to_string(),
                })
            });
            if let Err(err) = &result {
                warn!(index, error = %err, "worker failed");
            }
            WorkerOutcome::from(result)
        })
        .collect();

    FanOutReport { outcomes }
}
