use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};
use crate::core::error::{Error, ErrorKind, Result};

/// Outcome of one attempt inside a bounded retry loop
pub enum Attempt<T> {
    Done(T),
    Retry,
}

/// Bounded retry with a fixed sleep between attempts.
///
/// The loop stops at whichever bound is hit first: `max_attempts` or the total
/// `budget` of time spent sleeping. Exhaustion is reported as `LockTimeout`;
/// errors returned by the attempt itself are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub budget: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration, budget: Duration) -> Self {
        RetryPolicy { max_attempts, interval, budget }
    }

    /// Attempts limited only by count
    pub fn attempts(max_attempts: u32, interval: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            interval,
            budget: interval * max_attempts,
        }
    }

    /// Attempts limited only by total wait, polling every `interval`
    pub fn timeout(budget: Duration, interval: Duration) -> Self {
        let polls = if interval.is_zero() {
            1
        } else {
            (budget.as_millis() / interval.as_millis().max(1)) as u32 + 1
        };
        RetryPolicy {
            max_attempts: polls,
            interval,
            budget,
        }
    }

    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<Attempt<T>>,
    {
        let started = Instant::now();
        let mut waited = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if let Attempt::Done(value) = op(attempt)? {
                return Ok(value);
            }

            if attempt >= self.max_attempts || waited + self.interval > self.budget {
                error!(
                    label,
                    attempts = attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "retry budget exhausted"
                );
                return Err(Error::new(
                    ErrorKind::LockTimeout,
                    format!("{}: gave up after {} attempts", label, attempt),
                ));
            }

            debug!(label, attempt, interval_ms = self.interval.as_millis() as u64, "retrying");
            thread::sleep(self.interval);
            waited += self.interval;
        }
    }
}
