// LotKeeper - Bounded polling
use std::future::Future;
use std::time::Duration;

use crate::error::KeeperError;

/// A fixed attempt count with a fixed delay between attempts. Cancellation
/// is purely budget-based; an attempt already in flight runs to completion.
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollBudget {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// Probe until it yields a value or the budget runs out.
///
/// A probe returning `Ok(None)` means "not yet". A probe returning `Err`
/// consumes an attempt like any other; transient ledger errors are absorbed
/// by the budget rather than retried internally or escalated.
pub async fn poll_until<T, F, Fut>(budget: PollBudget, mut probe: F) -> Result<T, KeeperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, KeeperError>>,
{
    for attempt in 0..budget.attempts {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) => {
                eprintln!(
                    "poll attempt {}/{} failed: {}",
                    attempt + 1,
                    budget.attempts,
                    err
                );
            }
        }
        if attempt + 1 < budget.attempts {
            tokio::time::sleep(budget.interval).await;
        }
    }
    Err(KeeperError::PollTimeout {
        attempts: budget.attempts,
    })
}
