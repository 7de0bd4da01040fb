//! Completion polling for asynchronous vendor operations
//!
//! Vendor create/start/stop/delete calls return before the resource is
//! usable. These helpers poll until a condition holds or a timeout elapses.
//!
//! The first poll runs immediately. Between polls the caller's task sleeps
//! for `interval`, shortened so it never sleeps past the deadline. Polls
//! never overlap and nothing runs in the background; dropping the future
//! abandons the wait.

use crate::error::{CloudError, Result};
use crate::resource::CloudResource;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Deadline bookkeeping shared by the wait helpers
struct Poller {
    interval: Duration,
    timeout: Duration,
    deadline: Instant,
    polls: u32,
}

impl Poller {
    fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            deadline: Instant::now() + timeout,
            polls: 0,
        }
    }

    /// Sleep until the next poll, or fail once the deadline has passed
    async fn tick(&mut self, what: impl FnOnce() -> String) -> Result<()> {
        self.polls += 1;
        let now = Instant::now();
        if now >= self.deadline {
            return Err(CloudError::Timeout(format!(
                "{} after {:?} ({} polls)",
                what(),
                self.timeout,
                self.polls
            )));
        }
        sleep(self.interval.min(self.deadline - now)).await;
        Ok(())
    }
}

/// Poll `predicate` until it reports done.
///
/// `Ok(true)` ends the wait successfully. An `Err` is returned immediately
/// without further polling; a predicate that wants to tolerate an error
/// should return `Ok(false)` instead.
pub async fn wait<F, Fut>(interval: Duration, timeout: Duration, mut predicate: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let mut poller = Poller::new(interval, timeout);
    loop {
        if predicate().await? {
            tracing::debug!("wait condition met after {} polls", poller.polls + 1);
            return Ok(());
        }
        poller.tick(|| "condition not met".to_string()).await?;
    }
}

/// Refresh `resource` until its status equals `target`
pub async fn wait_status<R>(
    resource: &mut R,
    target: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()>
where
    R: CloudResource + ?Sized,
{
    wait_multi_status(resource, &[target], interval, timeout)
        .await
        .map(|_| ())
}

/// Refresh `resource` until its status is one of `targets`; returns the
/// status that was reached.
pub async fn wait_multi_status<R>(
    resource: &mut R,
    targets: &[&str],
    interval: Duration,
    timeout: Duration,
) -> Result<String>
where
    R: CloudResource + ?Sized,
{
    let mut poller = Poller::new(interval, timeout);
    loop {
        resource.refresh().await?;
        let status = resource.status();
        if targets.contains(&status.as_str()) {
            tracing::debug!("{} reached status {}", resource.global_id(), status);
            return Ok(status);
        }
        tracing::debug!(
            "{} status {}, waiting for {:?}",
            resource.global_id(),
            status,
            targets
        );
        poller
            .tick(|| {
                format!(
                    "{} still {} waiting for {:?}",
                    resource.global_id(),
                    status,
                    targets
                )
            })
            .await?;
    }
}

/// Refresh `resource` until the vendor no longer knows it.
///
/// Succeeds once `refresh` fails with a not-found error; any other error is
/// returned as is.
pub async fn wait_deleted<R>(resource: &mut R, interval: Duration, timeout: Duration) -> Result<()>
where
    R: CloudResource + ?Sized,
{
    let mut poller = Poller::new(interval, timeout);
    loop {
        match resource.refresh().await {
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} is gone", resource.global_id());
                return Ok(());
            }
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        let status = resource.status();
        poller
            .tick(|| format!("{} not deleted, status {}", resource.global_id(), status))
            .await?;
    }
}
