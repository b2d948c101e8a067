use std::{future::Future, time::Duration};

use stacked_errors::{Error, Result, StackableErr};
use tokio::{
    select,
    time::{sleep, Instant},
};
use tracing::debug;

use crate::{ExecError, Interrupt};

/// Deadline and poll cadence of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Exceeding this is a timeout error, never a retry
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitOptions {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Repeatedly calls `probe` every `options.interval` until it returns
/// `Ok(true)`. The probe is tried once more at the deadline before giving up.
///
/// - `Ok(false)` means "not yet", and the loop continues.
/// - An `Err` from the probe is returned immediately with `what` stacked on.
/// - Reaching `options.timeout` returns an error for which
///   [Error::is_timeout] is true.
/// - A pending or arriving [Interrupt] is consumed and returns
///   [ExecError::Cancelled].
pub async fn wait_for<F, Fut>(
    what: &str,
    options: WaitOptions,
    interrupt: &Interrupt,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u64;
    loop {
        if interrupt.issued_reset() {
            return Err(Error::from_err(ExecError::Cancelled(format!(
                "waiting for {what}"
            ))))
        }
        attempts += 1;
        if probe()
            .await
            .stack_err_with(|| format!("wait_for({what}) -> probe failed"))?
        {
            debug!(what, attempts, "wait condition reached");
            return Ok(())
        }
        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            return Err(Error::timeout().add_err_locationless(format!(
                "wait_for({what}) timeout after {:?} ({attempts} attempts)",
                options.timeout
            )))
        }
        debug!(what, attempts, "wait condition not reached yet");
        let delay = options.interval.min(options.timeout - elapsed);
        select! {
            _ = sleep(delay) => (),
            _ = interrupt.notified() => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    use super::*;

    const FAST: WaitOptions = WaitOptions::new(Duration::from_millis(60), Duration::from_millis(5));

    #[tokio::test]
    async fn reaches_condition() {
        let count = Arc::new(AtomicU64::new(0));
        let res = wait_for("counter", FAST, &Interrupt::new(), || {
            let count = Arc::clone(&count);
            async move { Ok(count.fetch_add(1, Ordering::SeqCst) >= 2) }
        })
        .await;
        assert!(res.is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_reached_is_timeout() {
        let err = wait_for("nothing", FAST, &Interrupt::new(), || async { Ok(false) })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn zero_timeout_probes_once() {
        let count = Arc::new(AtomicU64::new(0));
        let options = WaitOptions::new(Duration::ZERO, Duration::from_secs(1));
        let err = wait_for("once", options, &Interrupt::new(), || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            }
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_error_is_not_timeout() {
        let err = wait_for("broken", FAST, &Interrupt::new(), || async {
            Err::<bool, _>(Error::from_err_locationless(std::io::Error::other(
                "remote call failed",
            )))
        })
        .await
        .unwrap_err();
        assert!(!err.is_timeout());
        assert!(format!("{err:?}").contains("remote call failed"));
    }

    #[tokio::test]
    async fn interrupt_cancels() {
        let interrupt = Interrupt::new();
        let options = WaitOptions::new(Duration::from_secs(30), Duration::from_secs(10));
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            trigger.trigger();
        });
        let start = Instant::now();
        let err = wait_for("interruptible", options, &interrupt, || async { Ok(false) })
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(format!("{err:?}").contains("cancelled"));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!interrupt.is_issued());
    }

    #[tokio::test]
    async fn interrupt_during_a_slow_remote_call() {
        let interrupt = Interrupt::new();
        let options = WaitOptions::new(Duration::from_secs(60), Duration::from_secs(30));
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });
        let start = Instant::now();
        let err = wait_for("slow remote", options, &interrupt, || async {
            sleep(Duration::from_millis(100)).await;
            Ok(false)
        })
        .await
        .unwrap_err();
        assert!(format!("{err:?}").contains("cancelled"));
        // seen as soon as the remote call returns, not one interval later
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
