use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use stacked_errors::StackableErr;
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{info, Instrument, Level};

/// A shared "Ctrl-C was issued" flag. Whoever is suspended when it is set is
/// woken up and decides what the interrupt means at that point. The flag stays
/// set until something calls [Interrupt::issued_reset].
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    issued: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes anything waiting in [Interrupt::notified]
    pub fn trigger(&self) {
        self.issued.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Returns if an interrupt is pending without consuming it
    pub fn is_issued(&self) -> bool {
        self.issued.load(Ordering::SeqCst)
    }

    /// Returns if an interrupt has been issued, and resets it to `false`
    pub fn issued_reset(&self) -> bool {
        self.issued.swap(false, Ordering::SeqCst)
    }

    /// Resolves once an interrupt is pending. Returns immediately if one was
    /// issued before this was called and has not been reset yet.
    pub async fn notified(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // registered before the flag is read, so a concurrent `trigger` either
        // sets the flag first or wakes this waiter
        notified.as_mut().enable();
        if self.is_issued() {
            return
        }
        notified.await
    }

    /// Spawns a task that triggers `self` on every Ctrl-C received by this
    /// process. While it runs, Ctrl-C no longer terminates the process.
    pub fn listen_for_ctrlc(&self) -> JoinHandle<()> {
        let this = self.clone();
        let span = tracing::span!(Level::INFO, "ctrlc handler");
        tokio::task::spawn(
            async move {
                loop {
                    if tokio::signal::ctrl_c()
                        .await
                        .stack_err("Failed to wait for ctrlc")
                        .inspect_err(|err| tracing::error!("{err}"))
                        .is_err()
                    {
                        break
                    }
                    info!("ctrlc detected");
                    this.trigger();
                }
            }
            .instrument(span),
        )
    }
}
