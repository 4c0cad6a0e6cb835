//! Completion barrier: a bounded wait for a known number of completions.
//!
//! Each operation reports through a [`CompletionSender`]; the owner of the
//! [`CompletionBarrier`] waits until all of them arrived or the deadline passed.
//! Timing out never cancels the operations themselves.

use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

/// Default upper bound for a synchronous batch.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug)]
pub enum BarrierOutcome<T> {
    /// Every expected completion arrived
    Complete(Vec<T>),
    /// The deadline passed (or all senders were dropped) first
    TimedOut { received: Vec<T>, outstanding: usize },
}

pub struct CompletionSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for CompletionSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> CompletionSender<T> {
    /// Report one completion. A barrier that already gave up just drops it.
    pub fn complete(&self, item: T) {
        if self.tx.send(item).is_err() {
            debug!("Completion reported after the barrier stopped waiting");
        }
    }
}

pub struct CompletionBarrier<T> {
    rx: mpsc::UnboundedReceiver<T>,
    expected: usize,
}

pub fn completion_channel<T>(expected: usize) -> (CompletionSender<T>, CompletionBarrier<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionBarrier { rx, expected })
}

impl<T> CompletionBarrier<T> {
    pub async fn wait(mut self, max_wait: Duration) -> BarrierOutcome<T> {
        let deadline = Instant::now() + max_wait;
        let mut received = Vec::with_capacity(self.expected);

        while received.len() < self.expected {
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(item)) => received.push(item),
                Ok(None) => {
                    debug!("All completion senders dropped early");
                    break;
                }
                Err(_) => break,
            }
        }

        if received.len() == self.expected {
            BarrierOutcome::Complete(received)
        } else {
            let outstanding = self.expected - received.len();
            BarrierOutcome::TimedOut {
                received,
                outstanding,
            }
        }
    }
}
