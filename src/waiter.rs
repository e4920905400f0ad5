//! Waiting for the one-time pairing handshake.
//!
//! The event side calls [`PairingSignal::fire`]; the main flow blocks in
//! [`PairingWaiter::wait`] until the signal is observed or the deadline passes.

use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Default time allowed for scanning the QR code.
pub const DEFAULT_PAIR_TIMEOUT: Duration = Duration::from_secs(120);

/// Default tick for [`WaitStrategy::Poll`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shorter poll intervals, including zero, are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Write-once "pairing succeeded" flag shared between the event handler and
/// the waiter. Once set it never goes back to false.
#[derive(Clone, Debug)]
pub struct PairingSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl PairingSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Mark pairing as done. Returns true only for the call that flipped it.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|paired| !std::mem::replace(paired, true))
    }

    pub fn is_paired(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for PairingSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiter states. `Paired` and `TimedOut` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairingState {
    AwaitingPairing,
    Paired,
    TimedOut,
}

/// How the waiter observes the signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Wake as soon as the signal fires.
    Notify,
    /// Check the flag on a fixed tick, the first check being immediate.
    Poll(Duration),
}

/// Blocks until the pairing signal fires or the deadline elapses.
#[derive(Debug)]
pub struct PairingWaiter {
    signal: PairingSignal,
    deadline: Duration,
    strategy: WaitStrategy,
    state: PairingState,
}

impl PairingWaiter {
    pub fn new(signal: PairingSignal, deadline: Duration) -> Self {
        Self {
            signal,
            deadline,
            strategy: WaitStrategy::Notify,
            state: PairingState::AwaitingPairing,
        }
    }

    pub fn with_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Run the state machine to a terminal state and return it.
    ///
    /// Calling again after a terminal state returns that state immediately.
    pub async fn wait(&mut self) -> PairingState {
        if self.state != PairingState::AwaitingPairing {
            return self.state;
        }
        tracing::debug!(
            deadline = ?self.deadline,
            strategy = ?self.strategy,
            "waiting for pairing"
        );
        let paired = match self.strategy {
            WaitStrategy::Notify => self.wait_notified().await,
            WaitStrategy::Poll(interval) => self.wait_polling(interval).await,
        };
        self.state = if paired {
            PairingState::Paired
        } else {
            PairingState::TimedOut
        };
        self.state
    }

    /// Like [`wait`](Self::wait), mapping `TimedOut` to [`Error::PairingTimeout`].
    pub async fn wait_paired(&mut self) -> Result<()> {
        match self.wait().await {
            PairingState::Paired => Ok(()),
            _ => Err(Error::PairingTimeout(self.deadline)),
        }
    }

    async fn wait_notified(&self) -> bool {
        let mut rx = self.signal.subscribe();
        // The sender lives in `self.signal`, so `wait_for` only ends by
        // observing `true` or by the timeout.
        let paired = matches!(
            time::timeout(self.deadline, rx.wait_for(|paired| *paired)).await,
            Ok(Ok(_))
        );
        paired
    }

    async fn wait_polling(&self, interval: Duration) -> bool {
        // `sleep` saturates deadlines too far in the future to represent.
        let deadline = time::sleep(self.deadline);
        tokio::pin!(deadline);
        let mut ticker = time::interval(interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if self.signal.is_paired() {
                        return true;
                    }
                }
                _ = &mut deadline => return false,
            }
        }
    }
}
