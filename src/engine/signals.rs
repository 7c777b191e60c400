//! Engine output signal channel
//!
//! The engine reports the outcome of long-running commands through a
//! callback. The callback feeds a broadcast channel; a caller that needs a
//! confirmation arms a [`SignalWaiter`] *before* issuing the command and then
//! waits for the next signal(s) with a deadline.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace, warn};

use super::{Signal, SignalCallback};
use crate::error::{Result, SessionError};

/// How long to wait for an engine confirmation
pub const SIGNAL_TIMEOUT: Duration = Duration::from_millis(30_000);

const CHANNEL_CAPACITY: usize = 16;

/// Broadcast of engine signals
pub struct SignalChannel {
    tx: broadcast::Sender<Signal>,
}

impl SignalChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Callback to hand to [`super::Engine::connect_output_signals`]
    ///
    /// Signals emitted while no waiter is armed are dropped.
    pub fn callback(&self) -> SignalCallback {
        let tx = self.tx.clone();
        Box::new(move |signal: Signal| {
            trace!("Engine signal: {}", signal);
            if tx.send(signal).is_err() {
                trace!("No listener for engine signal");
            }
        })
    }

    /// Arm a waiter for signals emitted from now on
    ///
    /// The waiter borrows the channel mutably, so at most one wait can be
    /// outstanding. Dropping it detaches the listener.
    pub fn subscribe(&mut self) -> SignalWaiter<'_> {
        SignalWaiter {
            rx: self.tx.subscribe(),
            _channel: self,
        }
    }
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential reader of signals from a [`SignalChannel`]
pub struct SignalWaiter<'a> {
    rx: broadcast::Receiver<Signal>,
    _channel: &'a SignalChannel,
}

impl SignalWaiter<'_> {
    /// Next emitted signal, or [`SessionError::Timeout`] after `timeout`
    ///
    /// A timeout does not cancel whatever engine operation is in flight.
    pub async fn await_next(&mut self, timeout: Duration) -> Result<Signal> {
        let next = async {
            loop {
                match self.rx.recv().await {
                    Ok(signal) => return Ok(signal),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Signal listener lagged, {} signals dropped", skipped);
                    }
                    Err(RecvError::Closed) => return Err(SessionError::SignalChannelClosed),
                }
            }
        };

        match tokio::time::timeout(timeout, next).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(timeout)),
        }
    }

    /// Wait for the next signal and check it is `expected_type`/`expected_value`
    pub async fn expect(
        &mut self,
        expected_type: &str,
        expected_value: &str,
        timeout: Duration,
    ) -> Result<Signal> {
        let signal = self.await_next(timeout).await?;
        assert_signal(&signal, expected_type, expected_value)?;
        Ok(signal)
    }
}

/// Check a signal against the current protocol step
pub fn assert_signal(signal: &Signal, expected_type: &str, expected_value: &str) -> Result<()> {
    if signal.kind != expected_type || signal.signal != expected_value {
        return Err(SessionError::ProtocolViolation {
            expected_type: expected_type.to_string(),
            expected_signal: expected_value.to_string(),
            actual: signal.clone(),
        });
    }

    debug!("Signal {} confirmed", signal);
    Ok(())
}
