//! Out-of-band activation of the host's scripting environment.
//!
//! The host listens on nothing, so the controller types into its console.
//! Every firing sends two cancel pulses before the dispatch phrase: whatever
//! an earlier, abandoned attempt left half-typed on the console line is
//! discarded before the phrase arrives.

pub mod keystroke;

pub use keystroke::{KeystrokeSink, NullSink};

use crate::error::trigger::TriggerError;

use std::sync::Arc;
use std::time::Duration;

use log::trace;

pub const CANCEL_PULSES: usize = 2;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Abort whatever is on the console line.
    Cancel,
    /// Ask the host to run one dispatcher activation.
    Dispatch,
}

/// Destination of trigger signals.
pub trait SignalSink: Send + Sync {
    fn send(&self, signal: Signal) -> Result<(), TriggerError>;
}

#[derive(Clone)]
pub struct Trigger {
    sink: Arc<dyn SignalSink>,
    settle_delay: Duration,
}

impl Trigger {
    pub fn new(sink: Arc<dyn SignalSink>) -> Self {
        Self {
            sink,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Send the priming pulses, wait for the host to settle, then dispatch.
    ///
    /// Safe to call any number of times regardless of dispatcher state.
    pub async fn fire(&self) -> Result<(), TriggerError> {
        for _ in 0..CANCEL_PULSES {
            self.sink.send(Signal::Cancel)?;
        }

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        self.sink.send(Signal::Dispatch)?;
        trace!("Trigger fired");
        Ok(())
    }
}
