use crate::DISPATCH_PHRASE;
use crate::error::trigger::TriggerError;
use crate::trigger::{Signal, SignalSink};

use common::ErrorLocation;

use std::io::Write;
use std::panic::Location;
use std::sync::Mutex;

pub const ESCAPE: u8 = 0x1b;
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Types signals as console keystrokes into any writer.
///
/// A cancel pulse is a single ESC byte; dispatch is the dispatch phrase
/// followed by a carriage return.
pub struct KeystrokeSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> KeystrokeSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Run `f` against the wrapped writer; `None` if a previous writer panicked.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> Option<R> {
        self.writer.lock().ok().map(|mut writer| f(&mut writer))
    }
}

pub fn keystrokes(signal: Signal) -> Vec<u8> {
    match signal {
        Signal::Cancel => vec![ESCAPE],
        Signal::Dispatch => {
            let mut bytes = DISPATCH_PHRASE.as_bytes().to_vec();
            bytes.push(CARRIAGE_RETURN);
            bytes
        }
    }
}

impl<W: Write + Send> SignalSink for KeystrokeSink<W> {
    #[track_caller]
    fn send(&self, signal: Signal) -> Result<(), TriggerError> {
        let mut writer = self.writer.lock().map_err(|e| TriggerError::Send {
            message: format!("Console writer poisoned: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        writer.write_all(&keystrokes(signal))?;
        writer.flush()?;
        Ok(())
    }
}

/// For hosts that poll shared storage on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SignalSink for NullSink {
    fn send(&self, _signal: Signal) -> Result<(), TriggerError> {
        Ok(())
    }
}
