use crate::dispatcher::{Activation, Dispatcher};
use crate::host::LiveHost;
use crate::host::console::{ConsoleAction, HostConsole};

use std::io::{Error as IoError, Result as IoResult, Write};

use log::error;

/// A host console wired straight to a dispatcher.
///
/// Bytes written here are typed into the console; every submitted dispatch
/// phrase runs one activation before `write` returns. Wrapped in a
/// [`KeystrokeSink`](crate::trigger::KeystrokeSink) this is a complete
/// in-process host.
pub struct EmbeddedHost<H: LiveHost> {
    console: HostConsole,
    dispatcher: Dispatcher<H>,
    activations: Vec<Activation>,
}

impl<H: LiveHost> EmbeddedHost<H> {
    pub fn new(dispatcher: Dispatcher<H>) -> Self {
        Self {
            console: HostConsole::new(),
            dispatcher,
            activations: Vec::new(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<H> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<H> {
        &mut self.dispatcher
    }

    pub fn console(&self) -> &HostConsole {
        &self.console
    }

    /// Outcome of every activation so far, oldest first.
    pub fn activations(&self) -> &[Activation] {
        &self.activations
    }
}

impl<H: LiveHost> Write for EmbeddedHost<H> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        for action in self.console.feed(buf) {
            if action != ConsoleAction::Activate {
                continue;
            }

            let activation = self.dispatcher.activate().map_err(|e| {
                error!("Dispatcher activation failed: {e}");
                IoError::other(e.to_string())
            })?;
            self.activations.push(activation);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
