use crate::DISPATCH_PHRASE;
use crate::trigger::keystroke::{CARRIAGE_RETURN, ESCAPE};

use log::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    /// The dispatch phrase was submitted.
    Activate,
    /// Some other line was submitted and rejected.
    Rejected(String),
}

/// Line editor of the host's command console.
///
/// ESC discards the line being typed, carriage return or line feed submits
/// it. Only a line equal to the dispatch phrase activates the dispatcher.
#[derive(Debug, Default)]
pub struct HostConsole {
    line: Vec<u8>,
}

impl HostConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text typed since the last submit or cancel.
    pub fn pending_line(&self) -> String {
        String::from_utf8_lossy(&self.line).into_owned()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ConsoleAction> {
        let mut actions = Vec::new();

        for &byte in bytes {
            match byte {
                ESCAPE => {
                    if !self.line.is_empty() {
                        trace!("Console line cancelled: {:?}", self.pending_line());
                    }
                    self.line.clear();
                }
                CARRIAGE_RETURN | b'\n' => {
                    let line = self.pending_line();
                    self.line.clear();

                    let submitted = line.trim();
                    if submitted == DISPATCH_PHRASE {
                        actions.push(ConsoleAction::Activate);
                    } else if !submitted.is_empty() {
                        debug!("Console rejected unknown input: {submitted:?}");
                        actions.push(ConsoleAction::Rejected(submitted.to_string()));
                    }
                }
                other => self.line.push(other),
            }
        }

        actions
    }
}
