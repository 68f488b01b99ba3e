//! The whitelist.
//!
//! A [`CommandTable`] maps command names to typed handlers and is the only
//! way anything executes against a document. It is built once and never
//! mutated; a name with no entry has no execution path.

mod drawing;
mod entity;
mod layer;
mod live;

use crate::document::Document;
use crate::error::command::CommandError;
use crate::host::LiveHost;

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, Location, catch_unwind};

use log::{error, trace};
use models::{BackendKind, Params};
use serde::Serialize;
use serde_json::Value;

pub const EXECUTE_SCRIPT: &str = "execute-script";

pub type SharedHandler = fn(&mut Document, &Params) -> Result<Value, CommandError>;
pub type LiveHandler = fn(&mut dyn LiveHost, &Params) -> Result<Value, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Live,
    Headless,
    Both,
}

impl Availability {
    pub fn supports(&self, kind: BackendKind) -> bool {
        matches!(
            (self, kind),
            (Availability::Both, _)
                | (Availability::Live, BackendKind::Live)
                | (Availability::Headless, BackendKind::Headless)
        )
    }
}

#[derive(Clone, Copy)]
pub enum Handler {
    /// Runs against a bare document, so either backend can execute it.
    Shared(SharedHandler),
    /// Needs host facilities beyond the document.
    Live(LiveHandler),
}

#[derive(Clone)]
pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub availability: Availability,
    /// Whether the host records an undo point before running it.
    pub undoable: bool,
    pub handler: Handler,
}

impl CommandEntry {
    pub fn shared(
        name: &'static str,
        description: &'static str,
        undoable: bool,
        handler: SharedHandler,
    ) -> Self {
        Self {
            name,
            description,
            availability: Availability::Both,
            undoable,
            handler: Handler::Shared(handler),
        }
    }

    pub fn live(
        name: &'static str,
        description: &'static str,
        undoable: bool,
        handler: LiveHandler,
    ) -> Self {
        Self {
            name,
            description,
            availability: Availability::Live,
            undoable,
            handler: Handler::Live(handler),
        }
    }

    /// Narrow a shared entry to one backend.
    pub fn restricted_to(mut self, kind: BackendKind) -> Self {
        self.availability = match kind {
            BackendKind::Live => Availability::Live,
            BackendKind::Headless => Availability::Headless,
        };
        self
    }
}

pub struct CommandTable {
    entries: BTreeMap<&'static str, CommandEntry>,
}

impl CommandTable {
    /// The standard command set. `execute-script` is only present when
    /// `allow_scripts` is set.
    pub fn builtin(allow_scripts: bool) -> Self {
        let mut entries = Vec::new();
        entries.extend(drawing::entries());
        entries.extend(entity::entries());
        entries.extend(layer::entries());
        entries.extend(live::entries());

        if allow_scripts {
            entries.push(live::execute_script_entry());
        }

        Self::from_entries(entries)
    }

    /// Build a table from explicit entries; a repeated name keeps the last one.
    pub fn from_entries(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|entry| (entry.name, entry)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// Entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look `name` up and confirm it may run on `kind`.
    #[track_caller]
    pub fn check(&self, name: &str, kind: BackendKind) -> Result<&CommandEntry, CommandError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand {
                message: format!("unknown command '{name}'"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if !entry.availability.supports(kind) {
            return Err(CommandError::Unsupported {
                message: format!("command '{name}' is not supported on the {kind} backend"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(entry)
    }

    /// Run `name` against an in-memory document.
    pub fn execute_on_document(
        &self,
        name: &str,
        document: &mut Document,
        params: &Params,
    ) -> Result<Value, CommandError> {
        let entry = self.check(name, BackendKind::Headless)?;

        match entry.handler {
            Handler::Shared(handler) => guarded(name, || handler(document, params)),
            Handler::Live(_) => Err(CommandError::Unsupported {
                message: format!("command '{name}' needs a live host"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Run `name` inside a live host.
    pub fn execute_on_host(
        &self,
        name: &str,
        host: &mut dyn LiveHost,
        params: &Params,
    ) -> Result<Value, CommandError> {
        let entry = self.check(name, BackendKind::Live)?;

        let before = entry.undoable.then(|| host.document_mut().clone());

        let result = match entry.handler {
            Handler::Shared(handler) => guarded(name, || handler(host.document_mut(), params)),
            Handler::Live(handler) => guarded(name, || handler(&mut *host, params)),
        };

        // A rejected command leaves the undo and redo history untouched
        if let (Ok(_), Some(before)) = (&result, before) {
            host.record_undo(before);
        }

        result
    }
}

/// Convert a handler panic into a [`CommandError::Handler`].
fn guarded(
    name: &str,
    run: impl FnOnce() -> Result<Value, CommandError>,
) -> Result<Value, CommandError> {
    trace!("Executing '{name}'");

    catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|panic| {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|text| text.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("unknown panic"));

        error!("Handler for '{name}' panicked: {reason}");
        Err(CommandError::Handler {
            message: format!("handler for '{name}' panicked: {reason}"),
            location: ErrorLocation::from(Location::caller()),
        })
    })
}
