//! `cadbridge host`: a simulated CAD application serving the shared directory.
//!
//! With a console input file the host behaves like the real thing: it only
//! acts on the keystrokes appended to that file. Without one it serves every
//! pending request on each poll.

use crate::error::CadbridgeError;

use bridge_core::CoreError;
use bridge_core::commands::CommandTable;
use bridge_core::dispatcher::{Activation, Dispatcher};
use bridge_core::document::Document;
use bridge_core::host::{EmbeddedHost, SimulatedHost};
use bridge_core::storage::IpcDirectory;

use common::ErrorLocation;

use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

/// Tail of the console input file.
struct ConsoleInput {
    path: PathBuf,
    offset: u64,
}

impl ConsoleInput {
    /// Bytes appended since the last read.
    fn read_new(&mut self) -> std::io::Result<Vec<u8>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let length = file.metadata()?.len();
        if length < self.offset {
            debug!("Console input {} was truncated", self.path.display());
            self.offset = 0;
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        self.offset += bytes.len() as u64;
        Ok(bytes)
    }
}

pub struct HostLoop {
    host: EmbeddedHost<SimulatedHost>,
    input: Option<ConsoleInput>,
}

impl HostLoop {
    pub fn new(
        directory: IpcDirectory,
        table: Arc<CommandTable>,
        document: Document,
        input: Option<PathBuf>,
    ) -> Self {
        let dispatcher = Dispatcher::new(directory, table, SimulatedHost::with_document(document));

        Self {
            host: EmbeddedHost::new(dispatcher),
            input: input.map(|path| ConsoleInput {
                path,
                offset: 0,
            }),
        }
    }

    /// Skip console input written before the host started.
    pub fn skip_existing_input(&mut self) -> Result<(), CadbridgeError> {
        if let Some(input) = self.input.as_mut() {
            let skipped = input.read_new().map_err(|e| console_error(&input.path, e))?;
            if !skipped.is_empty() {
                info!("Ignoring {} byte(s) of earlier console input", skipped.len());
            }
        }
        Ok(())
    }

    pub fn document(&self) -> &Document {
        self.host.dispatcher().host().document()
    }

    pub fn directory(&self) -> &Path {
        self.host.dispatcher().directory().root()
    }

    /// One poll; returns how many requests were answered.
    pub fn tick(&mut self) -> Result<usize, CadbridgeError> {
        let Some(input) = self.input.as_mut() else {
            let answered = self
                .host
                .dispatcher_mut()
                .drain()
                .map_err(CoreError::from)?;
            return Ok(answered);
        };

        let bytes = input.read_new().map_err(|e| console_error(&input.path, e))?;
        if bytes.is_empty() {
            return Ok(0);
        }

        let before = self.host.activations().len();
        self.host
            .write_all(&bytes)
            .map_err(|e| CadbridgeError::Cadbridge {
                message: format!("Dispatcher activation failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let answered = self.host.activations()[before..]
            .iter()
            .filter(|activation| matches!(activation, Activation::Answered { .. }))
            .count();
        Ok(answered)
    }
}

#[track_caller]
fn console_error(path: &Path, error: std::io::Error) -> CadbridgeError {
    CadbridgeError::Cadbridge {
        message: format!("Failed to read console input {}: {error}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    }
}
