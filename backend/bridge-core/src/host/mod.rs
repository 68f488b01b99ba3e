//! The host side of the bridge.

pub mod console;
pub mod embedded;
pub mod simulated;

pub use console::{ConsoleAction, HostConsole};
pub use embedded::EmbeddedHost;
pub use simulated::SimulatedHost;

use crate::document::{Document, Point};

use serde::Serialize;
use serde_json::Value;

/// Visible region of the host's viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct View {
    pub min: Point,
    pub max: Point,
}

impl Default for View {
    fn default() -> Self {
        Self {
            min: [0.0, 0.0],
            max: [12.0, 9.0],
        }
    }
}

/// What the dispatcher needs from a running host application.
pub trait LiveHost: Send {
    fn document_mut(&mut self) -> &mut Document;

    /// Record `before` as an undo point once a modifying command succeeded.
    fn record_undo(&mut self, before: Document);

    /// Returns `false` when there is nothing to undo.
    fn undo(&mut self) -> bool;

    /// Returns `false` when there is nothing to redo.
    fn redo(&mut self) -> bool;

    fn zoom_extents(&mut self) -> View;

    fn zoom_window(&mut self, corner_a: Point, corner_b: Point) -> View;

    /// Evaluate script source in the host's scripting environment.
    fn evaluate_script(&mut self, source: &str) -> Result<Value, String>;
}
