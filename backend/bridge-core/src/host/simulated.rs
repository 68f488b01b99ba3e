use crate::document::{Document, Point};
use crate::host::{LiveHost, View};

use log::debug;
use serde_json::{Value, json};

const UNDO_DEPTH: usize = 64;

/// In-process stand-in for a running CAD application.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    document: Document,
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    view: View,
    scripts: Vec<String>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Every script evaluated so far, oldest first.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}

impl LiveHost for SimulatedHost {
    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn record_undo(&mut self, before: Document) {
        if self.undo_stack.len() == UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(before);
        self.redo_stack.clear();
    }

    fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, previous);
        self.redo_stack.push(current);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, next);
        self.undo_stack.push(current);
        true
    }

    fn zoom_extents(&mut self) -> View {
        self.view = match self.document.extents() {
            Some((min, max)) => View { min, max },
            None => View::default(),
        };
        self.view
    }

    fn zoom_window(&mut self, corner_a: Point, corner_b: Point) -> View {
        self.view = View {
            min: [corner_a[0].min(corner_b[0]), corner_a[1].min(corner_b[1])],
            max: [corner_a[0].max(corner_b[0]), corner_a[1].max(corner_b[1])],
        };
        self.view
    }

    fn evaluate_script(&mut self, source: &str) -> Result<Value, String> {
        let source = source.trim();
        if source.is_empty() {
            return Err(String::from("script is empty"));
        }

        let opened = source.matches('(').count();
        let closed = source.matches(')').count();
        if opened != closed {
            return Err(format!(
                "malformed list: {opened} '(' against {closed} ')'"
            ));
        }

        debug!("Simulated host recorded script ({} chars)", source.len());
        self.scripts.push(source.to_string());
        Ok(json!({ "evaluated": true, "chars": source.len() }))
    }
}
