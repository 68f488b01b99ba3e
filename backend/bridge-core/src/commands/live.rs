use crate::commands::{CommandEntry, EXECUTE_SCRIPT};
use crate::error::command::CommandError;
use crate::host::LiveHost;

use std::fs;

use log::warn;
use models::Params;
use serde_json::{Value, json};

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::live("undo", "Revert the last modifying command", false, undo),
        CommandEntry::live("redo", "Reapply the last undone command", false, redo),
        CommandEntry::live(
            "zoom-extents",
            "Fit the view to every entity",
            false,
            zoom_extents,
        ),
        CommandEntry::live(
            "zoom-window",
            "Fit the view to corners (x1, y1) and (x2, y2)",
            false,
            zoom_window,
        ),
    ]
}

/// Privileged: runs caller-supplied script source verbatim inside the host.
pub(super) fn execute_script_entry() -> CommandEntry {
    CommandEntry::live(
        EXECUTE_SCRIPT,
        "Evaluate the script stored at code_file (privileged)",
        true,
        execute_script,
    )
}

fn undo(host: &mut dyn LiveHost, _params: &Params) -> Result<Value, CommandError> {
    if !host.undo() {
        return Err(CommandError::handler("nothing to undo"));
    }
    Ok(json!({ "undone": true }))
}

fn redo(host: &mut dyn LiveHost, _params: &Params) -> Result<Value, CommandError> {
    if !host.redo() {
        return Err(CommandError::handler("nothing to redo"));
    }
    Ok(json!({ "redone": true }))
}

fn zoom_extents(host: &mut dyn LiveHost, _params: &Params) -> Result<Value, CommandError> {
    Ok(json!({ "view": host.zoom_extents() }))
}

fn zoom_window(host: &mut dyn LiveHost, params: &Params) -> Result<Value, CommandError> {
    let corner_a = [params.require_f64("x1")?, params.require_f64("y1")?];
    let corner_b = [params.require_f64("x2")?, params.require_f64("y2")?];

    if corner_a[0] == corner_b[0] || corner_a[1] == corner_b[1] {
        return Err(CommandError::handler("zoom window has zero area"));
    }

    Ok(json!({ "view": host.zoom_window(corner_a, corner_b) }))
}

fn execute_script(host: &mut dyn LiveHost, params: &Params) -> Result<Value, CommandError> {
    let code_file = params.require_str("code_file")?;
    let source = fs::read_to_string(code_file)
        .map_err(|e| CommandError::handler(format!("cannot read script {code_file}: {e}")))?;

    warn!("Evaluating caller-supplied script from {code_file}");
    let result = host
        .evaluate_script(&source)
        .map_err(|reason| CommandError::handler(format!("script failed: {reason}")))?;

    Ok(json!({ "result": result }))
}
