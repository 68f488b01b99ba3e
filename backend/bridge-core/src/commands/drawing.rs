use crate::commands::CommandEntry;
use crate::document::{DRAWING_VERSION, Document, UNTITLED, VARIABLE_NAMES};
use crate::error::command::CommandError;
use crate::storage::temp_path_for;

use std::fs;
use std::path::PathBuf;

use log::info;
use models::Params;
use serde_json::{Map, Value, json};

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::shared("ping", "Round-trip check; no side effects", false, ping),
        CommandEntry::shared(
            "drawing-info",
            "Entity count, layers and save path of the open drawing",
            false,
            drawing_info,
        ),
        CommandEntry::shared(
            "drawing-get-variables",
            "Read system variables (names: list, default all)",
            false,
            drawing_get_variables,
        ),
        CommandEntry::shared(
            "drawing-create",
            "Replace the open drawing with an empty one (name)",
            true,
            drawing_create,
        ),
        CommandEntry::shared(
            "drawing-save",
            "Write the drawing to path, or to its last save path",
            false,
            drawing_save,
        ),
        CommandEntry::shared(
            "drawing-purge",
            "Remove layers that hold no entities",
            true,
            drawing_purge,
        ),
    ]
}

fn ping(_document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    Ok(json!({ "pong": true }))
}

fn drawing_info(document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    let layers: Vec<&str> = document
        .layers()
        .iter()
        .map(|layer| layer.name.as_str())
        .collect();

    Ok(json!({
        "name": document.name(),
        "entity_count": document.entities().len(),
        "layers": layers,
        "current_layer": document.current_layer(),
        "dxf_version": DRAWING_VERSION,
        "save_path": document.save_path().map(|path| path.display().to_string()),
    }))
}

fn drawing_get_variables(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let names = params.optional_str_list("names")?.unwrap_or_else(|| {
        VARIABLE_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect()
    });

    let variables: Map<String, Value> = names
        .into_iter()
        .map(|name| {
            let key = name.trim_start_matches('$').to_string();
            let value = document.variable(&key).map_or(Value::Null, Value::String);
            (key, value)
        })
        .collect();

    Ok(Value::Object(variables))
}

fn drawing_create(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.optional_str("name")?.unwrap_or(UNTITLED).trim();
    if name.is_empty() {
        return Err(CommandError::handler("drawing name cannot be empty"));
    }

    *document = Document::new(name);
    Ok(json!({ "name": name }))
}

fn drawing_save(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let path = match params.optional_str("path")? {
        Some(path) => PathBuf::from(path),
        None => document
            .save_path()
            .map(|path| path.to_path_buf())
            .ok_or_else(|| CommandError::handler("no save path specified"))?,
    };

    let bytes = serde_json::to_vec_pretty(document)
        .map_err(|e| CommandError::handler(format!("failed to serialize drawing: {e}")))?;

    let temp_path = temp_path_for(&path);
    fs::write(&temp_path, bytes)
        .and_then(|()| fs::rename(&temp_path, &path))
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CommandError::handler(format!("failed to save to {}: {e}", path.display()))
        })?;

    info!("Drawing '{}' saved to {}", document.name(), path.display());
    document.set_save_path(&path);
    Ok(json!({ "path": path.display().to_string() }))
}

fn drawing_purge(document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    let purged = document.purge();
    Ok(json!({ "count": purged.len(), "purged": purged }))
}
