use crate::commands::CommandEntry;
use crate::document::layer::{DEFAULT_LINETYPE, color_index, is_valid_layer_name};
use crate::document::{Document, Layer};
use crate::error::command::CommandError;

use models::{ParamValue, Params};
use serde_json::{Value, json};

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::shared("layer-list", "Every layer with its properties", false, layer_list),
        CommandEntry::shared(
            "layer-create",
            "Create layer name with optional color (index or name) and linetype",
            true,
            layer_create,
        ),
        CommandEntry::shared(
            "layer-set-current",
            "Make layer name current",
            true,
            layer_set_current,
        ),
        CommandEntry::shared(
            "layer-set-properties",
            "Change color, linetype or lineweight of layer name",
            true,
            layer_set_properties,
        ),
        CommandEntry::shared("layer-freeze", "Freeze layer name", true, layer_freeze),
        CommandEntry::shared("layer-thaw", "Thaw layer name", true, layer_thaw),
        CommandEntry::shared("layer-lock", "Lock layer name", true, layer_lock),
        CommandEntry::shared("layer-unlock", "Unlock layer name", true, layer_unlock),
    ]
}

/// Color given as an ACI index (1-255) or as a color name.
fn optional_color(params: &Params) -> Result<Option<i64>, CommandError> {
    match params.get("color") {
        None => Ok(None),
        Some(ParamValue::Text(name)) => Ok(Some(color_index(name))),
        Some(ParamValue::Int(index)) if (1..=255).contains(index) => Ok(Some(*index)),
        Some(ParamValue::Int(index)) => Err(CommandError::handler(format!(
            "color index must be between 1 and 255, got {index}"
        ))),
        Some(other) => Err(CommandError::handler(format!(
            "parameter 'color' must be an index or a color name, got {}",
            other.type_name()
        ))),
    }
}

fn existing<'a>(document: &'a mut Document, name: &str) -> Result<&'a mut Layer, CommandError> {
    document
        .layer_mut(name)
        .ok_or_else(|| CommandError::handler(format!("layer '{name}' does not exist")))
}

fn layer_list(document: &mut Document, _params: &Params) -> Result<Value, CommandError> {
    Ok(json!({ "layers": document.layers() }))
}

fn layer_create(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    if !is_valid_layer_name(name) {
        return Err(CommandError::handler(format!("invalid layer name {name:?}")));
    }

    if document.layer(name).is_some() {
        return Ok(json!({ "name": name, "existed": true }));
    }

    let layer = Layer::new(name)
        .with_color(optional_color(params)?.unwrap_or(color_index("white")))
        .with_linetype(params.optional_str("linetype")?.unwrap_or(DEFAULT_LINETYPE));
    let color = layer.color;

    document.add_layer(layer);
    Ok(json!({ "name": name, "color": color }))
}

fn layer_set_current(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;

    if document.layer(name).is_some_and(|layer| layer.frozen) {
        return Err(CommandError::handler(format!(
            "layer '{name}' is frozen and cannot be made current"
        )));
    }

    if !document.set_current_layer(name) {
        return Err(CommandError::handler(format!("layer '{name}' does not exist")));
    }

    Ok(json!({ "current_layer": name }))
}

fn layer_set_properties(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    let color = optional_color(params)?;
    let linetype = params.optional_str("linetype")?;
    let lineweight = params.optional_i64("lineweight")?;

    let layer = existing(document, name)?;
    if let Some(color) = color {
        layer.color = color;
    }
    if let Some(linetype) = linetype {
        layer.linetype = linetype.to_string();
    }
    if let Some(lineweight) = lineweight {
        layer.lineweight = lineweight;
    }

    Ok(json!({
        "name": layer.name,
        "color": layer.color,
        "linetype": layer.linetype,
        "lineweight": layer.lineweight,
    }))
}

fn layer_freeze(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    if document.current_layer() == name {
        return Err(CommandError::handler(format!(
            "cannot freeze the current layer '{name}'"
        )));
    }

    existing(document, name)?.frozen = true;
    Ok(json!({ "name": name, "frozen": true }))
}

fn layer_thaw(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    existing(document, name)?.frozen = false;
    Ok(json!({ "name": name, "frozen": false }))
}

fn layer_lock(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    existing(document, name)?.locked = true;
    Ok(json!({ "name": name, "locked": true }))
}

fn layer_unlock(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let name = params.require_str("name")?;
    existing(document, name)?.locked = false;
    Ok(json!({ "name": name, "locked": false }))
}
