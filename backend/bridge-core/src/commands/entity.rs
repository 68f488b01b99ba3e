use crate::commands::CommandEntry;
use crate::document::{Document, Entity, Shape};
use crate::error::command::CommandError;

use models::Params;
use serde_json::{Value, json};

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::shared(
            "create-line",
            "Line from (x1, y1) to (x2, y2)",
            true,
            create_line,
        ),
        CommandEntry::shared(
            "create-circle",
            "Circle at (cx, cy) with radius",
            true,
            create_circle,
        ),
        CommandEntry::shared(
            "create-arc",
            "Arc at (cx, cy) with radius from start_angle to end_angle (degrees)",
            true,
            create_arc,
        ),
        CommandEntry::shared(
            "create-polyline",
            "Lightweight polyline through points, optionally closed",
            true,
            create_polyline,
        ),
        CommandEntry::shared(
            "create-rectangle",
            "Closed polyline with corners (x1, y1) and (x2, y2)",
            true,
            create_rectangle,
        ),
        CommandEntry::shared(
            "create-text",
            "Single-line text at (x, y) with optional height and rotation",
            true,
            create_text,
        ),
        CommandEntry::shared(
            "entity-list",
            "Type, handle and layer of every entity, optionally on one layer",
            false,
            entity_list,
        ),
        CommandEntry::shared(
            "entity-count",
            "Number of entities, optionally on one layer",
            false,
            entity_count,
        ),
        CommandEntry::shared(
            "entity-get",
            "Full geometry of one entity",
            false,
            entity_get,
        ),
        CommandEntry::shared(
            "entity-erase",
            "Delete an entity (entity_id may be \"last\")",
            true,
            entity_erase,
        ),
        CommandEntry::shared("entity-move", "Displace by (dx, dy)", true, entity_move),
        CommandEntry::shared(
            "entity-copy",
            "Duplicate displaced by (dx, dy)",
            true,
            entity_copy,
        ),
        CommandEntry::shared(
            "entity-rotate",
            "Rotate by angle degrees around (cx, cy)",
            true,
            entity_rotate,
        ),
        CommandEntry::shared(
            "entity-scale",
            "Scale by factor around (cx, cy)",
            true,
            entity_scale,
        ),
    ]
}

fn created(entity: &Entity) -> Value {
    json!({
        "entity_type": entity.shape.type_name(),
        "handle": entity.handle,
    })
}

fn require_positive(params: &Params, key: &str) -> Result<f64, CommandError> {
    let value = params.require_f64(key)?;
    if value <= 0.0 || !value.is_finite() {
        return Err(CommandError::handler(format!(
            "parameter '{key}' must be positive, got {value}"
        )));
    }
    Ok(value)
}

fn require_point(params: &Params, x: &str, y: &str) -> Result<[f64; 2], CommandError> {
    Ok([params.require_f64(x)?, params.require_f64(y)?])
}

/// Entity `id`, refusing entities on locked layers.
fn editable<'a>(document: &'a mut Document, id: &str) -> Result<&'a mut Entity, CommandError> {
    let layer = document
        .resolve(id)
        .map(|entity| entity.layer.clone())
        .ok_or_else(|| CommandError::handler(format!("entity {id} not found")))?;

    if document.layer(&layer).is_some_and(|layer| layer.locked) {
        return Err(CommandError::handler(format!(
            "entity {id} is on locked layer '{layer}'"
        )));
    }

    document
        .resolve_mut(id)
        .ok_or_else(|| CommandError::handler(format!("entity {id} not found")))
}

fn create_line(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let shape = Shape::Line {
        start: require_point(params, "x1", "y1")?,
        end: require_point(params, "x2", "y2")?,
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn create_circle(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let shape = Shape::Circle {
        center: require_point(params, "cx", "cy")?,
        radius: require_positive(params, "radius")?,
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn create_arc(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let shape = Shape::Arc {
        center: require_point(params, "cx", "cy")?,
        radius: require_positive(params, "radius")?,
        start_angle: params.require_f64("start_angle")?,
        end_angle: params.require_f64("end_angle")?,
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn create_polyline(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let points = params.require_points("points")?;
    if points.len() < 2 {
        return Err(CommandError::handler(format!(
            "a polyline needs at least 2 points, got {}",
            points.len()
        )));
    }

    let shape = Shape::Polyline {
        points,
        closed: params.optional_bool("closed")?.unwrap_or(false),
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn create_rectangle(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let [x1, y1] = require_point(params, "x1", "y1")?;
    let [x2, y2] = require_point(params, "x2", "y2")?;
    if x1 == x2 || y1 == y2 {
        return Err(CommandError::handler("rectangle corners must differ in x and y"));
    }

    let shape = Shape::Polyline {
        points: vec![[x1, y1], [x2, y1], [x2, y2], [x1, y2]],
        closed: true,
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn create_text(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let text = params.require_str("text")?;
    let height = match params.optional_f64("height")? {
        Some(_) => require_positive(params, "height")?,
        None => 2.5,
    };

    let shape = Shape::Text {
        insert: require_point(params, "x", "y")?,
        text: text.to_string(),
        height,
        rotation: params.optional_f64("rotation")?.unwrap_or(0.0),
    };
    Ok(created(document.add(shape, params.optional_str("layer")?)))
}

fn entity_list(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let entities: Vec<Value> = document
        .entities_on(params.optional_str("layer")?)
        .map(|entity| {
            json!({
                "type": entity.shape.type_name(),
                "handle": entity.handle,
                "layer": entity.layer,
            })
        })
        .collect();

    Ok(json!({ "count": entities.len(), "entities": entities }))
}

fn entity_count(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let count = document.entities_on(params.optional_str("layer")?).count();
    Ok(json!({ "count": count }))
}

fn entity_get(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let entity = document
        .resolve(id)
        .ok_or_else(|| CommandError::handler(format!("entity {id} not found")))?;

    serde_json::to_value(entity)
        .map_err(|e| CommandError::handler(format!("failed to describe entity {id}: {e}")))
}

fn entity_erase(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let handle = editable(document, id)?.handle.clone();

    document.erase(&handle);
    Ok(json!({ "erased": handle }))
}

fn entity_move(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let [dx, dy] = require_point(params, "dx", "dy")?;

    let entity = editable(document, id)?;
    entity.shape.translate(dx, dy);
    Ok(json!({ "moved": entity.handle }))
}

fn entity_copy(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let [dx, dy] = require_point(params, "dx", "dy")?;
    editable(document, id)?;

    let copy = document
        .copy(id, dx, dy)
        .ok_or_else(|| CommandError::handler(format!("entity {id} not found")))?;
    Ok(json!({ "handle": copy.handle }))
}

fn entity_rotate(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let pivot = require_point(params, "cx", "cy")?;
    let angle = params.require_f64("angle")?;

    let entity = editable(document, id)?;
    entity.shape.rotate(pivot, angle);
    Ok(json!({ "rotated": entity.handle }))
}

fn entity_scale(document: &mut Document, params: &Params) -> Result<Value, CommandError> {
    let id = params.require_str("entity_id")?;
    let pivot = require_point(params, "cx", "cy")?;
    let factor = require_positive(params, "factor")?;

    let entity = editable(document, id)?;
    entity.shape.scale(pivot, factor);
    Ok(json!({ "scaled": entity.handle }))
}
