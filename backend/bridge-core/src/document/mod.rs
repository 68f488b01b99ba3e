//! In-memory drawing model shared by the simulated host and the headless engine.

pub mod layer;
pub mod shape;

pub use layer::{DEFAULT_LAYER, Layer};
pub use shape::{Point, Shape};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Drawing format version reported by `ACADVER`.
pub const DRAWING_VERSION: &str = "AC1027";
pub const UNTITLED: &str = "untitled";
/// Keyword accepted wherever an entity handle is, meaning the newest entity.
pub const LAST_ENTITY: &str = "last";

pub const VARIABLE_NAMES: &[&str] = &["ACADVER", "CLAYER", "DWGNAME", "HANDSEED"];

const FIRST_HANDLE: u64 = 0x30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub handle: String,
    pub layer: String,
    #[serde(flatten)]
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    name: String,
    entities: Vec<Entity>,
    layers: Vec<Layer>,
    current_layer: String,
    save_path: Option<PathBuf>,
    next_handle: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(UNTITLED)
    }
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            layers: vec![Layer::new(DEFAULT_LAYER)],
            current_layer: DEFAULT_LAYER.to_string(),
            save_path: None,
            next_handle: FIRST_HANDLE,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn current_layer(&self) -> &str {
        &self.current_layer
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = Some(path.into());
    }

    /// Add `shape` on `layer` (the current layer when `None`), creating the
    /// layer if needed.
    pub fn add(&mut self, shape: Shape, layer: Option<&str>) -> &Entity {
        let layer = layer.unwrap_or(&self.current_layer).to_string();
        self.ensure_layer(&layer);

        let handle = self.allocate_handle();
        let index = self.entities.len();
        self.entities.push(Entity {
            handle,
            layer,
            shape,
        });
        &self.entities[index]
    }

    /// Resolve `id` to a concrete handle, honouring [`LAST_ENTITY`].
    pub fn resolve(&self, id: &str) -> Option<&Entity> {
        if id.eq_ignore_ascii_case(LAST_ENTITY) {
            return self.entities.last();
        }
        self.entities
            .iter()
            .find(|entity| entity.handle.eq_ignore_ascii_case(id))
    }

    pub fn resolve_mut(&mut self, id: &str) -> Option<&mut Entity> {
        if id.eq_ignore_ascii_case(LAST_ENTITY) {
            return self.entities.last_mut();
        }
        self.entities
            .iter_mut()
            .find(|entity| entity.handle.eq_ignore_ascii_case(id))
    }

    pub fn erase(&mut self, id: &str) -> Option<Entity> {
        let handle = self.resolve(id)?.handle.clone();
        let index = self
            .entities
            .iter()
            .position(|entity| entity.handle == handle)?;
        Some(self.entities.remove(index))
    }

    /// Duplicate `id` displaced by `(dx, dy)`; returns the copy.
    pub fn copy(&mut self, id: &str, dx: f64, dy: f64) -> Option<&Entity> {
        let source = self.resolve(id)?.clone();
        let mut shape = source.shape;
        shape.translate(dx, dy);
        Some(self.add(shape, Some(&source.layer)))
    }

    pub fn entities_on<'a>(&'a self, layer: Option<&'a str>) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .iter()
            .filter(move |entity| layer.is_none_or(|name| entity.layer == name))
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.name == name)
    }

    /// Returns `false` when a layer with that name already exists.
    pub fn add_layer(&mut self, layer: Layer) -> bool {
        if self.layer(&layer.name).is_some() {
            return false;
        }
        self.layers.push(layer);
        true
    }

    pub fn set_current_layer(&mut self, name: &str) -> bool {
        if self.layer(name).is_none() {
            return false;
        }
        self.current_layer = name.to_string();
        true
    }

    /// Drop layers holding no entities, keeping layer 0 and the current layer.
    pub fn purge(&mut self) -> Vec<String> {
        let (kept, purged): (Vec<Layer>, Vec<Layer>) =
            std::mem::take(&mut self.layers).into_iter().partition(|layer| {
                layer.name == DEFAULT_LAYER
                    || layer.name == self.current_layer
                    || self.entities.iter().any(|entity| entity.layer == layer.name)
            });

        self.layers = kept;
        purged.into_iter().map(|layer| layer.name).collect()
    }

    /// Bounding box of every entity, `None` for an empty drawing.
    pub fn extents(&self) -> Option<(Point, Point)> {
        self.entities
            .iter()
            .map(|entity| entity.shape.extents())
            .reduce(|(min_a, max_a), (min_b, max_b)| {
                (
                    [min_a[0].min(min_b[0]), min_a[1].min(min_b[1])],
                    [max_a[0].max(max_b[0]), max_a[1].max(max_b[1])],
                )
            })
    }

    /// Value of a system variable; a leading `$` is ignored.
    pub fn variable(&self, name: &str) -> Option<String> {
        match name.trim_start_matches('$').to_ascii_uppercase().as_str() {
            "ACADVER" => Some(DRAWING_VERSION.to_string()),
            "CLAYER" => Some(self.current_layer.clone()),
            "DWGNAME" => Some(format!("{}.dwg", self.name)),
            "HANDSEED" => Some(format!("{:X}", self.next_handle)),
            _ => None,
        }
    }

    fn ensure_layer(&mut self, name: &str) {
        if self.layer(name).is_none() {
            self.layers.push(Layer::new(name));
        }
    }

    fn allocate_handle(&mut self) -> String {
        let handle = format!("{:X}", self.next_handle);
        self.next_handle += 1;
        handle
    }
}
