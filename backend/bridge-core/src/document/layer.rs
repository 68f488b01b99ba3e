use serde::{Deserialize, Serialize};

pub const DEFAULT_LAYER: &str = "0";
pub const DEFAULT_COLOR: i64 = 7;
pub const DEFAULT_LINETYPE: &str = "Continuous";
/// "ByDefault" in hundredths of a millimetre.
pub const DEFAULT_LINEWEIGHT: i64 = -3;

const RESERVED_NAME_CHARS: &[char] = &['<', '>', '/', '\\', '"', ':', ';', '?', '*', '|', ',', '=', '`'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub color: i64,
    pub linetype: String,
    pub lineweight: i64,
    #[serde(rename = "is_frozen")]
    pub frozen: bool,
    #[serde(rename = "is_locked")]
    pub locked: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: DEFAULT_COLOR,
            linetype: DEFAULT_LINETYPE.to_string(),
            lineweight: DEFAULT_LINEWEIGHT,
            frozen: false,
            locked: false,
        }
    }

    pub fn with_color(mut self, color: i64) -> Self {
        self.color = color;
        self
    }

    pub fn with_linetype(mut self, linetype: impl Into<String>) -> Self {
        self.linetype = linetype.into();
        self
    }
}

pub fn is_valid_layer_name(name: &str) -> bool {
    !name.trim().is_empty() && name.len() <= 255 && !name.contains(RESERVED_NAME_CHARS)
}

/// ACI index for a color given by name; unknown names map to white.
pub fn color_index(name: &str) -> i64 {
    match name.to_ascii_lowercase().as_str() {
        "red" => 1,
        "yellow" => 2,
        "green" => 3,
        "cyan" => 4,
        "blue" => 5,
        "magenta" => 6,
        "grey" | "gray" => 8,
        _ => DEFAULT_COLOR,
    }
}
