use serde::{Deserialize, Serialize};

pub type Point = [f64; 2];

/// Geometry of a single drawing entity, tagged with its DXF type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    #[serde(rename = "LINE")]
    Line { start: Point, end: Point },

    #[serde(rename = "CIRCLE")]
    Circle { center: Point, radius: f64 },

    /// Angles in degrees, counter-clockwise from `start_angle`.
    #[serde(rename = "ARC")]
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },

    #[serde(rename = "LWPOLYLINE")]
    Polyline { points: Vec<Point>, closed: bool },

    #[serde(rename = "TEXT")]
    Text {
        insert: Point,
        text: String,
        height: f64,
        rotation: f64,
    },
}

impl Shape {
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Line { .. } => "LINE",
            Shape::Circle { .. } => "CIRCLE",
            Shape::Arc { .. } => "ARC",
            Shape::Polyline { .. } => "LWPOLYLINE",
            Shape::Text { .. } => "TEXT",
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.map_points(|[x, y]| [x + dx, y + dy]);
    }

    /// Rotate by `degrees` counter-clockwise around `pivot`.
    pub fn rotate(&mut self, pivot: Point, degrees: f64) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.map_points(|[x, y]| {
            let (rx, ry) = (x - pivot[0], y - pivot[1]);
            [
                pivot[0] + rx * cos - ry * sin,
                pivot[1] + rx * sin + ry * cos,
            ]
        });

        match self {
            Shape::Arc {
                start_angle,
                end_angle,
                ..
            } => {
                *start_angle = normalize_degrees(*start_angle + degrees);
                *end_angle = normalize_degrees(*end_angle + degrees);
            }
            Shape::Text { rotation, .. } => *rotation = normalize_degrees(*rotation + degrees),
            _ => {}
        }
    }

    /// Scale uniformly by `factor` around `pivot`.
    pub fn scale(&mut self, pivot: Point, factor: f64) {
        self.map_points(|[x, y]| {
            [
                pivot[0] + (x - pivot[0]) * factor,
                pivot[1] + (y - pivot[1]) * factor,
            ]
        });

        match self {
            Shape::Circle { radius, .. } | Shape::Arc { radius, .. } => *radius *= factor,
            Shape::Text { height, .. } => *height *= factor,
            _ => {}
        }
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn extents(&self) -> (Point, Point) {
        match self {
            Shape::Line { start, end } => bounds([*start, *end].iter()),
            Shape::Circle { center, radius } | Shape::Arc { center, radius, .. } => (
                [center[0] - radius, center[1] - radius],
                [center[0] + radius, center[1] + radius],
            ),
            Shape::Polyline { points, .. } => bounds(points.iter()),
            Shape::Text {
                insert,
                text,
                height,
                ..
            } => {
                let width = height * text.chars().count() as f64;
                (*insert, [insert[0] + width, insert[1] + height])
            }
        }
    }

    fn map_points(&mut self, f: impl Fn(Point) -> Point) {
        match self {
            Shape::Line { start, end } => {
                *start = f(*start);
                *end = f(*end);
            }
            Shape::Circle { center, .. } | Shape::Arc { center, .. } => *center = f(*center),
            Shape::Polyline { points, .. } => {
                for point in points.iter_mut() {
                    *point = f(*point);
                }
            }
            Shape::Text { insert, .. } => *insert = f(*insert),
        }
    }
}

pub fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

fn bounds<'a>(points: impl Iterator<Item = &'a Point>) -> (Point, Point) {
    points.fold(
        ([f64::INFINITY, f64::INFINITY], [f64::NEG_INFINITY, f64::NEG_INFINITY]),
        |(min, max), [x, y]| ([min[0].min(*x), min[1].min(*y)], [max[0].max(*x), max[1].max(*y)]),
    )
}
