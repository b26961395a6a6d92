//! Canvas geometry shared by fields, the layout engine, and resize sessions.
//!
//! Coordinates are `f64` in memory because pointer input is fractional. On the
//! wire, whole numbers are written as JSON integers so stored templates keep
//! their `{x: int, y: int}` shape after `capture_layout` has rounded them.

use serde::{Deserialize, Serialize};

/// Smallest width or height a placed field may have.
pub const MIN_FIELD_EXTENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "coord")]
    pub x: f64,
    #[serde(with = "coord")]
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    #[serde(with = "coord")]
    pub width: f64,
    #[serde(with = "coord")]
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(300.0, 60.0)
    }
}

/// Writes whole-valued coordinates as integers, anything else as a float.
pub(crate) mod coord {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_coordinates_serialize_as_integers() {
        let pos = Position::new(12.0, 40.0);
        assert_eq!(serde_json::to_value(pos).unwrap(), json!({"x": 12, "y": 40}));
    }

    #[test]
    fn test_fractional_coordinates_survive() {
        let pos: Position = serde_json::from_value(json!({"x": 12.5, "y": 3})).unwrap();
        assert_eq!(pos, Position::new(12.5, 3.0));
        assert_eq!(serde_json::to_value(pos).unwrap(), json!({"x": 12.5, "y": 3}));
    }
}
