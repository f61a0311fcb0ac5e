//! Positions reported in agent metadata.

use serde::{Deserialize, Serialize};

/// A point in simulation space. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    /// Horizontal x coordinate.
    #[serde(default)]
    pub x: f64,
    /// Vertical coordinate.
    #[serde(default)]
    pub y: f64,
    /// Horizontal z coordinate.
    #[serde(default)]
    pub z: f64,
}

impl Point3 {
    /// Construct a point from its three coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
