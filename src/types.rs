use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter};

#[derive(Debug, EnumIter, Display, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    Pan,  // left to right
    Tilt, // down to up
}

/// How the angle of a move command is interpreted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Motion {
    Absolute,
    Relative,
}

/// Axis-aligned detection rectangle in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Region { x, y, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseRegionError(pub String);

impl fmt::Display for ParseRegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid region {:?}, expected x,y,w,h", self.0)
    }
}

impl std::error::Error for ParseRegionError {}

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .map(|f| f.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ParseRegionError(s.to_string()))?;

        match fields.as_slice() {
            &[x, y, width, height] if width >= 0.0 && height >= 0.0 => {
                Ok(Region::new(x, y, width, height))
            }
            _ => Err(ParseRegionError(s.to_string())),
        }
    }
}

/// Width and height of the camera frame the detector reports in.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn half_width(&self) -> f64 {
        self.width as f64 / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height as f64 / 2.0
    }

    /// Offset of a point from the frame center, in pixels.
    pub fn offset_of(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x - self.half_width(), y - self.half_height())
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        use crate::constants::{FRAME_HEIGHT, FRAME_WIDTH};
        FrameGeometry {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    use crate::constants::ANGLE_TOLERANCE;
    (a - b).abs() <= ANGLE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}
