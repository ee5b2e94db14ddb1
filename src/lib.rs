mod constants;
mod types;
pub mod config;
pub mod controller;
pub mod correction;
pub mod detector;
pub mod driver;
pub mod indicator;
pub mod scan;
pub mod servo;
pub mod tracking;

pub use controller::{Channel, Controller, ControllerError, ServoControl};
pub use servo::{ServoError, ServoModel};
pub use tracking::{Tracker, TrackingError};
pub use types::{Axis, FrameGeometry, Motion, ParseRegionError, Region};
