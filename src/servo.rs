//! Physical model of one servo type: travel limits, actuation range and
//! settle timing. Pure values, no I/O.

use crate::constants::*;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServoError {
    #[error("degenerate angle range: min {min} must be below max {max}")]
    DegenerateRange { min: f64, max: f64 },
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
    #[error("{name} must be non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: f64 },
    #[error("cannot interpolate over a zero-width angle range at {0} degrees")]
    ZeroWidthRange(f64),
}

/// Maps a physical angle to the value the PWM hardware expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoModel {
    angle_min: f64,
    angle_max: f64,
    actuation_min: f64,
    actuation_max: f64,
    update_frequency: f64,
    seconds_per_degree: f64,
}

impl ServoModel {
    pub fn new(
        angle_min: f64,
        angle_max: f64,
        actuation_min: f64,
        actuation_max: f64,
        update_frequency: f64,
        seconds_per_degree: f64,
    ) -> Result<Self, ServoError> {
        for (name, value) in [
            ("angle_min", angle_min),
            ("angle_max", angle_max),
            ("actuation_min", actuation_min),
            ("actuation_max", actuation_max),
            ("update_frequency", update_frequency),
            ("seconds_per_degree", seconds_per_degree),
        ] {
            if !value.is_finite() {
                return Err(ServoError::NonFinite { name, value });
            }
        }
        if !(angle_min < angle_max) {
            return Err(ServoError::DegenerateRange {
                min: angle_min,
                max: angle_max,
            });
        }
        for (name, value) in [
            ("actuation_min", actuation_min),
            ("actuation_max", actuation_max),
            ("seconds_per_degree", seconds_per_degree),
        ] {
            if !(value >= 0.0) {
                return Err(ServoError::NegativeParameter { name, value });
            }
        }

        Ok(ServoModel {
            angle_min,
            angle_max,
            actuation_min,
            actuation_max,
            update_frequency,
            seconds_per_degree,
        })
    }

    /// TowerPro SG90 on 50 Hz software PWM, actuation in duty-cycle percent.
    pub fn sg90() -> Self {
        ServoModel {
            angle_min: SG90_ANGLE_MIN,
            angle_max: SG90_ANGLE_MAX,
            actuation_min: SG90_DUTY_MIN,
            actuation_max: SG90_DUTY_MAX,
            update_frequency: SG90_FREQUENCY_HZ,
            seconds_per_degree: SG90_SECONDS_PER_DEGREE,
        }
    }

    pub fn angle_min(&self) -> f64 {
        self.angle_min
    }

    pub fn angle_max(&self) -> f64 {
        self.angle_max
    }

    pub fn update_frequency(&self) -> f64 {
        self.update_frequency
    }

    pub fn midpoint(&self) -> f64 {
        (self.angle_min + self.angle_max) / 2.0
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        if angle < self.angle_min {
            self.angle_min
        } else if angle > self.angle_max {
            self.angle_max
        } else {
            angle
        }
    }

    /// Seconds to wait after commanding a rotation of `angle_delta` degrees.
    ///
    /// The magnitude is clamped against the absolute travel limits, not a
    /// delta limit, so a model whose `angle_min` is above zero reports at
    /// least `angle_min` degrees worth of settle time.
    pub fn settle_time(&self, angle_delta: f64) -> f64 {
        self.seconds_per_degree * self.clamp(angle_delta.abs())
    }

    pub fn angle_to_actuation(&self, angle: f64) -> Result<f64, ServoError> {
        let span = self.angle_max - self.angle_min;
        if span == 0.0 {
            return Err(ServoError::ZeroWidthRange(self.angle_min));
        }
        Ok(self.actuation_min
            + (self.clamp(angle) - self.angle_min) / span * (self.actuation_max - self.actuation_min))
    }
}
