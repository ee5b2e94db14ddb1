//! Startup configuration, read once from a TOML file. Every section falls
//! back to the SG90 pan/tilt rig defaults, so an empty file is valid.

use crate::{
    constants::*,
    correction::CorrectionPolicy,
    scan::{AxisRange, ScanGrid},
    servo::{ServoError, ServoModel},
    tracking::TrackingSettings,
    types::{Axis, FrameGeometry},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("servo type {name:?}: {source}")]
    Servo {
        name: String,
        #[source]
        source: ServoError,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoSpec {
    pub angle_min: f64,
    pub angle_max: f64,
    pub actuation_min: f64,
    pub actuation_max: f64,
    pub update_frequency: f64,
    pub seconds_per_degree: f64,
}

impl ServoSpec {
    pub fn build(&self) -> Result<ServoModel, ServoError> {
        ServoModel::new(
            self.angle_min,
            self.angle_max,
            self.actuation_min,
            self.actuation_max,
            self.update_frequency,
            self.seconds_per_degree,
        )
    }

    fn sg90() -> Self {
        ServoSpec {
            angle_min: SG90_ANGLE_MIN,
            angle_max: SG90_ANGLE_MAX,
            actuation_min: SG90_DUTY_MIN,
            actuation_max: SG90_DUTY_MAX,
            update_frequency: SG90_FREQUENCY_HZ,
            seconds_per_degree: SG90_SECONDS_PER_DEGREE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub servo: String,
    pub address: u8,
    pub initial_angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelsSettings {
    pub pan: ChannelSpec,
    pub tilt: ChannelSpec,
}

impl Default for ChannelsSettings {
    fn default() -> Self {
        let channel = |address| ChannelSpec {
            servo: "sg90".to_string(),
            address,
            initial_angle: None,
        };
        ChannelsSettings {
            pan: channel(PAN_PIN),
            tilt: channel(TILT_PIN),
        }
    }
}

impl ChannelsSettings {
    pub fn get(&self, axis: Axis) -> &ChannelSpec {
        match axis {
            Axis::Pan => &self.pan,
            Axis::Tilt => &self.tilt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    Gpio,
    Pca9685 {
        #[serde(default = "default_i2c_bus")]
        bus: u8,
        #[serde(default = "default_pca9685_address")]
        address: u16,
        #[serde(default = "default_pca9685_frequency")]
        frequency: f64,
    },
}

fn default_i2c_bus() -> u8 {
    1
}

fn default_pca9685_address() -> u16 {
    PCA9685_ADDRESS
}

fn default_pca9685_frequency() -> f64 {
    PCA9685_FREQUENCY_HZ
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    pub pan: AxisRange,
    pub tilt: AxisRange,
    pub start_pan: Option<f64>,
    pub start_tilt: Option<f64>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            pan: AxisRange::new(PAN_MIN, PAN_MAX, PAN_STEP),
            tilt: AxisRange::new(TILT_MIN, TILT_MAX, TILT_STEP),
            start_pan: None,
            start_tilt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrectionSettings {
    pub base_pan: f64,
    pub base_tilt: f64,
    pub bands: [f64; 6],
    pub miss_tolerance: u32,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        let policy = CorrectionPolicy::default();
        CorrectionSettings {
            base_pan: policy.base_pan,
            base_tilt: policy.base_tilt,
            bands: policy.bands,
            miss_tolerance: ALLOW_ERR_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorSettings {
    pub pin: u8,
    pub active_low: bool,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        IndicatorSettings {
            pin: LED_PIN,
            active_low: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub frame: FrameGeometry,
    pub servos: HashMap<String, ServoSpec>,
    pub channels: ChannelsSettings,
    pub backend: Backend,
    pub scan: ScanSettings,
    pub correction: CorrectionSettings,
    pub indicator: Option<IndicatorSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            frame: FrameGeometry::default(),
            servos: HashMap::from([("sg90".to_string(), ServoSpec::sg90())]),
            channels: ChannelsSettings::default(),
            backend: Backend::Gpio,
            scan: ScanSettings::default(),
            correction: CorrectionSettings::default(),
            indicator: None,
        }
    }
}

/// Per-axis maps in the shape `Controller::new` takes.
pub struct ChannelMaps {
    pub models: HashMap<Axis, ServoModel>,
    pub addresses: HashMap<Axis, u8>,
    pub initial_angles: HashMap<Axis, f64>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = toml::from_str(text)?;
        settings
            .servos
            .entry("sg90".to_string())
            .or_insert_with(ServoSpec::sg90);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(ConfigError::Invalid("frame dimensions must be non-zero".into()));
        }

        self.channel_maps()?;

        for axis in Axis::iter() {
            let channel = self.channels.get(axis);
            if channel.initial_angle.is_some_and(|a| !a.is_finite()) {
                return Err(ConfigError::Invalid(format!("{} initial angle must be finite", axis)));
            }
            if let Backend::Pca9685 { .. } = self.backend {
                let spec = &self.servos[&channel.servo];
                if spec.actuation_min.max(spec.actuation_max) < PCA9685_MIN_ACTUATION_TICKS {
                    return Err(ConfigError::Invalid(format!(
                        "servo type {:?} on {} has actuation range [{}, {}], which is duty percent; \
                         the pca9685 backend takes ticks out of {}",
                        channel.servo, axis, spec.actuation_min, spec.actuation_max, PCA9685_TICKS
                    )));
                }
            }
        }

        for (axis, range, start) in [
            ("pan", &self.scan.pan, self.scan.start_pan),
            ("tilt", &self.scan.tilt, self.scan.start_tilt),
        ] {
            let finite = [range.min, range.max, range.step].iter().all(|v| v.is_finite());
            if !finite || !(range.step > 0.0) || !(range.min < range.max) {
                return Err(ConfigError::Invalid(format!(
                    "scan {} range [{}, {}] step {} is not a usable grid",
                    axis, range.min, range.max, range.step
                )));
            }
            if start.is_some_and(|s| !s.is_finite()) {
                return Err(ConfigError::Invalid(format!("scan start_{} must be finite", axis)));
            }
        }

        let correction = &self.correction;
        if !correction.base_pan.is_finite() || !correction.base_tilt.is_finite() {
            return Err(ConfigError::Invalid("correction gains must be finite".into()));
        }
        let bands = &correction.bands;
        if !(bands[0] > 0.0) || !bands[5].is_finite() || bands.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(ConfigError::Invalid(format!(
                "correction bands {:?} must be positive and strictly increasing",
                bands
            )));
        }
        Ok(())
    }

    pub fn channel_maps(&self) -> Result<ChannelMaps, ConfigError> {
        let mut maps = ChannelMaps {
            models: HashMap::new(),
            addresses: HashMap::new(),
            initial_angles: HashMap::new(),
        };

        for axis in Axis::iter() {
            let channel = self.channels.get(axis);
            let spec = self.servos.get(&channel.servo).ok_or_else(|| {
                ConfigError::Invalid(format!("{} refers to unknown servo type {:?}", axis, channel.servo))
            })?;
            let model = spec.build().map_err(|source| ConfigError::Servo {
                name: channel.servo.clone(),
                source,
            })?;

            maps.models.insert(axis, model);
            maps.addresses.insert(axis, channel.address);
            maps.initial_angles
                .insert(axis, channel.initial_angle.unwrap_or_else(|| model.midpoint()));
        }
        Ok(maps)
    }

    pub fn tracking(&self) -> TrackingSettings {
        let start = match (self.scan.start_pan, self.scan.start_tilt) {
            (None, None) => None,
            (pan, tilt) => Some((
                pan.unwrap_or_else(|| self.scan.pan.midpoint()),
                tilt.unwrap_or_else(|| self.scan.tilt.midpoint()),
            )),
        };

        TrackingSettings {
            frame: self.frame,
            grid: ScanGrid {
                pan: self.scan.pan,
                tilt: self.scan.tilt,
            },
            policy: CorrectionPolicy {
                base_pan: self.correction.base_pan,
                base_tilt: self.correction.base_tilt,
                bands: self.correction.bands,
            },
            miss_tolerance: self.correction.miss_tolerance,
            start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_rig_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.backend, Backend::Gpio);

        let tracking = settings.tracking();
        assert_eq!(tracking.miss_tolerance, 8);
        assert_eq!(tracking.grid.tilt, AxisRange::new(70.0, 110.0, 10.0));
        assert_eq!(tracking.start, None);

        let maps = settings.channel_maps().unwrap();
        assert_eq!(maps.addresses[&Axis::Pan], 18);
        assert_eq!(maps.addresses[&Axis::Tilt], 13);
        assert_eq!(maps.initial_angles[&Axis::Tilt], 90.0);
        assert_eq!(maps.models[&Axis::Pan], ServoModel::sg90());
    }

    #[test]
    fn parses_full_file() {
        let settings = Settings::from_toml(
            r#"
            [frame]
            width = 640
            height = 480

            [servos.mg995]
            angle_min = 0.0
            angle_max = 180.0
            actuation_min = 102.0
            actuation_max = 512.0
            update_frequency = 50.0
            seconds_per_degree = 0.002

            [channels.pan]
            servo = "mg995"
            address = 0

            [channels.tilt]
            servo = "mg995"
            address = 1
            initial_angle = 100.0

            [backend]
            kind = "pca9685"
            address = 0x41

            [scan]
            pan = { min = 20.0, max = 160.0, step = 20.0 }
            start_tilt = 80.0

            [correction]
            base_pan = 2.0
            miss_tolerance = 3

            [indicator]
            pin = 21
            "#,
        )
        .unwrap();

        assert_eq!(settings.frame, FrameGeometry { width: 640, height: 480 });
        assert_eq!(
            settings.backend,
            Backend::Pca9685 {
                bus: 1,
                address: 0x41,
                frequency: 50.0
            }
        );
        assert_eq!(
            settings.indicator,
            Some(IndicatorSettings {
                pin: 21,
                active_low: true
            })
        );

        let tracking = settings.tracking();
        assert_eq!(tracking.start, Some((90.0, 80.0)));
        assert_eq!(tracking.policy.base_pan, 2.0);
        assert_eq!(tracking.policy.base_tilt, 1.20);
        assert_eq!(tracking.miss_tolerance, 3);

        let maps = settings.channel_maps().unwrap();
        assert_eq!(maps.initial_angles[&Axis::Tilt], 100.0);
        assert_eq!(maps.initial_angles[&Axis::Pan], 90.0);
        assert_eq!(maps.addresses[&Axis::Tilt], 1);
    }

    #[test]
    fn rejects_inconsistent_files() {
        let unknown_servo = r#"
            [channels.pan]
            servo = "nope"
            address = 18
            [channels.tilt]
            servo = "sg90"
            address = 13
        "#;
        assert!(matches!(Settings::from_toml(unknown_servo), Err(ConfigError::Invalid(_))));

        let degenerate = r#"
            [servos.sg90]
            angle_min = 90.0
            angle_max = 90.0
            actuation_min = 2.8
            actuation_max = 12.8
            update_frequency = 50.0
            seconds_per_degree = 0.003
        "#;
        assert!(matches!(
            Settings::from_toml(degenerate),
            Err(ConfigError::Servo {
                source: ServoError::DegenerateRange { .. },
                ..
            })
        ));

        let bands = "[correction]\nbands = [0.15, 0.32, 0.30, 0.66, 0.83, 1.0]";
        assert!(matches!(Settings::from_toml(bands), Err(ConfigError::Invalid(_))));

        let step = "[scan]\ntilt = { min = 70.0, max = 110.0, step = 0.0 }";
        assert!(matches!(Settings::from_toml(step), Err(ConfigError::Invalid(_))));

        assert!(matches!(Settings::from_toml("[frame]\nwidth = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_non_finite_values() {
        let servo = r#"
            [servos.sg90]
            angle_min = 0.0
            angle_max = 180.0
            actuation_min = 2.8
            actuation_max = 12.8
            update_frequency = 50.0
            seconds_per_degree = inf
        "#;
        assert!(matches!(
            Settings::from_toml(servo),
            Err(ConfigError::Servo {
                source: ServoError::NonFinite {
                    name: "seconds_per_degree",
                    ..
                },
                ..
            })
        ));

        for text in [
            "[scan]\npan = { min = -inf, max = 180.0, step = 10.0 }",
            "[scan]\ntilt = { min = 70.0, max = inf, step = 10.0 }",
            "[scan]\npan = { min = 0.0, max = 180.0, step = inf }",
            "[scan]\nstart_pan = nan",
            "[correction]\nbase_tilt = inf",
            "[correction]\nbands = [0.15, 0.32, 0.49, 0.66, 0.83, inf]",
            "[channels.pan]\nservo = \"sg90\"\naddress = 18\ninitial_angle = nan",
        ] {
            assert!(
                matches!(Settings::from_toml(text), Err(ConfigError::Invalid(_))),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn pca9685_rejects_duty_percent_servo_types() {
        let err = Settings::from_toml("[backend]\nkind = \"pca9685\"").err();
        assert!(matches!(err, Some(ConfigError::Invalid(ref m)) if m.contains("sg90")));

        let mut settings = Settings {
            backend: Backend::Pca9685 {
                bus: 1,
                address: PCA9685_ADDRESS,
                frequency: PCA9685_FREQUENCY_HZ,
            },
            ..Settings::default()
        };
        settings.servos.insert(
            "sg90".to_string(),
            ServoSpec {
                actuation_min: 0.028 * PCA9685_TICKS,
                actuation_max: 0.128 * PCA9685_TICKS,
                ..ServoSpec::sg90()
            },
        );
        assert!(settings.validate().is_ok());
    }
}
