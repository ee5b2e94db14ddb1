// Camera frame
pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 240;

// SG90 micro servo driven by software PWM (duty-cycle percent)
pub const SG90_ANGLE_MIN: f64 = 0.0;
pub const SG90_ANGLE_MAX: f64 = 180.0;
pub const SG90_DUTY_MIN: f64 = 2.8;
pub const SG90_DUTY_MAX: f64 = 12.8;
pub const SG90_FREQUENCY_HZ: f64 = 50.0;
pub const SG90_SECONDS_PER_DEGREE: f64 = 0.003;

// BCM numbering
pub const PAN_PIN: u8 = 18;
pub const TILT_PIN: u8 = 13;
pub const LED_PIN: u8 = 16;

// Raster scan grid, degrees
pub const PAN_MIN: f64 = 0.0;
pub const PAN_MAX: f64 = 180.0;
pub const PAN_STEP: f64 = 10.0;
pub const TILT_MIN: f64 = 70.0;
pub const TILT_MAX: f64 = 110.0;
pub const TILT_STEP: f64 = 10.0;

// Correction policy
pub const ALLOW_ERR_LIMIT: u32 = 8;
pub const EXT_RATES: [f64; 6] = [0.15, 0.32, 0.49, 0.66, 0.83, 1.00];
pub const ADJUST_EXT_PAN: f64 = 1.60;
pub const ADJUST_EXT_TILT: f64 = 1.20;

// PCA9685 board
pub const PCA9685_ADDRESS: u16 = 0x40;
pub const PCA9685_FREQUENCY_HZ: f64 = 50.0;
pub const PCA9685_CHANNELS: u8 = 16;
pub const PCA9685_TICKS: f64 = 4096.0;
// Servo types whose whole actuation range sits below this many ticks were
// written for duty-cycle percent, not PCA9685 ticks.
pub const PCA9685_MIN_ACTUATION_TICKS: f64 = PCA9685_TICKS / 100.0;

/// Two angles closer than this are treated as the same commanded position.
pub const ANGLE_TOLERANCE: f64 = 1e-9;
