use crate::driver::DriverError;
use rppal::gpio::{Gpio, OutputPin};

/// Signals whether a target is currently selected.
pub trait Indicator {
    fn set_tracking(&mut self, tracking: bool) -> Result<(), DriverError>;
}

pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn set_tracking(&mut self, _tracking: bool) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Status LED on a GPIO pin (BCM numbering).
pub struct GpioIndicator {
    pin: OutputPin,
    active_low: bool,
}

impl GpioIndicator {
    pub fn new(pin: u8, active_low: bool) -> Result<Self, DriverError> {
        let pin = Gpio::new()?.get(pin)?.into_output();
        let mut indicator = GpioIndicator { pin, active_low };
        indicator.set_tracking(false)?;
        Ok(indicator)
    }
}

impl Indicator for GpioIndicator {
    fn set_tracking(&mut self, tracking: bool) -> Result<(), DriverError> {
        if tracking != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}
