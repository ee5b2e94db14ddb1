use super::{DriverError, PwmDriver};
use log::{debug, info};
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;

struct PwmPin {
    pin: OutputPin,
    frequency_hz: f64,
}

/// Software PWM on Raspberry Pi GPIO pins (BCM numbering). Actuation values
/// are duty-cycle percentages.
pub struct GpioPwm {
    gpio: Gpio,
    pins: HashMap<u8, PwmPin>,
}

impl GpioPwm {
    pub fn new() -> Result<Self, DriverError> {
        let gpio = Gpio::new()?;
        info!("GPIO software PWM ready");
        Ok(GpioPwm {
            gpio,
            pins: HashMap::new(),
        })
    }

    fn pin(&mut self, address: u8) -> Result<&mut PwmPin, DriverError> {
        self.pins.get_mut(&address).ok_or(DriverError::NotStarted(address))
    }
}

fn duty_cycle(percent: f64) -> f64 {
    (percent / 100.0).clamp(0.0, 1.0)
}

impl PwmDriver for GpioPwm {
    fn start(&mut self, address: u8, frequency_hz: f64, value: f64) -> Result<(), DriverError> {
        if !self.pins.contains_key(&address) {
            let pin = self.gpio.get(address)?.into_output_low();
            self.pins.insert(address, PwmPin { pin, frequency_hz });
        }
        let pwm = self.pin(address)?;
        pwm.frequency_hz = frequency_hz;
        pwm.pin.set_pwm_frequency(frequency_hz, duty_cycle(value))?;
        debug!("GPIO {} started at {} Hz, duty {}%", address, frequency_hz, value);
        Ok(())
    }

    fn set(&mut self, address: u8, value: f64) -> Result<(), DriverError> {
        let pwm = self.pin(address)?;
        pwm.pin.set_pwm_frequency(pwm.frequency_hz, duty_cycle(value))?;
        Ok(())
    }

    fn relax(&mut self, address: u8) -> Result<(), DriverError> {
        let pwm = self.pin(address)?;
        pwm.pin.set_pwm_frequency(pwm.frequency_hz, 0.0)?;
        Ok(())
    }

    fn stop(&mut self, address: u8) -> Result<(), DriverError> {
        if let Some(mut pwm) = self.pins.remove(&address) {
            pwm.pin.clear_pwm()?;
            pwm.pin.set_low();
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverError> {
        for (_, mut pwm) in self.pins.drain() {
            pwm.pin.clear_pwm()?;
        }
        info!("GPIO released");
        Ok(())
    }
}
