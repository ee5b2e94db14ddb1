//! Hardware actuation backends.
//!
//! A driver latches one actuation value per hardware address and returns;
//! waiting for the servo to physically arrive is the controller's job.

mod gpio;
mod pca9685;
mod recording;

pub use gpio::GpioPwm;
pub use pca9685::Pca9685;
pub use recording::{DriverCommand, RecordingDriver};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),
    #[error("address {0} has not been started")]
    NotStarted(u8),
    #[error("PCA9685 has no channel {0}")]
    InvalidChannel(u8),
    #[error("write to address {0} failed")]
    WriteFailed(u8),
}

pub trait PwmDriver {
    /// Begins output on `address` at `frequency_hz` with the given actuation value.
    fn start(&mut self, address: u8, frequency_hz: f64, value: f64) -> Result<(), DriverError>;

    fn set(&mut self, address: u8, value: f64) -> Result<(), DriverError>;

    /// Called once a move has settled. Backends whose output jitters while
    /// holding position can drop the pulse here.
    fn relax(&mut self, _address: u8) -> Result<(), DriverError> {
        Ok(())
    }

    fn stop(&mut self, address: u8) -> Result<(), DriverError>;

    /// Releases the underlying bus or pins. No further commands follow.
    fn release(&mut self) -> Result<(), DriverError>;
}

impl<D: PwmDriver + ?Sized> PwmDriver for Box<D> {
    fn start(&mut self, address: u8, frequency_hz: f64, value: f64) -> Result<(), DriverError> {
        (**self).start(address, frequency_hz, value)
    }

    fn set(&mut self, address: u8, value: f64) -> Result<(), DriverError> {
        (**self).set(address, value)
    }

    fn relax(&mut self, address: u8) -> Result<(), DriverError> {
        (**self).relax(address)
    }

    fn stop(&mut self, address: u8) -> Result<(), DriverError> {
        (**self).stop(address)
    }

    fn release(&mut self) -> Result<(), DriverError> {
        (**self).release()
    }
}
