use super::{DriverError, PwmDriver};
use crate::constants::{PCA9685_CHANNELS, PCA9685_TICKS};
use log::{info, warn};
use rppal::i2c::I2c;
use std::thread;
use std::time::Duration;

const MODE1: u8 = 0x00;
const MODE2: u8 = 0x01;
const LED0_ON_L: u8 = 0x06;
const ALL_LED_ON_L: u8 = 0xFA;
const PRESCALE: u8 = 0xFE;

const RESTART: u8 = 0x80;
const SLEEP: u8 = 0x10;
const ALLCALL: u8 = 0x01;
const OUTDRV: u8 = 0x04;
const FULL_OFF: u8 = 0x10;

const OSCILLATOR_HZ: f64 = 25_000_000.0;
const OSCILLATOR_SETTLE: Duration = Duration::from_millis(5);

/// 16-channel, 12-bit PWM board on the I2C bus. Actuation values are the
/// "off" tick count within the 4096-tick period.
pub struct Pca9685 {
    i2c: I2c,
    frequency_hz: f64,
}

impl Pca9685 {
    pub fn new(bus: u8, address: u16, frequency_hz: f64) -> Result<Self, DriverError> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;

        let mut board = Pca9685 { i2c, frequency_hz };
        board.write_all(0, 0)?;
        board.i2c.smbus_write_byte(MODE2, OUTDRV)?;
        board.i2c.smbus_write_byte(MODE1, ALLCALL)?;
        thread::sleep(OSCILLATOR_SETTLE);
        let mode = board.i2c.smbus_read_byte(MODE1)? & !SLEEP;
        board.i2c.smbus_write_byte(MODE1, mode)?;
        thread::sleep(OSCILLATOR_SETTLE);
        board.set_frequency(frequency_hz)?;

        info!("PCA9685 at {:#04x} on bus {} running at {} Hz", address, bus, frequency_hz);
        Ok(board)
    }

    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), DriverError> {
        let prescale = (OSCILLATOR_HZ / PCA9685_TICKS / frequency_hz - 1.0 + 0.5).floor() as u8;
        let old_mode = self.i2c.smbus_read_byte(MODE1)?;
        self.i2c.smbus_write_byte(MODE1, (old_mode & 0x7F) | SLEEP)?;
        self.i2c.smbus_write_byte(PRESCALE, prescale)?;
        self.i2c.smbus_write_byte(MODE1, old_mode)?;
        thread::sleep(OSCILLATOR_SETTLE);
        self.i2c.smbus_write_byte(MODE1, old_mode | RESTART)?;
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    fn write_registers(&mut self, base: u8, on: u16, off: u16) -> Result<(), DriverError> {
        let bytes = [on as u8, (on >> 8) as u8, off as u8, (off >> 8) as u8];
        for (offset, byte) in bytes.into_iter().enumerate() {
            self.i2c.smbus_write_byte(base + offset as u8, byte)?;
        }
        Ok(())
    }

    fn write_channel(&mut self, channel: u8, on: u16, off: u16) -> Result<(), DriverError> {
        if channel >= PCA9685_CHANNELS {
            return Err(DriverError::InvalidChannel(channel));
        }
        self.write_registers(LED0_ON_L + 4 * channel, on, off)
    }

    fn write_all(&mut self, on: u16, off: u16) -> Result<(), DriverError> {
        self.write_registers(ALL_LED_ON_L, on, off)
    }
}

fn ticks(value: f64) -> u16 {
    value.round().clamp(0.0, PCA9685_TICKS - 1.0) as u16
}

impl PwmDriver for Pca9685 {
    fn start(&mut self, address: u8, frequency_hz: f64, value: f64) -> Result<(), DriverError> {
        if frequency_hz != self.frequency_hz {
            warn!(
                "channel {} wants {} Hz but the board runs all channels at {} Hz",
                address, frequency_hz, self.frequency_hz
            );
        }
        self.set(address, value)
    }

    fn set(&mut self, address: u8, value: f64) -> Result<(), DriverError> {
        self.write_channel(address, 0, ticks(value))
    }

    fn stop(&mut self, address: u8) -> Result<(), DriverError> {
        self.write_channel(address, 0, u16::from(FULL_OFF) << 8)
    }

    fn release(&mut self) -> Result<(), DriverError> {
        self.write_all(0, u16::from(FULL_OFF) << 8)?;
        info!("PCA9685 released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ticks;

    #[test]
    fn ticks_round_and_saturate() {
        assert_eq!(ticks(307.4), 307);
        assert_eq!(ticks(307.5), 308);
        assert_eq!(ticks(-3.0), 0);
        assert_eq!(ticks(5000.0), 4095);
    }
}
