use super::{DriverError, PwmDriver};
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    Start { address: u8, frequency_hz: f64, value: f64 },
    Set { address: u8, value: f64 },
    Relax { address: u8 },
    Stop { address: u8 },
    Release,
}

#[derive(Debug, Default)]
struct Log {
    commands: Vec<DriverCommand>,
    fail_writes: bool,
    failing_stop: Option<u8>,
}

/// Driver without hardware. Every command is appended to a log shared by
/// all clones, so a test can keep one handle while the controller owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    log: Arc<Mutex<Log>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<DriverCommand> {
        self.log.lock().commands.clone()
    }

    pub fn clear(&self) {
        self.log.lock().commands.clear();
    }

    /// Makes subsequent `start` and `set` calls fail.
    pub fn fail_writes(&self, fail: bool) {
        self.log.lock().fail_writes = fail;
    }

    /// Makes `stop` fail for one address, or for none.
    pub fn fail_stop(&self, address: Option<u8>) {
        self.log.lock().failing_stop = address;
    }

    fn record(&self, command: DriverCommand) {
        debug!("driver: {:?}", command);
        self.log.lock().commands.push(command);
    }

    fn check_write(&self, address: u8) -> Result<(), DriverError> {
        if self.log.lock().fail_writes {
            Err(DriverError::WriteFailed(address))
        } else {
            Ok(())
        }
    }
}

impl PwmDriver for RecordingDriver {
    fn start(&mut self, address: u8, frequency_hz: f64, value: f64) -> Result<(), DriverError> {
        self.check_write(address)?;
        self.record(DriverCommand::Start {
            address,
            frequency_hz,
            value,
        });
        Ok(())
    }

    fn set(&mut self, address: u8, value: f64) -> Result<(), DriverError> {
        self.check_write(address)?;
        self.record(DriverCommand::Set { address, value });
        Ok(())
    }

    fn relax(&mut self, address: u8) -> Result<(), DriverError> {
        self.record(DriverCommand::Relax { address });
        Ok(())
    }

    fn stop(&mut self, address: u8) -> Result<(), DriverError> {
        if self.log.lock().failing_stop == Some(address) {
            return Err(DriverError::WriteFailed(address));
        }
        self.record(DriverCommand::Stop { address });
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverError> {
        self.record(DriverCommand::Release);
        Ok(())
    }
}
