use crate::{
    driver::{DriverError, PwmDriver},
    servo::{ServoError, ServoModel},
    types::{approx_eq, Axis, Motion},
};
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tokio::time::Duration;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("channel sets disagree: models {models:?}, addresses {addresses:?}, initial angles {initial:?}")]
    ChannelMismatch {
        models: Vec<Axis>,
        addresses: Vec<Axis>,
        initial: Option<Vec<Axis>>,
    },
    #[error("{axis}: {source}")]
    Servo {
        axis: Axis,
        #[source]
        source: ServoError,
    },
    #[error("hardware failure on {axis}: {source}")]
    Hardware {
        axis: Axis,
        #[source]
        source: DriverError,
    },
    #[error("{axis}: settle time of {seconds}s is out of range")]
    SettleTime { axis: Axis, seconds: f64 },
    #[error("failed to release hardware: {0}")]
    Release(#[source] DriverError),
}

/// One servo axis: its physical model and where it is wired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub model: ServoModel,
    pub address: u8,
}

#[derive(Debug, Default)]
struct ControllerState {
    active: HashSet<Axis>,
    current: HashMap<Axis, f64>,
}

/// What the tracking loop needs from a pan/tilt rig.
#[allow(async_fn_in_trait)]
pub trait ServoControl {
    /// Energizes the given axes at their initial angle. Already active axes
    /// are left alone.
    async fn engage(&mut self, axes: &[Axis]) -> Result<(), ControllerError>;

    /// Stops every listed active axis, even after one of them fails, and
    /// reports the first failure.
    fn disengage(&mut self, axes: &[Axis]) -> Result<(), ControllerError>;

    /// Moves each listed axis in order and returns once every one of them
    /// has settled. Inactive axes are skipped.
    async fn move_axes(&mut self, commands: &[(Axis, f64)], motion: Motion) -> Result<(), ControllerError>;

    /// Disengages everything and releases the hardware. Safe to call twice.
    fn shutdown(&mut self) -> Result<(), ControllerError>;

    fn angle(&self, axis: Axis) -> Option<f64>;

    fn is_active(&self, axis: Axis) -> bool;
}

pub struct Controller<D: PwmDriver> {
    driver: D,
    channels: HashMap<Axis, Channel>,
    initial: HashMap<Axis, f64>,
    state: ControllerState,
    released: bool,
}

fn keys<V>(map: &HashMap<Axis, V>) -> BTreeSet<Axis> {
    map.keys().copied().collect()
}

impl<D: PwmDriver> Controller<D> {
    /// Initial angles default to the midpoint of each model's range and are
    /// clamped to it otherwise.
    pub fn new(
        driver: D,
        models: HashMap<Axis, ServoModel>,
        addresses: HashMap<Axis, u8>,
        initial_angles: Option<HashMap<Axis, f64>>,
    ) -> Result<Self, ControllerError> {
        let model_keys = keys(&models);
        let initial_keys = initial_angles.as_ref().map(keys);
        if model_keys != keys(&addresses) || initial_keys.as_ref().is_some_and(|k| *k != model_keys) {
            return Err(ControllerError::ChannelMismatch {
                models: model_keys.into_iter().collect(),
                addresses: keys(&addresses).into_iter().collect(),
                initial: initial_keys.map(|k| k.into_iter().collect()),
            });
        }

        let initial: HashMap<Axis, f64> = models
            .iter()
            .map(|(&axis, model)| {
                let angle = initial_angles
                    .as_ref()
                    .and_then(|angles| angles.get(&axis).copied())
                    .unwrap_or_else(|| model.midpoint());
                (axis, model.clamp(angle))
            })
            .collect();

        let channels = models
            .into_iter()
            .map(|(axis, model)| (axis, Channel { model, address: addresses[&axis] }))
            .collect::<HashMap<_, _>>();

        info!(
            "Controller: initialized, addresses {:?}",
            channels.iter().map(|(a, c)| (a.to_string(), c.address)).collect::<Vec<_>>()
        );

        Ok(Controller {
            driver,
            channels,
            state: ControllerState {
                active: HashSet::new(),
                current: initial.clone(),
            },
            initial,
            released: false,
        })
    }

    pub fn channel(&self, axis: Axis) -> Option<&Channel> {
        self.channels.get(&axis)
    }

    fn actuation(&self, axis: Axis, angle: f64) -> Result<f64, ControllerError> {
        self.channels[&axis]
            .model
            .angle_to_actuation(angle)
            .map_err(|source| ControllerError::Servo { axis, source })
    }
}

fn settle_duration(axis: Axis, seconds: f64) -> Result<Duration, ControllerError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ControllerError::SettleTime { axis, seconds })
}

async fn settle(wait: Duration) {
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}

impl<D: PwmDriver> ServoControl for Controller<D> {
    async fn engage(&mut self, axes: &[Axis]) -> Result<(), ControllerError> {
        if self.released {
            warn!("Controller: engage after shutdown ignored");
            return Ok(());
        }

        let mut started = Vec::new();
        for &axis in axes {
            let Some(&Channel { model, address }) = self.channels.get(&axis) else {
                debug!("Controller: no channel for {}", axis);
                continue;
            };
            if self.state.active.contains(&axis) {
                continue;
            }

            let angle = self.initial[&axis];
            let value = self.actuation(axis, angle)?;
            let wait = settle_duration(axis, model.settle_time(model.angle_max()))?;
            self.driver
                .start(address, model.update_frequency(), value)
                .map_err(|source| ControllerError::Hardware { axis, source })?;
            settle(wait).await;

            self.state.current.insert(axis, angle);
            self.state.active.insert(axis);
            started.push(axis);
        }

        if !started.is_empty() {
            info!("Controller: started {:?}", started);
        }
        Ok(())
    }

    fn disengage(&mut self, axes: &[Axis]) -> Result<(), ControllerError> {
        let mut stopped = Vec::new();
        let mut first_error = None;
        for &axis in axes {
            if !self.state.active.contains(&axis) {
                continue;
            }
            let address = self.channels[&axis].address;
            match self.driver.stop(address) {
                Ok(()) => {
                    self.state.active.remove(&axis);
                    stopped.push(axis);
                }
                Err(source) => {
                    error!("Controller: failed to stop {}: {}", axis, source);
                    if first_error.is_none() {
                        first_error = Some(ControllerError::Hardware { axis, source });
                    }
                }
            }
        }

        if !stopped.is_empty() {
            info!("Controller: stopped {:?}", stopped);
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn move_axes(&mut self, commands: &[(Axis, f64)], motion: Motion) -> Result<(), ControllerError> {
        for &(axis, value) in commands {
            if !self.state.active.contains(&axis) {
                continue;
            }

            let Channel { model, address } = self.channels[&axis];
            let current = self.state.current[&axis];
            let target = model.clamp(match motion {
                Motion::Absolute => value,
                Motion::Relative => current + value,
            });
            if approx_eq(current, target) {
                continue;
            }

            let wait = settle_duration(axis, model.settle_time((target - current).abs()))?;
            debug!("Controller: rotating {} from {} to {}, settling {:?}", axis, current, target, wait);

            let actuation = self.actuation(axis, target)?;
            self.driver
                .set(address, actuation)
                .map_err(|source| ControllerError::Hardware { axis, source })?;
            settle(wait).await;
            self.driver
                .relax(address)
                .map_err(|source| ControllerError::Hardware { axis, source })?;

            self.state.current.insert(axis, target);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ControllerError> {
        if self.released {
            return Ok(());
        }

        let mut active: Vec<Axis> = self.state.active.iter().copied().collect();
        active.sort();
        let stopped = self.disengage(&active);

        let released = self.driver.release().map_err(ControllerError::Release);
        self.released = true;
        info!("Controller: released");

        stopped.and(released)
    }

    fn angle(&self, axis: Axis) -> Option<f64> {
        self.state.current.get(&axis).copied()
    }

    fn is_active(&self, axis: Axis) -> bool {
        self.state.active.contains(&axis)
    }
}

impl<D: PwmDriver> Drop for Controller<D> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Controller: dropped without shutdown, releasing hardware");
            if let Err(e) = self.shutdown() {
                error!("Controller: shutdown on drop failed: {}", e);
            }
        }
    }
}
