use crate::{
    controller::{ControllerError, ServoControl},
    correction::CorrectionPolicy,
    detector::Detector,
    driver::DriverError,
    indicator::{Indicator, NullIndicator},
    scan::{Advance, ScanCursor, ScanGrid},
    types::{Axis, FrameGeometry, Motion, Region},
};
use log::{debug, info};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("status indicator failed: {0}")]
    Indicator(#[source] DriverError),
}

/// Static parameters of the scan and acquisition loops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    pub frame: FrameGeometry,
    pub grid: ScanGrid,
    pub policy: CorrectionPolicy,
    /// Consecutive empty frames tolerated once a target has been seen.
    pub miss_tolerance: u32,
    /// First waypoint; the grid center when absent.
    pub start: Option<(f64, f64)>,
}

/// Per-waypoint acquisition bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionState {
    pub is_tracking: bool,
    pub misses: u32,
    pub target_seen: bool,
}

impl AcquisitionState {
    /// Records one frame and returns whether acquisition continues.
    pub fn observe(&mut self, found: bool, miss_tolerance: u32) -> bool {
        if found {
            self.misses = 0;
            self.target_seen = true;
            self.is_tracking = true;
        } else if self.target_seen && self.misses <= miss_tolerance {
            self.misses += 1;
            self.is_tracking = true;
        } else {
            self.misses = 0;
            self.target_seen = false;
            self.is_tracking = false;
        }
        self.is_tracking
    }
}

/// Picks the candidate whose center is nearest the frame center. Ties go
/// to the earliest candidate.
pub fn select_target(regions: &[Region], frame: &FrameGeometry) -> Option<Region> {
    if let [only] = regions {
        return Some(*only);
    }

    let distance2 = |region: &Region| {
        let (ox, oy) = frame.offset_of(region.center());
        ox * ox + oy * oy
    };
    regions.iter().fold(None, |best: Option<(Region, f64)>, region| {
        let d = distance2(region);
        match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((*region, d)),
        }
    })
    .map(|(region, _)| region)
}

/// Raster-scans the grid and, whenever the detector reports a target,
/// holds position and steers towards it.
pub struct Tracker<C: ServoControl, T: Detector> {
    controller: C,
    detector: T,
    indicator: Box<dyn Indicator>,
    settings: TrackingSettings,
    cursor: ScanCursor,
    acquisition: AcquisitionState,
}

impl<C: ServoControl, T: Detector> Tracker<C, T> {
    pub fn new(controller: C, detector: T, settings: TrackingSettings) -> Self {
        let cursor = match settings.start {
            Some((pan, tilt)) => ScanCursor::new(settings.grid.pan.snap(pan), settings.grid.tilt.snap(tilt)),
            None => settings.grid.center(),
        };
        Tracker {
            controller,
            detector,
            indicator: Box::new(NullIndicator),
            settings,
            cursor,
            acquisition: AcquisitionState::default(),
        }
    }

    pub fn with_indicator(mut self, indicator: Box<dyn Indicator>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    pub fn acquisition(&self) -> &AcquisitionState {
        &self.acquisition
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Engages both axes and scans forever. Only returns on a fatal error.
    pub async fn run(&mut self) -> Result<(), TrackingError> {
        self.controller.engage(&[Axis::Pan, Axis::Tilt]).await?;
        loop {
            self.visit_waypoint().await?;
        }
    }

    /// Moves to the current waypoint, acquires until the target is gone,
    /// then advances the cursor.
    pub async fn visit_waypoint(&mut self) -> Result<Advance, TrackingError> {
        let (pan, tilt) = self.cursor.waypoint();
        debug!("waypoint pan {} tilt {}", pan, tilt);
        self.controller
            .move_axes(&[(Axis::Tilt, tilt), (Axis::Pan, pan)], Motion::Absolute)
            .await?;

        self.acquire().await?;

        let advance = self.cursor.advance(&self.settings.grid);
        match advance {
            Advance::Pan => {}
            Advance::Row => debug!("next row, tilt {}", self.cursor.tilt),
            Advance::Sweep => info!(
                "sweep complete, reversing (pan sweep {}, tilt sweep {})",
                self.cursor.pan_sweep, self.cursor.tilt_sweep
            ),
        }
        Ok(advance)
    }

    async fn acquire(&mut self) -> Result<(), TrackingError> {
        self.acquisition = AcquisitionState::default();
        loop {
            let started = Instant::now();
            let regions = self.detector.detect().await;
            let target = select_target(&regions, &self.settings.frame);
            debug!("detected {} candidate(s)", regions.len());

            self.indicator
                .set_tracking(target.is_some())
                .map_err(TrackingError::Indicator)?;
            let tracking = self
                .acquisition
                .observe(target.is_some(), self.settings.miss_tolerance);
            if let Some(region) = target {
                self.steer(region).await?;
            }

            debug!("frame handled in {:?}", started.elapsed());
            if !tracking {
                return Ok(());
            }
        }
    }

    async fn steer(&mut self, target: Region) -> Result<(), TrackingError> {
        let frame = self.settings.frame;
        let offset = frame.offset_of(target.center());
        let Some((pan, tilt)) = self.settings.policy.correction(offset, &frame) else {
            debug!("target centered, offset ({:.1}, {:.1})", offset.0, offset.1);
            return Ok(());
        };

        info!(
            "steering to target at offset ({:.1}, {:.1}): pan {:+.2} tilt {:+.2}",
            offset.0, offset.1, pan, tilt
        );
        self.cursor.nudge(pan, tilt);
        self.controller
            .move_axes(&[(Axis::Pan, pan), (Axis::Tilt, tilt)], Motion::Relative)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_are_tolerated_after_a_sighting() {
        let mut state = AcquisitionState {
            is_tracking: true,
            misses: 5,
            target_seen: true,
        };
        assert!(state.observe(false, 8));
        assert_eq!(state.misses, 6);

        state.misses = 9;
        assert!(!state.observe(false, 8));
        assert!(!state.target_seen);
        assert_eq!(state.misses, 0);
    }

    #[test]
    fn nothing_seen_exits_immediately() {
        let mut state = AcquisitionState::default();
        assert!(!state.observe(false, 8));
    }

    #[test]
    fn sighting_resets_misses() {
        let mut state = AcquisitionState::default();
        assert!(state.observe(true, 8));
        assert!(state.observe(false, 8));
        assert!(state.observe(false, 8));
        assert_eq!(state.misses, 2);
        assert!(state.observe(true, 8));
        assert_eq!(state.misses, 0);

        let hits = (0..=9).take_while(|_| state.observe(false, 8)).count();
        assert_eq!(hits, 9);
    }

    #[test]
    fn selects_candidate_nearest_center() {
        let frame = FrameGeometry::default();
        assert_eq!(select_target(&[], &frame), None);

        let far = Region::new(0.0, 0.0, 20.0, 20.0);
        let near = Region::new(150.0, 110.0, 20.0, 20.0);
        assert_eq!(select_target(&[far], &frame), Some(far));
        assert_eq!(select_target(&[far, near], &frame), Some(near));

        let left = Region::new(100.0, 110.0, 20.0, 20.0);
        let right = Region::new(200.0, 110.0, 20.0, 20.0);
        assert_eq!(select_target(&[left, right], &frame), Some(left));
        assert_eq!(select_target(&[right, left], &frame), Some(right));
    }
}
