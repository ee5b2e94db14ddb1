//! Boustrophedon raster over the pan/tilt grid. Tilt is the outer axis,
//! pan the inner one; every completed row flips the pan direction and
//! every completed sweep flips the tilt direction.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        AxisRange { min, max, step }
    }

    /// Clamps into the range and rounds to the nearest grid line.
    pub fn snap(&self, value: f64) -> f64 {
        if value <= self.min {
            self.min
        } else if value >= self.max {
            self.max
        } else {
            (self.min + ((value - self.min) / self.step).round() * self.step).min(self.max)
        }
    }

    pub fn midpoint(&self) -> f64 {
        self.snap((self.min + self.max) / 2.0)
    }

    fn reached_end(&self, value: f64, sweep: u64) -> bool {
        if sweep % 2 == 0 {
            value >= self.max
        } else {
            value <= self.min
        }
    }

    fn step_from(&self, value: f64, sweep: u64) -> f64 {
        let step = if sweep % 2 == 0 { self.step } else { -self.step };
        self.snap(value + step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanGrid {
    pub pan: AxisRange,
    pub tilt: AxisRange,
}

impl ScanGrid {
    pub fn center(&self) -> ScanCursor {
        ScanCursor::new(self.pan.midpoint(), self.tilt.midpoint())
    }
}

/// What [`ScanCursor::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next pan position in the current row.
    Pan,
    /// Finished a row and moved to the next tilt row.
    Row,
    /// Finished the whole grid; both directions reversed in place.
    Sweep,
}

/// Current raster position. Even sweep counters run low to high, odd ones
/// high to low. Counters only ever grow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanCursor {
    pub pan: f64,
    pub tilt: f64,
    pub pan_sweep: u64,
    pub tilt_sweep: u64,
}

impl ScanCursor {
    pub fn new(pan: f64, tilt: f64) -> Self {
        ScanCursor {
            pan,
            tilt,
            pan_sweep: 0,
            tilt_sweep: 0,
        }
    }

    pub fn waypoint(&self) -> (f64, f64) {
        (self.pan, self.tilt)
    }

    /// Shifts the running estimate by a tracking correction.
    pub fn nudge(&mut self, pan: f64, tilt: f64) {
        self.pan += pan;
        self.tilt += tilt;
    }

    pub fn advance(&mut self, grid: &ScanGrid) -> Advance {
        if !grid.pan.reached_end(self.pan, self.pan_sweep) {
            self.pan = grid.pan.step_from(self.pan, self.pan_sweep);
            return Advance::Pan;
        }

        self.pan = grid.pan.snap(self.pan);
        self.pan_sweep += 1;
        if !grid.tilt.reached_end(self.tilt, self.tilt_sweep) {
            self.tilt = grid.tilt.step_from(self.tilt, self.tilt_sweep);
            return Advance::Row;
        }

        self.tilt = grid.tilt.snap(self.tilt);
        self.tilt_sweep += 1;
        Advance::Sweep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(pan_max: f64, tilt_max: f64) -> ScanGrid {
        ScanGrid {
            pan: AxisRange::new(0.0, pan_max, 10.0),
            tilt: AxisRange::new(0.0, tilt_max, 10.0),
        }
    }

    fn walk(cursor: &mut ScanCursor, grid: &ScanGrid, n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|_| {
                let point = cursor.waypoint();
                cursor.advance(grid);
                point
            })
            .collect()
    }

    #[test]
    fn snaps_to_grid_and_clamps() {
        let range = AxisRange::new(70.0, 110.0, 10.0);
        assert_eq!(range.snap(50.0), 70.0);
        assert_eq!(range.snap(84.9), 80.0);
        assert_eq!(range.snap(85.1), 90.0);
        assert_eq!(range.snap(111.6), 110.0);
        assert_eq!(range.midpoint(), 90.0);

        let uneven = AxisRange::new(0.0, 25.0, 10.0);
        assert_eq!(uneven.snap(24.0), 20.0);
        assert_eq!(uneven.snap(25.0), 25.0);
    }

    #[test]
    fn rows_alternate_direction() {
        let grid = grid(10.0, 10.0);
        let mut cursor = ScanCursor::new(0.0, 0.0);
        assert_eq!(walk(&mut cursor, &grid, 2), vec![(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(walk(&mut cursor, &grid, 2), vec![(10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(cursor.pan_sweep, 2);
        assert_eq!(cursor.tilt_sweep, 1);
    }

    #[test]
    fn sweep_covers_every_point_once_then_reverses() {
        let grid = grid(20.0, 20.0);
        let mut cursor = ScanCursor::new(0.0, 0.0);
        let mut sweep = walk(&mut cursor, &grid, 9);
        assert_eq!(cursor.tilt_sweep, 1);
        assert_eq!(cursor.waypoint(), (20.0, 20.0));

        sweep.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sweep.dedup();
        assert_eq!(sweep.len(), 9);

        let back = walk(&mut cursor, &grid, 9);
        assert_eq!(back[0], (20.0, 20.0));
        assert_eq!(back[2], (0.0, 20.0));
        assert_eq!(back[3], (0.0, 10.0));
        assert_eq!(back[8], (0.0, 0.0));
        assert_eq!(cursor.tilt_sweep, 2);
    }

    #[test]
    fn advance_reports_transitions() {
        let grid = grid(10.0, 10.0);
        let mut cursor = ScanCursor::new(0.0, 0.0);
        assert_eq!(cursor.advance(&grid), Advance::Pan);
        assert_eq!(cursor.advance(&grid), Advance::Row);
        assert_eq!(cursor.advance(&grid), Advance::Pan);
        assert_eq!(cursor.advance(&grid), Advance::Sweep);
    }

    #[test]
    fn corrected_position_resumes_on_grid() {
        let grid = ScanGrid {
            pan: AxisRange::new(0.0, 180.0, 10.0),
            tilt: AxisRange::new(70.0, 110.0, 10.0),
        };
        let mut cursor = grid.center();
        assert_eq!(cursor.waypoint(), (90.0, 90.0));

        cursor.nudge(-3.84, 2.4);
        cursor.advance(&grid);
        assert_eq!(cursor.pan, 100.0);
        assert!((cursor.tilt - 92.4).abs() < 1e-9);

        cursor.nudge(85.0, 0.0);
        assert_eq!(cursor.advance(&grid), Advance::Row);
        assert_eq!(cursor.waypoint(), (180.0, 100.0));
    }
}
