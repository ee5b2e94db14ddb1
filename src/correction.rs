//! Converts a target's offset from the frame center into a relative
//! pan/tilt move using a banded gain table.

use crate::constants::{ADJUST_EXT_PAN, ADJUST_EXT_TILT, EXT_RATES};
use crate::types::FrameGeometry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionPolicy {
    pub base_pan: f64,
    pub base_tilt: f64,
    /// Upper bounds of the bands; the first one is also the dead zone.
    pub bands: [f64; 6],
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        CorrectionPolicy {
            base_pan: ADJUST_EXT_PAN,
            base_tilt: ADJUST_EXT_TILT,
            bands: EXT_RATES,
        }
    }
}

impl CorrectionPolicy {
    /// Gain for a normalized offset magnitude.
    ///
    /// Magnitudes in `(bands[2], bands[3]]`, inside the dead zone, or past
    /// the last band fall through to the unscaled base.
    pub fn scale(&self, magnitude: f64) -> f64 {
        let b = &self.bands;
        let within = |lo: f64, hi: f64| lo < magnitude && magnitude <= hi;
        if within(b[0], b[1]) {
            0.60
        } else if within(b[1], b[2]) {
            0.80
        } else if within(b[3], b[4]) {
            1.60
        } else if within(b[4], b[5]) {
            2.40
        } else {
            1.00
        }
    }

    /// Signed `(pan, tilt)` deltas in degrees, or `None` when the target is
    /// inside the dead zone on both axes.
    pub fn correction(&self, (ox, oy): (f64, f64), frame: &FrameGeometry) -> Option<(f64, f64)> {
        let dx = (ox / frame.half_width()).abs();
        let dy = (oy / frame.half_height()).abs();
        if dx <= self.bands[0] && dy <= self.bands[0] {
            return None;
        }

        let pan = self.base_pan * self.scale(dx);
        let tilt = self.base_tilt * self.scale(dy);
        Some((
            if ox > 0.0 { -pan } else { pan },
            if oy < 0.0 { -tilt } else { tilt },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn dead_zone_yields_no_move() {
        let policy = CorrectionPolicy::default();
        let frame = FrameGeometry::default();
        assert_eq!(policy.correction((0.0, 0.0), &frame), None);
        assert_eq!(policy.correction((23.9, -17.9), &frame), None);
        assert_eq!(policy.correction((-24.0, 18.0), &frame), None);
        assert!(policy.correction((24.5, 0.0), &frame).is_some());
    }

    #[test]
    fn band_table() {
        let policy = CorrectionPolicy::default();
        assert_eq!(policy.scale(0.10), 1.00);
        assert_eq!(policy.scale(0.20), 0.60);
        assert_eq!(policy.scale(0.32), 0.60);
        assert_eq!(policy.scale(0.40), 0.80);
        assert_eq!(policy.scale(0.50), 1.00);
        assert_eq!(policy.scale(0.66), 1.00);
        assert_eq!(policy.scale(0.70), 1.60);
        assert_eq!(policy.scale(0.90), 2.40);
        assert_eq!(policy.scale(1.00), 2.40);
        assert_eq!(policy.scale(1.20), 1.00);
    }

    #[test]
    fn left_of_center_pans_positive() {
        let policy = CorrectionPolicy::default();
        let frame = FrameGeometry::default();
        // dx = 60 / 160 = 0.375
        let (pan, tilt) = policy.correction((-60.0, 0.0), &frame).unwrap();
        assert!(close(pan, 1.28));
        // the other axis is below the dead zone, so it gets the unscaled base
        assert!(close(tilt, 1.20));
    }

    #[test]
    fn gap_band_uses_unscaled_base() {
        let policy = CorrectionPolicy::default();
        let frame = FrameGeometry::default();
        // dx = 80 / 160 = 0.5 sits between bands[2] and bands[3]
        let (pan, _) = policy.correction((-80.0, 0.0), &frame).unwrap();
        assert!(close(pan, 1.60));
    }

    #[test]
    fn signs_follow_offset() {
        let policy = CorrectionPolicy::default();
        let frame = FrameGeometry::default();
        let (pan, tilt) = policy.correction((150.0, -110.0), &frame).unwrap();
        assert!(close(pan, -1.60 * 2.40));
        assert!(close(tilt, -1.20 * 2.40));

        let (pan, tilt) = policy.correction((-110.0, 110.0), &frame).unwrap();
        assert!(close(pan, 1.60 * 1.60));
        assert!(close(tilt, 1.20 * 2.40));
    }
}
