//! Source of target detections, one call per camera frame.

use crate::types::Region;
use log::{debug, warn};
use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[allow(async_fn_in_trait)]
pub trait Detector {
    /// Candidate regions found in the next frame, possibly none.
    async fn detect(&mut self) -> Vec<Region>;
}

/// Parses one frame's worth of detections: `x,y,w,h` regions separated by
/// `;`. A blank line is a frame with no detections.
pub fn parse_frame(line: &str) -> Result<Vec<Region>, crate::types::ParseRegionError> {
    line.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Reads detections line by line from an external vision process.
pub struct LineDetector<R> {
    lines: Lines<R>,
    exhausted: bool,
}

impl<R: AsyncBufRead + Unpin> LineDetector<R> {
    pub fn new(reader: R) -> Self {
        LineDetector {
            lines: reader.lines(),
            exhausted: false,
        }
    }
}

impl<R: AsyncBufRead + Unpin> Detector for LineDetector<R> {
    async fn detect(&mut self) -> Vec<Region> {
        if self.exhausted {
            return Vec::new();
        }

        match self.lines.next_line().await {
            Ok(Some(line)) => match parse_frame(&line) {
                Ok(regions) => {
                    debug!("detected {} region(s)", regions.len());
                    regions
                }
                Err(e) => {
                    warn!("ignoring detector frame: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                warn!("detector input closed, no further detections");
                self.exhausted = true;
                Vec::new()
            }
            Err(e) => {
                warn!("detector input failed: {}", e);
                self.exhausted = true;
                Vec::new()
            }
        }
    }
}

/// Replays prepared frames, then reports nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    frames: VecDeque<Vec<Region>>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = Vec<Region>>) -> Self {
        ScriptedDetector {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ScriptedDetector {
    async fn detect(&mut self) -> Vec<Region> {
        self.frames.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn parses_frames() {
        assert_eq!(parse_frame(""), Ok(vec![]));
        assert_eq!(parse_frame("  "), Ok(vec![]));
        assert_eq!(
            parse_frame("1,2,3,4; 5,6,7,8"),
            Ok(vec![Region::new(1.0, 2.0, 3.0, 4.0), Region::new(5.0, 6.0, 7.0, 8.0)])
        );
        assert!(parse_frame("1,2,3,4;oops").is_err());
    }

    #[tokio::test]
    async fn line_detector_reads_frames_until_end_of_input() {
        let input: &[u8] = b"10,10,20,20\n\nbad\n0,0,4,4;8,8,4,4\n";
        let mut detector = LineDetector::new(BufReader::new(input));

        assert_eq!(detector.detect().await, vec![Region::new(10.0, 10.0, 20.0, 20.0)]);
        assert!(detector.detect().await.is_empty());
        assert!(detector.detect().await.is_empty());
        assert_eq!(detector.detect().await.len(), 2);
        assert!(detector.detect().await.is_empty());
        assert!(detector.detect().await.is_empty());
    }

    #[tokio::test]
    async fn scripted_detector_runs_dry() {
        let mut detector = ScriptedDetector::new([vec![Region::new(0.0, 0.0, 1.0, 1.0)]]);
        assert_eq!(detector.remaining(), 1);
        assert_eq!(detector.detect().await.len(), 1);
        assert!(detector.detect().await.is_empty());
    }
}
