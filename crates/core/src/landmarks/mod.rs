use serde::{Deserialize, Serialize};

use crate::{graph::TopologyTables, render::VideoFrame, Result};

/// Number of points in a face landmark set produced by the detector.
pub const FACE_LANDMARK_COUNT: usize = 468;
/// Number of points in a hand landmark set produced by the detector.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Normalized 2D position, both axes in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Converts to pixel coordinates for a frame of the given size, flooring
    /// toward negative infinity.
    pub fn to_pixel(self, width: u32, height: u32) -> Pixel {
        Pixel {
            x: (self.x * width as f32).floor() as i32,
            y: (self.y * height as f32).floor() as i32,
        }
    }

    pub fn distance(self, other: Landmark) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Integer pixel position on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ordered landmark positions for one detected face or hand, indexed by the
/// detector's stable anatomical numbering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + '_ {
        self.points.iter().copied()
    }

    /// Returns both endpoints of an edge when they are in range.
    pub fn edge(&self, (start, end): (usize, usize)) -> Option<(Landmark, Landmark)> {
        Some((self.get(start)?, self.get(end)?))
    }
}

impl From<Vec<(f32, f32)>> for LandmarkSet {
    fn from(value: Vec<(f32, f32)>) -> Self {
        Self::new(value.into_iter().map(|(x, y)| Landmark::new(x, y)).collect())
    }
}

/// Everything the detector found in a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detections {
    pub faces: Vec<LandmarkSet>,
    pub hands: Vec<LandmarkSet>,
}

/// External landmark detector. Opaque to the core; only its output shape and
/// its fixed topology tables are relied upon.
pub trait LandmarkDetector: Send {
    /// Connection tables the detector ships with. Read once at startup.
    fn topology_tables(&self) -> TopologyTables;

    /// Detects zero or more faces. `performance_mode` trades accuracy for
    /// speed.
    fn detect_faces(&mut self, frame: &VideoFrame, performance_mode: bool)
        -> Result<Vec<LandmarkSet>>;

    /// Detects zero or more hands.
    fn detect_hands(&mut self, frame: &VideoFrame, performance_mode: bool)
        -> Result<Vec<LandmarkSet>>;

    /// Releases detector handles. Called once during shutdown.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
