//! Landmark detector that plays back recorded detections.
//!
//! A recording is a JSON-lines file; each line holds one frame as
//! `{"faces": [[{"x":..,"y":..}, ...]], "hands": [...]}`. Playback loops.

use std::{f32::consts::PI, fs, path::Path};

use landmark_overlay_core::{
    landmarks::{Detections, FACE_LANDMARK_COUNT, HAND_LANDMARK_COUNT},
    Landmark, LandmarkDetector, LandmarkSet, OverlayError, Result, TopologyTables, VideoFrame,
};

const SYNTHETIC_FRAMES: usize = 120;
const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug)]
pub struct ReplayDetector {
    frames: Vec<Detections>,
    cursor: usize,
    current: usize,
}

impl ReplayDetector {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut frames = Vec::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let frame: Detections = serde_json::from_str(line).map_err(|err| {
                OverlayError::Detector(format!(
                    "{}:{}: malformed frame: {err}",
                    path.display(),
                    number + 1
                ))
            })?;
            frames.push(frame);
        }
        tracing::info!(path = %path.display(), frames = frames.len(), "loaded landmark recording");
        Ok(Self::from_frames(frames))
    }

    pub fn from_frames(frames: Vec<Detections>) -> Self {
        Self {
            frames,
            cursor: 0,
            current: 0,
        }
    }

    /// A swaying face and one open hand, for running without a recording.
    pub fn synthetic() -> Self {
        let frames = (0..SYNTHETIC_FRAMES)
            .map(|index| {
                let sway = 0.05 * (2.0 * PI * index as f32 / SYNTHETIC_FRAMES as f32).sin();
                Detections {
                    faces: vec![synthetic_face(sway)],
                    hands: vec![synthetic_hand(sway)],
                }
            })
            .collect();
        Self::from_frames(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkDetector for ReplayDetector {
    fn topology_tables(&self) -> TopologyTables {
        TopologyTables::reference()
    }

    fn detect_faces(
        &mut self,
        _frame: &VideoFrame,
        _performance_mode: bool,
    ) -> Result<Vec<LandmarkSet>> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        self.current = self.cursor;
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(self.frames[self.current].faces.clone())
    }

    fn detect_hands(
        &mut self,
        _frame: &VideoFrame,
        _performance_mode: bool,
    ) -> Result<Vec<LandmarkSet>> {
        Ok(self
            .frames
            .get(self.current)
            .map(|frame| frame.hands.clone())
            .unwrap_or_default())
    }

    fn close(&mut self) -> Result<()> {
        tracing::debug!("landmark replay closed");
        Ok(())
    }
}

fn synthetic_face(sway: f32) -> LandmarkSet {
    let count = FACE_LANDMARK_COUNT as f32;
    LandmarkSet::new(
        (0..FACE_LANDMARK_COUNT)
            .map(|i| {
                let radius = (i as f32 / count).sqrt() * 0.25;
                let angle = i as f32 * GOLDEN_ANGLE;
                Landmark::new(
                    0.45 + sway + radius * 0.8 * angle.cos(),
                    0.5 + radius * angle.sin(),
                )
            })
            .collect(),
    )
}

fn synthetic_hand(sway: f32) -> LandmarkSet {
    let wrist = Landmark::new(0.8 - sway, 0.85);
    let mut points = vec![wrist];
    for finger in 0..5 {
        let angle = -PI / 2.0 + (finger as f32 - 2.0) * 0.3;
        for joint in 1..=4 {
            let reach = 0.04 * joint as f32;
            points.push(Landmark::new(
                wrist.x + reach * angle.cos(),
                wrist.y + reach * angle.sin(),
            ));
        }
    }
    debug_assert_eq!(points.len(), HAND_LANDMARK_COUNT);
    LandmarkSet::new(points)
}
