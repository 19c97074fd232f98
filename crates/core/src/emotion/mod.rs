//! Geometric expression heuristics over a single face landmark set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landmarks::{Landmark, LandmarkSet};

const EPSILON: f32 = 1e-6;

// Mouth
const MOUTH_LEFT: usize = 61;
const MOUTH_RIGHT: usize = 291;
const UPPER_LIP: usize = 13;
const LOWER_LIP: usize = 14;
// Eyelids (upper, lower)
const LEFT_EYE: (usize, usize) = (386, 374);
const RIGHT_EYE: (usize, usize) = (159, 145);
// Brows and forehead
const LEFT_BROW: usize = 334;
const RIGHT_BROW: usize = 105;
const FOREHEAD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    #[default]
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 4] = [Emotion::Happy, Emotion::Sad, Emotion::Angry, Emotion::Neutral];

    pub fn name(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Neutral => "neutral",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized measurements the classifier thresholds operate on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFeatures {
    /// Mouth opening height over mouth width.
    pub mouth_ratio: f32,
    /// Mean eyelid gap of both eyes.
    pub eye_height: f32,
    /// Mean brow height below the forehead point.
    pub eyebrow_relative: f32,
    /// Mean corner height relative to the mouth center; negative when the
    /// corners sit above the center.
    pub mouth_curvature: f32,
}

impl FaceFeatures {
    /// Extracts the features, or `None` when the set lacks a required point.
    pub fn extract(face: &LandmarkSet) -> Option<Self> {
        let point = |index: usize| face.get(index);

        let left = point(MOUTH_LEFT)?;
        let right = point(MOUTH_RIGHT)?;
        let upper = point(UPPER_LIP)?;
        let lower = point(LOWER_LIP)?;

        let mouth_width = left.distance(right);
        let mouth_height = upper.distance(lower);
        let mouth_ratio = mouth_height / (mouth_width + EPSILON);

        let eye_gap = |(top, bottom): (usize, usize)| -> Option<f32> {
            Some(point(top)?.distance(point(bottom)?))
        };
        let eye_height = (eye_gap(LEFT_EYE)? + eye_gap(RIGHT_EYE)?) / 2.0;

        let forehead = point(FOREHEAD)?;
        let brow_y = (point(LEFT_BROW)?.y + point(RIGHT_BROW)?.y) / 2.0;
        let eyebrow_relative = brow_y - forehead.y;

        let center_y = midpoint(upper, lower).y;
        let corner_y = (left.y + right.y) / 2.0;
        let mouth_curvature = corner_y - center_y;

        Some(Self {
            mouth_ratio,
            eye_height,
            eyebrow_relative,
            mouth_curvature,
        })
    }

    /// First matching rule wins.
    pub fn classify(&self) -> Emotion {
        if self.mouth_ratio > 0.3 && self.mouth_curvature < -0.01 {
            Emotion::Happy
        } else if self.eye_height < 0.02 && self.eyebrow_relative > 0.08 {
            Emotion::Sad
        } else if self.eyebrow_relative < 0.06 && self.mouth_ratio < 0.2 {
            Emotion::Angry
        } else {
            Emotion::Neutral
        }
    }
}

/// Classifies a face. Returns `Neutral` without computing anything when
/// expression triggers are disabled or the set is incomplete.
pub fn classify(face: &LandmarkSet, enabled: bool) -> Emotion {
    if !enabled {
        return Emotion::Neutral;
    }
    FaceFeatures::extract(face).map_or(Emotion::Neutral, |features| features.classify())
}

fn midpoint(a: Landmark, b: Landmark) -> Landmark {
    Landmark::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
