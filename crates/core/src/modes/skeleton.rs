use crate::{
    graph::{ConnectionGraph, Edge},
    landmarks::LandmarkSet,
    render::Canvas,
};

use super::{DrawStrategy, FrameParams, ModeId};

/// Forehead, brows, eye corners, nose, mouth, cheeks and chin.
const FACE_POINTS: [usize; 15] = [10, 105, 334, 33, 133, 362, 263, 1, 61, 291, 13, 14, 234, 454, 152];

const FACE_EDGES: [Edge; 18] = [
    (10, 105), (10, 334), (105, 33), (334, 263),
    (33, 133), (362, 263), (133, 1), (362, 1),
    (1, 13), (61, 13), (13, 291), (61, 14), (14, 291),
    (14, 152), (234, 61), (454, 291), (234, 33), (454, 263),
];

const WRIST: usize = 0;
const FINGERTIPS: [usize; 5] = [4, 8, 12, 16, 20];

/// Reduced anatomical skeleton of the face and hands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Skeleton;

impl DrawStrategy for Skeleton {
    fn id(&self) -> ModeId {
        ModeId::Skeleton
    }

    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        _graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    ) {
        for &edge in &FACE_EDGES {
            params.edge(canvas, face, edge);
        }
        params.dots_at(canvas, face, &FACE_POINTS);

        for hand in params.visible_hands(hands) {
            for tip in FINGERTIPS {
                params.edge(canvas, hand, (WRIST, tip));
            }
            params.dots_at(canvas, hand, &[WRIST]);
            params.dots_at(canvas, hand, &FINGERTIPS);
        }
    }
}
