use crate::{graph::ConnectionGraph, landmarks::LandmarkSet, render::Canvas};

use super::{DrawStrategy, FrameParams, ModeId};

/// Every landmark as a dot at twice the configured size, no edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dots;

impl DrawStrategy for Dots {
    fn id(&self) -> ModeId {
        ModeId::Dots
    }

    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        _graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    ) {
        let radius = params.dot_size * 2;
        let sets = std::iter::once(face).chain(params.visible_hands(hands));
        for landmark in sets.flat_map(LandmarkSet::iter) {
            params.dot(canvas, landmark, radius);
        }
    }
}
