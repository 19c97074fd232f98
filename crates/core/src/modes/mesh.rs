use crate::{
    graph::{ConnectionGraph, HandTopology},
    landmarks::LandmarkSet,
    render::Canvas,
};

use super::{DrawStrategy, FrameParams, ModeId};

/// Every landmark as a dot, then every edge of the selected topology.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mesh;

impl DrawStrategy for Mesh {
    fn id(&self) -> ModeId {
        ModeId::Mesh
    }

    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    ) {
        for landmark in face.iter() {
            params.dot(canvas, landmark, params.dot_size);
        }
        for &edge in graph.face(params.topology) {
            params.edge(canvas, face, edge);
        }

        let hand_edges = graph.hand(HandTopology::for_face(params.topology));
        for hand in params.visible_hands(hands) {
            for landmark in hand.iter() {
                params.dot(canvas, landmark, params.dot_size);
            }
            for &edge in hand_edges {
                params.edge(canvas, hand, edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{ConnectionTopology, HAND_CONNECTIONS},
        modes::test_support::{face, hand},
        render::{DrawCall, RecordingCanvas},
        Configuration,
    };

    fn params(show_hands: bool, topology: ConnectionTopology) -> FrameParams {
        let config = Configuration {
            show_hands,
            connection_topology: topology,
            ..Configuration::default()
        };
        FrameParams::from_config(&config, 640, 480)
    }

    #[test]
    fn draws_face_dots_and_topology_edges() {
        let graph = ConnectionGraph::default();
        let mut canvas = RecordingCanvas::default();
        let params = params(false, ConnectionTopology::Lips);

        Mesh.draw(&face(), &[hand()], &graph, &params, &mut canvas);

        assert_eq!(canvas.circles().count(), 468);
        assert_eq!(canvas.lines().count(), graph.face(ConnectionTopology::Lips).len());
    }

    #[test]
    fn hands_use_builtin_table_outside_tessellation() {
        let graph = ConnectionGraph::default();
        let mut canvas = RecordingCanvas::default();
        let params = params(true, ConnectionTopology::Lips);

        Mesh.draw(&face(), &[hand(), hand()], &graph, &params, &mut canvas);

        assert_eq!(canvas.circles().count(), 468 + 2 * 21);
        assert_eq!(
            canvas.lines().count(),
            graph.face(ConnectionTopology::Lips).len() + 2 * HAND_CONNECTIONS.len()
        );
    }

    #[test]
    fn uses_configured_style() {
        let graph = ConnectionGraph::default();
        let mut canvas = RecordingCanvas::default();
        let mut params = params(false, ConnectionTopology::FaceOval);
        params.dot_size = 4;
        params.line_thickness = 3;

        Mesh.draw(&face(), &[], &graph, &params, &mut canvas);

        assert!(canvas.calls().iter().all(|call| match call {
            DrawCall::Circle { radius, color, .. } => *radius == 4 && *color == params.dot_color,
            DrawCall::Line { thickness, color, .. } =>
                *thickness == 3 && *color == params.line_color,
            _ => false,
        }));
    }
}
