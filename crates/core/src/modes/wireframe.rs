use std::f32::consts::PI;

use crate::{
    graph::ConnectionGraph,
    landmarks::{LandmarkSet, Pixel},
    render::Canvas,
};

use super::{DrawStrategy, FrameParams, ModeId};

type Triangle = [usize; 3];

/// Forehead, eyes, nose bridge, cheeks, mouth and jaw.
const FACE_TRIANGLES: [Triangle; 12] = [
    [10, 109, 338],
    [109, 105, 10],
    [338, 334, 10],
    [33, 133, 159],
    [362, 263, 386],
    [133, 1, 362],
    [1, 61, 291],
    [234, 33, 61],
    [454, 263, 291],
    [61, 14, 291],
    [234, 61, 152],
    [454, 291, 152],
];

/// Palm fan plus two triangles along each finger.
const HAND_TRIANGLES: [Triangle; 14] = [
    [0, 1, 5],
    [0, 5, 9],
    [0, 9, 13],
    [0, 13, 17],
    [1, 2, 3],
    [2, 3, 4],
    [5, 6, 7],
    [6, 7, 8],
    [9, 10, 11],
    [10, 11, 12],
    [13, 14, 15],
    [14, 15, 16],
    [17, 18, 19],
    [18, 19, 20],
];

const FACE_ANCHORS: [usize; 9] = [1, 10, 152, 33, 263, 61, 291, 234, 454];
const HAND_ANCHORS: [usize; 6] = [0, 4, 8, 12, 16, 20];

/// Fixed triangles over face and hand regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireframeTriangle;

impl WireframeTriangle {
    fn draw_triangles(
        params: &FrameParams,
        canvas: &mut dyn Canvas,
        set: &LandmarkSet,
        triangles: &[Triangle],
    ) {
        for &[a, b, c] in triangles {
            for edge in [(a, b), (b, c), (c, a)] {
                params.edge(canvas, set, edge);
            }
            params.dots_at(canvas, set, &[a, b, c]);
        }
    }
}

impl DrawStrategy for WireframeTriangle {
    fn id(&self) -> ModeId {
        ModeId::WireframeTriangle
    }

    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        _graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    ) {
        Self::draw_triangles(params, canvas, face, &FACE_TRIANGLES);
        for hand in params.visible_hands(hands) {
            Self::draw_triangles(params, canvas, hand, &HAND_TRIANGLES);
        }
    }
}

/// Regular hexagons centered on anchor landmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireframeHexagon;

impl WireframeHexagon {
    fn draw_hexagons(
        params: &FrameParams,
        canvas: &mut dyn Canvas,
        set: &LandmarkSet,
        anchors: &[usize],
    ) {
        for landmark in anchors.iter().filter_map(|&index| set.get(index)) {
            let center = landmark.to_pixel(params.width, params.height);
            let vertices = hexagon_vertices(center, params.hexagon_radius);
            for i in 0..vertices.len() {
                let next = vertices[(i + 1) % vertices.len()];
                canvas.line(vertices[i], next, params.line_color, params.line_thickness);
            }
            canvas.circle(center, params.dot_size, params.dot_color);
        }
    }
}

impl DrawStrategy for WireframeHexagon {
    fn id(&self) -> ModeId {
        ModeId::WireframeHexagon
    }

    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        _graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    ) {
        Self::draw_hexagons(params, canvas, face, &FACE_ANCHORS);
        for hand in params.visible_hands(hands) {
            Self::draw_hexagons(params, canvas, hand, &HAND_ANCHORS);
        }
    }
}

/// Six points at 60 degree steps starting on the positive x axis.
pub fn hexagon_vertices(center: Pixel, radius: u32) -> [Pixel; 6] {
    let radius = radius as f32;
    std::array::from_fn(|k| {
        let angle = k as f32 * PI / 3.0;
        Pixel::new(
            center.x + (radius * angle.cos()).round() as i32,
            center.y + (radius * angle.sin()).round() as i32,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        modes::test_support::{face, hand},
        render::RecordingCanvas,
        Configuration,
    };

    #[test]
    fn hexagon_vertices_are_equidistant() {
        let vertices = hexagon_vertices(Pixel::new(100, 100), 20);
        assert_eq!(vertices[0], Pixel::new(120, 100));
        assert_eq!(vertices[3], Pixel::new(80, 100));
        for vertex in vertices {
            let dx = (vertex.x - 100) as f32;
            let dy = (vertex.y - 100) as f32;
            assert!(((dx * dx + dy * dy).sqrt() - 20.0).abs() < 1.0);
        }
    }

    #[test]
    fn hexagons_for_face_and_hand_anchors() {
        let params = FrameParams::from_config(&Configuration::default(), 640, 480);
        let mut canvas = RecordingCanvas::default();

        WireframeHexagon.draw(&face(), &[hand()], &ConnectionGraph::default(), &params, &mut canvas);

        let anchors = FACE_ANCHORS.len() + HAND_ANCHORS.len();
        assert_eq!(canvas.circles().count(), anchors);
        assert_eq!(canvas.lines().count(), anchors * 6);
    }

    #[test]
    fn triangles_draw_three_edges_and_three_vertices() {
        let config = Configuration {
            show_hands: false,
            ..Configuration::default()
        };
        let params = FrameParams::from_config(&config, 640, 480);
        let mut canvas = RecordingCanvas::default();

        WireframeTriangle.draw(&face(), &[hand()], &ConnectionGraph::default(), &params, &mut canvas);

        assert_eq!(canvas.lines().count(), FACE_TRIANGLES.len() * 3);
        assert_eq!(canvas.circles().count(), FACE_TRIANGLES.len() * 3);
    }
}
