use crate::{config::Rgb, landmarks::Pixel};

use super::VideoFrame;

/// Primitive renderer: draws onto the output pixel buffer in pixel
/// coordinates. Implemented by the video surface.
pub trait Canvas {
    /// Fills the whole canvas with a flat color.
    fn fill(&mut self, color: Rgb);

    /// Composes the camera frame over `background` at `opacity`.
    fn blend_frame(&mut self, frame: &VideoFrame, opacity: f32, background: Rgb);

    /// Filled circle.
    fn circle(&mut self, center: Pixel, radius: u32, color: Rgb);

    fn line(&mut self, from: Pixel, to: Pixel, color: Rgb, thickness: u32);

    fn text(&mut self, at: Pixel, text: &str, color: Rgb);
}

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Fill(Rgb),
    BlendFrame { opacity: f32, background: Rgb },
    Circle { center: Pixel, radius: u32, color: Rgb },
    Line { from: Pixel, to: Pixel, color: Rgb, thickness: u32 },
    Text { at: Pixel, text: String, color: Rgb },
}

/// Canvas that records calls instead of rasterizing them. Used by headless
/// surfaces and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn circles(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Circle { .. }))
    }

    pub fn lines(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Line { .. }))
    }
}

impl Canvas for RecordingCanvas {
    fn fill(&mut self, color: Rgb) {
        self.calls.push(DrawCall::Fill(color));
    }

    fn blend_frame(&mut self, _frame: &VideoFrame, opacity: f32, background: Rgb) {
        self.calls.push(DrawCall::BlendFrame {
            opacity,
            background,
        });
    }

    fn circle(&mut self, center: Pixel, radius: u32, color: Rgb) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            color,
        });
    }

    fn line(&mut self, from: Pixel, to: Pixel, color: Rgb, thickness: u32) {
        self.calls.push(DrawCall::Line {
            from,
            to,
            color,
            thickness,
        });
    }

    fn text(&mut self, at: Pixel, text: &str, color: Rgb) {
        self.calls.push(DrawCall::Text {
            at,
            text: text.to_owned(),
            color,
        });
    }
}
