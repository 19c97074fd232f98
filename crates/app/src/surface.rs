//! Windowless video surface: produces blank frames and records the overlay
//! instead of displaying it.

use std::{collections::VecDeque, time::Duration};

use crossbeam::channel::Receiver;
use landmark_overlay_core::{
    render::{Canvas, DrawCall, KeyCommand, RecordingCanvas},
    OverlayError, Result, VideoFrame, VideoSurface,
};

pub struct HeadlessSurface {
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    acquired: u64,
    script: VecDeque<Option<KeyCommand>>,
    injected: Receiver<KeyCommand>,
    canvas: RecordingCanvas,
    last_frame: Vec<DrawCall>,
    released: bool,
}

impl HeadlessSurface {
    pub fn new(
        width: u32,
        height: u32,
        frame_limit: Option<u64>,
        script: Vec<Option<KeyCommand>>,
        injected: Receiver<KeyCommand>,
    ) -> Self {
        Self {
            width,
            height,
            frame_limit,
            acquired: 0,
            script: script.into(),
            injected,
            canvas: RecordingCanvas::default(),
            last_frame: Vec::new(),
            released: false,
        }
    }

    /// Primitives recorded for the most recently presented frame.
    pub fn last_frame(&self) -> &[DrawCall] {
        &self.last_frame
    }
}

impl VideoSurface for HeadlessSurface {
    fn acquire(&mut self) -> Option<VideoFrame> {
        if self.released || self.frame_limit.is_some_and(|limit| self.acquired >= limit) {
            return None;
        }
        self.acquired += 1;
        self.canvas.clear();
        Some(VideoFrame::blank(self.width, self.height))
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn present(&mut self) -> Result<()> {
        if self.released {
            return Err(OverlayError::msg("surface already released"));
        }
        self.last_frame = self.canvas.calls().to_vec();
        tracing::trace!(
            frame = self.acquired,
            primitives = self.last_frame.len(),
            "presented frame"
        );
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Option<KeyCommand> {
        if let Some(Some(key)) = self.script.pop_front() {
            return Some(key);
        }
        self.injected.recv_timeout(wait).ok()
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            tracing::info!(frames = self.acquired, "video surface released");
        }
        Ok(())
    }
}

/// Parses a per-frame key script: `.` for no key, `m` to cycle the mode and
/// `q` to quit.
pub fn parse_keys(script: &str) -> Result<Vec<Option<KeyCommand>>> {
    script
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '.' => Ok(None),
            'm' | 'M' => Ok(Some(KeyCommand::CycleMode)),
            'q' | 'Q' => Ok(Some(KeyCommand::Quit)),
            other => Err(OverlayError::msg(format!("unknown key '{other}' in key script"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crossbeam::channel;

    use super::*;

    #[test]
    fn parses_key_script() {
        let keys = parse_keys(".m .q").unwrap();
        assert_eq!(
            keys,
            vec![None, Some(KeyCommand::CycleMode), None, Some(KeyCommand::Quit)]
        );
        assert!(parse_keys("x").is_err());
    }

    #[test]
    fn stops_at_frame_limit() {
        let (_tx, rx) = channel::unbounded();
        let mut surface = HeadlessSurface::new(64, 48, Some(2), Vec::new(), rx);
        assert!(surface.acquire().is_some());
        assert!(surface.acquire().is_some());
        assert!(surface.acquire().is_none());
    }

    #[test]
    fn injected_keys_follow_script() {
        let (tx, rx) = channel::unbounded();
        let mut surface =
            HeadlessSurface::new(64, 48, None, vec![Some(KeyCommand::CycleMode)], rx);
        tx.send(KeyCommand::Quit).unwrap();

        assert_eq!(surface.poll_key(Duration::ZERO), Some(KeyCommand::CycleMode));
        assert_eq!(surface.poll_key(Duration::ZERO), Some(KeyCommand::Quit));
        assert_eq!(surface.poll_key(Duration::ZERO), None);
    }

    #[test]
    fn release_is_idempotent_and_ends_stream() {
        let (_tx, rx) = channel::unbounded();
        let mut surface = HeadlessSurface::new(64, 48, None, Vec::new(), rx);
        surface.release().unwrap();
        surface.release().unwrap();
        assert!(surface.acquire().is_none());
    }
}
