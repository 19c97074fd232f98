//! Per-frame orchestration: detection, derived overrides, strategy dispatch
//! and presentation.

use std::time::{Duration, Instant};

use crate::{
    audio::AudioLevel,
    config::{ColorOverride, Configuration, Rgb, SharedConfig},
    emotion::{self, Emotion},
    graph::ConnectionGraph,
    landmarks::{LandmarkDetector, LandmarkSet, Pixel},
    modes::{FrameParams, ModeRegistry},
    settings::{ModeMailbox, ModeNotice},
    timeline::FpsCounter,
    Result,
};

mod canvas;

pub use canvas::{Canvas, DrawCall, RecordingCanvas};

const OVERLAY_COLOR: Rgb = Rgb::WHITE;
const FPS_POSITION: Pixel = Pixel::new(10, 30);
const EMOTION_POSITION: Pixel = Pixel::new(10, 60);

/// One captured camera frame, RGB8 row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }
}

/// Keyboard commands polled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    CycleMode,
}

/// Frame acquisition, display and keyboard polling.
pub trait VideoSurface: Send {
    /// Next camera frame, or `None` when the source is exhausted. Also
    /// prepares the canvas for the new frame.
    fn acquire(&mut self) -> Option<VideoFrame>;

    /// Output canvas for the frame being composed.
    fn canvas(&mut self) -> &mut dyn Canvas;

    fn present(&mut self) -> Result<()>;

    /// Polls for a key press, waiting at most `wait`.
    fn poll_key(&mut self, wait: Duration) -> Option<KeyCommand>;

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Quit,
    EndOfStream,
    DetectorFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub fps: f32,
    pub reason: StopReason,
}

/// Size override used by the audio visualizer, in `[1, 10]`.
pub fn audio_size(scaled_level: f32) -> u32 {
    1 + (scaled_level.clamp(0.0, 1.0) * 9.0).round() as u32
}

/// Owns the render loop's collaborators and runs one frame per `tick`.
pub struct RenderCycle<D, S> {
    detector: D,
    surface: S,
    config: SharedConfig,
    registry: ModeRegistry,
    graph: ConnectionGraph,
    audio: AudioLevel,
    mailbox: ModeMailbox,
    fps: FpsCounter,
    refresh_wait: Duration,
    frames: u64,
}

impl<D: LandmarkDetector, S: VideoSurface> RenderCycle<D, S> {
    pub fn new(
        detector: D,
        surface: S,
        config: SharedConfig,
        audio: AudioLevel,
        mailbox: ModeMailbox,
    ) -> Self {
        let graph = ConnectionGraph::new(detector.topology_tables());
        Self {
            detector,
            surface,
            config,
            registry: ModeRegistry::new(),
            graph,
            audio,
            mailbox,
            fps: FpsCounter::new(Instant::now()),
            refresh_wait: Duration::from_millis(1),
            frames: 0,
        }
    }

    /// Caps how long each frame waits for keyboard input.
    pub fn with_refresh_wait(mut self, wait: Duration) -> Self {
        self.refresh_wait = wait;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs frames until a quit key, the end of the video stream or a
    /// detector failure.
    pub fn run(&mut self) -> RunSummary {
        tracing::info!("render loop started");
        let reason = loop {
            if let TickOutcome::Stop(reason) = self.tick() {
                break reason;
            }
        };
        tracing::info!(frames = self.frames, ?reason, "render loop stopped");
        RunSummary {
            frames: self.frames,
            fps: self.fps.fps(),
            reason,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        let Some(frame) = self.surface.acquire() else {
            return TickOutcome::Stop(StopReason::EndOfStream);
        };

        let mut config = self.config.snapshot();
        let (faces, hands) = match self.detect(&frame, &config) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%err, "landmark detection failed, stopping");
                return TickOutcome::Stop(StopReason::DetectorFailed(err.to_string()));
            }
        };

        if let Some(updated) = self.apply_emotion(&config, faces.first()) {
            config = updated;
        }

        let mut params = FrameParams::from_config(&config, frame.width, frame.height);
        if config.experiments.audio_visualizer {
            let size = audio_size(self.audio.scaled(config.audio_sensitivity));
            params.dot_size = size;
            params.line_thickness = size;
        }

        let canvas = self.surface.canvas();
        if config.show_camera {
            canvas.blend_frame(&frame, config.camera_opacity, config.bg_color);
        } else {
            canvas.fill(config.bg_color);
        }

        let strategy = self.registry.resolve(&config);
        for face in &faces {
            strategy.draw(face, &hands, &self.graph, &params, canvas);
        }

        let fps = self.fps.tick(Instant::now());
        if config.show_fps {
            canvas.text(FPS_POSITION, &format!("FPS: {fps:.0}"), OVERLAY_COLOR);
        }
        if config.experiments.expression_triggers {
            canvas.text(
                EMOTION_POSITION,
                &format!("Emotion: {}", config.current_emotion),
                OVERLAY_COLOR,
            );
        }

        if let Err(err) = self.surface.present() {
            tracing::warn!(%err, "failed to present frame");
        }
        self.frames += 1;

        match self.surface.poll_key(self.refresh_wait) {
            Some(KeyCommand::Quit) => TickOutcome::Stop(StopReason::Quit),
            Some(KeyCommand::CycleMode) => {
                let updated = self.config.update(|config| {
                    config.cycle_mode();
                });
                tracing::debug!(mode = updated.mode, "mode cycled");
                self.mailbox.post(ModeNotice::from_config(&updated));
                TickOutcome::Continue
            }
            None => TickOutcome::Continue,
        }
    }

    pub fn release_surface(&mut self) -> Result<()> {
        self.surface.release()
    }

    /// Closes the detector. Independent of the surface, so it is safe to
    /// call after a failed [`release_surface`](Self::release_surface).
    pub fn close_detector(&mut self) -> Result<()> {
        self.detector.close()
    }

    fn detect(
        &mut self,
        frame: &VideoFrame,
        config: &Configuration,
    ) -> Result<(Vec<LandmarkSet>, Vec<LandmarkSet>)> {
        let faces = self.detector.detect_faces(frame, config.performance_mode)?;
        let hands = if config.show_hands {
            self.detector.detect_hands(frame, config.performance_mode)?
        } else {
            Vec::new()
        };
        Ok((faces, hands))
    }

    /// Classifies the first face and publishes the emotion and its color as
    /// transient state. The color override stays in place until the next
    /// classification or an explicit user color change.
    fn apply_emotion(
        &self,
        config: &Configuration,
        face: Option<&LandmarkSet>,
    ) -> Option<std::sync::Arc<Configuration>> {
        if !config.experiments.expression_triggers {
            if config.current_emotion == Emotion::Neutral {
                return None;
            }
            return Some(
                self.config
                    .update_transient(|config| config.current_emotion = Emotion::Neutral),
            );
        }

        let emotion = emotion::classify(face?, true);
        let color = config.emotion_colors.get(emotion);
        Some(self.config.update_transient(|config| {
            config.current_emotion = emotion;
            config.color_override = Some(ColorOverride {
                dot: color,
                line: color,
            });
        }))
    }
}

impl<D, S> std::fmt::Debug for RenderCycle<D, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCycle")
            .field("frames", &self.frames)
            .field("fps", &self.fps.fps())
            .field("registry", &self.registry)
            .finish()
    }
}
