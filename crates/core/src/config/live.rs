use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    emotion::Emotion,
    graph::ConnectionTopology,
    modes::{clamp_index, resolve_catalog, ModeId},
};

pub const DOT_SIZE_RANGE: (u32, u32) = (1, 10);
pub const LINE_THICKNESS_RANGE: (u32, u32) = (1, 5);
pub const HEXAGON_RADIUS_RANGE: (u32, u32) = (3, 60);
pub const CAMERA_OPACITY_RANGE: (f32, f32) = (0.1, 1.0);
pub const AUDIO_SENSITIVITY_RANGE: (f32, f32) = (0.0, 10.0);

/// Three-channel 8-bit color, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Returns a copy with one channel replaced.
    pub fn with_channel(mut self, channel: Channel, value: u8) -> Self {
        match channel {
            Channel::Red => self.0 = value,
            Channel::Green => self.1 = value,
            Channel::Blue => self.2 = value,
        }
        self
    }
}

/// One channel of an [`Rgb`] color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Accepts `r`, `g`, `b` or the full channel name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "r" | "red" => Some(Self::Red),
            "g" | "green" => Some(Self::Green),
            "b" | "blue" => Some(Self::Blue),
            _ => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Which of the three user colors an update addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    Dot,
    Line,
    Background,
}

/// Named boolean feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Experiment {
    ExpressionTriggers,
    AdditionalModes,
    AudioVisualizer,
}

impl Experiment {
    pub const ALL: [Experiment; 3] = [
        Experiment::ExpressionTriggers,
        Experiment::AdditionalModes,
        Experiment::AudioVisualizer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ExpressionTriggers => "expressionTriggers",
            Self::AdditionalModes => "additionalModes",
            Self::AudioVisualizer => "audioVisualizer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|experiment| experiment.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experiments {
    pub expression_triggers: bool,
    pub additional_modes: bool,
    pub audio_visualizer: bool,
}

impl Experiments {
    pub fn get(&self, experiment: Experiment) -> bool {
        match experiment {
            Experiment::ExpressionTriggers => self.expression_triggers,
            Experiment::AdditionalModes => self.additional_modes,
            Experiment::AudioVisualizer => self.audio_visualizer,
        }
    }

    pub fn set(&mut self, experiment: Experiment, enabled: bool) {
        match experiment {
            Experiment::ExpressionTriggers => self.expression_triggers = enabled,
            Experiment::AdditionalModes => self.additional_modes = enabled,
            Experiment::AudioVisualizer => self.audio_visualizer = enabled,
        }
    }
}

/// Color shown for each emotion when expression triggers are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionColors {
    pub happy: Rgb,
    pub sad: Rgb,
    pub angry: Rgb,
    pub neutral: Rgb,
}

impl EmotionColors {
    pub fn get(&self, emotion: Emotion) -> Rgb {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Neutral => self.neutral,
        }
    }

    pub fn set(&mut self, emotion: Emotion, color: Rgb) {
        match emotion {
            Emotion::Happy => self.happy = color,
            Emotion::Sad => self.sad = color,
            Emotion::Angry => self.angry = color,
            Emotion::Neutral => self.neutral = color,
        }
    }
}

impl Default for EmotionColors {
    fn default() -> Self {
        Self {
            happy: Rgb(255, 215, 0),
            sad: Rgb(30, 144, 255),
            angry: Rgb(255, 40, 40),
            neutral: Rgb(0, 255, 0),
        }
    }
}

/// Dot and line colors forced by the last emotion classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOverride {
    pub dot: Rgb,
    pub line: Rgb,
}

/// The canonical live configuration record.
///
/// Serialization covers exactly the persisted fields; `current_emotion` and
/// the emotion color override are transient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub mode: usize,
    pub dot_color: Rgb,
    pub line_color: Rgb,
    pub bg_color: Rgb,
    pub dot_size: u32,
    pub line_thickness: u32,
    #[serde(rename = "currentConnectionTopology")]
    pub connection_topology: ConnectionTopology,
    pub show_camera: bool,
    pub camera_opacity: f32,
    pub show_hands: bool,
    pub performance_mode: bool,
    pub show_fps: bool,
    pub experiments: Experiments,
    pub emotion_colors: EmotionColors,
    pub audio_sensitivity: f32,
    pub hexagon_radius: u32,
    #[serde(skip)]
    pub current_emotion: Emotion,
    #[serde(skip)]
    pub color_override: Option<ColorOverride>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mode: 0,
            dot_color: Rgb(0, 255, 255),
            line_color: Rgb(0, 255, 0),
            bg_color: Rgb::BLACK,
            dot_size: 2,
            line_thickness: 1,
            connection_topology: ConnectionTopology::Tesselation,
            show_camera: false,
            camera_opacity: 0.5,
            show_hands: true,
            performance_mode: false,
            show_fps: true,
            experiments: Experiments::default(),
            emotion_colors: EmotionColors::default(),
            audio_sensitivity: 1.0,
            hexagon_radius: 12,
            current_emotion: Emotion::Neutral,
            color_override: None,
        }
    }
}

/// One complete, consistent mutation of the configuration. Multi-field
/// changes such as [`ConfigUpdate::Colors`] are applied as a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    Mode(usize),
    Color(ColorTarget, Rgb),
    ColorChannel {
        target: ColorTarget,
        channel: Channel,
        value: u8,
    },
    Colors {
        dot: Rgb,
        line: Rgb,
        bg: Rgb,
    },
    DotSize(i64),
    LineThickness(i64),
    Topology(ConnectionTopology),
    ShowCamera(bool),
    CameraOpacity(f32),
    ShowHands(bool),
    PerformanceMode(bool),
    ShowFps(bool),
    Experiment(Experiment, bool),
    EmotionColor(Emotion, Rgb),
    AudioSensitivity(f32),
    HexagonRadius(i64),
    Replace(Box<Configuration>),
}

impl Configuration {
    /// The mode catalog active under the current experiment flags.
    pub fn modes(&self) -> &'static [ModeId] {
        resolve_catalog(&self.experiments)
    }

    pub fn current_mode(&self) -> ModeId {
        let modes = self.modes();
        modes[clamp_index(self.mode, modes)]
    }

    pub fn effective_dot_color(&self) -> Rgb {
        self.color_override.map_or(self.dot_color, |o| o.dot)
    }

    pub fn effective_line_color(&self) -> Rgb {
        self.color_override.map_or(self.line_color, |o| o.line)
    }

    pub fn color(&self, target: ColorTarget) -> Rgb {
        match target {
            ColorTarget::Dot => self.dot_color,
            ColorTarget::Line => self.line_color,
            ColorTarget::Background => self.bg_color,
        }
    }

    /// Applies an update, clamping out-of-range values to their declared
    /// bounds.
    pub fn apply(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::Mode(mode) => {
                self.mode = mode.min(self.modes().len().saturating_sub(1));
            }
            ConfigUpdate::Color(target, color) => self.set_color(target, color),
            ConfigUpdate::ColorChannel {
                target,
                channel,
                value,
            } => {
                let color = self.color(target).with_channel(channel, value);
                self.set_color(target, color);
            }
            ConfigUpdate::Colors { dot, line, bg } => {
                self.dot_color = dot;
                self.line_color = line;
                self.bg_color = bg;
                self.color_override = None;
            }
            ConfigUpdate::DotSize(size) => self.dot_size = clamp_int(size, DOT_SIZE_RANGE),
            ConfigUpdate::LineThickness(thickness) => {
                self.line_thickness = clamp_int(thickness, LINE_THICKNESS_RANGE)
            }
            ConfigUpdate::Topology(topology) => self.connection_topology = topology,
            ConfigUpdate::ShowCamera(show) => self.show_camera = show,
            ConfigUpdate::CameraOpacity(opacity) => {
                self.camera_opacity = clamp_float(opacity, CAMERA_OPACITY_RANGE)
            }
            ConfigUpdate::ShowHands(show) => self.show_hands = show,
            ConfigUpdate::PerformanceMode(enabled) => self.performance_mode = enabled,
            ConfigUpdate::ShowFps(show) => self.show_fps = show,
            ConfigUpdate::Experiment(experiment, enabled) => {
                self.experiments.set(experiment, enabled);
                self.mode = clamp_index(self.mode, self.modes());
            }
            ConfigUpdate::EmotionColor(emotion, color) => self.emotion_colors.set(emotion, color),
            ConfigUpdate::AudioSensitivity(sensitivity) => {
                self.audio_sensitivity = clamp_float(sensitivity, AUDIO_SENSITIVITY_RANGE)
            }
            ConfigUpdate::HexagonRadius(radius) => {
                self.hexagon_radius = clamp_int(radius, HEXAGON_RADIUS_RANGE)
            }
            ConfigUpdate::Replace(next) => {
                let emotion = self.current_emotion;
                *self = next.sanitized();
                self.current_emotion = emotion;
                self.color_override = None;
            }
        }
    }

    /// Advances `mode` circularly within the current catalog.
    pub fn cycle_mode(&mut self) -> usize {
        let len = self.modes().len();
        self.mode = (clamp_index(self.mode, self.modes()) + 1) % len;
        self.mode
    }

    /// Re-establishes every range invariant, e.g. after deserialization.
    pub fn sanitized(mut self) -> Self {
        self.dot_size = clamp_int(self.dot_size.into(), DOT_SIZE_RANGE);
        self.line_thickness = clamp_int(self.line_thickness.into(), LINE_THICKNESS_RANGE);
        self.hexagon_radius = clamp_int(self.hexagon_radius.into(), HEXAGON_RADIUS_RANGE);
        self.camera_opacity = clamp_float(self.camera_opacity, CAMERA_OPACITY_RANGE);
        self.audio_sensitivity = clamp_float(self.audio_sensitivity, AUDIO_SENSITIVITY_RANGE);
        self.mode = clamp_index(self.mode, self.modes());
        self
    }

    fn set_color(&mut self, target: ColorTarget, color: Rgb) {
        match target {
            ColorTarget::Dot => self.dot_color = color,
            ColorTarget::Line => self.line_color = color,
            ColorTarget::Background => self.bg_color = color,
        }
        if target != ColorTarget::Background {
            self.color_override = None;
        }
    }
}

fn clamp_int(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn clamp_float(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
