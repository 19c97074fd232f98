//! Core library for the landmark overlay application.
//!
//! The crate turns per-frame face and hand landmarks into stylized overlays.
//! Each module owns a distinct subsystem (landmark detection seams, the
//! connection graph, draw modes, emotion classification, audio envelope
//! tracking, persistence, the render cycle and its ordered shutdown). The
//! shared live configuration ties them together and is safe to read and
//! write from the render loop, the settings surface, the audio callback and
//! the autosave worker concurrently.

pub mod audio;
pub mod config;
pub mod emotion;
pub mod error;
pub mod graph;
pub mod landmarks;
pub mod modes;
pub mod render;
pub mod settings;
pub mod shutdown;
pub mod store;
pub mod timeline;

pub use audio::{AudioBackend, AudioEnvelopeTracker, AudioLevel, NoAudioBackend, ToneBackend};
pub use config::{
    AppConfig, AudioConfig, Channel, ColorOverride, ColorTarget, ConfigUpdate, Configuration,
    Experiment, Experiments, Rgb, SharedConfig,
};
pub use emotion::Emotion;
pub use error::{OverlayError, Result};
pub use graph::{ConnectionGraph, ConnectionTopology, HandTopology, TopologyTables};
pub use landmarks::{Landmark, LandmarkDetector, LandmarkSet};
pub use modes::{ModeId, ModeRegistry};
pub use render::{RenderCycle, RunSummary, StopReason, VideoFrame, VideoSurface};
pub use settings::{ModeMailbox, ModeNotice, SettingsController};
pub use shutdown::{shutdown, ShutdownReport, ShutdownStep};
pub use store::{Autosaver, Catalog, PersistenceStore};
pub use timeline::{Debouncer, FpsCounter};
