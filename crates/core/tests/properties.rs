use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use landmark_overlay_core::{
    audio::{BufferSink, CaptureStream},
    emotion::{self, Emotion},
    store::BUILTIN_PRESETS,
    AudioBackend, AudioConfig, AudioEnvelopeTracker, Autosaver, Catalog, ColorTarget,
    ConfigUpdate, Configuration, ConnectionTopology, Experiment, Landmark, LandmarkSet,
    ModeMailbox, NoAudioBackend, OverlayError, PersistenceStore, Rgb, SettingsController,
    SharedConfig,
};
use tempfile::TempDir;

fn controller(root: &TempDir, shared: &SharedConfig) -> SettingsController {
    SettingsController::new(
        shared.clone(),
        PersistenceStore::open(root.path()).unwrap(),
        AudioEnvelopeTracker::new(&AudioConfig::default()),
        Box::new(NoAudioBackend),
        ModeMailbox::new(),
    )
}

fn customised(updates: Vec<ConfigUpdate>) -> Configuration {
    let mut config = Configuration::default();
    for update in updates {
        config.apply(update);
    }
    config
}

#[test]
fn saved_configurations_load_back_unchanged() {
    let root = tempfile::tempdir().unwrap();
    let store = PersistenceStore::open(root.path()).unwrap();

    let samples = vec![
        Configuration::default(),
        customised(vec![
            ConfigUpdate::Experiment(Experiment::AdditionalModes, true),
            ConfigUpdate::Mode(3),
            ConfigUpdate::Color(ColorTarget::Dot, Rgb(12, 34, 56)),
            ConfigUpdate::Color(ColorTarget::Background, Rgb(255, 255, 255)),
            ConfigUpdate::DotSize(10),
            ConfigUpdate::LineThickness(5),
            ConfigUpdate::Topology(ConnectionTopology::LeftEye),
            ConfigUpdate::ShowCamera(true),
            ConfigUpdate::CameraOpacity(0.35),
            ConfigUpdate::ShowHands(false),
            ConfigUpdate::PerformanceMode(true),
            ConfigUpdate::ShowFps(false),
            ConfigUpdate::EmotionColor(Emotion::Angry, Rgb(1, 2, 3)),
            ConfigUpdate::AudioSensitivity(7.5),
            ConfigUpdate::HexagonRadius(40),
        ]),
        customised(vec![
            ConfigUpdate::Experiment(Experiment::ExpressionTriggers, true),
            ConfigUpdate::Experiment(Experiment::AudioVisualizer, true),
            ConfigUpdate::Mode(1),
            ConfigUpdate::CameraOpacity(0.1),
            ConfigUpdate::AudioSensitivity(0.0),
        ]),
    ];

    for (index, config) in samples.into_iter().enumerate() {
        let name = format!("sample {index}");
        store.save(Catalog::Saves, &name, &config).unwrap();
        assert_eq!(store.load(Catalog::Saves, &name).unwrap(), config);
    }
}

#[test]
fn transient_emotion_is_not_persisted() {
    let root = tempfile::tempdir().unwrap();
    let store = PersistenceStore::open(root.path()).unwrap();

    let mut config = Configuration::default();
    config.current_emotion = Emotion::Happy;
    store.save(Catalog::Saves, "moody", &config).unwrap();

    let loaded = store.load(Catalog::Saves, "moody").unwrap();
    assert_eq!(loaded.current_emotion, Emotion::Neutral);
    let text = std::fs::read_to_string(root.path().join("saves/moody.json")).unwrap();
    assert!(!text.contains("currentEmotion"));
}

#[test]
fn corrupt_snapshot_is_deleted_and_reported() {
    let root = tempfile::tempdir().unwrap();
    let store = PersistenceStore::open(root.path()).unwrap();
    store
        .save(Catalog::Saves, "broken", &Configuration::default())
        .unwrap();
    std::fs::write(root.path().join("saves/broken.json"), "{\"dotSize\": 4,").unwrap();

    let err = store.load(Catalog::Saves, "broken").unwrap_err();
    assert!(matches!(err, OverlayError::Corrupt { .. }));
    assert!(!store
        .list(Catalog::Saves)
        .unwrap()
        .contains(&"broken".to_owned()));
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let root = tempfile::tempdir().unwrap();
    let store = PersistenceStore::open(root.path()).unwrap();
    std::fs::write(
        root.path().join("saves/partial.json"),
        r#"{"dotSize": 7, "lineColor": "nope", "unknownKey": true}"#,
    )
    .unwrap();

    let loaded = store.load(Catalog::Saves, "partial").unwrap();
    assert_eq!(loaded.dot_size, 7);
    assert_eq!(loaded.line_color, Configuration::default().line_color);
}

#[test]
fn catalog_resize_resets_mode_without_restoring_it() {
    let mut config = Configuration::default();
    config.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, true));
    config.apply(ConfigUpdate::Mode(4));
    assert_eq!(config.modes().len(), 5);

    config.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, false));
    assert_eq!(config.modes().len(), 2);
    assert_eq!(config.mode, 0);

    config.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, true));
    assert_eq!(config.modes().len(), 5);
    assert_eq!(config.mode, 0);

    config.apply(ConfigUpdate::Mode(4));
    assert_eq!(config.mode, 4);
}

fn happy_and_sad_face() -> LandmarkSet {
    let mut points = vec![Landmark::new(0.5, 0.5); 468];
    // Wide open mouth with raised corners.
    points[61] = Landmark::new(0.4, 0.68);
    points[291] = Landmark::new(0.6, 0.68);
    points[13] = Landmark::new(0.5, 0.66);
    points[14] = Landmark::new(0.5, 0.74);
    // Nearly closed eyes and high-set brows also satisfy the sad rule.
    points[386] = Landmark::new(0.6, 0.40);
    points[374] = Landmark::new(0.6, 0.41);
    points[159] = Landmark::new(0.4, 0.40);
    points[145] = Landmark::new(0.4, 0.41);
    points[334] = Landmark::new(0.6, 0.30);
    points[105] = Landmark::new(0.4, 0.30);
    points[10] = Landmark::new(0.5, 0.20);
    LandmarkSet::new(points)
}

#[test]
fn emotion_classification_is_deterministic_and_ordered() {
    let face = happy_and_sad_face();
    let first = emotion::classify(&face, true);
    assert_eq!(first, Emotion::Happy);
    for _ in 0..10 {
        assert_eq!(emotion::classify(&face, true), first);
    }
    assert_eq!(emotion::classify(&face, false), Emotion::Neutral);
}

#[test]
fn burst_of_surface_writes_autosaves_once() {
    let root = tempfile::tempdir().unwrap();
    let shared = SharedConfig::default();
    let controller = controller(&root, &shared);
    let store = PersistenceStore::open(root.path()).unwrap();
    let quiet = Duration::from_millis(250);
    let autosaver = Autosaver::spawn(store.clone(), shared.subscribe(), quiet).unwrap();

    let mut last_change = Instant::now();
    for thickness in 1..=5 {
        last_change = Instant::now();
        controller.apply(ConfigUpdate::LineThickness(thickness));
        thread::sleep(Duration::from_millis(30));
    }
    assert_eq!(autosaver.stats().writes(), 0);

    thread::sleep(Duration::from_millis(900));
    assert_eq!(autosaver.stats().writes(), 1);
    assert!(autosaver.stats().last_write().unwrap() >= last_change + quiet);
    assert_eq!(store.load_autosave().unwrap().unwrap().line_thickness, 5);
    autosaver.shutdown();
}

#[test]
fn builtin_presets_cannot_be_deleted_or_overwritten() {
    let root = tempfile::tempdir().unwrap();
    let shared = SharedConfig::default();
    let controller = controller(&root, &shared);
    let before = controller.list(Catalog::ColorPresets).unwrap();

    for (name, _) in BUILTIN_PRESETS {
        let err = controller.delete(Catalog::ColorPresets, name).unwrap_err();
        assert!(err.is_user_error(), "{name}: {err}");
        let err = controller.save_color_preset(name).unwrap_err();
        assert!(err.is_user_error(), "{name}: {err}");
    }

    assert_eq!(controller.list(Catalog::ColorPresets).unwrap(), before);
}

#[derive(Clone, Default)]
struct CapturingBackend {
    sinks: Arc<Mutex<Vec<BufferSink>>>,
}

struct IdleStream;

impl CaptureStream for IdleStream {
    fn close(self: Box<Self>) {}
}

impl AudioBackend for CapturingBackend {
    fn open(&mut self, sink: BufferSink) -> landmark_overlay_core::Result<Box<dyn CaptureStream>> {
        self.sinks.lock().unwrap().push(sink);
        Ok(Box::new(IdleStream))
    }
}

#[test]
fn audio_level_reflects_only_buffers_after_restart() {
    let mut backend = CapturingBackend::default();
    let mut tracker = AudioEnvelopeTracker::new(&AudioConfig::default());
    let level = tracker.level();

    tracker.start(&mut backend).unwrap();
    let old = backend.sinks.lock().unwrap()[0].clone();
    assert!(old.deliver(&[0.3; 256]));
    assert!((level.get() - 1.0).abs() < 1e-4);

    tracker.stop();
    tracker.start(&mut backend).unwrap();
    let new = backend.sinks.lock().unwrap()[1].clone();

    assert!(new.deliver(&[0.03; 256]));
    assert!((level.get() - 0.1).abs() < 1e-4);

    // A late buffer from the stopped session is dropped.
    assert!(!old.deliver(&[0.3; 256]));
    assert!((level.get() - 0.1).abs() < 1e-4);
}
