//! The contract between the interactive settings surface and the core.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::{
    audio::{AudioBackend, AudioEnvelopeTracker, AudioLevel},
    config::{ConfigUpdate, Configuration, SharedConfig},
    modes::ModeId,
    store::{Catalog, ColorPreset, PersistenceStore},
    OverlayError, Result,
};

/// Mode state pushed to the settings surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeNotice {
    pub mode: usize,
    pub modes: Vec<ModeId>,
}

impl ModeNotice {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            mode: config.mode,
            modes: config.modes().to_vec(),
        }
    }
}

/// Single-slot, latest-value-wins mailbox. Posting never blocks; an unread
/// notice is replaced by the newer one.
#[derive(Debug, Clone)]
pub struct ModeMailbox {
    tx: Sender<ModeNotice>,
    rx: Receiver<ModeNotice>,
}

impl ModeMailbox {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(1);
        Self { tx, rx }
    }

    pub fn post(&self, notice: ModeNotice) {
        let mut notice = notice;
        loop {
            match self.tx.try_send(notice) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.rx.try_recv();
                    notice = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn take(&self) -> Option<ModeNotice> {
        self.rx.try_recv().ok()
    }
}

impl Default for ModeMailbox {
    fn default() -> Self {
        Self::new()
    }
}

struct AudioSession {
    tracker: AudioEnvelopeTracker,
    backend: Box<dyn AudioBackend>,
}

/// Reads and writes the live configuration on behalf of the settings
/// surface and forwards persistence requests to the store.
///
/// Every write goes through [`SharedConfig`], so it re-arms the autosave
/// debounce exactly like writes from any other context. After
/// [`close`](Self::close) the controller still answers reads but drops
/// writes, so nothing changes behind a finished autosave.
pub struct SettingsController {
    open: RwLock<bool>,
    config: SharedConfig,
    store: PersistenceStore,
    mailbox: ModeMailbox,
    audio_level: AudioLevel,
    audio: Mutex<AudioSession>,
}

impl SettingsController {
    pub fn new(
        config: SharedConfig,
        store: PersistenceStore,
        tracker: AudioEnvelopeTracker,
        backend: Box<dyn AudioBackend>,
        mailbox: ModeMailbox,
    ) -> Self {
        Self {
            open: RwLock::new(true),
            config,
            store,
            mailbox,
            audio_level: tracker.level(),
            audio: Mutex::new(AudioSession { tracker, backend }),
        }
    }

    pub fn config(&self) -> Arc<Configuration> {
        self.config.snapshot()
    }

    pub fn shared(&self) -> &SharedConfig {
        &self.config
    }

    pub fn audio_level(&self) -> AudioLevel {
        self.audio_level.clone()
    }

    pub fn mailbox(&self) -> &ModeMailbox {
        &self.mailbox
    }

    /// Applies one user edit and reacts to its side effects: catalog
    /// changes are announced and the audio stream follows its flag.
    pub fn apply(&self, update: ConfigUpdate) -> Arc<Configuration> {
        let Some(_open) = self.gate() else {
            tracing::debug!(?update, "settings closed, update dropped");
            return self.config.snapshot();
        };
        self.apply_open(update)
    }

    fn apply_open(&self, update: ConfigUpdate) -> Arc<Configuration> {
        let before = self.config.snapshot();
        let after = self.config.apply(update);
        self.after_change(&before, &after);
        after
    }

    /// Current mode catalog; also re-announces it to the surface.
    pub fn request_mode_refresh(&self) -> Vec<ModeId> {
        let config = self.config.snapshot();
        self.mailbox.post(ModeNotice::from_config(&config));
        config.modes().to_vec()
    }

    /// Latest mode change made outside the surface, if any.
    pub fn poll_notice(&self) -> Option<ModeNotice> {
        self.mailbox.take()
    }

    pub fn list(&self, catalog: Catalog) -> Result<Vec<String>> {
        self.store.list(catalog)
    }

    pub fn save(&self, name: &str) -> Result<()> {
        self.store.save(Catalog::Saves, name, &self.config.snapshot())?;
        tracing::info!(name, "saved configuration");
        Ok(())
    }

    /// Loads a named save. On corruption the entry is gone and the current
    /// configuration is kept.
    pub fn load(&self, name: &str) -> Result<()> {
        let _open = self.gate().ok_or(OverlayError::Closed)?;
        match self.store.load(Catalog::Saves, name) {
            Ok(loaded) => {
                self.replace(loaded);
                tracing::info!(name, "loaded configuration");
                Ok(())
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    pub fn delete(&self, catalog: Catalog, name: &str) -> Result<()> {
        self.store.delete(catalog, name).map_err(|err| {
            self.report(&err);
            err
        })
    }

    pub fn save_color_preset(&self, name: &str) -> Result<()> {
        let preset = ColorPreset::from_config(&self.config.snapshot());
        self.store.save_preset(name, &preset).map_err(|err| {
            self.report(&err);
            err
        })
    }

    pub fn apply_color_preset(&self, name: &str) -> Result<()> {
        let _open = self.gate().ok_or(OverlayError::Closed)?;
        let preset = self.store.load_preset(name).map_err(|err| {
            self.report(&err);
            err
        })?;
        self.apply_open(ConfigUpdate::Colors {
            dot: preset.dot_color,
            line: preset.line_color,
            bg: preset.bg_color,
        });
        Ok(())
    }

    /// Restores the autosave slot, if present and well formed. Returns
    /// whether anything was applied; corruption leaves the defaults in place.
    pub fn restore_autosave(&self) -> Result<bool> {
        let _open = self.gate().ok_or(OverlayError::Closed)?;
        match self.store.load_autosave() {
            Ok(Some(loaded)) => {
                self.replace(loaded);
                tracing::info!("restored autosave");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) if err.is_corrupt() => {
                tracing::warn!(%err, "autosave was corrupt, using defaults");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Brings the audio stream in line with the current flag, e.g. after
    /// startup.
    pub fn sync_audio(&self) {
        let Some(_open) = self.gate() else { return };
        let config = self.config.snapshot();
        self.reconcile_audio(&config);
    }

    /// Stops accepting writes and stops audio capture. Waits for writes
    /// already in progress; the device is released before this returns.
    pub fn close(&self) {
        let mut open = self.open.write().unwrap_or_else(PoisonError::into_inner);
        *open = false;
        self.lock_audio().tracker.stop();
        tracing::debug!("settings closed");
    }

    pub fn is_closed(&self) -> bool {
        !*self.open.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn audio_running(&self) -> bool {
        self.lock_audio().tracker.is_running()
    }

    fn replace(&self, loaded: Configuration) {
        let before = self.config.snapshot();
        let after = self.config.replace(loaded);
        self.after_change(&before, &after);
        self.mailbox.post(ModeNotice::from_config(&after));
    }

    fn after_change(&self, before: &Configuration, after: &Configuration) {
        if before.modes() != after.modes() {
            self.mailbox.post(ModeNotice::from_config(after));
        }
        if before.experiments.audio_visualizer != after.experiments.audio_visualizer {
            self.reconcile_audio(after);
        }
    }

    fn reconcile_audio(&self, config: &Configuration) {
        let mut session = self.lock_audio();
        let AudioSession { tracker, backend } = &mut *session;
        let wanted = config.experiments.audio_visualizer;

        if wanted && !tracker.is_running() {
            match tracker.start(backend.as_mut()) {
                Ok(()) => {}
                Err(OverlayError::AudioUnavailable(reason)) => {
                    tracing::info!(%reason, "audio visualizer stays inactive");
                }
                Err(err) => tracing::warn!(%err, "failed to start audio capture"),
            }
        } else if !wanted && tracker.is_running() {
            tracker.stop();
        }
    }

    fn report(&self, err: &OverlayError) {
        if err.is_user_error() {
            tracing::warn!(%err, "request rejected");
        } else {
            tracing::warn!(%err, "persistence request failed");
        }
    }

    /// Held for the duration of a write; `None` once closed.
    fn gate(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if *open {
            Some(open)
        } else {
            None
        }
    }

    // The session holds no cross-field invariant a panic could break.
    fn lock_audio(&self) -> MutexGuard<'_, AudioSession> {
        self.audio.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SettingsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsController")
            .field("store", &self.store)
            .field("audio_level", &self.audio_level.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        audio::{BufferSink, CaptureStream, NoAudioBackend},
        config::{AudioConfig, Rgb},
        Experiment,
    };

    #[derive(Clone, Default)]
    struct CountingBackend {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    struct CountingStream(Arc<AtomicUsize>);

    impl CaptureStream for CountingStream {
        fn close(self: Box<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AudioBackend for CountingBackend {
        fn open(&mut self, _sink: BufferSink) -> Result<Box<dyn CaptureStream>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingStream(self.closed.clone())))
        }
    }

    fn controller(dir: &TempDir, backend: Box<dyn AudioBackend>) -> SettingsController {
        SettingsController::new(
            SharedConfig::default(),
            PersistenceStore::open(dir.path()).unwrap(),
            AudioEnvelopeTracker::new(&AudioConfig::default()),
            backend,
            ModeMailbox::new(),
        )
    }

    #[test]
    fn mailbox_keeps_only_latest_notice() {
        let mailbox = ModeMailbox::new();
        for mode in 0..5 {
            mailbox.post(ModeNotice {
                mode,
                modes: vec![ModeId::Mesh],
            });
        }
        assert_eq!(mailbox.take().unwrap().mode, 4);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn toggling_additional_modes_announces_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));

        controller.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, true));
        controller.apply(ConfigUpdate::Mode(4));
        let notice = controller.poll_notice().unwrap();
        assert_eq!(notice.modes.len(), 5);

        controller.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, false));
        let notice = controller.poll_notice().unwrap();
        assert_eq!(notice, ModeNotice { mode: 0, modes: vec![ModeId::Mesh, ModeId::Dots] });

        controller.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, true));
        assert_eq!(controller.config().mode, 0);
        assert_eq!(controller.request_mode_refresh().len(), 5);
    }

    #[test]
    fn audio_follows_visualizer_flag() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CountingBackend::default();
        let controller = controller(&dir, Box::new(backend.clone()));

        controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, true));
        assert!(controller.audio_running());
        controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, false));
        assert!(!controller.audio_running());

        assert_eq!(backend.opened.load(Ordering::SeqCst), 1);
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_audio_device_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));
        let config = controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, true));
        assert!(config.experiments.audio_visualizer);
        assert!(!controller.audio_running());
    }

    #[test]
    fn save_and_load_named_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));

        controller.apply(ConfigUpdate::DotSize(8));
        controller.save("big dots").unwrap();
        controller.apply(ConfigUpdate::DotSize(1));

        controller.load("big dots").unwrap();
        assert_eq!(controller.config().dot_size, 8);
        assert_eq!(controller.list(Catalog::Saves).unwrap(), vec!["big dots"]);
    }

    #[test]
    fn corrupt_load_keeps_current_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));
        controller.apply(ConfigUpdate::DotSize(6));
        std::fs::write(dir.path().join("saves/bad.json"), b"\x00\x01garbage").unwrap();

        let err = controller.load("bad").unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(controller.config().dot_size, 6);
        assert!(controller.list(Catalog::Saves).unwrap().is_empty());
    }

    #[test]
    fn color_presets_apply_and_protect_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));

        controller.apply_color_preset("Sunset").unwrap();
        assert_eq!(controller.config().bg_color, Rgb(40, 10, 30));

        let err = controller.delete(Catalog::ColorPresets, "Sunset").unwrap_err();
        assert!(err.is_user_error());

        controller.save_color_preset("mine").unwrap();
        controller.apply(ConfigUpdate::Colors {
            dot: Rgb::BLACK,
            line: Rgb::BLACK,
            bg: Rgb::WHITE,
        });
        controller.apply_color_preset("mine").unwrap();
        assert_eq!(controller.config().bg_color, Rgb(40, 10, 30));
    }

    #[test]
    fn restore_autosave_handles_missing_and_corrupt_slots() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir, Box::new(NoAudioBackend));
        assert!(!controller.restore_autosave().unwrap());

        std::fs::write(dir.path().join("autosave/autosave.json"), b"{").unwrap();
        assert!(!controller.restore_autosave().unwrap());
        assert!(!dir.path().join("autosave/autosave.json").exists());
        assert_eq!(*controller.config(), Configuration::default());
    }

    #[test]
    fn closed_controller_drops_writes_and_keeps_audio_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CountingBackend::default();
        let controller = controller(&dir, Box::new(backend.clone()));
        controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, true));
        controller.save("kept").unwrap();

        controller.close();
        assert!(controller.is_closed());
        assert!(!controller.audio_running());
        assert_eq!(backend.closed.load(Ordering::SeqCst), 1);

        controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, false));
        let config = controller.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, true));
        controller.sync_audio();
        assert!(!controller.audio_running());
        assert_eq!(backend.opened.load(Ordering::SeqCst), 1);

        let before = controller.config();
        let config_after = controller.apply(ConfigUpdate::DotSize(9));
        assert_eq!(config_after, before);
        assert_eq!(config, before);
        assert!(matches!(controller.load("kept"), Err(OverlayError::Closed)));
        assert!(matches!(
            controller.apply_color_preset("Neon"),
            Err(OverlayError::Closed)
        ));
        assert_eq!(controller.config(), before);
    }
}
