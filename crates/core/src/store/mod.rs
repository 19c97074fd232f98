//! Named snapshot catalogs on disk.
//!
//! Each catalog is a directory of `<name>.json` files under the storage
//! root. Unparseable files are deleted on load and reported as
//! [`OverlayError::Corrupt`].

use std::{
    collections::BTreeSet,
    fmt, fs,
    path::PathBuf,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::{Configuration, Rgb},
    OverlayError, Result,
};

mod autosave;

pub use autosave::{AutosaveStats, Autosaver};

const EXTENSION: &str = "json";
pub const AUTOSAVE_SLOT: &str = "autosave";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    Saves,
    ColorPresets,
    Autosave,
}

impl Catalog {
    pub const ALL: [Catalog; 3] = [Catalog::Saves, Catalog::ColorPresets, Catalog::Autosave];

    fn dir_name(self) -> &'static str {
        match self {
            Self::Saves => "saves",
            Self::ColorPresets => "presets",
            Self::Autosave => "autosave",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "saves" | "save" => Some(Self::Saves),
            "presets" | "preset" => Some(Self::ColorPresets),
            "autosave" => Some(Self::Autosave),
            _ => None,
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Saves => "save",
            Self::ColorPresets => "color preset",
            Self::Autosave => "autosave",
        })
    }
}

/// Color-only subset of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPreset {
    pub dot_color: Rgb,
    pub line_color: Rgb,
    pub bg_color: Rgb,
}

impl ColorPreset {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            dot_color: config.dot_color,
            line_color: config.line_color,
            bg_color: config.bg_color,
        }
    }
}

/// Read-only presets that ship with the application, in display order.
pub const BUILTIN_PRESETS: [(&str, ColorPreset); 5] = [
    (
        "Classic",
        ColorPreset {
            dot_color: Rgb(0, 255, 255),
            line_color: Rgb(0, 255, 0),
            bg_color: Rgb(0, 0, 0),
        },
    ),
    (
        "Neon",
        ColorPreset {
            dot_color: Rgb(255, 0, 255),
            line_color: Rgb(0, 255, 255),
            bg_color: Rgb(10, 0, 30),
        },
    ),
    (
        "Monochrome",
        ColorPreset {
            dot_color: Rgb(255, 255, 255),
            line_color: Rgb(160, 160, 160),
            bg_color: Rgb(0, 0, 0),
        },
    ),
    (
        "Sunset",
        ColorPreset {
            dot_color: Rgb(255, 200, 60),
            line_color: Rgb(255, 90, 40),
            bg_color: Rgb(40, 10, 30),
        },
    ),
    (
        "Ocean",
        ColorPreset {
            dot_color: Rgb(120, 220, 255),
            line_color: Rgb(0, 120, 200),
            bg_color: Rgb(0, 20, 40),
        },
    ),
];

pub fn builtin_preset(name: &str) -> Option<ColorPreset> {
    BUILTIN_PRESETS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, preset)| *preset)
}

/// File-backed storage for saves, color presets and the autosave slot.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    root: PathBuf,
}

impl PersistenceStore {
    /// Opens the store, creating every catalog directory that is missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for catalog in Catalog::ALL {
            fs::create_dir_all(store.catalog_dir(catalog))?;
        }
        Ok(store)
    }

    /// Writes the persistable fields of `config`, overwriting any entry
    /// with the same name.
    pub fn save(&self, catalog: Catalog, name: &str, config: &Configuration) -> Result<()> {
        if catalog == Catalog::ColorPresets {
            return self.save_preset(name, &ColorPreset::from_config(config));
        }
        self.write_entry(catalog, name, config)
    }

    /// Loads a full configuration snapshot. Missing or ill-typed fields take
    /// their defaults; unparseable content deletes the file.
    pub fn load(&self, catalog: Catalog, name: &str) -> Result<Configuration> {
        let object = self.read_object(catalog, name)?;
        Ok(config_from_object(&object))
    }

    pub fn save_preset(&self, name: &str, preset: &ColorPreset) -> Result<()> {
        if builtin_preset(name).is_some() {
            tracing::warn!(name, "refusing to overwrite built-in color preset");
            return Err(OverlayError::ProtectedPreset(name.to_owned()));
        }
        self.write_entry(Catalog::ColorPresets, name, preset)
    }

    pub fn load_preset(&self, name: &str) -> Result<ColorPreset> {
        if let Some(preset) = builtin_preset(name) {
            return Ok(preset);
        }
        let object = self.read_object(Catalog::ColorPresets, name)?;
        let defaults = ColorPreset::from_config(&Configuration::default());
        Ok(ColorPreset {
            dot_color: field(&object, "dotColor").unwrap_or(defaults.dot_color),
            line_color: field(&object, "lineColor").unwrap_or(defaults.line_color),
            bg_color: field(&object, "bgColor").unwrap_or(defaults.bg_color),
        })
    }

    /// Entry names in catalog order. Color presets list the built-ins first,
    /// then user presets alphabetically.
    pub fn list(&self, catalog: Catalog) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(self.catalog_dir(catalog))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.insert(stem.to_owned());
            }
        }

        if catalog != Catalog::ColorPresets {
            return Ok(names.into_iter().collect());
        }
        let mut ordered: Vec<String> = BUILTIN_PRESETS
            .iter()
            .map(|(name, _)| (*name).to_owned())
            .collect();
        ordered.extend(names.into_iter().filter(|name| builtin_preset(name).is_none()));
        Ok(ordered)
    }

    /// Removes one entry. Built-in presets are rejected with a user error.
    pub fn delete(&self, catalog: Catalog, name: &str) -> Result<()> {
        if catalog == Catalog::ColorPresets && builtin_preset(name).is_some() {
            tracing::warn!(name, "refusing to delete built-in color preset");
            return Err(OverlayError::ProtectedPreset(name.to_owned()));
        }
        let path = self.entry_path(catalog, name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(%catalog, name, "deleted entry");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(OverlayError::NotFound {
                catalog,
                name: name.to_owned(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save_autosave(&self, config: &Configuration) -> Result<()> {
        self.write_entry(Catalog::Autosave, AUTOSAVE_SLOT, config)
    }

    /// Reads the autosave slot. `Ok(None)` when nothing was saved yet.
    pub fn load_autosave(&self) -> Result<Option<Configuration>> {
        match self.load(Catalog::Autosave, AUTOSAVE_SLOT) {
            Ok(config) => Ok(Some(config)),
            Err(OverlayError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn catalog_dir(&self, catalog: Catalog) -> PathBuf {
        self.root.join(catalog.dir_name())
    }

    fn entry_path(&self, catalog: Catalog, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self
            .catalog_dir(catalog)
            .join(format!("{name}.{EXTENSION}")))
    }

    fn write_entry<T: Serialize>(&self, catalog: Catalog, name: &str, value: &T) -> Result<()> {
        let path = self.entry_path(catalog, name)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        // Write beside the target and rename so readers never see a partial file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;
        tracing::debug!(%catalog, name, "wrote entry");
        Ok(())
    }

    fn read_object(&self, catalog: Catalog, name: &str) -> Result<Map<String, Value>> {
        let path = self.entry_path(catalog, name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(OverlayError::NotFound {
                    catalog,
                    name: name.to_owned(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(object)) => Ok(object),
            _ => {
                tracing::warn!(%catalog, name, "corrupt entry, removing");
                if let Err(err) = fs::remove_file(&path) {
                    tracing::warn!(%err, "failed to remove corrupt entry");
                }
                Err(OverlayError::Corrupt {
                    catalog,
                    name: name.to_owned(),
                })
            }
        }
    }
}

/// Names must be usable as a single file name component.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    let valid = !trimmed.is_empty()
        && trimmed == name
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(OverlayError::InvalidName(name.to_owned()))
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    let value = object.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::debug!(key, %err, "ignoring ill-typed snapshot field");
            None
        }
    }
}

fn load_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, slot: &mut T) {
    if let Some(value) = field(object, key) {
        *slot = value;
    }
}

/// Builds a configuration field by field over the defaults, then re-applies
/// every range invariant.
fn config_from_object(object: &Map<String, Value>) -> Configuration {
    let mut config = Configuration::default();
    load_field(object, "mode", &mut config.mode);
    load_field(object, "dotColor", &mut config.dot_color);
    load_field(object, "lineColor", &mut config.line_color);
    load_field(object, "bgColor", &mut config.bg_color);
    load_field(object, "dotSize", &mut config.dot_size);
    load_field(object, "lineThickness", &mut config.line_thickness);
    load_field(
        object,
        "currentConnectionTopology",
        &mut config.connection_topology,
    );
    load_field(object, "showCamera", &mut config.show_camera);
    load_field(object, "cameraOpacity", &mut config.camera_opacity);
    load_field(object, "showHands", &mut config.show_hands);
    load_field(object, "performanceMode", &mut config.performance_mode);
    load_field(object, "showFps", &mut config.show_fps);
    load_field(object, "experiments", &mut config.experiments);
    load_field(object, "emotionColors", &mut config.emotion_colors);
    load_field(object, "audioSensitivity", &mut config.audio_sensitivity);
    load_field(object, "hexagonRadius", &mut config.hexagon_radius);
    config.sanitized()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        emotion::Emotion, graph::ConnectionTopology, ConfigUpdate, Experiment,
    };

    fn store() -> (TempDir, PersistenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistenceStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn customized() -> Configuration {
        let mut config = Configuration::default();
        config.apply(ConfigUpdate::Experiment(Experiment::AdditionalModes, true));
        config.apply(ConfigUpdate::Experiment(Experiment::AudioVisualizer, true));
        config.apply(ConfigUpdate::Mode(3));
        config.apply(ConfigUpdate::Colors {
            dot: Rgb(1, 2, 3),
            line: Rgb(4, 5, 6),
            bg: Rgb(7, 8, 9),
        });
        config.apply(ConfigUpdate::DotSize(7));
        config.apply(ConfigUpdate::LineThickness(3));
        config.apply(ConfigUpdate::Topology(ConnectionTopology::LeftEye));
        config.apply(ConfigUpdate::ShowCamera(true));
        config.apply(ConfigUpdate::CameraOpacity(0.35));
        config.apply(ConfigUpdate::ShowHands(false));
        config.apply(ConfigUpdate::PerformanceMode(true));
        config.apply(ConfigUpdate::ShowFps(false));
        config.apply(ConfigUpdate::EmotionColor(Emotion::Sad, Rgb(11, 22, 33)));
        config.apply(ConfigUpdate::AudioSensitivity(2.5));
        config.apply(ConfigUpdate::HexagonRadius(30));
        config
    }

    #[test]
    fn creates_catalog_directories() {
        let (dir, _store) = store();
        for name in ["saves", "presets", "autosave"] {
            assert!(dir.path().join(name).is_dir());
        }
    }

    #[test]
    fn save_then_load_round_trips_persisted_fields() {
        let (_dir, store) = store();
        let mut config = customized();
        config.current_emotion = Emotion::Angry;

        store.save(Catalog::Saves, "stage", &config).unwrap();
        let loaded = store.load(Catalog::Saves, "stage").unwrap();

        config.current_emotion = Emotion::Neutral;
        assert_eq!(loaded, config);
    }

    #[test]
    fn corrupt_entry_is_removed_and_reported() {
        let (dir, store) = store();
        store.save(Catalog::Saves, "broken", &customized()).unwrap();
        fs::write(dir.path().join("saves/broken.json"), b"{ not json").unwrap();

        let err = store.load(Catalog::Saves, "broken").unwrap_err();
        assert!(err.is_corrupt());
        assert!(!store.list(Catalog::Saves).unwrap().contains(&"broken".to_owned()));
        assert!(matches!(
            store.load(Catalog::Saves, "broken"),
            Err(OverlayError::NotFound { .. })
        ));
    }

    #[test]
    fn non_object_root_is_corrupt() {
        let (dir, store) = store();
        fs::write(dir.path().join("saves/list.json"), b"[1, 2, 3]").unwrap();
        assert!(store.load(Catalog::Saves, "list").unwrap_err().is_corrupt());
    }

    #[test]
    fn missing_and_unknown_keys_fall_back_to_defaults() {
        let (dir, store) = store();
        fs::write(
            dir.path().join("saves/partial.json"),
            br#"{"dotSize": 5, "lineColor": [300, 0, 0], "futureField": true, "mode": 7}"#,
        )
        .unwrap();

        let loaded = store.load(Catalog::Saves, "partial").unwrap();
        let defaults = Configuration::default();
        assert_eq!(loaded.dot_size, 5);
        assert_eq!(loaded.line_color, defaults.line_color);
        assert_eq!(loaded.mode, 0);
        assert_eq!(loaded.bg_color, defaults.bg_color);
    }

    #[test]
    fn builtin_presets_cannot_be_deleted_or_overwritten() {
        let (_dir, store) = store();
        let before = store.list(Catalog::ColorPresets).unwrap();

        let err = store.delete(Catalog::ColorPresets, "Neon").unwrap_err();
        assert!(err.is_user_error());
        let err = store
            .save_preset("Neon", &ColorPreset::from_config(&customized()))
            .unwrap_err();
        assert!(matches!(err, OverlayError::ProtectedPreset(_)));

        assert_eq!(store.list(Catalog::ColorPresets).unwrap(), before);
        assert_eq!(store.load_preset("Neon").unwrap(), BUILTIN_PRESETS[1].1);
    }

    #[test]
    fn user_presets_list_after_builtins() {
        let (_dir, store) = store();
        let preset = ColorPreset::from_config(&customized());
        store.save_preset("zeta", &preset).unwrap();
        store.save_preset("alpha", &preset).unwrap();

        let names = store.list(Catalog::ColorPresets).unwrap();
        assert_eq!(&names[..5], &["Classic", "Neon", "Monochrome", "Sunset", "Ocean"]);
        assert_eq!(&names[5..], &["alpha", "zeta"]);
        assert_eq!(store.load_preset("alpha").unwrap(), preset);

        store.delete(Catalog::ColorPresets, "alpha").unwrap();
        assert_eq!(store.list(Catalog::ColorPresets).unwrap().len(), 6);
    }

    #[test]
    fn deleting_missing_entry_is_a_user_error() {
        let (_dir, store) = store();
        let err = store.delete(Catalog::Saves, "ghost").unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn rejects_path_like_names() {
        let (_dir, store) = store();
        for name in ["", "../escape", "a/b", " padded"] {
            let err = store.save(Catalog::Saves, name, &customized()).unwrap_err();
            assert!(matches!(err, OverlayError::InvalidName(_)), "{name}");
        }
    }

    #[test]
    fn autosave_slot_round_trips() {
        let (_dir, store) = store();
        assert!(store.load_autosave().unwrap().is_none());
        store.save_autosave(&customized()).unwrap();
        assert_eq!(store.load_autosave().unwrap(), Some(customized()));
        assert_eq!(store.list(Catalog::Autosave).unwrap(), vec![AUTOSAVE_SLOT]);
    }
}
