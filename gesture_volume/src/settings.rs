//! Runtime settings.
//!
//! Layered lowest to highest: built-in defaults, `gesture_volume.toml` (or
//! the file given with `--config`), `GESTURE_VOLUME__<FIELD>` environment
//! variables, then command-line flags applied by `main`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use palm_lock::{HoldConfig, DEFAULT_HOLD};
use serde::Deserialize;
use thiserror::Error;
use volume_map::DistanceRange;

pub const DEFAULT_CONFIG_FILE: &str = "gesture_volume.toml";
const ENV_PREFIX: &str = "GESTURE_VOLUME__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid value {value:?} for {key}")]
    Env { key: String, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Which [`VolumeSink`](volume_map::VolumeSink) to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// osascript on macOS, amixer on Linux, log elsewhere.
    Auto,
    Osascript,
    Amixer,
    Midi,
    Log,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto"      => Ok(SinkKind::Auto),
            "osascript" => Ok(SinkKind::Osascript),
            "amixer"    => Ok(SinkKind::Amixer),
            "midi"      => Ok(SinkKind::Midi),
            "log"       => Ok(SinkKind::Log),
            other       => Err(format!("unknown sink {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Seconds the left palm must stay open to toggle the lock.
    pub hold_secs:           f32,
    pub distance_min:        f32,
    pub distance_max:        f32,
    /// Pixel size the normalised landmarks are scaled to.
    pub frame_width:         u32,
    pub frame_height:        u32,
    /// Feed hands scoring below this are dropped.
    pub min_detection_score: f32,
    pub sink:                SinkKind,
    /// Substring of the MIDI output port name to prefer.
    pub midi_port:           Option<String>,
    pub midi_channel:        u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hold_secs:           2.0,
            distance_min:        15.0,
            distance_max:        200.0,
            frame_width:         640,
            frame_height:        480,
            min_detection_score: 0.75,
            sink:                SinkKind::Auto,
            midi_port:           None,
            midi_channel:        0,
        }
    }
}

/// File form: every field optional, unknown keys rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    hold_secs:           Option<f32>,
    distance_min:        Option<f32>,
    distance_max:        Option<f32>,
    frame_width:         Option<u32>,
    frame_height:        Option<u32>,
    min_detection_score: Option<f32>,
    sink:                Option<SinkKind>,
    midi_port:           Option<String>,
    midi_channel:        Option<u8>,
}

/// Keep only variables whose name and value are both UTF-8; anything else
/// cannot name one of our keys.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

impl Settings {
    /// Defaults, then `path` (if given, it must exist; otherwise
    /// [`DEFAULT_CONFIG_FILE`] is read when present), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
        let mut settings = Settings::default();

        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None    => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        match fs::read_to_string(&path) {
            Ok(raw) => settings.apply_toml(&raw, &path)?,
            Err(source) if required => return Err(SettingsError::Read { path, source }),
            Err(_) => {}
        }

        settings.apply_env(utf8_vars(std::env::vars_os()))?;
        Ok(settings)
    }

    fn apply_toml(&mut self, raw: &str, path: &Path) -> Result<(), SettingsError> {
        let file: FileSettings = toml::from_str(raw)
            .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })?;

        if let Some(v) = file.hold_secs           { self.hold_secs = v; }
        if let Some(v) = file.distance_min        { self.distance_min = v; }
        if let Some(v) = file.distance_max        { self.distance_max = v; }
        if let Some(v) = file.frame_width         { self.frame_width = v; }
        if let Some(v) = file.frame_height        { self.frame_height = v; }
        if let Some(v) = file.min_detection_score { self.min_detection_score = v; }
        if let Some(v) = file.sink                { self.sink = v; }
        if let Some(v) = file.midi_port           { self.midi_port = Some(v); }
        if let Some(v) = file.midi_channel        { self.midi_channel = v; }
        Ok(())
    }

    /// Apply `GESTURE_VOLUME__<FIELD>` overrides from `vars`.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else { continue };
            let bad = || SettingsError::Env { key: key.clone(), value: value.clone() };
            match field.to_ascii_lowercase().as_str() {
                "hold_secs"           => self.hold_secs = value.parse().map_err(|_| bad())?,
                "distance_min"        => self.distance_min = value.parse().map_err(|_| bad())?,
                "distance_max"        => self.distance_max = value.parse().map_err(|_| bad())?,
                "frame_width"         => self.frame_width = value.parse().map_err(|_| bad())?,
                "frame_height"        => self.frame_height = value.parse().map_err(|_| bad())?,
                "min_detection_score" => self.min_detection_score = value.parse().map_err(|_| bad())?,
                "sink"                => self.sink = value.parse().map_err(|_| bad())?,
                "midi_port"           => self.midi_port = Some(value.clone()),
                "midi_channel"        => self.midi_channel = value.parse().map_err(|_| bad())?,
                _ => tracing::warn!("ignoring unknown setting {}", key),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.hold_duration()?;
        if !(self.distance_min < self.distance_max) {
            return Err(SettingsError::Invalid(format!(
                "distance_min ({}) must be below distance_max ({})",
                self.distance_min, self.distance_max
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(SettingsError::Invalid("frame size must be non-zero".into()));
        }
        if self.midi_channel > 15 {
            return Err(SettingsError::Invalid(format!(
                "midi_channel must be 0–15, got {}", self.midi_channel
            )));
        }
        Ok(())
    }

    /// `hold_secs` as a duration; it must be positive and representable.
    pub fn hold_duration(&self) -> Result<Duration, SettingsError> {
        let invalid = || SettingsError::Invalid(format!(
            "hold_secs must be a positive number of seconds, got {}", self.hold_secs
        ));
        if !(self.hold_secs > 0.0) {
            return Err(invalid());
        }
        Duration::try_from_secs_f32(self.hold_secs).map_err(|_| invalid())
    }

    /// Unvalidated settings fall back to [`DEFAULT_HOLD`].
    pub fn hold_config(&self) -> HoldConfig {
        HoldConfig { threshold: self.hold_duration().unwrap_or(DEFAULT_HOLD) }
    }

    pub fn distance_range(&self) -> DistanceRange {
        DistanceRange::new(self.distance_min, self.distance_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.hold_config().threshold, Duration::from_secs(2));
        assert_eq!(s.distance_range(), DistanceRange::new(15.0, 200.0));
    }

    #[test]
    fn toml_overrides_defaults() {
        let mut s = Settings::default();
        s.apply_toml("hold_secs = 1.5\nsink = \"midi\"\nmidi_port = \"fluid\"\n", Path::new("t.toml"))
            .unwrap();
        assert_eq!(s.hold_secs, 1.5);
        assert_eq!(s.sink, SinkKind::Midi);
        assert_eq!(s.midi_port.as_deref(), Some("fluid"));
        assert_eq!(s.distance_max, 200.0);
    }

    #[test]
    fn toml_unknown_key_rejected() {
        let mut s = Settings::default();
        let err = s.apply_toml("volume_curve = 3\n", Path::new("t.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn env_overrides_and_ignores_foreign_keys() {
        let mut s = Settings::default();
        s.apply_env(env(&[
            ("GESTURE_VOLUME__HOLD_SECS", "3"),
            ("GESTURE_VOLUME__SINK", "log"),
            ("HOME", "/root"),
        ])).unwrap();
        assert_eq!(s.hold_secs, 3.0);
        assert_eq!(s.sink, SinkKind::Log);
    }

    #[test]
    fn env_bad_value_is_error() {
        let mut s = Settings::default();
        let err = s.apply_env(env(&[("GESTURE_VOLUME__FRAME_WIDTH", "wide")])).unwrap_err();
        assert!(matches!(err, SettingsError::Env { .. }));
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let s = Settings { hold_secs: 0.0, ..Settings::default() };
        assert!(s.validate().is_err());
        let s = Settings { hold_secs: f32::NAN, ..Settings::default() };
        assert!(s.validate().is_err());
        let s = Settings { distance_min: 200.0, distance_max: 15.0, ..Settings::default() };
        assert!(s.validate().is_err());
        let s = Settings { midi_channel: 16, ..Settings::default() };
        assert!(s.validate().is_err());
    }

    #[test]
    fn huge_hold_secs_rejected_without_panic() {
        let s = Settings { hold_secs: 1e30, ..Settings::default() };
        assert!(matches!(s.validate(), Err(SettingsError::Invalid(_))));
        assert!(s.hold_duration().is_err());
        assert_eq!(s.hold_config().threshold, DEFAULT_HOLD);

        let mut s = Settings::default();
        s.apply_env(env(&[("GESTURE_VOLUME__HOLD_SECS", "1e30")])).unwrap();
        assert!(s.validate().is_err());
    }

    #[test]
    fn hold_duration_matches_seconds() {
        let s = Settings { hold_secs: 0.5, ..Settings::default() };
        assert_eq!(s.hold_duration().unwrap(), Duration::from_millis(500));
        assert_eq!(s.hold_config().threshold, Duration::from_millis(500));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_environment_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("GESTURE_VOLUME__HOLD_SECS"), OsString::from("3")),
            (OsString::from("GESTURE_VOLUME__SINK"), OsString::from_vec(vec![0x6c, 0xff, 0x67])),
            (OsString::from_vec(vec![0xfe, 0x41]), OsString::from("x")),
        ];
        let mut s = Settings::default();
        s.apply_env(utf8_vars(vars)).unwrap();
        assert_eq!(s.hold_secs, 3.0);
        assert_eq!(s.sink, SinkKind::Auto);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/gesture_volume.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
