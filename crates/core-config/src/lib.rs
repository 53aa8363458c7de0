//! Runtime configuration loading (`palette-pins.toml`).
//!
//! Every field is optional and unknown fields are ignored so the file can
//! evolve without breaking older binaries. A missing or malformed file yields
//! defaults; configuration problems never stop the simulator from running.
//!
//! Runtime values are clamped into a usable range right after parsing and the
//! clamp is logged on target `config`. The raw file text is retained for
//! diagnostics.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "palette-pins";
const CONFIG_FILE: &str = "palette-pins.toml";
const SETTINGS_FILE: &str = "settings.json";

pub const MAX_SETTLE_FRAMES_LIMIT: u32 = 64;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Settings JSON file backing the preference store.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured path, else `<config_dir>/palette-pins/settings.json`.
    pub fn resolved_settings_path(&self) -> PathBuf {
        if let Some(path) = &self.settings_path {
            return path.clone();
        }
        match dirs::config_dir() {
            Some(dir) => dir.join(APP_DIR).join(SETTINGS_FILE),
            None => PathBuf::from(SETTINGS_FILE),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "RuntimeConfig::default_max_settle_frames")]
    pub max_settle_frames: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: Self::default_frame_interval_ms(),
            max_settle_frames: Self::default_max_settle_frames(),
        }
    }
}

impl RuntimeConfig {
    const fn default_frame_interval_ms() -> u64 {
        16 // one display frame at 60 Hz
    }
    const fn default_max_settle_frames() -> u32 {
        8
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,      // original file string (optional)
    pub source: Option<PathBuf>,  // file the values came from
    pub file: ConfigFile,         // parsed (or default) data, clamped
}

/// Best-effort config path: working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join(APP_DIR).join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    let mut cfg = match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Config {
            raw: Some(content),
            source: Some(path),
            file,
        },
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Config::default()
        }
    };
    cfg.clamp();
    Ok(cfg)
}

impl Config {
    pub fn runtime(&self) -> &RuntimeConfig {
        &self.file.runtime
    }

    pub fn settings_path(&self) -> PathBuf {
        self.file.storage.resolved_settings_path()
    }

    /// Pull runtime values into range. Returns `true` when anything changed.
    pub fn clamp(&mut self) -> bool {
        let rt = &mut self.file.runtime;
        let mut changed = false;
        let interval = rt.frame_interval_ms.max(1);
        if interval != rt.frame_interval_ms {
            info!(
                target: "config",
                raw = rt.frame_interval_ms,
                clamped = interval,
                "frame_interval_clamped"
            );
            rt.frame_interval_ms = interval;
            changed = true;
        }
        let settle = rt.max_settle_frames.clamp(1, MAX_SETTLE_FRAMES_LIMIT);
        if settle != rt.max_settle_frames {
            info!(
                target: "config",
                raw = rt.max_settle_frames,
                clamped = settle,
                max = MAX_SETTLE_FRAMES_LIMIT,
                "max_settle_frames_clamped"
            );
            rt.max_settle_frames = settle;
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), body).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.runtime().frame_interval_ms, 16);
        assert_eq!(cfg.runtime().max_settle_frames, 8);
        assert!(cfg.source.is_none());
    }

    #[test]
    fn parses_storage_and_runtime_sections() {
        let tmp = write_config(
            "[storage]\nsettings_path = \"/tmp/pp/settings.json\"\n[runtime]\nframe_interval_ms = 5\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.settings_path(), PathBuf::from("/tmp/pp/settings.json"));
        assert_eq!(cfg.runtime().frame_interval(), Duration::from_millis(5));
        assert_eq!(cfg.runtime().max_settle_frames, 8, "unset field keeps default");
        assert_eq!(cfg.source.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = write_config("[runtime\nframe_interval_ms = ");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let tmp = write_config("[runtime]\nmax_settle_frames = 3\nturbo = true\n[extra]\nx = 1\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.runtime().max_settle_frames, 3);
    }

    #[test]
    fn default_settings_path_lives_under_app_dir() {
        let path = StorageConfig::default().resolved_settings_path();
        assert!(path.ends_with("settings.json"));
        if dirs::config_dir().is_some() {
            assert!(path.parent().is_some_and(|p| p.ends_with(APP_DIR)));
        }
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let tmp = write_config("[runtime]\nframe_interval_ms = 0\nmax_settle_frames = 500\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf())).unwrap());

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("frame_interval_clamped"));
        assert!(log_output.contains("max_settle_frames_clamped"));
        assert_eq!(cfg.runtime().frame_interval_ms, 1);
        assert_eq!(cfg.runtime().max_settle_frames, MAX_SETTLE_FRAMES_LIMIT);
    }

    #[test]
    fn in_range_values_are_untouched() {
        let mut cfg = Config::default();
        assert!(!cfg.clamp());
        cfg.file.runtime.max_settle_frames = 0;
        assert!(cfg.clamp());
        assert_eq!(cfg.runtime().max_settle_frames, 1);
    }
}
