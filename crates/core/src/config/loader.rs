//! TOML configuration file loading.
//!
//! The file is user-edited, so every key is read on its own: a missing,
//! mistyped or out-of-range value falls back to that key's default
//! without affecting its neighbours.
//!
//! ```toml
//! [rtsp]
//! url = "camera1"
//! address = "0.0.0.0"
//! port = 5600
//!
//! [camera]
//! resolution = "640x480"
//! framerate = 15
//! bitrate = 700
//! rotation = "0"
//! framing = "swap"
//! hardware_encoder = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::config::{AppConfig, Resolution, Rotation, RotationFraming};
use crate::error::{CameraError, Result};

/// Directory under the user's local data directory holding `config.toml`.
pub const APP_DIR: &str = "rtsp-server";
pub const CONFIG_FILE: &str = "config.toml";

/// What to do when the config file is missing or is not valid TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Log the problem and continue with [`AppConfig::default`].
    #[default]
    Lenient,
    /// Return the error so the process can exit.
    Strict,
}

/// `$XDG_DATA_HOME/rtsp-server/config.toml`, else `$HOME/.local/share/rtsp-server/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".local").join("share"))
        })?;
    Some(data_home.join(APP_DIR).join(CONFIG_FILE))
}

/// Load the config file at `path` under the given policy.
pub fn load(path: &Path, policy: LoadPolicy) -> Result<AppConfig> {
    match read_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        Err(e) => match policy {
            LoadPolicy::Strict => Err(e),
            LoadPolicy::Lenient => {
                tracing::warn!(error = %e, "using default configuration");
                Ok(AppConfig::default())
            }
        },
    }
}

fn read_file(path: &Path) -> Result<AppConfig> {
    let text = fs::read_to_string(path).map_err(|source| CameraError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&text).map_err(|source| CameraError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse config text. Only a TOML syntax error fails; bad values fall back.
pub fn load_from_str(text: &str) -> std::result::Result<AppConfig, toml::de::Error> {
    let table: Table = toml::from_str(text)?;
    Ok(from_table(&table))
}

fn from_table(table: &Table) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(rtsp) = Section::find(table, "rtsp") {
        if let Some(path) = rtsp.string("url") {
            config.server.path = path;
        }
        if let Some(address) = rtsp.string("address") {
            config.server.address = address;
        }
        if let Some(port) = rtsp.port("port") {
            config.server.port = port;
        }
    }

    if let Some(camera) = Section::find(table, "camera") {
        let c = &mut config.camera;
        if let Some(token) = camera.string("resolution") {
            c.resolution = Resolution::parse(&token);
            tracing::info!(resolution = %c.resolution, "resolution set");
        }
        if let Some(framerate) = camera.positive("framerate") {
            c.framerate = framerate;
            tracing::info!(framerate, "framerate set");
        }
        if let Some(bitrate) = camera.positive("bitrate") {
            c.bitrate = bitrate;
            tracing::info!(bitrate, "bitrate set");
        }
        if let Some(rotation) = camera.rotation("rotation") {
            c.rotation = rotation;
            tracing::info!(degrees = rotation.degrees(), "rotation set");
        }
        if let Some(token) = camera.string("framing") {
            c.framing = RotationFraming::parse(&token);
        }
        if let Some(enabled) = camera.boolean("hardware_encoder") {
            c.hardware_encoder = enabled;
        }
    }

    config
}

/// A top-level table of the config file, named for diagnostics.
#[derive(Debug, Clone, Copy)]
struct Section<'a> {
    name: &'a str,
    table: &'a Table,
}

impl<'a> Section<'a> {
    fn find(root: &'a Table, name: &'a str) -> Option<Self> {
        match root.get(name)? {
            Value::Table(table) => Some(Self { name, table }),
            other => {
                tracing::warn!(
                    section = name,
                    found = other.type_str(),
                    "expected a table, ignoring"
                );
                None
            }
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.table.get(key)
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            other => {
                tracing::warn!(
                    section = self.name,
                    key,
                    found = %other,
                    "expected a non-empty string, using default"
                );
                None
            }
        }
    }

    fn port(&self, key: &str) -> Option<u16> {
        let port = match self.get(key)? {
            Value::Integer(i) => u16::try_from(*i).ok(),
            Value::String(s) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        match port {
            Some(p) if p != 0 => Some(p),
            _ => {
                tracing::warn!(
                    section = self.name,
                    key,
                    "expected a port in 1-65535, using default"
                );
                None
            }
        }
    }

    fn positive(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            Value::Integer(i) if *i > 0 => u32::try_from(*i).ok().or_else(|| {
                tracing::warn!(
                    section = self.name,
                    key,
                    value = i,
                    "value too large, using default"
                );
                None
            }),
            other => {
                tracing::warn!(
                    section = self.name,
                    key,
                    found = %other,
                    "expected a positive integer, using default"
                );
                None
            }
        }
    }

    fn rotation(&self, key: &str) -> Option<Rotation> {
        match self.get(key)? {
            Value::String(s) => Some(Rotation::parse(s)),
            Value::Integer(i) => Some(Rotation::from_degrees(*i)),
            other => {
                tracing::warn!(
                    section = self.name,
                    key,
                    found = %other,
                    "expected a rotation token, using default"
                );
                None
            }
        }
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Boolean(b) => Some(*b),
            other => {
                tracing::warn!(
                    section = self.name,
                    key,
                    found = %other,
                    "expected a boolean, using default"
                );
                None
            }
        }
    }
}
