//! Error types for the camera stream launcher.

use std::path::PathBuf;

/// Errors that can occur while loading configuration or serving a stream.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Config**: [`ConfigRead`](Self::ConfigRead), [`ConfigParse`](Self::ConfigParse).
///   Only surfaced under [`LoadPolicy::Strict`](crate::config::loader::LoadPolicy::Strict).
/// - **Engine**: [`Engine`](Self::Engine), [`EngineUnavailable`](Self::EngineUnavailable),
///   [`EngineStopped`](Self::EngineStopped).
/// - **Output**: [`Io`](Self::Io), when the ready line cannot be written.
///
/// Platform detection and pipeline construction have no error path.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// Writing the ready line failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The transport engine rejected a bind, mount, start or serve call.
    #[error("transport engine error: {0}")]
    Engine(String),

    /// No transport engine was compiled into this binary.
    #[error("no transport engine available (rebuild with the `gstreamer` feature)")]
    EngineUnavailable,

    /// The engine's serve loop returned, which it never should.
    #[error("transport engine stopped serving")]
    EngineStopped,
}

/// Convenience alias for `Result<T, CameraError>`.
pub type Result<T> = std::result::Result<T, CameraError>;
