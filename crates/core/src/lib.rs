pub mod config;
pub mod error;
pub mod launcher;
pub mod pipeline;
pub mod platform;

pub use config::{AppConfig, CameraConfig, Resolution, Rotation, RotationFraming, ServerSettings};
pub use error::{CameraError, Result};
pub use launcher::{NoEngine, TransportEngine, launch, launch_to, mount_path, stream_url};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineDescription, Stage, build};
pub use platform::{FileIdentity, HostIdentity, Platform, PlatformDetector, UnameIdentity};
