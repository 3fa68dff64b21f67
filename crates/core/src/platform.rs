//! Host platform detection.
//!
//! The host identification string (by default the output of `uname -a`)
//! is matched against known kernel markers in a fixed priority order:
//!
//! | Marker  | Platform                     |
//! |---------|------------------------------|
//! | `tegra` | [`Platform::Jetson`]         |
//! | `rpi`   | [`Platform::RaspberryPi`]    |
//! | —       | [`Platform::Generic`]        |
//!
//! Detection never fails. If the identification query cannot run, the
//! host is treated as a generic desktop so the stream still starts.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;
use std::sync::OnceLock;

/// Hardware family the pipeline is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    /// Desktop or server without a known camera stack. Uses a test source.
    #[default]
    Generic,
    /// Raspberry Pi with the libcamera stack.
    RaspberryPi,
    /// NVIDIA Jetson with the Argus camera stack.
    Jetson,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Generic, Platform::RaspberryPi, Platform::Jetson];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Generic => "generic",
            Platform::RaspberryPi => "pi",
            Platform::Jetson => "jetson",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "desktop" => Ok(Platform::Generic),
            "pi" | "rpi" | "raspberry-pi" => Ok(Platform::RaspberryPi),
            "jetson" | "tegra" => Ok(Platform::Jetson),
            other => Err(format!(
                "unknown platform '{other}' (expected generic, pi or jetson)"
            )),
        }
    }
}

/// Source of the host identification string.
pub trait HostIdentity {
    fn identify(&self) -> io::Result<String>;
}

/// Runs `uname -a`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnameIdentity;

impl HostIdentity for UnameIdentity {
    fn identify(&self) -> io::Result<String> {
        let output = Command::new("uname").arg("-a").output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!("uname exited with {}", output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reads an identification file such as `/proc/version`.
#[derive(Debug, Clone)]
pub struct FileIdentity(pub PathBuf);

impl HostIdentity for FileIdentity {
    fn identify(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.0)
    }
}

/// Classify an identification string. Matching is case-sensitive.
pub fn classify(ident: &str) -> Platform {
    if ident.contains("tegra") {
        Platform::Jetson
    } else if ident.contains("rpi") {
        Platform::RaspberryPi
    } else {
        Platform::Generic
    }
}

/// Detects the platform once and remembers the answer.
pub struct PlatformDetector<I> {
    identity: I,
    detected: OnceLock<Platform>,
}

impl PlatformDetector<UnameIdentity> {
    pub fn uname() -> Self {
        Self::new(UnameIdentity)
    }
}

impl<I: HostIdentity> PlatformDetector<I> {
    pub fn new(identity: I) -> Self {
        Self {
            identity,
            detected: OnceLock::new(),
        }
    }

    /// The host platform. The identification query runs on the first call only.
    pub fn detect(&self) -> Platform {
        *self.detected.get_or_init(|| {
            let platform = match self.identity.identify() {
                Ok(ident) => {
                    tracing::debug!(ident = ident.trim(), "host identification");
                    classify(&ident)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "host identification failed, assuming generic platform");
                    Platform::Generic
                }
            };
            tracing::info!(%platform, "platform detected");
            platform
        })
    }
}
