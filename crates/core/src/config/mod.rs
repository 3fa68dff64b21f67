//! Server and camera settings.
//!
//! The enumerations here are closed sets with canonical string tokens.
//! Parsing is total: an unknown token resolves to the default member
//! instead of failing, because the config file is hand-edited.
//!
//! | Token       | [`Resolution`]         | Size      |
//! |-------------|------------------------|-----------|
//! | `320x240`   | [`Resolution::Qvga`]    | 320×240   |
//! | `640x480`   | [`Resolution::Vga`]     | 640×480 (default) |
//! | `800x600`   | [`Resolution::Svga`]    | 800×600   |
//! | `1280x720`  | [`Resolution::Hd`]      | 1280×720  |
//! | `1280x960`  | [`Resolution::QuadVga`] | 1280×960  |
//! | `1920x1080` | [`Resolution::FullHd`]  | 1920×1080 |

pub mod loader;

use std::fmt;

use serde::{Serialize, Serializer};

pub const DEFAULT_MOUNT: &str = "camera1";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5600;
pub const DEFAULT_FRAMERATE: u32 = 15;
pub const DEFAULT_BITRATE_KBPS: u32 = 700;

/// Capture resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    Qvga,
    #[default]
    Vga,
    Svga,
    Hd,
    QuadVga,
    FullHd,
}

/// `(member, token, width, height)`: one row per member.
static RESOLUTIONS: [(Resolution, &str, u32, u32); 6] = [
    (Resolution::Qvga, "320x240", 320, 240),
    (Resolution::Vga, "640x480", 640, 480),
    (Resolution::Svga, "800x600", 800, 600),
    (Resolution::Hd, "1280x720", 1280, 720),
    (Resolution::QuadVga, "1280x960", 1280, 960),
    (Resolution::FullHd, "1920x1080", 1920, 1080),
];

impl Resolution {
    pub const ALL: [Resolution; 6] = [
        Resolution::Qvga,
        Resolution::Vga,
        Resolution::Svga,
        Resolution::Hd,
        Resolution::QuadVga,
        Resolution::FullHd,
    ];

    /// Parse a `WIDTHxHEIGHT` token. Unknown tokens yield [`Resolution::Vga`].
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        RESOLUTIONS
            .iter()
            .find(|(_, t, _, _)| *t == token)
            .map(|(r, _, _, _)| *r)
            .unwrap_or_default()
    }

    /// Canonical token, e.g. `"1280x720"`.
    pub fn as_token(self) -> &'static str {
        self.row().1
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        let row = self.row();
        (row.2, row.3)
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }

    fn row(self) -> &'static (Resolution, &'static str, u32, u32) {
        // Every member has a row; the index is the declaration order.
        &RESOLUTIONS[self as usize]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_token())
    }
}

/// Clockwise camera rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Parse `"0"`, `"90"`, `"180"` or `"270"`. Anything else yields [`Rotation::Deg0`].
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "90" => Rotation::Deg90,
            "180" => Rotation::Deg180,
            "270" => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    /// Map a degree value. Values outside the closed set yield [`Rotation::Deg0`].
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Rotation::Deg0 => "0",
            Rotation::Deg90 => "90",
            Rotation::Deg180 => "180",
            Rotation::Deg270 => "270",
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True for 90° and 270°, which swap the frame's orientation.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_token())
    }
}

/// How a quarter-turn rotation is framed downstream of the rotation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationFraming {
    /// Declare swapped dimensions (`height × width`) after rotating.
    #[default]
    Swap,
    /// Scale the rotated frame back into the configured size, adding borders.
    Letterbox,
}

impl RotationFraming {
    /// Parse `"swap"` or `"letterbox"`. Anything else yields [`RotationFraming::Swap`].
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "letterbox" => RotationFraming::Letterbox,
            _ => RotationFraming::Swap,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            RotationFraming::Swap => "swap",
            RotationFraming::Letterbox => "letterbox",
        }
    }
}

impl fmt::Display for RotationFraming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl Serialize for RotationFraming {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_token())
    }
}

/// Where the transport engine listens and which path it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSettings {
    /// Mount path token, without the leading `/`.
    #[serde(rename = "url")]
    pub path: String,
    /// Bind address (IP literal or hostname).
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_MOUNT.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Capture and encode settings for the single camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CameraConfig {
    pub resolution: Resolution,
    /// Requested frames per second. Platforms with sensor modes may clamp it.
    pub framerate: u32,
    /// Target encoder bitrate in kbit/s.
    pub bitrate: u32,
    pub rotation: Rotation,
    pub framing: RotationFraming,
    /// Use the platform's hardware H.264 encoder when it has one.
    pub hardware_encoder: bool,
}

impl CameraConfig {
    pub fn width(&self) -> u32 {
        self.resolution.width()
    }

    pub fn height(&self) -> u32 {
        self.resolution.height()
    }

    pub fn rotation_degrees(&self) -> u32 {
        self.rotation.degrees()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            framerate: DEFAULT_FRAMERATE,
            bitrate: DEFAULT_BITRATE_KBPS,
            rotation: Rotation::default(),
            framing: RotationFraming::default(),
            hardware_encoder: false,
        }
    }
}

/// Complete process configuration, laid out like the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    #[serde(rename = "rtsp")]
    pub server: ServerSettings,
    pub camera: CameraConfig,
}
