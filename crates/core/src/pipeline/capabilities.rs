//! Per-platform capability descriptors.
//!
//! Every platform is served by the same construction strategy; what
//! differs is captured here: the capture element, whether the converter
//! can rotate natively, the camera's sensor modes, and which hardware
//! encoder (if any) is available.

use crate::config::Rotation;
use crate::pipeline::Element;
use crate::platform::Platform;

pub const NVMM: &str = "memory:NVMM";

/// A discrete sensor configuration supported by the camera ISP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorMode {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub max_framerate: u32,
}

impl SensorMode {
    pub const fn new(index: u32, width: u32, height: u32, max_framerate: u32) -> Self {
        Self {
            index,
            width,
            height,
            max_framerate,
        }
    }
}

/// Sensor modes keyed by exact `(width, height)`, plus the mode used when
/// no entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorModes {
    pub table: &'static [SensorMode],
    pub fallback: SensorMode,
}

impl SensorModes {
    pub fn select(&self, width: u32, height: u32) -> SensorMode {
        self.table
            .iter()
            .copied()
            .find(|m| m.width == width && m.height == height)
            .unwrap_or(self.fallback)
    }
}

/// Sony IMX219 modes as exposed by `nvarguscamerasrc`.
pub const IMX219_MODES: &[SensorMode] = &[
    SensorMode::new(0, 3264, 2464, 21),
    SensorMode::new(1, 3264, 1848, 28),
    SensorMode::new(2, 1920, 1080, 30),
    SensorMode::new(3, 1640, 1232, 30),
    SensorMode::new(4, 1280, 720, 60),
];

/// Full field of view, binned; the ISP scales to the requested size.
pub const IMX219_FALLBACK: SensorMode = SensorMode::new(3, 1640, 1232, 30);

/// H.264 encoder choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// `x264enc`, available everywhere.
    X264,
    /// Jetson `nvv4l2h264enc`; consumes NVMM buffers.
    NvV4l2H264,
    /// Raspberry Pi `v4l2h264enc`.
    V4l2H264,
}

impl Encoder {
    pub fn name(self) -> &'static str {
        match self {
            Encoder::X264 => "x264enc",
            Encoder::NvV4l2H264 => "nvv4l2h264enc",
            Encoder::V4l2H264 => "v4l2h264enc",
        }
    }

    /// Caps memory feature the encoder's sink pad requires.
    pub fn input_memory(self) -> Option<&'static str> {
        match self {
            Encoder::NvV4l2H264 => Some(NVMM),
            Encoder::X264 | Encoder::V4l2H264 => None,
        }
    }

    /// Low-latency configuration: `bitrate_kbps` target, one keyframe every
    /// `keyframe_interval` frames.
    pub fn element(self, bitrate_kbps: u32, keyframe_interval: u32) -> Element {
        let bps = u64::from(bitrate_kbps) * 1000;
        match self {
            Encoder::X264 => Element::new(self.name())
                .param("bitrate", bitrate_kbps)
                .param("key-int-max", keyframe_interval)
                .param("tune", "zerolatency")
                .param("speed-preset", "ultrafast"),
            Encoder::NvV4l2H264 => Element::new(self.name())
                .param("bitrate", bps)
                .param("iframeinterval", keyframe_interval)
                .param("idrinterval", keyframe_interval)
                .param("preset-level", 1)
                .param("insert-sps-pps", true)
                .param("maxperf-enable", true),
            Encoder::V4l2H264 => Element::new(self.name()).param(
                "extra-controls",
                format!(
                    "controls,video_bitrate={bps},h264_i_frame_period={keyframe_interval},repeat_sequence_header=1"
                ),
            ),
        }
    }
}

/// What a platform's camera stack can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub source: &'static str,
    pub source_params: &'static [(&'static str, &'static str)],
    /// Caps memory feature of the capture output.
    pub capture_memory: Option<&'static str>,
    /// Raw format pinned on the capture caps.
    pub capture_format: Option<&'static str>,
    /// Colorspace converter following the capture caps.
    pub converter: &'static str,
    /// Converter property that rotates in hardware, if any.
    pub native_rotation: Option<&'static str>,
    pub sensor_modes: Option<SensorModes>,
    pub hardware_encoder: Option<Encoder>,
}

impl Capabilities {
    pub const GENERIC: Capabilities = Capabilities {
        source: "videotestsrc",
        source_params: &[("pattern", "ball"), ("is-live", "true")],
        capture_memory: None,
        capture_format: None,
        converter: "videoconvert",
        native_rotation: None,
        sensor_modes: None,
        hardware_encoder: None,
    };

    pub const RASPBERRY_PI: Capabilities = Capabilities {
        source: "libcamerasrc",
        source_params: &[],
        capture_memory: None,
        capture_format: None,
        converter: "videoconvert",
        native_rotation: None,
        sensor_modes: None,
        hardware_encoder: Some(Encoder::V4l2H264),
    };

    pub const JETSON: Capabilities = Capabilities {
        source: "nvarguscamerasrc",
        source_params: &[],
        capture_memory: Some(NVMM),
        capture_format: Some("NV12"),
        converter: "nvvidconv",
        native_rotation: Some("flip-method"),
        sensor_modes: Some(SensorModes {
            table: IMX219_MODES,
            fallback: IMX219_FALLBACK,
        }),
        hardware_encoder: Some(Encoder::NvV4l2H264),
    };

    pub fn for_platform(platform: Platform) -> Capabilities {
        match platform {
            Platform::Generic => Self::GENERIC,
            Platform::RaspberryPi => Self::RASPBERRY_PI,
            Platform::Jetson => Self::JETSON,
        }
    }

    /// Encoder to use, honouring a hardware request only where one exists.
    pub fn encoder(&self, prefer_hardware: bool) -> Encoder {
        match self.hardware_encoder {
            Some(hw) if prefer_hardware => hw,
            _ => Encoder::X264,
        }
    }
}

/// Rotation method nick shared by `videoflip` and `nvvidconv`.
pub fn rotation_method(rotation: Rotation) -> &'static str {
    match rotation {
        Rotation::Deg0 => "none",
        Rotation::Deg90 => "clockwise",
        Rotation::Deg180 => "rotate-180",
        Rotation::Deg270 => "counterclockwise",
    }
}
