use crate::config::{CameraConfig, Rotation, RotationFraming};
use crate::pipeline::capabilities::rotation_method;
use crate::pipeline::{Capabilities, Caps, Element, Pipeline, PipelineDescription};
use crate::platform::Platform;

/// Raw format every encoder is fed, regardless of the capture format.
pub const ENCODER_INPUT_FORMAT: &str = "I420";
/// RTP payload size, below a 1500-byte Ethernet MTU with headroom for tunnels.
pub const PAYLOAD_MTU: u32 = 1400;
pub const PAYLOAD_TYPE: u8 = 96;
/// Name the RTSP media factory looks for on the payloader.
pub const PAYLOADER_NAME: &str = "pay0";
/// Pixel aspect ratio pinned around `videoscale`, so it pads instead of stretching.
pub const SQUARE_PIXELS: &str = "1/1";

/// Builds pipelines from a platform → capabilities table.
///
/// The table is fixed at construction; building is pure, so the same
/// `(platform, camera)` always yields the same description.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    table: [Capabilities; 3],
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            table: Platform::ALL.map(Capabilities::for_platform),
        }
    }

    /// Replace the descriptor for one platform (e.g. a board with a different sensor).
    pub fn with_capabilities(mut self, platform: Platform, capabilities: Capabilities) -> Self {
        self.table[slot(platform)] = capabilities;
        self
    }

    pub fn capabilities(&self, platform: Platform) -> &Capabilities {
        &self.table[slot(platform)]
    }

    pub fn build(&self, platform: Platform, camera: &CameraConfig) -> PipelineDescription {
        let description = self.compose(platform, camera).render();
        tracing::debug!(%platform, pipeline = %description, "pipeline built");
        description
    }

    /// Compose the stage list for `camera` on `platform`.
    pub fn compose(&self, platform: Platform, camera: &CameraConfig) -> Pipeline {
        let caps = self.capabilities(platform);
        let (width, height) = camera.resolution.dimensions();
        let rotation = camera.rotation;
        let mut framerate = camera.framerate.max(1);
        let mut pipeline = Pipeline::new();

        let mut source = Element::new(caps.source);
        for (key, value) in caps.source_params {
            source = source.param(key, value);
        }
        if let Some(modes) = &caps.sensor_modes {
            let mode = modes.select(width, height);
            if framerate > mode.max_framerate {
                tracing::info!(
                    requested = framerate,
                    max = mode.max_framerate,
                    sensor_mode = mode.index,
                    "framerate clamped to sensor mode limit"
                );
                framerate = mode.max_framerate;
            }
            source = source.param("sensor-mode", mode.index);
        }
        pipeline.push(source);

        let mut capture = Caps::raw(caps.capture_memory)
            .field("width", width)
            .field("height", height)
            .field("framerate", format!("{framerate}/1"));
        if let Some(format) = caps.capture_format {
            capture = capture.field("format", format);
        }
        pipeline.push(capture);

        let native = caps.native_rotation.filter(|_| rotation != Rotation::Deg0);
        let mut converter = Element::new(caps.converter);
        if let Some(property) = native {
            converter = converter.param(property, rotation_method(rotation));
        }
        pipeline.push(converter);

        // Stages that only handle system memory.
        let mut software_stages = false;
        if rotation != Rotation::Deg0 && native.is_none() {
            pipeline.push(Element::new("videoflip").param("method", rotation_method(rotation)));
            software_stages = true;
        }

        let (mut out_width, mut out_height) = (width, height);
        let mut letterboxed = false;
        if rotation.is_quarter_turn() {
            (out_width, out_height) = (height, width);
            if camera.framing == RotationFraming::Letterbox {
                pipeline.push(
                    Caps::raw(None)
                        .field("width", out_width)
                        .field("height", out_height)
                        .field("pixel-aspect-ratio", SQUARE_PIXELS),
                );
                pipeline.push(Element::new("videoscale").param("add-borders", true));
                software_stages = true;
                letterboxed = true;
                (out_width, out_height) = (width, height);
            }
        }

        let encoder = caps.encoder(camera.hardware_encoder);
        if camera.hardware_encoder && caps.hardware_encoder.is_none() {
            tracing::debug!(%platform, "no hardware encoder on this platform, using x264enc");
        }
        if software_stages && encoder.input_memory().is_some() {
            pipeline.push(Element::new(caps.converter));
        }

        let mut normalized = Caps::raw(encoder.input_memory())
            .field("format", ENCODER_INPUT_FORMAT)
            .field("width", out_width)
            .field("height", out_height);
        if letterboxed {
            normalized = normalized.field("pixel-aspect-ratio", SQUARE_PIXELS);
        }
        pipeline.push(normalized);

        // One keyframe per second at the negotiated framerate.
        pipeline.push(encoder.element(camera.bitrate.max(1), framerate));
        pipeline.push(Caps::new("video/x-h264").field("stream-format", "byte-stream"));
        pipeline.push(
            Element::new("rtph264pay")
                .param("config-interval", 1)
                .param("mtu", PAYLOAD_MTU)
                .param("name", PAYLOADER_NAME)
                .param("pt", PAYLOAD_TYPE),
        );

        pipeline
    }
}

fn slot(platform: Platform) -> usize {
    match platform {
        Platform::Generic => 0,
        Platform::RaspberryPi => 1,
        Platform::Jetson => 2,
    }
}

/// Build with the default capabilities table.
pub fn build(platform: Platform, camera: &CameraConfig) -> PipelineDescription {
    PipelineBuilder::new().build(platform, camera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;
    use crate::pipeline::capabilities::{SensorMode, SensorModes};

    fn camera(resolution: Resolution, framerate: u32, rotation: Rotation) -> CameraConfig {
        CameraConfig {
            resolution,
            framerate,
            rotation,
            ..CameraConfig::default()
        }
    }

    fn names(p: &Pipeline) -> Vec<&str> {
        p.stages().iter().map(|s| s.name()).collect()
    }

    /// The caps feeding the encoder.
    fn encoder_input(p: &Pipeline) -> &Caps {
        p.caps()
            .filter(|c| c.get("format") == Some(ENCODER_INPUT_FORMAT))
            .last()
            .unwrap()
    }

    #[test]
    fn table_matches_platforms() {
        let builder = PipelineBuilder::new();
        for platform in Platform::ALL {
            assert_eq!(
                *builder.capabilities(platform),
                Capabilities::for_platform(platform)
            );
        }
    }

    #[test]
    fn generic_default_stage_order() {
        let p = PipelineBuilder::new().compose(Platform::Generic, &CameraConfig::default());
        assert_eq!(
            names(&p),
            [
                "videotestsrc",
                "video/x-raw",
                "videoconvert",
                "video/x-raw",
                "x264enc",
                "video/x-h264",
                "rtph264pay",
            ]
        );
    }

    #[test]
    fn generic_rendered_default() {
        let description = build(Platform::Generic, &CameraConfig::default());
        assert_eq!(
            description.as_str(),
            "( videotestsrc pattern=ball is-live=true \
             ! video/x-raw,width=640,height=480,framerate=15/1 \
             ! videoconvert \
             ! video/x-raw,format=I420,width=640,height=480 \
             ! x264enc bitrate=700 key-int-max=15 tune=zerolatency speed-preset=ultrafast \
             ! video/x-h264,stream-format=byte-stream \
             ! rtph264pay config-interval=1 mtu=1400 name=pay0 pt=96 )"
        );
    }

    #[test]
    fn generic_ignores_camera_settings_for_source() {
        for resolution in Resolution::ALL {
            for rotation in Rotation::ALL {
                let cfg = CameraConfig {
                    hardware_encoder: true,
                    ..camera(resolution, 60, rotation)
                };
                let p = PipelineBuilder::new().compose(Platform::Generic, &cfg);
                assert_eq!(p.stages()[0].name(), "videotestsrc");
                assert!(p.element("libcamerasrc").is_none());
                assert!(p.element("nvarguscamerasrc").is_none());
                assert!(p.element("x264enc").is_some());
            }
        }
    }

    #[test]
    fn generic_does_not_clamp_framerate() {
        let p = PipelineBuilder::new().compose(
            Platform::Generic,
            &camera(Resolution::FullHd, 60, Rotation::Deg0),
        );
        assert_eq!(p.caps().next().unwrap().get("framerate"), Some("60/1"));
        assert_eq!(p.element("x264enc").unwrap().get("key-int-max"), Some("60"));
    }

    #[test]
    fn jetson_clamps_to_sensor_mode() {
        let p = PipelineBuilder::new().compose(
            Platform::Jetson,
            &camera(Resolution::FullHd, 60, Rotation::Deg0),
        );
        let source = p.element("nvarguscamerasrc").unwrap();
        assert_eq!(source.get("sensor-mode"), Some("2"));
        let capture = p.caps().next().unwrap();
        assert_eq!(capture.memory.as_deref(), Some("memory:NVMM"));
        assert_eq!(capture.get("framerate"), Some("30/1"));
        assert_eq!(p.element("x264enc").unwrap().get("key-int-max"), Some("30"));
    }

    #[test]
    fn jetson_never_raises_framerate() {
        let p = PipelineBuilder::new().compose(
            Platform::Jetson,
            &camera(Resolution::Hd, 15, Rotation::Deg0),
        );
        assert_eq!(p.element("nvarguscamerasrc").unwrap().get("sensor-mode"), Some("4"));
        assert_eq!(p.caps().next().unwrap().get("framerate"), Some("15/1"));
    }

    #[test]
    fn jetson_unmatched_size_uses_fallback_mode() {
        let p = PipelineBuilder::new().compose(
            Platform::Jetson,
            &camera(Resolution::Vga, 90, Rotation::Deg0),
        );
        assert_eq!(p.element("nvarguscamerasrc").unwrap().get("sensor-mode"), Some("3"));
        let capture = p.caps().next().unwrap();
        assert_eq!(capture.dimensions(), Some((640, 480)));
        assert_eq!(capture.get("framerate"), Some("30/1"));
    }

    #[test]
    fn jetson_framerate_within_cap_for_every_resolution() {
        let modes = Capabilities::JETSON.sensor_modes.unwrap();
        for resolution in Resolution::ALL {
            let (w, h) = resolution.dimensions();
            let cap = modes.select(w, h).max_framerate;
            let p = PipelineBuilder::new()
                .compose(Platform::Jetson, &camera(resolution, 240, Rotation::Deg0));
            let framerate = p.caps().next().unwrap().get("framerate").unwrap();
            let fps: u32 = framerate.trim_end_matches("/1").parse().unwrap();
            assert!(fps <= cap, "{resolution}: {fps} > {cap}");
        }
    }

    #[test]
    fn jetson_rotates_natively() {
        let p = PipelineBuilder::new().compose(
            Platform::Jetson,
            &camera(Resolution::FullHd, 30, Rotation::Deg90),
        );
        assert_eq!(p.element("nvvidconv").unwrap().get("flip-method"), Some("clockwise"));
        assert!(p.element("videoflip").is_none());
        assert_eq!(encoder_input(&p).dimensions(), Some((1080, 1920)));
    }

    #[test]
    fn jetson_no_rotation_has_no_flip_method() {
        let p = PipelineBuilder::new().compose(Platform::Jetson, &CameraConfig::default());
        assert_eq!(p.element("nvvidconv").unwrap().get("flip-method"), None);
    }

    #[test]
    fn pi_rotates_in_software() {
        let p = PipelineBuilder::new().compose(
            Platform::RaspberryPi,
            &camera(Resolution::Hd, 30, Rotation::Deg270),
        );
        assert_eq!(p.stages()[0].name(), "libcamerasrc");
        let flip = p.element("videoflip").unwrap();
        assert_eq!(flip.get("method"), Some("counterclockwise"));
        assert!(p.position("videoconvert").unwrap() < p.position("videoflip").unwrap());
        assert_eq!(encoder_input(&p).dimensions(), Some((720, 1280)));
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let p = PipelineBuilder::new().compose(
            Platform::Generic,
            &camera(Resolution::Svga, 15, Rotation::Deg180),
        );
        assert_eq!(p.element("videoflip").unwrap().get("method"), Some("rotate-180"));
        assert_eq!(encoder_input(&p).dimensions(), Some((800, 600)));
    }

    #[test]
    fn no_rotation_means_no_flip_stage() {
        for platform in Platform::ALL {
            let p = PipelineBuilder::new().compose(platform, &CameraConfig::default());
            assert!(p.element("videoflip").is_none());
            assert!(p.element("videoscale").is_none());
        }
    }

    #[test]
    fn letterbox_restores_configured_size() {
        let cfg = CameraConfig {
            framing: RotationFraming::Letterbox,
            ..camera(Resolution::Hd, 30, Rotation::Deg90)
        };
        let p = PipelineBuilder::new().compose(Platform::Generic, &cfg);
        let flip = p.position("videoflip").unwrap();
        let rotated = p.stages()[flip + 1].as_caps().unwrap();
        assert_eq!(rotated.dimensions(), Some((720, 1280)));
        assert_eq!(
            p.stages()[flip + 2].as_element().unwrap().get("add-borders"),
            Some("true")
        );
        assert_eq!(encoder_input(&p).dimensions(), Some((1280, 720)));
    }

    #[test]
    fn letterbox_pins_square_pixels_around_scaler() {
        for platform in Platform::ALL {
            let cfg = CameraConfig {
                framing: RotationFraming::Letterbox,
                ..camera(Resolution::Hd, 30, Rotation::Deg90)
            };
            let p = PipelineBuilder::new().compose(platform, &cfg);
            let scale = p.position("videoscale").unwrap();
            let before = p.stages()[scale - 1].as_caps().unwrap();
            assert_eq!(before.get("pixel-aspect-ratio"), Some("1/1"), "{platform}");
            assert_eq!(encoder_input(&p).get("pixel-aspect-ratio"), Some("1/1"), "{platform}");
        }

        let description = build(
            Platform::Generic,
            &CameraConfig {
                framing: RotationFraming::Letterbox,
                ..camera(Resolution::Hd, 30, Rotation::Deg90)
            },
        );
        assert!(
            description.as_str().contains(
                "! videoscale add-borders=true \
                 ! video/x-raw,format=I420,width=1280,height=720,pixel-aspect-ratio=1/1 !"
            ),
            "{description}"
        );
    }

    #[test]
    fn swap_leaves_pixel_aspect_open() {
        let p = PipelineBuilder::new().compose(
            Platform::Generic,
            &camera(Resolution::Hd, 30, Rotation::Deg90),
        );
        assert!(p.caps().all(|c| c.get("pixel-aspect-ratio").is_none()));
    }

    #[test]
    fn letterbox_on_jetson_hardware_encoder_uploads_back_to_nvmm() {
        let cfg = CameraConfig {
            framing: RotationFraming::Letterbox,
            hardware_encoder: true,
            ..camera(Resolution::FullHd, 30, Rotation::Deg270)
        };
        let p = PipelineBuilder::new().compose(Platform::Jetson, &cfg);
        let scale = p.position("videoscale").unwrap();
        assert_eq!(p.stages()[scale + 1].name(), "nvvidconv");
        let input = encoder_input(&p);
        assert_eq!(input.memory.as_deref(), Some("memory:NVMM"));
        assert_eq!(input.dimensions(), Some((1920, 1080)));
        assert!(p.element("nvv4l2h264enc").is_some());
    }

    #[test]
    fn jetson_hardware_encoder_swap_stays_in_nvmm() {
        let cfg = CameraConfig {
            hardware_encoder: true,
            ..camera(Resolution::FullHd, 30, Rotation::Deg90)
        };
        let p = PipelineBuilder::new().compose(Platform::Jetson, &cfg);
        assert_eq!(p.elements().filter(|e| e.name == "nvvidconv").count(), 1);
        let input = encoder_input(&p);
        assert_eq!(input.memory.as_deref(), Some("memory:NVMM"));
        assert_eq!(input.dimensions(), Some((1080, 1920)));
        assert_eq!(p.element("nvv4l2h264enc").unwrap().get("bitrate"), Some("700000"));
    }

    #[test]
    fn pi_hardware_encoder_opt_in() {
        let cfg = CameraConfig {
            hardware_encoder: true,
            ..CameraConfig::default()
        };
        let p = PipelineBuilder::new().compose(Platform::RaspberryPi, &cfg);
        assert!(p.element("v4l2h264enc").is_some());
        assert!(p.element("x264enc").is_none());
        assert_eq!(encoder_input(&p).memory, None);
    }

    #[test]
    fn quarter_turn_caps_are_self_consistent() {
        for platform in Platform::ALL {
            for framing in [RotationFraming::Swap, RotationFraming::Letterbox] {
                for rotation in [Rotation::Deg90, Rotation::Deg270] {
                    let cfg = CameraConfig {
                        framing,
                        ..camera(Resolution::Hd, 30, rotation)
                    };
                    let p = PipelineBuilder::new().compose(platform, &cfg);
                    let expected = match framing {
                        RotationFraming::Swap => (720, 1280),
                        RotationFraming::Letterbox => (1280, 720),
                    };
                    assert_eq!(
                        encoder_input(&p).dimensions(),
                        Some(expected),
                        "{platform} {framing}"
                    );

                    // Every caps declared after the rotation stage has
                    // portrait dimensions unless a scaler follows it.
                    let rotate_at = p
                        .position("videoflip")
                        .or_else(|| p.position("nvvidconv"))
                        .unwrap();
                    let scale_at = p.position("videoscale");
                    for (i, stage) in p.stages().iter().enumerate().skip(rotate_at + 1) {
                        let Some((w, h)) = stage.as_caps().and_then(Caps::dimensions) else {
                            continue;
                        };
                        if scale_at.is_some_and(|s| i > s) {
                            assert_eq!((w, h), (1280, 720));
                        } else {
                            assert_eq!((w, h), (720, 1280));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn encode_and_payload_stages() {
        let cfg = CameraConfig {
            bitrate: 2500,
            ..CameraConfig::default()
        };
        for platform in Platform::ALL {
            let p = PipelineBuilder::new().compose(platform, &cfg);
            let last = p.stages().last().unwrap().as_element().unwrap();
            assert_eq!(last.name, "rtph264pay");
            assert_eq!(last.get("name"), Some("pay0"));
            assert_eq!(last.get("config-interval"), Some("1"));
            assert_eq!(last.get("mtu"), Some("1400"));
            assert_eq!(p.element("x264enc").unwrap().get("bitrate"), Some("2500"));

            let encoder_at = p.position("x264enc").unwrap();
            assert_eq!(p.stages()[encoder_at - 1].as_caps().unwrap().get("format"), Some("I420"));
        }
    }

    #[test]
    fn build_is_idempotent() {
        let builder = PipelineBuilder::new();
        for platform in Platform::ALL {
            for rotation in Rotation::ALL {
                let cfg = camera(Resolution::FullHd, 60, rotation);
                assert_eq!(builder.build(platform, &cfg), builder.build(platform, &cfg));
                assert_eq!(builder.build(platform, &cfg), build(platform, &cfg));
            }
        }
    }

    #[test]
    fn custom_sensor_table() {
        const MODES: &[SensorMode] = &[SensorMode::new(0, 1920, 1080, 60)];
        let caps = Capabilities {
            sensor_modes: Some(SensorModes {
                table: MODES,
                fallback: SensorMode::new(0, 1920, 1080, 60),
            }),
            ..Capabilities::JETSON
        };
        let builder = PipelineBuilder::new().with_capabilities(Platform::Jetson, caps);
        let p = builder.compose(Platform::Jetson, &camera(Resolution::FullHd, 60, Rotation::Deg0));
        assert_eq!(p.caps().next().unwrap().get("framerate"), Some("60/1"));
    }

    #[test]
    fn zero_framerate_and_bitrate_are_floored() {
        let cfg = CameraConfig {
            framerate: 0,
            bitrate: 0,
            ..CameraConfig::default()
        };
        let p = PipelineBuilder::new().compose(Platform::Generic, &cfg);
        assert_eq!(p.caps().next().unwrap().get("framerate"), Some("1/1"));
        assert_eq!(p.element("x264enc").unwrap().get("bitrate"), Some("1"));
    }
}
