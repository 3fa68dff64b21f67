//! GStreamer RTSP server engine.
//!
//! Implements [`TransportEngine`] on top of `gst-rtsp-server`: the launch
//! description is handed to a shared `RTSPMediaFactory`, so every client
//! session is served from one camera pipeline.
//!
//! ## Usage
//!
//! ```no_run
//! use rtsp_camera::{AppConfig, Platform, build, launch};
//! use rtsp_camera_gst::GstRtspEngine;
//!
//! let config = AppConfig::default();
//! let pipeline = build(Platform::Generic, &config.camera);
//! let engine = GstRtspEngine::new()?;
//! launch(engine, &config.server, &pipeline)?;
//! # Ok::<(), rtsp_camera::CameraError>(())
//! ```

use std::convert::Infallible;
use std::sync::LazyLock;

use gst::glib;
use gst_rtsp_server::prelude::*;
use gst_rtsp_server::{RTSPMediaFactory, RTSPServer};

use rtsp_camera::{CameraError, PipelineDescription, Result, TransportEngine};

static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "rtspcamera",
        gst::DebugColorFlags::empty(),
        Some("RTSP camera launcher"),
    )
});

pub struct GstRtspEngine {
    server: RTSPServer,
    source: Option<glib::SourceId>,
}

impl GstRtspEngine {
    /// Initialize GStreamer and create an unbound server.
    pub fn new() -> Result<Self> {
        gst::init().map_err(|e| CameraError::Engine(format!("GStreamer init failed: {e}")))?;
        Ok(Self {
            server: RTSPServer::new(),
            source: None,
        })
    }
}

impl TransportEngine for GstRtspEngine {
    fn bind(&mut self, address: &str, port: u16) -> Result<()> {
        self.server.set_address(address);
        self.server.set_service(&port.to_string());
        gst::debug!(CAT, "bound to {}:{}", address, port);
        Ok(())
    }

    fn mount(&mut self, path: &str, pipeline: &PipelineDescription) -> Result<()> {
        let mounts = self
            .server
            .mount_points()
            .ok_or_else(|| CameraError::Engine("server has no mount points".to_string()))?;

        let factory = RTSPMediaFactory::new();
        factory.set_launch(pipeline.as_str());
        factory.set_shared(true);
        mounts.add_factory(path, factory);

        gst::info!(CAT, "mounted {}: {}", path, pipeline);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let source = self
            .server
            .attach(None)
            .map_err(|e| CameraError::Engine(format!("failed to attach RTSP server: {e}")))?;
        self.source = Some(source);

        tracing::info!(
            address = %self.server.address().map(|a| a.to_string()).unwrap_or_default(),
            service = %self.server.service().map(|s| s.to_string()).unwrap_or_default(),
            "RTSP server attached"
        );
        Ok(())
    }

    fn serve(self) -> Result<Infallible> {
        if self.source.is_none() {
            return Err(CameraError::Engine("RTSP server was never started".to_string()));
        }
        let main_loop = glib::MainLoop::new(None, false);
        main_loop.run();

        Err(CameraError::EngineStopped)
    }
}
