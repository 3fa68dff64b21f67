//! Hand-off of the built pipeline to the transport engine.
//!
//! The engine owns everything RTSP: sessions, sockets, RTP. This module
//! configures it, registers the pipeline under the mount path, starts it
//! and then gives up the calling thread to the engine's serve loop.

use std::convert::Infallible;
use std::io::{self, Write};

use crate::config::ServerSettings;
use crate::error::{CameraError, Result};
use crate::pipeline::PipelineDescription;

/// An RTSP server that can serve a launch description at a mount path.
pub trait TransportEngine {
    /// Set the listen address and port. Takes effect in [`start`](Self::start).
    fn bind(&mut self, address: &str, port: u16) -> Result<()>;

    /// Register `pipeline` under `path` (which starts with `/`).
    fn mount(&mut self, path: &str, pipeline: &PipelineDescription) -> Result<()>;

    /// Open the listening socket. Once this returns `Ok`, clients can connect
    /// as soon as [`serve`](Self::serve) runs.
    fn start(&mut self) -> Result<()>;

    /// Run the serve loop and block. Only returns on failure.
    fn serve(self) -> Result<Infallible>;
}

/// `"/" + token`, without doubling a leading slash the user already wrote.
pub fn mount_path(token: &str) -> String {
    format!("/{}", token.trim_start_matches('/'))
}

/// Client-facing URL of the stream.
pub fn stream_url(server: &ServerSettings) -> String {
    format!(
        "rtsp://{}:{}{}",
        server.address,
        server.port,
        mount_path(&server.path)
    )
}

/// Bind, mount, start, announce on stdout and serve. Never returns `Ok`.
pub fn launch<E: TransportEngine>(
    engine: E,
    server: &ServerSettings,
    pipeline: &PipelineDescription,
) -> Result<Infallible> {
    launch_to(engine, server, pipeline, &mut io::stdout())
}

/// [`launch`], writing the ready line to `out`.
///
/// The line is written only after the engine has started, so a socket that
/// cannot be opened is reported as an error and never announced.
pub fn launch_to<E: TransportEngine, W: Write>(
    mut engine: E,
    server: &ServerSettings,
    pipeline: &PipelineDescription,
    out: &mut W,
) -> Result<Infallible> {
    engine.bind(&server.address, server.port)?;
    let path = mount_path(&server.path);
    engine.mount(&path, pipeline)?;
    if let Err(e) = engine.start() {
        tracing::error!(error = %e, "transport engine failed to start");
        return Err(e);
    }

    let url = stream_url(server);
    tracing::info!(%url, "stream ready");
    writeln!(out, "Stream ready at {url}")?;
    out.flush()?;

    match engine.serve() {
        Ok(never) => match never {},
        Err(e) => {
            tracing::error!(error = %e, "transport engine stopped");
            Err(e)
        }
    }
}

/// Engine used when none is compiled in. Every call fails.
#[derive(Debug, Default)]
pub struct NoEngine;

impl TransportEngine for NoEngine {
    fn bind(&mut self, _address: &str, _port: u16) -> Result<()> {
        Err(CameraError::EngineUnavailable)
    }

    fn mount(&mut self, _path: &str, _pipeline: &PipelineDescription) -> Result<()> {
        Err(CameraError::EngineUnavailable)
    }

    fn start(&mut self) -> Result<()> {
        Err(CameraError::EngineUnavailable)
    }

    fn serve(self) -> Result<Infallible> {
        Err(CameraError::EngineUnavailable)
    }
}
