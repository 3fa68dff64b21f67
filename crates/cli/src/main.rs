use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rtsp_camera::config::loader::{self, LoadPolicy};
use rtsp_camera::{
    AppConfig, CameraError, PipelineBuilder, PipelineDescription, Platform, PlatformDetector,
    launch,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rtsp-server",
    about = "Serve a single camera over RTSP, adapting the pipeline to the host board"
)]
struct Args {
    /// Config file [default: ~/.local/share/rtsp-server/config.toml]
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Exit if the config file is missing or invalid instead of using defaults
    #[arg(long)]
    strict_config: bool,

    /// Skip detection and build for this platform (generic, pi, jetson)
    #[arg(long)]
    platform: Option<Platform>,

    /// Print the pipeline description and exit
    #[arg(long)]
    print_pipeline: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        return match toml::to_string(&config) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize configuration: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let platform = args
        .platform
        .unwrap_or_else(|| PlatformDetector::uname().detect());
    let pipeline = PipelineBuilder::new().build(platform, &config.camera);

    if args.print_pipeline {
        println!("{pipeline}");
        return ExitCode::SUCCESS;
    }

    match serve(&config, &pipeline) {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("Failed to serve stream: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> rtsp_camera::Result<AppConfig> {
    let policy = if args.strict_config {
        LoadPolicy::Strict
    } else {
        LoadPolicy::Lenient
    };

    match args.config.clone().or_else(loader::default_path) {
        Some(path) => loader::load(&path, policy),
        None if policy == LoadPolicy::Strict => Err(CameraError::ConfigRead {
            path: PathBuf::from(loader::CONFIG_FILE),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "neither XDG_DATA_HOME nor HOME is set",
            ),
        }),
        None => {
            tracing::warn!("no data directory, using default configuration");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(feature = "gstreamer")]
fn serve(config: &AppConfig, pipeline: &PipelineDescription) -> rtsp_camera::Result<Infallible> {
    let engine = rtsp_camera_gst::GstRtspEngine::new()?;
    launch(engine, &config.server, pipeline)
}

#[cfg(not(feature = "gstreamer"))]
fn serve(config: &AppConfig, pipeline: &PipelineDescription) -> rtsp_camera::Result<Infallible> {
    launch(rtsp_camera::NoEngine, &config.server, pipeline)
}
