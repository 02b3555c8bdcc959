use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lottie2mp4::{ConvertConfig, FfmpegEncoder, SurfaceConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lottie2mp4", version, about = "Render a Lottie animation to MP4")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve `GET /`, converting the animation on every request
    Serve {
        #[arg(long, env = "LOTTIE2MP4_ADDR", default_value = "127.0.0.1:3000")]
        addr: String,
        #[command(flatten)]
        convert: ConvertArgs,
    },
    /// Convert once and write the video to a file
    Render {
        #[arg(short, long, default_value = "lottie.mp4")]
        output: PathBuf,
        #[command(flatten)]
        convert: ConvertArgs,
    },
}

#[derive(Args, Clone)]
struct ConvertArgs {
    /// Lottie JSON document
    #[arg(long, env = "LOTTIE2MP4_ANIMATION", default_value = "assets/lottie.json")]
    animation: PathBuf,
    /// Rendering template HTML
    #[arg(long, env = "LOTTIE2MP4_TEMPLATE", default_value = "assets/renderer.html")]
    template: PathBuf,
    /// ffmpeg executable
    #[arg(long, env = "LOTTIE2MP4_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    /// Chrome/Chromium executable (located automatically when omitted)
    #[arg(long, env = "LOTTIE2MP4_CHROME")]
    chrome: Option<PathBuf>,
    /// Directory for per-conversion workspaces
    #[arg(long, env = "LOTTIE2MP4_TMPDIR")]
    temp_dir: Option<PathBuf>,
}

impl ConvertArgs {
    fn into_config(self) -> ConvertConfig {
        let defaults = ConvertConfig::default();
        ConvertConfig {
            animation_path: self.animation,
            template_path: self.template,
            temp_root: self.temp_dir.unwrap_or(defaults.temp_root),
            surface: SurfaceConfig {
                browser_path: self.chrome,
                ..defaults.surface
            },
            encoder: FfmpegEncoder::new(self.ffmpeg),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { addr, convert } => serve(addr, convert.into_config()).await,
        Command::Render { output, convert } => {
            let video = lottie2mp4::convert(&convert.into_config()).await?;
            std::fs::write(&output, &video.bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            log::info!(
                "wrote {} ({} frames, {} bytes)",
                output.display(),
                video.frame_count,
                video.bytes.len()
            );
            Ok(())
        }
    }
}

async fn serve(addr: String, config: ConvertConfig) -> anyhow::Result<()> {
    let server = tiny_http::Server::http(addr.as_str())
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;
    let server = Arc::new(server);
    log::info!("listening on http://{}", addr);

    let runtime = tokio::runtime::Handle::current();
    let accept_loop = {
        let server = Arc::clone(&server);
        tokio::task::spawn_blocking(move || {
            lottie2mp4::server::serve(&server, || runtime.block_on(lottie2mp4::convert(&config)));
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    log::info!("shutting down");
    server.unblock();
    accept_loop.await.context("accept loop panicked")?;
    Ok(())
}
