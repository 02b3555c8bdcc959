//! Conversion orchestrator
//!
//! One call runs the whole pipeline for one animation:
//!
//! ```text
//! Idle -> WorkspaceReady -> BrowserReady -> AnimationLoaded
//!      -> FramesRendered -> Encoded -> Done
//! ```
//!
//! Any stage may fail, which skips the remaining stages. The renderer is
//! closed and the workspace removed on every path, in that order, before
//! the result is returned. Nothing is shared between calls.

use crate::document::AnimationDocument;
use crate::encoder::FfmpegEncoder;
use crate::renderer::FrameRenderer;
use crate::workspace::Workspace;
use crate::{Error, Result, Surface, SurfaceConfig};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pipeline stages, in order. `Failed` is reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    WorkspaceReady,
    BrowserReady,
    AnimationLoaded,
    FramesRendered,
    Encoded,
    Done,
    Failed,
}

/// Everything one conversion needs
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Animation document to convert
    pub animation_path: PathBuf,
    /// HTML template exposing `loadLottie`, `getTotalFrames` and `goToFrame`
    pub template_path: PathBuf,
    /// Directory under which workspaces are created
    pub temp_root: PathBuf,
    pub surface: SurfaceConfig,
    pub encoder: FfmpegEncoder,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            animation_path: PathBuf::from("assets/lottie.json"),
            template_path: PathBuf::from("assets/renderer.html"),
            temp_root: std::env::temp_dir(),
            surface: SurfaceConfig::default(),
            encoder: FfmpegEncoder::default(),
        }
    }
}

/// Wall-clock time spent in each stage
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub browser_launch: Duration,
    pub setup: Duration,
    pub capture: Duration,
    pub encode: Duration,
    pub total: Duration,
}

/// The result of a successful conversion
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    /// Encoded MP4 bytes
    pub bytes: Vec<u8>,
    /// Number of frames rendered and encoded
    pub frame_count: u32,
    pub timings: StageTimings,
}

struct Progress {
    stage: Stage,
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        debug!("conversion stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

/// Read the configured animation document and convert it.
///
/// A document that cannot be read or parsed fails with
/// [`Error::DocumentError`] before any workspace or browser is created.
pub async fn convert_file<S>(config: &ConvertConfig) -> Result<RenderedVideo>
where
    S: Surface + 'static,
{
    let document = AnimationDocument::load(&config.animation_path).await?;
    convert_document::<S>(&document, config).await
}

/// Convert `document` to an MP4 using a surface of type `S`.
pub async fn convert_document<S>(
    document: &AnimationDocument,
    config: &ConvertConfig,
) -> Result<RenderedVideo>
where
    S: Surface + 'static,
{
    let started = Instant::now();
    let mut progress = Progress { stage: Stage::Idle };

    let mut workspace = Workspace::acquire(&config.temp_root)?;
    progress.advance(Stage::WorkspaceReady);

    let mut timings = StageTimings::default();
    let outcome =
        run_with_renderer::<S>(&mut progress, &mut timings, document, config, &workspace).await;

    workspace.release();
    timings.total = started.elapsed();
    info!("[lottie2mp4] total: {}ms (temp cleaned)", timings.total.as_millis());

    match outcome {
        Ok((bytes, frame_count)) => {
            progress.advance(Stage::Done);
            Ok(RenderedVideo {
                bytes,
                frame_count,
                timings,
            })
        }
        Err(err) => {
            warn!("conversion failed after {:?}: {}", progress.stage, err);
            progress.advance(Stage::Failed);
            Err(err)
        }
    }
}

async fn run_with_renderer<S>(
    progress: &mut Progress,
    timings: &mut StageTimings,
    document: &AnimationDocument,
    config: &ConvertConfig,
    workspace: &Workspace,
) -> Result<(Vec<u8>, u32)>
where
    S: Surface + 'static,
{
    let template_url = template_url(&config.template_path)?;

    let launch_start = Instant::now();
    let mut renderer = FrameRenderer::open::<S>(config.surface.clone()).await?;
    timings.browser_launch = launch_start.elapsed();
    info!("[lottie2mp4] browser launch: {}ms", timings.browser_launch.as_millis());
    progress.advance(Stage::BrowserReady);

    let outcome = render_and_encode(
        progress,
        timings,
        &mut renderer,
        &template_url,
        document,
        config,
        workspace,
    )
    .await;

    // Teardown failures never replace the primary outcome
    if let Err(e) = renderer.close().await {
        warn!("failed to close renderer: {}", e);
    }
    outcome
}

async fn render_and_encode(
    progress: &mut Progress,
    timings: &mut StageTimings,
    renderer: &mut FrameRenderer,
    template_url: &str,
    document: &AnimationDocument,
    config: &ConvertConfig,
    workspace: &Workspace,
) -> Result<(Vec<u8>, u32)> {
    let setup_start = Instant::now();
    renderer.load_animation(template_url, document).await?;
    let frame_count = renderer.frame_count().await?;
    timings.setup = setup_start.elapsed();
    info!(
        "[lottie2mp4] renderer setup + lottie load: {}ms (frames={})",
        timings.setup.as_millis(),
        frame_count
    );
    if frame_count != document.expected_frames() {
        warn!(
            "player reports {} frames but the document header implies {}",
            frame_count,
            document.expected_frames()
        );
    }
    progress.advance(Stage::AnimationLoaded);

    let capture_start = Instant::now();
    let written = renderer.render_all_frames(workspace.frames_dir()).await?;
    timings.capture = capture_start.elapsed();
    info!(
        "[lottie2mp4] frame capture: {}ms (frames={})",
        timings.capture.as_millis(),
        written
    );
    progress.advance(Stage::FramesRendered);

    let output = workspace.output_path();
    let encode_start = Instant::now();
    config.encoder.encode(workspace.frames_dir(), &output).await?;
    timings.encode = encode_start.elapsed();
    info!("[lottie2mp4] ffmpeg encode: {}ms", timings.encode.as_millis());
    progress.advance(Stage::Encoded);

    let bytes = tokio::fs::read(&output)
        .await
        .map_err(|source| Error::OutputReadError { path: output.clone(), source })?;

    Ok((bytes, written))
}

/// `file://` URL for the rendering template
fn template_url(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path).map_err(|e| {
        Error::RenderInitError(format!("rendering template {} not found: {}", path.display(), e))
    })?;
    let url = url::Url::from_file_path(&absolute).map_err(|_| {
        Error::RenderInitError(format!("cannot build a file URL for {}", absolute.display()))
    })?;
    Ok(url.to_string())
}

/// Convert the configured animation with the headless Chrome backend.
#[cfg(feature = "cdp")]
pub async fn convert(config: &ConvertConfig) -> Result<RenderedVideo> {
    convert_file::<crate::cdp::CdpSurface>(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_url_is_absolute_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.html");
        std::fs::write(&path, "<html></html>").unwrap();

        let url = template_url(&path).unwrap();
        assert!(url.starts_with("file:///"), "got {}", url);
        assert!(url.ends_with("/renderer.html"));
    }

    #[test]
    fn missing_template_is_init_error() {
        let err = template_url(Path::new("/definitely/not/here.html")).unwrap_err();
        assert!(matches!(err, Error::RenderInitError(_)));
    }

    #[test]
    fn default_config_points_at_bundled_assets() {
        let cfg = ConvertConfig::default();
        assert!(cfg.animation_path.ends_with("lottie.json"));
        assert!(cfg.template_path.ends_with("renderer.html"));
        assert_eq!(cfg.encoder.program(), Path::new("ffmpeg"));
    }
}
