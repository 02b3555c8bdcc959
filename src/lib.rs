//! lottie2mp4
//!
//! Converts a Lottie animation document into an MP4 video. Every frame is
//! rasterized by a headless browser running the lottie-web player, written
//! out as a PNG, and the resulting image sequence is encoded by `ffmpeg`.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome over the DevTools Protocol
//! - **Swappable surfaces**: any [`Surface`] implementation can stand in for the browser
//! - **Guaranteed cleanup**: browser and temporary workspace are released on every exit path
//!
//! # Example
//!
//! ```no_run
//! use lottie2mp4::ConvertConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConvertConfig::default();
//! let video = lottie2mp4::convert(&config).await?;
//! std::fs::write("lottie.mp4", &video.bytes)?;
//! println!("encoded {} frames", video.frame_count);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod document;
pub mod encoder;
pub mod renderer;
pub mod server;
pub mod workspace;

pub mod convert;

// Async facade owning a surface on a dedicated worker thread
pub mod async_api;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use async_api::SurfaceHandle;
pub use convert::{
    convert_document, convert_file, ConvertConfig, RenderedVideo, Stage, StageTimings,
};
pub use document::AnimationDocument;
pub use encoder::FfmpegEncoder;
pub use renderer::FrameRenderer;
pub use workspace::Workspace;

#[cfg(feature = "cdp")]
pub use cdp::CdpSurface;
#[cfg(feature = "cdp")]
pub use convert::convert;

/// Width of the rendering canvas in pixels (portrait video)
pub const CANVAS_WIDTH: u32 = 1080;
/// Height of the rendering canvas in pixels (portrait video)
pub const CANVAS_HEIGHT: u32 = 1920;

/// Configuration for the rendering surface
///
/// The defaults launch a headless browser with the sandbox disabled (needed
/// in most container deployments) and a 1080×1920 canvas.
///
/// # Examples
///
/// ```
/// let cfg = lottie2mp4::SurfaceConfig::default();
/// assert_eq!(cfg.viewport.width, 1080);
/// assert!(!cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Canvas dimensions
    pub viewport: Viewport,
    /// Whether to run the browser with its sandbox enabled
    pub sandbox: bool,
    /// Explicit browser executable; `None` lets the backend locate one
    pub browser_path: Option<PathBuf>,
    /// How long the browser may sit idle between commands before the
    /// backend gives up on it, in milliseconds
    pub idle_timeout_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            sandbox: false,
            browser_path: None,
            idle_timeout_ms: 120_000,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

/// Core trait for rendering surface implementations
///
/// A surface is one browser page hosting the rendering template. The
/// template exposes three capabilities to the host: load an animation,
/// report its total frame count, and seek to a frame. Implementations are
/// driven from a single worker thread (see [`SurfaceHandle`]) and therefore
/// need not be `Send`.
pub trait Surface {
    /// Launch the surface with the given configuration
    fn open(config: &SurfaceConfig) -> Result<Self>
    where
        Self: Sized;

    /// Navigate to the rendering template and wait for it to load
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Hand the animation document to the template and wait until the
    /// player has finished loading it
    fn load_animation(&mut self, document: &serde_json::Value) -> Result<()>;

    /// Total number of frames of the loaded animation
    fn total_frames(&mut self) -> Result<u32>;

    /// Synchronously seek the player to `frame` without interpolation
    fn go_to_frame(&mut self, frame: u32) -> Result<()>;

    /// Capture the canvas as PNG bytes
    fn capture_png(&mut self) -> Result<Vec<u8>>;

    /// Close the surface and terminate the backing browser
    fn close(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SurfaceConfig::default();
        assert_eq!(config.viewport.width, 1080);
        assert_eq!(config.viewport.height, 1920);
        assert!(!config.sandbox);
        assert!(config.browser_path.is_none());
    }

    #[test]
    fn test_viewport_is_portrait() {
        let viewport = Viewport::default();
        assert!(viewport.height > viewport.width);
        // yuv420p needs even dimensions
        assert_eq!(viewport.width % 2, 0);
        assert_eq!(viewport.height % 2, 0);
    }
}
