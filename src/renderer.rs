//! Frame renderer: load one animation and capture every frame in order.

use crate::async_api::SurfaceHandle;
use crate::document::AnimationDocument;
use crate::{Error, Result, Surface, SurfaceConfig};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Zero-padded width of frame indices; lexicographic order equals frame order
pub const FRAME_INDEX_WIDTH: usize = 5;

/// File name of the image for frame `index`, e.g. `frame_00042.png`
pub fn frame_file_name(index: u32) -> String {
    format!("frame_{:0width$}.png", index, width = FRAME_INDEX_WIDTH)
}

/// Path of the image for frame `index` inside `frames_dir`
pub fn frame_path(frames_dir: &Path, index: u32) -> PathBuf {
    frames_dir.join(frame_file_name(index))
}

/// Owns one isolated browser surface for the duration of one conversion.
pub struct FrameRenderer {
    surface: SurfaceHandle,
    frame_count: Option<u32>,
}

impl FrameRenderer {
    /// Launch the surface. Any failure is a [`Error::RenderInitError`].
    pub async fn open<S>(config: SurfaceConfig) -> Result<Self>
    where
        S: Surface + 'static,
    {
        let surface = SurfaceHandle::open::<S>(config).await.map_err(into_init_error)?;
        Ok(Self {
            surface,
            frame_count: None,
        })
    }

    /// Navigate to the rendering template at `template_url` and load
    /// `document` into it, waiting for the player to finish loading.
    pub async fn load_animation(
        &mut self,
        template_url: &str,
        document: &AnimationDocument,
    ) -> Result<()> {
        self.surface.navigate(template_url).await.map_err(into_init_error)?;
        self.surface
            .load_animation(document.value().clone())
            .await
            .map_err(into_init_error)?;
        self.frame_count = None;
        Ok(())
    }

    /// Total frame count as reported by the player. Only valid after
    /// [`FrameRenderer::load_animation`].
    pub async fn frame_count(&mut self) -> Result<u32> {
        if let Some(count) = self.frame_count {
            return Ok(count);
        }
        let count = self.surface.total_frames().await.map_err(into_init_error)?;
        self.frame_count = Some(count);
        Ok(count)
    }

    /// Seek to, capture and write every frame from 0 to `frame_count() - 1`.
    ///
    /// Each frame's file is written before the next seek is issued. The first
    /// failure stops the loop and is reported with its frame index. Returns
    /// the number of frames written.
    pub async fn render_all_frames(&mut self, frames_dir: &Path) -> Result<u32> {
        let count = self.frame_count().await?;

        for frame in 0..count {
            self.surface
                .go_to_frame(frame)
                .await
                .map_err(|e| capture_error(frame, e))?;
            self.surface
                .screenshot_to(frame_path(frames_dir, frame))
                .await
                .map_err(|e| capture_error(frame, e))?;
            debug!("captured frame {}/{}", frame + 1, count);
        }

        Ok(count)
    }

    /// Terminate the browser. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.surface.close().await
    }
}

fn into_init_error(err: Error) -> Error {
    match err {
        Error::RenderInitError(_) => err,
        other => Error::RenderInitError(other.to_string()),
    }
}

fn capture_error(frame: u32, err: Error) -> Error {
    let reason = match err {
        Error::FrameCaptureError { reason, .. } => reason,
        other => other.to_string(),
    };
    warn!("frame {} failed: {}", frame, reason);
    Error::FrameCaptureError { frame, reason }
}
