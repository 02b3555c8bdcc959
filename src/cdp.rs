//! Chrome DevTools Protocol surface implementation

use crate::{Error, Result, Surface, SurfaceConfig, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// CDP-based rendering surface (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome instance with a single tab sized to the
/// canvas and talks to the template's `window.loadLottie`,
/// `window.getTotalFrames` and `window.goToFrame` through `Runtime.evaluate`.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl Surface for CdpSurface {
    fn open(config: &SurfaceConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let viewport = config.viewport;

        let mut args: Vec<&OsStr> = Vec::new();
        if !config.sandbox {
            args.push(OsStr::new("--disable-setuid-sandbox"));
        }

        // Configure headless Chrome launch options
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .window_size(Some((viewport.width, viewport.height)))
            .path(config.browser_path.clone())
            .idle_browser_timeout(Duration::from_millis(config.idle_timeout_ms))
            .args(args)
            .build()
            .map_err(|e| Error::RenderInitError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::RenderInitError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::RenderInitError(format!("Failed to create tab: {}", e)))?;

        debug!("launched headless browser ({}x{})", viewport.width, viewport.height);
        Ok(Self { browser, tab, viewport })
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::RenderInitError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::RenderInitError(format!("Wait for navigation failed: {}", e)))?;

        Ok(())
    }

    fn load_animation(&mut self, document: &serde_json::Value) -> Result<()> {
        // A JSON document is a valid JS expression, so it can be inlined as the argument
        let data = serde_json::to_string(document)
            .map_err(|e| Error::RenderInitError(format!("Failed to serialize animation: {}", e)))?;
        let script = format!(
            "(async function() {{ await window.loadLottie({}); return true; }})()",
            data
        );

        let result = self
            .tab
            .evaluate(&script, true)
            .map_err(|e| Error::RenderInitError(format!("loadLottie failed: {}", e)))?;

        match result.value {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            other => Err(Error::RenderInitError(format!(
                "loadLottie did not complete (returned {:?})",
                other
            ))),
        }
    }

    fn total_frames(&mut self) -> Result<u32> {
        let result = self
            .tab
            .evaluate("window.getTotalFrames()", false)
            .map_err(|e| Error::RenderInitError(format!("getTotalFrames failed: {}", e)))?;

        let total = result
            .value
            .as_ref()
            .and_then(|v| v.as_f64())
            .ok_or_else(|| {
                Error::RenderInitError(format!("getTotalFrames returned {:?}", result.value))
            })?;

        if !total.is_finite() || total < 0.0 {
            return Err(Error::RenderInitError(format!("invalid frame count {}", total)));
        }
        // A fractional total still needs its last partial frame
        Ok(total.ceil() as u32)
    }

    fn go_to_frame(&mut self, frame: u32) -> Result<()> {
        self.tab
            .evaluate(&format!("window.goToFrame({}); true", frame), false)
            .map_err(|e| Error::FrameCaptureError {
                frame,
                reason: format!("goToFrame failed: {}", e),
            })?;
        Ok(())
    }

    fn capture_png(&mut self) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.viewport.width as f64,
            height: self.viewport.height as f64,
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::FrameCaptureError {
                frame: 0,
                reason: format!("Screenshot failed: {}", e),
            })
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the child process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_cdp_surface_creation() {
        let surface = CdpSurface::open(&SurfaceConfig::default()).expect("Failed to open surface");
        surface.close().unwrap();
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_capture_matches_viewport() {
        let config = SurfaceConfig {
            viewport: Viewport { width: 320, height: 640 },
            ..Default::default()
        };
        let mut surface = CdpSurface::open(&config).expect("Failed to open surface");
        surface.navigate("about:blank").expect("Failed to navigate");

        let png = surface.capture_png().expect("Failed to capture");
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width/height are the first two big-endian u32s after the chunk header
        let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        assert_eq!((width, height), (320, 640));

        surface.close().unwrap();
    }
}
