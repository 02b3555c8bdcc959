use crate::{Error, Result, Surface, SurfaceConfig};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

enum Command {
    Navigate(String, oneshot::Sender<Result<()>>),
    LoadAnimation(Arc<serde_json::Value>, oneshot::Sender<Result<()>>),
    TotalFrames(oneshot::Sender<Result<u32>>),
    GoToFrame(u32, oneshot::Sender<Result<()>>),
    // Capture and write to the path before replying
    Screenshot(PathBuf, oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle to a rendering surface running on a dedicated worker thread.
///
/// The worker thread owns the synchronous [`Surface`] and executes commands
/// sent from async tasks one at a time, replying on a oneshot channel. This
/// keeps the host-to-page contract an explicit request/response exchange and
/// means the surface never has to be `Send`.
pub struct SurfaceHandle {
    cmd_tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl SurfaceHandle {
    /// Spawn the worker thread and open a surface of type `S` on it.
    pub async fn open<S>(config: SurfaceConfig) -> Result<Self>
    where
        S: Surface + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        let worker = thread::Builder::new()
            .name("lottie2mp4-surface".into())
            .spawn(move || {
                let surface = match S::open(&config) {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                run_worker(surface, cmd_rx);
            })
            .map_err(|e| {
                Error::RenderInitError(format!("Failed to spawn surface worker: {}", e))
            })?;

        let init_res = init_rx
            .await
            .map_err(|_| Error::RenderInitError("Surface worker exited during startup".into()))?;
        if let Err(err) = init_res {
            join_worker(worker).await;
            return Err(err);
        }

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            worker: Some(worker),
        })
    }

    async fn request<T>(
        &self,
        what: &str,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let cmd_tx = self
            .cmd_tx
            .as_ref()
            .ok_or_else(|| Error::RenderInitError(format!("{} on a closed surface", what)))?;

        let (tx, rx) = oneshot::channel();
        cmd_tx
            .send(make(tx))
            .map_err(|_| {
                Error::RenderInitError(format!("{} failed: surface worker is gone", what))
            })?;
        rx.await.map_err(|_| {
            Error::RenderInitError(format!("{} canceled: surface worker is gone", what))
        })?
    }

    /// Navigate to the rendering template
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.request("Navigate", |tx| Command::Navigate(url.to_string(), tx)).await
    }

    /// Load an animation document into the template
    pub async fn load_animation(&self, document: Arc<serde_json::Value>) -> Result<()> {
        self.request("LoadAnimation", |tx| Command::LoadAnimation(document, tx)).await
    }

    pub async fn total_frames(&self) -> Result<u32> {
        self.request("TotalFrames", Command::TotalFrames).await
    }

    pub async fn go_to_frame(&self, frame: u32) -> Result<()> {
        self.request("GoToFrame", |tx| Command::GoToFrame(frame, tx)).await
    }

    /// Capture the canvas and write it as a PNG to `path`. Resolves only once
    /// the file has been written.
    pub async fn screenshot_to(&self, path: PathBuf) -> Result<()> {
        self.request("Screenshot", |tx| Command::Screenshot(path, tx)).await
    }

    /// Close the surface and join the worker thread. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return Ok(());
        };

        let (tx, rx) = oneshot::channel();
        let res = match cmd_tx.send(Command::Close(tx)) {
            Ok(()) => rx.await.unwrap_or(Ok(())),
            // Worker already exited and dropped its surface
            Err(_) => Ok(()),
        };

        if let Some(worker) = self.worker.take() {
            join_worker(worker).await;
        }
        res
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_none()
    }
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        // Ask the worker to shut down without waiting for it
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let (tx, _rx) = oneshot::channel();
            let _ = cmd_tx.send(Command::Close(tx));
        }
    }
}

// Joining waits for the browser process to exit, so keep it off the async workers
async fn join_worker(worker: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || worker.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => warn!("surface worker panicked"),
        Err(e) => warn!("failed to join surface worker: {}", e),
    }
}

fn run_worker<S: Surface>(surface: S, cmd_rx: mpsc::Receiver<Command>) {
    let mut surface = Some(surface);

    while let Ok(cmd) = cmd_rx.recv() {
        let Some(s) = surface.as_mut() else {
            break;
        };

        match cmd {
            Command::Navigate(url, resp) => {
                let _ = resp.send(s.navigate(&url));
            }
            Command::LoadAnimation(document, resp) => {
                let _ = resp.send(s.load_animation(&document));
            }
            Command::TotalFrames(resp) => {
                let _ = resp.send(s.total_frames());
            }
            Command::GoToFrame(frame, resp) => {
                let _ = resp.send(s.go_to_frame(frame));
            }
            Command::Screenshot(path, resp) => {
                let res = s.capture_png().and_then(|data| {
                    std::fs::write(&path, data).map_err(|e| {
                        Error::FrameCaptureError {
                            frame: 0,
                            reason: format!("failed to write {}: {}", path.display(), e),
                        }
                    })
                });
                let _ = resp.send(res);
            }
            Command::Close(resp) => {
                let res = surface.take().map(|s| s.close()).unwrap_or(Ok(()));
                let _ = resp.send(res);
                break;
            }
        }
    }

    // Handle dropped without an explicit close
    if let Some(s) = surface.take() {
        debug!("surface handle dropped, closing surface");
        if let Err(e) = s.close() {
            warn!("failed to close surface: {}", e);
        }
    }
}
