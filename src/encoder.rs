//! ffmpeg invocation for the captured image sequence

use crate::renderer::FRAME_INDEX_WIDTH;
use crate::{Error, Result};
use log::{debug, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Input frame rate of the image sequence
pub const FRAME_RATE: u32 = 60;
pub const VIDEO_CODEC: &str = "libx264";
pub const PIXEL_FORMAT: &str = "yuv420p";

// Enough stderr to diagnose a failure without flooding the logs
const STDERR_TAIL_LINES: usize = 20;

/// Runs the external encoder over a frames directory.
///
/// The argument set is fixed:
///
/// ```text
/// -y -framerate 60 -i {frames}/frame_%05d.png -c:v libx264 -pix_fmt yuv420p {output}
/// ```
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed ahead of the fixed encode arguments, for running the
    /// encoder through a wrapper program.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for encoding `frames_dir` into `output`.
    pub fn build_args(&self, frames_dir: &Path, output: &Path) -> Vec<OsString> {
        let pattern = frames_dir.join(format!("frame_%0{}d.png", FRAME_INDEX_WIDTH));

        let mut args = self.leading_args.clone();
        args.extend(
            [
                "-y".into(),
                "-framerate".into(),
                FRAME_RATE.to_string().into(),
                "-i".into(),
                pattern.into_os_string(),
                "-c:v".into(),
                VIDEO_CODEC.into(),
                "-pix_fmt".into(),
                PIXEL_FORMAT.into(),
                output.as_os_str().to_owned(),
            ]
            .into_iter(),
        );
        args
    }

    /// Encode the sequence in `frames_dir` into `output`, waiting for the
    /// process to exit. Only exit code 0 counts as success.
    pub async fn encode(&self, frames_dir: &Path, output: &Path) -> Result<()> {
        let args = self.build_args(frames_dir, output);
        debug!("spawning {} {:?}", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::EncodeError {
                code: None,
                reason: format!("failed to spawn {}: {}", self.program.display(), e),
            })?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = stderr_tail(&result.stderr);
        warn!("encoder exited with {}: {}", result.status, stderr);
        Err(Error::EncodeError {
            code: result.status.code(),
            reason: if stderr.is_empty() {
                format!("{} exited with {}", self.program.display(), result.status)
            } else {
                stderr
            },
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_argument_contract() {
        let enc = FfmpegEncoder::default();
        let args = enc.build_args(Path::new("/tmp/ws/frames"), Path::new("/tmp/ws/output.mp4"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "-y",
                "-framerate",
                "60",
                "-i",
                "/tmp/ws/frames/frame_%05d.png",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "/tmp/ws/output.mp4",
            ]
        );
    }

    #[test]
    fn leading_args_come_first() {
        let enc = FfmpegEncoder::new("nice").with_leading_args(["-n", "10", "ffmpeg"]);
        let args = enc.build_args(Path::new("f"), Path::new("o.mp4"));
        assert_eq!(enc.program(), Path::new("nice"));
        assert_eq!(args[0], "-n");
        assert_eq!(args[2], "ffmpeg");
        assert_eq!(args[3], "-y");
        assert_eq!(args.len(), 13);
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let text: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 30"));
        assert!(tail.ends_with("line 49"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_code() {
        let dir = tempfile::tempdir().unwrap();
        let enc = FfmpegEncoder::new("sh")
            .with_leading_args(["-c", "echo 'no frames' >&2; exit 3", "ffmpeg"]);

        let err = enc.encode(dir.path(), &dir.path().join("out.mp4")).await.unwrap_err();
        match err {
            Error::EncodeError { code, reason } => {
                assert_eq!(code, Some(3));
                assert_eq!(reason, "no frames");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let enc = FfmpegEncoder::new("sh")
            .with_leading_args(["-c", "printf mp4 > \"${10}\"", "ffmpeg"]);

        enc.encode(dir.path(), &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn spawn_failure_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let enc = FfmpegEncoder::new(dir.path().join("no-such-encoder"));

        let err = enc.encode(dir.path(), &dir.path().join("out.mp4")).await.unwrap_err();
        match err {
            Error::EncodeError { code, reason } => {
                assert_eq!(code, None);
                assert!(reason.contains("failed to spawn"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
