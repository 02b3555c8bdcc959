//! Error types for the conversion pipeline

use crate::convert::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting an animation to video
#[derive(Error, Debug)]
pub enum Error {
    /// The animation document could not be read, parsed or validated
    #[error("Invalid animation document: {0}")]
    DocumentError(String),

    /// The temporary workspace could not be created
    #[error("Workspace setup failed: {0}")]
    WorkspaceError(String),

    /// Browser launch, template navigation or animation load failed
    #[error("Renderer initialization failed: {0}")]
    RenderInitError(String),

    /// Seeking to, capturing or writing a frame failed
    #[error("Frame capture failed at frame {frame}: {reason}")]
    FrameCaptureError { frame: u32, reason: String },

    /// The encoder could not be spawned or exited unsuccessfully
    #[error(
        "Encoding failed{}: {reason}",
        .code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
    )]
    EncodeError { code: Option<i32>, reason: String },

    /// The encoder reported success but its output could not be read
    #[error("Failed to read encoded output {}: {source}", .path.display())]
    OutputReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The earliest stage a conversion must have reached for an error of
    /// this kind to occur. This is a lower bound: a `RenderInitError` raised
    /// while loading the template or the animation happens after
    /// `BrowserReady`, but browser launch failures share the variant, so it
    /// reports `WorkspaceReady`. The orchestrator logs the exact stage.
    pub fn stage(&self) -> Stage {
        match self {
            Error::DocumentError(_) | Error::WorkspaceError(_) => Stage::Idle,
            Error::RenderInitError(_) => Stage::WorkspaceReady,
            Error::FrameCaptureError { .. } => Stage::AnimationLoaded,
            Error::EncodeError { .. } => Stage::FramesRendered,
            Error::OutputReadError { .. } => Stage::Encoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_error_message_includes_exit_code() {
        let err = Error::EncodeError { code: Some(3), reason: "boom".into() };
        assert_eq!(err.to_string(), "Encoding failed (exit code 3): boom");

        let err = Error::EncodeError { code: None, reason: "no such file".into() };
        assert_eq!(err.to_string(), "Encoding failed: no such file");
    }

    #[test]
    fn capture_error_names_the_frame() {
        let err = Error::FrameCaptureError { frame: 12, reason: "disk full".into() };
        assert!(err.to_string().contains("frame 12"));
        assert_eq!(err.stage(), Stage::AnimationLoaded);
    }

    #[test]
    fn stage_is_a_lower_bound_for_each_kind() {
        let init = Error::RenderInitError("loadLottie rejected".into());
        assert_eq!(init.stage(), Stage::WorkspaceReady);
        assert_eq!(Error::DocumentError("bad".into()).stage(), Stage::Idle);
        assert_eq!(Error::WorkspaceError("eacces".into()).stage(), Stage::Idle);

        let read = Error::OutputReadError {
            path: PathBuf::from("output.mp4"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(read.stage(), Stage::Encoded);
    }
}
