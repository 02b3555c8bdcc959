//! Animation document parsing and validation
//!
//! The document itself stays opaque: it is handed to the in-page player
//! untouched. Only the Lottie header is inspected, so malformed input is
//! rejected before a browser is ever launched.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Header fields every Lottie document carries at its top level
#[derive(Debug, Clone, Deserialize)]
pub struct LottieHeader {
    /// Frame rate the animation was authored at
    #[serde(rename = "fr")]
    pub frame_rate: f64,
    /// In point (first frame)
    #[serde(rename = "ip")]
    pub in_point: f64,
    /// Out point (one past the last frame)
    #[serde(rename = "op")]
    pub out_point: f64,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    #[serde(rename = "nm", default)]
    pub name: Option<String>,
}

/// A parsed, immutable animation document
#[derive(Debug, Clone)]
pub struct AnimationDocument {
    value: Arc<serde_json::Value>,
    header: LottieHeader,
}

impl AnimationDocument {
    /// Parse a document from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::DocumentError(format!("malformed JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::DocumentError("top level must be a JSON object".into()));
        }

        let header = LottieHeader::deserialize(&value)
            .map_err(|e| Error::DocumentError(format!("missing or invalid header: {}", e)))?;

        if !(header.frame_rate.is_finite() && header.frame_rate > 0.0) {
            return Err(Error::DocumentError(format!(
                "frame rate must be positive, got {}",
                header.frame_rate
            )));
        }
        if !(header.in_point.is_finite() && header.out_point.is_finite())
            || header.out_point < header.in_point
        {
            return Err(Error::DocumentError(format!(
                "out point {} precedes in point {}",
                header.out_point, header.in_point
            )));
        }
        if header.width == 0 || header.height == 0 {
            return Err(Error::DocumentError("width and height must be non-zero".into()));
        }

        Ok(Self {
            value: Arc::new(value),
            header,
        })
    }

    /// Read and parse a document from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::DocumentError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_slice(&bytes)
    }

    pub fn header(&self) -> &LottieHeader {
        &self.header
    }

    /// The raw document as handed to the player
    pub fn value(&self) -> &Arc<serde_json::Value> {
        &self.value
    }

    /// Frame count implied by the header. The player's own count is
    /// authoritative; this is only used to flag disagreement.
    pub fn expected_frames(&self) -> u32 {
        (self.header.out_point - self.header.in_point).ceil() as u32
    }
}
