//! Full conversions with headless Chrome and a real ffmpeg.
//!
//! The bundled template loads lottie-web from a CDN, so these also need
//! network access.
#![cfg(feature = "cdp")]

use lottie2mp4::{ConvertConfig, Error};
use std::path::{Path, PathBuf};

fn asset(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(name)
}

fn bundled_config(temp_root: &Path) -> ConvertConfig {
    ConvertConfig {
        animation_path: asset("lottie.json"),
        template_path: asset("renderer.html"),
        temp_root: temp_root.to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome and ffmpeg to be installed
async fn test_convert_bundled_animation() {
    let root = tempfile::tempdir().unwrap();
    let video = lottie2mp4::convert(&bundled_config(root.path()))
        .await
        .expect("Failed to convert");

    assert_eq!(video.frame_count, 60);
    // MP4 files open with an `ftyp` box
    assert!(video.bytes.len() > 1000, "video seems too small");
    assert_eq!(&video.bytes[4..8], b"ftyp");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
#[ignore] // Requires Chrome and ffmpeg to be installed
async fn test_repeated_conversions_agree() {
    let root = tempfile::tempdir().unwrap();
    let cfg = bundled_config(root.path());

    let first = lottie2mp4::convert(&cfg).await.expect("first conversion");
    let second = lottie2mp4::convert(&cfg).await.expect("second conversion");
    assert_eq!(first.frame_count, second.frame_count);
    assert_eq!(&second.bytes[4..8], b"ftyp");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_missing_template_fails_before_capture() {
    let root = tempfile::tempdir().unwrap();
    let cfg = ConvertConfig {
        template_path: root.path().join("missing.html"),
        ..bundled_config(root.path())
    };

    let err = lottie2mp4::convert(&cfg).await.unwrap_err();
    assert!(matches!(err, Error::RenderInitError(_)), "got {:?}", err);
    // Only the (absent) template path was ever inside root
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
