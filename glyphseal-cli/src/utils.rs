//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// MIME type for a document path, by extension.
pub fn mime_from_path(path: &Path) -> Result<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("webp") => Ok("image/webp"),
        Some("gif") => Ok("image/gif"),
        Some("pdf") => Ok("application/pdf"),
        other => bail!(
            "unsupported document format: {}",
            other.unwrap_or("(no extension)")
        ),
    }
}

/// Build the payload sidecar path from the document path.
///
/// Transforms `photo.png` into `photo.png.glyph`.
pub fn payload_path(file: &Path) -> PathBuf {
    file.with_extension(format!(
        "{}.glyph",
        file.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    ))
}

/// Load a payload from a sidecar file, trimming surrounding whitespace.
pub fn load_payload(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_detection_by_extension() {
        assert_eq!(mime_from_path(Path::new("a.PNG")).unwrap(), "image/png");
        assert_eq!(mime_from_path(Path::new("a.jpeg")).unwrap(), "image/jpeg");
        assert_eq!(
            mime_from_path(Path::new("doc.pdf")).unwrap(),
            "application/pdf"
        );
        assert!(mime_from_path(Path::new("movie.mp4")).is_err());
        assert!(mime_from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn sidecar_path_keeps_the_original_extension() {
        assert_eq!(
            payload_path(Path::new("photo.png")),
            PathBuf::from("photo.png.glyph")
        );
    }
}
