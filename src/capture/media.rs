use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use uuid::Uuid;

use super::handoff::{CaptureResult, MediaType};

/// Writes captured frames into the app's media directory and describes them
/// as [`CaptureResult`]s ready for the handoff.
#[derive(Debug, Clone)]
pub struct MediaWriter {
    dir: PathBuf,
}

impl MediaWriter {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create media directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, bytes: &[u8], media_type: MediaType) -> Result<CaptureResult> {
        if bytes.is_empty() {
            bail!("capture buffer is empty");
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), media_type.extension());
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write capture to {}", path.display()))?;

        info!("Capture saved to {} ({} bytes)", path.display(), bytes.len());

        Ok(CaptureResult {
            uri: file_uri(&path),
            media_type,
            timestamp: Utc::now(),
        })
    }
}

/// `file://` URI for an absolute path, percent-encoding every byte
/// outside the RFC 3986 unreserved set and `/`.
pub fn file_uri(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut uri = String::with_capacity(raw.len() + 7);
    uri.push_str("file://");
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                uri.push(byte as char)
            }
            _ => uri.push_str(&format!("%{byte:02X}")),
        }
    }
    uri
}

/// Inverse of [`file_uri`]. Returns `None` for non-file URIs and malformed
/// escapes.
pub fn path_from_file_uri(uri: &str) -> Option<PathBuf> {
    let encoded = uri.strip_prefix("file://")?.as_bytes();
    let mut decoded = Vec::with_capacity(encoded.len());
    let mut i = 0;
    while i < encoded.len() {
        if encoded[i] == b'%' {
            let hex = std::str::from_utf8(encoded.get(i + 1..i + 3)?).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(encoded[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_capture_with_unique_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MediaWriter::new(dir.path().join("captures")).unwrap();

        let first = writer.write(b"\xFF\xD8jpeg", MediaType::Photo).unwrap();
        let second = writer.write(b"\xFF\xD8jpeg", MediaType::Photo).unwrap();

        assert_ne!(first.uri, second.uri);
        assert!(first.uri.starts_with("file://"));
        assert!(first.uri.ends_with(".jpg"));

        let path = path_from_file_uri(&first.uri).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"\xFF\xD8jpeg");
    }

    #[test]
    fn uri_escapes_spaces_and_hash() {
        let uri = file_uri(Path::new("/data/My Captures/#1/id.jpg"));
        assert_eq!(uri, "file:///data/My%20Captures/%231/id.jpg");
        assert_eq!(
            path_from_file_uri(&uri).unwrap(),
            PathBuf::from("/data/My Captures/#1/id.jpg")
        );
        assert!(path_from_file_uri("content://media/1").is_none());
        assert!(path_from_file_uri("file:///bad%2").is_none());
    }

    #[test]
    fn written_capture_in_awkward_directory_is_readable_via_uri() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MediaWriter::new(dir.path().join("face #2 captures")).unwrap();

        let capture = writer.write(b"face", MediaType::Photo).unwrap();
        assert!(!capture.uri.contains(' '));
        assert!(capture.uri.contains("face%20%232%20captures"));
        let path = path_from_file_uri(&capture.uri).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"face");
    }

    #[test]
    fn rejects_empty_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MediaWriter::new(dir.path().to_path_buf()).unwrap();
        assert!(writer.write(&[], MediaType::Video).is_err());
    }
}
