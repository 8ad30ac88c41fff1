//! Reading image files into inline attachments.

use std::path::Path;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use squidai_types::chat::AttachedInput;

/// Mime type for an image file, from its extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Read and base64-encode an image file.
pub async fn load_image(path: &Path) -> anyhow::Result<AttachedInput> {
    let Some(mime_type) = image_mime_type(path) else {
        bail!("unsupported image type: {}", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(AttachedInput {
        mime_type: mime_type.to_string(),
        data: STANDARD.encode(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(image_mime_type(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("b.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("c.txt")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_load_image_encodes_base64() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel.png");
        tokio::fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();

        let input = load_image(&path).await.unwrap();
        assert_eq!(input.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&input.data).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_load_image_rejects_unknown_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "hi").await.unwrap();
        assert!(load_image(&path).await.is_err());
    }
}
