//! Product image storage.
//!
//! Images live under the media root (`STORE_MEDIA_ROOT`) in
//! `product_images/`, and are referenced from the database by their path
//! relative to that root. They are served under `STORE_MEDIA_URL`.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::config::MediaConfig;

/// Directory (relative to the media root) holding product images.
pub const PRODUCT_IMAGES_DIR: &str = "product_images";

/// Image shown for products without one.
pub const PLACEHOLDER_IMAGE: &str = "product_images/deleted_product.svg";

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">
  <rect width="400" height="300" fill="#e5e5e5"/>
  <text x="200" y="155" font-family="sans-serif" font-size="20" fill="#7a7a7a" text-anchor="middle">Image unavailable</text>
</svg>
"##;

/// Longest stem kept from an uploaded file name.
const MAX_STEM_CHARS: usize = 80;

/// Filesystem-backed media storage.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            url: config.url.clone(),
        }
    }

    /// Media root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL prefix media is served under.
    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url
    }

    /// Public URL of a stored image; empty paths resolve to the placeholder.
    #[must_use]
    pub fn url_for(&self, relative: &str) -> String {
        let relative = if relative.is_empty() {
            PLACEHOLDER_IMAGE
        } else {
            relative
        };
        format!("{}{}", self.url, relative.trim_start_matches('/'))
    }

    /// Write the placeholder image if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub async fn ensure_placeholder(&self) -> io::Result<()> {
        let path = self.root.join(PLACEHOLDER_IMAGE);
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, PLACEHOLDER_SVG).await?;
        tracing::info!(path = %path.display(), "Created placeholder image");
        Ok(())
    }

    /// Store an uploaded image, returning its path relative to the root.
    ///
    /// The stored name keeps a sanitized form of the original plus a short
    /// random suffix so uploads never overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub async fn save_product_image(&self, original_name: &str, bytes: &[u8]) -> io::Result<String> {
        let relative = format!("{PRODUCT_IMAGES_DIR}/{}", unique_file_name(original_name));
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %relative, size = bytes.len(), "Stored product image");
        Ok(relative)
    }

    /// Best-effort delete of a stored image.
    ///
    /// Empty paths, the placeholder and paths escaping the root are ignored;
    /// failures are logged, not returned.
    pub async fn purge(&self, relative: &str) {
        if relative.is_empty() || relative == PLACEHOLDER_IMAGE || !is_contained(relative) {
            return;
        }
        let path = self.root.join(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(path = %relative, "Purged product image"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %relative, error = %e, "Failed to purge product image"),
        }
    }
}

/// Whether `bytes` start like a PNG, JPEG, GIF or WebP image.
///
/// SVG is not accepted.
#[must_use]
pub fn is_image(bytes: &[u8]) -> bool {
    const SIGNATURES: &[&[u8]] = &[b"\x89PNG\r\n\x1a\n", b"\xff\xd8\xff", b"GIF87a", b"GIF89a"];

    if SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return true;
    }
    bytes.len() >= 12 && bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..])
}

/// Whether a relative path stays inside the root.
fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// `<sanitized stem>_<7 hex chars>.<ext>`
fn unique_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let mut clean: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    if clean.is_empty() {
        clean.push_str("image");
    }

    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();
    match ext.map(|e| {
        e.chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase()
    }) {
        Some(ext) if !ext.is_empty() => format!("{clean}_{suffix}.{ext}"),
        _ => format!("{clean}_{suffix}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(root: &Path) -> MediaStore {
        MediaStore::new(&MediaConfig {
            root: root.to_path_buf(),
            url: "/media/".to_string(),
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("thinkpad-store-{name}-{}", Uuid::new_v4().simple()))
    }

    #[test]
    fn test_url_for() {
        let media = store(Path::new("media"));
        assert_eq!(
            media.url_for("product_images/x1.png"),
            "/media/product_images/x1.png"
        );
        assert_eq!(media.url_for(""), "/media/product_images/deleted_product.svg");
    }

    #[test]
    fn test_unique_file_name() {
        let name = unique_file_name("../../My X1 photo.PNG");
        assert!(name.starts_with("My_X1_photo_"), "{name}");
        assert!(name.ends_with(".png"), "{name}");
        assert!(!name.contains('/'));

        assert!(unique_file_name("").starts_with("image_"));
        assert!(unique_file_name(".hidden").starts_with("_hidden_"));
        assert_ne!(unique_file_name("a.png"), unique_file_name("a.png"));
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(b"\x89PNG\r\n\x1a\nrest"));
        assert!(is_image(b"\xff\xd8\xff\xe0"));
        assert!(is_image(b"RIFF\x00\x00\x00\x00WEBPVP8 "));
        assert!(is_image(b"GIF89a\x01\x00"));
        assert!(!is_image(PLACEHOLDER_SVG.as_bytes()));
        assert!(!is_image(b"<?xml version=\"1.0\"?><svg onload=\"alert(1)\"/>"));
        assert!(!is_image(b"%PDF-1.7"));
        assert!(!is_image(b""));
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained("product_images/a.png"));
        assert!(!is_contained("../secrets.txt"));
        assert!(!is_contained("/etc/passwd"));
    }

    #[tokio::test]
    async fn test_save_and_purge_image() {
        let root = temp_root("media");
        let media = store(&root);

        let relative = media.save_product_image("t14.jpg", b"jpeg").await.unwrap();
        assert!(relative.starts_with("product_images/t14_"));
        assert!(root.join(&relative).exists());

        media.purge(&relative).await;
        assert!(!root.join(&relative).exists());

        // Missing files are not an error
        media.purge(&relative).await;

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_placeholder_is_idempotent() {
        let root = temp_root("placeholder");
        let media = store(&root);

        media.ensure_placeholder().await.unwrap();
        media.ensure_placeholder().await.unwrap();

        let svg = tokio::fs::read_to_string(root.join(PLACEHOLDER_IMAGE)).await.unwrap();
        assert!(svg.starts_with("<svg"));

        // The placeholder itself is never purged
        media.purge(PLACEHOLDER_IMAGE).await;
        assert!(root.join(PLACEHOLDER_IMAGE).exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
