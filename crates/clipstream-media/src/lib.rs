use anyhow::Result;
use rand::Rng;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// On-disk media store for uploaded videos and cover images.
///
/// Files live flat under a single directory and are served statically by
/// generated name. Names embed a millisecond timestamp plus a random
/// suffix so concurrent uploads into the shared directory cannot collide.
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media store directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Collision-free stored name: `{field}-{millis}-{random}{ext}`.
    /// The extension is taken from the client filename but sanitized, so
    /// it can never smuggle a path component.
    pub fn unique_name(field: &str, original_filename: Option<&str>) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        let ext = original_filename
            .and_then(sanitized_extension)
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        format!("{field}-{millis}-{suffix}{ext}")
    }

    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.file_path(name), bytes).await?;
        Ok(())
    }

    /// Delete a stored file. Already-missing files are not an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.file_path(name)).await {
            Ok(()) => {
                info!("Deleted media file {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Last path segment of a stored media URL, e.g.
/// `/uploads/video-17...-42.mp4` -> `video-17...-42.mp4`.
pub fn url_basename(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|s| !s.is_empty())
}

fn sanitized_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit('.').next()?;
    if ext.is_empty() || ext.len() > 8 || ext == filename {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_do_not_collide() {
        let a = MediaStore::unique_name("video", Some("clip.mp4"));
        let b = MediaStore::unique_name("video", Some("clip.mp4"));
        assert_ne!(a, b);
        assert!(a.starts_with("video-"));
        assert!(a.ends_with(".mp4"));
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(sanitized_extension("a.MP4").as_deref(), Some("mp4"));
        assert_eq!(sanitized_extension("noext"), None);
        assert_eq!(sanitized_extension("evil.mp4/../../x"), None);
        assert_eq!(sanitized_extension("trailingdot."), None);
        assert_eq!(sanitized_extension("a.reallylongext"), None);
    }

    #[test]
    fn url_basename_strips_path() {
        assert_eq!(
            url_basename("/uploads/video-1-2.mp4"),
            Some("video-1-2.mp4")
        );
        assert_eq!(url_basename("bare.mp4"), Some("bare.mp4"));
        assert_eq!(url_basename("/uploads/"), None);
    }

    #[tokio::test]
    async fn save_then_delete_roundtrip() {
        let dir = std::env::temp_dir().join(format!(
            "clipstream-media-test-{}",
            rand::rng().random_range(0..u64::MAX)
        ));
        let store = MediaStore::new(dir.clone()).await.unwrap();

        let name = MediaStore::unique_name("cover", Some("c.png"));
        store.save(&name, b"png bytes").await.unwrap();
        assert_eq!(fs::read(store.file_path(&name)).await.unwrap(), b"png bytes");

        store.delete(&name).await.unwrap();
        // Second delete of the same name is tolerated.
        store.delete(&name).await.unwrap();

        let _ = fs::remove_dir_all(&dir).await;
    }
}
