//! Event photo storage on the local file system.
//!
//! Photos live under `<uploads>/<event_id>/<unix-millis>-<name>` and are
//! served back from [`PUBLIC_PREFIX`].

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write an uploaded image and return its public URL.
    pub async fn upload(
        &self,
        event_id: &str,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Rejected("Empty file".into()));
        }
        if !is_image(original_name, content_type) {
            return Err(StorageError::Rejected("Only image uploads are accepted".into()));
        }
        let event_dir = sanitize_segment(event_id)
            .ok_or_else(|| StorageError::Rejected("Invalid event id".into()))?;

        let file_name = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_file_name(original_name)
        );
        let relative = format!("{event_dir}/{file_name}");

        let dir = self.root.join(&event_dir);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), data).await?;

        tracing::info!(event_id, path = %relative, bytes = data.len(), "Stored photo");
        Ok(public_url(&relative))
    }

    /// Remove every photo of an event. Missing directories are fine.
    pub async fn remove_event_dir(&self, event_id: &str) -> Result<(), StorageError> {
        let Some(event_dir) = sanitize_segment(event_id) else {
            return Ok(());
        };
        match tokio::fs::remove_dir_all(self.root.join(event_dir)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a path below the uploads root, refusing anything that would
    /// escape it.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !safe {
            return None;
        }
        Some(self.root.join(path))
    }
}

pub fn public_url(relative: &str) -> String {
    format!("{PUBLIC_PREFIX}/{relative}")
}

fn is_image(name: &str, content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => {
            ct.starts_with("image/")
        }
        _ => mime_guess::from_path(name)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE),
    }
}

fn sanitize_segment(segment: &str) -> Option<String> {
    let clean: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    (!clean.is_empty()).then_some(clean)
}

/// Keep the name readable but safe to use as a single path segment.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo");
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        "photo".to_string()
    } else {
        clean.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_file_name_strips_paths_and_spaces() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("férias 2025.jpg"), "f_rias_2025.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "photo");
    }

    #[test]
    fn image_detection_prefers_content_type() {
        assert!(is_image("x.bin", Some("image/png")));
        assert!(!is_image("x.png", Some("text/plain")));
        assert!(is_image("x.jpeg", None));
        assert!(is_image("x.jpeg", Some("application/octet-stream")));
        assert!(!is_image("notes.txt", None));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let storage = PhotoStorage::new("/srv/uploads");
        assert_eq!(
            storage.resolve("abc/1-a.jpg"),
            Some(PathBuf::from("/srv/uploads/abc/1-a.jpg"))
        );
        assert_eq!(storage.resolve("../secret"), None);
        assert_eq!(storage.resolve("/etc/passwd"), None);
        assert_eq!(storage.resolve(""), None);
    }

    #[tokio::test]
    async fn upload_writes_file_and_returns_public_url() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = PhotoStorage::new(tmp.path());

        let url = storage
            .upload("event-1", "praia.jpg", Some("image/jpeg"), b"fake-jpeg")
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/event-1/"));
        assert!(url.ends_with("-praia.jpg"));

        let relative = url.trim_start_matches("/uploads/");
        let stored = std::fs::read(storage.resolve(relative).unwrap()).unwrap();
        assert_eq!(stored, b"fake-jpeg");
    }

    #[tokio::test]
    async fn upload_rejects_non_images_and_empty_files() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = PhotoStorage::new(tmp.path());

        assert!(matches!(
            storage.upload("e", "a.txt", Some("text/plain"), b"hi").await,
            Err(StorageError::Rejected(_))
        ));
        assert!(matches!(
            storage.upload("e", "a.jpg", Some("image/jpeg"), b"").await,
            Err(StorageError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn remove_event_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = PhotoStorage::new(tmp.path());
        storage
            .upload("event-2", "a.png", Some("image/png"), b"png")
            .await
            .unwrap();

        storage.remove_event_dir("event-2").await.unwrap();
        assert!(!tmp.path().join("event-2").exists());
        storage.remove_event_dir("event-2").await.unwrap();
    }
}
