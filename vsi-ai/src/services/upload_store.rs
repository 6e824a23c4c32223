//! Upload store
//!
//! Keeps uploaded photos on disk and resolves image ids back to bytes. Ids are
//! `<unix millis>-<original name>` with whitespace replaced by `_`.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use vsi_common::{Error, Result};

use crate::models::ImageRef;

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open (creating if needed) the store at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one upload and return its reference
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<ImageRef> {
        let base = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_file_name(original_name)
        );

        // Same-millisecond uploads with the same name get a numeric prefix
        let mut id = base.clone();
        let mut counter = 1;
        let (path, mut file) = loop {
            let path = self.dir.join(&id);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    id = format!("{}-{}", counter, base);
                    counter += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        tracing::debug!(id = %id, bytes = bytes.len(), "Upload stored");

        Ok(ImageRef::from_file(id, path))
    }

    /// Resolve a previously stored id
    pub fn resolve(&self, id: &str) -> Result<ImageRef> {
        if !is_plain_file_name(id) {
            return Err(Error::InvalidInput(format!("Invalid image id: {}", id)));
        }

        let path = self.dir.join(id);
        if !path.is_file() {
            return Err(Error::NotFound(format!("Image not found: {}", id)));
        }

        Ok(ImageRef::from_file(id, path))
    }

    /// Read the bytes of a stored image
    pub async fn read(&self, id: &str) -> Result<Vec<u8>> {
        let image = self.resolve(id)?;
        Ok(image.load_bytes().await?)
    }
}

/// Last path component of `name`, whitespace runs replaced by `_`
fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let mut out = String::with_capacity(last.len());
    let mut in_space = false;
    for c in last.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else if c.is_control() {
            continue;
        } else {
            out.push(c);
            in_space = false;
        }
    }

    if out.is_empty() || out == "." || out == ".." {
        "upload".to_string()
    } else {
        out
    }
}

fn is_plain_file_name(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}
