//! Document persistence.

use crate::error::{LoadError, SaveError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    pub title: String,
    pub path: String,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn list(&self) -> Result<Vec<DocEntry>, LoadError>;
    async fn load(&self, path: &str) -> Result<String, LoadError>;
    async fn save(&self, path: &str, text: &str) -> Result<(), SaveError>;
}

/// Whether `path` names a Markdown document.
pub fn is_document(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Normalizes a store-relative path. Leading slashes and `.` segments are
/// dropped; `None` if the path is empty or climbs out of the root.
pub fn clean_path(path: &str) -> Option<PathBuf> {
    let mut cleaned = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::ParentDir => {
                if !cleaned.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if cleaned.as_os_str().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Title shown for a document: its first line without a leading `# `,
/// or the path when the file is empty.
pub fn title_of(path: &str, text: &str) -> String {
    match text.lines().next() {
        Some(line) => line.strip_prefix("# ").unwrap_or(line).to_string(),
        None => path.to_string(),
    }
}

#[cfg(feature = "local")]
pub use dir::DirStore;

#[cfg(feature = "local")]
mod dir {
    use super::{DocEntry, FileStore, clean_path, is_document, title_of};
    use crate::error::{LoadError, SaveError};
    use async_trait::async_trait;
    use std::io::{self, BufRead, BufReader};
    use std::path::{Path, PathBuf};
    use tracing::{debug, info};
    use walkdir::WalkDir;

    /// Stores documents as files under a root directory.
    #[derive(Debug, Clone)]
    pub struct DirStore {
        root: PathBuf,
    }

    impl DirStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn resolve(&self, path: &str) -> Option<PathBuf> {
            clean_path(path).map(|relative| self.root.join(relative))
        }
    }

    /// First line of the file. Bytes that are not UTF-8 become U+FFFD so a
    /// single odd file cannot fail the listing.
    fn first_line(path: &Path) -> io::Result<String> {
        let mut line = Vec::new();
        BufReader::new(std::fs::File::open(path)?).read_until(b'\n', &mut line)?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Markdown files in `root` or one directory below it, sorted by path.
    fn list_documents(root: &Path) -> Result<Vec<DocEntry>, LoadError> {
        let mut docs = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| LoadError::Io {
                path: root.display().to_string(),
                source: io::Error::other(err),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !is_document(&relative) {
                continue;
            }
            let head = first_line(entry.path()).map_err(|source| LoadError::Io {
                path: relative.clone(),
                source,
            })?;
            docs.push(DocEntry {
                title: title_of(&relative, head.trim_end_matches(['\r', '\n'])),
                path: relative,
            });
        }
        Ok(docs)
    }

    #[async_trait]
    impl FileStore for DirStore {
        async fn list(&self) -> Result<Vec<DocEntry>, LoadError> {
            let root = self.root.clone();
            let docs = tokio::task::spawn_blocking(move || list_documents(&root))
                .await
                .map_err(|err| LoadError::Io {
                    path: self.root.display().to_string(),
                    source: io::Error::other(err),
                })??;
            debug!(root = %self.root.display(), count = docs.len(), "listed documents");
            Ok(docs)
        }

        async fn load(&self, path: &str) -> Result<String, LoadError> {
            let full = self
                .resolve(path)
                .ok_or_else(|| LoadError::InvalidPath(path.to_string()))?;
            match tokio::fs::read_to_string(&full).await {
                Ok(text) => {
                    debug!(path, bytes = text.len(), "loaded document");
                    Ok(text)
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    Err(LoadError::NotFound(path.to_string()))
                }
                Err(source) => Err(LoadError::Io {
                    path: path.to_string(),
                    source,
                }),
            }
        }

        async fn save(&self, path: &str, text: &str) -> Result<(), SaveError> {
            let full = self
                .resolve(path)
                .ok_or_else(|| SaveError::InvalidPath(path.to_string()))?;
            tokio::fs::write(&full, text)
                .await
                .map_err(|source| SaveError::Io {
                    path: path.to_string(),
                    source,
                })?;
            info!(path, bytes = text.len(), "saved document");
            Ok(())
        }
    }
}
