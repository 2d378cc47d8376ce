//! Specification file resolution

use std::path::{Path, PathBuf};

/// Default specification file extension
pub const DEFAULT_EXTENSION: &str = "yaml";

/// Maps specification names to files inside a fixed directory
///
/// A name that already carries the extension is used as a file name inside
/// the directory (or as-is when absolute); any other name gets the extension
/// appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLocator {
    dir: PathBuf,
    extension: String,
}

impl SpecLocator {
    /// Create locator for `dir` with the default extension
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_extension(dir, DEFAULT_EXTENSION)
    }

    /// Create locator with a custom extension (without the leading dot)
    #[must_use]
    pub fn with_extension(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether `name` already ends in the standard extension
    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .is_some_and(|ext| ext == self.extension.as_str())
    }

    /// Resolve the file for `name`
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        let file = if self.has_extension(name) {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("{name}.{}", self.extension))
        };
        if file.is_absolute() {
            file
        } else {
            self.dir.join(file)
        }
    }

    /// Canonical specification name: the resolved path without its
    /// extension, relative to the directory when it lies inside it
    ///
    /// `auth`, `auth.yaml` and `<dir>/auth.yaml` share one name, while
    /// `legacy/auth.yaml` stays `legacy/auth`.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> String {
        let stem = self.resolve(name).with_extension("");
        match stem.strip_prefix(&self.dir) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => stem.to_string_lossy().into_owned(),
        }
    }

    /// Names of every specification file in the directory, sorted
    ///
    /// # Errors
    /// Returns the IO error when the directory cannot be read.
    pub async fn list(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == self.extension.as_str()) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
