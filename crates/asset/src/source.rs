//! Source providers: turn a [`SourceId`] into a line-readable stream.

use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Cursor},
    path::{Path, PathBuf},
};

use crate::error::LoadError;

/// Identifies one geometry source (a file path, or a key for in-memory sources).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SourceId(PathBuf);

impl SourceId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File stem, used to name the resulting object. Falls back to "Model".
    pub fn name(&self) -> &str {
        self.0
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Model")
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for SourceId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SourceId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for SourceId {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for SourceId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

pub type SourceReader = Box<dyn BufRead + Send>;

/// Opens sources for the loader. Shared across worker threads.
pub trait SourceProvider: Send + Sync {
    fn open(&self, id: &SourceId) -> Result<SourceReader, LoadError>;
}

/// Reads sources from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsProvider;

impl SourceProvider for FsProvider {
    fn open(&self, id: &SourceId) -> Result<SourceReader, LoadError> {
        let file = File::open(id.path()).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(id.path().to_path_buf()),
            _ => LoadError::Io {
                path: id.path().to_path_buf(),
                source,
            },
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Serves sources from memory, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    sources: HashMap<SourceId, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<SourceId>, contents: impl Into<String>) {
        self.sources.insert(id.into(), contents.into());
    }

    pub fn with(mut self, id: impl Into<SourceId>, contents: impl Into<String>) -> Self {
        self.insert(id, contents);
        self
    }
}

impl SourceProvider for MemoryProvider {
    fn open(&self, id: &SourceId) -> Result<SourceReader, LoadError> {
        let contents = self
            .sources
            .get(id)
            .ok_or_else(|| LoadError::NotFound(id.path().to_path_buf()))?;
        Ok(Box::new(Cursor::new(contents.clone().into_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::{Read, Write};

    #[test]
    fn fs_provider_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "v 1 2 3").unwrap();
        let mut reader = FsProvider.open(&SourceId::new(file.path())).expect("open");
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "v 1 2 3\n");
    }

    #[test]
    fn fs_provider_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let id = SourceId::new(dir.path().join("missing.obj"));
        let err = FsProvider.open(&id).err().expect("should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn memory_provider_lookup() {
        let provider = MemoryProvider::new().with("a.obj", "v 0 0 0\n");
        assert!(provider.open(&"a.obj".into()).is_ok());
        let err = provider.open(&"b.obj".into()).err().expect("should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn name_is_file_stem() {
        assert_eq!(SourceId::new("models/teapot.obj").name(), "teapot");
        assert_eq!(SourceId::new("").name(), "Model");
    }
}
