use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::ExtractError;
use crate::parser::{parse_template, Node};

/// Where template source comes from.
pub trait SourceReader: Send + Sync {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

/// Reads templates straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

pub(crate) fn read_with(reader: &dyn SourceReader, path: &Path) -> Result<String, ExtractError> {
    reader
        .read_source(path)
        .map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Process-lifetime parse cache.
///
/// A template is read and parsed once per path; later lookups hand out the
/// same `Arc` even if the file has since changed on disk. Nothing is ever
/// evicted.
pub struct ParseCache {
    entries: Arc<DashMap<PathBuf, Arc<Node>>>,
    reader: Arc<dyn SourceReader>,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(Arc::new(FsReader))
    }
}

impl ParseCache {
    pub fn new(reader: Arc<dyn SourceReader>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            reader,
        }
    }

    /// The reader this cache parses through.
    pub fn reader(&self) -> &dyn SourceReader {
        self.reader.as_ref()
    }

    /// Return the parsed template for `path`, parsing it on first use.
    ///
    /// Concurrent callers for the same uncached path wait on the entry lock,
    /// so a path is only ever parsed once. Failures are not cached.
    pub fn get_or_parse(&self, path: &Path) -> Result<Arc<Node>, ExtractError> {
        if let Some(hit) = self.entries.get(path) {
            debug!(path = %path.display(), "template cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                debug!(path = %path.display(), "template cache miss, parsing");
                let source = read_with(self.reader.as_ref(), path)?;
                let ast = parse_template(&source).map_err(|source| ExtractError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                let ast = Arc::new(ast);
                entry.insert(Arc::clone(&ast));
                Ok(ast)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            templates: self.entries.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub templates: usize,
}
