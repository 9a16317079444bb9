//! On-disk basemap tile cache.
//!
//! Tiles live at `<root>/<provider-slug>/<z>/<x>/<y>.<ext>`. The root is
//! always passed in explicitly; nothing here consults global state.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

use crate::coord::TileCoord;
use crate::fsutil::write_atomic;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan cache: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Summary of the cache contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheInfo {
    /// The root directory does not exist.
    Missing,
    /// The root exists but holds no files.
    Empty,
    Populated { files: u64, bytes: u64 },
}

impl CacheInfo {
    pub fn files(&self) -> u64 {
        match self {
            CacheInfo::Populated { files, .. } => *files,
            _ => 0,
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            CacheInfo::Populated { bytes, .. } => *bytes,
            _ => 0,
        }
    }

    pub fn megabytes(&self) -> f64 {
        self.bytes() as f64 / (1024.0 * 1024.0)
    }
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheInfo::Missing => f.write_str("no cache directory"),
            CacheInfo::Empty => f.write_str("cache is empty"),
            CacheInfo::Populated { files, .. } => {
                write!(f, "{} files, {:.2} MB", files, self.megabytes())
            }
        }
    }
}

/// Disk cache for fetched tiles.
#[derive(Debug, Clone)]
pub struct TileCache {
    root: PathBuf,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a tile for the given provider slug and extension.
    pub fn tile_path(&self, slug: &str, tile: &TileCoord, ext: &str) -> PathBuf {
        self.root
            .join(slug)
            .join(tile.zoom.to_string())
            .join(tile.col.to_string())
            .join(format!("{}.{}", tile.row, ext))
    }

    /// Returns the cached bytes, `None` on a miss.
    pub fn get(&self, slug: &str, tile: &TileCoord, ext: &str) -> CacheResult<Option<Vec<u8>>> {
        let path = self.tile_path(slug, tile, ext);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Stores a tile via temp-file rename.
    pub fn put(&self, slug: &str, tile: &TileCoord, ext: &str, data: &[u8]) -> CacheResult<()> {
        let path = self.tile_path(slug, tile, ext);
        write_atomic(&path, data).map_err(io_err(&path))
    }

    /// Drops a tile. Removing a tile that is not cached is not an error.
    pub fn remove(&self, slug: &str, tile: &TileCoord, ext: &str) -> CacheResult<()> {
        let path = self.tile_path(slug, tile, ext);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Counts files and bytes under the root.
    pub fn info(&self) -> CacheResult<CacheInfo> {
        if !self.root.is_dir() {
            return Ok(CacheInfo::Missing);
        }

        let mut files = 0u64;
        let mut bytes = 0u64;
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files += 1;
                bytes += entry.metadata()?.len();
            }
        }

        Ok(if files == 0 {
            CacheInfo::Empty
        } else {
            CacheInfo::Populated { files, bytes }
        })
    }

    /// Removes everything and recreates an empty root.
    ///
    /// Returns what was removed. A root that never existed is not an error.
    pub fn clear(&self) -> CacheResult<CacheInfo> {
        let before = self.info()?;
        if before != CacheInfo::Missing {
            fs::remove_dir_all(&self.root).map_err(io_err(&self.root))?;
        }
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;

        info!(root = %self.root.display(), removed = %before, "Cleared tile cache");
        Ok(before)
    }
}
