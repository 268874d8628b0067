//! Storage layer: folders, file streams, locks and compound files.
//!
//! All index files are addressed by `/`-separated paths relative to the
//! index root. Files are written once through an [`OutStream`] and are
//! immutable afterwards, which is what lets readers share them freely.

pub mod compound;
pub mod fs_folder;
pub mod instream;
pub mod lock;
pub mod outstream;
pub mod ram_folder;
pub mod shared_lock;

use std::fmt;
use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{IndexError, Result};

pub use compound::{CompoundFileReader, CompoundFileWriter};
pub use fs_folder::FsFolder;
pub use instream::InStream;
pub use lock::{Lock, LockFactory};
pub use outstream::OutStream;
pub use ram_folder::RamFolder;
pub use shared_lock::SharedLock;

/// A directory-like container of index files.
pub trait Folder: Send + Sync + fmt::Debug {
    /// Human readable location of the folder.
    fn path(&self) -> &str;

    /// Create a new file for writing. Fails if the file already exists.
    fn open_out(&self, path: &str) -> Result<OutStream>;

    /// Open a file which physically exists in this folder.
    fn open_file_in(&self, path: &str) -> Result<InStream>;

    fn exists(&self, path: &str) -> bool;

    fn is_directory(&self, path: &str) -> bool;

    /// Create a directory. Fails if the entry already exists.
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Sorted entry names of a directory (`""` is the root).
    fn list(&self, dir: &str) -> Result<Vec<String>>;

    /// Delete a file or an empty directory. Returns false if nothing was there.
    fn delete(&self, path: &str) -> Result<bool>;

    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Create `to` as a hard link to `from`. Fails if `to` exists.
    fn hard_link(&self, from: &str, to: &str) -> Result<()>;

    /// Create the folder's root if necessary.
    fn initialize(&self) -> Result<()>;

    /// Verify that the folder's root is usable.
    fn check(&self) -> bool;
}

/// Split `dir/name` into its directory and file parts.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

impl dyn Folder + '_ {
    /// Open a file for reading, looking inside consolidated compound files
    /// when the file is not physically present.
    pub fn open_in(&self, path: &str) -> Result<InStream> {
        if self.exists(path) {
            return self.open_file_in(path);
        }
        let (dir, name) = split_path(path);
        if !dir.is_empty() && self.exists(&compound::cfmeta_path(dir)) {
            let reader = CompoundFileReader::open(self, dir)?;
            return reader.open_in(name);
        }
        Err(IndexError::io_at(
            path,
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        ))
    }

    /// True if `path` exists either physically or inside a compound file.
    pub fn exists_virtual(&self, path: &str) -> bool {
        if self.exists(path) {
            return true;
        }
        let (dir, name) = split_path(path);
        if dir.is_empty() || !self.exists(&compound::cfmeta_path(dir)) {
            return false;
        }
        CompoundFileReader::open(self, dir)
            .map(|reader| reader.contains(name))
            .unwrap_or(false)
    }

    /// Recursively delete a file or directory.
    pub fn delete_tree(&self, path: &str) -> Result<bool> {
        if self.is_directory(path) {
            for entry in self.list(path)? {
                self.delete_tree(&format!("{path}/{entry}"))?;
            }
        }
        self.delete(path)
    }

    /// Read an entire file.
    pub fn slurp(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.open_in(path)?.as_slice().to_vec())
    }

    /// Serialize `value` as pretty JSON into a new file.
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let mut out = self.open_out(path)?;
        out.write_bytes(json.as_bytes())?;
        out.close()
    }

    /// Parse a JSON file.
    pub fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let bytes = self.slurp(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::format(format!("Failed to parse '{path}': {e}")))
    }

    /// Collapse the files of `dir` into a compound file.
    pub fn consolidate(&self, dir: &str) -> Result<()> {
        CompoundFileWriter::new(self, dir).consolidate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_json_helpers() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        folder
            .write_json("meta.json", &serde_json::json!({"cutoff": 3}))
            .unwrap();
        let value: serde_json::Value = folder.read_json("meta.json").unwrap();
        assert_eq!(value["cutoff"], 3);
        assert!(
            folder.write_json("meta.json", &1).is_err(),
            "JSON files are never overwritten in place"
        );
    }

    #[test]
    fn test_delete_tree() {
        let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
        folder.mkdir("seg_1").unwrap();
        folder.mkdir("seg_1/sub").unwrap();
        folder.open_out("seg_1/sub/f").unwrap().close().unwrap();
        folder.open_out("seg_1/g").unwrap().close().unwrap();
        assert!(folder.delete_tree("seg_1").unwrap());
        assert!(!folder.exists("seg_1"));
        assert!(folder.list("").unwrap().is_empty());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("seg_1/cf.dat"), ("seg_1", "cf.dat"));
        assert_eq!(split_path("merge.json"), ("", "merge.json"));
    }
}
