//! Folder backed by a directory on the local file system.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{IndexError, Result};
use crate::store::instream::InStream;
use crate::store::outstream::{FileSink, OutStream};
use crate::store::Folder;

/// Buffered file writer that can fsync.
#[derive(Debug)]
struct FsFileSink {
    writer: BufWriter<File>,
}

impl Write for FsFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl FileSink for FsFileSink {
    fn sync(&mut self) -> io::Result<()> {
        self.writer.get_ref().sync_all()
    }
}

/// A folder rooted at a real directory.
#[derive(Debug, Clone)]
pub struct FsFolder {
    root: PathBuf,
    path: String,
}

impl FsFolder {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let path = root.to_string_lossy().into_owned();
        FsFolder { root, path }
    }

    fn full(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl Folder for FsFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn open_out(&self, path: &str) -> Result<OutStream> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.full(path))
            .map_err(|e| IndexError::io_at(path, e))?;
        Ok(OutStream::new(
            path,
            Box::new(FsFileSink {
                writer: BufWriter::new(file),
            }),
        ))
    }

    fn open_file_in(&self, path: &str) -> Result<InStream> {
        let file = File::open(self.full(path)).map_err(|e| IndexError::io_at(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| IndexError::io_at(path, e))?
            .len();
        if len == 0 {
            return Ok(InStream::from_vec(path, Vec::new()));
        }
        // SAFETY: index files are never modified after they are closed.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IndexError::io_at(path, e))?;
        Ok(InStream::new(path, Arc::new(mmap)))
    }

    fn exists(&self, path: &str) -> bool {
        self.full(path).exists()
    }

    fn is_directory(&self, path: &str) -> bool {
        self.full(path).is_dir()
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir(self.full(path)).map_err(|e| IndexError::io_at(path, e))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(self.full(dir)).map_err(|e| IndexError::io_at(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| IndexError::io_at(dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let full = self.full(path);
        let result = if full.is_dir() {
            fs::remove_dir(&full)
        } else {
            fs::remove_file(&full)
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(IndexError::io_at(path, e)),
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        fs::rename(self.full(from), self.full(to)).map_err(|e| IndexError::io_at(from, e))
    }

    fn hard_link(&self, from: &str, to: &str) -> Result<()> {
        fs::hard_link(self.full(from), self.full(to)).map_err(|e| IndexError::io_at(to, e))
    }

    fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| IndexError::io_at(self.path.clone(), e))
    }

    fn check(&self) -> bool {
        self.root.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_folder_basics() {
        let dir = TempDir::new().unwrap();
        let folder = FsFolder::new(dir.path());
        assert!(folder.check());

        folder.mkdir("seg_1").unwrap();
        let mut out = folder.open_out("seg_1/data.dat").unwrap();
        out.write_bytes(b"payload").unwrap();
        out.close().unwrap();

        assert!(folder.open_out("seg_1/data.dat").is_err(), "no overwrite");
        let mut input = folder.open_file_in("seg_1/data.dat").unwrap();
        assert_eq!(input.read_bytes(7).unwrap(), b"payload");

        assert_eq!(folder.list("seg_1").unwrap(), vec!["data.dat".to_string()]);
        folder.rename("seg_1/data.dat", "seg_1/moved.dat").unwrap();
        assert!(folder.exists("seg_1/moved.dat"));
        assert!(folder.delete("seg_1/moved.dat").unwrap());
        assert!(!folder.delete("seg_1/moved.dat").unwrap());
    }

    #[test]
    fn test_empty_file_opens() {
        let dir = TempDir::new().unwrap();
        let folder = FsFolder::new(dir.path());
        folder.open_out("empty").unwrap().close().unwrap();
        let input = folder.open_file_in("empty").unwrap();
        assert_eq!(input.length(), 0);
    }
}
