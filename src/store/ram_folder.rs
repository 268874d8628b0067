//! In-memory folder, mainly for tests and ephemeral indexes.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{IndexError, Result};
use crate::store::instream::{FileBytes, InStream};
use crate::store::outstream::{FileSink, OutStream};
use crate::store::Folder;

#[derive(Debug, Default)]
struct RamState {
    files: AHashMap<String, Arc<Vec<u8>>>,
    dirs: BTreeSet<String>,
}

/// Writer which publishes its buffer into the folder on every flush.
#[derive(Debug)]
struct RamFileSink {
    path: String,
    buf: Vec<u8>,
    state: Arc<RwLock<RamState>>,
}

impl Write for RamFileSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.write();
        state
            .files
            .insert(self.path.clone(), Arc::new(self.buf.clone()));
        Ok(())
    }
}

impl FileSink for RamFileSink {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

fn not_found(path: &str) -> IndexError {
    IndexError::io_at(
        path,
        io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    )
}

fn already_exists(path: &str) -> IndexError {
    IndexError::io_at(
        path,
        io::Error::new(io::ErrorKind::AlreadyExists, "File exists"),
    )
}

/// A folder whose files live in memory.
///
/// Clones share the same contents, which lets tests model several
/// processes working against one index.
#[derive(Debug, Clone, Default)]
pub struct RamFolder {
    path: String,
    state: Arc<RwLock<RamState>>,
}

impl RamFolder {
    pub fn new() -> Self {
        RamFolder::default()
    }

    pub fn with_path<S: Into<String>>(path: S) -> Self {
        RamFolder {
            path: path.into(),
            state: Arc::default(),
        }
    }

    fn dir_exists(state: &RamState, dir: &str) -> bool {
        dir.is_empty() || state.dirs.contains(dir)
    }
}

impl Folder for RamFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn open_out(&self, path: &str) -> Result<OutStream> {
        let mut state = self.state.write();
        if state.files.contains_key(path) || state.dirs.contains(path) {
            return Err(already_exists(path));
        }
        if !Self::dir_exists(&state, parent_of(path)) {
            return Err(not_found(parent_of(path)));
        }
        state.files.insert(path.to_string(), Arc::new(Vec::new()));
        Ok(OutStream::new(
            path,
            Box::new(RamFileSink {
                path: path.to_string(),
                buf: Vec::new(),
                state: Arc::clone(&self.state),
            }),
        ))
    }

    fn open_file_in(&self, path: &str) -> Result<InStream> {
        let state = self.state.read();
        match state.files.get(path) {
            Some(bytes) => {
                let data: FileBytes = bytes.clone();
                Ok(InStream::new(path, data))
            }
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        let state = self.state.read();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_directory(&self, path: &str) -> bool {
        let state = self.state.read();
        Self::dir_exists(&state, path)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.files.contains_key(path) || state.dirs.contains(path) {
            return Err(already_exists(path));
        }
        if !Self::dir_exists(&state, parent_of(path)) {
            return Err(not_found(parent_of(path)));
        }
        state.dirs.insert(path.to_string());
        Ok(())
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        if !Self::dir_exists(&state, dir) {
            return Err(not_found(dir));
        }
        let mut names: Vec<String> = state
            .files
            .keys()
            .map(String::as_str)
            .chain(state.dirs.iter().map(String::as_str))
            .filter(|p| parent_of(p) == dir)
            .map(|p| name_of(p).to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let mut state = self.state.write();
        if state.files.remove(path).is_some() {
            return Ok(true);
        }
        if state.dirs.contains(path) {
            let prefix = format!("{path}/");
            let occupied = state.files.keys().any(|p| p.starts_with(&prefix))
                || state.dirs.iter().any(|p| p.starts_with(&prefix));
            if occupied {
                return Err(IndexError::io_at(
                    path,
                    io::Error::other("Directory not empty"),
                ));
            }
            state.dirs.remove(path);
            return Ok(true);
        }
        Ok(false)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.write();
        if let Some(bytes) = state.files.remove(from) {
            state.files.insert(to.to_string(), bytes);
            return Ok(());
        }
        if state.dirs.remove(from) {
            let prefix = format!("{from}/");
            let moved_files: Vec<String> = state
                .files
                .keys()
                .filter(|p| p.starts_with(&prefix))
                .cloned()
                .collect();
            for old in moved_files {
                if let Some(bytes) = state.files.remove(&old) {
                    state.files.insert(format!("{to}/{}", &old[prefix.len()..]), bytes);
                }
            }
            let moved_dirs: Vec<String> = state
                .dirs
                .iter()
                .filter(|p| p.starts_with(&prefix))
                .cloned()
                .collect();
            for old in moved_dirs {
                state.dirs.remove(&old);
                state.dirs.insert(format!("{to}/{}", &old[prefix.len()..]));
            }
            state.dirs.insert(to.to_string());
            return Ok(());
        }
        Err(not_found(from))
    }

    fn hard_link(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.files.contains_key(to) || state.dirs.contains(to) {
            return Err(already_exists(to));
        }
        let bytes = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_string(), bytes);
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_folder_files_and_dirs() {
        let folder = RamFolder::new();
        folder.mkdir("seg_1").unwrap();
        assert!(folder.mkdir("seg_1").is_err());
        assert!(folder.open_out("missing/file").is_err());

        let mut out = folder.open_out("seg_1/a.dat").unwrap();
        out.write_bytes(b"xyz").unwrap();
        out.close().unwrap();

        assert!(folder.exists("seg_1/a.dat"));
        assert!(folder.is_directory("seg_1"));
        assert_eq!(folder.list("").unwrap(), vec!["seg_1".to_string()]);
        assert_eq!(folder.list("seg_1").unwrap(), vec!["a.dat".to_string()]);
        assert!(folder.delete("seg_1").is_err(), "directory not empty");

        let mut input = folder.open_file_in("seg_1/a.dat").unwrap();
        assert_eq!(input.read_bytes(3).unwrap(), b"xyz");
    }

    #[test]
    fn test_rename_directory_moves_children() {
        let folder = RamFolder::new();
        folder.mkdir("old").unwrap();
        folder.open_out("old/f").unwrap().close().unwrap();
        folder.rename("old", "new").unwrap();
        assert!(folder.exists("new/f"));
        assert!(!folder.exists("old"));
        assert!(!folder.exists("old/f"));
    }

    #[test]
    fn test_hard_link_refuses_existing_target() {
        let folder = RamFolder::new();
        folder.open_out("a").unwrap().close().unwrap();
        folder.open_out("b").unwrap().close().unwrap();
        assert!(folder.hard_link("a", "b").is_err());
        folder.hard_link("a", "c").unwrap();
        assert!(folder.exists("c"));
    }

    #[test]
    fn test_clones_share_state() {
        let folder = RamFolder::new();
        let other = folder.clone();
        folder.open_out("shared").unwrap().close().unwrap();
        assert!(other.exists("shared"));
    }
}
