//! Compound files: one `cf.dat` holding every small file of a segment
//! directory, plus a `cfmeta.json` table of `{offset, length}` per file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::store::{Folder, InStream};

pub const CF_FILE: &str = "cf.dat";
pub const CFMETA_FILE: &str = "cfmeta.json";
pub const CFMETA_TEMP: &str = "cfmeta.json.temp";

/// Version written into `cfmeta.json`.
pub const CURRENT_FILE_FORMAT: i32 = 2;

pub(crate) fn cfmeta_path(dir: &str) -> String {
    format!("{dir}/{CFMETA_FILE}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFileEntry {
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompoundMeta {
    files: BTreeMap<String, SubFileEntry>,
    format: i32,
}

/// Consolidates the files of one directory into a compound file.
#[derive(Debug)]
pub struct CompoundFileWriter<'a> {
    folder: &'a dyn Folder,
    dir: String,
}

impl<'a> CompoundFileWriter<'a> {
    pub fn new<S: Into<String>>(folder: &'a dyn Folder, dir: S) -> Self {
        CompoundFileWriter {
            folder,
            dir: dir.into(),
        }
    }

    fn path(&self, name: &str) -> String {
        format!("{}/{name}", self.dir)
    }

    /// Fold every non-JSON file of the directory into `cf.dat`.
    ///
    /// The originals are deleted only after `cfmeta.json` has been renamed
    /// into place, so a crash leaves either the old or the new layout.
    pub fn consolidate(&self) -> Result<()> {
        if self.folder.exists(&self.path(CFMETA_FILE)) {
            return Err(IndexError::contract(format!(
                "Merge already performed for {}",
                self.dir
            )));
        }
        self.clean_up_old_temp_files()?;
        self.do_consolidate()
    }

    fn clean_up_old_temp_files(&self) -> Result<()> {
        for leftover in [CF_FILE, CFMETA_TEMP] {
            let path = self.path(leftover);
            if self.folder.exists(&path) && !self.folder.delete(&path)? {
                return Err(IndexError::internal(format!("Can't delete '{path}'")));
            }
        }
        Ok(())
    }

    fn do_consolidate(&self) -> Result<()> {
        let mut names = self.folder.list(&self.dir)?;
        names.sort();
        let mut out = self.folder.open_out(&self.path(CF_FILE))?;
        let mut files = BTreeMap::new();
        let mut merged = Vec::new();

        for name in names {
            if name.ends_with(".json") || name == CF_FILE {
                continue;
            }
            let path = self.path(&name);
            if self.folder.is_directory(&path) {
                continue;
            }
            let instream = self.folder.open_file_in(&path)?;
            let offset = out.tell();
            out.absorb(&instream)?;
            let length = out.tell() - offset;
            files.insert(name.clone(), SubFileEntry { offset, length });
            merged.push(path);
            out.align(8)?;
        }
        out.close()?;

        let meta = CompoundMeta {
            files,
            format: CURRENT_FILE_FORMAT,
        };
        self.folder.write_json(&self.path(CFMETA_TEMP), &meta)?;
        self.folder
            .rename(&self.path(CFMETA_TEMP), &self.path(CFMETA_FILE))?;

        for path in &merged {
            if !self.folder.delete(path)? {
                return Err(IndexError::internal(format!("Can't delete '{path}'")));
            }
        }
        log::debug!("Consolidated {} files into {}", merged.len(), self.path(CF_FILE));
        Ok(())
    }
}

/// Read access to the sub-files of a consolidated directory.
#[derive(Debug, Clone)]
pub struct CompoundFileReader {
    dir: String,
    format: i32,
    files: BTreeMap<String, SubFileEntry>,
    data: InStream,
}

impl CompoundFileReader {
    pub fn open(folder: &dyn Folder, dir: &str) -> Result<Self> {
        let meta_path = cfmeta_path(dir);
        let bytes = folder.open_file_in(&meta_path)?.as_slice().to_vec();
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::format(format!("Corrupt {meta_path} file: {e}")))?;

        let format = value
            .get("format")
            .and_then(json_to_i64)
            .unwrap_or(0) as i32;
        if format < 1 {
            return Err(IndexError::format(format!(
                "Corrupt {meta_path} file: Missing or invalid 'format'"
            )));
        }
        if format > CURRENT_FILE_FORMAT {
            return Err(IndexError::format(format!(
                "Unsupported compound file format: {format} (current = {CURRENT_FILE_FORMAT})"
            )));
        }

        let raw_files = value
            .get("files")
            .and_then(|f| f.as_object())
            .ok_or_else(|| {
                IndexError::format(format!("Corrupt {meta_path} file: missing 'files'"))
            })?;
        let mut files = BTreeMap::new();
        for (name, entry) in raw_files {
            let offset = entry.get("offset").and_then(json_to_i64);
            let length = entry.get("length").and_then(json_to_i64);
            let (Some(offset), Some(length)) = (offset, length) else {
                return Err(IndexError::format(format!(
                    "Malformed entry for '{name}' in {meta_path}"
                )));
            };
            // Early versions prefixed entries with the segment directory.
            let name = if format == 1 {
                name.rsplit('/').next().unwrap_or(name).to_string()
            } else {
                name.clone()
            };
            files.insert(
                name,
                SubFileEntry {
                    offset: offset as u64,
                    length: length as u64,
                },
            );
        }

        let data = folder.open_file_in(&format!("{dir}/{CF_FILE}"))?;
        Ok(CompoundFileReader {
            dir: dir.to_string(),
            format,
            files,
            data,
        })
    }

    pub fn format(&self) -> i32 {
        self.format
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Names of the virtual files, sorted.
    pub fn list(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn entry(&self, name: &str) -> Option<SubFileEntry> {
        self.files.get(name).copied()
    }

    pub fn open_in(&self, name: &str) -> Result<InStream> {
        let entry = self.files.get(name).ok_or_else(|| {
            IndexError::not_found(format!("'{name}' not found in {}/{CF_FILE}", self.dir))
        })?;
        self.data
            .reopen(format!("{}/{name}", self.dir), entry.offset, entry.length)
    }
}

/// Numbers in JSON metadata may have been written as strings.
pub(crate) fn json_to_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
