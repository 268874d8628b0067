//! Naming conventions for index files.

use crate::error::Result;
use crate::store::Folder;
use crate::util::base36::{from_base36, to_base36};

pub const SNAPSHOT_PREFIX: &str = "snapshot_";
pub const SCHEMA_PREFIX: &str = "schema_";
pub const SEGMENT_PREFIX: &str = "seg_";

/// Generation encoded in a file name such as `snapshot_2z.json` or
/// `seg_a`. Returns 0 when the name carries no generation.
pub fn extract_gen(name: &str) -> u64 {
    let stem = name.rsplit('/').next().unwrap_or(name);
    let Some(underscore) = stem.rfind('_') else {
        return 0;
    };
    let rest = &stem[underscore + 1..];
    let digits = match rest.find('.') {
        Some(dot) => &rest[..dot],
        None => rest,
    };
    from_base36(digits).unwrap_or(0)
}

/// The last path component.
pub fn local_part(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

pub fn snapshot_file_name(generation: u64) -> String {
    format!("{SNAPSHOT_PREFIX}{}.json", to_base36(generation))
}

pub fn schema_file_name(generation: u64) -> String {
    format!("{SCHEMA_PREFIX}{}.json", to_base36(generation))
}

pub fn is_snapshot_file(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
}

pub fn is_schema_file(name: &str) -> bool {
    name.starts_with(SCHEMA_PREFIX) && name.ends_with(".json")
}

/// Name of the snapshot file with the highest generation, if any.
pub fn latest_snapshot(folder: &dyn Folder) -> Result<Option<String>> {
    let mut best: Option<(u64, String)> = None;
    for entry in folder.list("")? {
        if !is_snapshot_file(&entry) {
            continue;
        }
        let generation = extract_gen(&entry);
        if best.as_ref().is_none_or(|(g, _)| generation > *g) {
            best = Some((generation, entry));
        }
    }
    Ok(best.map(|(_, name)| name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamFolder;

    #[test]
    fn test_extract_gen() {
        assert_eq!(extract_gen("snapshot_2z.json"), 107);
        assert_eq!(extract_gen("seg_a"), 10);
        assert_eq!(extract_gen("seg_1/lexicon-1.dat"), 0);
        assert_eq!(extract_gen("merge.json"), 0);
        assert_eq!(local_part("foo/bar/seg_3"), "seg_3");
    }

    #[test]
    fn test_latest_snapshot() {
        let folder = RamFolder::new();
        assert!(latest_snapshot(&folder).unwrap().is_none());
        for name in ["snapshot_9.json", "snapshot_a.json", "snapshot_2.json", "schema_z.json"] {
            folder.open_out(name).unwrap().close().unwrap();
        }
        assert_eq!(
            latest_snapshot(&folder).unwrap().as_deref(),
            Some("snapshot_a.json")
        );
    }
}
