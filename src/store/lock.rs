//! Advisory lock files shared between processes.
//!
//! A lock is a JSON file under `locks/` naming the pid and host of its
//! holder. Files are created atomically by writing a private temp file and
//! hard-linking it into place, so a half-written lock file is never visible.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::store::Folder;
use crate::store::shared_lock::SharedLock;

pub(crate) const LOCK_DIR: &str = "locks";

lazy_static! {
    static ref LOCK_NAME: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
}

#[derive(Debug, Serialize, Deserialize)]
struct LockFileData {
    pid: serde_json::Value,
    host: String,
    name: String,
}

impl LockFileData {
    fn pid(&self) -> Option<u32> {
        match &self.pid {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// True if a process with `pid` is still running on this host.
pub(crate) fn pid_active(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc").join(pid.to_string()).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        true
    }
}

/// Split a request temp file name `<stem>.lock.<host>.<pid>`.
pub(crate) fn parse_link_file(entry: &str) -> Option<(&str, &str, u32)> {
    let (stem, rest) = entry.split_once(".lock.")?;
    let (host, pid) = rest.rsplit_once('.')?;
    Some((stem, host, pid.parse().ok()?))
}

/// Poll `request` every `interval_ms` until it succeeds or `timeout_ms`
/// has fully elapsed.
pub(crate) fn poll_lock<F>(
    name: &str,
    timeout_ms: u64,
    interval_ms: u64,
    mut request: F,
) -> Result<()>
where
    F: FnMut() -> Result<Option<String>>,
{
    let timeout = Duration::from_millis(timeout_ms);
    let start = Instant::now();
    loop {
        let failure = match request()? {
            None => return Ok(()),
            Some(message) => message,
        };
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            log::warn!(
                "Giving up on lock '{name}' after {}ms: {failure}",
                elapsed.as_millis()
            );
            return Err(IndexError::lock_timeout(
                name,
                elapsed.as_millis() as u64,
                failure,
            ));
        }
        let remaining = timeout - elapsed;
        thread::sleep(remaining.min(Duration::from_millis(interval_ms)));
    }
}

/// An exclusive lock file at `locks/<name>.lock`.
pub struct Lock {
    folder: Arc<dyn Folder>,
    name: String,
    host: String,
    timeout_ms: u64,
    interval_ms: u64,
    lock_path: String,
    held: bool,
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("timeout_ms", &self.timeout_ms)
            .field("interval_ms", &self.interval_ms)
            .field("lock_path", &self.lock_path)
            .field("held", &self.held)
            .finish()
    }
}

impl Lock {
    /// Create a lock handle. Nothing touches the folder until it is requested.
    pub fn new<N, H>(
        folder: Arc<dyn Folder>,
        name: N,
        host: H,
        timeout_ms: u64,
        interval_ms: u64,
    ) -> Result<Self>
    where
        N: Into<String>,
        H: Into<String>,
    {
        let name = name.into();
        if interval_ms == 0 {
            return Err(IndexError::invalid_argument(format!(
                "Invalid value for 'interval': {interval_ms}"
            )));
        }
        if !LOCK_NAME.is_match(&name) {
            return Err(IndexError::invalid_argument(format!(
                "Lock name contains disallowed characters: '{name}'"
            )));
        }
        let lock_path = format!("{LOCK_DIR}/{name}.lock");
        Ok(Lock {
            folder,
            name,
            host: host.into(),
            timeout_ms,
            interval_ms,
            lock_path,
            held: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn lock_path(&self) -> &str {
        &self.lock_path
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// True if this handle currently owns its lock file.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub(crate) fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    pub(crate) fn set_lock_path(&mut self, path: String) {
        self.lock_path = path;
    }

    /// Make one attempt at the exclusive lock.
    pub fn request_exclusive(&mut self) -> Result<bool> {
        Ok(self.try_request()?.is_none())
    }

    /// Poll for the exclusive lock until the timeout is exhausted.
    pub fn obtain_exclusive(&mut self) -> Result<()> {
        let name = self.name.clone();
        let (timeout_ms, interval_ms) = (self.timeout_ms, self.interval_ms);
        poll_lock(&name, timeout_ms, interval_ms, || self.try_request())?;
        log::debug!("Obtained lock '{}'", self.lock_path);
        Ok(())
    }

    /// One attempt at creating the lock file at the current lock path.
    /// Returns the reason for failure when the lock is taken.
    pub(crate) fn try_request(&mut self) -> Result<Option<String>> {
        let folder = Arc::clone(&self.folder);
        if folder.exists(&self.lock_path) {
            return Ok(Some(format!("Can't obtain lock: '{}' exists", self.lock_path)));
        }

        if !folder.exists(LOCK_DIR) {
            if let Err(e) = folder.mkdir(LOCK_DIR) {
                // Another process may have won the race to create it.
                if !folder.is_directory(LOCK_DIR) {
                    return Err(e);
                }
            }
        }

        let data = LockFileData {
            pid: serde_json::Value::from(std::process::id()),
            host: self.host.clone(),
            name: self.name.clone(),
        };
        let json = serde_json::to_string_pretty(&data)?;
        let link_path = format!("{}.{}.{}", self.lock_path, self.host, std::process::id());
        if folder.exists(&link_path) {
            // Left by an earlier process with the same pid that died mid-request.
            log::debug!("Removing leftover lock link '{link_path}'");
            folder.delete(&link_path)?;
        }

        let mut out = folder.open_out(&link_path)?;
        let written = out.write_bytes(json.as_bytes()).and_then(|_| out.close());
        drop(out);

        let outcome = match written {
            Ok(()) => match folder.hard_link(&link_path, &self.lock_path) {
                Ok(()) => {
                    self.held = true;
                    None
                }
                Err(e) => Some(format!("Failed to obtain lock at '{}': {e}", self.lock_path)),
            },
            Err(e) => Some(format!("Failed to obtain lock at '{}': {e}", self.lock_path)),
        };

        if !folder.delete(&link_path)? {
            return Err(IndexError::internal(format!("Failed to delete '{link_path}'")));
        }
        Ok(outcome)
    }

    /// Delete the lock file if this handle holds it.
    pub fn release(&mut self) -> Result<()> {
        if self.held {
            if self.folder.exists(&self.lock_path) {
                self.maybe_delete_file(&self.lock_path, true, false)?;
            }
            self.held = false;
        }
        Ok(())
    }

    /// True if anybody holds the lock.
    pub fn is_locked(&self) -> bool {
        self.folder.exists(&self.lock_path)
    }

    /// Remove the lock file if it was left behind by a dead process on this
    /// host, along with any request temp files such processes left.
    pub fn clear_stale(&self) -> Result<bool> {
        self.clear_stale_links(|stem| stem == self.name)?;
        self.maybe_delete_file(&self.lock_path, false, true)
    }

    /// Delete `locks/<stem>.lock.<host>.<pid>` files of this host whose pid
    /// is dead, for every stem accepted by `owns_stem`.
    pub(crate) fn clear_stale_links<F>(&self, owns_stem: F) -> Result<usize>
    where
        F: Fn(&str) -> bool,
    {
        if !self.folder.is_directory(LOCK_DIR) {
            return Ok(0);
        }
        let mut cleared = 0;
        for entry in self.folder.list(LOCK_DIR)? {
            let Some((stem, host, pid)) = parse_link_file(&entry) else {
                continue;
            };
            if host != self.host || !owns_stem(stem) || pid_active(pid) {
                continue;
            }
            let path = format!("{LOCK_DIR}/{entry}");
            if self.folder.delete(&path)? {
                log::info!("Cleared stale lock link '{path}' left by pid {pid}");
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Delete `path` if it is a lock file of ours, either belonging to this
    /// process (`delete_mine`) or to a dead one (`delete_other`).
    pub(crate) fn maybe_delete_file(
        &self,
        path: &str,
        delete_mine: bool,
        delete_other: bool,
    ) -> Result<bool> {
        let Some(rest) = path.strip_prefix(LOCK_DIR).and_then(|p| p.strip_prefix('/')) else {
            return Ok(false);
        };
        if !rest.starts_with(&self.name) || !self.folder.exists(path) {
            return Ok(false);
        }

        let data: LockFileData = match self.folder.read_json(path) {
            Ok(data) => data,
            Err(e) => {
                log::debug!("Ignoring unreadable lock file '{path}': {e}");
                return Ok(false);
            }
        };
        if data.host != self.host || data.name != self.name {
            return Ok(false);
        }
        let Some(pid) = data.pid() else {
            return Ok(false);
        };

        let mine = pid == std::process::id();
        if (delete_mine && mine) || (delete_other && !pid_active(pid)) {
            if !self.folder.delete(path)? {
                return Err(IndexError::internal(format!("Can't delete '{path}'")));
            }
            if !mine {
                log::info!("Cleared stale lock file '{path}' left by pid {pid}");
            }
            return Ok(true);
        }
        Ok(false)
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Failed to release lock '{}': {e}", self.lock_path);
        }
    }
}

/// Builds lock handles against one folder on behalf of one host.
#[derive(Debug, Clone)]
pub struct LockFactory {
    folder: Arc<dyn Folder>,
    host: String,
}

impl LockFactory {
    pub fn new<H: Into<String>>(folder: Arc<dyn Folder>, host: H) -> Self {
        LockFactory {
            folder,
            host: host.into(),
        }
    }

    pub fn make_lock(&self, name: &str, timeout_ms: u64, interval_ms: u64) -> Result<Lock> {
        Lock::new(
            Arc::clone(&self.folder),
            name,
            self.host.clone(),
            timeout_ms,
            interval_ms,
        )
    }

    pub fn make_shared_lock(
        &self,
        name: &str,
        timeout_ms: u64,
        interval_ms: u64,
    ) -> Result<SharedLock> {
        SharedLock::new(
            Arc::clone(&self.folder),
            name,
            self.host.clone(),
            timeout_ms,
            interval_ms,
        )
    }
}
