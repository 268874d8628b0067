//! Lock which may be held by several readers at once.
//!
//! Each holder owns its own file `locks/<name>-<n>.lock`, where `n` is the
//! first free counter value. The lock counts as held while any such file
//! exists.

use std::sync::Arc;

use crate::error::{IndexError, Result};
use crate::store::Folder;
use crate::store::lock::{LOCK_DIR, Lock, poll_lock};

#[derive(Debug)]
pub struct SharedLock {
    inner: Lock,
}

impl SharedLock {
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
        let mut inner = Lock::new(folder, name, host, timeout_ms, interval_ms)?;
        inner.set_lock_path(String::new());
        Ok(SharedLock { inner })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Path of the file this handle holds, empty when not held.
    pub fn lock_path(&self) -> &str {
        self.inner.lock_path()
    }

    pub fn is_held(&self) -> bool {
        self.inner.is_held()
    }

    fn try_request(&mut self) -> Result<Option<String>> {
        if self.inner.is_held() {
            return Err(IndexError::contract(format!(
                "Lock already obtained via '{}'",
                self.inner.lock_path()
            )));
        }
        let folder = Arc::clone(self.inner.folder());
        let mut counter = 0u32;
        let path = loop {
            counter += 1;
            let candidate = format!("{LOCK_DIR}/{}-{counter}.lock", self.inner.name());
            if !folder.exists(&candidate) {
                break candidate;
            }
        };
        self.inner.set_lock_path(path);
        let outcome = self.inner.try_request()?;
        if outcome.is_some() {
            self.inner.set_lock_path(String::new());
        }
        Ok(outcome)
    }

    /// Make one attempt at taking a share of the lock.
    pub fn request_shared(&mut self) -> Result<bool> {
        Ok(self.try_request()?.is_none())
    }

    /// Poll for a share of the lock until the timeout is exhausted.
    pub fn obtain_shared(&mut self) -> Result<()> {
        let name = self.inner.name().to_string();
        let (timeout_ms, interval_ms) = (self.inner.timeout_ms(), self.inner.interval_ms());
        poll_lock(&name, timeout_ms, interval_ms, || self.try_request())?;
        log::debug!("Obtained shared lock '{}'", self.inner.lock_path());
        Ok(())
    }

    /// Give up this handle's share.
    pub fn release(&mut self) -> Result<()> {
        if self.inner.is_held() {
            self.inner.release()?;
            self.inner.set_lock_path(String::new());
        }
        Ok(())
    }

    /// Matching entries of the lock directory.
    fn lock_files(&self) -> Result<Vec<String>> {
        let folder = self.inner.folder();
        if !folder.is_directory(LOCK_DIR) {
            return Ok(Vec::new());
        }
        Ok(folder.list(LOCK_DIR)?)
    }

    /// True if `stem` names one of this lock's shares, `<name>-<counter>`.
    fn is_share_stem(&self, stem: &str) -> bool {
        stem.strip_prefix(self.inner.name())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|counter| {
                !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit())
            })
    }

    /// True if anybody holds a share of the lock.
    pub fn is_locked(&self) -> Result<bool> {
        for entry in self.lock_files()? {
            if let Some(stem) = entry.strip_suffix(".lock")
                && self.is_share_stem(stem)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove any shares left behind by dead processes on this host, and the
    /// request temp files they left. Returns the number of shares cleared.
    pub fn clear_stale(&self) -> Result<usize> {
        self.inner.clear_stale_links(|stem| self.is_share_stem(stem))?;
        let mut cleared = 0;
        for entry in self.lock_files()? {
            if entry.starts_with(self.inner.name()) && entry.ends_with(".lock") {
                let candidate = format!("{LOCK_DIR}/{entry}");
                if self.inner.maybe_delete_file(&candidate, false, true)? {
                    cleared += 1;
                }
            }
        }
        Ok(cleared)
    }
}
