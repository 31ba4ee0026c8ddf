use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Advisory lock file guarding a state file for the duration of an
/// apply/destroy run. Two reconcilers sharing a state file is undefined
/// behavior, so the second acquire fails loudly instead.
#[derive(Debug)]
pub struct StateLock {
    lock_path: PathBuf,
}

impl StateLock {
    /// Acquire the lock next to the state file. Fails if it already exists.
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let lock_path = state_path.with_extension("lock");

        if lock_path.exists() {
            bail!(
                "State file '{}' is locked. Another aquaform run may be in progress; \
                 remove '{}' if that is not the case.",
                state_path.display(),
                lock_path.display()
            );
        }

        let lock_info = format!(
            "pid={}\ntime={}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        fs::write(&lock_path, lock_info)?;

        Ok(Self { lock_path })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
