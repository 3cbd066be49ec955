//! Advisory data-directory lock.
//!
//! Exactly one pipeline process may write a data directory at a time. The
//! lock file holds the owner's pid; a lock left behind by a dead process is
//! reclaimed on the next acquisition.

use cascata_types::{CascataError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "cascata.lock";

/// A held data-directory lock, released on drop.
#[derive(Debug)]
pub struct PipelineLock {
    path: PathBuf,
}

impl PipelineLock {
    /// Acquires the lock for a data directory.
    ///
    /// # Errors
    ///
    /// Returns [`CascataError::Locked`] when another live process holds
    /// the lock, or an I/O error if the lock file cannot be created.
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(LOCK_FILE);

        match Self::try_create(&path) {
            Ok(lock) => Ok(lock),
            Err(CascataError::Locked { pid, .. }) if !is_process_running(pid) => {
                tracing::warn!(pid, path = %path.display(), "reclaiming stale lock");
                fs::remove_file(&path)?;
                Self::try_create(&path)
            }
            Err(e) => Err(e),
        }
    }

    fn try_create(path: &Path) -> Result<Self> {
        match fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                file.sync_all()?;
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let pid = fs::read_to_string(path)
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(0);
                Err(CascataError::Locked {
                    path: path.to_path_buf(),
                    pid,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for PipelineLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

/// Checks whether a process with the given pid is alive.
#[must_use]
fn is_process_running(pid: u32) -> bool {
    // No real pid is 0 or above i32::MAX; `kill` would reinterpret such a
    // value as a process-group target and report it alive.
    if pid == 0 || i32::try_from(pid).is_err() {
        return false;
    }

    // Signal 0 probes for existence without delivering anything.
    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}")])
            .output()
            .map(|output| String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCK_FILE);

        let lock = PipelineLock::acquire(dir.path()).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_live_lock_is_contended() {
        let dir = TempDir::new().unwrap();
        // A lock held by this very process is as live as it gets.
        let _held = PipelineLock::acquire(dir.path()).unwrap();

        let err = PipelineLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            CascataError::Locked { pid, .. } if pid == std::process::id()
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        // A child that has already been reaped leaves a genuinely dead pid.
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        fs::write(dir.path().join(LOCK_FILE), pid.to_string()).unwrap();

        let lock = PipelineLock::acquire(dir.path()).unwrap();
        drop(lock);
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_out_of_range_pid_is_stale() {
        let dir = TempDir::new().unwrap();
        // Larger than any valid pid; `kill` would alias it to -1.
        fs::write(dir.path().join(LOCK_FILE), u32::MAX.to_string()).unwrap();

        assert!(PipelineLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_garbage_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "not a pid").unwrap();

        assert!(PipelineLock::acquire(dir.path()).is_ok());
    }
}
