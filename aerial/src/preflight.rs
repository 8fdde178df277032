//! Checks that run before any concurrency starts. A failure here aborts the
//! batch outright; nothing has been downloaded or removed yet.

use std::fs;
use std::path::Path;

use sysinfo::Disks;

use crate::config::AerialConfig;
use crate::error::{AerialError, Result};
use crate::progress::format_size;

/// Verify that the idleassetsd store layout is present on disk.
pub fn verify_store_layout(config: &AerialConfig) -> Result<()> {
    let store = &config.store;
    let required = [
        store.root().to_path_buf(),
        store.strings_file(),
        store.entries_file(),
        store.video_dir(),
    ];

    for path in required {
        if !path.exists() {
            return Err(AerialError::preflight(format!(
                "system path missing: {} (is this macOS, and is the store initialized?)",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Confirm `dir` is writable by creating and removing a probe file.
///
/// The idleassetsd store is root-owned, so a run without sudo fails here
/// instead of halfway through a batch.
pub fn verify_writable(dir: &Path) -> Result<()> {
    let probe = dir.join(".aerial-write-probe");
    fs::write(&probe, b"probe").map_err(|e| {
        AerialError::preflight(format!(
            "{} is not writable: {} (try running with sudo)",
            dir.display(),
            e
        ))
    })?;
    fs::remove_file(&probe)?;
    Ok(())
}

/// Free bytes on the filesystem holding `path`, taken from the disk with the
/// longest matching mount point. 0 when no disk matches.
pub fn available_space(path: &Path) -> u64 {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
        .unwrap_or(0)
}

/// Refuse a download plan that cannot fit on disk. When the free space
/// cannot be determined at all, the batch is allowed through.
pub fn verify_disk_space(path: &Path, required: u64) -> Result<()> {
    let free = available_space(path);
    if free > 0 && required > free {
        return Err(AerialError::preflight(format!(
            "not enough disk space: need {}, {} free",
            format_size(required),
            format_size(free)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_probe_leaves_no_trace() {
        let dir = tempfile::tempdir().expect("tempdir");
        verify_writable(dir.path()).expect("tempdir is writable");
        assert!(
            fs::read_dir(dir.path())
                .expect("read dir")
                .next()
                .is_none()
        );
    }

    #[test]
    fn missing_layout_is_a_preflight_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AerialConfig::new()
            .with_store(aerial_catalog::StorePaths::new(dir.path().join("nope")));
        let err = verify_store_layout(&config).expect_err("layout must be missing");
        assert!(matches!(err, AerialError::Preflight { .. }));
    }

    #[test]
    fn zero_required_bytes_always_fit() {
        verify_disk_space(Path::new("/"), 0).expect("zero bytes fit anywhere");
    }
}
