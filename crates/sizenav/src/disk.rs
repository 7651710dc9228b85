//! Usage of the partition holding the directory being browsed.

use crate::format::format_size;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub available: u64,
}

impl DiskUsage {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used() as f64 / self.total as f64 * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "Disk {}: {} free of {} ({:.1}% used)",
            self.mount_point.display(),
            format_size(self.available),
            format_size(self.total),
            self.used_percent()
        )
    }
}

/// Look up the mounted filesystem containing `path`.
pub fn disk_usage_for(path: &Path) -> Option<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<PathBuf> = disks
        .list()
        .iter()
        .map(|disk| disk.mount_point().to_path_buf())
        .collect();

    let index = covering_mount(path, &mounts)?;
    let disk = &disks.list()[index];
    Some(DiskUsage {
        mount_point: mounts[index].clone(),
        total: disk.total_space(),
        available: disk.available_space(),
    })
}

/// Index of the deepest mount point that is a prefix of `path`.
fn covering_mount(path: &Path, mounts: &[PathBuf]) -> Option<usize> {
    mounts
        .iter()
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_mount_prefers_deepest() {
        let mounts = vec![
            PathBuf::from("/"),
            PathBuf::from("/home"),
            PathBuf::from("/home/clp/backups"),
            PathBuf::from("/homework"),
        ];

        assert_eq!(covering_mount(Path::new("/home/clp/backups/2024"), &mounts), Some(2));
        assert_eq!(covering_mount(Path::new("/home/other"), &mounts), Some(1));
        assert_eq!(covering_mount(Path::new("/homework/x"), &mounts), Some(3));
        assert_eq!(covering_mount(Path::new("/etc"), &mounts), Some(0));
    }

    #[test]
    fn test_covering_mount_without_match() {
        let mounts = vec![PathBuf::from("/mnt/data")];
        assert_eq!(covering_mount(Path::new("/etc"), &mounts), None);
        assert_eq!(covering_mount(Path::new("/etc"), &[]), None);
    }

    #[test]
    fn test_summary() {
        let usage = DiskUsage {
            mount_point: PathBuf::from("/"),
            total: 4 * 1024 * 1024 * 1024,
            available: 1024 * 1024 * 1024,
        };
        assert_eq!(usage.used(), 3 * 1024 * 1024 * 1024);
        assert_eq!(
            usage.summary(),
            "Disk /: 1.00 GB free of 4.00 GB (75.0% used)"
        );
    }

    #[test]
    fn test_empty_disk_percent() {
        let usage = DiskUsage {
            mount_point: PathBuf::from("/proc"),
            total: 0,
            available: 0,
        };
        assert_eq!(usage.used_percent(), 0.0);
    }
}
