// Free disk space check run before a new data file is created.

use std::path::Path;
use sysinfo::Disks;
use tracing::{debug, warn};

/// Answers whether `dir` has room for a new data file.
pub trait SpaceCheck: Send + Sync {
    fn has_free_space(&self, dir: &Path) -> bool;
}

impl<F> SpaceCheck for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn has_free_space(&self, dir: &Path) -> bool {
        self(dir)
    }
}

/// Compares the available space of the filesystem mounted under `dir`
/// against a fixed minimum.
#[derive(Debug, Clone, Copy)]
pub struct DiskSpaceCheck {
    min_free_bytes: u64,
}

impl DiskSpaceCheck {
    pub fn new(min_free_bytes: u64) -> Self {
        Self { min_free_bytes }
    }

    pub fn from_mib(mib: u64) -> Self {
        Self::new(mib.saturating_mul(1024 * 1024))
    }
}

impl SpaceCheck for DiskSpaceCheck {
    fn has_free_space(&self, dir: &Path) -> bool {
        if self.min_free_bytes == 0 {
            return true;
        }
        let dir = match dir.canonicalize() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, dir = %dir.display(), "free space check: cannot resolve directory");
                return false;
            }
        };

        let disks = Disks::new_with_refreshed_list();
        // Innermost mount wins.
        let disk = disks
            .list()
            .iter()
            .filter(|d| dir.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len());

        match disk {
            Some(d) => {
                let available = d.available_space();
                debug!(
                    dir = %dir.display(),
                    mount = %d.mount_point().display(),
                    available,
                    required = self.min_free_bytes,
                    "free space check"
                );
                available >= self.min_free_bytes
            }
            None => {
                warn!(dir = %dir.display(), "free space check: no mounted filesystem found, skipping");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_minimum_always_passes() {
        let check = DiskSpaceCheck::new(0);
        assert!(check.has_free_space(Path::new("/definitely/not/here")));
    }

    #[test]
    fn unresolvable_dir_fails() {
        let check = DiskSpaceCheck::from_mib(1);
        assert!(!check.has_free_space(Path::new("/definitely/not/here")));
    }

    #[test]
    fn closures_act_as_checks() {
        let check: &dyn SpaceCheck = &|p: &Path| p.ends_with("ok");
        assert!(check.has_free_space(Path::new("/data/ok")));
        assert!(!check.has_free_space(Path::new("/data/full")));
    }
}
