//! Top-level search roots: mounted volumes plus the desktop directory.

use std::path::PathBuf;

use sysinfo::Disks;

/// Where a search fans out from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchRoots {
    #[default]
    /// Every ready mounted volume plus the user's desktop, discovered per search.
    System,
    /// An explicit list of roots.
    Fixed(Vec<PathBuf>),
}

impl SearchRoots {
    pub fn system() -> Self {
        Self::System
    }

    pub fn fixed(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::Fixed(roots.into_iter().collect())
    }

    /// Returns the roots to walk, with duplicates and nested roots removed.
    ///
    /// Volumes are re-enumerated on every call so newly mounted drives are
    /// picked up without restarting.
    pub fn resolve(&self) -> Vec<PathBuf> {
        let roots = match self {
            Self::System => {
                let mut roots = mounted_volumes();
                roots.extend(desktop_root());
                roots
            }
            Self::Fixed(roots) => roots.clone(),
        };
        collapse_nested(roots)
    }
}

/// Lists mount points of volumes that are currently readable directories.
pub fn mounted_volumes() -> Vec<PathBuf> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| disk.mount_point().to_path_buf())
        .filter(|mount_point| mount_point.is_dir())
        .collect()
}

/// The user's desktop directory, if it exists.
pub fn desktop_root() -> Option<PathBuf> {
    dirs::desktop_dir().filter(|dir| dir.is_dir())
}

/// Pseudo-filesystems that never contain user files.
pub fn default_ignored_dirs() -> Vec<PathBuf> {
    #[cfg(unix)]
    let dirs: &[&str] = &["/proc", "/sys", "/dev", "/run"];
    #[cfg(not(unix))]
    let dirs: &[&str] = &[];

    dirs.iter().map(PathBuf::from).collect()
}

/// Drops roots that equal or sit below another root, keeping first-seen order.
///
/// The walker crosses mount boundaries, so a nested root would otherwise be
/// enumerated once more for every root containing it.
pub(crate) fn collapse_nested(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if kept.iter().any(|outer| root.starts_with(outer)) {
            continue;
        }
        kept.retain(|inner| !inner.starts_with(&root));
        kept.push(root);
    }
    kept
}
