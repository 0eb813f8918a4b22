//! Filesystem walking for substring matches.
//!
//! ## Module Structure
//!
//! - `roots` - Discovery of the top-level roots a search fans out across
//! - `walker` - Parallel recursive walk sharing one result cap across all roots

mod roots;
mod walker;

// Re-export main types
pub use roots::{default_ignored_dirs, desktop_root, mounted_volumes, SearchRoots};
pub use walker::{PathWalker, WalkSummary};
