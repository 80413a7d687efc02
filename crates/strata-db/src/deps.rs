//! Dependency reporting.
//!
//! The incremental builder needs to know every file that was consulted
//! while producing an output. Rather than an ambient build context, the
//! pad carries an explicit, optional [`DependencySink`]; entry points
//! that consult files report through it. A pad without a sink makes
//! reporting a no-op.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Receives "file F was consulted" notifications. Implementations must
/// tolerate repeated calls with the same filename.
pub trait DependencySink: Send + Sync {
    fn record_dependency(&self, filename: &Path);
}

/// A simple sink that collects the distinct set of consulted files.
#[derive(Debug, Default)]
pub struct CollectedDependencies {
    files: Mutex<BTreeSet<PathBuf>>,
}

impl CollectedDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the files reported so far, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().iter().cloned().collect()
    }

    pub fn contains(&self, filename: &Path) -> bool {
        self.files.lock().contains(filename)
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl DependencySink for CollectedDependencies {
    fn record_dependency(&self, filename: &Path) {
        self.files.lock().insert(filename.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_distinct() {
        let sink = CollectedDependencies::new();
        sink.record_dependency(Path::new("/a"));
        sink.record_dependency(Path::new("/b"));
        sink.record_dependency(Path::new("/a"));
        assert_eq!(sink.len(), 2);
        assert!(sink.contains(Path::new("/a")));
    }
}
