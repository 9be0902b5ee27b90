use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;

/// File-name globs for documents that never trigger suggestions.
///
/// Patterns match the file name only (`.*` matches `.gitignore` in any
/// directory). Malformed patterns are logged and ignored. Verdicts are cached
/// per path.
#[derive(Debug)]
pub struct FileBlacklist {
    globs: GlobSet,
    cache: Mutex<HashMap<PathBuf, bool>>,
}

impl FileBlacklist {
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sift.config",
                        pattern = %pattern,
                        error = %err,
                        "ignoring invalid file blacklist glob"
                    );
                }
            }
        }

        let globs = builder.build().unwrap_or_else(|err| {
            tracing::warn!(
                target: "sift.config",
                error = %err,
                "failed to build file blacklist; no files are blacklisted"
            );
            GlobSet::empty()
        });

        Self {
            globs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_blacklisted(&self, path: &Path) -> bool {
        if let Some(&hit) = self.cache.lock().get(path) {
            return hit;
        }

        let hit = path
            .file_name()
            .is_some_and(|name| self.globs.is_match(Path::new(name)));
        self.cache.lock().insert(path.to_path_buf(), hit);
        hit
    }
}

impl Default for FileBlacklist {
    fn default() -> Self {
        Self::new(&[])
    }
}
