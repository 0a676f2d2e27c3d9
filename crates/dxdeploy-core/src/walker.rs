//! Project tree traversal.
//!
//! Yields every directory below the project root that holds at least one
//! `.json` file. Directories are produced after their subdirectories, and
//! entries whose name starts with `.` (`.git`, `.env`, ...) are never visited.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, FilterEntry, WalkDir};

use crate::error::DeployError;

/// Default bound on how deep the walker descends below the project root.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A directory that may contain a manifest, with the files found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDir {
    /// Path of the directory.
    pub path: PathBuf,
    /// Files directly inside the directory, sorted by name.
    pub files: Vec<PathBuf>,
}

impl ManifestDir {
    /// Files with a `.json` extension, in name order.
    pub fn json_files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path).filter(|p| is_json(p))
    }
}

struct Frame {
    path: PathBuf,
    depth: usize,
    files: Vec<PathBuf>,
}

impl Frame {
    fn into_manifest_dir(self) -> Option<ManifestDir> {
        self.files
            .iter()
            .any(|f| is_json(f))
            .then_some(ManifestDir {
                path: self.path,
                files: self.files,
            })
    }
}

type VisibleEntries = FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

/// Lazy depth-first walker over a project tree.
///
/// Symlinked directories are followed; a link that loops back to one of its
/// ancestors is skipped with a warning. Any other read error is returned and
/// should end the walk.
pub struct DirectoryWalker {
    entries: VisibleEntries,
    open: Vec<Frame>,
    ready: Vec<ManifestDir>,
    done: bool,
}

impl DirectoryWalker {
    /// Starts a walk below `root`, descending at most `max_depth` levels.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if `root` is missing or not a directory.
    pub fn new(root: &Path, max_depth: usize) -> Result<Self, DeployError> {
        let metadata = std::fs::metadata(root).map_err(|e| {
            DeployError::config(format!(
                "project directory {} is not readable: {e}",
                root.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(DeployError::config(format!(
                "project path {} is not a directory",
                root.display()
            )));
        }

        let entries = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_visible as fn(&DirEntry) -> bool);

        Ok(Self {
            entries,
            open: Vec::new(),
            ready: Vec::new(),
            done: false,
        })
    }

    /// Closes every open directory at `depth` or deeper.
    fn close_from(&mut self, depth: usize) {
        while self.open.last().is_some_and(|f| f.depth >= depth) {
            if let Some(frame) = self.open.pop()
                && let Some(dir) = frame.into_manifest_dir()
            {
                // Deeper frames close first, so pushing to the front keeps
                // children ahead of their parents.
                self.ready.insert(0, dir);
            }
        }
    }

    fn accept(&mut self, entry: DirEntry) {
        let depth = entry.depth();
        self.close_from(depth);

        if entry.file_type().is_dir() {
            self.open.push(Frame {
                path: entry.into_path(),
                depth,
                files: Vec::new(),
            });
        } else if let Some(parent) = self.open.last_mut()
            && parent.depth + 1 == depth
        {
            parent.files.push(entry.into_path());
        }
        // Files directly in the project root have no open frame and are ignored.
    }
}

impl Iterator for DirectoryWalker {
    type Item = Result<ManifestDir, DeployError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(dir) = self.ready.pop() {
                return Some(Ok(dir));
            }
            if self.done {
                return None;
            }

            match self.entries.next() {
                Some(Ok(entry)) => self.accept(entry),
                Some(Err(err)) if err.loop_ancestor().is_some() => {
                    warn!(
                        path = ?err.path(),
                        ancestor = ?err.loop_ancestor(),
                        "Skipping symlink cycle"
                    );
                }
                Some(Err(err)) => {
                    self.done = true;
                    self.open.clear();
                    return Some(Err(DeployError::Walk(err)));
                }
                None => {
                    self.done = true;
                    self.close_from(0);
                }
            }
        }
    }
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "{}").unwrap();
    }

    fn walk(root: &Path) -> Vec<ManifestDir> {
        DirectoryWalker::new(root, DEFAULT_MAX_DEPTH)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn relative(root: &Path, dirs: &[ManifestDir]) -> Vec<String> {
        dirs.iter()
            .map(|d| {
                d.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_yields_children_before_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("api/endpoint.json"));
        touch(&root.join("api/users/get/endpoint.json"));
        touch(&root.join("api/users/list/endpoint.json"));
        touch(&root.join("functions/add/function.json"));

        let dirs = walk(root);
        assert_eq!(
            relative(root, &dirs),
            vec![
                "api/users/get",
                "api/users/list",
                "api",
                "functions/add"
            ]
        );
    }

    #[test]
    fn test_skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join(".git/config.json"));
        touch(&root.join(".env/vars.json"));
        touch(&root.join("api/.hidden/endpoint.json"));
        touch(&root.join("api/get/.draft.json"));
        touch(&root.join("api/get/endpoint.json"));

        let dirs = walk(root);
        assert_eq!(relative(root, &dirs), vec!["api/get"]);
        assert_eq!(dirs[0].files.len(), 1);
    }

    #[test]
    fn test_ignores_root_files_and_dirs_without_json() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("package.json"));
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("scripts/add.dx"), "RETURN 1").unwrap();

        assert!(walk(root).is_empty());
    }

    #[test]
    fn test_collects_auxiliary_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("functions/add/function.json"));
        fs::write(root.join("functions/add/add.dx"), "RETURN a+b").unwrap();

        let dirs = walk(root);
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].files.len(), 2);
        assert_eq!(dirs[0].json_files().count(), 1);
    }

    #[test]
    fn test_respects_max_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("a/b/c/endpoint.json"));
        touch(&root.join("a/endpoint.json"));

        let dirs: Vec<_> = DirectoryWalker::new(root, 2)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(relative(root, &dirs), vec!["a"]);
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DirectoryWalker::new(&tmp.path().join("nope"), DEFAULT_MAX_DEPTH)
            .err()
            .unwrap();
        assert!(matches!(err, DeployError::Config { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("api/get/endpoint.json"));
        std::os::unix::fs::symlink(root.join("api"), root.join("api/get/loop")).unwrap();

        let dirs = walk(root);
        assert_eq!(relative(root, &dirs), vec!["api/get"]);
    }
}
