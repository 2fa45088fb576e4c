//! Directory walking for batch registration and verification

use imgaudit_errors::{Error, StorageError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Collect every regular file under `root` whose name ends with one of
/// `extensions`, sorted by path.
///
/// Extensions are expected in normalized form (`.scn`); matching ignores
/// case. An empty list matches every file. Symlinks are skipped unless
/// `follow_symlinks` is set, in which case each directory is entered once.
///
/// # Errors
///
/// Returns `DirectoryNotFound` if `root` is not a directory, or an I/O
/// error if a directory cannot be read.
pub async fn collect_matching_files(
    root: &Path,
    extensions: &[String],
    follow_symlinks: bool,
) -> Result<Vec<PathBuf>, Error> {
    match tokio::fs::metadata(root).await {
        Ok(metadata) if metadata.is_dir() => {}
        _ => {
            return Err(StorageError::DirectoryNotFound {
                path: root.to_path_buf(),
            }
            .into())
        }
    }

    let mut walker = Walker {
        extensions,
        follow_symlinks,
        visited: HashSet::new(),
        files: Vec::new(),
    };
    walker.walk(root).await?;

    let mut files = walker.files;
    files.sort();
    tracing::debug!(root = %root.display(), matched = files.len(), "directory scanned");
    Ok(files)
}

/// Whether a file name carries one of the extensions
#[must_use]
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_lowercase();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

struct Walker<'a> {
    extensions: &'a [String],
    follow_symlinks: bool,
    visited: HashSet<PathBuf>,
    files: Vec<PathBuf>,
}

impl Walker<'_> {
    async fn walk(&mut self, dir: &Path) -> Result<(), Error> {
        if self.follow_symlinks {
            let real = tokio::fs::canonicalize(dir)
                .await
                .map_err(|e| Error::io_with_path(&e, dir))?;
            if !self.visited.insert(real) {
                return Ok(());
            }
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| Error::io_with_path(&e, dir))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(&e, dir))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io_with_path(&e, &path))?;

            let (is_dir, is_file) = if file_type.is_symlink() {
                if !self.follow_symlinks {
                    continue;
                }
                match tokio::fs::metadata(&path).await {
                    Ok(target) => (target.is_dir(), target.is_file()),
                    // Dangling link
                    Err(_) => continue,
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };

            if is_dir {
                Box::pin(self.walk(&path)).await?;
            } else if is_file && matches_extension(&path, self.extensions) {
                self.files.push(path);
            }
        }

        Ok(())
    }
}
