use crate::error::{CatalogError, Result};
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pattern used when none is given.
pub const DEFAULT_PATTERN: &str = "*.nc";

/// Matching files of one directory, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanBatch {
    pub directory: PathBuf,
    pub files: Vec<String>,
}

/// Scanner for finding data files below a directory
pub struct FileScanner {
    root: PathBuf,
    pattern: String,
    recurse: bool,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pattern: DEFAULT_PATTERN.to_string(),
            recurse: false,
        }
    }

    /// Glob matched against bare file names, e.g. `*.nc` or `h0.*.nc`.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn recursive(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Scan for matching files, grouped per directory.
    ///
    /// Hidden files and directories are skipped. The root directory comes
    /// first, subdirectories follow in path order.
    pub fn scan(&self) -> Result<Vec<ScanBatch>> {
        if !self.root.is_dir() {
            return Err(CatalogError::ScanError(format!(
                "Unable to open directory \"{}\"",
                self.root.display()
            )));
        }
        let matcher = compile_pattern(&self.pattern)?;

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .hidden(true) // do not index hidden files
            .sort_by_file_name(|a, b| a.cmp(b));
        if !self.recurse {
            builder.max_depth(Some(1));
        }

        let mut batches: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }
                    let Some(name) = entry.file_name().to_str() else {
                        log::warn!("Skipping non UTF-8 file name {}", entry.path().display());
                        continue;
                    };
                    if !matcher.is_match(name) {
                        continue;
                    }
                    let directory = entry
                        .path()
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    batches.entry(directory).or_default().push(name.to_string());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        let batches: Vec<ScanBatch> = batches
            .into_iter()
            .map(|(directory, mut files)| {
                files.sort();
                ScanBatch { directory, files }
            })
            .collect();
        log::info!(
            "Found {} files matching \"{}\" in {} directories",
            batches.iter().map(|b| b.files.len()).sum::<usize>(),
            self.pattern,
            batches.len()
        );
        Ok(batches)
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| CatalogError::ScanError(format!("Invalid glob pattern \"{pattern}\": {e}")))?;
    Ok(glob.compile_matcher())
}

/// Split a search string like `data/run1/*.nc` into directory and pattern.
///
/// Without a `/` the current directory is searched; an empty pattern
/// matches every file.
pub fn split_search(search: &str) -> Result<(PathBuf, String)> {
    if search.is_empty() {
        return Err(CatalogError::ScanError("empty search string".to_string()));
    }
    let (directory, pattern) = match search.rfind('/') {
        Some(ix) => (&search[..=ix], &search[ix + 1..]),
        None => ("./", search),
    };
    let pattern = if pattern.is_empty() { "*" } else { pattern };
    Ok((PathBuf::from(directory), pattern.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn populate(root: &Path) {
        for name in ["b.nc", "a.nc", "notes.txt", ".hidden.nc"] {
            fs::write(root.join(name), b"{}").unwrap();
        }
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("c.nc"), b"{}").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("d.nc"), b"{}").unwrap();
    }

    #[test]
    fn flat_scan_sorts_and_filters() {
        let temp = tempdir().unwrap();
        populate(temp.path());

        let batches = FileScanner::new(temp.path()).scan().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].directory, temp.path());
        assert_eq!(batches[0].files, vec!["a.nc", "b.nc"]);
    }

    #[test]
    fn recursive_scan_skips_hidden_directories() {
        let temp = tempdir().unwrap();
        populate(temp.path());

        let batches = FileScanner::new(temp.path())
            .recursive(true)
            .scan()
            .unwrap();
        let directories: Vec<_> = batches.iter().map(|b| b.directory.clone()).collect();
        assert_eq!(directories, vec![temp.path().to_path_buf(), temp.path().join("sub")]);
        assert_eq!(batches[1].files, vec!["c.nc"]);
    }

    #[test]
    fn custom_pattern_and_missing_directory() {
        let temp = tempdir().unwrap();
        populate(temp.path());

        let batches = FileScanner::new(temp.path())
            .with_pattern("*.txt")
            .scan()
            .unwrap();
        assert_eq!(batches[0].files, vec!["notes.txt"]);

        let err = FileScanner::new(temp.path().join("missing")).scan().unwrap_err();
        assert!(matches!(err, CatalogError::ScanError(_)));
    }

    #[test]
    fn splits_search_strings() {
        assert_eq!(
            split_search("data/run1/*.nc").unwrap(),
            (PathBuf::from("data/run1/"), "*.nc".to_string())
        );
        assert_eq!(
            split_search("*.nc").unwrap(),
            (PathBuf::from("./"), "*.nc".to_string())
        );
        assert_eq!(
            split_search("data/").unwrap(),
            (PathBuf::from("data/"), "*".to_string())
        );
        assert!(split_search("").is_err());
    }
}
