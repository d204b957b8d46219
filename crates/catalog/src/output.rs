use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables consulted, in order, for this process' rank.
pub const RANK_VARIABLES: &[&str] = &[
    "AUTOCURATOR_RANK",
    "OMPI_COMM_WORLD_RANK",
    "PMI_RANK",
    "SLURM_PROCID",
];

/// Result of a catalog write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// Not the primary process; nothing was written.
    Suppressed,
}

/// Rank of this process as reported by `lookup`; `None` outside a job.
pub fn rank_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<u32> {
    RANK_VARIABLES.iter().find_map(|name| {
        let value = lookup(name)?;
        match value.trim().parse::<u32>() {
            Ok(rank) => Some(rank),
            Err(_) => {
                log::warn!("Ignoring non-numeric {name}={value}");
                None
            }
        }
    })
}

/// Whether this process may write catalog output (rank 0 or no rank).
pub fn is_primary_process() -> bool {
    rank_from_env(|name| std::env::var(name).ok()).map_or(true, |rank| rank == 0)
}

/// Render and write `path` on the primary process only.
pub fn write_primary(path: &Path, render: impl FnOnce() -> Result<String>) -> Result<WriteOutcome> {
    if !is_primary_process() {
        log::debug!("Skipping write of {} on non-primary process", path.display());
        return Ok(WriteOutcome::Suppressed);
    }
    let text = render()?;
    write_atomic(path, text.as_bytes())?;
    log::info!("Wrote {}", path.display());
    Ok(WriteOutcome::Written(path.to_path_buf()))
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp.{}", std::process::id()));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn rank_follows_variable_precedence() {
        assert_eq!(rank_from_env(env(&[])), None);
        assert_eq!(rank_from_env(env(&[("PMI_RANK", "3")])), Some(3));
        assert_eq!(
            rank_from_env(env(&[("SLURM_PROCID", "2"), ("AUTOCURATOR_RANK", "0")])),
            Some(0)
        );
        assert_eq!(
            rank_from_env(env(&[("OMPI_COMM_WORLD_RANK", "x"), ("PMI_RANK", "1")])),
            Some(1)
        );
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }
}
