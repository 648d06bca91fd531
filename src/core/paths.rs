// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_ENV_VAR, CONFIG_FILENAME};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not expand path '{path}': {reason}")]
    Expansion { path: String, reason: String },
    #[error("Config path '{0}' does not exist.")]
    Missing(String),
    #[error("No command tree found. Looked in: {0}")]
    NotFound(String),
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(raw).map_err(|e| PathError::Expansion {
        path: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Returns the default user config location (`<config dir>/flowmap/flowmap.toml`).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Resolves the command tree location.
///
/// Looks, in order, at the explicit `--config` value, the `FLOWMAP_CONFIG` variable,
/// `./flowmap.toml`, and the user config directory. An explicit value or variable
/// that points nowhere is an error rather than a fallthrough.
pub fn resolve_config_path(explicit: Option<&str>, cwd: &Path) -> Result<PathBuf, PathError> {
    let from_env = std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty());

    if let Some(raw) = explicit.map(str::to_string).or(from_env) {
        let path = expand_path(&raw)?;
        let path = if path.is_relative() { cwd.join(path) } else { path };
        log::debug!("Using config path '{}'", path.display());
        return dunce::canonicalize(&path).map_err(|_| PathError::Missing(raw));
    }

    let mut candidates = vec![cwd.join(CONFIG_FILENAME)];
    candidates.extend(user_config_path());
    for candidate in &candidates {
        if candidate.exists() {
            log::debug!("Found config at '{}'", candidate.display());
            return dunce::canonicalize(candidate)
                .map_err(|_| PathError::Missing(candidate.display().to_string()));
        }
    }
    Err(PathError::NotFound(
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("tree.toml");
        fs::write(&file, "").unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let resolved = resolve_config_path(Some("tree.toml"), dir.path()).unwrap();
        assert_eq!(resolved, dunce::canonicalize(&file).unwrap());
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            resolve_config_path(Some("nope.toml"), dir.path()),
            Err(PathError::Missing(_))
        ));
    }

    #[test]
    fn test_cwd_config_is_found() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILENAME);
        fs::write(&file, "").unwrap();
        if std::env::var(CONFIG_ENV_VAR).is_ok() {
            return;
        }
        let resolved = resolve_config_path(None, dir.path()).unwrap();
        assert_eq!(resolved, dunce::canonicalize(&file).unwrap());
    }

    #[test]
    fn test_expand_path_reports_undefined_vars() {
        assert!(matches!(
            expand_path("$FLOWMAP_SURELY_UNDEFINED_VAR/tree.toml"),
            Err(PathError::Expansion { .. })
        ));
        assert_eq!(expand_path("plain/tree.toml").unwrap(), PathBuf::from("plain/tree.toml"));
    }
}
