// src/cli/handlers/commons.rs

// Shared helpers used by several handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use crate::{
    constants::MASKED_VALUE,
    core::{
        cmd_tree::CmdTree, command::Cmd, config_loader, env::is_sensitive_key,
        errors::TolerableErrors, paths,
    },
    models::LoadedTree,
};

/// Resolves the config location and loads the compiled command tree.
pub fn load(config: Option<&str>) -> Result<LoadedTree> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let path = paths::resolve_config_path(config, &cwd)?;
    log::info!("Loading command tree from '{}'", path.display());
    config_loader::load_tree(&path)
}

/// Looks a command up by path (abbreviations allowed).
pub fn find_cmd<'a>(tree: &'a CmdTree, path: &str) -> Result<&'a Cmd> {
    tree.find(path)
        .and_then(|id| tree.cmd(id))
        .ok_or_else(|| anyhow!(format!(t!("common.error.cmd_not_found"), name = path)))
}

/// Prints the tolerable problems of a load, if any.
pub fn print_problems(problems: &TolerableErrors) {
    if problems.is_empty() {
        return;
    }
    println!(
        "\n{}",
        format!(t!("common.problems.header"), count = problems.len())
            .yellow()
            .bold()
    );
    for problem in problems.iter() {
        println!(
            "  {} {} {}",
            problem.cmd_path.cyan(),
            format!("({})", problem.source).dimmed(),
            problem.message
        );
    }
}

/// The value to display for `key`: masked if the key looks sensitive.
pub fn display_value<'a>(key: &str, value: &'a str) -> &'a str {
    if is_sensitive_key(key) && !value.is_empty() {
        MASKED_VALUE
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_value_masks_sensitive_keys() {
        assert_eq!(display_value("db.password", "hunter2"), MASKED_VALUE);
        assert_eq!(display_value("db.password", ""), "");
        assert_eq!(display_value("db.host", "localhost"), "localhost");
    }

    #[test]
    fn test_load_reports_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load(missing.to_str()).unwrap_err();
        assert!(err.downcast_ref::<paths::PathError>().is_some());
    }
}
