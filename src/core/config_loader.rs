//! # Config Loader
//!
//! Builds a [`CmdTree`] from `flowmap.toml` files. A path may name a single file or a
//! directory, in which case every `*.toml` file below it is loaded in sorted order.
//! Builtin commands are registered first, then every file, then the auto-mapping
//! is compiled once over the complete tree.

use crate::{
    constants::{ABBRS_SEP, KV_SEP},
    core::{
        builtins, compiler,
        cmd_tree::CmdTree,
        command::Cmd,
        env_ops::EnvOpType,
        errors::TolerableErrors,
        flow_parser::SimpleFlowParser,
        renderer::TemplateRenderer,
    },
    dev_utils,
    models::{CmdConfig, LoadedTree, TreeConfig},
};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// Represents errors that can occur while reading command tree files.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The TOML content is invalid or has unknown fields.
    #[error("Failed to parse TOML file at '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A config directory could not be walked.
    #[error("Failed to walk config directory '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    /// A `key=value` list entry is missing its separator.
    #[error("Invalid entry '{entry}' in '{field}' of command '{cmd}'. Expected '{expected}'.")]
    InvalidEntry {
        cmd: String,
        field: &'static str,
        entry: String,
        expected: &'static str,
    },
    /// A command can't both run a flow and an external program.
    #[error("Command '{0}' sets both 'flow' and 'exec'.")]
    FlowAndExec(String),
}

// --- PUBLIC LOADER API ---

/// Loads, registers and compiles the command tree found at `path`.
pub fn load_tree(path: &Path) -> Result<LoadedTree> {
    let _timer = dev_utils::BlockTimer::new("load_tree");
    let files = collect_config_files(path)?;

    let mut configs = Vec::with_capacity(files.len());
    for file in &files {
        let content = fs::read_to_string(file).map_err(|source| LoaderError::Io {
            path: file.clone(),
            source,
        })?;
        configs.push((parse_config(&content, file)?, file.display().to_string()));
    }

    let (tree, problems) = build_tree(&configs)?;
    Ok(LoadedTree {
        tree,
        problems,
        files,
    })
}

/// Registers builtins and every `(config, source)` pair, then compiles the auto-mapping.
pub fn build_tree(configs: &[(TreeConfig, String)]) -> Result<(CmdTree, TolerableErrors)> {
    let mut tree = CmdTree::new();
    builtins::register_builtins(&mut tree).context("Failed to register builtin commands")?;

    for (config, source) in configs {
        register_config(&mut tree, config, source)?;
    }

    let _timer = dev_utils::BlockTimer::new("auto_map_arg2env");
    let problems = compiler::auto_map_arg2env(&mut tree, &TemplateRenderer, &SimpleFlowParser)
        .context("Failed to compile argument auto-mapping")?;
    log::info!(
        "Loaded {} commands with {} auto-map problem(s)",
        tree.len(),
        problems.len()
    );
    Ok((tree, problems))
}

/// Lists the config files at `path`: the file itself, or every `*.toml` below a directory.
pub fn collect_config_files(path: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| LoaderError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = entry.path().extension().is_some_and(|ext| ext == "toml");
        if entry.file_type().is_file() && is_toml {
            files.push(entry.into_path());
        }
    }
    log::debug!("Found {} config file(s) under '{}'", files.len(), path.display());
    Ok(files)
}

pub fn parse_config(content: &str, path: &Path) -> Result<TreeConfig, LoaderError> {
    toml::from_str(content).map_err(|source| LoaderError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Registers the env defaults, macros and commands of one config file.
pub fn register_config(tree: &mut CmdTree, config: &TreeConfig, source: &str) -> Result<()> {
    for (key, value) in &config.env {
        tree.env().set(key.as_str(), value.as_str());
    }
    for (name, body) in &config.macros {
        tree.add_macro(name.as_str(), body.as_str());
    }
    for cmd_config in &config.cmds {
        let cmd = build_cmd(cmd_config, source)
            .with_context(|| format!("Invalid command '{}' in '{}'", cmd_config.path, source))?;
        let abbrs: Vec<&str> = cmd_config.abbrs.iter().map(String::as_str).collect();
        tree.register(cmd, &abbrs)
            .with_context(|| format!("Can't register command '{}' from '{}'", cmd_config.path, source))?;
    }
    Ok(())
}

/// Builds one command from its `[[cmd]]` table.
pub fn build_cmd(config: &CmdConfig, source: &str) -> Result<Cmd> {
    let path = config.path.trim();
    let mut cmd = Cmd::new(path, source);
    if let Some(help) = &config.help {
        cmd.set_help(help.trim());
    }

    for entry in &config.args {
        let (names, default_value) = entry.split_once(KV_SEP).unwrap_or((entry.as_str(), ""));
        let mut parts = names.split(ABBRS_SEP).map(str::trim);
        let name = parts.next().unwrap_or_default();
        let abbrs: Vec<&str> = parts.collect();
        cmd.add_arg(name, default_value.trim(), &abbrs)?;
    }

    // Literal auto-map args must exist before arg2env may bind them.
    if !config.automap.is_empty() {
        cmd.set_arg2env_auto_map(&config.automap)?;
    }

    for (name, values) in &config.enums {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        cmd.set_arg_enums(name, &values)?;
    }
    for entry in &config.arg2env {
        let (key, arg) = split_entry(path, "arg2env", entry, "env.key=arg")?;
        cmd.add_arg2env(key, arg)?;
    }
    for entry in &config.val2env {
        let (key, value) = split_entry(path, "val2env", entry, "env.key=value")?;
        cmd.add_val2env(key, value)?;
    }
    for entry in &config.env_ops {
        let (key, ops) = split_entry(path, "env_ops", entry, "env.key=read|write")?;
        cmd.add_env_op(key, EnvOpType::parse(key, ops)?)?;
    }

    match (&config.flow, &config.exec) {
        (Some(_), Some(_)) => return Err(LoaderError::FlowAndExec(path.to_string()).into()),
        (Some(flow), None) => {
            cmd.set_flow(&flow.lines());
        }
        (None, Some(exec)) => {
            cmd.set_exec(exec.trim());
        }
        (None, None) => {}
    }
    Ok(cmd)
}

fn split_entry<'a>(
    cmd: &str,
    field: &'static str,
    entry: &'a str,
    expected: &'static str,
) -> Result<(&'a str, &'a str), LoaderError> {
    entry
        .split_once(KV_SEP)
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| LoaderError::InvalidEntry {
            cmd: cmd.to_string(),
            field,
            entry: entry.to_string(),
            expected,
        })
}
