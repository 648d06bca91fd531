// src/models.rs

use crate::core::{
    args::Arg,
    cmd_tree::CmdTree,
    command::{Cmd, CmdKind},
    errors::{TolerableError, TolerableErrors},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};

// --- CONFIG FILE MODELS ---
// Deserialized straight from `flowmap.toml` files.

/// One configuration file: default env, macros and commands.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    /// Values of the default env layer.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// `[[@name]]` macros usable in any flow.
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
    #[serde(default, rename = "cmd")]
    pub cmds: Vec<CmdConfig>,
}

/// A flow written either as one string or as a list of lines.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FlowText {
    Single(String),
    Lines(Vec<String>),
}

impl FlowText {
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Single(line) => vec![line.clone()],
            Self::Lines(lines) => lines.clone(),
        }
    }
}

/// One `[[cmd]]` table.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CmdConfig {
    /// Dotted command path, e.g. `db.connect`.
    pub path: String,
    #[serde(default)]
    pub abbrs: Vec<String>,
    pub help: Option<String>,
    /// `name|abbr=default` entries; `name` alone means no default.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    /// `env.key=arg` entries.
    #[serde(default)]
    pub arg2env: Vec<String>,
    /// `env.key=value` entries. Values may be templates.
    #[serde(default)]
    pub val2env: Vec<String>,
    /// `env.key=read|write|may-read|may-write` entries.
    #[serde(default)]
    pub env_ops: Vec<String>,
    pub flow: Option<FlowText>,
    /// An external command line. Mutually exclusive with `flow`.
    pub exec: Option<String>,
    /// Auto-map definitions.
    #[serde(default)]
    pub automap: Vec<String>,
}

// --- VIEW MODELS ---
// Serialized by `desc --json`.

#[derive(Serialize, Debug, Clone)]
pub struct EnvBinding {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AutoMapReport {
    pub definitions: Vec<String>,
    pub committed: Vec<String>,
    pub unmapped: Vec<String>,
}

/// Everything `desc` shows about a command.
#[derive(Serialize, Debug, Clone)]
pub struct CmdDescription {
    pub path: String,
    pub help: String,
    pub source: String,
    pub kind: CmdKind,
    pub args: Vec<Arg>,
    pub arg2env: Vec<EnvBinding>,
    pub val2env: Vec<EnvBinding>,
    pub env_ops: Vec<EnvBinding>,
    pub automap: Option<AutoMapReport>,
    pub problems: Vec<TolerableError>,
}

impl CmdDescription {
    pub fn new<'a>(cmd: &Cmd, problems: impl Iterator<Item = &'a TolerableError>) -> Self {
        let binding = |key: &str, value: String| EnvBinding {
            key: key.to_string(),
            value,
        };
        let status = cmd.auto_map();
        Self {
            path: cmd.path().to_string(),
            help: cmd.help().to_string(),
            source: cmd.source().to_string(),
            kind: cmd.kind().clone(),
            args: cmd.args().iter().cloned().collect(),
            arg2env: cmd
                .arg2env()
                .iter()
                .map(|(k, a)| binding(k, a.to_string()))
                .collect(),
            val2env: cmd
                .val2env()
                .iter()
                .map(|(k, v)| binding(k, v.to_string()))
                .collect(),
            env_ops: cmd
                .env_ops()
                .iter()
                .map(|(k, ops)| {
                    let ops: Vec<String> = ops.iter().map(ToString::to_string).collect();
                    binding(k, ops.join(","))
                })
                .collect(),
            automap: status.is_enabled().then(|| AutoMapReport {
                definitions: status.definitions(),
                committed: status.committed().to_vec(),
                unmapped: status.unmapped_args(),
            }),
            problems: problems.cloned().collect(),
        }
    }
}

/// One step of a dry flow walk, as printed by `flow`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowStep {
    pub depth: usize,
    pub path: String,
    /// `(name, value, provided)` in declaration order.
    pub args: Vec<(String, String, bool)>,
    /// Why the step wasn't expanded further, if it wasn't.
    pub note: Option<String>,
}

/// Result of loading a command tree.
#[derive(Debug)]
pub struct LoadedTree {
    pub tree: CmdTree,
    pub problems: TolerableErrors,
    /// The config files read, in load order.
    pub files: Vec<PathBuf>,
}
