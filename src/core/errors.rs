// src/core/errors.rs

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Mistakes in command registration. These abort the construction of the command tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// An argument was registered without a name.
    #[error("Argument name can't be empty.")]
    EmptyArgName,
    /// An argument name or abbreviation is already taken on the same command.
    #[error("Argument name or abbreviation '{name}' conflicts with existing argument '{existing}'.")]
    ArgNameConflict {
        /// The name being registered.
        name: String,
        /// The argument already owning that name.
        existing: String,
    },
    /// An operation referenced an argument the command doesn't have.
    #[error("Argument '{0}' not found.")]
    UnknownArg(String),
    /// Enum values may only be assigned once per argument.
    #[error("Enum values of argument '{0}' are already set.")]
    EnumsAlreadySet(String),
    /// The default value of an argument is outside its enum values.
    #[error("Default value '{value}' of argument '{arg}' is not one of its enums: {enums}.")]
    DefaultNotInEnums {
        /// The argument name.
        arg: String,
        /// The default value.
        value: String,
        /// The allowed values, comma separated.
        enums: String,
    },
    /// Two producers were registered for the same env key.
    #[error("Env key '{key}' already has a producer in {mapper}.")]
    DuplicateEnvKey {
        /// The env key.
        key: String,
        /// `arg2env` or `val2env`.
        mapper: &'static str,
    },
    /// An argument was bound to two env keys.
    #[error("Argument '{arg}' is already mapped to env key '{key}'.")]
    DuplicateArgMapping {
        /// The argument name.
        arg: String,
        /// The env key it already maps to.
        key: String,
    },
    /// An env op string couldn't be parsed.
    #[error("Invalid env op '{op}' for key '{key}'. Expected read, write, may-read or may-write.")]
    InvalidEnvOp {
        /// The env key.
        key: String,
        /// The offending op text.
        op: String,
    },
    /// `*` or `**` appeared before the last auto-map entry.
    #[error("Auto-map wildcard '{wildcard}' must be the last entry, found '{entry}' after it.")]
    WildcardNotLast {
        /// The wildcard that was already seen.
        wildcard: String,
        /// The entry found after it.
        entry: String,
    },
    /// A `name|abbr=default` auto-map entry is malformed.
    #[error("Malformed argument definition '{entry}': {reason}.")]
    MalformedArgDefinition {
        /// The raw entry.
        entry: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A command path is empty or has empty segments.
    #[error("Invalid command path '{0}'.")]
    InvalidCmdPath(String),
    /// Two commands were registered under the same path.
    #[error("Command '{0}' is already registered.")]
    DuplicateCmd(String),
    /// A command name or abbreviation collides with a sibling's.
    #[error("Command name or abbreviation '{name}' conflicts with sibling '{existing}'.")]
    CmdNameConflict {
        /// The name being registered.
        name: String,
        /// The sibling already owning it.
        existing: String,
    },
}

/// One recoverable definition problem, keyed by the owning command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TolerableError {
    /// Full path of the command the problem belongs to.
    pub cmd_path: String,
    /// Where the command was defined (a config file, or `builtin`).
    pub source: String,
    /// Human readable description.
    pub message: String,
}

impl fmt::Display for TolerableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}): {}", self.cmd_path, self.source, self.message)
    }
}

/// The tolerant error channel: problems collected while compiling the tree,
/// reported at the end instead of aborting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TolerableErrors {
    errors: Vec<TolerableError>,
}

impl TolerableErrors {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a problem.
    pub fn push(
        &mut self,
        cmd_path: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
    ) {
        let error = TolerableError {
            cmd_path: cmd_path.into(),
            source: source.into(),
            message: message.into(),
        };
        log::debug!("Tolerable error recorded: {}", error);
        self.errors.push(error);
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded problems.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All recorded problems, in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &TolerableError> {
        self.errors.iter()
    }

    /// The problems recorded for one command.
    pub fn for_cmd<'a>(&'a self, cmd_path: &'a str) -> impl Iterator<Item = &'a TolerableError> {
        self.errors.iter().filter(move |e| e.cmd_path == cmd_path)
    }
}
