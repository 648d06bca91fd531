//! # Flow Contracts
//!
//! The two collaborators the auto-map walk consumes: a [`FlowRenderer`] that turns a
//! command's flow template into concrete tokens, and a [`FlowParser`] that turns those
//! tokens into matched sub-commands. Default implementations live in
//! [`crate::core::renderer`] and [`crate::core::flow_parser`].

use crate::core::{
    args::{ArgError, ArgVals},
    cmd_tree::{CmdId, CmdTree},
    env::Env,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Whether a render is only exploring the flow graph or producing values to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Shape discovery. Output is advisory and non-deterministic values are replaced
    /// by fixed placeholders.
    Discover,
    /// Value resolution right before execution.
    Resolve,
}

/// The output of a render. Partial renders are not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedFlow {
    pub tokens: Vec<String>,
    /// False if some template marker could not be resolved.
    pub fully_rendered: bool,
}

/// Hard render failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The rendered text has unbalanced quotes.
    #[error("Can't split rendered flow into tokens: {0}")]
    Tokenize(String),
    /// Macros reference each other too deeply (or in a cycle).
    #[error("Macro '{0}' expands too deeply. Check for cyclic macros.")]
    MacroTooDeep(String),
}

/// Renders flow templates.
pub trait FlowRenderer {
    /// Expands `lines` with the caller's argument values, environment and macro table.
    fn render(
        &self,
        lines: &[String],
        argv: &ArgVals,
        env: &Env,
        macros: &BTreeMap<String, String>,
        phase: RenderPhase,
    ) -> Result<RenderedFlow, RenderError>;
}

/// The arguments written after a command in a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdInput {
    /// `name=value` pairs, names as written (may be abbreviations).
    pub named: Vec<(String, String)>,
    pub positional: Vec<String>,
}

/// Problems found while matching one flow segment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No command matches the path.
    #[error("Unknown command '{0}'.")]
    UnknownCmd(String),
    /// The command has no such argument.
    #[error("Command '{cmd}' has no argument '{arg}'.")]
    UnknownArg { cmd: String, arg: String },
    /// More positional values than arguments.
    #[error("Command '{cmd}' takes at most {max} positional argument(s), got {got}.")]
    TooManyArgs { cmd: String, max: usize, got: usize },
    /// A token still carries a template marker.
    #[error("Token '{token}' of command '{cmd}' is not fully rendered.")]
    Unrendered { cmd: String, token: String },
}

impl ParseError {
    /// Minor errors are tolerated: the command is still analysed.
    pub fn is_minor(&self) -> bool {
        matches!(self, Self::Unrendered { .. })
    }
}

/// One matched segment of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCmd {
    /// The path as written in the flow.
    pub path: String,
    /// The matched command, if any.
    pub cmd: Option<CmdId>,
    /// `{key=value}` overlays scoped to this segment.
    pub segment_env: Vec<(String, String)>,
    pub input: CmdInput,
    pub error: Option<ParseError>,
}

impl ParsedCmd {
    /// True for errors that must skip the command.
    pub fn has_hard_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.is_minor())
    }

    /// Computes the command's concrete argument values against `env`.
    pub fn gen_arg_vals(
        &self,
        tree: &CmdTree,
        env: &Env,
        stack_depth: usize,
    ) -> Result<ArgVals, ArgError> {
        let cmd = self
            .cmd
            .and_then(|id| tree.cmd(id))
            .ok_or_else(|| ArgError::UnknownCmd(self.path.clone()))?;
        cmd.gen_arg_vals(&self.input, env, stack_depth)
    }
}

/// A parsed flow: an optional leading global block and the ordered sub-commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlow {
    pub globals: Vec<(String, String)>,
    pub cmds: Vec<ParsedCmd>,
}

/// Parses rendered tokens into matched commands.
pub trait FlowParser {
    fn parse(&self, tokens: &[String], tree: &CmdTree) -> ParsedFlow;
}
