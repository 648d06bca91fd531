// src/core/explain.rs

//! A dry walk of a command invocation: every command the invocation would reach, in
//! execution order, with the argument values it would receive. Flows are rendered in
//! the resolve phase but nothing is executed; builtin env writes are simulated so that
//! later steps see the values earlier steps would have written.

use crate::{
    constants::MAX_STACK_DEPTH,
    core::{
        args::{ArgError, ArgVals},
        cmd_tree::{CmdId, CmdTree},
        env::{Env, EnvLayerType},
        flow::{FlowParser, FlowRenderer, ParseError, ParsedCmd, ParsedFlow, RenderPhase},
    },
    models::FlowStep,
};
use thiserror::Error;

/// The outcome of a dry walk.
#[derive(Debug)]
pub struct Explanation {
    pub steps: Vec<FlowStep>,
    /// The session layer after the walk, holding the top-level env writes.
    pub env: Env,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplainError {
    #[error("Nothing to explain: no command given.")]
    Empty,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Bad arguments for '{cmd}': {source}")]
    Args { cmd: String, source: ArgError },
}

/// Walks the invocation `tokens` (`cmd.path args...`, or a whole flow) against `tree`.
///
/// Problems in the invocation itself are errors. Problems found deeper, in the flows
/// of reached commands, are reported as notes on the step where the walk stopped.
pub fn explain_flow(
    tree: &CmdTree,
    renderer: &dyn FlowRenderer,
    parser: &dyn FlowParser,
    tokens: &[String],
) -> Result<Explanation, ExplainError> {
    let flow = parser.parse(tokens, tree);
    if flow.cmds.is_empty() {
        return Err(ExplainError::Empty);
    }
    for parsed in &flow.cmds {
        if parsed.has_hard_error()
            && let Some(e) = &parsed.error
        {
            return Err(e.clone().into());
        }
        parsed
            .gen_arg_vals(tree, tree.env(), 0)
            .map_err(|source| ExplainError::Args {
                cmd: parsed.path.clone(),
                source,
            })?;
    }

    let mut explainer = Explainer {
        tree,
        renderer,
        parser,
        stack: Vec::new(),
        steps: Vec::new(),
    };
    let env = tree.env().new_layer(EnvLayerType::Session);
    explainer.walk_in(&flow, &env, 0);
    Ok(Explanation {
        steps: explainer.steps,
        env,
    })
}

struct Explainer<'a> {
    tree: &'a CmdTree,
    renderer: &'a dyn FlowRenderer,
    parser: &'a dyn FlowParser,
    // Commands whose flow is being expanded, outermost first.
    stack: Vec<CmdId>,
    steps: Vec<FlowStep>,
}

impl Explainer<'_> {
    /// Walks a sub-flow in its own layer.
    fn walk(&mut self, flow: &ParsedFlow, env: &Env, depth: usize) {
        self.walk_in(flow, &env.new_layer(EnvLayerType::SubFlow), depth);
    }

    fn walk_in(&mut self, flow: &ParsedFlow, env: &Env, depth: usize) {
        for (key, value) in &flow.globals {
            env.set(key.as_str(), value.as_str());
        }
        for parsed in &flow.cmds {
            self.visit(parsed, env, depth);
        }
    }

    fn visit(&mut self, parsed: &ParsedCmd, env: &Env, depth: usize) {
        let mut step = FlowStep {
            depth,
            path: parsed.path.clone(),
            args: Vec::new(),
            note: parsed.error.as_ref().map(ToString::to_string),
        };
        let Some(id) = parsed.cmd.filter(|_| !parsed.has_hard_error()) else {
            self.steps.push(step);
            return;
        };
        let Some(cmd) = self.tree.cmd(id) else {
            self.steps.push(step);
            return;
        };
        step.path = cmd.path().to_string();

        let cmd_env = env.new_layer(EnvLayerType::Cmd);
        for (key, value) in &parsed.segment_env {
            cmd_env.set(key.as_str(), value.as_str());
        }
        let argv = match parsed.gen_arg_vals(self.tree, &cmd_env, depth) {
            Ok(argv) => argv,
            Err(e) => {
                step.note = Some(e.to_string());
                self.steps.push(step);
                return;
            }
        };
        step.args = describe_args(&argv);

        let at = self.steps.len();
        self.steps.push(step);
        if let Some(lines) = cmd.flow_lines() {
            if let Some(note) = self.expand(id, lines, &argv, &cmd_env, depth)
                && let Some(step) = self.steps.get_mut(at)
            {
                step.note = Some(note);
            }
        }

        if let Some(simulator) = cmd.simulator() {
            simulator.simulate(&argv, env);
        }
        cmd.apply_env_effects(&argv, env);
    }

    /// Expands the flow of `id`. Returns a note if the expansion stopped early.
    fn expand(
        &mut self,
        id: CmdId,
        lines: &[String],
        argv: &ArgVals,
        env: &Env,
        depth: usize,
    ) -> Option<String> {
        if self.stack.contains(&id) {
            return Some("recursive flow, not expanded".to_string());
        }
        if depth >= MAX_STACK_DEPTH {
            return Some(format!("stack depth {} reached, not expanded", depth));
        }
        let rendered = match self.renderer.render(
            lines,
            argv,
            env,
            self.tree.macros(),
            RenderPhase::Resolve,
        ) {
            Ok(rendered) => rendered,
            Err(e) => return Some(e.to_string()),
        };
        let flow = self.parser.parse(&rendered.tokens, self.tree);

        self.stack.push(id);
        self.walk(&flow, env, depth + 1);
        self.stack.pop();

        (!rendered.fully_rendered).then(|| "flow is only partly rendered".to_string())
    }
}

fn describe_args(argv: &ArgVals) -> Vec<(String, String, bool)> {
    let mut args: Vec<_> = argv.iter().collect();
    args.sort_by_key(|(_, v)| v.index);
    args.into_iter()
        .map(|(name, v)| (name.clone(), v.raw.clone(), v.provided))
        .collect()
}
