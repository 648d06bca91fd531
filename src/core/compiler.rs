//! # Compiler
//!
//! This module runs the argument auto-mapping over a fully registered command tree.
//! For every command that opted in, it walks the command's flow (and the flows of
//! its sub-commands, depth first) in a dry run, collects the arguments the command
//! asked for, and commits them onto it.
//!
//! Nothing is executed: flows are rendered in the discovery phase, builtin env writes
//! are simulated, and static env bindings are applied to a throwaway env chain.

use crate::core::{
    args::ArgVals,
    automap::ArgsAutoMapStatus,
    cmd_tree::{CmdId, CmdTree},
    env::{Env, EnvLayerType},
    errors::{DefinitionError, TolerableErrors},
    flow::{FlowParser, FlowRenderer, RenderPhase},
};
use std::collections::HashSet;

/// How a visit of one command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Keep walking the remaining commands.
    Continue,
    /// The target has everything it asked for; stop the whole walk.
    Done,
    /// This branch couldn't be analysed. Siblings are still walked.
    Errored,
}

// --- PUBLIC COMPILER API ---

/// Runs the auto-mapping for every command of `tree` that opted into it.
///
/// # Arguments
///
/// * `tree` - The fully registered command tree. Adopted arguments are committed in place.
/// * `renderer` - Renders flow templates during discovery.
/// * `parser` - Matches rendered tokens to commands of `tree`.
///
/// # Returns
///
/// The recoverable problems found (requested arguments nothing provides), or the first
/// fatal definition error.
pub fn auto_map_arg2env(
    tree: &mut CmdTree,
    renderer: &dyn FlowRenderer,
    parser: &dyn FlowParser,
) -> Result<TolerableErrors, DefinitionError> {
    let targets: Vec<CmdId> = tree
        .ids()
        .filter(|id| tree.cmd(*id).is_some_and(|c| c.auto_map().is_pending()))
        .collect();
    log::debug!("Auto-mapping {} command(s)", targets.len());

    let mut compiler = Compiler::new(renderer, parser);
    for id in targets {
        compiler.compile(tree, id)?;
    }
    Ok(compiler.errors)
}

// --- COMPILE DRIVER ---

/// Compile-wide state: the collaborators, the compile guard and the error channel.
struct Compiler<'a> {
    renderer: &'a dyn FlowRenderer,
    parser: &'a dyn FlowParser,
    done: HashSet<CmdId>,
    in_progress: HashSet<CmdId>,
    errors: TolerableErrors,
}

impl<'a> Compiler<'a> {
    fn new(renderer: &'a dyn FlowRenderer, parser: &'a dyn FlowParser) -> Self {
        Self {
            renderer,
            parser,
            done: HashSet::new(),
            in_progress: HashSet::new(),
            errors: TolerableErrors::new(),
        }
    }

    /// Compiles one command. Re-entrant calls for a command already being compiled
    /// (a cycle between flows) return immediately.
    fn compile(&mut self, tree: &mut CmdTree, id: CmdId) -> Result<(), DefinitionError> {
        if self.done.contains(&id) || !self.in_progress.insert(id) {
            return Ok(());
        }
        let Some(cmd) = tree.cmd_mut(id) else {
            self.in_progress.remove(&id);
            return Ok(());
        };
        let path = cmd.path().to_string();
        let mut walk = MapWalk {
            target: id,
            status: cmd.take_auto_map(),
        };

        if walk.status.needs_walk() {
            let env = tree
                .env()
                .new_layers(&[EnvLayerType::Session, EnvLayerType::Cmd]);
            let step = walk.visit(self, tree, id, None, &env, 0)?;
            log::debug!("Auto-map walk of '{}' ended with {:?}", path, step);
        }

        if let Some(cmd) = tree.cmd_mut(id) {
            cmd.finish_auto_map(walk.status)?;
            let status = cmd.auto_map();
            if !status.fully_mapped_or_map_all() {
                self.errors.push(
                    cmd.path(),
                    cmd.source(),
                    format!(
                        "auto-map can't find args: {}",
                        status.unmapped_args().join(", ")
                    ),
                );
            }
        }
        self.in_progress.remove(&id);
        self.done.insert(id);
        Ok(())
    }
}

// --- DISCOVERY WALK ---

/// The state of one target's walk.
struct MapWalk {
    target: CmdId,
    status: ArgsAutoMapStatus,
}

impl MapWalk {
    /// Visits `src`, then its sub-commands depth first.
    fn visit(
        &mut self,
        compiler: &mut Compiler<'_>,
        tree: &mut CmdTree,
        src: CmdId,
        argv: Option<&ArgVals>,
        env: &Env,
        depth: usize,
    ) -> Result<WalkStep, DefinitionError> {
        let Some(cmd) = tree.cmd(src) else {
            return Ok(WalkStep::Errored);
        };
        self.status
            .mark_met_with_keys(src, cmd.provided_env_keys(argv));

        let Some(lines) = cmd.flow_lines() else {
            return Ok(WalkStep::Continue);
        };
        let lines = lines.to_vec();
        let path = cmd.path().to_string();

        let no_args = ArgVals::new();
        let rendered = match compiler.renderer.render(
            &lines,
            argv.unwrap_or(&no_args),
            env,
            tree.macros(),
            RenderPhase::Discover,
        ) {
            Ok(rendered) => rendered,
            Err(e) => {
                log::warn!("Can't render the flow of '{}': {}", path, e);
                return Ok(WalkStep::Errored);
            }
        };
        let flow = compiler.parser.parse(&rendered.tokens, tree);

        let sub_env = env.new_layer(EnvLayerType::SubFlow);
        for (key, value) in &flow.globals {
            sub_env.set(key.as_str(), value.as_str());
            self.status.add_provided_key(key.as_str(), src);
        }

        for parsed in &flow.cmds {
            let Some(sub) = parsed.cmd else {
                log::debug!("Skipping unknown command '{}' in flow of '{}'", parsed.path, path);
                continue;
            };
            if parsed.has_hard_error() {
                if let Some(e) = &parsed.error {
                    log::debug!("Skipping '{}' in flow of '{}': {}", parsed.path, path, e);
                }
                self.status.mark_met(sub);
                continue;
            }
            if self.status.is_met(sub) {
                continue;
            }
            if sub != self.target && tree.cmd(sub).is_some_and(|c| c.auto_map().is_pending()) {
                compiler.compile(tree, sub)?;
            }

            let cmd_env = sub_env.new_layer(EnvLayerType::Cmd);
            for (key, value) in &parsed.segment_env {
                cmd_env.set(key.as_str(), value.as_str());
            }
            let sub_argv = match parsed.gen_arg_vals(tree, &cmd_env, depth + 1) {
                Ok(argv) => argv,
                Err(e) => {
                    log::debug!("Can't resolve args of '{}': {}", parsed.path, e);
                    self.status.mark_met(sub);
                    continue;
                }
            };

            match self.visit(compiler, tree, sub, Some(&sub_argv), &cmd_env, depth + 1)? {
                WalkStep::Done => return Ok(WalkStep::Done),
                WalkStep::Errored => log::debug!("Flow of '{}' was only partly walked", parsed.path),
                WalkStep::Continue => {}
            }

            let Some(sub_cmd) = tree.cmd(sub) else {
                continue;
            };
            if let Some(simulator) = sub_cmd.simulator() {
                for key in simulator.simulate(&sub_argv, &sub_env) {
                    self.status.add_provided_key(key, sub);
                }
            }
            sub_cmd.apply_env_effects(&sub_argv, &sub_env);

            self.adopt(tree, sub);
            if self.status.is_done() {
                return Ok(WalkStep::Done);
            }
        }
        Ok(WalkStep::Continue)
    }

    /// Offers every Arg2Env binding of `src` to the target.
    fn adopt(&mut self, tree: &CmdTree, src: CmdId) {
        let (Some(source), Some(target)) = (tree.cmd(src), tree.cmd(self.target)) else {
            return;
        };
        for (env_key, arg_name) in source.arg2env().iter() {
            let Some(arg) = source.args().get(arg_name) else {
                continue;
            };
            self.status
                .try_cache(target.args(), target.arg2env(), src, arg, env_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        builtins::register_builtins, command::Cmd, flow_parser::SimpleFlowParser,
        renderer::TemplateRenderer,
    };

    fn compile(tree: &mut CmdTree) -> TolerableErrors {
        auto_map_arg2env(tree, &TemplateRenderer, &SimpleFlowParser).unwrap()
    }

    fn leaf(tree: &mut CmdTree, path: &str, bindings: &[(&str, &str)]) -> CmdId {
        let mut cmd = Cmd::new(path, "test");
        for (arg, key) in bindings {
            cmd.add_arg(arg, "", &[]).unwrap();
            cmd.add_arg2env(key, arg).unwrap();
        }
        tree.register(cmd, &[]).unwrap()
    }

    fn flow(tree: &mut CmdTree, path: &str, lines: &[&str], defs: &[&str]) -> CmdId {
        let mut cmd = Cmd::new(path, "flows.toml");
        cmd.set_flow(lines).set_arg2env_auto_map(defs).unwrap();
        tree.register(cmd, &[]).unwrap()
    }

    fn connect(tree: &mut CmdTree) -> CmdId {
        let mut cmd = Cmd::new("db.connect", "test");
        cmd.add_arg("host", "127.0.0.1", &["h"])
            .unwrap()
            .add_arg("port", "4000", &["p"])
            .unwrap()
            .add_arg2env("db.host", "host")
            .unwrap()
            .add_arg2env("db.port", "port")
            .unwrap();
        tree.register(cmd, &[]).unwrap()
    }

    fn names(tree: &CmdTree, id: CmdId) -> Vec<String> {
        tree.cmd(id)
            .unwrap()
            .args()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_conflicting_key_under_no_provider_wildcard() {
        let mut tree = CmdTree::new();
        let a = leaf(&mut tree, "a", &[("arg1", "conflict.key")]);
        let b = leaf(&mut tree, "b", &[("arg2", "conflict.key")]);
        let target = flow(&mut tree, "target", &["a arg1=x : b arg2=y"], &["*"]);

        let errors = compile(&mut tree);
        assert!(errors.is_empty());

        let cmd = tree.cmd(target).unwrap();
        assert_eq!(cmd.auto_map().provided_by("conflict.key"), Some(a));
        assert_ne!(cmd.auto_map().provided_by("conflict.key"), Some(b));
        assert_eq!(names(&tree, target), vec!["arg1"]);
        assert_eq!(cmd.arg2env().arg_of("conflict.key"), Some("arg1"));
        assert!(cmd.args().is_from_auto_map_all("arg1"));
    }

    #[test]
    fn test_same_arg_from_two_sources_keeps_the_first() {
        let mut tree = CmdTree::new();
        let a = leaf(&mut tree, "a", &[("arg1", "conflict.key")]);
        leaf(&mut tree, "b", &[("arg1", "conflict.key")]);
        let target = flow(&mut tree, "target", &["a arg1=x : b"], &["*"]);

        let errors = compile(&mut tree);
        assert!(errors.is_empty());

        let cmd = tree.cmd(target).unwrap();
        assert_eq!(cmd.auto_map().provided_by("conflict.key"), Some(a));
        assert_eq!(names(&tree, target), vec!["arg1"]);
        assert_eq!(cmd.arg2env().arg_of("conflict.key"), Some("arg1"));
    }

    #[test]
    fn test_unmapped_explicit_name_is_tolerated() {
        let mut tree = CmdTree::new();
        leaf(&mut tree, "a", &[("arg1", "a.key")]);
        let target = flow(&mut tree, "target", &["a"], &["existingarg"]);

        let errors = compile(&mut tree);
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.cmd_path, "target");
        assert_eq!(error.source, "flows.toml");
        assert!(error.message.contains("existingarg"));

        let cmd = tree.cmd(target).unwrap();
        assert!(!cmd.auto_map().fully_mapped_or_map_all());
        assert!(cmd.args().is_empty());
    }

    #[test]
    fn test_explicit_names_through_nested_flows() {
        let mut tree = CmdTree::new();
        connect(&mut tree);
        tree.register(
            {
                let mut inner = Cmd::new("inner", "test");
                inner.set_flow(&["db.connect"]);
                inner
            },
            &[],
        )
        .unwrap();
        let target = flow(&mut tree, "deploy", &["inner"], &["h", "tag=latest"]);

        assert!(compile(&mut tree).is_empty());
        assert_eq!(names(&tree, target), vec!["host", "tag"]);
        let cmd = tree.cmd(target).unwrap();
        assert_eq!(cmd.args().abbrs("host"), &["h".to_string()]);
        assert_eq!(cmd.args().default_value("host"), Some("127.0.0.1"));
        assert!(!cmd.args().is_from_auto_map_all("host"));
        assert!(!cmd.arg2env().has_env("db.port"));
    }

    #[test]
    fn test_explicit_mode_stops_early() {
        let mut tree = CmdTree::new();
        connect(&mut tree);
        let other = leaf(&mut tree, "other", &[("user", "db.user")]);
        let target = flow(&mut tree, "target", &["db.connect : other"], &["port"]);
        let env = tree.env().new_layer(EnvLayerType::Session);

        let mut compiler = Compiler::new(&TemplateRenderer, &SimpleFlowParser);
        let status = tree.cmd_mut(target).unwrap().take_auto_map();
        let mut walk = MapWalk { target, status };
        let step = walk
            .visit(&mut compiler, &mut tree, target, None, &env, 0)
            .unwrap();
        assert_eq!(step, WalkStep::Done);
        assert!(!walk.status.is_met(other));
    }

    #[test]
    fn test_globals_and_segment_env_are_provided() {
        let mut tree = CmdTree::new();
        connect(&mut tree);
        let target = flow(&mut tree, "target", &["db.host=10.0.0.1 : db.connect"], &["*"]);
        assert!(compile(&mut tree).is_empty());
        assert_eq!(names(&tree, target), vec!["port"]);

        // Under `**` provided keys don't matter.
        let greedy = flow(&mut tree, "greedy", &["db.host=10.0.0.1 : db.connect"], &["**"]);
        compile(&mut tree);
        assert_eq!(names(&tree, greedy), vec!["host", "port"]);
    }

    #[test]
    fn test_builtin_writes_are_simulated() {
        let mut tree = CmdTree::new();
        register_builtins(&mut tree).unwrap();
        connect(&mut tree);
        let target = flow(
            &mut tree,
            "target",
            &["env.set key=db.port value=5432", "db.connect"],
            &["*"],
        );
        assert!(compile(&mut tree).is_empty());
        let cmd = tree.cmd(target).unwrap();
        assert!(cmd.auto_map().is_provided("db.port"));
        assert_eq!(names(&tree, target), vec!["host"]);
    }

    #[test]
    fn test_nested_auto_map_is_compiled_on_demand() {
        let mut tree = CmdTree::new();
        let outer = flow(&mut tree, "outer", &["inner"], &["**"]);
        let inner = flow(&mut tree, "inner", &["db.connect"], &["**"]);
        connect(&mut tree);

        assert!(compile(&mut tree).is_empty());
        assert!(tree.cmd(inner).unwrap().auto_map().is_flushed());
        assert_eq!(names(&tree, inner), vec!["host", "port"]);
        assert_eq!(names(&tree, outer), vec!["host", "port"]);
    }

    #[test]
    fn test_cyclic_flows_terminate() {
        let mut tree = CmdTree::new();
        let ping = flow(&mut tree, "ping", &["pong"], &["**"]);
        flow(&mut tree, "pong", &["ping : db.connect"], &["**"]);
        connect(&mut tree);

        assert!(compile(&mut tree).is_empty());
        assert_eq!(names(&tree, ping), vec!["host", "port"]);
    }

    #[test]
    fn test_broken_flows_are_skipped() {
        let mut tree = CmdTree::new();
        connect(&mut tree);
        let mut broken = Cmd::new("broken", "test");
        broken.set_flow(&["db.connect host='unclosed"]);
        tree.register(broken, &[]).unwrap();
        let target = flow(
            &mut tree,
            "target",
            &["nope : broken : db.connect user=x : db.connect"],
            &["**"],
        );

        assert!(compile(&mut tree).is_empty());
        // `db.connect user=x` is a hard error and marks the command met.
        assert!(names(&tree, target).is_empty());
    }
}
