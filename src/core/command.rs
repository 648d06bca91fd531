// src/core/command.rs

use crate::{
    constants::MAX_STACK_DEPTH,
    core::{
        args::{ArgError, ArgVal, ArgVals, Args},
        automap::ArgsAutoMapStatus,
        env::Env,
        env_mapping::{Arg2Env, Val2Env},
        env_ops::{EnvOpType, EnvOps},
        errors::DefinitionError,
        flow::CmdInput,
        renderer::render_template,
        simulate::EnvSimulator,
    },
};
use serde::Serialize;

/// What a command does when run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CmdKind {
    /// Only applies its env bindings.
    Empty,
    /// Runs an external program. Never spawned by this crate.
    Exec(String),
    /// Implemented in-process.
    Builtin,
    /// Runs a sub-flow template, one line per entry.
    Flow(Vec<String>),
}

/// One named command of the tree.
#[derive(Debug, Clone)]
pub struct Cmd {
    path: String,
    help: String,
    source: String,
    kind: CmdKind,
    args: Args,
    val2env: Val2Env,
    arg2env: Arg2Env,
    env_ops: EnvOps,
    simulator: Option<EnvSimulator>,
    auto_map: ArgsAutoMapStatus,
}

impl Cmd {
    /// Creates an empty command. `source` names where it was defined.
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            help: String::new(),
            source: source.into(),
            kind: CmdKind::Empty,
            args: Args::new(),
            val2env: Val2Env::new(),
            arg2env: Arg2Env::new(),
            env_ops: EnvOps::new(),
            simulator: None,
            auto_map: ArgsAutoMapStatus::new(),
        }
    }

    /// Full dotted path, e.g. `db.connect`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// One-line description, empty if none.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Where the command was defined: a config file or `builtin`.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the command is a flow, an exec line or a builtin.
    pub fn kind(&self) -> &CmdKind {
        &self.kind
    }

    /// The argument surface, including auto-mapped arguments once compiled.
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Env keys set unconditionally.
    pub fn val2env(&self) -> &Val2Env {
        &self.val2env
    }

    /// Env keys set from the command's own arguments.
    pub fn arg2env(&self) -> &Arg2Env {
        &self.arg2env
    }

    /// Declared env reads and writes.
    pub fn env_ops(&self) -> &EnvOps {
        &self.env_ops
    }

    /// How a dry walk approximates this builtin's env writes.
    pub fn simulator(&self) -> Option<&EnvSimulator> {
        self.simulator.as_ref()
    }

    /// The auto-map status: requests before compile, report after.
    pub fn auto_map(&self) -> &ArgsAutoMapStatus {
        &self.auto_map
    }

    /// The flow lines, if this is a flow command.
    pub fn flow_lines(&self) -> Option<&[String]> {
        match &self.kind {
            CmdKind::Flow(lines) => Some(lines),
            _ => None,
        }
    }

    /// Sets the one-line description.
    pub fn set_help(&mut self, help: impl Into<String>) -> &mut Self {
        self.help = help.into();
        self
    }

    /// Makes the command a flow. Blank lines are dropped.
    pub fn set_flow<S: AsRef<str>>(&mut self, lines: &[S]) -> &mut Self {
        self.kind = CmdKind::Flow(
            lines
                .iter()
                .map(|l| l.as_ref().trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        );
        self
    }

    /// Makes the command run an external line.
    pub fn set_exec(&mut self, line: impl Into<String>) -> &mut Self {
        self.kind = CmdKind::Exec(line.into());
        self
    }

    /// Marks the command as in-process, with the given env write behavior.
    pub fn set_simulator(&mut self, simulator: EnvSimulator) -> &mut Self {
        self.kind = CmdKind::Builtin;
        self.simulator = Some(simulator);
        self
    }

    pub fn set_builtin(&mut self) -> &mut Self {
        self.kind = CmdKind::Builtin;
        self
    }

    pub fn add_arg(
        &mut self,
        name: &str,
        default_value: &str,
        abbrs: &[&str],
    ) -> Result<&mut Self, DefinitionError> {
        self.args.add_arg(name, default_value, abbrs)?;
        Ok(self)
    }

    pub fn add_auto_map_all_arg(
        &mut self,
        name: &str,
        default_value: &str,
        abbrs: &[&str],
    ) -> Result<&mut Self, DefinitionError> {
        self.args.add_auto_map_all_arg(name, default_value, abbrs)?;
        Ok(self)
    }

    pub fn set_arg_enums(&mut self, name: &str, values: &[&str]) -> Result<&mut Self, DefinitionError> {
        self.args.set_enums(name, values)?;
        Ok(self)
    }

    pub fn add_val2env(&mut self, key: &str, value: &str) -> Result<&mut Self, DefinitionError> {
        self.val2env.add(key, value)?;
        Ok(self)
    }

    /// Binds an env key to an argument, given by name or abbreviation.
    pub fn add_arg2env(&mut self, key: &str, arg: &str) -> Result<&mut Self, DefinitionError> {
        let realname = self
            .args
            .realname(arg)
            .ok_or_else(|| DefinitionError::UnknownArg(arg.to_string()))?
            .to_string();
        self.arg2env.add(key, &realname)?;
        Ok(self)
    }

    pub fn add_env_op(&mut self, key: &str, op: EnvOpType) -> Result<&mut Self, DefinitionError> {
        self.env_ops.add(key, op);
        Ok(self)
    }

    /// Opts into auto-mapping. See [`ArgsAutoMapStatus`] for the definition syntax.
    pub fn set_arg2env_auto_map<S: AsRef<str>>(
        &mut self,
        defs: &[S],
    ) -> Result<&mut Self, DefinitionError> {
        self.auto_map.add_definitions(defs, &mut self.args)?;
        Ok(self)
    }

    /// Hands the auto-map status to a discovery walk.
    pub(crate) fn take_auto_map(&mut self) -> ArgsAutoMapStatus {
        std::mem::take(&mut self.auto_map)
    }

    /// Puts a walked status back and commits its cached candidates.
    pub(crate) fn finish_auto_map(
        &mut self,
        mut status: ArgsAutoMapStatus,
    ) -> Result<(), DefinitionError> {
        status.flush_cache(&mut self.args, &mut self.arg2env)?;
        self.auto_map = status;
        Ok(())
    }

    /// Resolves the concrete argument values of one invocation: the value given in
    /// `input`, else the value of the argument's env key, else the default value
    /// rendered against `env`.
    pub fn gen_arg_vals(
        &self,
        input: &CmdInput,
        env: &Env,
        stack_depth: usize,
    ) -> Result<ArgVals, ArgError> {
        if stack_depth > MAX_STACK_DEPTH {
            return Err(ArgError::StackTooDeep(stack_depth));
        }
        let mut given = self
            .args
            .match_positional_and_named(&input.named, &input.positional)?;

        let env_lookup = |key: &str| env.has(key).then(|| env.get_raw(key));
        let mut argv = ArgVals::new();
        for (index, arg) in self.args.iter().enumerate() {
            let value = if let Some(raw) = given.remove(&arg.name) {
                if let Some(enums) = &arg.enums
                    && !raw.contains("[[")
                    && !enums.contains(&raw)
                {
                    return Err(ArgError::NotInEnums {
                        arg: arg.name.clone(),
                        value: raw,
                        enums: enums.join(","),
                    });
                }
                ArgVal {
                    raw,
                    provided: true,
                    index,
                }
            } else if let Some(key) = self.arg2env.key_of(&arg.name)
                && env.has(key)
            {
                ArgVal {
                    raw: env.get_raw(key),
                    provided: false,
                    index,
                }
            } else {
                let (raw, _) = render_template(&arg.default_value, &env_lookup);
                ArgVal {
                    raw,
                    provided: false,
                    index,
                }
            };
            argv.insert(arg.name.clone(), value);
        }
        Ok(argv)
    }

    /// The env keys this command would provide when run with `argv`: declared write
    /// ops, Val2Env keys, and Arg2Env keys whose argument was provided.
    pub fn provided_env_keys(&self, argv: Option<&ArgVals>) -> Vec<String> {
        let mut keys: Vec<String> = self
            .env_ops
            .write_keys()
            .chain(self.val2env.keys())
            .map(str::to_string)
            .collect();
        if let Some(argv) = argv {
            keys.extend(
                self.arg2env
                    .iter()
                    .filter(|(_, arg)| argv.get(*arg).is_some_and(|v| v.provided))
                    .map(|(key, _)| key.to_string()),
            );
        }
        keys
    }

    /// Writes the command's static env effects into `env`: rendered Val2Env values,
    /// provided Arg2Env values, and defaults for keys `env` doesn't have yet.
    pub fn apply_env_effects(&self, argv: &ArgVals, env: &Env) {
        for (key, template) in self.val2env.iter() {
            let lookup = |k: &str| {
                argv.get(k)
                    .map(|v| v.raw.clone())
                    .or_else(|| env.has(k).then(|| env.get_raw(k)))
            };
            let (value, _) = render_template(template, &lookup);
            env.set(key, value);
        }
        for (key, arg) in self.arg2env.iter() {
            let Some(value) = argv.get(arg) else {
                continue;
            };
            if value.provided {
                env.set_arg(key, value.raw.as_str());
            } else if !env.has(key) && !value.raw.is_empty() {
                env.set(key, value.raw.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::env::EnvLayerType;

    fn connect() -> Cmd {
        let mut cmd = Cmd::new("db.connect", "test");
        cmd.add_arg("host", "127.0.0.1", &["h"])
            .unwrap()
            .add_arg("port", "[[default.port]]", &["p"])
            .unwrap()
            .add_arg("mode", "fast", &[])
            .unwrap()
            .set_arg_enums("mode", &["fast", "slow"])
            .unwrap()
            .add_arg2env("db.host", "h")
            .unwrap()
            .add_arg2env("db.port", "port")
            .unwrap()
            .add_val2env("db.url", "[[host]]:[[port]]")
            .unwrap()
            .add_env_op("db.conn", EnvOpType::MAY_WRITE)
            .unwrap();
        cmd
    }

    fn input(named: &[(&str, &str)], positional: &[&str]) -> CmdInput {
        CmdInput {
            named: named
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            positional: positional.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_add_arg2env_requires_arg() {
        let mut cmd = connect();
        assert_eq!(
            cmd.add_arg2env("db.user", "user").unwrap_err(),
            DefinitionError::UnknownArg("user".to_string())
        );
        assert_eq!(cmd.arg2env().key_of("host"), Some("db.host"));
    }

    #[test]
    fn test_gen_arg_vals_resolution_order() {
        let cmd = connect();
        let env = Env::new(EnvLayerType::Default);
        env.set("db.host", "10.0.0.1");
        env.set("default.port", "5432");

        let argv = cmd.gen_arg_vals(&input(&[("mode", "slow")], &[]), &env, 0).unwrap();
        let host = &argv["host"];
        assert_eq!(host.raw, "10.0.0.1");
        assert!(!host.provided);
        assert_eq!(argv["port"].raw, "5432");
        assert!(argv["mode"].provided);
        assert_eq!(argv["mode"].index, 2);

        let argv = cmd.gen_arg_vals(&input(&[], &["db1"]), &env, 0).unwrap();
        assert_eq!(argv["host"].raw, "db1");
        assert!(argv["host"].provided);
    }

    #[test]
    fn test_gen_arg_vals_errors() {
        let cmd = connect();
        let env = Env::new(EnvLayerType::Default);
        assert!(matches!(
            cmd.gen_arg_vals(&input(&[("mode", "medium")], &[]), &env, 0),
            Err(ArgError::NotInEnums { .. })
        ));
        assert_eq!(
            cmd.gen_arg_vals(&input(&[], &[]), &env, MAX_STACK_DEPTH + 1)
                .unwrap_err(),
            ArgError::StackTooDeep(MAX_STACK_DEPTH + 1)
        );
    }

    #[test]
    fn test_provided_env_keys() {
        let cmd = connect();
        let env = Env::new(EnvLayerType::Default);
        let argv = cmd.gen_arg_vals(&input(&[("p", "1")], &[]), &env, 0).unwrap();
        assert_eq!(
            cmd.provided_env_keys(Some(&argv)),
            vec!["db.conn", "db.url", "db.port"]
        );
        assert_eq!(cmd.provided_env_keys(None), vec!["db.conn", "db.url"]);
    }

    #[test]
    fn test_apply_env_effects() {
        let cmd = connect();
        let env = Env::new(EnvLayerType::SubFlow);
        let argv = cmd.gen_arg_vals(&input(&[("p", "6000")], &[]), &env, 0).unwrap();
        cmd.apply_env_effects(&argv, &env);
        assert_eq!(env.get_raw("db.url"), "127.0.0.1:6000");
        assert!(env.get("db.port").is_arg);
        assert_eq!(env.get_raw("db.host"), "127.0.0.1");
        assert!(!env.get("db.host").is_arg);
    }

    #[test]
    fn test_flow_kind() {
        let mut cmd = Cmd::new("deploy", "test");
        assert!(cmd.flow_lines().is_none());
        cmd.set_flow(&["build", "  ", "push"]);
        assert_eq!(cmd.flow_lines().unwrap(), &["build".to_string(), "push".to_string()]);
    }
}
