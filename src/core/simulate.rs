// src/core/simulate.rs

//! Dry-run approximations of the environment writes of builtin commands.
//!
//! A builtin carries an [`EnvSimulator`] tag from registration time; the auto-map walk
//! asks it which keys the command would write instead of running the command.

use crate::core::{args::ArgVals, env::Env};

/// The environment write behavior of a builtin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSimulator {
    /// Sets the key named by `key_arg` to the value of `value_arg`.
    SetKeyFromArgs { key_arg: String, value_arg: String },
    /// Copies the value of the key named by `src_arg` into the key named by `dst_arg`.
    CopyKey { src_arg: String, dst_arg: String },
    /// Writes a fixed set of keys with values only known at execution time.
    WriteKeys(Vec<String>),
}

impl EnvSimulator {
    /// Applies the simulated writes to `env` and returns the written keys.
    pub fn simulate(&self, argv: &ArgVals, env: &Env) -> Vec<String> {
        match self {
            Self::SetKeyFromArgs { key_arg, value_arg } => {
                let key = arg_value(argv, key_arg);
                if key.is_empty() {
                    return Vec::new();
                }
                env.set(key, arg_value(argv, value_arg));
                vec![key.to_string()]
            }
            Self::CopyKey { src_arg, dst_arg } => {
                let (src, dst) = (arg_value(argv, src_arg), arg_value(argv, dst_arg));
                if dst.is_empty() {
                    return Vec::new();
                }
                if !src.is_empty() {
                    env.set(dst, env.get_raw(src));
                }
                vec![dst.to_string()]
            }
            Self::WriteKeys(keys) => keys.clone(),
        }
    }
}

fn arg_value<'a>(argv: &'a ArgVals, name: &str) -> &'a str {
    argv.get(name).map(|v| v.raw.trim()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{args::ArgVal, env::EnvLayerType};

    fn argv(pairs: &[(&str, &str)]) -> ArgVals {
        pairs
            .iter()
            .enumerate()
            .map(|(index, (k, v))| {
                (
                    k.to_string(),
                    ArgVal {
                        raw: v.to_string(),
                        provided: true,
                        index,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_set_key_from_args_writes_env() {
        let env = Env::new(EnvLayerType::SubFlow);
        let sim = EnvSimulator::SetKeyFromArgs {
            key_arg: "key".to_string(),
            value_arg: "value".to_string(),
        };
        let keys = sim.simulate(&argv(&[("key", "db.host"), ("value", "10.0.0.1")]), &env);
        assert_eq!(keys, vec!["db.host".to_string()]);
        assert_eq!(env.get_raw("db.host"), "10.0.0.1");

        assert!(sim.simulate(&argv(&[("key", " ")]), &env).is_empty());
    }

    #[test]
    fn test_copy_key() {
        let env = Env::new(EnvLayerType::SubFlow);
        env.set("a", "1");
        let sim = EnvSimulator::CopyKey {
            src_arg: "src".to_string(),
            dst_arg: "dst".to_string(),
        };
        let keys = sim.simulate(&argv(&[("src", "a"), ("dst", "b")]), &env);
        assert_eq!(keys, vec!["b".to_string()]);
        assert_eq!(env.get_raw("b"), "1");
    }
}
