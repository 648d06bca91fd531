// src/core/args.rs

use crate::core::errors::DefinitionError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// One argument of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    /// Primary name, unique within the command.
    pub name: String,
    /// Used when no value is given. May be a template.
    pub default_value: String,
    /// Alternative names accepted in flows.
    pub abbrs: Vec<String>,
    /// The allowed values, if restricted.
    pub enums: Option<Vec<String>>,
    /// Adopted through a `**`/`*` auto-map. Such args are never re-exported by
    /// another wildcard further up.
    pub from_auto_map_all: bool,
}

/// The concrete value of one argument in one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgVal {
    /// The value as given, before rendering.
    pub raw: String,
    /// Given explicitly by the caller rather than left at its default.
    pub provided: bool,
    /// Position of the argument in its command's declaration order.
    pub index: usize,
}

/// Concrete argument values keyed by the argument's primary name.
pub type ArgVals = BTreeMap<String, ArgVal>;

/// Problems computing the argument values of one invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("Unknown command '{0}'.")]
    UnknownCmd(String),

    #[error("Unknown argument '{0}'.")]
    UnknownArg(String),

    #[error("Too many positional values: got {got}, at most {max}.")]
    TooManyArgs { max: usize, got: usize },

    #[error("Argument '{0}' is given more than once.")]
    Duplicated(String),

    #[error("Value '{value}' of argument '{arg}' is not one of: {enums}.")]
    NotInEnums {
        arg: String,
        value: String,
        enums: String,
    },

    #[error("Stack depth {0} exceeded while resolving argument values.")]
    StackTooDeep(usize),
}

/// The ordered argument surface of a command.
#[derive(Debug, Clone, Default)]
/// The ordered argument surface of a command.
pub struct Args {
    list: Vec<Arg>,
    // Every name and abbreviation, pointing at the owning argument's name.
    names: HashMap<String, String>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an argument. Fails if the name or any abbreviation is already taken.
    pub fn add_arg(
        &mut self,
        name: &str,
        default_value: &str,
        abbrs: &[&str],
    ) -> Result<(), DefinitionError> {
        self.add(Arg {
            name: name.trim().to_string(),
            default_value: default_value.to_string(),
            abbrs: abbrs.iter().map(|a| a.trim().to_string()).collect(),
            enums: None,
            from_auto_map_all: false,
        })
    }

    /// Registers an argument adopted through a wildcard auto-map.
    pub fn add_auto_map_all_arg(
        &mut self,
        name: &str,
        default_value: &str,
        abbrs: &[&str],
    ) -> Result<(), DefinitionError> {
        self.add(Arg {
            name: name.trim().to_string(),
            default_value: default_value.to_string(),
            abbrs: abbrs.iter().map(|a| a.trim().to_string()).collect(),
            enums: None,
            from_auto_map_all: true,
        })
    }

    fn add(&mut self, arg: Arg) -> Result<(), DefinitionError> {
        if arg.name.is_empty() || arg.abbrs.iter().any(String::is_empty) {
            return Err(DefinitionError::EmptyArgName);
        }

        let mut all_names = vec![arg.name.as_str()];
        for abbr in &arg.abbrs {
            if all_names.contains(&abbr.as_str()) {
                return Err(DefinitionError::ArgNameConflict {
                    name: abbr.clone(),
                    existing: arg.name.clone(),
                });
            }
            all_names.push(abbr);
        }
        for name in &all_names {
            if let Some(existing) = self.names.get(*name) {
                return Err(DefinitionError::ArgNameConflict {
                    name: name.to_string(),
                    existing: existing.clone(),
                });
            }
        }

        for name in all_names {
            self.names.insert(name.to_string(), arg.name.clone());
        }
        log::trace!("Registered argument '{}' {:?}", arg.name, arg.abbrs);
        self.list.push(arg);
        Ok(())
    }

    /// Restricts an argument to a set of values. May only be called once per argument.
    pub fn set_enums(&mut self, name: &str, values: &[&str]) -> Result<(), DefinitionError> {
        let realname = self
            .realname(name)
            .ok_or_else(|| DefinitionError::UnknownArg(name.to_string()))?
            .to_string();
        let arg = self
            .list
            .iter_mut()
            .find(|a| a.name == realname)
            .ok_or_else(|| DefinitionError::UnknownArg(name.to_string()))?;

        if arg.enums.is_some() {
            return Err(DefinitionError::EnumsAlreadySet(realname));
        }
        let enums: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if !arg.default_value.is_empty() && !enums.contains(&arg.default_value) {
            return Err(DefinitionError::DefaultNotInEnums {
                arg: realname,
                value: arg.default_value.clone(),
                enums: enums.join(","),
            });
        }
        arg.enums = Some(enums);
        Ok(())
    }

    /// Resolves a name or abbreviation to the argument's primary name.
    pub fn realname(&self, name_or_abbr: &str) -> Option<&str> {
        self.names.get(name_or_abbr).map(String::as_str)
    }

    /// True if some argument owns this name or abbreviation.
    pub fn has_arg_or_abbr(&self, name_or_abbr: &str) -> bool {
        self.names.contains_key(name_or_abbr)
    }

    /// True if some argument's primary name is exactly `name`.
    pub fn has_arg(&self, name: &str) -> bool {
        self.list.iter().any(|a| a.name == name)
    }

    /// Looks an argument up by name or abbreviation.
    pub fn get(&self, name_or_abbr: &str) -> Option<&Arg> {
        let realname = self.realname(name_or_abbr)?;
        self.list.iter().find(|a| a.name == realname)
    }

    /// The abbreviations of an argument, empty if unknown.
    pub fn abbrs(&self, name: &str) -> &[String] {
        self.get(name).map(|a| a.abbrs.as_slice()).unwrap_or(&[])
    }

    /// The default value of an argument, by name or abbreviation.
    pub fn default_value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|a| a.default_value.as_str())
    }

    /// Primary names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.list.iter().map(|a| a.name.as_str()).collect()
    }

    /// The argument at a declaration position.
    pub fn by_index(&self, index: usize) -> Option<&Arg> {
        self.list.get(index)
    }

    /// Declaration position of an argument, by name or abbreviation.
    pub fn index_of(&self, name_or_abbr: &str) -> Option<usize> {
        let realname = self.realname(name_or_abbr)?;
        self.list.iter().position(|a| a.name == realname)
    }

    /// True if the argument was adopted through a wildcard.
    pub fn is_from_auto_map_all(&self, name: &str) -> bool {
        self.get(name).is_some_and(|a| a.from_auto_map_all)
    }

    /// Arguments in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Assigns invocation values to primary names: `named` entries by name or
    /// abbreviation, then `positional` values by declaration position.
    pub fn match_positional_and_named(
        &self,
        named: &[(String, String)],
        positional: &[String],
    ) -> Result<BTreeMap<String, String>, ArgError> {
        let mut given = BTreeMap::new();
        for (name, value) in named {
            let realname = self
                .realname(name)
                .ok_or_else(|| ArgError::UnknownArg(name.clone()))?;
            if given.insert(realname.to_string(), value.clone()).is_some() {
                return Err(ArgError::Duplicated(realname.to_string()));
            }
        }

        if positional.len() > self.list.len() {
            return Err(ArgError::TooManyArgs {
                max: self.list.len(),
                got: positional.len(),
            });
        }
        for (arg, value) in self.list.iter().zip(positional) {
            if given.insert(arg.name.clone(), value.clone()).is_some() {
                return Err(ArgError::Duplicated(arg.name.clone()));
            }
        }
        Ok(given)
    }

    /// Moves the named arguments to the end, in the given order. Arguments not named
    /// keep their relative order and come first.
    pub fn reorder(&mut self, tail: &[String]) {
        let (mut head, mut rest): (Vec<Arg>, Vec<Arg>) = std::mem::take(&mut self.list)
            .into_iter()
            .partition(|a| !tail.contains(&a.name));
        for name in tail {
            if let Some(pos) = rest.iter().position(|a| &a.name == name) {
                head.push(rest.remove(pos));
            }
        }
        head.append(&mut rest);
        self.list = head;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Args {
        let mut args = Args::new();
        args.add_arg("host", "127.0.0.1", &["h", "H"]).unwrap();
        args.add_arg("port", "4000", &["p"]).unwrap();
        args
    }

    #[test]
    fn test_add_arg_rejects_name_and_abbr_collisions() {
        let mut args = sample();
        let err = args.add_arg("h", "", &[]).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::ArgNameConflict {
                name: "h".to_string(),
                existing: "host".to_string()
            }
        );
        assert!(args.add_arg("user", "", &["p"]).is_err());
        assert!(args.add_arg("user", "", &["u", "u"]).is_err());
        assert!(args.add_arg("", "", &[]).is_err());
        // A failed registration must leave no partial names behind.
        assert!(!args.has_arg_or_abbr("user"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_realname_and_lookup() {
        let args = sample();
        assert_eq!(args.realname("H"), Some("host"));
        assert_eq!(args.realname("port"), Some("port"));
        assert_eq!(args.realname("nope"), None);
        assert_eq!(args.abbrs("p"), ["p".to_string()]);
        assert_eq!(args.index_of("p"), Some(1));
        assert!(args.has_arg("host"));
        assert!(!args.has_arg("h"));
    }

    #[test]
    fn test_set_enums_is_one_shot() {
        let mut args = Args::new();
        args.add_arg("mode", "fast", &[]).unwrap();
        args.set_enums("mode", &["fast", "slow"]).unwrap();
        assert_eq!(
            args.set_enums("mode", &["fast"]).unwrap_err(),
            DefinitionError::EnumsAlreadySet("mode".to_string())
        );
        assert!(args.set_enums("other", &["x"]).is_err());
    }

    #[test]
    fn test_set_enums_checks_default() {
        let mut args = Args::new();
        args.add_arg("mode", "medium", &[]).unwrap();
        assert!(matches!(
            args.set_enums("mode", &["fast", "slow"]),
            Err(DefinitionError::DefaultNotInEnums { .. })
        ));
    }

    #[test]
    fn test_reorder_moves_tail_to_end() {
        let mut args = sample();
        args.add_auto_map_all_arg("user", "", &[]).unwrap();
        args.add_arg("db", "", &[]).unwrap();
        args.reorder(&["user".to_string(), "host".to_string()]);
        assert_eq!(args.names(), vec!["port", "db", "user", "host"]);
        assert!(args.is_from_auto_map_all("user"));
        assert!(!args.is_from_auto_map_all("db"));
    }

    #[test]
    fn test_match_positional_and_named() {
        let args = sample();
        let given = args
            .match_positional_and_named(&[("p".to_string(), "5000".to_string())], &["db1".to_string()])
            .unwrap();
        assert_eq!(given.get("host").map(String::as_str), Some("db1"));
        assert_eq!(given.get("port").map(String::as_str), Some("5000"));

        let err = args
            .match_positional_and_named(&[("h".to_string(), "a".to_string())], &["b".to_string()])
            .unwrap_err();
        assert_eq!(err, ArgError::Duplicated("host".to_string()));

        let err = args
            .match_positional_and_named(&[], &["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap_err();
        assert_eq!(err, ArgError::TooManyArgs { max: 2, got: 3 });

        assert_eq!(
            args.match_positional_and_named(&[("user".to_string(), "x".to_string())], &[])
                .unwrap_err(),
            ArgError::UnknownArg("user".to_string())
        );
    }
}
