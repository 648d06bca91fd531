// src/core/automap.rs

//! # Auto-Map Status
//!
//! Per-command state of the argument auto-mapping: which arguments the command asked
//! for, what the discovery walk found on its sub-commands, and what was finally
//! committed onto the command.
//!
//! A command opts in with a list of definitions:
//! - `name`: adopt the argument named (or abbreviated) `name` from a sub-command.
//! - `name|abbr=default`: declare an argument right away, at this position.
//! - `*`: adopt every reachable argument whose env key nothing else provides.
//! - `**`: adopt every reachable argument.
//!
//! Wildcards are only valid as the last entry.

use crate::{
    constants::{ABBRS_SEP, AUTO_MAP_ALL, AUTO_MAP_NO_PROVIDER, KV_SEP},
    core::{
        args::{Arg, Args},
        cmd_tree::CmdId,
        env_mapping::Arg2Env,
        errors::DefinitionError,
    },
};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Definition {
    Explicit(String),
    Literal(String),
    Wildcard(String),
}

/// An argument found on a sub-command, held until the flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingCandidate {
    /// The sub-command the argument was found on.
    pub src_cmd: CmdId,
    /// The argument's name on that sub-command.
    pub src_arg: String,
    /// The env key the argument binds.
    pub env_key: String,
    /// Default of the source argument.
    pub default_value: String,
    /// Abbreviations still free on the target.
    pub abbrs: Vec<String>,
    /// Requested names this candidate satisfies. Empty when accepted by a wildcard.
    pub claimed_by: Vec<String>,
}

impl MappingCandidate {
    /// True if accepted by `*` or `**` rather than by name.
    pub fn via_wildcard(&self) -> bool {
        self.claimed_by.is_empty()
    }
}

/// Outcome of matching a sub-command's argument against the definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapDecision {
    /// Not wanted, or already mapped.
    Skip,
    /// Requested explicitly, by these names.
    Explicit(Vec<String>),
    /// Accepted by `*` or `**`.
    Wildcard,
}

#[derive(Debug, Clone, Default)]
/// Auto-map state of one command, from definitions to the committed args.
pub struct ArgsAutoMapStatus {
    definitions: Vec<Definition>,
    explicit: Vec<String>,
    map_all: bool,
    map_no_provider: bool,

    met_cmds: HashSet<CmdId>,
    // First writer wins.
    provided_keys: HashMap<String, CmdId>,
    // Keyed by the final arg name; iterated in lexical order on flush.
    cache: BTreeMap<String, MappingCandidate>,
    mapped: HashSet<String>,

    committed: Vec<String>,
    flushed: bool,
}

impl ArgsAutoMapStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the definition list. Literal arguments are registered on `args` at once.
    pub fn add_definitions<S: AsRef<str>>(
        &mut self,
        defs: impl IntoIterator<Item = S>,
        args: &mut Args,
    ) -> Result<(), DefinitionError> {
        for def in defs {
            let entry = def.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if let Some(Definition::Wildcard(wildcard)) = self.definitions.last() {
                return Err(DefinitionError::WildcardNotLast {
                    wildcard: wildcard.clone(),
                    entry: entry.to_string(),
                });
            }

            match entry {
                AUTO_MAP_ALL => {
                    self.map_all = true;
                    self.definitions.push(Definition::Wildcard(entry.to_string()));
                }
                AUTO_MAP_NO_PROVIDER => {
                    self.map_no_provider = true;
                    self.definitions.push(Definition::Wildcard(entry.to_string()));
                }
                _ => {
                    if let Some((names, default_value)) = entry.split_once(KV_SEP) {
                        let mut parts = names.split(ABBRS_SEP).map(str::trim);
                        let name = parts.next().unwrap_or_default();
                        let abbrs: Vec<&str> = parts.collect();
                        if name.is_empty() || abbrs.iter().any(|a| a.is_empty()) {
                            return Err(DefinitionError::MalformedArgDefinition {
                                entry: entry.to_string(),
                                reason: "empty name or abbreviation".to_string(),
                            });
                        }
                        args.add_arg(name, default_value.trim(), &abbrs)?;
                        self.definitions.push(Definition::Literal(name.to_string()));
                    } else if entry.contains(ABBRS_SEP) {
                        return Err(DefinitionError::MalformedArgDefinition {
                            entry: entry.to_string(),
                            reason: format!(
                                "abbreviations need a default value, as in '{}{}'",
                                entry, KV_SEP
                            ),
                        });
                    } else if !self.explicit.iter().any(|n| n == entry) {
                        self.explicit.push(entry.to_string());
                        self.definitions.push(Definition::Explicit(entry.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// True if the command opted into auto-mapping at all.
    pub fn is_enabled(&self) -> bool {
        !self.definitions.is_empty()
    }

    /// True if the command opted in and hasn't been compiled yet.
    pub fn is_pending(&self) -> bool {
        self.is_enabled() && !self.flushed
    }

    /// True if a discovery walk can find anything for this command.
    pub fn needs_walk(&self) -> bool {
        self.map_all || self.map_no_provider || !self.explicit.is_empty()
    }

    /// True for `**`.
    pub fn map_all(&self) -> bool {
        self.map_all
    }

    /// True for `*`.
    pub fn map_no_provider(&self) -> bool {
        self.map_no_provider
    }

    /// Names requested explicitly, in definition order.
    pub fn explicit_names(&self) -> &[String] {
        &self.explicit
    }

    /// The definitions as written, in order.
    pub fn definitions(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|d| match d {
                Definition::Explicit(s) | Definition::Literal(s) | Definition::Wildcard(s) => {
                    s.clone()
                }
            })
            .collect()
    }

    /// Marks a command visited. Returns false if it already was.
    pub fn mark_met(&mut self, cmd: CmdId) -> bool {
        self.met_cmds.insert(cmd)
    }

    /// True if the walk already visited `cmd`.
    pub fn is_met(&self, cmd: CmdId) -> bool {
        self.met_cmds.contains(&cmd)
    }

    /// Marks a command visited and records the env keys it provides.
    pub fn mark_met_with_keys<I, S>(&mut self, cmd: CmdId, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mark_met(cmd);
        for key in keys {
            self.add_provided_key(key, cmd);
        }
    }

    /// Records a provider for `key` unless one is already known.
    pub fn add_provided_key(&mut self, key: impl Into<String>, by: CmdId) {
        let key = key.into();
        log::trace!("Provided key '{}' by {:?}", key, by);
        self.provided_keys.entry(key).or_insert(by);
    }

    /// The first command recorded as providing `key`.
    pub fn provided_by(&self, key: &str) -> Option<CmdId> {
        self.provided_keys.get(key).copied()
    }

    /// True if some visited command provides `key`.
    pub fn is_provided(&self, key: &str) -> bool {
        self.provided_keys.contains_key(key)
    }

    /// Decides whether an argument seen on a sub-command should be adopted.
    pub fn should_map_by_definition(&self, name: &str, abbrs: &[String]) -> MapDecision {
        let all_names = || std::iter::once(name).chain(abbrs.iter().map(String::as_str));

        if all_names().any(|n| self.mapped.contains(n)) {
            return MapDecision::Skip;
        }
        let requested: Vec<String> = all_names()
            .filter(|n| self.explicit.iter().any(|e| e == n))
            .map(str::to_string)
            .collect();
        if !requested.is_empty() {
            return MapDecision::Explicit(requested);
        }
        if self.map_all || self.map_no_provider {
            return MapDecision::Wildcard;
        }
        MapDecision::Skip
    }

    /// Picks the name and abbreviations an adopted argument would get on the target,
    /// or `None` if it can't be adopted.
    pub fn check_can_add_arg_from_another_arg(
        &self,
        target: &Args,
        src_arg: &Arg,
        via_wildcard: bool,
    ) -> Option<(String, Vec<String>)> {
        if via_wildcard && src_arg.from_auto_map_all {
            log::trace!("Not re-exporting wildcard-adopted arg '{}'", src_arg.name);
            return None;
        }
        if target.has_arg(&src_arg.name) {
            return None;
        }

        let name = if target.has_arg_or_abbr(&src_arg.name) {
            let fallback = src_arg.abbrs.iter().find(|a| !target.has_arg_or_abbr(a))?;
            log::debug!(
                "Arg name '{}' collides with an abbreviation, adopting as '{}'",
                src_arg.name,
                fallback
            );
            fallback.clone()
        } else {
            src_arg.name.clone()
        };
        let abbrs = src_arg
            .abbrs
            .iter()
            .filter(|a| **a != name && !target.has_arg_or_abbr(a))
            .cloned()
            .collect();
        Some((name, abbrs))
    }

    /// Matches one `env_key -> src_arg` binding of `src_cmd` against the definitions
    /// and caches it when accepted. Returns true if cached.
    pub fn try_cache(
        &mut self,
        target_args: &Args,
        target_arg2env: &Arg2Env,
        src_cmd: CmdId,
        src_arg: &Arg,
        env_key: &str,
    ) -> bool {
        let claimed_by = match self.should_map_by_definition(&src_arg.name, &src_arg.abbrs) {
            MapDecision::Skip => return false,
            MapDecision::Explicit(names) => names,
            MapDecision::Wildcard => Vec::new(),
        };
        let via_wildcard = claimed_by.is_empty();

        let Some((name, abbrs)) =
            self.check_can_add_arg_from_another_arg(target_args, src_arg, via_wildcard)
        else {
            return false;
        };
        if target_arg2env.has_env(env_key) {
            log::debug!("Target already binds env key '{}', skipping '{}'", env_key, name);
            return false;
        }
        // The first candidate cached for an env key keeps it. A cached name is only
        // replaced by a candidate bound to a different key.
        if let Some((other, _)) = self.cache.iter().find(|(_, c)| c.env_key == env_key) {
            log::debug!(
                "Env key '{}' already cached for '{}', rejecting '{}'",
                env_key,
                other,
                name
            );
            return false;
        }
        if via_wildcard && self.cache.get(&name).is_some_and(|c| !c.via_wildcard()) {
            return false;
        }

        for requested in &claimed_by {
            self.mapped.insert(requested.clone());
        }
        log::trace!("Cached '{}' -> '{}' from {:?}", name, env_key, src_cmd);
        self.cache.insert(
            name,
            MappingCandidate {
                src_cmd,
                src_arg: src_arg.name.clone(),
                env_key: env_key.to_string(),
                default_value: src_arg.default_value.clone(),
                abbrs,
                claimed_by,
            },
        );
        true
    }

    /// Candidates waiting for the flush, by final name.
    pub fn cached(&self) -> impl Iterator<Item = (&str, &MappingCandidate)> {
        self.cache.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Commits the cached candidates onto the owner's `args` and `arg2env`,
    /// then reorders the owner's args to follow the definitions.
    pub fn flush_cache(
        &mut self,
        args: &mut Args,
        arg2env: &mut Arg2Env,
    ) -> Result<(), DefinitionError> {
        let mut tail = Vec::new();
        let definitions = self.definitions.clone();

        for def in &definitions {
            match def {
                Definition::Literal(name) => tail.push(name.clone()),
                Definition::Explicit(requested) => {
                    let claimed = self
                        .cache
                        .iter()
                        .find(|(_, c)| c.claimed_by.contains(requested))
                        .map(|(n, _)| n.clone());
                    if let Some(name) = claimed
                        && let Some(candidate) = self.cache.remove(&name)
                        && self.commit(&name, &candidate, args, arg2env)?
                    {
                        tail.push(name);
                    }
                }
                Definition::Wildcard(_) => {
                    for (name, candidate) in std::mem::take(&mut self.cache) {
                        if self.is_smart_skipped(&candidate) {
                            log::debug!(
                                "Env key '{}' is provided elsewhere, not adopting '{}'",
                                candidate.env_key,
                                name
                            );
                            continue;
                        }
                        if self.commit(&name, &candidate, args, arg2env)? {
                            tail.push(name);
                        }
                    }
                }
            }
        }

        self.cache.clear();
        args.reorder(&tail);
        self.flushed = true;
        Ok(())
    }

    fn is_smart_skipped(&self, candidate: &MappingCandidate) -> bool {
        self.map_no_provider
            && !self.map_all
            && candidate.via_wildcard()
            && self
                .provided_by(&candidate.env_key)
                .is_some_and(|p| p != candidate.src_cmd)
    }

    fn commit(
        &mut self,
        name: &str,
        candidate: &MappingCandidate,
        args: &mut Args,
        arg2env: &mut Arg2Env,
    ) -> Result<bool, DefinitionError> {
        let conflict = if arg2env.has_env(&candidate.env_key) {
            Some("env key already bound")
        } else if args.has_arg_or_abbr(name) {
            Some("name already taken")
        } else {
            None
        };
        if let Some(reason) = conflict {
            log::warn!(
                "Dropping auto-mapped arg '{}' -> '{}': {}",
                name,
                candidate.env_key,
                reason
            );
            for requested in &candidate.claimed_by {
                self.mapped.remove(requested);
            }
            return Ok(false);
        }

        let abbrs: Vec<&str> = candidate
            .abbrs
            .iter()
            .map(String::as_str)
            .filter(|a| !args.has_arg_or_abbr(a))
            .collect();
        if candidate.via_wildcard() {
            args.add_auto_map_all_arg(name, &candidate.default_value, &abbrs)?;
        } else {
            args.add_arg(name, &candidate.default_value, &abbrs)?;
        }
        arg2env.add(&candidate.env_key, name)?;
        log::debug!("Auto-mapped arg '{}' -> '{}'", name, candidate.env_key);
        self.committed.push(name.to_string());
        Ok(true)
    }

    /// Arg names adopted by the flush, in commit order.
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    /// True once the cache was committed.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// True when every explicitly requested name has been mapped.
    pub fn fully_mapped(&self) -> bool {
        self.explicit.iter().all(|n| self.mapped.contains(n))
    }

    /// True when nothing is missing: every name mapped, or a wildcard present.
    pub fn fully_mapped_or_map_all(&self) -> bool {
        self.map_all || self.map_no_provider || self.fully_mapped()
    }

    /// True when the discovery walk can stop: no wildcard and nothing left to find.
    pub fn is_done(&self) -> bool {
        !self.map_all && !self.map_no_provider && self.fully_mapped()
    }

    /// Requested names that are still unmapped.
    pub fn unmapped_args(&self) -> Vec<String> {
        self.explicit
            .iter()
            .filter(|n| !self.mapped.contains(*n))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(name: &str, default_value: &str, abbrs: &[&str]) -> Arg {
        Arg {
            name: name.to_string(),
            default_value: default_value.to_string(),
            abbrs: abbrs.iter().map(|a| a.to_string()).collect(),
            enums: None,
            from_auto_map_all: false,
        }
    }

    fn status(defs: &[&str], args: &mut Args) -> ArgsAutoMapStatus {
        let mut status = ArgsAutoMapStatus::new();
        status.add_definitions(defs.iter().copied(), args).unwrap();
        status
    }

    #[test]
    fn test_definitions_parsing() {
        let mut args = Args::new();
        let status = status(&["host", "port|p=4000", "*"], &mut args);
        assert!(status.map_no_provider());
        assert!(!status.map_all());
        assert_eq!(status.explicit_names(), &["host".to_string()]);
        assert_eq!(args.names(), vec!["port"]);
        assert_eq!(args.default_value("p"), Some("4000"));
        assert_eq!(status.definitions(), vec!["host", "port|p=4000", "*"]);
    }

    #[test]
    fn test_wildcard_must_be_last() {
        let mut args = Args::new();
        let mut status = ArgsAutoMapStatus::new();
        let err = status.add_definitions(["**", "host"], &mut args).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::WildcardNotLast {
                wildcard: "**".to_string(),
                entry: "host".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_literals() {
        let mut args = Args::new();
        let mut status = ArgsAutoMapStatus::new();
        assert!(matches!(
            status.add_definitions(["=1"], &mut args),
            Err(DefinitionError::MalformedArgDefinition { .. })
        ));
        assert!(matches!(
            status.add_definitions(["port||p=1"], &mut args),
            Err(DefinitionError::MalformedArgDefinition { .. })
        ));
        assert!(matches!(
            status.add_definitions(["port|p"], &mut args),
            Err(DefinitionError::MalformedArgDefinition { .. })
        ));
    }

    #[test]
    fn test_provided_keys_first_writer_wins() {
        let mut args = Args::new();
        let mut status = status(&["*"], &mut args);
        status.mark_met_with_keys(CmdId(1), ["conflict.key"]);
        status.mark_met_with_keys(CmdId(2), ["conflict.key", "other"]);
        assert_eq!(status.provided_by("conflict.key"), Some(CmdId(1)));
        assert_eq!(status.provided_by("other"), Some(CmdId(2)));
        assert!(status.is_met(CmdId(2)));
        assert!(!status.mark_met(CmdId(1)));
    }

    #[test]
    fn test_should_map_by_definition() {
        let mut args = Args::new();
        let status = status(&["h"], &mut args);
        assert_eq!(
            status.should_map_by_definition("host", &["h".to_string()]),
            MapDecision::Explicit(vec!["h".to_string()])
        );
        assert_eq!(status.should_map_by_definition("port", &[]), MapDecision::Skip);

        let mut args = Args::new();
        let status = self::status(&["**"], &mut args);
        assert_eq!(status.should_map_by_definition("port", &[]), MapDecision::Wildcard);
    }

    #[test]
    fn test_explicit_name_closure() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["host"], &mut args);
        assert!(!status.is_done());

        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("host", "127.0.0.1", &["h"]), "db.host"));
        assert!(status.fully_mapped());
        assert!(status.is_done());
        // Once mapped, the same name is never adopted again.
        assert!(!status.try_cache(&args, &a2e, CmdId(2), &arg("host", "", &[]), "other.host"));

        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(args.names(), vec!["host"]);
        assert!(!args.is_from_auto_map_all("host"));
        assert_eq!(args.abbrs("host"), &["h".to_string()]);
        assert_eq!(a2e.key_of("host"), Some("db.host"));
        assert_eq!(status.committed(), &["host".to_string()]);
    }

    #[test]
    fn test_env_key_first_discovered_wins() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["**"], &mut args);
        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("arg1", "", &[]), "conflict.key"));
        assert!(!status.try_cache(&args, &a2e, CmdId(2), &arg("arg2", "", &[]), "conflict.key"));
        assert!(!status.try_cache(&args, &a2e, CmdId(3), &arg("arg1", "x", &[]), "conflict.key"));
        let cached: Vec<_> = status.cached().map(|(n, c)| (n, c.src_cmd)).collect();
        assert_eq!(cached, vec![("arg1", CmdId(1))]);

        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(args.names(), vec!["arg1"]);
        assert_eq!(args.default_value("arg1"), Some(""));
    }

    #[test]
    fn test_same_name_with_new_env_key_replaces_the_candidate() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["**"], &mut args);
        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("arg1", "", &[]), "old.key"));
        assert!(status.try_cache(&args, &a2e, CmdId(2), &arg("arg1", "y", &[]), "new.key"));

        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(a2e.key_of("arg1"), Some("new.key"));
        assert_eq!(args.default_value("arg1"), Some("y"));
    }

    #[test]
    fn test_wildcard_smart_skip() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["*"], &mut args);
        status.mark_met_with_keys(CmdId(1), ["db.host"]);
        status.mark_met_with_keys(CmdId(2), ["db.port"]);

        // Provided by another command: dropped.
        assert!(status.try_cache(&args, &a2e, CmdId(3), &arg("host", "", &[]), "db.host"));
        // Provided by its own source: kept.
        assert!(status.try_cache(&args, &a2e, CmdId(2), &arg("port", "", &[]), "db.port"));
        // Not provided at all: kept.
        assert!(status.try_cache(&args, &a2e, CmdId(3), &arg("user", "", &[]), "db.user"));

        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(args.names(), vec!["port", "user"]);
        assert!(args.is_from_auto_map_all("user"));
        assert!(!a2e.has_env("db.host"));
    }

    #[test]
    fn test_wildcard_greedy_accept() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["**"], &mut args);
        status.mark_met_with_keys(CmdId(1), ["db.host"]);
        assert!(status.try_cache(&args, &a2e, CmdId(3), &arg("host", "", &[]), "db.host"));
        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(a2e.arg_of("db.host"), Some("host"));
    }

    #[test]
    fn test_no_wildcard_reexport() {
        let mut args = Args::new();
        let mut status = status(&["**"], &mut args);
        let mut adopted = arg("host", "", &[]);
        adopted.from_auto_map_all = true;
        assert!(status.check_can_add_arg_from_another_arg(&args, &adopted, true).is_none());
        assert!(status.check_can_add_arg_from_another_arg(&args, &adopted, false).is_some());
    }

    #[test]
    fn test_abbreviation_collision_renaming() {
        let mut args = Args::new();
        args.add_arg("hostname", "", &["host"]).unwrap();
        args.add_arg("port", "", &["p"]).unwrap();
        let status = status(&["**"], &mut args);

        let (name, abbrs) = status
            .check_can_add_arg_from_another_arg(&args, &arg("host", "", &["p", "hst", "h"]), true)
            .unwrap();
        assert_eq!(name, "hst");
        assert_eq!(abbrs, vec!["h".to_string()]);

        // Nothing free: rejected.
        assert!(
            status
                .check_can_add_arg_from_another_arg(&args, &arg("host", "", &["p"]), true)
                .is_none()
        );
        // Same primary name: rejected.
        assert!(
            status
                .check_can_add_arg_from_another_arg(&args, &arg("port", "", &["x"]), true)
                .is_none()
        );
    }

    #[test]
    fn test_flush_orders_by_definitions() {
        let mut args = Args::new();
        args.add_arg("own", "", &[]).unwrap();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["port", "mode=fast", "**"], &mut args);
        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("zeta", "", &[]), "k.zeta"));
        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("alpha", "", &[]), "k.alpha"));
        assert!(status.try_cache(&args, &a2e, CmdId(2), &arg("port", "4000", &[]), "k.port"));

        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert_eq!(args.names(), vec!["own", "port", "mode", "alpha", "zeta"]);
        assert!(!args.is_from_auto_map_all("port"));
        assert!(args.is_from_auto_map_all("alpha"));
        assert!(status.is_flushed());
    }

    #[test]
    fn test_flush_revalidates_against_owner() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["host"], &mut args);
        assert!(status.try_cache(&args, &a2e, CmdId(1), &arg("host", "", &[]), "db.host"));

        args.add_arg("addr", "", &[]).unwrap();
        a2e.add("db.host", "addr").unwrap();
        status.flush_cache(&mut args, &mut a2e).unwrap();

        assert!(!args.has_arg("host"));
        assert!(!status.fully_mapped_or_map_all());
        assert_eq!(status.unmapped_args(), vec!["host".to_string()]);
    }

    #[test]
    fn test_unmapped_explicit_name() {
        let mut args = Args::new();
        let mut a2e = Arg2Env::new();
        let mut status = status(&["existingarg"], &mut args);
        status.flush_cache(&mut args, &mut a2e).unwrap();
        assert!(!status.fully_mapped_or_map_all());
        assert_eq!(status.unmapped_args(), vec!["existingarg".to_string()]);
    }
}
