// src/core/env_mapping.rs

//! The static environment effects of a command: keys it sets to fixed values
//! (`Val2Env`) and keys it sets from its own arguments (`Arg2Env`).
//! Both keep insertion order and allow a single producer per env key.

use crate::core::errors::DefinitionError;

/// Ordered, unique `env key -> literal or template` bindings.
#[derive(Debug, Clone, Default)]
pub struct Val2Env {
    pairs: Vec<(String, String)>,
}

impl Val2Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, value: &str) -> Result<(), DefinitionError> {
        if self.has(key) {
            return Err(DefinitionError::DuplicateEnvKey {
                key: key.to_string(),
                mapper: "val2env",
            });
        }
        self.pairs.push((key.to_string(), value.to_string()));
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Ordered bijection `env key <-> argument name`.
#[derive(Debug, Clone, Default)]
pub struct Arg2Env {
    pairs: Vec<(String, String)>,
}

impl Arg2Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `arg`. Both sides must be unused.
    pub fn add(&mut self, key: &str, arg: &str) -> Result<(), DefinitionError> {
        if self.has_env(key) {
            return Err(DefinitionError::DuplicateEnvKey {
                key: key.to_string(),
                mapper: "arg2env",
            });
        }
        if let Some(existing) = self.key_of(arg) {
            return Err(DefinitionError::DuplicateArgMapping {
                arg: arg.to_string(),
                key: existing.to_string(),
            });
        }
        self.pairs.push((key.to_string(), arg.to_string()));
        Ok(())
    }

    pub fn has_env(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.pairs.iter().any(|(_, a)| a == arg)
    }

    /// The argument bound to an env key.
    pub fn arg_of(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, a)| a.as_str())
    }

    /// The env key bound to an argument.
    pub fn key_of(&self, arg: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(_, a)| a == arg)
            .map(|(k, _)| k.as_str())
    }

    /// `(env key, arg name)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, a)| (k.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_val2env_rejects_duplicate_key() {
        let mut v2e = Val2Env::new();
        v2e.add("db.host", "127.0.0.1").unwrap();
        v2e.add("db.port", "[[port]]").unwrap();
        assert_eq!(
            v2e.add("db.host", "other").unwrap_err(),
            DefinitionError::DuplicateEnvKey {
                key: "db.host".to_string(),
                mapper: "val2env"
            }
        );
        assert_eq!(v2e.get("db.port"), Some("[[port]]"));
        assert_eq!(v2e.keys().collect::<Vec<_>>(), vec!["db.host", "db.port"]);
    }

    #[test]
    fn test_arg2env_is_a_bijection() {
        let mut a2e = Arg2Env::new();
        a2e.add("db.host", "host").unwrap();
        assert!(a2e.add("db.host", "other").is_err());
        assert!(matches!(
            a2e.add("db.addr", "host"),
            Err(DefinitionError::DuplicateArgMapping { .. })
        ));
        assert_eq!(a2e.arg_of("db.host"), Some("host"));
        assert_eq!(a2e.key_of("host"), Some("db.host"));
        assert_eq!(a2e.len(), 1);
    }
}
