// src/core/env_ops.rs

use crate::core::errors::DefinitionError;
use std::{fmt, ops::BitOr};

/// A bitset of declared environment operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EnvOpType(u8);

impl EnvOpType {
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(1 << 1);
    pub const MAY_READ: Self = Self(1 << 2);
    pub const MAY_WRITE: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True if the op writes, or may write, its key.
    pub fn writes(self) -> bool {
        self.contains(Self::WRITE) || self.contains(Self::MAY_WRITE)
    }

    /// Parses `read`, `write`, `may-read`, `may-write`, or several joined with `|`.
    pub fn parse(key: &str, text: &str) -> Result<Self, DefinitionError> {
        let mut op = Self::default();
        for part in text.split('|').map(str::trim) {
            op = op
                | match part.to_lowercase().as_str() {
                    "read" | "r" => Self::READ,
                    "write" | "w" => Self::WRITE,
                    "may-read" | "mayread" => Self::MAY_READ,
                    "may-write" | "maywrite" => Self::MAY_WRITE,
                    _ => {
                        return Err(DefinitionError::InvalidEnvOp {
                            key: key.to_string(),
                            op: text.to_string(),
                        });
                    }
                };
        }
        Ok(op)
    }
}

impl BitOr for EnvOpType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for EnvOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::READ, "read"),
            (Self::WRITE, "write"),
            (Self::MAY_READ, "may-read"),
            (Self::MAY_WRITE, "may-write"),
        ]
        .iter()
        .filter(|(op, _)| self.contains(*op))
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join("|"))
    }
}

/// Ordered multimap `env key -> [ops]`: the declared read/write contract of a command.
#[derive(Debug, Clone, Default)]
pub struct EnvOps {
    entries: Vec<(String, Vec<EnvOpType>)>,
}

impl EnvOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, op: EnvOpType) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, ops)) => ops.push(op),
            None => self.entries.push((key.to_string(), vec![op])),
        }
    }

    pub fn ops(&self, key: &str) -> &[EnvOpType] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, ops)| ops.as_slice())
            .unwrap_or(&[])
    }

    /// Keys with at least one write or may-write op, in declaration order.
    pub fn write_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, ops)| ops.iter().any(|op| op.writes()))
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EnvOpType])> {
        self.entries.iter().map(|(k, ops)| (k.as_str(), ops.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ops() {
        assert_eq!(EnvOpType::parse("k", "read").unwrap(), EnvOpType::READ);
        let combined = EnvOpType::parse("k", "read|may-write").unwrap();
        assert!(combined.contains(EnvOpType::READ));
        assert!(combined.writes());
        assert_eq!(combined.to_string(), "read|may-write");
        assert!(EnvOpType::parse("k", "delete").is_err());
    }

    #[test]
    fn test_write_keys_in_order() {
        let mut ops = EnvOps::new();
        ops.add("a", EnvOpType::READ);
        ops.add("b", EnvOpType::MAY_WRITE);
        ops.add("a", EnvOpType::WRITE);
        ops.add("c", EnvOpType::MAY_READ);
        assert_eq!(ops.write_keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ops.ops("a").len(), 2);
        assert!(ops.ops("zzz").is_empty());
    }
}
