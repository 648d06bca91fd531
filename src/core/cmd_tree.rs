// src/core/cmd_tree.rs

//! # Command Tree
//!
//! An arena of named nodes addressed by dotted paths (`db.connect`). Every path
//! segment may be written as the node's name or one of its abbreviations.
//! Intermediate nodes are created on demand and may carry no command.

use crate::{
    constants::CMD_PATH_SEP,
    core::{
        command::Cmd,
        env::{Env, EnvLayerType},
        errors::DefinitionError,
    },
};
use std::collections::BTreeMap;

/// Handle to a registered command. Only valid for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CmdId(pub(crate) usize);

#[derive(Debug)]
struct Node {
    name: String,
    parent: usize,
    abbrs: Vec<String>,
    children: Vec<usize>,
    cmd: Option<CmdId>,
}

/// One line of a depth-first listing of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub depth: usize,
    pub name: String,
    pub abbrs: Vec<String>,
    pub cmd: Option<CmdId>,
    /// Last child of its parent.
    pub is_last: bool,
}

#[derive(Debug)]
pub struct CmdTree {
    nodes: Vec<Node>,
    cmds: Vec<Cmd>,
    env: Env,
    macros: BTreeMap<String, String>,
}

impl Default for CmdTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: String::new(),
                parent: 0,
                abbrs: Vec::new(),
                children: Vec::new(),
                cmd: None,
            }],
            cmds: Vec::new(),
            env: Env::new(EnvLayerType::Default),
            macros: BTreeMap::new(),
        }
    }

    /// The default environment layer shared by every walk over this tree.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn macros(&self) -> &BTreeMap<String, String> {
        &self.macros
    }

    pub fn add_macro(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.macros.insert(name.into(), body.into());
    }

    /// Registers `cmd` at its path. `abbrs` become abbreviations of the last segment.
    pub fn register(&mut self, cmd: Cmd, abbrs: &[&str]) -> Result<CmdId, DefinitionError> {
        let path = cmd.path().to_string();
        let segments: Vec<&str> = path.split(CMD_PATH_SEP).map(str::trim).collect();
        if path.trim().is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(DefinitionError::InvalidCmdPath(path));
        }

        let mut current = 0;
        for segment in &segments {
            current = match self.child_by_name(current, segment) {
                Some(child) => child,
                None => self.add_child(current, segment)?,
            };
        }

        for abbr in abbrs.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            self.add_node_abbr(current, abbr)?;
        }

        let node = self
            .nodes
            .get_mut(current)
            .ok_or_else(|| DefinitionError::InvalidCmdPath(path.clone()))?;
        if node.cmd.is_some() {
            return Err(DefinitionError::DuplicateCmd(path));
        }
        let id = CmdId(self.cmds.len());
        node.cmd = Some(id);
        log::debug!("Registered command '{}' from {}", path, cmd.source());
        self.cmds.push(cmd);
        Ok(id)
    }

    /// Finds a command by path. Segments may be abbreviations.
    pub fn find(&self, path: &str) -> Option<CmdId> {
        let mut current = 0;
        for segment in path.split(CMD_PATH_SEP) {
            let node = self.nodes.get(current)?;
            current = node.children.iter().copied().find(|&c| {
                self.nodes
                    .get(c)
                    .is_some_and(|n| n.name == segment || n.abbrs.iter().any(|a| a == segment))
            })?;
        }
        self.nodes.get(current).and_then(|n| n.cmd)
    }

    pub fn cmd(&self, id: CmdId) -> Option<&Cmd> {
        self.cmds.get(id.0)
    }

    pub fn cmd_mut(&mut self, id: CmdId) -> Option<&mut Cmd> {
        self.cmds.get_mut(id.0)
    }

    /// Path of a command, or an empty string for a foreign id.
    pub fn path_of(&self, id: CmdId) -> &str {
        self.cmd(id).map(Cmd::path).unwrap_or_default()
    }

    /// All command ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = CmdId> + use<> {
        (0..self.cmds.len()).map(CmdId)
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Depth-first listing of the tree, children sorted by name.
    pub fn entries(&self) -> Vec<TreeEntry> {
        let mut entries = Vec::new();
        self.collect_entries(0, 0, &mut entries);
        entries
    }

    fn collect_entries(&self, node: usize, depth: usize, out: &mut Vec<TreeEntry>) {
        let Some(parent) = self.nodes.get(node) else {
            return;
        };
        let mut children = parent.children.clone();
        children.sort_by(|a, b| self.node_name(*a).cmp(self.node_name(*b)));

        let count = children.len();
        for (i, index) in children.into_iter().enumerate() {
            let Some(child) = self.nodes.get(index) else {
                continue;
            };
            out.push(TreeEntry {
                depth,
                name: child.name.clone(),
                abbrs: child.abbrs.clone(),
                cmd: child.cmd,
                is_last: i + 1 == count,
            });
            self.collect_entries(index, depth + 1, out);
        }
    }

    fn node_name(&self, node: usize) -> &str {
        self.nodes.get(node).map(|n| n.name.as_str()).unwrap_or_default()
    }

    fn child_by_name(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    fn sibling_owner(&self, parent: usize, name: &str) -> Option<&str> {
        let node = self.nodes.get(parent)?;
        node.children
            .iter()
            .filter_map(|&c| self.nodes.get(c))
            .find(|n| n.name == name || n.abbrs.iter().any(|a| a == name))
            .map(|n| n.name.as_str())
    }

    fn add_child(&mut self, parent: usize, name: &str) -> Result<usize, DefinitionError> {
        if let Some(existing) = self.sibling_owner(parent, name) {
            return Err(DefinitionError::CmdNameConflict {
                name: name.to_string(),
                existing: existing.to_string(),
            });
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            abbrs: Vec::new(),
            children: Vec::new(),
            cmd: None,
        });
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(index);
        }
        Ok(index)
    }

    fn add_node_abbr(&mut self, node: usize, abbr: &str) -> Result<(), DefinitionError> {
        let Some((parent, own_name)) = self.nodes.get(node).map(|n| (n.parent, n.name.clone()))
        else {
            return Ok(());
        };
        match self.sibling_owner(parent, abbr) {
            Some(existing) if existing == own_name => return Ok(()),
            Some(existing) => {
                return Err(DefinitionError::CmdNameConflict {
                    name: abbr.to_string(),
                    existing: existing.to_string(),
                });
            }
            None => {}
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.abbrs.push(abbr.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CmdTree {
        let mut tree = CmdTree::new();
        tree.register(Cmd::new("db.connect", "test"), &["c", "conn"]).unwrap();
        tree.register(Cmd::new("db.backup", "test"), &["b"]).unwrap();
        tree.register(Cmd::new("deploy", "test"), &[]).unwrap();
        tree
    }

    #[test]
    fn test_find_with_abbreviations() {
        let tree = tree();
        let id = tree.find("db.connect").unwrap();
        assert_eq!(tree.find("db.c"), Some(id));
        assert_eq!(tree.find("db.conn"), Some(id));
        assert_eq!(tree.path_of(id), "db.connect");
        // Intermediate node without a command.
        assert_eq!(tree.find("db"), None);
        assert_eq!(tree.find("db.nope"), None);
    }

    #[test]
    fn test_register_errors() {
        let mut tree = tree();
        assert_eq!(
            tree.register(Cmd::new("db.connect", "x"), &[]).unwrap_err(),
            DefinitionError::DuplicateCmd("db.connect".to_string())
        );
        assert!(matches!(
            tree.register(Cmd::new("db.check", "x"), &["c"]),
            Err(DefinitionError::CmdNameConflict { .. })
        ));
        assert!(matches!(
            tree.register(Cmd::new("db..x", "x"), &[]),
            Err(DefinitionError::InvalidCmdPath(_))
        ));
        // Registering a command on an existing intermediate node is fine.
        let id = tree.register(Cmd::new("db", "x"), &[]).unwrap();
        assert_eq!(tree.find("db"), Some(id));
    }

    #[test]
    fn test_entries_listing() {
        let tree = tree();
        let names: Vec<(usize, String, bool)> = tree
            .entries()
            .into_iter()
            .map(|e| (e.depth, e.name, e.is_last))
            .collect();
        assert_eq!(
            names,
            vec![
                (0, "db".to_string(), false),
                (1, "backup".to_string(), false),
                (1, "connect".to_string(), true),
                (0, "deploy".to_string(), true),
            ]
        );
        assert_eq!(tree.ids().count(), 3);
    }
}
