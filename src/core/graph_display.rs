// src/core/graph_display.rs

use crate::core::cmd_tree::CmdTree;
use colored::Colorize;

/// Controls what `render_cmd_tree` prints next to each node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub show_help: bool,
    pub show_sources: bool,
    pub max_depth: Option<usize>,
}

/// Renders the command tree as ASCII art, one node per line.
///
/// Nodes that only group other commands are dimmed; abbreviations follow the name
/// in parentheses.
pub fn render_cmd_tree(tree: &CmdTree, options: &DisplayOptions) -> String {
    let mut out = String::new();
    // One flag per ancestor depth: whether that ancestor was the last of its siblings.
    let mut last_at_depth: Vec<bool> = Vec::new();

    for entry in tree.entries() {
        last_at_depth.truncate(entry.depth);
        let hidden = options.max_depth.is_some_and(|max| entry.depth >= max);
        if !hidden {
            let prefix: String = last_at_depth
                .iter()
                .map(|last| if *last { "   " } else { "│  " })
                .collect();
            let connector = if entry.is_last { "└─" } else { "├─" };

            let cmd = entry.cmd.and_then(|id| tree.cmd(id));
            let mut line = match cmd {
                Some(_) => format!("{}{}{}", prefix, connector, entry.name.cyan()),
                None => format!("{}{}{}", prefix, connector, entry.name.dimmed()),
            };
            if !entry.abbrs.is_empty() {
                line.push_str(&format!(" ({})", entry.abbrs.join("|")));
            }
            if let Some(cmd) = cmd {
                if options.show_sources {
                    line.push_str(&format!(" [{}]", cmd.source()).dimmed().to_string());
                }
                if options.show_help && !cmd.help().is_empty() {
                    line.push_str(&format!("  {}", cmd.help()));
                }
            }
            out.push_str(&line);
            out.push('\n');
        }
        last_at_depth.push(entry.is_last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::Cmd;

    fn tree() -> CmdTree {
        let mut tree = CmdTree::new();
        let mut connect = Cmd::new("db.connect", "db.toml");
        connect.set_help("Connect to the database.");
        tree.register(connect, &["c"]).unwrap();
        tree.register(Cmd::new("db.query", "db.toml"), &[]).unwrap();
        tree.register(Cmd::new("deploy", "app.toml"), &[]).unwrap();
        tree
    }

    #[test]
    fn test_render_draws_branches() {
        colored::control::set_override(false);
        let rendered = render_cmd_tree(&tree(), &DisplayOptions::default());
        assert_eq!(
            rendered,
            "├─db\n│  ├─connect (c)\n│  └─query\n└─deploy\n"
        );
    }

    #[test]
    fn test_render_options() {
        colored::control::set_override(false);
        let options = DisplayOptions {
            show_help: true,
            show_sources: true,
            max_depth: None,
        };
        let rendered = render_cmd_tree(&tree(), &options);
        assert!(rendered.contains("connect (c) [db.toml]  Connect to the database."));

        let shallow = DisplayOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        assert_eq!(render_cmd_tree(&tree(), &shallow), "├─db\n└─deploy\n");
    }
}
