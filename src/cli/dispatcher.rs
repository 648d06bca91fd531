use anyhow::{Result, anyhow};
use clap::CommandFactory;

use crate::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// Defines an action, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, Option<&str>) -> Result<()>,
}

/// The single source of truth for all actions.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "check",
        aliases: &[],
        handler: handlers::check::handle,
    },
    CommandDefinition {
        name: "desc",
        aliases: &["describe", "info"],
        handler: handlers::desc::handle,
    },
    CommandDefinition {
        name: "env",
        aliases: &[],
        handler: handlers::env::handle,
    },
    CommandDefinition {
        name: "flow",
        aliases: &["explain"],
        handler: handlers::flow::handle,
    },
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        handler: handlers::tree::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes the parsed command line to its handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut args = cli.args.into_iter();
    let Some(action) = args.next() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let command = find_command(&action)
        .ok_or_else(|| anyhow!(format!(t!("cli.error.unknown_action"), name = action)))?;
    (command.handler)(args.collect(), cli.config.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_and_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for cmd in COMMAND_REGISTRY {
            assert!(seen.insert(cmd.name), "duplicate name {}", cmd.name);
            for alias in cmd.aliases {
                assert!(seen.insert(*alias), "duplicate alias {}", alias);
            }
        }
    }

    #[test]
    fn test_find_command_by_alias() {
        assert_eq!(find_command("ls").map(|c| c.name), Some("tree"));
        assert_eq!(find_command("explain").map(|c| c.name), Some("flow"));
        assert!(find_command("run").is_none());
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let cli = Cli {
            config: None,
            args: vec!["frobnicate".to_string()],
        };
        let err = dispatch(cli).unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }
}
