use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::collections::BTreeMap;

use crate::{
    cli::handlers::commons,
    core::{explain, flow_parser::SimpleFlowParser, renderer::TemplateRenderer},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the flattened environment, optionally after a dry walk of an invocation."
)]
struct EnvArgs {
    /// With an invocation, also print the default layer underneath its writes.
    #[arg(long)]
    all: bool,

    /// Include values that came from command arguments.
    #[arg(long)]
    show_args: bool,

    /// Only print keys starting with this prefix.
    #[arg(long, short)]
    prefix: Option<String>,

    /// An invocation whose env writes should be shown, e.g. `db.connect h=10.0.0.1`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    invocation: Vec<String>,
}

pub fn handle(args: Vec<String>, config: Option<&str>) -> Result<()> {
    let env_args = EnvArgs::try_parse_from(&args)?;
    let loaded = commons::load(config)?;

    let pairs = if env_args.invocation.is_empty() {
        loaded.tree.env().flatten(true, &[], !env_args.show_args)
    } else {
        let explanation = explain::explain_flow(
            &loaded.tree,
            &TemplateRenderer,
            &SimpleFlowParser,
            &env_args.invocation,
        )?;
        explanation
            .env
            .flatten(env_args.all, &[], !env_args.show_args)
    };
    let pairs = filter_prefix(pairs, env_args.prefix.as_deref());

    if pairs.is_empty() {
        println!("{}", t!("env.empty").dimmed());
        return Ok(());
    }
    let width = pairs.keys().map(String::len).max().unwrap_or_default();
    for (key, value) in &pairs {
        println!(
            "{:<width$} = {}",
            key.cyan(),
            commons::display_value(key, value),
            width = width
        );
    }
    Ok(())
}

fn filter_prefix(pairs: BTreeMap<String, String>, prefix: Option<&str>) -> BTreeMap<String, String> {
    match prefix {
        Some(prefix) => pairs
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect(),
        None => pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_prefix() {
        let pairs: BTreeMap<String, String> = [("db.host", "h"), ("db.port", "1"), ("app.mode", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let filtered = filter_prefix(pairs.clone(), Some("db."));
        assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["db.host", "db.port"]);
        assert_eq!(filter_prefix(pairs, None).len(), 3);
    }
}
