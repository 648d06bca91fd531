use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::{explain, flow_parser::SimpleFlowParser, renderer::TemplateRenderer},
    models::FlowStep,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows every command an invocation reaches, with the values it would receive."
)]
struct FlowArgs {
    /// Print the steps as JSON.
    #[arg(long)]
    json: bool,

    /// Hide arguments left at their default value.
    #[arg(long)]
    provided_only: bool,

    /// The invocation, e.g. `deploy target=staging`. May be a whole flow joined by `:`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    invocation: Vec<String>,
}

pub fn handle(args: Vec<String>, config: Option<&str>) -> Result<()> {
    let flow_args = FlowArgs::try_parse_from(&args)?;
    let loaded = commons::load(config)?;
    let explanation = explain::explain_flow(
        &loaded.tree,
        &TemplateRenderer,
        &SimpleFlowParser,
        &flow_args.invocation,
    )?;

    if flow_args.json {
        println!("{}", serde_json::to_string_pretty(&explanation.steps)?);
        return Ok(());
    }

    println!(
        "\n{}",
        format!(t!("flow.header"), invocation = flow_args.invocation.join(" ")).bold()
    );
    for step in &explanation.steps {
        println!("{}", format_step(step, flow_args.provided_only));
    }
    Ok(())
}

/// One indented line per step: path, then `name=value` pairs, then the note if any.
fn format_step(step: &FlowStep, provided_only: bool) -> String {
    let mut line = format!("{}{}", "  ".repeat(step.depth + 1), step.path.cyan());
    for (name, value, provided) in &step.args {
        if provided_only && !provided {
            continue;
        }
        let value = commons::display_value(name, value);
        let pair = format!("{}={}", name, value);
        if *provided {
            line.push_str(&format!(" {}", pair));
        } else {
            line.push_str(&format!(" {}", pair.dimmed()));
        }
    }
    if let Some(note) = &step.note {
        line.push_str(&format!("  {} {}", "!".yellow(), note.yellow()));
    }
    line
}
