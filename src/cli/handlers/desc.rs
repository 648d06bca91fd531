use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::command::CmdKind,
    models::{CmdDescription, EnvBinding},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Describes one command: its arguments, env bindings and auto-map report."
)]
struct DescArgs {
    /// The command path, e.g. `db.connect`. Abbreviations are accepted.
    cmd: String,

    /// Print the description as JSON.
    #[arg(long)]
    json: bool,
}

pub fn handle(args: Vec<String>, config: Option<&str>) -> Result<()> {
    let desc_args = DescArgs::try_parse_from(&args)?;
    let loaded = commons::load(config)?;
    let cmd = commons::find_cmd(&loaded.tree, &desc_args.cmd)?;
    let mut description = CmdDescription::new(cmd, loaded.problems.for_cmd(cmd.path()));
    for binding in &mut description.val2env {
        binding.value = commons::display_value(&binding.key, &binding.value).to_string();
    }

    if desc_args.json {
        println!("{}", serde_json::to_string_pretty(&description)?);
        return Ok(());
    }
    print_description(&description);
    Ok(())
}

fn print_description(desc: &CmdDescription) {
    println!("\n--- {} ---", desc.path.yellow().bold());
    if !desc.help.is_empty() {
        println!("  {}", desc.help);
    }
    println!("  {:<10} {}", t!("desc.label.source").blue(), desc.source);
    let kind = match &desc.kind {
        CmdKind::Empty => t!("desc.kind.empty").to_string(),
        CmdKind::Builtin => t!("desc.kind.builtin").to_string(),
        CmdKind::Exec(line) => format!("{} `{}`", t!("desc.kind.exec"), line),
        CmdKind::Flow(_) => t!("desc.kind.flow").to_string(),
    };
    println!("  {:<10} {}", t!("desc.label.kind").blue(), kind);
    if let CmdKind::Flow(lines) = &desc.kind {
        for line in lines {
            println!("  {:<10} {}", "", line.dimmed());
        }
    }

    println!("\n{}", t!("desc.section.args").bold());
    if desc.args.is_empty() {
        println!("  {}", t!("desc.none").dimmed());
    }
    for arg in &desc.args {
        let mut line = format!("  {}", arg.name.cyan());
        if !arg.abbrs.is_empty() {
            line.push_str(&format!(" ({})", arg.abbrs.join("|")));
        }
        line.push_str(&format!(" = '{}'", arg.default_value));
        if let Some(enums) = &arg.enums {
            line.push_str(&format!(" [{}]", enums.join(",")));
        }
        if arg.from_auto_map_all {
            line.push_str(&format!(" {}", t!("desc.tag.wildcard").dimmed()));
        }
        println!("{}", line);
    }

    print_bindings(t!("desc.section.arg2env"), &desc.arg2env);
    print_bindings(t!("desc.section.val2env"), &desc.val2env);
    print_bindings(t!("desc.section.env_ops"), &desc.env_ops);

    if let Some(report) = &desc.automap {
        println!("\n{}", t!("desc.section.automap").bold());
        println!(
            "  {:<12} {}",
            t!("desc.automap.definitions").blue(),
            report.definitions.join(", ")
        );
        println!(
            "  {:<12} {}",
            t!("desc.automap.committed").blue(),
            report.committed.join(", ")
        );
        if !report.unmapped.is_empty() {
            println!(
                "  {:<12} {}",
                t!("desc.automap.unmapped").blue(),
                report.unmapped.join(", ").red()
            );
        }
    }

    if !desc.problems.is_empty() {
        println!("\n{}", t!("desc.section.problems").bold());
        for problem in &desc.problems {
            println!("  {} {}", "!".yellow(), problem.message);
        }
    }
}

fn print_bindings(title: &str, bindings: &[EnvBinding]) {
    if bindings.is_empty() {
        return;
    }
    println!("\n{}", title.bold());
    for binding in bindings {
        println!("  {} = {}", binding.key.cyan(), binding.value);
    }
}
