use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::graph_display::{self, DisplayOptions},
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Displays the command tree.")]
struct TreeArgs {
    /// Show the help line of each command.
    #[arg(long)]
    help_lines: bool,

    /// Show the file each command was defined in.
    #[arg(long, short)]
    sources: bool,

    /// Show all available information.
    #[arg(long)]
    all: bool,

    /// Limit the depth of the tree display.
    #[arg(long, short)]
    depth: Option<usize>,
}

pub fn handle(args: Vec<String>, config: Option<&str>) -> Result<()> {
    let tree_args = TreeArgs::try_parse_from(&args)?;
    let loaded = commons::load(config)?;

    if loaded.tree.is_empty() {
        println!("{}", t!("tree.empty"));
        return Ok(());
    }

    let display_options = DisplayOptions {
        show_help: tree_args.help_lines || tree_args.all,
        show_sources: tree_args.sources || tree_args.all,
        max_depth: tree_args.depth,
    };

    println!(
        "\n{}",
        format!(t!("tree.header"), count = loaded.tree.len()).bold()
    );
    print!("{}", graph_display::render_cmd_tree(&loaded.tree, &display_options));
    commons::print_problems(&loaded.problems);
    Ok(())
}
