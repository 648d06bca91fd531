use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::cli::handlers::commons;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Loads and compiles the command tree, reporting every problem found."
)]
struct CheckArgs {
    /// Print nothing on success.
    #[arg(long, short)]
    quiet: bool,
}

/// Fails if the tree has any tolerable problem, so `check` can gate CI jobs.
pub fn handle(args: Vec<String>, config: Option<&str>) -> Result<()> {
    let check_args = CheckArgs::try_parse_from(&args)?;
    let loaded = commons::load(config)?;

    if loaded.problems.is_empty() {
        if !check_args.quiet {
            println!(
                "{} {}",
                "✔".green(),
                format!(
                    t!("check.ok"),
                    cmds = loaded.tree.len(),
                    files = loaded.files.len()
                )
            );
        }
        return Ok(());
    }

    commons::print_problems(&loaded.problems);
    Err(anyhow!(format!(
        t!("check.error.failed"),
        count = loaded.problems.len()
    )))
}
