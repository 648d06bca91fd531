// src/core/builtins.rs

//! In-process commands registered into every tree before the config is loaded.

use crate::core::{
    cmd_tree::CmdTree, command::Cmd, errors::DefinitionError, simulate::EnvSimulator,
};

pub const BUILTIN_SOURCE: &str = "builtin";

/// Registers the builtin commands.
pub fn register_builtins(tree: &mut CmdTree) -> Result<(), DefinitionError> {
    let mut set = Cmd::new("env.set", BUILTIN_SOURCE);
    set.set_help("Set an env key to a value.")
        .set_simulator(EnvSimulator::SetKeyFromArgs {
            key_arg: "key".to_string(),
            value_arg: "value".to_string(),
        })
        .add_arg("key", "", &["k"])?
        .add_arg("value", "", &["v", "val"])?;
    tree.register(set, &["s"])?;

    let mut copy = Cmd::new("env.cp", BUILTIN_SOURCE);
    copy.set_help("Copy the value of one env key into another.")
        .set_simulator(EnvSimulator::CopyKey {
            src_arg: "src".to_string(),
            dst_arg: "dst".to_string(),
        })
        .add_arg("src", "", &["from"])?
        .add_arg("dst", "", &["to"])?;
    tree.register(copy, &["copy"])?;

    let mut remove = Cmd::new("env.rm", BUILTIN_SOURCE);
    remove
        .set_help("Remove an env key from every layer.")
        .set_builtin()
        .add_arg("key", "", &["k"])?;
    tree.register(remove, &["del"])?;

    let mut echo = Cmd::new("echo", BUILTIN_SOURCE);
    echo.set_help("Print a message.")
        .set_builtin()
        .add_arg("message", "", &["msg", "m"])?;
    tree.register(echo, &[])?;

    let mut noop = Cmd::new("noop", BUILTIN_SOURCE);
    noop.set_help("Do nothing.").set_builtin();
    tree.register(noop, &["dummy"])?;

    log::debug!("Registered {} builtin commands", tree.len());
    Ok(())
}
