// src/core/mod.rs

pub mod args;
pub mod automap;
pub mod builtins;
pub mod cmd_tree;
pub mod command;
pub mod compiler;
pub mod config_loader;
pub mod env;
pub mod env_mapping;
pub mod env_ops;
pub mod errors;
pub mod explain;
pub mod flow;
pub mod flow_parser;
pub mod graph_display;
pub mod paths;
pub mod renderer;
pub mod simulate;
