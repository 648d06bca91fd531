// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod check;
pub mod commons;
pub mod desc;
pub mod env;
pub mod flow;
pub mod tree;
