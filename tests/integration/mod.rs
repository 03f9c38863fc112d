//! End-to-end checks of the public API, one suite per subsystem

pub mod embed_builder;
pub mod evaluator;
pub mod node_registry;
pub mod sessions;
pub mod settings_commands;
pub mod settings_store;
