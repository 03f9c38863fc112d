//! This module aggregates various utility submodules used throughout the application.

/// Loading the bot-wide configuration file.
pub mod config;
/// Per-guild command cooldowns.
pub mod cooldown;
/// Domain error type shared by every component.
pub mod error;
/// The sandboxed debug console.
pub mod evaluator;
/// Human readable sizes, durations and counts.
pub mod format;
/// Persisting player sessions across restarts.
pub mod session;
