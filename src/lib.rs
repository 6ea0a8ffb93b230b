//! flagenv - config-driven argument parsing for shell scripts.
//!
//! This library decodes a JSON description of a command-line interface,
//! registers it on a CLI-parsing engine, parses an argument vector against
//! it, and renders the bound values as `NAME=value` assignments for a
//! calling shell to `eval`.

pub mod binder;
pub mod config;
pub mod engine;
pub mod output;

pub use binder::{BindError, Binder, Vars};
pub use config::{read_config, AppSchema, ArgSpec, ConfigError, FlagSpec};
pub use engine::{
    ArgReg, ClapEngine, CliEngine, FlagReg, SlotId, SlotValues, UsageError, Value, ValueKind,
};
pub use output::write_env;
