//! JSON schema decoding and normalization for flagenv.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while decoding and validating a schema.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("short flags must be a single character: {0:?} is longer")]
    InvalidShortFlag(String),

    #[error("short flags must not be {0:?}")]
    ReservedShortFlag(String),
}

/// One named option, supplied on the command line as `--name VALUE` or
/// `-x VALUE`.
///
/// String fields default to empty, and emptiness means "not given"
/// throughout. The effective `type` and `env` values are resolved at bind
/// time; `name` and `short` are settled during [`AppSchema::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSpec {
    /// Flag name; filled from the `flags` map key when the record omits it.
    pub name: String,
    /// Help text shown in usage output.
    #[serde(alias = "desc")]
    pub help: String,
    /// Optional single-character short form.
    pub short: String,
    /// Value type: `string` (the default) or `int`/`integer`.
    #[serde(rename = "type")]
    pub value_type: String,
    /// Default value, applied only when non-empty.
    pub default: String,
    /// Environment variable to emit under; defaults to the uppercased name.
    pub env: String,
    pub required: bool,
}

/// One positional argument, bound by declaration order rather than by name.
/// Same fields as [`FlagSpec`] minus the short form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgSpec {
    pub name: String,
    #[serde(alias = "desc")]
    pub help: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub default: String,
    pub env: String,
    pub required: bool,
}

/// The full CLI description for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSchema {
    pub name: String,
    #[serde(alias = "desc")]
    pub help: String,
    /// Positional arguments, in command-line order.
    pub args: Vec<ArgSpec>,
    /// Flags keyed by identifier; each key doubles as its record's default
    /// name.
    pub flags: BTreeMap<String, FlagSpec>,
}

impl AppSchema {
    /// Decode a schema from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<AppSchema, ConfigError> {
        let schema = serde_json::from_slice(bytes)?;
        Ok(schema)
    }

    /// Normalize the decoded schema in place: copy each `flags` key into an
    /// empty `name`, and reject short forms longer than one character or
    /// equal to the `-` option prefix itself.
    ///
    /// Effective `type` and `env` are not touched here; the binder resolves
    /// those.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        for (key, flag) in &mut self.flags {
            if flag.name.is_empty() {
                flag.name = key.clone();
            }
            if flag.short.chars().count() > 1 {
                return Err(ConfigError::InvalidShortFlag(flag.short.clone()));
            }
            if flag.short == "-" {
                return Err(ConfigError::ReservedShortFlag(flag.short.clone()));
            }
        }
        Ok(())
    }
}

impl FlagSpec {
    /// Effective environment variable name: `env` when given, otherwise the
    /// uppercased flag name.
    pub fn effective_env(&self) -> String {
        if self.env.is_empty() {
            self.name.to_uppercase()
        } else {
            self.env.clone()
        }
    }

    /// The short form as a char, only when exactly one character was
    /// configured.
    pub fn short_char(&self) -> Option<char> {
        let mut chars = self.short.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    /// The default value, when a non-empty one was configured.
    pub fn default_value(&self) -> Option<&str> {
        if self.default.is_empty() {
            None
        } else {
            Some(&self.default)
        }
    }
}

impl ArgSpec {
    /// Effective environment variable name: `env` when given, otherwise the
    /// uppercased argument name.
    pub fn effective_env(&self) -> String {
        if self.env.is_empty() {
            self.name.to_uppercase()
        } else {
            self.env.clone()
        }
    }

    /// The default value, when a non-empty one was configured.
    pub fn default_value(&self) -> Option<&str> {
        if self.default.is_empty() {
            None
        } else {
            Some(&self.default)
        }
    }
}

/// Decode and normalize a schema in one step.
pub fn read_config(bytes: &[u8]) -> Result<AppSchema, ConfigError> {
    let mut schema = AppSchema::from_json(bytes)?;
    schema.normalize()?;
    Ok(schema)
}
