//! The CLI-parsing engine boundary: flag/argument registration plus a
//! single parse pass over an argument vector.
//!
//! The production engine wraps clap's builder API. Callers talk to it
//! through [`CliEngine`] so that binding logic can be exercised against a
//! scripted stand-in.

use std::collections::BTreeSet;
use std::mem;

use clap::{value_parser, Arg, ArgAction, Command};
use thiserror::Error;

/// A usage-level failure: unknown flag, missing required value, a value
/// that would not coerce, or an explicit help request. Carries the
/// engine's fully rendered usage/help text, ready to print as-is.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(String);

impl UsageError {
    pub fn new(message: impl Into<String>) -> UsageError {
        UsageError(message.into())
    }
}

impl From<clap::Error> for UsageError {
    fn from(err: clap::Error) -> UsageError {
        UsageError(err.to_string())
    }
}

/// Value kinds a binding can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
}

impl ValueKind {
    /// Resolve a spec's `type` field; empty means string. Returns `None`
    /// for anything outside the supported set.
    pub fn from_type(value_type: &str) -> Option<ValueKind> {
        match value_type {
            "" | "string" => Some(ValueKind::String),
            "int" | "integer" => Some(ValueKind::Int),
            _ => None,
        }
    }
}

/// Handle for one registered binding, used to pull its value out of a
/// completed parse. Slots are handed out in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(pub(crate) usize);

/// One parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Int(i64),
}

/// The values produced by a completed parse, indexed by [`SlotId`]. A slot
/// whose flag or argument was absent holds its kind's zero value, so every
/// registered binding always resolves to something.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotValues {
    values: Vec<Value>,
}

impl SlotValues {
    /// Append the value for the next slot in registration order.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// String value of a slot; empty for absent or non-string slots.
    pub fn string(&self, slot: SlotId) -> &str {
        match self.values.get(slot.0) {
            Some(Value::String(s)) => s,
            _ => "",
        }
    }

    /// Integer value of a slot; zero for absent or non-integer slots.
    pub fn int(&self, slot: SlotId) -> i64 {
        match self.values.get(slot.0) {
            Some(Value::Int(n)) => *n,
            _ => 0,
        }
    }
}

/// Registration request for one flag.
#[derive(Debug, Clone, Copy)]
pub struct FlagReg<'a> {
    pub name: &'a str,
    pub help: &'a str,
    pub short: Option<char>,
    pub required: bool,
    pub default: Option<&'a str>,
    pub kind: ValueKind,
}

/// Registration request for one positional argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgReg<'a> {
    pub name: &'a str,
    pub help: &'a str,
    pub required: bool,
    pub default: Option<&'a str>,
    pub kind: ValueKind,
}

/// A CLI-parsing engine: registration of flags and positional arguments,
/// then one parse over an argument vector (program name excluded).
pub trait CliEngine {
    fn register_flag(&mut self, reg: FlagReg<'_>) -> SlotId;
    fn register_arg(&mut self, reg: ArgReg<'_>) -> SlotId;
    fn parse(&mut self, argv: &[String]) -> Result<SlotValues, UsageError>;
}

/// The production engine, backed by clap.
///
/// Registrations the surface cannot hold (a duplicate long or short name,
/// an empty or `-`-prefixed name, a `-` short, a required positional after
/// an optional one) are recorded instead of forwarded to clap, and `parse`
/// reports the first of them as a usage error. The long name `help`
/// belongs to the automatic help flag.
pub struct ClapEngine {
    cmd: Command,
    kinds: Vec<ValueKind>,
    positionals: usize,
    longs: BTreeSet<String>,
    shorts: BTreeSet<char>,
    saw_optional_positional: bool,
    rejected: Option<String>,
}

impl ClapEngine {
    /// Build an engine for an application. The automatic help flag is
    /// registered as `--help` only, which leaves `-h` free for configured
    /// shorts.
    pub fn new(name: &str, help: &str) -> ClapEngine {
        let mut cmd = Command::new(name.to_string()).disable_help_flag(true).arg(
            Arg::new("help")
                .long("help")
                .action(ArgAction::Help)
                .help("Print usage information"),
        );
        if !help.is_empty() {
            cmd = cmd.about(help.to_string());
        }
        ClapEngine {
            cmd,
            kinds: Vec::new(),
            positionals: 0,
            longs: BTreeSet::from(["help".to_string()]),
            shorts: BTreeSet::new(),
            saw_optional_positional: false,
            rejected: None,
        }
    }

    /// Reserve the next slot. The slot ordinal doubles as the internal arg
    /// id, which keeps ids unique even when two specs share a name.
    fn next_slot(&mut self, kind: ValueKind) -> SlotId {
        let slot = SlotId(self.kinds.len());
        self.kinds.push(kind);
        slot
    }

    fn push_arg(&mut self, arg: Arg) {
        let cmd = mem::replace(&mut self.cmd, Command::new(""));
        self.cmd = cmd.arg(arg);
    }

    /// Record a registration the CLI surface cannot hold. The slot is still
    /// handed out; `parse` reports the first rejection instead of running.
    fn reject(&mut self, message: String) {
        if self.rejected.is_none() {
            self.rejected = Some(message);
        }
    }
}

impl CliEngine for ClapEngine {
    fn register_flag(&mut self, reg: FlagReg<'_>) -> SlotId {
        let slot = self.next_slot(reg.kind);
        if reg.name.is_empty() || reg.name.starts_with('-') {
            self.reject(format!("flag name {:?} is not allowed", reg.name));
            return slot;
        }
        if !self.longs.insert(reg.name.to_string()) {
            self.reject(format!("duplicate long flag --{}", reg.name));
            return slot;
        }
        let mut arg = Arg::new(slot.0.to_string())
            .long(reg.name.to_string())
            .action(ArgAction::Set)
            .value_name("VALUE");
        if !reg.help.is_empty() {
            arg = arg.help(reg.help.to_string());
        }
        if let Some(short) = reg.short {
            if short == '-' {
                self.reject(format!("short flag {short:?} is not allowed"));
                return slot;
            }
            if !self.shorts.insert(short) {
                self.reject(format!("duplicate short flag -{short}"));
                return slot;
            }
            arg = arg.short(short);
        }
        self.push_arg(configure_value(arg, reg.required, reg.default, reg.kind));
        slot
    }

    fn register_arg(&mut self, reg: ArgReg<'_>) -> SlotId {
        let slot = self.next_slot(reg.kind);
        if reg.required && self.saw_optional_positional {
            self.reject(format!(
                "required argument {:?} follows an optional argument",
                reg.name
            ));
            return slot;
        }
        if !reg.required {
            self.saw_optional_positional = true;
        }
        self.positionals += 1;
        let mut arg = Arg::new(slot.0.to_string())
            .index(self.positionals)
            .value_name(reg.name.to_string());
        if !reg.help.is_empty() {
            arg = arg.help(reg.help.to_string());
        }
        self.push_arg(configure_value(arg, reg.required, reg.default, reg.kind));
        slot
    }

    fn parse(&mut self, argv: &[String]) -> Result<SlotValues, UsageError> {
        if let Some(message) = self.rejected.clone() {
            let usage = self.cmd.render_usage();
            return Err(UsageError::new(format!("error: {message}\n\n{usage}\n")));
        }
        let bin = self.cmd.get_name().to_string();
        let matches = self
            .cmd
            .try_get_matches_from_mut(std::iter::once(bin).chain(argv.iter().cloned()))?;

        let mut values = SlotValues::default();
        for (ordinal, kind) in self.kinds.iter().enumerate() {
            let id = ordinal.to_string();
            let value = match kind {
                ValueKind::String => {
                    Value::String(matches.get_one::<String>(&id).cloned().unwrap_or_default())
                }
                ValueKind::Int => Value::Int(matches.get_one::<i64>(&id).copied().unwrap_or(0)),
            };
            values.push(value);
        }
        Ok(values)
    }
}

/// Required takes precedence over a default; clap rejects the combination,
/// and a required binding has to be supplied on the command line.
fn configure_value(mut arg: Arg, required: bool, default: Option<&str>, kind: ValueKind) -> Arg {
    if required {
        arg = arg.required(true);
    } else if let Some(default) = default {
        arg = arg.default_value(default.to_string());
    }
    if kind == ValueKind::Int {
        arg = arg.value_parser(value_parser!(i64));
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn string_flag(name: &str) -> FlagReg<'_> {
        FlagReg {
            name,
            help: "",
            short: None,
            required: false,
            default: None,
            kind: ValueKind::String,
        }
    }

    fn int_flag(name: &str) -> FlagReg<'_> {
        FlagReg {
            kind: ValueKind::Int,
            ..string_flag(name)
        }
    }

    fn string_arg(name: &str) -> ArgReg<'_> {
        ArgReg {
            name,
            help: "",
            required: false,
            default: None,
            kind: ValueKind::String,
        }
    }

    #[test]
    fn test_parse_long_flag() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(string_flag("city"));
        let values = engine.parse(&argv(&["--city", "paris"])).unwrap();
        assert_eq!(values.string(slot), "paris");
    }

    #[test]
    fn test_parse_long_flag_equals_form() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(string_flag("city"));
        let values = engine.parse(&argv(&["--city=nice"])).unwrap();
        assert_eq!(values.string(slot), "nice");
    }

    #[test]
    fn test_parse_short_flag() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(FlagReg {
            short: Some('c'),
            ..string_flag("city")
        });
        let values = engine.parse(&argv(&["-c", "lyon"])).unwrap();
        assert_eq!(values.string(slot), "lyon");
    }

    #[test]
    fn test_short_h_stays_available() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(FlagReg {
            short: Some('h'),
            ..string_flag("host")
        });
        let values = engine.parse(&argv(&["-h", "localhost"])).unwrap();
        assert_eq!(values.string(slot), "localhost");
    }

    #[test]
    fn test_absent_optional_flag_is_zero_valued() {
        let mut engine = ClapEngine::new("app", "");
        let city = engine.register_flag(string_flag("city"));
        let count = engine.register_flag(int_flag("count"));
        let values = engine.parse(&argv(&[])).unwrap();
        assert_eq!(values.string(city), "");
        assert_eq!(values.int(count), 0);
    }

    #[test]
    fn test_default_applied_when_absent() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(FlagReg {
            default: Some("paris"),
            ..string_flag("city")
        });
        let values = engine.parse(&argv(&[])).unwrap();
        assert_eq!(values.string(slot), "paris");
    }

    #[test]
    fn test_default_overridden_by_value() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(FlagReg {
            default: Some("paris"),
            ..string_flag("city")
        });
        let values = engine.parse(&argv(&["--city", "rome"])).unwrap();
        assert_eq!(values.string(slot), "rome");
    }

    #[test]
    fn test_int_flag_coercion() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(int_flag("count"));
        let values = engine.parse(&argv(&["--count", "5"])).unwrap();
        assert_eq!(values.int(slot), 5);
    }

    #[test]
    fn test_int_flag_rejects_garbage() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(int_flag("count"));
        let err = engine.parse(&argv(&["--count", "many"])).unwrap_err();
        assert!(err.to_string().contains("invalid value"));
    }

    #[test]
    fn test_missing_required_flag() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(FlagReg {
            required: true,
            ..string_flag("city")
        });
        let err = engine.parse(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_required_wins_over_default() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_flag(FlagReg {
            required: true,
            default: Some("paris"),
            ..string_flag("city")
        });
        assert!(engine.parse(&argv(&[])).is_err());
        let values = engine.parse(&argv(&["--city", "oslo"])).unwrap();
        assert_eq!(values.string(slot), "oslo");
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(string_flag("city"));
        let err = engine.parse(&argv(&["--nope"])).unwrap_err();
        assert!(err.to_string().contains("unexpected argument"));
    }

    #[test]
    fn test_positionals_bind_in_registration_order() {
        let mut engine = ClapEngine::new("app", "");
        let first = engine.register_arg(string_arg("src"));
        let second = engine.register_arg(string_arg("dst"));
        let values = engine.parse(&argv(&["in.txt", "out.txt"])).unwrap();
        assert_eq!(values.string(first), "in.txt");
        assert_eq!(values.string(second), "out.txt");
    }

    #[test]
    fn test_positional_int_coercion() {
        let mut engine = ClapEngine::new("app", "");
        let slot = engine.register_arg(ArgReg {
            kind: ValueKind::Int,
            ..string_arg("count")
        });
        let values = engine.parse(&argv(&["7"])).unwrap();
        assert_eq!(values.int(slot), 7);
    }

    #[test]
    fn test_missing_required_positional() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_arg(ArgReg {
            required: true,
            ..string_arg("who")
        });
        let err = engine.parse(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_help_renders_usage() {
        let mut engine = ClapEngine::new("app", "does things");
        engine.register_flag(string_flag("city"));
        let err = engine.parse(&argv(&["--help"])).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("Usage:"));
        assert!(rendered.contains("does things"));
        assert!(rendered.contains("--city"));
    }

    #[test]
    fn test_duplicate_names_get_distinct_slots() {
        let mut engine = ClapEngine::new("app", "");
        let arg = engine.register_arg(string_arg("city"));
        let flag = engine.register_flag(string_flag("city"));
        assert_ne!(arg, flag);
        let values = engine.parse(&argv(&["--city", "bern", "basel"])).unwrap();
        assert_eq!(values.string(arg), "basel");
        assert_eq!(values.string(flag), "bern");
    }

    #[test]
    fn test_duplicate_long_flag_is_rejected() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(string_flag("city"));
        engine.register_flag(string_flag("city"));
        let err = engine.parse(&argv(&["--city", "bern"])).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("duplicate long flag --city"));
        assert!(rendered.contains("Usage:"));
    }

    #[test]
    fn test_duplicate_short_flag_is_rejected() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(FlagReg {
            short: Some('c'),
            ..string_flag("city")
        });
        engine.register_flag(FlagReg {
            short: Some('c'),
            ..string_flag("country")
        });
        let err = engine.parse(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("duplicate short flag -c"));
    }

    #[test]
    fn test_help_long_is_reserved() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(string_flag("help"));
        let err = engine.parse(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("duplicate long flag --help"));
    }

    #[test]
    fn test_dash_short_flag_is_rejected() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_flag(FlagReg {
            short: Some('-'),
            ..string_flag("dash")
        });
        let err = engine.parse(&argv(&[])).unwrap_err();
        assert!(err.to_string().contains("short flag '-' is not allowed"));
    }

    #[test]
    fn test_illegal_flag_names_are_rejected() {
        for name in ["", "-x"] {
            let mut engine = ClapEngine::new("app", "");
            engine.register_flag(string_flag(name));
            let err = engine.parse(&argv(&[])).unwrap_err();
            assert!(err.to_string().contains("is not allowed"), "{name:?}");
        }
    }

    #[test]
    fn test_required_positional_after_optional_is_rejected() {
        let mut engine = ClapEngine::new("app", "");
        engine.register_arg(string_arg("first"));
        engine.register_arg(ArgReg {
            required: true,
            ..string_arg("second")
        });
        let err = engine.parse(&argv(&["a", "b"])).unwrap_err();
        assert!(err
            .to_string()
            .contains(r#"required argument "second" follows an optional argument"#));
    }

    #[test]
    fn test_optional_positional_after_required_is_fine() {
        let mut engine = ClapEngine::new("app", "");
        let src = engine.register_arg(ArgReg {
            required: true,
            ..string_arg("src")
        });
        let dst = engine.register_arg(string_arg("dst"));
        let values = engine.parse(&argv(&["in.txt"])).unwrap();
        assert_eq!(values.string(src), "in.txt");
        assert_eq!(values.string(dst), "");
    }

    #[test]
    fn test_slot_values_zero_for_wrong_kind() {
        let mut values = SlotValues::default();
        values.push(Value::String("x".to_string()));
        values.push(Value::Int(3));
        assert_eq!(values.int(SlotId(0)), 0);
        assert_eq!(values.string(SlotId(1)), "");
        assert_eq!(values.string(SlotId(9)), "");
    }

    #[test]
    fn test_value_kind_from_type() {
        assert_eq!(ValueKind::from_type(""), Some(ValueKind::String));
        assert_eq!(ValueKind::from_type("string"), Some(ValueKind::String));
        assert_eq!(ValueKind::from_type("int"), Some(ValueKind::Int));
        assert_eq!(ValueKind::from_type("integer"), Some(ValueKind::Int));
        assert_eq!(ValueKind::from_type("float"), None);
        assert_eq!(ValueKind::from_type("STRING"), None);
    }

    #[test]
    fn test_usage_error_display() {
        let err = UsageError::new("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
