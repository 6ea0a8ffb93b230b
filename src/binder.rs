//! Binding of normalized specs onto a CLI engine.
//!
//! The binder walks a schema, registers every spec with the engine, and
//! remembers which slot each one's value will land in, keyed by effective
//! environment variable name. After a parse it turns the engine's slot
//! values back into env-var maps for rendering.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::{AppSchema, ArgSpec, FlagSpec};
use crate::engine::{ArgReg, CliEngine, FlagReg, SlotId, SlotValues, ValueKind};

/// Errors raised while registering specs on the engine.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("flag {0:?} has an unknown type: {1:?}")]
    UnknownFlagType(String, String),

    #[error("argument {0:?} has an unknown type: {1:?}")]
    UnknownArgType(String, String),
}

/// Variable values ready for rendering, keyed by env-var name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    pub strings: BTreeMap<String, String>,
    pub ints: BTreeMap<String, i64>,
}

/// Tracks the slot behind each effective env var. When two specs resolve
/// to the same env var and kind, the later registration wins.
#[derive(Debug, Default)]
pub struct Binder {
    string_slots: BTreeMap<String, SlotId>,
    int_slots: BTreeMap<String, SlotId>,
}

impl Binder {
    pub fn new() -> Binder {
        Binder::default()
    }

    /// Bind every spec in the schema: positional arguments first, in
    /// declaration order, then flags in key order.
    pub fn bind<E: CliEngine>(
        &mut self,
        schema: &AppSchema,
        engine: &mut E,
    ) -> Result<(), BindError> {
        for arg in &schema.args {
            self.bind_arg(arg, engine)?;
        }
        for flag in schema.flags.values() {
            self.bind_flag(flag, engine)?;
        }
        Ok(())
    }

    /// Register one flag and record its slot under the effective env var.
    pub fn bind_flag<E: CliEngine>(
        &mut self,
        spec: &FlagSpec,
        engine: &mut E,
    ) -> Result<(), BindError> {
        let kind = ValueKind::from_type(&spec.value_type).ok_or_else(|| {
            BindError::UnknownFlagType(spec.name.clone(), spec.value_type.clone())
        })?;
        let slot = engine.register_flag(FlagReg {
            name: &spec.name,
            help: &spec.help,
            short: spec.short_char(),
            required: spec.required,
            default: spec.default_value(),
            kind,
        });
        self.record(spec.effective_env(), kind, slot);
        Ok(())
    }

    /// Register one positional argument and record its slot under the
    /// effective env var.
    pub fn bind_arg<E: CliEngine>(
        &mut self,
        spec: &ArgSpec,
        engine: &mut E,
    ) -> Result<(), BindError> {
        let kind = ValueKind::from_type(&spec.value_type)
            .ok_or_else(|| BindError::UnknownArgType(spec.name.clone(), spec.value_type.clone()))?;
        let slot = engine.register_arg(ArgReg {
            name: &spec.name,
            help: &spec.help,
            required: spec.required,
            default: spec.default_value(),
            kind,
        });
        self.record(spec.effective_env(), kind, slot);
        Ok(())
    }

    fn record(&mut self, env: String, kind: ValueKind, slot: SlotId) {
        match kind {
            ValueKind::String => self.string_slots.insert(env, slot),
            ValueKind::Int => self.int_slots.insert(env, slot),
        };
    }

    /// Materialize the env-var value maps from a completed parse.
    pub fn resolve(&self, parsed: &SlotValues) -> Vars {
        let mut vars = Vars::default();
        for (env, slot) in &self.string_slots {
            vars.strings
                .insert(env.clone(), parsed.string(*slot).to_string());
        }
        for (env, slot) in &self.int_slots {
            vars.ints.insert(env.clone(), parsed.int(*slot));
        }
        vars
    }
}
