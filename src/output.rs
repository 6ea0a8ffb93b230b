//! Rendering of bound variables as shell-evaluable assignment lines.

use std::io::{self, Write};

use crate::binder::Vars;

/// Write one assignment line per bound variable: strings first, then
/// integers, each group in env-var order.
///
/// String values are rendered with standard debug quoting, so the line
/// reads `NAME="value"` with embedded quotes, backslashes and control
/// characters escaped. Integer values are bare decimals. Consumers treat
/// the output as a set; line order carries no meaning.
pub fn write_env<W: Write>(w: &mut W, vars: &Vars) -> io::Result<()> {
    for (name, value) in &vars.strings {
        writeln!(w, "{}={:?}", name, value)?;
    }
    for (name, value) in &vars.ints {
        writeln!(w, "{}={}", name, value)?;
    }
    Ok(())
}
